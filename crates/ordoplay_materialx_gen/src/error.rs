// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised while building graphs and generating code.

use ordoplay_materialx_core::{CoreError, ErrorKind};

/// Result alias for generation
pub type GenResult<T> = Result<T, GenError>;

/// Error raised by graph construction, scheduling or emission
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// Error from the type system, value model or document layer
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No nodedef matches a node instance
    #[error("Could not find a nodedef for node '{node}' (category '{category}', type '{type_name}')")]
    UnresolvedNodeDef {
        /// Node instance name
        node: String,
        /// Node category
        category: String,
        /// Output type
        type_name: String,
    },

    /// No implementation found for a nodedef
    #[error("Could not find an implementation for '{nodedef}' in language '{language}' for target '{target}'")]
    MissingImplementation {
        /// Nodedef name
        nodedef: String,
        /// Target language
        language: String,
        /// Renderer target
        target: String,
    },

    /// An implementation names no source file and embeds no source
    #[error("Implementation '{0}' has no source file")]
    MissingSourceFile(String),

    /// An inline expression opens a `{{` token it never closes
    #[error("Unterminated '{{{{' token in inline implementation '{0}'")]
    UnterminatedInlineToken(String),

    /// A node referenced by name does not exist
    #[error("Node '{node}' not found in graph '{graph}'")]
    NodeNotFound {
        /// Graph name
        graph: String,
        /// Missing node name
        node: String,
    },

    /// A port referenced by name or handle does not exist
    #[error("Port '{port}' not found on '{owner}'")]
    PortNotFound {
        /// Node or graph name
        owner: String,
        /// Missing port name
        port: String,
    },

    /// Connection between ports of incompatible types
    #[error("Cannot connect '{from}' of type '{from_type}' to '{to}' of type '{to_type}'")]
    IncompatiblePorts {
        /// Upstream port
        from: String,
        /// Upstream type
        from_type: String,
        /// Downstream port
        to: String,
        /// Downstream type
        to_type: String,
    },

    /// The graph contains a cycle
    #[error("Cycle detected in graph '{graph}': {}", .chain.join(" -> "))]
    CycleDetected {
        /// Graph name
        graph: String,
        /// Node names along the cycle, first node repeated at the end
        chain: Vec<String>,
    },

    /// A compound graph instantiates itself
    #[error("Compound graph '{0}' instantiates itself")]
    CyclicCompound(String),

    /// A node or graph with several outputs was used where only one is
    /// supported
    #[error("Multiple outputs is not supported: '{node}' in the {generator} generator")]
    UnsupportedMultiOutput {
        /// Node or graph name
        node: String,
        /// Generator language
        generator: String,
    },

    /// Feature not available for the active generator
    #[error("{0}")]
    Unsupported(String),
}

impl GenError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::UnresolvedNodeDef { .. }
            | Self::MissingImplementation { .. }
            | Self::MissingSourceFile(_)
            | Self::NodeNotFound { .. }
            | Self::PortNotFound { .. } => ErrorKind::Lookup,
            Self::UnterminatedInlineToken(_) => ErrorKind::Configuration,
            Self::IncompatiblePorts { .. } => ErrorKind::TypeMismatch,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::CyclicCompound(_) => ErrorKind::CyclicCompound,
            Self::UnsupportedMultiOutput { .. } | Self::Unsupported(_) => ErrorKind::Unsupported,
        }
    }
}
