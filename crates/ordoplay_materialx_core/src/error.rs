// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types shared by the core data model.

use std::path::PathBuf;

/// Broad classification of a failure, used by callers to decide how to
/// report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Duplicate or missing registration
    Configuration,
    /// Something referenced by name could not be found
    Lookup,
    /// A value or connection does not match its declared type
    TypeMismatch,
    /// The graph contains a cycle
    CycleDetected,
    /// A compound implementation contains itself
    CyclicCompound,
    /// The requested feature is not available for this target
    Unsupported,
    /// A file could not be read
    Io,
}

/// Errors raised by the type system, value model and document layer
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A type syntax was registered twice for the same target
    #[error("Type syntax for '{type_name}' is already registered in the {syntax} syntax")]
    DuplicateTypeSyntax {
        /// Type name
        type_name: String,
        /// Syntax (target language) name
        syntax: String,
    },

    /// No type syntax registered for a type
    #[error("No type syntax registered for '{type_name}' in the {syntax} syntax")]
    MissingTypeSyntax {
        /// Type name
        type_name: String,
        /// Syntax (target language) name
        syntax: String,
    },

    /// Unknown type name
    #[error("Unknown type: '{0}'")]
    UnknownType(String),

    /// Accessor or value does not match the declared type
    #[error("Type mismatch: expected '{expected}', got '{got}'")]
    TypeMismatch {
        /// Type the caller asked for
        expected: String,
        /// Type actually stored
        got: String,
    },

    /// Text could not be converted to a value of the given type
    #[error("Invalid value '{text}' for type '{type_name}'")]
    InvalidValue {
        /// Target type
        type_name: String,
        /// Offending text
        text: String,
    },

    /// Too few component expressions to build a value
    #[error("Too few values given to construct a '{0}' value")]
    TooFewValues(String),

    /// An array used as a uniform has no elements
    #[error("Uniform array of type '{0}' cannot be initialized to an empty value")]
    EmptyArray(String),

    /// A swizzle channel is not valid for the source type
    #[error("Invalid channel '{channel}' for type '{type_name}'")]
    InvalidChannel {
        /// Source type
        type_name: String,
        /// Offending channel
        channel: char,
    },

    /// A file could not be found in the search path
    #[error("File not found in search path: {0:?}")]
    FileNotFound(PathBuf),

    /// A file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A document could not be parsed
    #[error("Failed to parse document {path:?}: {message}")]
    DocumentParse {
        /// File path
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

impl CoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateTypeSyntax { .. } | Self::MissingTypeSyntax { .. } => {
                ErrorKind::Configuration
            }
            Self::UnknownType(_) => ErrorKind::Lookup,
            Self::TypeMismatch { .. }
            | Self::InvalidValue { .. }
            | Self::TooFewValues(_)
            | Self::InvalidChannel { .. } => ErrorKind::TypeMismatch,
            Self::EmptyArray(_) => ErrorKind::Unsupported,
            Self::FileNotFound(_) | Self::Io { .. } | Self::DocumentParse { .. } => ErrorKind::Io,
        }
    }
}
