// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material document model.
//!
//! A [`Document`] holds node definitions, their implementations, node
//! graphs and top-level node instances. Documents are stored as RON and
//! are read-only while a shader is generated.

use crate::error::CoreError;
use crate::types::{TypeDesc, TypeRef};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File extension marking an inline expression implementation
pub const INLINE_EXTENSION: &str = "inline";

/// Typed port declaration on a node definition or graph interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDef {
    /// Port name
    pub name: String,
    /// Type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Default value as text
    #[serde(default)]
    pub value: Option<String>,
    /// Whether the port is a uniform
    #[serde(default)]
    pub uniform: bool,
}

impl PortDef {
    /// Create a port declaration without a default value
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: None,
            uniform: false,
        }
    }

    /// Set the default value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Mark the port as uniform
    pub fn uniform(mut self) -> Self {
        self.uniform = true;
        self
    }

    /// Resolve the port type
    pub fn type_desc(&self) -> Result<TypeRef, CoreError> {
        TypeDesc::get(&self.type_name).ok_or_else(|| CoreError::UnknownType(self.type_name.clone()))
    }

    /// Parse the default value, if any
    pub fn default_value(&self) -> Result<Option<Value>, CoreError> {
        match &self.value {
            Some(text) => Ok(Some(Value::from_string(self.type_desc()?, text)?)),
            None => Ok(None),
        }
    }
}

/// Node definition: the typed interface of a node category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    /// Unique nodedef name (e.g. `ND_multiply_float`)
    pub name: String,
    /// Node category (e.g. `multiply`)
    pub node: String,
    /// Inputs in declaration order
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    /// Outputs in declaration order
    #[serde(default)]
    pub outputs: Vec<PortDef>,
}

impl NodeDef {
    /// Create an empty nodedef
    pub fn new(name: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: node.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an input
    pub fn with_input(mut self, input: PortDef) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add an output
    pub fn with_output(mut self, output: PortDef) -> Self {
        self.outputs.push(output);
        self
    }

    /// Find an input by name
    pub fn input(&self, name: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Find an output by name
    pub fn output(&self, name: &str) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Type name of the first output
    pub fn output_type(&self) -> Option<&str> {
        self.outputs.first().map(|p| p.type_name.as_str())
    }
}

/// Source-code implementation record for a nodedef
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name
    pub name: String,
    /// Nodedef this implements
    pub nodedef: String,
    /// Source file, resolved through the search path
    #[serde(default)]
    pub file: Option<String>,
    /// Function name (defaults to the nodedef name)
    #[serde(default)]
    pub function: Option<String>,
    /// Target language (`osl`, `mdl`, `glsl`)
    pub language: String,
    /// Renderer target; empty matches every target
    #[serde(default)]
    pub target: String,
    /// Embedded source text used instead of reading `file`
    #[serde(default)]
    pub source: Option<String>,
}

impl Implementation {
    /// Whether the source is an inline expression
    pub fn is_inline(&self) -> bool {
        self.file
            .as_deref()
            .and_then(|f| Path::new(f).extension())
            .is_some_and(|ext| ext == INLINE_EXTENSION)
    }

    /// Function name, falling back to the nodedef name
    pub fn function_name(&self) -> &str {
        self.function.as_deref().unwrap_or(&self.nodedef)
    }
}

/// Declared output of a node graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphOutput {
    /// Output name
    pub name: String,
    /// Type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Internal node that drives this output
    pub nodename: String,
    /// Output of the driving node (first output when empty)
    #[serde(default)]
    pub output: Option<String>,
    /// Channel swizzle applied to the driving output
    #[serde(default)]
    pub channels: Option<String>,
}

/// Binding of one input on a node instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    /// Input name
    pub name: String,
    /// Type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Literal value
    #[serde(default)]
    pub value: Option<String>,
    /// Upstream node in the same graph
    #[serde(default)]
    pub nodename: Option<String>,
    /// Output of the upstream node
    #[serde(default)]
    pub output: Option<String>,
    /// Graph interface input this binds to
    #[serde(default)]
    pub interfacename: Option<String>,
    /// Channel swizzle applied to the upstream output
    #[serde(default)]
    pub channels: Option<String>,
}

impl InputBinding {
    /// Literal binding
    pub fn value(name: impl Into<String>, type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::empty(name, type_name)
        }
    }

    /// Connection to an upstream node
    pub fn node(name: impl Into<String>, type_name: impl Into<String>, nodename: impl Into<String>) -> Self {
        Self {
            nodename: Some(nodename.into()),
            ..Self::empty(name, type_name)
        }
    }

    /// Connection to a graph interface input
    pub fn interface(
        name: impl Into<String>,
        type_name: impl Into<String>,
        interfacename: impl Into<String>,
    ) -> Self {
        Self {
            interfacename: Some(interfacename.into()),
            ..Self::empty(name, type_name)
        }
    }

    /// Set the channel swizzle
    pub fn with_channels(mut self, channels: impl Into<String>) -> Self {
        self.channels = Some(channels.into());
        self
    }

    fn empty(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: None,
            nodename: None,
            output: None,
            interfacename: None,
            channels: None,
        }
    }
}

/// Node instance in a graph or at document level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    /// Instance name, unique within its graph
    pub name: String,
    /// Node category
    pub category: String,
    /// Output type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Explicit nodedef
    #[serde(default)]
    pub nodedef: Option<String>,
    /// Input bindings
    #[serde(default)]
    pub inputs: Vec<InputBinding>,
}

impl NodeInstance {
    /// Create an instance with no bindings
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            type_name: type_name.into(),
            nodedef: None,
            inputs: Vec::new(),
        }
    }

    /// Add an input binding
    pub fn with_input(mut self, input: InputBinding) -> Self {
        self.inputs.push(input);
        self
    }

    /// Find an input binding by name
    pub fn input(&self, name: &str) -> Option<&InputBinding> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// Node graph: a network of node instances with declared outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGraph {
    /// Graph name
    pub name: String,
    /// Nodedef this graph implements (compound graphs only)
    #[serde(default)]
    pub nodedef: Option<String>,
    /// Interface inputs
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    /// Node instances
    #[serde(default)]
    pub nodes: Vec<NodeInstance>,
    /// Declared outputs
    #[serde(default)]
    pub outputs: Vec<GraphOutput>,
}

impl NodeGraph {
    /// Create an empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodedef: None,
            inputs: Vec::new(),
            nodes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Find a node instance by name
    pub fn node(&self, name: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Material document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Document name
    pub name: String,
    /// Node definitions
    pub nodedefs: Vec<NodeDef>,
    /// Source-code implementations
    pub implementations: Vec<Implementation>,
    /// Node graphs
    pub nodegraphs: Vec<NodeGraph>,
    /// Top-level node instances
    pub nodes: Vec<NodeInstance>,
}

impl Document {
    /// Create an empty document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Load a document from a file
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&contents).map_err(|e| CoreError::DocumentParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save the document to a file
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents = self.to_ron().map_err(|e| CoreError::DocumentParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, contents).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find a nodedef by name
    pub fn nodedef(&self, name: &str) -> Option<&NodeDef> {
        self.nodedefs.iter().find(|nd| nd.name == name)
    }

    /// Resolve the nodedef for a node instance: the explicit `nodedef`
    /// attribute, else the first nodedef whose category and output type
    /// match.
    pub fn resolve_nodedef(&self, node: &NodeInstance) -> Option<&NodeDef> {
        if let Some(name) = &node.nodedef {
            return self.nodedef(name);
        }
        self.nodedefs
            .iter()
            .find(|nd| nd.node == node.category && nd.output_type() == Some(node.type_name.as_str()))
    }

    /// Find the source implementation of a nodedef for a language.
    ///
    /// An implementation whose target matches exactly wins over one with
    /// an empty (wildcard) target.
    pub fn source_implementation(&self, nodedef: &str, language: &str, target: &str) -> Option<&Implementation> {
        let candidates = self
            .implementations
            .iter()
            .filter(|i| i.nodedef == nodedef && i.language == language);
        let mut fallback = None;
        for implementation in candidates {
            if implementation.target == target {
                return Some(implementation);
            }
            if implementation.target.is_empty() && fallback.is_none() {
                fallback = Some(implementation);
            }
        }
        fallback
    }

    /// Find a node graph by name
    pub fn nodegraph(&self, name: &str) -> Option<&NodeGraph> {
        self.nodegraphs.iter().find(|g| g.name == name)
    }

    /// Find the node graph implementing a nodedef
    pub fn nodegraph_for_nodedef(&self, nodedef: &str) -> Option<&NodeGraph> {
        self.nodegraphs
            .iter()
            .find(|g| g.nodedef.as_deref() == Some(nodedef))
    }

    /// Find a top-level node instance by name
    pub fn node(&self, name: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Import the elements of a library document.
    ///
    /// Elements whose name already exists are skipped; their descriptions
    /// are returned.
    pub fn import_library(&mut self, library: &Document) -> Vec<String> {
        let mut conflicts = Vec::new();

        for nodedef in &library.nodedefs {
            if self.nodedef(&nodedef.name).is_some() {
                conflicts.push(format!("nodedef '{}'", nodedef.name));
            } else {
                self.nodedefs.push(nodedef.clone());
            }
        }
        for implementation in &library.implementations {
            if self.implementations.iter().any(|i| i.name == implementation.name) {
                conflicts.push(format!("implementation '{}'", implementation.name));
            } else {
                self.implementations.push(implementation.clone());
            }
        }
        for graph in &library.nodegraphs {
            if self.nodegraph(&graph.name).is_some() {
                conflicts.push(format!("nodegraph '{}'", graph.name));
            } else {
                self.nodegraphs.push(graph.clone());
            }
        }
        for node in &library.nodes {
            if self.node(&node.name).is_some() {
                conflicts.push(format!("node '{}'", node.name));
            } else {
                self.nodes.push(node.clone());
            }
        }

        conflicts
    }
}
