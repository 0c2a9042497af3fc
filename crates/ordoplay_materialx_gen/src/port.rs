// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed ports and connection handles.

use crate::node::NodeId;
use indexmap::IndexSet;
use ordoplay_materialx_core::{TypeRef, Value};

/// Owner of a port: the graph itself (a boundary socket) or a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortOwner {
    /// Graph boundary socket
    Graph,
    /// Node in the arena
    Node(NodeId),
}

/// Handle to a port.
///
/// When the handle names an output, `Graph` means an input socket; when
/// it names an input, `Graph` means an output socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    /// Owner of the port
    pub owner: PortOwner,
    /// Index in the owner's input or output list
    pub index: usize,
}

impl PortRef {
    /// Port on a node
    pub fn node(id: NodeId, index: usize) -> Self {
        Self {
            owner: PortOwner::Node(id),
            index,
        }
    }

    /// Boundary socket
    pub fn socket(index: usize) -> Self {
        Self {
            owner: PortOwner::Graph,
            index,
        }
    }

    /// Node that owns the port, if any
    pub fn node_id(&self) -> Option<NodeId> {
        match self.owner {
            PortOwner::Node(id) => Some(id),
            PortOwner::Graph => None,
        }
    }
}

/// Input port: a literal value or a connection to one output
#[derive(Debug, Clone)]
pub struct ShaderInput {
    /// Port name
    pub name: String,
    /// Port type
    pub type_desc: TypeRef,
    /// Literal value; cleared when connected
    pub value: Option<Value>,
    /// Upstream output
    pub connection: Option<PortRef>,
    /// Channel swizzle applied to the upstream output
    pub channels: Option<String>,
    /// Whether the input is a uniform
    pub uniform: bool,
    /// Element path in the source document
    pub path: String,
    /// Generated variable name (published uniforms and output sockets)
    pub variable: String,
}

impl ShaderInput {
    /// Create an unconnected input with no value
    pub fn new(name: impl Into<String>, type_desc: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_desc,
            value: None,
            connection: None,
            channels: None,
            uniform: false,
            path: String::new(),
            variable: String::new(),
        }
    }

    /// Set the literal value
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Whether the input is connected
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

/// Output port; also used for graph input sockets, which act as value
/// sources inside the graph
#[derive(Debug, Clone)]
pub struct ShaderOutput {
    /// Port name
    pub name: String,
    /// Port type
    pub type_desc: TypeRef,
    /// Downstream inputs in connection order
    pub connections: IndexSet<PortRef>,
    /// Generated variable name
    pub variable: String,
    /// Default value (input sockets only)
    pub value: Option<Value>,
    /// Whether the socket is a uniform (input sockets only)
    pub uniform: bool,
    /// Element path in the source document (input sockets only)
    pub path: String,
}

impl ShaderOutput {
    /// Create an output with no connections
    pub fn new(name: impl Into<String>, type_desc: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_desc,
            connections: IndexSet::new(),
            variable: String::new(),
            value: None,
            uniform: false,
            path: String::new(),
        }
    }
}
