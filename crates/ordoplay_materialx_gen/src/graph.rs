// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader graph: a node arena with boundary sockets.

use crate::error::{GenError, GenResult};
use crate::generator::ShaderGenerator;
use crate::node::{Classification, NodeId, ShaderNode};
use crate::port::{PortOwner, PortRef, ShaderInput, ShaderOutput};
use indexmap::IndexMap;
use ordoplay_materialx_core::TypeRef;
use std::collections::HashSet;

/// A shader graph
#[derive(Debug, Clone)]
pub struct ShaderGraph {
    /// Graph name
    pub name: String,
    /// Nodedef the graph implements, for compound graphs
    pub nodedef: Option<String>,
    /// Classification of the node driving the first output socket
    pub classification: Classification,
    /// Nodes, in schedule order once sorted
    nodes: IndexMap<NodeId, ShaderNode>,
    /// External inputs; value sources inside the graph
    input_sockets: Vec<ShaderOutput>,
    /// External outputs; sinks inside the graph
    output_sockets: Vec<ShaderInput>,
}

impl ShaderGraph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodedef: None,
            classification: Classification::TEXTURE,
            nodes: IndexMap::new(),
            input_sockets: Vec::new(),
            output_sockets: Vec::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: ShaderNode) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<ShaderNode> {
        let node = self.nodes.shift_remove(&node_id)?;

        for (index, input) in node.inputs.iter().enumerate() {
            if let Some(upstream) = input.connection {
                if let Some(output) = self.output_mut(upstream) {
                    output.connections.shift_remove(&PortRef::node(node_id, index));
                }
            }
        }
        for output in &node.outputs {
            for downstream in &output.connections {
                if let Some(input) = self.input_mut(*downstream) {
                    input.connection = None;
                }
            }
        }
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&ShaderNode> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut ShaderNode> {
        self.nodes.get_mut(&node_id)
    }

    /// Find a node by name
    pub fn node_by_name(&self, name: &str) -> Option<&ShaderNode> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Get all nodes in order
    pub fn nodes(&self) -> impl Iterator<Item = &ShaderNode> {
        self.nodes.values()
    }

    /// Get all node IDs in order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Replace the node order. Every node must appear exactly once.
    pub(crate) fn set_node_order(&mut self, order: &[NodeId]) {
        let mut reordered = IndexMap::with_capacity(self.nodes.len());
        for id in order {
            if let Some(node) = self.nodes.shift_remove(id) {
                reordered.insert(*id, node);
            }
        }
        reordered.extend(self.nodes.drain(..));
        self.nodes = reordered;
    }

    /// Name not used by any node, derived from `base`
    pub fn unique_node_name(&self, base: &str) -> String {
        let used: HashSet<&str> = self.nodes.values().map(|n| n.name.as_str()).collect();
        if !used.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}{i}"))
            .find(|candidate| !used.contains(candidate.as_str()))
            .unwrap_or_else(|| base.to_string())
    }

    /// Add an external input
    pub fn add_input_socket(&mut self, name: impl Into<String>, type_desc: TypeRef) -> usize {
        self.input_sockets.push(ShaderOutput::new(name, type_desc));
        self.input_sockets.len() - 1
    }

    /// Add an external output
    pub fn add_output_socket(&mut self, name: impl Into<String>, type_desc: TypeRef) -> usize {
        self.output_sockets.push(ShaderInput::new(name, type_desc));
        self.output_sockets.len() - 1
    }

    /// External inputs
    pub fn input_sockets(&self) -> &[ShaderOutput] {
        &self.input_sockets
    }

    /// External outputs
    pub fn output_sockets(&self) -> &[ShaderInput] {
        &self.output_sockets
    }

    /// Index of an input socket by name
    pub fn input_socket_index(&self, name: &str) -> Option<usize> {
        self.input_sockets.iter().position(|s| s.name == name)
    }

    /// Index of an output socket by name
    pub fn output_socket_index(&self, name: &str) -> Option<usize> {
        self.output_sockets.iter().position(|s| s.name == name)
    }

    /// Resolve a handle to an output (node output or input socket)
    pub fn output(&self, port: PortRef) -> Option<&ShaderOutput> {
        match port.owner {
            PortOwner::Graph => self.input_sockets.get(port.index),
            PortOwner::Node(id) => self.nodes.get(&id)?.outputs.get(port.index),
        }
    }

    /// Resolve a handle to a mutable output
    pub fn output_mut(&mut self, port: PortRef) -> Option<&mut ShaderOutput> {
        match port.owner {
            PortOwner::Graph => self.input_sockets.get_mut(port.index),
            PortOwner::Node(id) => self.nodes.get_mut(&id)?.outputs.get_mut(port.index),
        }
    }

    /// Resolve a handle to an input (node input or output socket)
    pub fn input(&self, port: PortRef) -> Option<&ShaderInput> {
        match port.owner {
            PortOwner::Graph => self.output_sockets.get(port.index),
            PortOwner::Node(id) => self.nodes.get(&id)?.inputs.get(port.index),
        }
    }

    /// Resolve a handle to a mutable input
    pub fn input_mut(&mut self, port: PortRef) -> Option<&mut ShaderInput> {
        match port.owner {
            PortOwner::Graph => self.output_sockets.get_mut(port.index),
            PortOwner::Node(id) => self.nodes.get_mut(&id)?.inputs.get_mut(port.index),
        }
    }

    /// Human-readable name of a port for messages
    pub fn port_label(&self, port: PortRef, is_input: bool) -> String {
        let owner = match port.owner {
            PortOwner::Graph => self.name.clone(),
            PortOwner::Node(id) => self
                .nodes
                .get(&id)
                .map_or_else(|| format!("{id:?}"), |n| n.name.clone()),
        };
        let port_name = if is_input {
            self.input(port).map(|p| p.name.clone())
        } else {
            self.output(port).map(|p| p.name.clone())
        };
        format!("{owner}.{}", port_name.unwrap_or_else(|| port.index.to_string()))
    }

    /// Connect an output to an input.
    ///
    /// The input's type must equal the output's type, or the input's
    /// channel swizzle must select a valid value of the input's type from
    /// the output. Any previous connection of the input is replaced and
    /// its literal value is cleared.
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> GenResult<()> {
        let from_type = self
            .output(from)
            .ok_or_else(|| GenError::PortNotFound {
                owner: self.name.clone(),
                port: self.port_label(from, false),
            })?
            .type_desc;
        let input = self.input(to).ok_or_else(|| GenError::PortNotFound {
            owner: self.name.clone(),
            port: self.port_label(to, true),
        })?;

        let compatible = match &input.channels {
            Some(channels) => {
                channels.chars().all(|c| from_type.channel_index(c).is_some())
                    && channels.chars().count() == input.type_desc.size()
            }
            None => from_type == input.type_desc,
        };
        if !compatible {
            return Err(GenError::IncompatiblePorts {
                from: self.port_label(from, false),
                from_type: from_type.name().to_string(),
                to: self.port_label(to, true),
                to_type: input.type_desc.name().to_string(),
            });
        }

        self.disconnect(to);
        self.link(from, to);
        Ok(())
    }

    /// Connect without type checks; both ports must exist
    pub(crate) fn link(&mut self, from: PortRef, to: PortRef) {
        if let Some(input) = self.input_mut(to) {
            input.connection = Some(from);
            input.value = None;
        }
        if let Some(output) = self.output_mut(from) {
            output.connections.insert(to);
        }
    }

    /// Break the connection of an input, if any
    pub fn disconnect(&mut self, to: PortRef) {
        let upstream = self.input_mut(to).and_then(|input| input.connection.take());
        if let Some(from) = upstream {
            if let Some(output) = self.output_mut(from) {
                output.connections.shift_remove(&to);
            }
        }
    }

    /// Assign variable names to outputs, sockets and, when `publish` is
    /// set, to unconnected uniform node inputs.
    ///
    /// Previously assigned names are discarded. Input sockets and published
    /// inputs get the generator's per-type suffix.
    pub fn assign_variables(&mut self, generator: &dyn ShaderGenerator, publish: bool) {
        let syntax = generator.syntax();
        let mut identifiers = HashSet::new();

        for socket in &mut self.input_sockets {
            let name = format!("{}{}", socket.name, generator.variable_suffix(socket.type_desc));
            socket.variable = syntax.make_valid_name(&name, &mut identifiers);
        }
        for socket in &mut self.output_sockets {
            socket.variable = syntax.make_valid_name(&socket.name, &mut identifiers);
        }
        for node in self.nodes.values_mut() {
            for output in &mut node.outputs {
                output.variable = syntax.make_valid_name(&format!("{}_{}", node.name, output.name), &mut identifiers);
            }
            for input in &mut node.inputs {
                input.variable = if publish && input.uniform && !input.is_connected() {
                    let name = format!(
                        "{}_{}{}",
                        node.name,
                        input.name,
                        generator.variable_suffix(input.type_desc)
                    );
                    syntax.make_valid_name(&name, &mut identifiers)
                } else {
                    String::new()
                };
            }
        }
    }

    /// Types used by any port of the graph
    pub fn used_types(&self) -> Vec<TypeRef> {
        let mut types: Vec<TypeRef> = Vec::new();
        let mut add = |ty: TypeRef| {
            if !types.contains(&ty) {
                types.push(ty);
            }
        };
        self.input_sockets.iter().for_each(|s| add(s.type_desc));
        self.output_sockets.iter().for_each(|s| add(s.type_desc));
        for node in self.nodes.values() {
            node.inputs.iter().for_each(|i| add(i.type_desc));
            node.outputs.iter().for_each(|o| add(o.type_desc));
        }
        types
    }
}

impl Default for ShaderGraph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
