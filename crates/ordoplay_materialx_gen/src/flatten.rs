// SPDX-License-Identifier: MIT OR Apache-2.0
//! Inlining compound nodes into their parent graph.

use crate::error::GenResult;
use crate::graph::ShaderGraph;
use crate::implementation::Implementation;
use crate::node::{NodeId, ShaderNode};
use crate::port::{PortOwner, PortRef};
use ordoplay_materialx_core::{CoreError, TypeRef, Value};
use std::collections::HashMap;

/// Channels reading through `first` and then `second`, where
/// `intermediate` is the type `first` produces
fn compose_channels(first: Option<&str>, second: Option<&str>, intermediate: TypeRef) -> GenResult<Option<String>> {
    let (Some(first), Some(second)) = (first, second) else {
        return Ok(second.or(first).map(String::from));
    };
    let composed = second
        .chars()
        .map(|channel| {
            intermediate
                .channel_index(channel)
                .and_then(|index| first.chars().nth(index))
                .ok_or_else(|| CoreError::InvalidChannel {
                    type_name: intermediate.name().to_string(),
                    channel,
                })
        })
        .collect::<Result<String, _>>()?;
    Ok(Some(composed))
}

/// Literal for an input of type `target`, picked through `channels`
fn literal_for(value: Option<&Value>, channels: Option<&str>, target: TypeRef) -> GenResult<Option<Value>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match channels {
        Some(channels) => Ok(Some(value.swizzle(channels, target)?)),
        None if value.type_desc() == target => Ok(Some(value.clone())),
        None => Err(CoreError::TypeMismatch {
            expected: target.name().to_string(),
            got: value.type_desc().name().to_string(),
        }
        .into()),
    }
}

impl ShaderGraph {
    /// Replace every compound node with the nodes of its graph, until no
    /// compounds remain.
    ///
    /// Inner nodes are renamed `<compound>_<inner>` (made unique). Inner
    /// inputs wired to the compound's input sockets take over the
    /// compound input's connection or literal value; consumers of the
    /// compound's outputs are rewired to the inner producers. Channel
    /// swizzles on both sides of a socket are composed, and literals are
    /// swizzled to the receiving input's type. The graph's own sockets
    /// are unchanged. Running it again is a no-op.
    pub fn flatten_subgraphs(&mut self) -> GenResult<()> {
        loop {
            let Some(id) = self
                .nodes()
                .find(|n| n.implementation.is_compound())
                .map(|n| n.id)
            else {
                break;
            };
            self.inline_compound(id)?;
        }
        Ok(())
    }

    fn inline_compound(&mut self, compound_id: NodeId) -> GenResult<()> {
        let Some(compound) = self.remove_node(compound_id) else {
            return Ok(());
        };
        let Implementation::Compound(implementation) = &compound.implementation else {
            return Ok(());
        };
        let subgraph = &implementation.graph;

        let mut id_map = HashMap::new();
        for inner in subgraph.nodes() {
            let mut node = inner.clone();
            node.id = NodeId::new();
            node.name = self.unique_node_name(&format!("{}_{}", compound.name, inner.name));
            for input in &mut node.inputs {
                input.connection = None;
            }
            for output in &mut node.outputs {
                output.connections.clear();
            }
            id_map.insert(inner.id, node.id);
            self.add_node(node);
        }

        for inner in subgraph.nodes() {
            let Some(&new_id) = id_map.get(&inner.id) else {
                continue;
            };
            for (index, input) in inner.inputs.iter().enumerate() {
                let Some(upstream) = input.connection else {
                    continue;
                };
                let downstream = PortRef::node(new_id, index);
                match upstream.owner {
                    PortOwner::Node(old) => {
                        if let Some(&new_upstream) = id_map.get(&old) {
                            self.link(PortRef::node(new_upstream, upstream.index), downstream);
                        }
                    }
                    PortOwner::Graph => self.bind_compound_input(&compound, subgraph, upstream.index, downstream)?,
                }
            }
        }

        for (index, output) in compound.outputs.iter().enumerate() {
            let Some(socket) = subgraph.output_sockets().get(index) else {
                continue;
            };
            for downstream in &output.connections {
                let Some(input) = self.input_mut(*downstream) else {
                    continue;
                };
                input.channels = compose_channels(socket.channels.as_deref(), input.channels.as_deref(), socket.type_desc)?;
                match socket.connection {
                    Some(PortRef {
                        owner: PortOwner::Node(old),
                        index: output_index,
                    }) => {
                        if let Some(&new_upstream) = id_map.get(&old) {
                            self.link(PortRef::node(new_upstream, output_index), *downstream);
                        }
                    }
                    Some(PortRef {
                        owner: PortOwner::Graph,
                        index: socket_index,
                    }) => self.bind_compound_input(&compound, subgraph, socket_index, *downstream)?,
                    None => {
                        input.value = literal_for(socket.value.as_ref(), input.channels.as_deref(), input.type_desc)?;
                        input.channels = None;
                    }
                }
            }
        }

        tracing::debug!(
            "Flattened compound '{}' into {} nodes in graph '{}'",
            compound.name,
            subgraph.node_count(),
            self.name
        );
        Ok(())
    }

    /// Wire `downstream` to whatever feeds the compound input matching
    /// input socket `socket_index` of the compound's graph
    fn bind_compound_input(
        &mut self,
        compound: &ShaderNode,
        subgraph: &ShaderGraph,
        socket_index: usize,
        downstream: PortRef,
    ) -> GenResult<()> {
        let Some(socket) = subgraph.input_sockets().get(socket_index) else {
            return Ok(());
        };
        let Some(input) = self.input_mut(downstream) else {
            return Ok(());
        };
        let Some(outer) = compound.input(&socket.name) else {
            input.value = literal_for(socket.value.as_ref(), input.channels.as_deref(), input.type_desc)?;
            input.channels = None;
            return Ok(());
        };

        match outer.connection {
            Some(upstream) => {
                input.channels = compose_channels(outer.channels.as_deref(), input.channels.as_deref(), outer.type_desc)?;
                self.link(upstream, downstream);
            }
            None => {
                input.value = literal_for(outer.value.as_ref(), input.channels.as_deref(), input.type_desc)?;
                if input.channels.take().is_none() {
                    input.path = outer.path.clone();
                }
                input.uniform |= outer.uniform;
            }
        }
        Ok(())
    }
}
