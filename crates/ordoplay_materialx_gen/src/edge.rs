// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lazy upstream traversal.

use crate::error::{GenError, GenResult};
use crate::graph::ShaderGraph;
use crate::node::NodeId;
use crate::port::{PortOwner, PortRef};
use std::collections::HashSet;

/// A connection between an upstream output and a downstream input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Output handle
    pub upstream: PortRef,
    /// Input handle
    pub downstream: PortRef,
}

/// Depth-first iterator over the edges upstream of an input.
///
/// Edges are produced lazily. Reaching a node that is already on the
/// current path yields a [`GenError::CycleDetected`] and ends iteration.
pub struct UpstreamEdges<'a> {
    graph: &'a ShaderGraph,
    start: Option<PortRef>,
    stack: Vec<(NodeId, usize)>,
    done: bool,
}

impl<'a> UpstreamEdges<'a> {
    fn enter(&mut self, edge: Edge) -> Option<GenResult<Edge>> {
        if let PortOwner::Node(id) = edge.upstream.owner {
            if let Some(pos) = self.stack.iter().position(|(n, _)| *n == id) {
                self.done = true;
                let mut chain: Vec<String> = self.stack[pos..]
                    .iter()
                    .filter_map(|(n, _)| self.graph.node(*n).map(|n| n.name.clone()))
                    .collect();
                if let Some(node) = self.graph.node(id) {
                    chain.push(node.name.clone());
                }
                return Some(Err(GenError::CycleDetected {
                    graph: self.graph.name.clone(),
                    chain,
                }));
            }
            self.stack.push((id, 0));
        }
        Some(Ok(edge))
    }
}

impl Iterator for UpstreamEdges<'_> {
    type Item = GenResult<Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(start) = self.start.take() {
            let upstream = self.graph.input(start)?.connection?;
            return self.enter(Edge {
                upstream,
                downstream: start,
            });
        }

        while let Some((id, next_input)) = self.stack.last_mut() {
            let id = *id;
            let Some(node) = self.graph.node(id) else {
                self.stack.pop();
                continue;
            };
            if *next_input >= node.inputs.len() {
                self.stack.pop();
                continue;
            }
            let index = *next_input;
            *next_input += 1;

            if let Some(upstream) = node.inputs[index].connection {
                return self.enter(Edge {
                    upstream,
                    downstream: PortRef::node(id, index),
                });
            }
        }

        self.done = true;
        None
    }
}

impl ShaderGraph {
    /// Iterate the edges upstream of an input, depth first
    pub fn upstream_edges(&self, input: PortRef) -> UpstreamEdges<'_> {
        UpstreamEdges {
            graph: self,
            start: Some(input),
            stack: Vec::new(),
            done: false,
        }
    }

    /// Nodes reachable upstream of the output sockets
    pub fn reachable_nodes(&self) -> GenResult<HashSet<NodeId>> {
        let mut reachable = HashSet::new();
        for index in 0..self.output_sockets().len() {
            for edge in self.upstream_edges(PortRef::socket(index)) {
                if let Some(id) = edge?.upstream.node_id() {
                    reachable.insert(id);
                }
            }
        }
        Ok(reachable)
    }
}
