// SPDX-License-Identifier: MIT OR Apache-2.0
//! Topological scheduling and scope propagation.

use crate::error::{GenError, GenResult};
use crate::graph::ShaderGraph;
use crate::node::NodeId;
use crate::port::PortOwner;
use crate::scope::{branch_bit, ScopeInfo};
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl ShaderGraph {
    /// Order nodes so every node comes after the nodes it depends on.
    ///
    /// Traversal starts at each output socket in order and visits inputs
    /// in declaration order; nodes not reachable from a socket follow in
    /// insertion order. The schedule replaces the graph's node order.
    pub fn topological_sort(&mut self) -> GenResult<()> {
        let mut marks = HashMap::new();
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.node_count());

        let roots: Vec<NodeId> = self
            .output_sockets()
            .iter()
            .filter_map(|s| s.connection.and_then(|c| c.node_id()))
            .chain(self.node_ids())
            .collect();

        for id in roots {
            self.visit(id, &mut marks, &mut path, &mut order)?;
        }

        self.set_node_order(&order);
        tracing::debug!("Scheduled {} nodes in graph '{}'", order.len(), self.name);
        Ok(())
    }

    fn visit(
        &self,
        node_id: NodeId,
        marks: &mut HashMap<NodeId, Mark>,
        path: &mut Vec<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> GenResult<()> {
        match marks.get(&node_id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|id| *id == node_id).unwrap_or(0);
                let chain = path[start..]
                    .iter()
                    .chain(std::iter::once(&node_id))
                    .filter_map(|id| self.node(*id).map(|n| n.name.clone()))
                    .collect();
                return Err(GenError::CycleDetected {
                    graph: self.name.clone(),
                    chain,
                });
            }
            None => {}
        }

        let Some(node) = self.node(node_id) else {
            return Ok(());
        };

        marks.insert(node_id, Mark::InProgress);
        path.push(node_id);

        for input in &node.inputs {
            if let Some(PortOwner::Node(upstream)) = input.connection.map(|c| c.owner) {
                self.visit(upstream, marks, path, order)?;
            }
        }

        path.pop();
        marks.insert(node_id, Mark::Done);
        order.push(node_id);
        Ok(())
    }

    /// Compute the execution scope of every node.
    ///
    /// Walks the schedule backwards so each consumer is final before its
    /// producers. Must run after [`topological_sort`](Self::topological_sort).
    pub fn calculate_scopes(&mut self) {
        let ids: Vec<NodeId> = self.node_ids().collect();
        for id in &ids {
            if let Some(node) = self.node_mut(*id) {
                node.scope = ScopeInfo::Unknown;
            }
        }

        let roots: Vec<NodeId> = self
            .output_sockets()
            .iter()
            .filter_map(|s| s.connection.and_then(|c| c.node_id()))
            .collect();
        for id in roots {
            if let Some(node) = self.node_mut(id) {
                node.scope.merge(&ScopeInfo::Global);
            }
        }

        for id in ids.iter().rev() {
            let Some(node) = self.node_mut(*id) else {
                continue;
            };
            if node.scope == ScopeInfo::Unknown {
                node.scope = ScopeInfo::Global;
            }
            let scope = node.scope;
            let branch_mask = node.branch_mask();

            let upstream: Vec<(usize, NodeId)> = node
                .inputs
                .iter()
                .enumerate()
                .filter_map(|(index, input)| input.connection.and_then(|c| c.node_id()).map(|up| (index, up)))
                .collect();

            for (index, upstream_id) in upstream {
                let contribution = match branch_mask {
                    Some(full_mask) if full_mask & branch_bit(index) != 0 => {
                        scope.adjusted_at_conditional_input(*id, index, full_mask)
                    }
                    _ => scope,
                };
                if let Some(up) = self.node_mut(upstream_id) {
                    up.scope.merge(&contribution);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implementation::Implementation;
    use crate::node::{Classification, ShaderNode};
    use crate::port::{PortRef, ShaderInput, ShaderOutput};
    use ordoplay_materialx_core::types;

    fn node(name: &str) -> ShaderNode {
        ShaderNode::new(name, "add", "ND_add_float", Implementation::inline("ND_add_float", "{{in1}} + {{in2}}"))
            .with_input(ShaderInput::new("in1", &types::FLOAT))
            .with_input(ShaderInput::new("in2", &types::FLOAT))
            .with_output(ShaderOutput::new("out", &types::FLOAT))
    }

    fn conditional(name: &str) -> ShaderNode {
        ShaderNode::new(name, "ifgreater", "ND_ifgreater_float", Implementation::inline("ND_ifgreater_float", "0.0"))
            .with_classification(Classification::TEXTURE | Classification::CONDITIONAL)
            .with_input(ShaderInput::new("value1", &types::FLOAT))
            .with_input(ShaderInput::new("value2", &types::FLOAT))
            .with_input(ShaderInput::new("in1", &types::FLOAT))
            .with_input(ShaderInput::new("in2", &types::FLOAT))
            .with_output(ShaderOutput::new("out", &types::FLOAT))
    }

    fn names(graph: &ShaderGraph) -> Vec<&str> {
        graph.nodes().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_schedule_respects_dependencies() {
        let mut graph = ShaderGraph::new("g");
        let out = graph.add_node(node("out"));
        let b = graph.add_node(node("b"));
        let a = graph.add_node(node("a"));
        let stray = graph.add_node(node("stray"));
        graph.add_output_socket("result", &types::FLOAT);
        graph.connect(PortRef::node(out, 0), PortRef::socket(0)).unwrap();
        graph.connect(PortRef::node(b, 0), PortRef::node(out, 0)).unwrap();
        graph.connect(PortRef::node(a, 0), PortRef::node(b, 0)).unwrap();
        graph.connect(PortRef::node(a, 0), PortRef::node(out, 1)).unwrap();

        graph.topological_sort().unwrap();
        assert_eq!(names(&graph), vec!["a", "b", "out", "stray"]);

        graph.calculate_scopes();
        for id in [out, b, a, stray] {
            assert_eq!(graph.node(id).unwrap().scope, ScopeInfo::Global);
        }
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = ShaderGraph::new("g");
        let a = graph.add_node(node("A"));
        let b = graph.add_node(node("B"));
        graph.add_output_socket("out", &types::FLOAT);
        graph.connect(PortRef::node(a, 0), PortRef::socket(0)).unwrap();
        graph.connect(PortRef::node(b, 0), PortRef::node(a, 0)).unwrap();
        graph.connect(PortRef::node(a, 0), PortRef::node(b, 0)).unwrap();

        let err = graph.topological_sort().unwrap_err();
        assert_eq!(err.kind(), ordoplay_materialx_core::ErrorKind::CycleDetected);
        match err {
            GenError::CycleDetected { chain, .. } => assert_eq!(chain, vec!["A", "B", "A"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_branch_scopes() {
        let mut graph = ShaderGraph::new("g");
        let cond = graph.add_node(conditional("cond"));
        let left = graph.add_node(node("left"));
        let right = graph.add_node(node("right"));
        let shared = graph.add_node(node("shared"));
        let test = graph.add_node(node("test"));
        graph.add_output_socket("out", &types::FLOAT);
        graph.connect(PortRef::node(cond, 0), PortRef::socket(0)).unwrap();
        graph.connect(PortRef::node(test, 0), PortRef::node(cond, 0)).unwrap();
        graph.connect(PortRef::node(left, 0), PortRef::node(cond, 2)).unwrap();
        graph.connect(PortRef::node(right, 0), PortRef::node(cond, 3)).unwrap();
        graph.connect(PortRef::node(shared, 0), PortRef::node(left, 0)).unwrap();
        graph.connect(PortRef::node(shared, 0), PortRef::node(right, 0)).unwrap();

        graph.topological_sort().unwrap();
        graph.calculate_scopes();

        assert_eq!(graph.node(test).unwrap().scope, ScopeInfo::Global);
        assert_eq!(
            graph.node(left).unwrap().scope,
            ScopeInfo::Single {
                conditional: cond,
                mask: 0b0100,
                full_mask: 0b1100
            }
        );
        assert!(graph.node(right).unwrap().scope.used_by_branch(cond, 3));
        // Used by both branches of the same conditional
        assert_eq!(graph.node(shared).unwrap().scope, ScopeInfo::Global);
    }
}
