// SPDX-License-Identifier: MIT OR Apache-2.0
//! Building shader graphs from documents.

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::generator::ShaderGenerator;
use crate::graph::ShaderGraph;
use crate::implementation::{CompoundImpl, Implementation, SourceCodeImpl};
use crate::node::{Classification, NodeId, ShaderNode};
use crate::port::{PortRef, ShaderInput, ShaderOutput};
use crate::scope::MAX_CONDITIONAL_INPUTS;
use ordoplay_materialx_core::document::{Document, InputBinding, NodeDef, NodeGraph, NodeInstance, PortDef};
use ordoplay_materialx_core::{CoreError, TypeDesc, TypeRef, Value};
use std::collections::{HashMap, HashSet};

fn resolve_type(generator: &dyn ShaderGenerator, type_name: &str) -> GenResult<TypeRef> {
    let type_desc = TypeDesc::get(type_name).ok_or_else(|| CoreError::UnknownType(type_name.to_string()))?;
    generator.syntax().type_syntax(type_desc)?;
    Ok(type_desc)
}

fn element_path(scope: &str, node: &str, port: &str) -> String {
    if scope.is_empty() {
        format!("{node}/{port}")
    } else {
        format!("{scope}/{node}/{port}")
    }
}

/// Find the implementation of a nodedef: a procedural node registered in
/// the generator, then a source implementation for the language (exact
/// target first, then wildcard), then a node graph.
fn resolve_implementation(
    nodedef: &NodeDef,
    document: &Document,
    generator: &dyn ShaderGenerator,
    ctx: &mut GenContext,
) -> GenResult<Implementation> {
    if let Some(procedural) = generator.procedural_node(&nodedef.node) {
        return Ok(Implementation::Procedural(procedural));
    }

    let target = ctx
        .options
        .target
        .clone()
        .unwrap_or_else(|| generator.target().to_string());
    if let Some(element) = document.source_implementation(&nodedef.name, generator.language(), &target) {
        if element.target != target {
            tracing::debug!(
                "Using implementation '{}' for '{}': no exact match for target '{}'",
                element.name,
                nodedef.name,
                target
            );
        }
        return Ok(Implementation::SourceCode(SourceCodeImpl::load(element, ctx)?));
    }

    if let Some(node_graph) = document.nodegraph_for_nodedef(&nodedef.name) {
        ctx.push_compound(&node_graph.name)?;
        let built = ShaderGraph::from_node_graph(node_graph, document, generator, ctx);
        ctx.pop_compound();
        let graph = built?;
        let function = generator
            .syntax()
            .make_valid_name(&node_graph.name, &mut HashSet::new());
        return Ok(Implementation::Compound(CompoundImpl {
            name: node_graph.name.clone(),
            function,
            graph: Box::new(graph),
        }));
    }

    Err(GenError::MissingImplementation {
        nodedef: nodedef.name.clone(),
        language: generator.language().to_string(),
        target,
    })
}

/// Create a node from an instance: resolve its nodedef and
/// implementation, then create ports with nodedef defaults overridden by
/// the instance's literal values.
fn create_node(
    instance: &NodeInstance,
    scope: &str,
    document: &Document,
    generator: &dyn ShaderGenerator,
    ctx: &mut GenContext,
) -> GenResult<ShaderNode> {
    let nodedef = document
        .resolve_nodedef(instance)
        .ok_or_else(|| GenError::UnresolvedNodeDef {
            node: instance.name.clone(),
            category: instance.category.clone(),
            type_name: instance.type_name.clone(),
        })?;

    let classification = Classification::from_nodedef(nodedef)?;
    if classification.intersects(Classification::CLOSURE | Classification::SHADER) && !generator.supports_closures() {
        return Err(GenError::Unsupported(format!(
            "Node '{}' of type '{}' cannot be generated by the {} generator: closures are not supported",
            instance.name,
            instance.type_name,
            generator.language()
        )));
    }

    let implementation = resolve_implementation(nodedef, document, generator, ctx)?;
    let mut node = ShaderNode::new(&instance.name, &nodedef.node, &nodedef.name, implementation)
        .with_classification(classification);

    for port in &nodedef.inputs {
        let type_desc = resolve_type(generator, &port.type_name)?;
        let mut input = ShaderInput::new(&port.name, type_desc);
        input.uniform = port.uniform;
        input.path = element_path(scope, &instance.name, &port.name);
        input.value = port.default_value()?;

        if let Some(binding) = instance.input(&port.name) {
            if binding.type_name != port.type_name {
                return Err(CoreError::TypeMismatch {
                    expected: port.type_name.clone(),
                    got: binding.type_name.clone(),
                }
                .into());
            }
            if let Some(text) = &binding.value {
                input.value = Some(Value::from_string(type_desc, text)?);
            }
        }
        node.inputs.push(input);
    }

    for port in &nodedef.outputs {
        node.outputs.push(ShaderOutput::new(&port.name, resolve_type(generator, &port.type_name)?));
    }

    if node.has_classification(Classification::CONDITIONAL) && node.inputs.len() > MAX_CONDITIONAL_INPUTS {
        return Err(GenError::Unsupported(format!(
            "Conditional node '{}' has {} inputs; at most {} are supported",
            instance.name,
            node.inputs.len(),
            MAX_CONDITIONAL_INPUTS
        )));
    }

    if let Some(unknown) = instance.inputs.iter().find(|b| node.input(&b.name).is_none()) {
        return Err(GenError::PortNotFound {
            owner: instance.name.clone(),
            port: unknown.name.clone(),
        });
    }

    Ok(node)
}

impl ShaderGraph {
    /// Build a graph from a document node graph.
    ///
    /// Interface inputs come from the graph's nodedef when it has one,
    /// else from its declared inputs. The graph is flattened (when
    /// enabled), scheduled and scoped before it is returned.
    pub fn from_node_graph(
        node_graph: &NodeGraph,
        document: &Document,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
    ) -> GenResult<Self> {
        let mut graph = Self::new(&node_graph.name);
        graph.nodedef = node_graph.nodedef.clone();

        let interface: &[PortDef] = match &node_graph.nodedef {
            Some(name) => {
                &document
                    .nodedef(name)
                    .ok_or_else(|| GenError::UnresolvedNodeDef {
                        node: node_graph.name.clone(),
                        category: "nodegraph".to_string(),
                        type_name: name.clone(),
                    })?
                    .inputs
            }
            None => &node_graph.inputs,
        };
        for port in interface {
            let path = format!("{}/{}", node_graph.name, port.name);
            graph.add_interface_input(port, path, generator)?;
        }
        for output in &node_graph.outputs {
            graph.add_output_socket(&output.name, resolve_type(generator, &output.type_name)?);
        }

        let mut ids: HashMap<&str, NodeId> = HashMap::new();
        for instance in &node_graph.nodes {
            let node = create_node(instance, &node_graph.name, document, generator, ctx)?;
            ids.insert(instance.name.as_str(), graph.add_node(node));
        }

        for instance in &node_graph.nodes {
            let id = graph.lookup(&ids, &instance.name)?;
            for binding in &instance.inputs {
                if let Some(nodename) = &binding.nodename {
                    let upstream = graph.lookup(&ids, nodename)?;
                    graph.bind(upstream, id, binding)?;
                } else if let Some(interface) = &binding.interfacename {
                    let socket = graph
                        .input_socket_index(interface)
                        .ok_or_else(|| GenError::PortNotFound {
                            owner: node_graph.name.clone(),
                            port: interface.clone(),
                        })?;
                    let downstream = graph.input_ref(id, &binding.name)?;
                    if let Some(input) = graph.input_mut(downstream) {
                        input.channels = binding.channels.clone();
                    }
                    graph.connect(PortRef::socket(socket), downstream)?;
                }
            }
        }

        for (index, output) in node_graph.outputs.iter().enumerate() {
            let upstream = graph.lookup(&ids, &output.nodename)?;
            let from = graph.output_ref(upstream, output.output.as_deref())?;
            if let Some(socket) = graph.input_mut(PortRef::socket(index)) {
                socket.channels = output.channels.clone();
            }
            graph.connect(from, PortRef::socket(index))?;
        }

        tracing::debug!("Resolved {} nodes in graph '{}'", graph.node_count(), graph.name);
        graph.finalize(generator, ctx)?;
        Ok(graph)
    }

    /// Build a graph around a single document-level node.
    ///
    /// Nodes upstream of it are pulled in from the document's top-level
    /// nodes. Every unconnected input of the node becomes an input socket
    /// and every output an output socket.
    pub fn from_node(
        instance: &NodeInstance,
        document: &Document,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
    ) -> GenResult<Self> {
        let mut graph = Self::new(&instance.name);
        let mut ids = HashMap::new();
        let root = graph.add_upstream(instance, document, generator, ctx, &mut ids)?;

        let (inputs, outputs) = match graph.node(root) {
            Some(node) => (node.inputs.clone(), node.outputs.clone()),
            None => (Vec::new(), Vec::new()),
        };
        for (index, input) in inputs.iter().enumerate().filter(|(_, i)| !i.is_connected()) {
            let socket = graph.add_input_socket(&input.name, input.type_desc);
            if let Some(source) = graph.output_mut(PortRef::socket(socket)) {
                source.value = input.value.clone();
                source.uniform = input.uniform;
                source.path = input.path.clone();
            }
            graph.connect(PortRef::socket(socket), PortRef::node(root, index))?;
        }
        for (index, output) in outputs.iter().enumerate() {
            let socket = graph.add_output_socket(&output.name, output.type_desc);
            graph.connect(PortRef::node(root, index), PortRef::socket(socket))?;
        }

        tracing::debug!("Resolved {} nodes for node '{}'", graph.node_count(), instance.name);
        graph.finalize(generator, ctx)?;
        Ok(graph)
    }

    fn add_upstream(
        &mut self,
        instance: &NodeInstance,
        document: &Document,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
        ids: &mut HashMap<String, NodeId>,
    ) -> GenResult<NodeId> {
        if let Some(id) = ids.get(&instance.name) {
            return Ok(*id);
        }
        let node = create_node(instance, "", document, generator, ctx)?;
        let id = self.add_node(node);
        ids.insert(instance.name.clone(), id);

        for binding in &instance.inputs {
            let Some(nodename) = &binding.nodename else {
                continue;
            };
            let upstream_instance = document.node(nodename).ok_or_else(|| GenError::NodeNotFound {
                graph: document.name.clone(),
                node: nodename.clone(),
            })?;
            let upstream = self.add_upstream(upstream_instance, document, generator, ctx, ids)?;
            self.bind(upstream, id, binding)?;
        }
        Ok(id)
    }

    fn add_interface_input(&mut self, port: &PortDef, path: String, generator: &dyn ShaderGenerator) -> GenResult<()> {
        let type_desc = resolve_type(generator, &port.type_name)?;
        let index = self.add_input_socket(&port.name, type_desc);
        let value = port.default_value()?;
        if let Some(socket) = self.output_mut(PortRef::socket(index)) {
            socket.value = value;
            socket.uniform = port.uniform;
            socket.path = path;
        }
        Ok(())
    }

    fn lookup(&self, ids: &HashMap<&str, NodeId>, name: &str) -> GenResult<NodeId> {
        ids.get(name).copied().ok_or_else(|| GenError::NodeNotFound {
            graph: self.name.clone(),
            node: name.to_string(),
        })
    }

    fn input_ref(&self, node_id: NodeId, name: &str) -> GenResult<PortRef> {
        let node = self.node(node_id).ok_or_else(|| GenError::NodeNotFound {
            graph: self.name.clone(),
            node: format!("{node_id:?}"),
        })?;
        let index = node.input_index(name).ok_or_else(|| GenError::PortNotFound {
            owner: node.name.clone(),
            port: name.to_string(),
        })?;
        Ok(PortRef::node(node_id, index))
    }

    fn output_ref(&self, node_id: NodeId, name: Option<&str>) -> GenResult<PortRef> {
        let node = self.node(node_id).ok_or_else(|| GenError::NodeNotFound {
            graph: self.name.clone(),
            node: format!("{node_id:?}"),
        })?;
        let index = match name {
            Some(name) => node.output_index(name),
            None => (!node.outputs.is_empty()).then_some(0),
        };
        let index = index.ok_or_else(|| GenError::PortNotFound {
            owner: node.name.clone(),
            port: name.unwrap_or("out").to_string(),
        })?;
        Ok(PortRef::node(node_id, index))
    }

    /// Connect a binding of `downstream` to an output of `upstream`
    fn bind(&mut self, upstream: NodeId, downstream: NodeId, binding: &InputBinding) -> GenResult<()> {
        let from = self.output_ref(upstream, binding.output.as_deref())?;
        let to = self.input_ref(downstream, &binding.name)?;
        if let Some(input) = self.input_mut(to) {
            input.channels = binding.channels.clone();
        }
        self.connect(from, to)
    }

    /// Flatten, schedule, scope and name a freshly built graph
    fn finalize(&mut self, generator: &dyn ShaderGenerator, ctx: &GenContext) -> GenResult<()> {
        if ctx.options.flatten_subgraphs {
            self.flatten_subgraphs()?;
        }
        self.topological_sort()?;
        self.calculate_scopes();
        self.assign_variables(generator, !ctx.in_compound());

        self.classification = self
            .output_sockets()
            .first()
            .and_then(|socket| socket.connection)
            .and_then(|c| c.node_id())
            .and_then(|id| self.node(id))
            .map_or(Classification::TEXTURE, |node| node.classification);
        Ok(())
    }
}
