// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generator trait and the emission logic shared by all targets.
//!
//! A [`ShaderGenerator`] supplies its syntax, its procedural nodes and the
//! target-specific layout. Walking the graph (definitions, calls, branch
//! bodies) is done by the free functions here, which take the generator as
//! `&dyn ShaderGenerator` so procedural nodes can call back into them.

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::graph::ShaderGraph;
use crate::implementation::{CompoundImpl, Implementation, ProceduralNode, SourceCodeImpl};
use crate::node::{NodeId, ShaderNode};
use crate::port::{ShaderInput, ShaderOutput};
use crate::shader::Shader;
use crate::stage::{ShaderPort, ShaderStage, PIXEL_STAGE, PUBLIC_UNIFORMS};
use ordoplay_materialx_core::document::{Document, NodeGraph, NodeInstance};
use ordoplay_materialx_core::{FloatFormat, Syntax, TypeRef};
use std::collections::HashSet;
use std::sync::Arc;

/// Target-specific code generator
pub trait ShaderGenerator: Send + Sync {
    /// Implementation language (`osl`, `mdl`, `glsl`)
    fn language(&self) -> &str;

    /// Default renderer target
    fn target(&self) -> &str;

    /// Syntax table of the language
    fn syntax(&self) -> &Syntax;

    /// Procedural implementation registered for a node category
    fn procedural_node(&self, category: &str) -> Option<Arc<dyn ProceduralNode>>;

    /// Whether closure and shader nodes can be generated
    fn supports_closures(&self) -> bool {
        true
    }

    /// Suffix appended to variables of a type (e.g. samplers)
    fn variable_suffix(&self, _type_desc: TypeRef) -> &str {
        ""
    }

    /// Emit the complete stage for a finished graph
    fn emit_shader(&self, name: &str, graph: &ShaderGraph, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()>;

    /// Emit a compound graph as a function
    fn emit_compound_definition(&self, compound: &CompoundImpl, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()>;

    /// Declaration of a variable, without initializer
    fn declaration(&self, type_desc: TypeRef, variable: &str, array_len: Option<usize>) -> GenResult<String> {
        let type_name = self.syntax().type_name(type_desc)?;
        Ok(match array_len {
            Some(len) => format!("{type_name} {variable}[{len}]"),
            None => format!("{type_name} {variable}"),
        })
    }

    /// Declaration of an output variable, optionally with its default
    fn output_declaration(&self, output: &ShaderOutput, with_default: bool) -> GenResult<String> {
        let declaration = self.declaration(output.type_desc, &output.variable, None)?;
        if with_default {
            let default = self.syntax().default_value(output.type_desc, false)?;
            Ok(format!("{declaration} = {default}"))
        } else {
            Ok(declaration)
        }
    }

    /// Array literal declaration
    fn array_literal(&self, element_type: TypeRef, variable: &str, elements: &[String]) -> GenResult<String> {
        let type_name = self.syntax().type_name(element_type)?;
        let n = elements.len();
        Ok(format!("{type_name} {variable}[{n}] = {type_name}[{n}]({})", elements.join(", ")))
    }

    /// Declare the outputs and call a function computing them.
    ///
    /// Outputs are passed as trailing output arguments.
    fn emit_invocation(
        &self,
        function: &str,
        args: &[String],
        outputs: &[&ShaderOutput],
        _ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        for output in outputs {
            stage.emit_statement(&self.output_declaration(output, false)?);
        }
        let all_args: Vec<&str> = args
            .iter()
            .map(String::as_str)
            .chain(outputs.iter().map(|o| o.variable.as_str()))
            .collect();
        stage.emit_statement(&format!("{function}({})", all_args.join(", ")));
        Ok(())
    }

    /// Emit a call to a source-backed node
    fn emit_source_call(
        &self,
        node: &ShaderNode,
        implementation: &SourceCodeImpl,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        let fmt = ctx.float_format();
        if implementation.inlined {
            let output = single_output(node, self.language())?;
            let expression = substitute_inline(&implementation.source, node, graph, self.syntax(), &fmt)?;
            stage.emit_statement(&format!("{} = {expression}", self.output_declaration(output, false)?));
            return Ok(());
        }

        let args = input_expressions(node, graph, self.syntax(), &fmt)?;
        let outputs: Vec<&ShaderOutput> = node.outputs.iter().collect();
        self.emit_invocation(&implementation.function, &args, &outputs, ctx, stage)
    }

    /// Emit a call to a compound node's function
    fn emit_compound_call(
        &self,
        node: &ShaderNode,
        compound: &CompoundImpl,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        let args = input_expressions(node, graph, self.syntax(), &ctx.float_format())?;
        let outputs: Vec<&ShaderOutput> = node.outputs.iter().collect();
        self.emit_invocation(&compound.function, &args, &outputs, ctx, stage)
    }
}

/// Build a shader from a node graph
pub fn generate_from_node_graph(
    generator: &dyn ShaderGenerator,
    name: &str,
    node_graph: &NodeGraph,
    document: &Document,
    ctx: &mut GenContext,
) -> GenResult<Shader> {
    let graph = ShaderGraph::from_node_graph(node_graph, document, generator, ctx)?;
    generate(generator, name, graph, ctx)
}

/// Build a shader from a single node and its upstream nodes
pub fn generate_from_node(
    generator: &dyn ShaderGenerator,
    name: &str,
    node: &NodeInstance,
    document: &Document,
    ctx: &mut GenContext,
) -> GenResult<Shader> {
    let graph = ShaderGraph::from_node(node, document, generator, ctx)?;
    generate(generator, name, graph, ctx)
}

/// Emit a shader for a finished graph
pub fn generate(generator: &dyn ShaderGenerator, name: &str, graph: ShaderGraph, ctx: &mut GenContext) -> GenResult<Shader> {
    ctx.identifiers.clear();
    let mut stage = ShaderStage::new(PIXEL_STAGE, ctx.options.indent);
    generator.emit_shader(name, &graph, ctx, &mut stage)?;
    tracing::info!(
        "Generated {} shader '{}' ({} nodes, {} bytes)",
        generator.language(),
        name,
        graph.node_count(),
        stage.code().len()
    );
    Ok(Shader::new(name, graph, stage))
}

/// The only output of a node; fails for multi-output nodes
pub fn single_output<'a>(node: &'a ShaderNode, generator: &str) -> GenResult<&'a ShaderOutput> {
    match node.outputs.as_slice() {
        [output] => Ok(output),
        [] => Err(GenError::PortNotFound {
            owner: node.name.clone(),
            port: "out".to_string(),
        }),
        _ => Err(GenError::UnsupportedMultiOutput {
            node: node.name.clone(),
            generator: generator.to_string(),
        }),
    }
}

/// Find an input by name, failing with a lookup error
pub fn required_input<'a>(node: &'a ShaderNode, name: &str) -> GenResult<&'a ShaderInput> {
    node.input(name).ok_or_else(|| GenError::PortNotFound {
        owner: node.name.clone(),
        port: name.to_string(),
    })
}

/// Expression reading an input: the upstream variable (swizzled when
/// channels are set), the published uniform, or the literal value
pub fn input_expression(syntax: &Syntax, graph: &ShaderGraph, input: &ShaderInput, fmt: &FloatFormat) -> GenResult<String> {
    if let Some(upstream) = input.connection {
        let output = graph.output(upstream).ok_or_else(|| GenError::PortNotFound {
            owner: graph.name.clone(),
            port: input.name.clone(),
        })?;
        return match &input.channels {
            Some(channels) => Ok(syntax.swizzled_variable(&output.variable, output.type_desc, channels, input.type_desc)?),
            None => Ok(output.variable.clone()),
        };
    }
    if !input.variable.is_empty() {
        return Ok(input.variable.clone());
    }
    match &input.value {
        Some(value) => Ok(syntax.value_string(input.type_desc, value, false, fmt)?),
        None => Ok(syntax.default_value(input.type_desc, false)?.to_string()),
    }
}

/// Expressions for every input of a node, in declaration order
pub fn input_expressions(node: &ShaderNode, graph: &ShaderGraph, syntax: &Syntax, fmt: &FloatFormat) -> GenResult<Vec<String>> {
    node.inputs
        .iter()
        .map(|input| input_expression(syntax, graph, input, fmt))
        .collect()
}

/// Replace `{{input}}` tokens in an inline expression
pub fn substitute_inline(
    source: &str,
    node: &ShaderNode,
    graph: &ShaderGraph,
    syntax: &Syntax,
    fmt: &FloatFormat,
) -> GenResult<String> {
    let mut result = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            return Err(GenError::UnterminatedInlineToken(node.implementation.name().to_string()));
        };
        let name = rest[start + 2..start + 2 + len].trim();
        let input = required_input(node, name)?;
        result.push_str(&rest[..start]);
        result.push_str(&input_expression(syntax, graph, input, fmt)?);
        rest = &rest[start + 2 + len + 2..];
    }
    result.push_str(rest);
    Ok(result)
}

/// Add the graph's input sockets and published node inputs to the public
/// uniform block
pub fn publish_uniforms(graph: &ShaderGraph, stage: &mut ShaderStage) -> GenResult<()> {
    let reachable = graph.reachable_nodes()?;
    let block = stage.uniform_block_mut(PUBLIC_UNIFORMS);

    for socket in graph.input_sockets() {
        block.add(ShaderPort {
            type_desc: socket.type_desc,
            variable: socket.variable.clone(),
            path: socket.path.clone(),
            value: socket.value.clone(),
            uniform: true,
        });
    }
    for node in graph.nodes().filter(|n| reachable.contains(&n.id)) {
        for input in node.inputs.iter().filter(|i| !i.variable.is_empty()) {
            block.add(ShaderPort {
                type_desc: input.type_desc,
                variable: input.variable.clone(),
                path: input.path.clone(),
                value: input.value.clone(),
                uniform: true,
            });
        }
    }
    Ok(())
}

/// Emit the definitions of every type the graph and its compounds use
pub fn emit_type_definitions(syntax: &Syntax, graph: &ShaderGraph, ctx: &GenContext, stage: &mut ShaderStage) {
    if !ctx.options.emit_type_definitions {
        return;
    }

    fn collect(graph: &ShaderGraph, used: &mut HashSet<&'static str>) {
        used.extend(graph.used_types().iter().map(|t| t.name()));
        for node in graph.nodes() {
            if let Implementation::Compound(compound) = &node.implementation {
                collect(&compound.graph, used);
            }
        }
    }

    let mut used = HashSet::new();
    collect(graph, &mut used);
    let mut emitted = HashSet::new();
    for type_syntax in syntax.type_definitions(&used) {
        if let Some(definition) = &type_syntax.type_definition {
            if emitted.insert(definition.clone()) {
                stage.emit_block(definition);
            }
        }
    }
    if !emitted.is_empty() {
        stage.emit_empty_line();
    }
}

/// Emit function definitions for every reachable node, once per stage
pub fn emit_function_definitions(
    generator: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    let reachable = graph.reachable_nodes()?;
    for node in graph.nodes().filter(|n| reachable.contains(&n.id)) {
        match &node.implementation {
            Implementation::SourceCode(source) if !source.inlined => {
                if stage.add_function(&source.function) {
                    stage.emit_block(&source.source);
                    stage.emit_empty_line();
                }
            }
            Implementation::SourceCode(_) => {}
            Implementation::Compound(compound) => {
                if stage.add_function(&compound.function) {
                    generator.emit_compound_definition(compound, ctx, stage)?;
                }
            }
            Implementation::Procedural(procedural) => {
                procedural.emit_function_definition(node, generator, ctx, stage)?;
            }
        }
    }
    Ok(())
}

/// Emit the calls of every reachable node that is not scoped to a branch
pub fn emit_function_calls(
    generator: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    let reachable = graph.reachable_nodes()?;
    for node in graph.nodes() {
        if reachable.contains(&node.id) && node.scope.is_top_level() {
            emit_node(generator, node, graph, ctx, stage)?;
        }
    }
    Ok(())
}

/// Emit the calls of the nodes used by one branch of a conditional
pub fn emit_branch(
    generator: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    conditional: NodeId,
    input_index: usize,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    for node in graph.nodes() {
        if node.scope.used_by_branch(conditional, input_index) {
            emit_node(generator, node, graph, ctx, stage)?;
        }
    }
    Ok(())
}

/// Emit the call of one node, dispatching on its implementation
pub fn emit_node(
    generator: &dyn ShaderGenerator,
    node: &ShaderNode,
    graph: &ShaderGraph,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    match &node.implementation {
        Implementation::SourceCode(source) => generator.emit_source_call(node, source, graph, ctx, stage),
        Implementation::Compound(compound) => generator.emit_compound_call(node, compound, graph, ctx, stage),
        Implementation::Procedural(procedural) => procedural.emit_function_call(node, graph, generator, ctx, stage),
    }
}

/// Expression assigned to an output socket
pub fn output_socket_expression(
    syntax: &Syntax,
    graph: &ShaderGraph,
    socket: &ShaderInput,
    fmt: &FloatFormat,
) -> GenResult<String> {
    let mut unpublished = socket.clone();
    unpublished.variable.clear();
    input_expression(syntax, graph, &unpublished, fmt)
}

/// Emit a braced body: the graph's calls followed by one assignment per
/// output socket
pub fn emit_function_body(
    generator: &dyn ShaderGenerator,
    graph: &ShaderGraph,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    stage.begin_scope();
    emit_function_calls(generator, graph, ctx, stage)?;
    let fmt = ctx.float_format();
    for socket in graph.output_sockets() {
        let value = output_socket_expression(generator.syntax(), graph, socket, &fmt)?;
        stage.emit_statement(&format!("{} = {value}", socket.variable));
    }
    stage.end_scope(false);
    Ok(())
}

/// Emit a compound as a `void` function taking its input sockets and
/// returning its output sockets through output parameters
pub fn emit_void_function(
    generator: &dyn ShaderGenerator,
    compound: &CompoundImpl,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    let graph = &compound.graph;
    emit_function_definitions(generator, graph, ctx, stage)?;

    let mut params = Vec::new();
    for socket in graph.input_sockets() {
        params.push(generator.declaration(socket.type_desc, &socket.variable, None)?);
    }
    for socket in graph.output_sockets() {
        let declaration = generator.declaration(socket.type_desc, &socket.variable, None)?;
        params.push(format!("{} {declaration}", generator.syntax().output_qualifier()));
    }
    stage.emit_line(&format!("void {}({})", compound.function, params.join(", ")));
    emit_function_body(generator, graph, ctx, stage)?;
    stage.emit_empty_line();
    Ok(())
}
