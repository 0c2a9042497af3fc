// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value pass-through nodes.

use crate::context::GenContext;
use crate::error::GenResult;
use crate::generator::{input_expression, required_input, single_output, ShaderGenerator};
use crate::graph::ShaderGraph;
use crate::implementation::ProceduralNode;
use crate::node::ShaderNode;
use crate::stage::ShaderStage;

/// Declare the node's output and assign it the expression of `input`
fn emit_copy(
    node: &ShaderNode,
    input: &str,
    graph: &ShaderGraph,
    generator: &dyn ShaderGenerator,
    ctx: &GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    let output = single_output(node, generator.language())?;
    let input = required_input(node, input)?;
    let value = input_expression(generator.syntax(), graph, input, &ctx.float_format())?;
    let array = output
        .type_desc
        .is_array()
        .then(|| input.value.as_ref().and_then(|v| v.array_len()).unwrap_or(0));
    let declaration = generator.declaration(output.type_desc, &output.variable, array)?;
    stage.emit_statement(&format!("{declaration} = {value}"));
    Ok(())
}

/// `constant`: outputs its `value` input
#[derive(Debug, Default)]
pub struct ConstantNode;

impl ProceduralNode for ConstantNode {
    fn name(&self) -> &str {
        "constant"
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        graph: &ShaderGraph,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        emit_copy(node, "value", graph, generator, ctx, stage)
    }
}

/// `dot`: outputs its `in` input unchanged
#[derive(Debug, Default)]
pub struct DotNode;

impl ProceduralNode for DotNode {
    fn name(&self) -> &str {
        "dot"
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        graph: &ShaderGraph,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        emit_copy(node, "in", graph, generator, ctx, stage)
    }
}
