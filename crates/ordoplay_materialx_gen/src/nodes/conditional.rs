// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conditional nodes.
//!
//! Each branch input gets its own block holding the calls of the nodes
//! only that branch needs, so untaken branches are never evaluated.

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::generator::{emit_branch, input_expression, required_input, single_output, ShaderGenerator};
use crate::graph::ShaderGraph;
use crate::implementation::ProceduralNode;
use crate::node::ShaderNode;
use crate::port::ShaderOutput;
use crate::scope::branch_bit;
use crate::stage::ShaderStage;

/// Emit one branch block: the branch's nodes, then the assignment of the
/// branch input to the output
fn emit_branch_block(
    node: &ShaderNode,
    input_index: usize,
    output: &ShaderOutput,
    graph: &ShaderGraph,
    generator: &dyn ShaderGenerator,
    ctx: &mut GenContext,
    stage: &mut ShaderStage,
) -> GenResult<()> {
    let input = node.inputs.get(input_index).ok_or_else(|| GenError::PortNotFound {
        owner: node.name.clone(),
        port: format!("in{}", input_index + 1),
    })?;

    stage.begin_scope();
    emit_branch(generator, graph, node.id, input_index, ctx, stage)?;
    let value = input_expression(generator.syntax(), graph, input, &ctx.float_format())?;
    stage.emit_statement(&format!("{} = {value}", output.variable));
    stage.end_scope(false);
    Ok(())
}

/// `ifgreater`, `ifgreatereq`, `ifequal`: `in1` when `value1 <op> value2`
/// holds, else `in2`
#[derive(Debug)]
pub struct IfNode {
    category: &'static str,
    operator: &'static str,
}

impl IfNode {
    /// Create a conditional comparing with `operator`
    pub fn new(category: &'static str, operator: &'static str) -> Self {
        Self { category, operator }
    }
}

impl ProceduralNode for IfNode {
    fn name(&self) -> &str {
        self.category
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        graph: &ShaderGraph,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        let output = single_output(node, generator.language())?;
        let fmt = ctx.float_format();
        let value1 = input_expression(generator.syntax(), graph, required_input(node, "value1")?, &fmt)?;
        let value2 = input_expression(generator.syntax(), graph, required_input(node, "value2")?, &fmt)?;
        let branch = |name: &str| {
            node.input_index(name).ok_or_else(|| GenError::PortNotFound {
                owner: node.name.clone(),
                port: name.to_string(),
            })
        };
        let (in1, in2) = (branch("in1")?, branch("in2")?);

        stage.emit_statement(&generator.output_declaration(output, true)?);
        stage.emit_line(&format!("if ({value1} {} {value2})", self.operator));
        emit_branch_block(node, in1, output, graph, generator, ctx, stage)?;
        stage.emit_line("else");
        emit_branch_block(node, in2, output, graph, generator, ctx, stage)
    }
}

/// `switch`: picks branch input `in<n>` where `n - 1 <= which < n`; the
/// last branch covers everything above
#[derive(Debug, Default)]
pub struct SwitchNode;

impl ProceduralNode for SwitchNode {
    fn name(&self) -> &str {
        "switch"
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        graph: &ShaderGraph,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        let output = single_output(node, generator.language())?;
        let fmt = ctx.float_format();
        let which = input_expression(generator.syntax(), graph, required_input(node, "which")?, &fmt)?;
        let mask = node.branch_mask().unwrap_or(0);
        let branches: Vec<usize> = (0..node.inputs.len()).filter(|i| mask & branch_bit(*i) != 0).collect();

        stage.emit_statement(&generator.output_declaration(output, true)?);
        for (position, index) in branches.iter().enumerate() {
            let threshold = fmt.format((position + 1) as f32);
            match position {
                _ if position + 1 == branches.len() && position > 0 => stage.emit_line("else"),
                _ if position + 1 == branches.len() => {}
                0 => stage.emit_line(&format!("if ({which} < {threshold})")),
                _ => stage.emit_line(&format!("else if ({which} < {threshold})")),
            }
            emit_branch_block(node, *index, output, graph, generator, ctx, stage)?;
        }
        Ok(())
    }
}
