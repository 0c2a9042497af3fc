// SPDX-License-Identifier: MIT OR Apache-2.0
//! 3x3 convolution of a file texture.
//!
//! The blur re-samples the texture node feeding it at nine offset texture
//! coordinates and sums the samples with the filter's weights. When the
//! input is not a sampled texture the blur passes its input through.

use crate::context::GenContext;
use crate::error::GenResult;
use crate::generator::{input_expression, input_expressions, required_input, single_output, ShaderGenerator};
use crate::graph::ShaderGraph;
use crate::implementation::{Implementation, ProceduralNode};
use crate::node::{Classification, ShaderNode};
use crate::port::ShaderOutput;
use crate::stage::ShaderStage;
use ordoplay_materialx_core::types;

const OFFSETS: [(f32, f32); 9] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (-1.0, 0.0),
    (0.0, 0.0),
    (1.0, 0.0),
    (-1.0, 1.0),
    (0.0, 1.0),
    (1.0, 1.0),
];

const BOX_WEIGHTS: [f32; 9] = [1.0 / 9.0; 9];

const GAUSSIAN_WEIGHTS: [f32; 9] = [
    1.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
    2.0 / 16.0,
    4.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
];

/// Name of the sampling function of a node, if it is a sampled file
/// texture with a `texcoord` input producing `output_type`
fn sampler_function<'a>(upstream: &'a ShaderNode, output: &ShaderOutput) -> Option<(&'a str, usize)> {
    if !upstream.has_classification(Classification::FILETEXTURE) {
        return None;
    }
    let Implementation::SourceCode(source) = &upstream.implementation else {
        return None;
    };
    let texcoord = upstream.input_index("texcoord")?;
    let single = matches!(upstream.outputs.as_slice(), [o] if o.type_desc == output.type_desc);
    let vector2 = upstream.inputs[texcoord].type_desc == &types::VECTOR2;
    (!source.inlined && single && vector2).then_some((source.function.as_str(), texcoord))
}

/// `blur`
#[derive(Debug, Default)]
pub struct BlurNode;

impl ProceduralNode for BlurNode {
    fn name(&self) -> &str {
        "blur"
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
        let input = required_input(node, "in")?;
        let syntax = generator.syntax();
        let fmt = ctx.float_format();

        let sampled = input
            .connection
            .and_then(|c| c.node_id())
            .and_then(|id| graph.node(id))
            .and_then(|upstream| sampler_function(upstream, output).map(|f| (upstream, f)));
        let Some((upstream, (function, texcoord_index))) = sampled else {
            let value = input_expression(syntax, graph, input, &fmt)?;
            stage.emit_statement(&format!("{} = {value}", generator.output_declaration(output, false)?));
            return Ok(());
        };

        let weights = match required_input(node, "filtertype")?.value.as_ref().and_then(|v| v.as_str().ok()) {
            Some("gaussian") => GAUSSIAN_WEIGHTS,
            _ => BOX_WEIGHTS,
        };
        let size = input_expression(syntax, graph, required_input(node, "size")?, &fmt)?;
        let mut args = input_expressions(upstream, graph, syntax, &fmt)?;

        let texcoord = format!("{}_texcoord", output.variable);
        let declaration = generator.declaration(&types::VECTOR2, &texcoord, None)?;
        stage.emit_statement(&format!("{declaration} = {}", args[texcoord_index]));
        let u = syntax.swizzled_variable(&texcoord, &types::VECTOR2, "x", &types::FLOAT)?;
        let v = syntax.swizzled_variable(&texcoord, &types::VECTOR2, "y", &types::FLOAT)?;
        let vector2 = syntax.type_syntax(&types::VECTOR2)?;

        let mut samples = Vec::with_capacity(OFFSETS.len());
        for (i, (du, dv)) in OFFSETS.iter().enumerate() {
            args[texcoord_index] = vector2.value_from_strings(
                &[
                    format!("{u} + {} * {size}", fmt.format(*du)),
                    format!("{v} + {} * {size}", fmt.format(*dv)),
                ],
                false,
            )?;
            let mut sample = output.clone();
            sample.variable = format!("{}_sample{i}", output.variable);
            generator.emit_invocation(function, &args, &[&sample], ctx, stage)?;
            samples.push(sample.variable);
        }

        let samples_var = format!("{}_samples", output.variable);
        let weights_var = format!("{}_weights", output.variable);
        let weight_values: Vec<String> = weights.iter().map(|w| fmt.format(*w)).collect();
        stage.emit_statement(&generator.array_literal(output.type_desc, &samples_var, &samples)?);
        stage.emit_statement(&generator.array_literal(&types::FLOAT, &weights_var, &weight_values)?);

        let terms: Vec<String> = (0..samples.len())
            .map(|i| format!("{samples_var}[{i}] * {weights_var}[{i}]"))
            .collect();
        stage.emit_statement(&format!(
            "{} = {}",
            generator.output_declaration(output, false)?,
            terms.join(" + ")
        ));
        Ok(())
    }
}
