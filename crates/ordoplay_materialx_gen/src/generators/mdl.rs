// SPDX-License-Identifier: MIT OR Apache-2.0
//! MDL shader generator.
//!
//! MDL functions return their result instead of writing output
//! parameters, so every call site is `T v = f(args)` and nodes with
//! more than one output cannot be generated. Graphs producing a closure
//! or a shader become an exported `material` built with `let … in`.

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::generator::{
    emit_function_calls, emit_function_definitions, emit_type_definitions, output_socket_expression,
    publish_uniforms, ShaderGenerator,
};
use crate::graph::ShaderGraph;
use crate::implementation::{CompoundImpl, ProceduralNode};
use crate::node::Classification;
use crate::nodes::ProceduralRegistry;
use crate::port::{ShaderInput, ShaderOutput};
use crate::stage::{ShaderStage, PUBLIC_UNIFORMS};
use ordoplay_materialx_core::{types, CoreError, FloatFormat, Syntax, TypeRef, TypeSyntax, Value, ValueSyntax};
use std::sync::Arc;

/// Language name of MDL implementations
pub const MDL_LANGUAGE: &str = "mdl";

/// Default MDL target
pub const MDL_TARGET: &str = "genmdl";

const MDL_VERSION: &str = "1.6";

const IMPORTS: &[&str] = &["::df::*", "::tex::*", "::math::*", "::state::*", "::anno::*"];

const RESERVED_WORDS: &[&str] = &[
    "annotation", "bool", "bool2", "bool3", "bool4", "break", "bsdf", "bsdf_measurement", "case", "color", "const",
    "continue", "default", "do", "double", "double2", "double3", "double4", "edf", "else", "enum", "export", "false",
    "float", "float2", "float3", "float4", "float2x2", "float3x3", "float4x4", "for", "hair_bsdf", "if", "import",
    "in", "int", "int2", "int3", "int4", "intensity_mode", "intensity_power", "intensity_radiant_exitance",
    "let", "light_profile", "material", "material_emission", "material_geometry", "material_surface",
    "material_volume", "mdl", "module", "package", "return", "string", "struct", "switch", "texture_2d",
    "texture_3d", "texture_cube", "texture_ptex", "true", "typedef", "uniform", "using", "varying", "vdf", "while",
];

fn mdl_syntax() -> Result<Syntax, CoreError> {
    let mut syntax = Syntax::new(MDL_LANGUAGE).with_uniform_qualifier("uniform");
    let table: Vec<(TypeRef, TypeSyntax)> = vec![
        (&types::BOOLEAN, TypeSyntax::scalar("bool", "false", "false")),
        (&types::INTEGER, TypeSyntax::scalar("int", "0", "0")),
        (&types::FLOAT, TypeSyntax::scalar("float", "0.0", "0.0")),
        (
            &types::COLOR2,
            TypeSyntax::scalar("float2", "float2(0.0)", "float2(0.0)")
                .with_syntax(ValueSyntax::Aggregate)
                .with_members(&[".x", ".y"]),
        ),
        (
            &types::COLOR3,
            TypeSyntax::scalar("color", "color(0.0)", "color(0.0)")
                .with_syntax(ValueSyntax::Aggregate)
                .with_members(&["float3({}).x", "float3({}).y", "float3({}).z"]),
        ),
        (
            &types::COLOR4,
            TypeSyntax::scalar("color4", "mk_color4(0.0)", "mk_color4(0.0)")
                .with_syntax(ValueSyntax::Color4 {
                    color: "color",
                    brace_uniform: false,
                })
                .with_members(&["float3({}.rgb).x", "float3({}.rgb).y", "float3({}.rgb).z", "{}.a"])
                .with_definition(
                    "struct color4\n{\n    color rgb = color(0.0);\n    float a = 1.0;\n};\n\
                     color4 mk_color4(float v) { return color4(color(v), v); }",
                ),
        ),
        (
            &types::VECTOR2,
            TypeSyntax::scalar("float2", "float2(0.0)", "float2(0.0)")
                .with_syntax(ValueSyntax::Aggregate)
                .with_members(&[".x", ".y"]),
        ),
        (
            &types::VECTOR3,
            TypeSyntax::scalar("float3", "float3(0.0)", "float3(0.0)")
                .with_syntax(ValueSyntax::Aggregate)
                .with_members(&[".x", ".y", ".z"]),
        ),
        (
            &types::VECTOR4,
            TypeSyntax::scalar("float4", "float4(0.0)", "float4(0.0)")
                .with_syntax(ValueSyntax::Aggregate)
                .with_members(&[".x", ".y", ".z", ".w"]),
        ),
        (
            &types::MATRIX33,
            TypeSyntax::scalar("float3x3", "float3x3(1.0)", "float3x3(1.0)").with_syntax(ValueSyntax::Aggregate),
        ),
        (
            &types::MATRIX44,
            TypeSyntax::scalar("float4x4", "float4x4(1.0)", "float4x4(1.0)").with_syntax(ValueSyntax::Aggregate),
        ),
        (
            &types::STRING,
            TypeSyntax::scalar("string", "\"\"", "\"\"").with_syntax(ValueSyntax::String),
        ),
        (
            &types::FILENAME,
            TypeSyntax::scalar("texture_2d", "texture_2d()", "texture_2d()").with_syntax(ValueSyntax::Aggregate),
        ),
        (
            &types::INTEGERARRAY,
            TypeSyntax::scalar("int", "int[]()", "int[]()").with_syntax(ValueSyntax::Array {
                open: "int[](",
                close: ")",
            }),
        ),
        (
            &types::FLOATARRAY,
            TypeSyntax::scalar("float", "float[]()", "float[]()").with_syntax(ValueSyntax::Array {
                open: "float[](",
                close: ")",
            }),
        ),
        (&types::BSDF, TypeSyntax::scalar("bsdf", "bsdf()", "bsdf()")),
        (&types::EDF, TypeSyntax::scalar("edf", "edf()", "edf()")),
        (&types::VDF, TypeSyntax::scalar("vdf", "vdf()", "vdf()")),
        (&types::SURFACESHADER, TypeSyntax::scalar("material", "material()", "material()")),
        (&types::VOLUMESHADER, TypeSyntax::scalar("material", "material()", "material()")),
        (&types::DISPLACEMENTSHADER, TypeSyntax::scalar("material", "material()", "material()")),
        (&types::LIGHTSHADER, TypeSyntax::scalar("material", "material()", "material()")),
        (&types::MATERIAL, TypeSyntax::scalar("material", "material()", "material()")),
    ];
    for (type_desc, type_syntax) in table {
        syntax.register_type_syntax(type_desc, type_syntax)?;
    }
    syntax.register_reserved_words(RESERVED_WORDS.iter().copied());
    Ok(syntax)
}

/// Generates an exported MDL function, or a material for closure and
/// shader graphs
#[derive(Debug, Clone)]
pub struct MdlShaderGenerator {
    syntax: Syntax,
    procedurals: ProceduralRegistry,
}

impl MdlShaderGenerator {
    /// Create the generator with the built-in procedural nodes
    pub fn new() -> GenResult<Self> {
        Ok(Self {
            syntax: mdl_syntax()?,
            procedurals: ProceduralRegistry::standard(),
        })
    }

    /// Register an additional procedural node
    pub fn with_procedural(mut self, node: Arc<dyn ProceduralNode>) -> Self {
        self.procedurals.register(node);
        self
    }

    /// The only output socket of a graph
    fn single_socket<'a>(&self, graph: &'a ShaderGraph) -> GenResult<&'a ShaderInput> {
        match graph.output_sockets() {
            [socket] => Ok(socket),
            [] => Err(GenError::PortNotFound {
                owner: graph.name.clone(),
                port: "out".to_string(),
            }),
            _ => Err(GenError::UnsupportedMultiOutput {
                node: graph.name.clone(),
                generator: MDL_LANGUAGE.to_string(),
            }),
        }
    }

    /// Parameter with its default value, `uniform` qualified when asked
    fn parameter(
        &self,
        type_desc: TypeRef,
        variable: &str,
        value: Option<&Value>,
        uniform: bool,
        fmt: &FloatFormat,
    ) -> GenResult<String> {
        let default = match value {
            Some(value) => self.syntax.value_string(type_desc, value, uniform, fmt)?,
            None => self.syntax.default_value(type_desc, uniform)?.to_string(),
        };
        let declaration = self.declaration(type_desc, variable, value.and_then(Value::array_len))?;
        Ok(if uniform {
            format!("{} {declaration} = {default}", self.syntax.uniform_qualifier())
        } else {
            format!("{declaration} = {default}")
        })
    }

    /// Emit `(params)` with one parameter per line
    fn emit_parameters(&self, params: &[String], stage: &mut ShaderStage) {
        stage.emit_line("(");
        let last = params.len().saturating_sub(1);
        for (i, param) in params.iter().enumerate() {
            let separator = if i == last { "" } else { "," };
            stage.emit_line(&format!("    {param}{separator}"));
        }
        stage.emit_line(")");
    }

    /// Emit either a `{ calls; return expr; }` body or a
    /// `= let { calls } in expr;` body for closure and shader results
    fn emit_body(&self, graph: &ShaderGraph, result: &ShaderInput, wrap_material: bool, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        let fmt = ctx.float_format();
        let closure = result.type_desc.is_closure() || result.type_desc.is_shader();
        if !closure {
            stage.begin_scope();
            emit_function_calls(self, graph, ctx, stage)?;
            let value = output_socket_expression(&self.syntax, graph, result, &fmt)?;
            stage.emit_statement(&format!("return {value}"));
            stage.end_scope(false);
            return Ok(());
        }

        stage.emit_line("= let");
        stage.begin_scope();
        emit_function_calls(self, graph, ctx, stage)?;
        stage.end_scope(false);
        let value = output_socket_expression(&self.syntax, graph, result, &fmt)?;
        let value = if wrap_material {
            material_wrapper(graph.classification, &value)
        } else {
            value
        };
        stage.emit_statement(&format!("in {value}"));
        Ok(())
    }
}

/// Wrap a closure expression into a material
fn material_wrapper(classification: Classification, value: &str) -> String {
    if classification.contains(Classification::SHADER) {
        value.to_string()
    } else if classification.contains(Classification::EDF) {
        format!("material(surface: material_surface(emission: material_emission(emission: {value})))")
    } else if classification.contains(Classification::VDF) {
        format!("material(volume: material_volume(scattering: {value}))")
    } else {
        format!("material(surface: material_surface(scattering: {value}))")
    }
}

impl ShaderGenerator for MdlShaderGenerator {
    fn language(&self) -> &str {
        MDL_LANGUAGE
    }

    fn target(&self) -> &str {
        MDL_TARGET
    }

    fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    fn procedural_node(&self, category: &str) -> Option<Arc<dyn ProceduralNode>> {
        self.procedurals.get(category)
    }

    fn emit_shader(&self, name: &str, graph: &ShaderGraph, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        let result = self.single_socket(graph)?;
        let fmt = ctx.float_format();

        stage.emit_statement(&format!("mdl {MDL_VERSION}"));
        stage.emit_empty_line();
        for import in IMPORTS {
            stage.emit_statement(&format!("import {import}"));
        }
        stage.emit_empty_line();

        publish_uniforms(graph, stage)?;
        emit_type_definitions(&self.syntax, graph, ctx, stage);
        emit_function_definitions(self, graph, ctx, stage)?;

        let mut params = Vec::new();
        if let Some(block) = stage.uniform_block(PUBLIC_UNIFORMS) {
            for port in block.variables() {
                params.push(self.parameter(port.type_desc, &port.variable, port.value.as_ref(), true, &fmt)?);
            }
        }

        let closure = result.type_desc.is_closure() || result.type_desc.is_shader();
        let return_type = if closure {
            "material"
        } else {
            self.syntax.type_name(result.type_desc)?
        };
        let function = self.syntax.make_valid_name(name, &mut ctx.identifiers);
        stage.emit_line(&format!("export {return_type} {function}"));
        self.emit_parameters(&params, stage);
        self.emit_body(graph, result, true, ctx, stage)
    }

    fn emit_compound_definition(&self, compound: &CompoundImpl, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        let graph = &compound.graph;
        let result = self.single_socket(graph)?;
        let fmt = ctx.float_format();
        emit_function_definitions(self, graph, ctx, stage)?;

        let mut params = Vec::new();
        for socket in graph.input_sockets() {
            params.push(self.parameter(socket.type_desc, &socket.variable, socket.value.as_ref(), socket.uniform, &fmt)?);
        }
        let return_type = self.syntax.type_name(result.type_desc)?;
        stage.emit_line(&format!("{return_type} {}", compound.function));
        self.emit_parameters(&params, stage);
        self.emit_body(graph, result, false, ctx, stage)?;
        stage.emit_empty_line();
        Ok(())
    }

    fn declaration(&self, type_desc: TypeRef, variable: &str, array_len: Option<usize>) -> GenResult<String> {
        let type_name = self.syntax.type_name(type_desc)?;
        Ok(match array_len {
            Some(len) => format!("{type_name}[{len}] {variable}"),
            None => format!("{type_name} {variable}"),
        })
    }

    fn array_literal(&self, element_type: TypeRef, variable: &str, elements: &[String]) -> GenResult<String> {
        let type_name = self.syntax.type_name(element_type)?;
        Ok(format!(
            "{type_name}[{}] {variable} = {type_name}[]({})",
            elements.len(),
            elements.join(", ")
        ))
    }

    fn emit_invocation(
        &self,
        function: &str,
        args: &[String],
        outputs: &[&ShaderOutput],
        _ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()> {
        let output = match outputs {
            [output] => output,
            _ => {
                return Err(GenError::UnsupportedMultiOutput {
                    node: function.to_string(),
                    generator: MDL_LANGUAGE.to_string(),
                })
            }
        };
        stage.emit_statement(&format!(
            "{} = {function}({})",
            self.output_declaration(output, false)?,
            args.join(", ")
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_swizzle_goes_through_float3() {
        let generator = MdlShaderGenerator::new().unwrap();
        let text = generator
            .syntax()
            .swizzled_variable("c", &types::COLOR3, "g", &types::FLOAT)
            .unwrap();
        assert_eq!(text, "float3(c).y");
    }

    #[test]
    fn test_filename_value_is_texture_constructor() {
        let generator = MdlShaderGenerator::new().unwrap();
        let fmt = FloatFormat::default();
        let value = Value::Filename("wood.png".to_string());
        assert_eq!(
            generator.syntax().value_string(&types::FILENAME, &value, true, &fmt).unwrap(),
            "texture_2d(\"wood.png\")"
        );
        let empty = Value::Filename(String::new());
        assert_eq!(
            generator.syntax().value_string(&types::FILENAME, &empty, true, &fmt).unwrap(),
            "texture_2d()"
        );
    }

    #[test]
    fn test_material_wrapper() {
        assert_eq!(
            material_wrapper(Classification::CLOSURE | Classification::BSDF, "b"),
            "material(surface: material_surface(scattering: b))"
        );
        assert_eq!(material_wrapper(Classification::SHADER | Classification::SURFACE, "m"), "m");
    }
}
