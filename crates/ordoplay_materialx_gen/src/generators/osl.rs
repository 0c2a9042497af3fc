// SPDX-License-Identifier: MIT OR Apache-2.0
//! OSL shader generator.

use crate::context::GenContext;
use crate::error::GenResult;
use crate::generator::{
    emit_function_body, emit_function_definitions, emit_type_definitions, emit_void_function, publish_uniforms,
    ShaderGenerator,
};
use crate::graph::ShaderGraph;
use crate::implementation::{CompoundImpl, ProceduralNode};
use crate::nodes::ProceduralRegistry;
use crate::stage::{ShaderStage, PUBLIC_UNIFORMS};
use ordoplay_materialx_core::{types, CoreError, Syntax, TypeRef, TypeSyntax, ValueSyntax};
use std::sync::Arc;

/// Language name of OSL implementations
pub const OSL_LANGUAGE: &str = "osl";

/// Default OSL target
pub const OSL_TARGET: &str = "genosl";

const RESERVED_WORDS: &[&str] = &[
    "and", "break", "closure", "color", "continue", "do", "else", "emit", "float", "for", "if", "illuminance",
    "illuminate", "int", "matrix", "normal", "not", "or", "output", "point", "public", "return", "string", "struct",
    "vector", "void", "while", "bool", "case", "catch", "char", "class", "const", "delete", "default", "double",
    "enum", "extern", "false", "friend", "goto", "inline", "long", "new", "operator", "private", "protected",
    "short", "signed", "sizeof", "static", "switch", "template", "this", "throw", "true", "try", "typedef",
    "uniform", "union", "unsigned", "varying", "virtual", "volatile", "shader", "surface", "displacement", "volume",
    "light",
];

fn closure(name: &str) -> TypeSyntax {
    TypeSyntax::scalar(name, "null_closure", "null_closure")
        .with_alias("closure color")
        .with_definition(format!("#define {name} closure color"))
}

fn osl_syntax() -> Result<Syntax, CoreError> {
    let mut syntax = Syntax::new(OSL_LANGUAGE).with_output_qualifier("output");
    let table: Vec<(TypeRef, TypeSyntax)> = vec![
        (
            &types::BOOLEAN,
            TypeSyntax::scalar("int", "false", "false").with_definition("#define true 1\n#define false 0"),
        ),
        (&types::INTEGER, TypeSyntax::scalar("int", "0", "0")),
        (&types::FLOAT, TypeSyntax::scalar("float", "0.0", "0.0")),
        (
            &types::COLOR2,
            TypeSyntax::scalar("color2", "color2(0.0, 0.0)", "{0.0, 0.0}")
                .with_syntax(ValueSyntax::Struct { brace_uniform: true })
                .with_members(&[".r", ".a"])
                .with_definition("struct color2 { float r; float a; };"),
        ),
        (
            &types::COLOR3,
            TypeSyntax::scalar("color", "color(0.0)", "color(0.0)")
                .with_syntax(ValueSyntax::Aggregate)
                .with_members(&["[0]", "[1]", "[2]"]),
        ),
        (
            &types::COLOR4,
            TypeSyntax::scalar("color4", "color4(color(0.0), 0.0)", "{color(0.0), 0.0}")
                .with_syntax(ValueSyntax::Color4 {
                    color: "color",
                    brace_uniform: true,
                })
                .with_members(&[".rgb[0]", ".rgb[1]", ".rgb[2]", ".a"])
                .with_definition("struct color4 { color rgb; float a; };"),
        ),
        (
            &types::VECTOR2,
            TypeSyntax::scalar("vector2", "vector2(0.0, 0.0)", "{0.0, 0.0}")
                .with_syntax(ValueSyntax::Struct { brace_uniform: true })
                .with_members(&[".x", ".y"])
                .with_definition("struct vector2 { float x; float y; };"),
        ),
        (
            &types::VECTOR3,
            TypeSyntax::scalar("vector", "vector(0.0)", "vector(0.0)")
                .with_syntax(ValueSyntax::Aggregate)
                .with_members(&["[0]", "[1]", "[2]"]),
        ),
        (
            &types::VECTOR4,
            TypeSyntax::scalar("vector4", "vector4(0.0, 0.0, 0.0, 0.0)", "{0.0, 0.0, 0.0, 0.0}")
                .with_syntax(ValueSyntax::Struct { brace_uniform: true })
                .with_members(&[".x", ".y", ".z", ".w"])
                .with_definition("struct vector4 { float x; float y; float z; float w; };"),
        ),
        (
            &types::MATRIX33,
            TypeSyntax::scalar("matrix", "matrix(1.0)", "matrix(1.0)").with_syntax(ValueSyntax::PaddedMatrix33),
        ),
        (
            &types::MATRIX44,
            TypeSyntax::scalar("matrix", "matrix(1.0)", "matrix(1.0)").with_syntax(ValueSyntax::Aggregate),
        ),
        (
            &types::STRING,
            TypeSyntax::scalar("string", "\"\"", "\"\"").with_syntax(ValueSyntax::String),
        ),
        (
            &types::FILENAME,
            TypeSyntax::scalar("string", "\"\"", "\"\"").with_syntax(ValueSyntax::String),
        ),
        (
            &types::INTEGERARRAY,
            TypeSyntax::scalar("int", "{}", "{}").with_syntax(ValueSyntax::Array { open: "{", close: "}" }),
        ),
        (
            &types::FLOATARRAY,
            TypeSyntax::scalar("float", "{}", "{}").with_syntax(ValueSyntax::Array { open: "{", close: "}" }),
        ),
        (&types::BSDF, closure("BSDF")),
        (&types::EDF, closure("EDF")),
        (&types::VDF, closure("VDF")),
        (&types::SURFACESHADER, closure("surfaceshader")),
        (&types::VOLUMESHADER, closure("volumeshader")),
        (&types::DISPLACEMENTSHADER, closure("displacementshader")),
        (&types::LIGHTSHADER, closure("lightshader")),
        (&types::MATERIAL, closure("MATERIAL")),
    ];
    for (type_desc, type_syntax) in table {
        syntax.register_type_syntax(type_desc, type_syntax)?;
    }
    syntax.register_reserved_words(RESERVED_WORDS.iter().copied());
    Ok(syntax)
}

/// Generates an OSL `shader` whose parameters are the graph's public
/// uniforms and whose outputs are `output` parameters
#[derive(Debug, Clone)]
pub struct OslShaderGenerator {
    syntax: Syntax,
    procedurals: ProceduralRegistry,
}

impl OslShaderGenerator {
    /// Create the generator with the built-in procedural nodes
    pub fn new() -> GenResult<Self> {
        Ok(Self {
            syntax: osl_syntax()?,
            procedurals: ProceduralRegistry::standard(),
        })
    }

    /// Register an additional procedural node
    pub fn with_procedural(mut self, node: Arc<dyn ProceduralNode>) -> Self {
        self.procedurals.register(node);
        self
    }

    fn emit_signature(&self, name: &str, graph: &ShaderGraph, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        let fmt = ctx.float_format();
        let mut params = Vec::new();
        if let Some(block) = stage.uniform_block(PUBLIC_UNIFORMS) {
            for port in block.variables() {
                let value = match &port.value {
                    Some(value) => self.syntax.value_string(port.type_desc, value, true, &fmt)?,
                    None => self.syntax.default_value(port.type_desc, true)?.to_string(),
                };
                let array = port.value.as_ref().and_then(|v| v.array_len());
                params.push(format!("{} = {value}", self.declaration(port.type_desc, &port.variable, array)?));
            }
        }
        for socket in graph.output_sockets() {
            params.push(format!(
                "output {} = {}",
                self.declaration(socket.type_desc, &socket.variable, None)?,
                self.syntax.default_value(socket.type_desc, true)?
            ));
        }

        let shader_name = self.syntax.make_valid_name(name, &mut ctx.identifiers);
        stage.emit_line(&format!("shader {shader_name}"));
        stage.emit_line("(");
        let last = params.len().saturating_sub(1);
        for (i, param) in params.iter().enumerate() {
            let separator = if i == last { "" } else { "," };
            stage.emit_line(&format!("    {param}{separator}"));
        }
        stage.emit_line(")");
        Ok(())
    }
}

impl ShaderGenerator for OslShaderGenerator {
    fn language(&self) -> &str {
        OSL_LANGUAGE
    }

    fn target(&self) -> &str {
        OSL_TARGET
    }

    fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    fn procedural_node(&self, category: &str) -> Option<Arc<dyn ProceduralNode>> {
        self.procedurals.get(category)
    }

    fn emit_shader(&self, name: &str, graph: &ShaderGraph, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        publish_uniforms(graph, stage)?;
        emit_type_definitions(&self.syntax, graph, ctx, stage);
        emit_function_definitions(self, graph, ctx, stage)?;
        self.emit_signature(name, graph, ctx, stage)?;
        emit_function_body(self, graph, ctx, stage)
    }

    fn emit_compound_definition(&self, compound: &CompoundImpl, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        emit_void_function(self, compound, ctx, stage)
    }

    fn array_literal(&self, element_type: TypeRef, variable: &str, elements: &[String]) -> GenResult<String> {
        let type_name = self.syntax.type_name(element_type)?;
        Ok(format!(
            "{type_name} {variable}[{}] = {{{}}}",
            elements.len(),
            elements.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_materialx_core::{FloatFormat, Value};

    #[test]
    fn test_every_type_has_syntax() {
        let generator = OslShaderGenerator::new().unwrap();
        for type_desc in types::TypeDesc::all().iter().copied() {
            assert!(generator.syntax().supports(type_desc), "{}", type_desc.name());
        }
    }

    #[test]
    fn test_uniform_struct_values_use_braces() {
        let generator = OslShaderGenerator::new().unwrap();
        let value = Value::Vector2([0.5, 1.0]);
        let fmt = FloatFormat::default();
        assert_eq!(
            generator.syntax().value_string(&types::VECTOR2, &value, true, &fmt).unwrap(),
            "{0.5, 1.0}"
        );
        assert_eq!(
            generator.syntax().value_string(&types::VECTOR2, &value, false, &fmt).unwrap(),
            "vector2(0.5, 1.0)"
        );
    }

    #[test]
    fn test_array_literal_uses_initializer_list() {
        let generator = OslShaderGenerator::new().unwrap();
        let text = generator
            .array_literal(&types::FLOAT, "w", &["1.0".to_string(), "2.0".to_string()])
            .unwrap();
        assert_eq!(text, "float w[2] = {1.0, 2.0}");
    }
}
