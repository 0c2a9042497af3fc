// SPDX-License-Identifier: MIT OR Apache-2.0
//! GLSL fragment generator.
//!
//! Emits a single `void` function writing its results to `out`
//! parameters, preceded by the uniform declarations it reads. The
//! function name is used verbatim so fragment wrappers can substitute a
//! placeholder after hashing.

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::generator::{
    emit_function_body, emit_function_definitions, emit_type_definitions, emit_void_function, publish_uniforms,
    ShaderGenerator,
};
use crate::graph::ShaderGraph;
use crate::implementation::{CompoundImpl, ProceduralNode};
use crate::nodes::ProceduralRegistry;
use crate::stage::{ShaderPort, ShaderStage, LIGHT_DATA};
use ordoplay_materialx_core::{types, CoreError, Syntax, TypeRef, TypeSyntax, Value, ValueSyntax};
use std::sync::Arc;

/// Language name of GLSL implementations
pub const GLSL_LANGUAGE: &str = "glsl";

/// Default GLSL target
pub const GLSL_TARGET: &str = "genglsl";

/// Suffix of sampler variables bound to filename inputs
pub const SAMPLER_SUFFIX: &str = "_sampler";

/// Light count uniform of the light data block
pub const NUM_ACTIVE_LIGHT_SOURCES: &str = "u_numActiveLightSources";

const RESERVED_WORDS: &[&str] = &[
    "attribute", "const", "uniform", "varying", "buffer", "shared", "coherent", "volatile", "restrict", "readonly",
    "writeonly", "layout", "centroid", "flat", "smooth", "noperspective", "patch", "sample", "break", "continue",
    "do", "for", "while", "switch", "case", "default", "if", "else", "subroutine", "in", "out", "inout", "float",
    "double", "int", "void", "bool", "true", "false", "invariant", "precise", "discard", "return", "mat2", "mat3",
    "mat4", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "bvec2", "bvec3", "bvec4", "uint", "uvec2", "uvec3",
    "uvec4", "lowp", "mediump", "highp", "precision", "sampler1D", "sampler2D", "sampler3D", "samplerCube",
    "struct", "input", "output", "texture", "common", "partition", "active", "asm", "class", "union", "enum",
    "typedef", "template", "this", "goto", "inline", "noinline", "public", "static", "extern", "external",
    "interface", "long", "short", "half", "fixed", "unsigned", "superp", "filter", "sizeof", "cast", "namespace",
    "using",
];

fn aggregate(name: &str, members: &[&str]) -> TypeSyntax {
    TypeSyntax::scalar(name, format!("{name}(0.0)"), format!("{name}(0.0)"))
        .with_syntax(ValueSyntax::Aggregate)
        .with_members(members)
}

fn glsl_syntax() -> Result<Syntax, CoreError> {
    let mut syntax = Syntax::new(GLSL_LANGUAGE)
        .with_uniform_qualifier("uniform")
        .with_output_qualifier("out");
    let table: Vec<(TypeRef, TypeSyntax)> = vec![
        (&types::BOOLEAN, TypeSyntax::scalar("bool", "false", "false")),
        (&types::INTEGER, TypeSyntax::scalar("int", "0", "0")),
        (&types::FLOAT, TypeSyntax::scalar("float", "0.0", "0.0")),
        (&types::COLOR2, aggregate("vec2", &[".r", ".g"])),
        (&types::COLOR3, aggregate("vec3", &[".r", ".g", ".b"])),
        (&types::COLOR4, aggregate("vec4", &[".r", ".g", ".b", ".a"])),
        (&types::VECTOR2, aggregate("vec2", &[".x", ".y"])),
        (&types::VECTOR3, aggregate("vec3", &[".x", ".y", ".z"])),
        (&types::VECTOR4, aggregate("vec4", &[".x", ".y", ".z", ".w"])),
        (
            &types::MATRIX33,
            TypeSyntax::scalar("mat3", "mat3(1.0)", "mat3(1.0)").with_syntax(ValueSyntax::Aggregate),
        ),
        (
            &types::MATRIX44,
            TypeSyntax::scalar("mat4", "mat4(1.0)", "mat4(1.0)").with_syntax(ValueSyntax::Aggregate),
        ),
        (&types::STRING, TypeSyntax::scalar("int", "0", "0")),
        (&types::FILENAME, TypeSyntax::scalar("sampler2D", "", "")),
        (
            &types::INTEGERARRAY,
            TypeSyntax::scalar("int", "", "").with_syntax(ValueSyntax::Array {
                open: "int[{n}](",
                close: ")",
            }),
        ),
        (
            &types::FLOATARRAY,
            TypeSyntax::scalar("float", "", "").with_syntax(ValueSyntax::Array {
                open: "float[{n}](",
                close: ")",
            }),
        ),
    ];
    for (type_desc, type_syntax) in table {
        syntax.register_type_syntax(type_desc, type_syntax)?;
    }
    syntax.register_reserved_words(RESERVED_WORDS.iter().copied());
    Ok(syntax)
}

/// Generates a GLSL fragment function
#[derive(Debug, Clone)]
pub struct GlslShaderGenerator {
    syntax: Syntax,
    procedurals: ProceduralRegistry,
}

impl GlslShaderGenerator {
    /// Create the generator with the built-in procedural nodes
    pub fn new() -> GenResult<Self> {
        Ok(Self {
            syntax: glsl_syntax()?,
            procedurals: ProceduralRegistry::standard(),
        })
    }

    /// Register an additional procedural node
    pub fn with_procedural(mut self, node: Arc<dyn ProceduralNode>) -> Self {
        self.procedurals.register(node);
        self
    }

    fn emit_uniforms(&self, stage: &mut ShaderStage) -> GenResult<()> {
        let mut lines = Vec::new();
        for block in stage.uniform_blocks() {
            if block.is_empty() {
                continue;
            }
            lines.push(format!("// Uniform block: {}", block.name()));
            for port in block.variables() {
                let array = port.value.as_ref().and_then(|v| v.array_len());
                if array == Some(0) {
                    return Err(CoreError::EmptyArray(self.syntax.type_name(port.type_desc)?.to_string()).into());
                }
                lines.push(format!(
                    "{} {};",
                    self.syntax.uniform_qualifier(),
                    self.declaration(port.type_desc, &port.variable, array)?
                ));
            }
            lines.push(String::new());
        }
        for line in lines {
            stage.emit_line(&line);
        }
        Ok(())
    }
}

impl ShaderGenerator for GlslShaderGenerator {
    fn language(&self) -> &str {
        GLSL_LANGUAGE
    }

    fn target(&self) -> &str {
        GLSL_TARGET
    }

    fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    fn procedural_node(&self, category: &str) -> Option<Arc<dyn ProceduralNode>> {
        self.procedurals.get(category)
    }

    fn supports_closures(&self) -> bool {
        false
    }

    fn variable_suffix(&self, type_desc: TypeRef) -> &str {
        if type_desc == &types::FILENAME {
            SAMPLER_SUFFIX
        } else {
            ""
        }
    }

    fn emit_shader(&self, name: &str, graph: &ShaderGraph, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        if graph.output_sockets().len() > 1 {
            return Err(GenError::UnsupportedMultiOutput {
                node: graph.name.clone(),
                generator: GLSL_LANGUAGE.to_string(),
            });
        }

        publish_uniforms(graph, stage)?;
        stage.uniform_block_mut(LIGHT_DATA).add(ShaderPort {
            type_desc: &types::INTEGER,
            variable: NUM_ACTIVE_LIGHT_SOURCES.to_string(),
            path: String::new(),
            value: Some(Value::Integer(0)),
            uniform: true,
        });
        emit_type_definitions(&self.syntax, graph, ctx, stage);
        self.emit_uniforms(stage)?;
        emit_function_definitions(self, graph, ctx, stage)?;

        let mut params = Vec::new();
        for socket in graph.output_sockets() {
            params.push(format!(
                "{} {}",
                self.syntax.output_qualifier(),
                self.declaration(socket.type_desc, &socket.variable, None)?
            ));
        }
        stage.emit_line(&format!("void {name}({})", params.join(", ")));
        emit_function_body(self, graph, ctx, stage)
    }

    fn emit_compound_definition(&self, compound: &CompoundImpl, ctx: &mut GenContext, stage: &mut ShaderStage) -> GenResult<()> {
        emit_void_function(self, compound, ctx, stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_have_no_syntax() {
        let generator = GlslShaderGenerator::new().unwrap();
        assert!(!generator.supports_closures());
        assert!(!generator.syntax().supports(&types::BSDF));
        assert!(generator.syntax().supports(&types::FILENAME));
    }

    #[test]
    fn test_sampler_suffix_only_for_filenames() {
        let generator = GlslShaderGenerator::new().unwrap();
        assert_eq!(generator.variable_suffix(&types::FILENAME), "_sampler");
        assert_eq!(generator.variable_suffix(&types::COLOR3), "");
    }

    #[test]
    fn test_out_is_reserved() {
        let generator = GlslShaderGenerator::new().unwrap();
        let mut used = std::collections::HashSet::new();
        assert_eq!(generator.syntax().make_valid_name("out", &mut used), "out1");
    }
}
