// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fragment wrapping for GLSL-family hosts.
//!
//! A fragment is the generated GLSL function wrapped in a host description
//! listing its parameters, default values and outputs. The fragment's name
//! is derived from a hash of the wrapper text, so identical graphs always
//! produce identical names and any change produces a new one.

use crate::context::GenContext;
use crate::error::GenResult;
use crate::generator::{generate, ShaderGenerator};
use crate::generators::glsl::SAMPLER_SUFFIX;
use crate::generators::GlslShaderGenerator;
use crate::graph::ShaderGraph;
use crate::shader::Shader;
use crate::stage::{LIGHT_DATA, PUBLIC_UNIFORMS};
use indexmap::IndexMap;
use ordoplay_materialx_core::document::{Document, NodeGraph, NodeInstance};
use ordoplay_materialx_core::{types, TypeRef};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Placeholder for the fragment name in the wrapper text
pub const FRAGMENT_NAME_TOKEN: &str = "$fragmentName";

/// Suffix of texture names derived from sampler variables
pub const TEXTURE_SUFFIX: &str = "_texture";

/// Bytes of the hash used in fragment names
const HASH_BYTES: usize = 8;

/// Translates the primary GLSL source into a secondary language variant
pub trait CrossCompiler: Send + Sync {
    /// Language of the translated source (e.g. `HLSL`)
    fn language(&self) -> &str;

    /// Translate GLSL source text
    fn cross_compile(&self, source: &str) -> Result<String, String>;
}

/// A wrapped fragment
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Hashed fragment name, `<base>__<hex>`
    pub name: String,
    /// Wrapper text with the name substituted
    pub text: String,
    /// Element path of each bound parameter to the name the host binds
    pub path_map: IndexMap<String, String>,
    /// Generated shader, with the name substituted
    pub shader: Shader,
}

/// Texture name the host binds for a sampler variable
pub fn sampler_to_texture_name(sampler: &str) -> String {
    match sampler.strip_suffix(SAMPLER_SUFFIX) {
        Some(base) => format!("{base}{TEXTURE_SUFFIX}"),
        None => format!("{sampler}{TEXTURE_SUFFIX}"),
    }
}

/// Name of a fragment: a valid identifier from `base` followed by the
/// hex digest of the wrapper text with carriage returns removed
pub fn fragment_name(generator: &dyn ShaderGenerator, base: &str, text: &str) -> String {
    let normalized: String = text.chars().filter(|c| *c != '\r').collect();
    let digest = Sha256::digest(normalized.as_bytes());
    let mut hex = String::with_capacity(HASH_BYTES * 2);
    for byte in &digest[..HASH_BYTES] {
        let _ = write!(hex, "{byte:02x}");
    }
    let base = generator.syntax().make_valid_name(base, &mut HashSet::new());
    format!("{base}__{hex}")
}

fn host_type(type_desc: TypeRef) -> &'static str {
    match type_desc.name() {
        "boolean" => "bool",
        "integer" => "int",
        "vector2" | "color2" => "float2",
        "vector3" | "color3" => "float3",
        "vector4" | "color4" => "float4",
        "matrix33" => "float3x3",
        "matrix44" => "float4x4",
        "string" => "string",
        "filename" => "texture2",
        _ => "float",
    }
}

/// Generates fragments with the GLSL generator, optionally carrying a
/// cross-compiled secondary variant
pub struct FragmentGenerator {
    glsl: GlslShaderGenerator,
    cross_compiler: Option<Box<dyn CrossCompiler>>,
}

impl FragmentGenerator {
    /// Create a fragment generator without a secondary variant
    pub fn new() -> GenResult<Self> {
        Ok(Self {
            glsl: GlslShaderGenerator::new()?,
            cross_compiler: None,
        })
    }

    /// Use a cross compiler for the secondary variant
    pub fn with_cross_compiler(mut self, cross_compiler: Box<dyn CrossCompiler>) -> Self {
        self.cross_compiler = Some(cross_compiler);
        self
    }

    /// Underlying GLSL generator
    pub fn generator(&self) -> &GlslShaderGenerator {
        &self.glsl
    }

    /// Generate a fragment from a node graph
    pub fn generate_from_node_graph(
        &self,
        base_name: &str,
        node_graph: &NodeGraph,
        document: &Document,
        ctx: &mut GenContext,
    ) -> GenResult<Fragment> {
        let graph = ShaderGraph::from_node_graph(node_graph, document, &self.glsl, ctx)?;
        self.wrap(base_name, graph, ctx)
    }

    /// Generate a fragment from a single node
    pub fn generate_from_node(
        &self,
        base_name: &str,
        node: &NodeInstance,
        document: &Document,
        ctx: &mut GenContext,
    ) -> GenResult<Fragment> {
        let graph = ShaderGraph::from_node(node, document, &self.glsl, ctx)?;
        self.wrap(base_name, graph, ctx)
    }

    fn wrap(&self, base_name: &str, graph: ShaderGraph, ctx: &mut GenContext) -> GenResult<Fragment> {
        let mut shader = generate(&self.glsl, FRAGMENT_NAME_TOKEN, graph, ctx)?;
        let fmt = ctx.float_format();

        let mut text = String::new();
        let mut line = |s: &str| {
            text.push_str(s);
            text.push('\n');
        };
        line(&format!(
            "<fragment uiName=\"{FRAGMENT_NAME_TOKEN}\" name=\"{FRAGMENT_NAME_TOKEN}\" type=\"plumbing\" class=\"ShadeFragment\" version=\"1\">"
        ));
        line(&format!(
            "  <description><![CDATA[Generated from {}]]></description>",
            shader.graph().name
        ));

        let uniforms = shader.uniforms(PUBLIC_UNIFORMS).map(|b| b.variables()).unwrap_or_default();
        line("  <properties>");
        for port in uniforms {
            if port.type_desc == &types::FILENAME {
                line(&format!(
                    "    <texture2 name=\"{}\" />",
                    sampler_to_texture_name(&port.variable)
                ));
                line(&format!("    <sampler name=\"{}\" />", port.variable));
            } else {
                line(&format!("    <{} name=\"{}\" />", host_type(port.type_desc), port.variable));
            }
        }
        line("  </properties>");

        line("  <values>");
        for port in uniforms.iter().filter(|p| p.type_desc != &types::FILENAME) {
            if let Some(value) = &port.value {
                line(&format!(
                    "    <{} name=\"{}\" value=\"{}\" />",
                    host_type(port.type_desc),
                    port.variable,
                    value.to_string_with(&fmt).replace(", ", ",")
                ));
            }
        }
        line("  </values>");

        line("  <outputs>");
        for socket in shader.graph().output_sockets() {
            line(&format!("    <{} name=\"{}\" />", host_type(socket.type_desc), socket.variable));
        }
        line("  </outputs>");

        line("  <implementation>");
        line("  <implementation render=\"OGSRenderer\" language=\"GLSL\" lang_version=\"3.0\">");
        line(&format!("    <function_name val=\"{FRAGMENT_NAME_TOKEN}\" />"));
        line(&format!("    <source><![CDATA[\n{}]]></source>", shader.source_code()));
        line("  </implementation>");
        if ctx.options.fragment_secondary {
            if let Some(cross_compiler) = &self.cross_compiler {
                match cross_compiler.cross_compile(shader.source_code()) {
                    Ok(secondary) => {
                        line(&format!(
                            "  <implementation render=\"OGSRenderer\" language=\"{}\" lang_version=\"11.0\">",
                            cross_compiler.language()
                        ));
                        line(&format!("    <function_name val=\"{FRAGMENT_NAME_TOKEN}\" />"));
                        line(&format!("    <source><![CDATA[\n{secondary}]]></source>"));
                        line("  </implementation>");
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Skipping {} variant of fragment '{}': {}",
                            cross_compiler.language(),
                            base_name,
                            e
                        );
                    }
                }
            }
        }
        line("  </implementation>");
        line("</fragment>");

        let name = fragment_name(&self.glsl, base_name, &text);
        let text = text.replace(FRAGMENT_NAME_TOKEN, &name);
        shader.replace_token(FRAGMENT_NAME_TOKEN, &name);

        let mut path_map = IndexMap::new();
        for block in shader.stage().uniform_blocks().filter(|b| b.name() != LIGHT_DATA) {
            for port in block.variables().iter().filter(|p| !p.path.is_empty()) {
                let bound = if port.type_desc == &types::FILENAME {
                    sampler_to_texture_name(&port.variable)
                } else {
                    port.variable.clone()
                };
                path_map.insert(port.path.clone(), bound);
            }
        }

        tracing::info!("Wrapped fragment '{}' ({} parameters)", name, path_map.len());
        Ok(Fragment {
            name,
            text,
            path_map,
            shader,
        })
    }
}
