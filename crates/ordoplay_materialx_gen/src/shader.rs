// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generated shader.

use crate::graph::ShaderGraph;
use crate::stage::{ShaderStage, VariableBlock};

/// Result of a generation request: the scheduled graph and the emitted
/// stage
#[derive(Debug, Clone)]
pub struct Shader {
    name: String,
    graph: ShaderGraph,
    stage: ShaderStage,
}

impl Shader {
    /// Create a shader
    pub fn new(name: impl Into<String>, graph: ShaderGraph, stage: ShaderStage) -> Self {
        Self {
            name: name.into(),
            graph,
            stage,
        }
    }

    /// Shader name as requested
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Graph the shader was generated from
    pub fn graph(&self) -> &ShaderGraph {
        &self.graph
    }

    /// Emitted stage
    pub fn stage(&self) -> &ShaderStage {
        &self.stage
    }

    /// Emitted source text
    pub fn source_code(&self) -> &str {
        self.stage.code()
    }

    /// Replace a placeholder in the shader name and source
    pub fn replace_token(&mut self, token: &str, value: &str) {
        self.name = self.name.replace(token, value);
        self.stage.replace_token(token, value);
    }

    /// Uniform block by name
    pub fn uniforms(&self, block: &str) -> Option<&VariableBlock> {
        self.stage.uniform_block(block)
    }
}
