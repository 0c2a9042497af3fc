// SPDX-License-Identifier: MIT OR Apache-2.0
//! Append-only source buffer with uniform blocks.

use indexmap::IndexMap;
use ordoplay_materialx_core::{TypeRef, Value};
use std::collections::HashSet;

/// Name of the single pixel stage
pub const PIXEL_STAGE: &str = "pixel";
/// Block of uniforms published to the host
pub const PUBLIC_UNIFORMS: &str = "PublicUniforms";
/// Block of light data uniforms supplied by the renderer
pub const LIGHT_DATA: &str = "LightData";

/// A variable declared by a stage
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderPort {
    /// Variable type
    pub type_desc: TypeRef,
    /// Variable name
    pub variable: String,
    /// Element path in the source document
    pub path: String,
    /// Default value
    pub value: Option<Value>,
    /// Whether the variable is a uniform
    pub uniform: bool,
}

/// Named, ordered block of variables
#[derive(Debug, Clone, Default)]
pub struct VariableBlock {
    name: String,
    variables: Vec<ShaderPort>,
}

impl VariableBlock {
    /// Create an empty block
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
        }
    }

    /// Block name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a variable; returns false if the name is already declared
    pub fn add(&mut self, port: ShaderPort) -> bool {
        if self.find(&port.variable).is_some() {
            return false;
        }
        self.variables.push(port);
        true
    }

    /// Find a variable by name
    pub fn find(&self, variable: &str) -> Option<&ShaderPort> {
        self.variables.iter().find(|p| p.variable == variable)
    }

    /// Variables in declaration order
    pub fn variables(&self) -> &[ShaderPort] {
        &self.variables
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Source buffer for one shader stage.
///
/// Text is only ever appended; a failed generation leaves a partial
/// buffer that callers discard.
#[derive(Debug, Clone)]
pub struct ShaderStage {
    name: String,
    code: String,
    indent_width: usize,
    depth: usize,
    functions: HashSet<String>,
    blocks: IndexMap<String, VariableBlock>,
}

impl ShaderStage {
    /// Create an empty stage
    pub fn new(name: impl Into<String>, indent_width: usize) -> Self {
        Self {
            name: name.into(),
            code: String::new(),
            indent_width,
            depth: 0,
            functions: HashSet::new(),
            blocks: IndexMap::new(),
        }
    }

    /// Stage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text so far
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace every occurrence of a placeholder in the finished text
    pub fn replace_token(&mut self, token: &str, value: &str) {
        self.code = self.code.replace(token, value);
    }

    /// Append an indented line
    pub fn emit_line(&mut self, line: &str) {
        self.code.push_str(&" ".repeat(self.depth * self.indent_width));
        self.code.push_str(line);
        self.code.push('\n');
    }

    /// Append an indented statement terminated by `;`
    pub fn emit_statement(&mut self, statement: &str) {
        self.emit_line(&format!("{statement};"));
    }

    /// Append an empty line
    pub fn emit_empty_line(&mut self) {
        self.code.push('\n');
    }

    /// Append multi-line text, indenting every non-empty line
    pub fn emit_block(&mut self, text: &str) {
        for line in text.lines() {
            if line.trim().is_empty() {
                self.emit_empty_line();
            } else {
                self.emit_line(line);
            }
        }
    }

    /// Open a brace scope
    pub fn begin_scope(&mut self) {
        self.emit_line("{");
        self.depth += 1;
    }

    /// Close a brace scope
    pub fn end_scope(&mut self, semicolon: bool) {
        self.depth = self.depth.saturating_sub(1);
        self.emit_line(if semicolon { "};" } else { "}" });
    }

    /// Record a function as emitted; returns false if it already was
    pub fn add_function(&mut self, name: &str) -> bool {
        self.functions.insert(name.to_string())
    }

    /// Whether a function was emitted
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// Get or create a uniform block
    pub fn uniform_block_mut(&mut self, name: &str) -> &mut VariableBlock {
        self.blocks
            .entry(name.to_string())
            .or_insert_with(|| VariableBlock::new(name))
    }

    /// Get a uniform block
    pub fn uniform_block(&self, name: &str) -> Option<&VariableBlock> {
        self.blocks.get(name)
    }

    /// All uniform blocks in creation order
    pub fn uniform_blocks(&self) -> impl Iterator<Item = &VariableBlock> {
        self.blocks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_materialx_core::types;

    #[test]
    fn test_scopes_indent() {
        let mut stage = ShaderStage::new(PIXEL_STAGE, 4);
        stage.emit_line("void f()");
        stage.begin_scope();
        stage.emit_statement("float x = 1.0");
        stage.end_scope(false);
        assert_eq!(stage.code(), "void f()\n{\n    float x = 1.0;\n}\n");
    }

    #[test]
    fn test_functions_emitted_once() {
        let mut stage = ShaderStage::new(PIXEL_STAGE, 4);
        assert!(stage.add_function("mx_image_color3"));
        assert!(!stage.add_function("mx_image_color3"));
        assert!(stage.has_function("mx_image_color3"));
    }

    #[test]
    fn test_uniform_block_dedupes() {
        let mut stage = ShaderStage::new(PIXEL_STAGE, 4);
        let port = ShaderPort {
            type_desc: &types::FLOAT,
            variable: "amount".to_string(),
            path: "g/amount".to_string(),
            value: Some(Value::Float(0.5)),
            uniform: true,
        };
        assert!(stage.uniform_block_mut(PUBLIC_UNIFORMS).add(port.clone()));
        assert!(!stage.uniform_block_mut(PUBLIC_UNIFORMS).add(port));
        assert_eq!(stage.uniform_block(PUBLIC_UNIFORMS).unwrap().variables().len(), 1);
    }
}
