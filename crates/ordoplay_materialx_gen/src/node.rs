// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader graph nodes.

use crate::implementation::Implementation;
use crate::port::{ShaderInput, ShaderOutput};
use crate::scope::{branch_bit, ScopeInfo};
use ordoplay_materialx_core::document::NodeDef;
use ordoplay_materialx_core::types::Semantic;
use ordoplay_materialx_core::CoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

bitflags::bitflags! {
    /// Node classification, composable by OR
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Classification: u32 {
        /// Produces a plain value
        const TEXTURE = 1 << 0;
        /// Produces a light integration closure
        const CLOSURE = 1 << 1;
        /// Produces a shader
        const SHADER = 1 << 2;
        /// Reads a texture file
        const FILETEXTURE = 1 << 3;
        /// Selects between branch inputs
        const CONDITIONAL = 1 << 4;
        /// Closure is a BSDF
        const BSDF = 1 << 5;
        /// Closure is an EDF
        const EDF = 1 << 6;
        /// Closure is a VDF
        const VDF = 1 << 7;
        /// Shader is a surface shader
        const SURFACE = 1 << 8;
        /// Shader is a volume shader
        const VOLUME = 1 << 9;
        /// Shader is a light shader
        const LIGHT = 1 << 10;
    }
}

impl Classification {
    /// Derive the classification of a nodedef from its first output type
    /// and its category
    pub fn from_nodedef(nodedef: &NodeDef) -> Result<Self, CoreError> {
        let mut classification = match nodedef.outputs.first() {
            Some(output) => {
                let ty = output.type_desc()?;
                match (ty.semantic(), ty.name()) {
                    (Semantic::Closure, "BSDF") => Self::CLOSURE | Self::BSDF,
                    (Semantic::Closure, "EDF") => Self::CLOSURE | Self::EDF,
                    (Semantic::Closure, _) => Self::CLOSURE | Self::VDF,
                    (Semantic::Shader, "surfaceshader") => Self::SHADER | Self::SURFACE,
                    (Semantic::Shader, "volumeshader") => Self::SHADER | Self::VOLUME,
                    (Semantic::Shader, "lightshader") => Self::SHADER | Self::LIGHT,
                    (Semantic::Shader | Semantic::Material, _) => Self::SHADER,
                    _ => Self::TEXTURE,
                }
            }
            None => Self::TEXTURE,
        };

        match nodedef.node.as_str() {
            "image" => classification |= Self::FILETEXTURE,
            "ifgreater" | "ifgreatereq" | "ifequal" | "switch" => classification |= Self::CONDITIONAL,
            _ => {}
        }
        Ok(classification)
    }
}

/// A node in a shader graph
#[derive(Debug, Clone)]
pub struct ShaderNode {
    /// Unique instance ID
    pub id: NodeId,
    /// Name, unique within its graph
    pub name: String,
    /// Node category
    pub category: String,
    /// Nodedef name
    pub nodedef: String,
    /// Classification flags
    pub classification: Classification,
    /// Inputs in declaration order
    pub inputs: Vec<ShaderInput>,
    /// Outputs in declaration order
    pub outputs: Vec<ShaderOutput>,
    /// How the node is emitted
    pub implementation: Implementation,
    /// Execution scope, computed by the scheduler
    pub scope: ScopeInfo,
}

impl ShaderNode {
    /// Create a node with no ports
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        nodedef: impl Into<String>,
        implementation: Implementation,
    ) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            category: category.into(),
            nodedef: nodedef.into(),
            classification: Classification::TEXTURE,
            inputs: Vec::new(),
            outputs: Vec::new(),
            implementation,
            scope: ScopeInfo::Unknown,
        }
    }

    /// Add an input
    pub fn with_input(mut self, input: ShaderInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add an output
    pub fn with_output(mut self, output: ShaderOutput) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set the classification
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    /// Find an input by name
    pub fn input(&self, name: &str) -> Option<&ShaderInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Index of an input by name
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    /// Find an output by name
    pub fn output(&self, name: &str) -> Option<&ShaderOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Index of an output by name
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|o| o.name == name)
    }

    /// Whether the node has all of the given classification flags
    pub fn has_classification(&self, classification: Classification) -> bool {
        self.classification.contains(classification)
    }

    /// Bit mask of the branch inputs of a conditional node.
    ///
    /// Branch inputs are named `in1`, `in2`, ...; bit `1 << i` is set for
    /// the branch input at index `i`. Non-conditional nodes have no mask.
    pub fn branch_mask(&self) -> Option<u32> {
        if !self.has_classification(Classification::CONDITIONAL) {
            return None;
        }
        let mask = self
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| is_branch_input(&input.name))
            .fold(0u32, |mask, (index, _)| mask | branch_bit(index));
        Some(mask)
    }
}

fn is_branch_input(name: &str) -> bool {
    name.strip_prefix("in")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
