// SPDX-License-Identifier: MIT OR Apache-2.0
//! Procedural node implementations shared by all generators.

pub mod blur;
pub mod conditional;
pub mod constant;

pub use blur::BlurNode;
pub use conditional::{IfNode, SwitchNode};
pub use constant::{ConstantNode, DotNode};

use crate::implementation::ProceduralNode;
use indexmap::IndexMap;
use std::sync::Arc;

/// Procedural implementations by node category
#[derive(Debug, Clone)]
pub struct ProceduralRegistry {
    nodes: IndexMap<String, Arc<dyn ProceduralNode>>,
}

impl ProceduralRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Registry holding the built-in procedural nodes
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ConstantNode));
        registry.register(Arc::new(DotNode));
        registry.register(Arc::new(IfNode::new("ifgreater", ">")));
        registry.register(Arc::new(IfNode::new("ifgreatereq", ">=")));
        registry.register(Arc::new(IfNode::new("ifequal", "==")));
        registry.register(Arc::new(SwitchNode));
        registry.register(Arc::new(BlurNode));
        registry
    }

    /// Register an implementation under its category, replacing any
    /// previous one
    pub fn register(&mut self, node: Arc<dyn ProceduralNode>) {
        self.nodes.insert(node.name().to_string(), node);
    }

    /// Implementation for a category
    pub fn get(&self, category: &str) -> Option<Arc<dyn ProceduralNode>> {
        self.nodes.get(category).cloned()
    }

    /// Registered categories
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

impl Default for ProceduralRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = ProceduralRegistry::standard();
        assert!(registry.get("constant").is_some());
        assert!(registry.get("ifgreatereq").is_some());
        assert!(registry.get("multiply").is_none());
        assert_eq!(registry.categories().count(), 7);
    }
}
