// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generation options and per-request context.

use crate::error::{GenError, GenResult};
use ordoplay_materialx_core::{CoreError, FileSearchPath, FloatFormat};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Options controlling code generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenOptions {
    /// How float literals are written
    pub float_format: FloatFormat,
    /// Inline compound graphs instead of emitting them as functions
    pub flatten_subgraphs: bool,
    /// Renderer target overriding the generator's own
    pub target: Option<String>,
    /// Spaces per indentation level
    pub indent: usize,
    /// Emit type definitions at the top of each stage
    pub emit_type_definitions: bool,
    /// Include the cross-compiled variant in fragments
    pub fragment_secondary: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            float_format: FloatFormat::default(),
            flatten_subgraphs: true,
            target: None,
            indent: 4,
            emit_type_definitions: true,
            fragment_secondary: false,
        }
    }
}

impl GenOptions {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Load options from a file
    pub fn load(path: &Path) -> GenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&contents).map_err(|e| {
            GenError::Core(CoreError::DocumentParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })
    }
}

/// State for one generation request
#[derive(Debug, Clone)]
pub struct GenContext {
    /// Options
    pub options: GenOptions,
    /// Roots used to resolve implementation source files
    pub search_path: FileSearchPath,
    /// Identifiers used by top-level names in the output
    pub identifiers: HashSet<String>,
    compound_stack: Vec<String>,
    source_cache: HashMap<String, String>,
}

impl GenContext {
    /// Create a context with an empty search path
    pub fn new(options: GenOptions) -> Self {
        Self {
            options,
            search_path: FileSearchPath::new(),
            identifiers: HashSet::new(),
            compound_stack: Vec::new(),
            source_cache: HashMap::new(),
        }
    }

    /// Set the search path
    pub fn with_search_path(mut self, search_path: FileSearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    /// Float formatting in effect
    pub fn float_format(&self) -> FloatFormat {
        self.options.float_format
    }

    /// Whether a compound graph is being built
    pub fn in_compound(&self) -> bool {
        !self.compound_stack.is_empty()
    }

    /// Enter a compound graph; fails if it is already being built
    pub(crate) fn push_compound(&mut self, name: &str) -> GenResult<()> {
        if self.compound_stack.iter().any(|n| n == name) {
            return Err(GenError::CyclicCompound(name.to_string()));
        }
        self.compound_stack.push(name.to_string());
        Ok(())
    }

    /// Leave the innermost compound graph
    pub(crate) fn pop_compound(&mut self) {
        self.compound_stack.pop();
    }

    /// Read a source file through the search path, caching its text
    pub fn load_source(&mut self, file: &str) -> GenResult<String> {
        if let Some(source) = self.source_cache.get(file) {
            return Ok(source.clone());
        }
        let source = self.search_path.read_to_string(file)?;
        tracing::debug!("Loaded source file {}", file);
        self.source_cache.insert(file.to_string(), source.clone());
        Ok(source)
    }
}

impl Default for GenContext {
    fn default() -> Self {
        Self::new(GenOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_materialx_core::FloatMode;

    #[test]
    fn test_options_from_partial_ron() {
        let options = GenOptions::from_ron("(flatten_subgraphs: false, indent: 2)").unwrap();
        assert!(!options.flatten_subgraphs);
        assert_eq!(options.indent, 2);
        assert!(options.emit_type_definitions);
        assert_eq!(options.float_format.mode, FloatMode::Shortest);
    }

    #[test]
    fn test_options_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.ron");
        let options = GenOptions {
            float_format: FloatFormat::fixed(3),
            target: Some("arnold".to_string()),
            ..GenOptions::default()
        };
        std::fs::write(&path, options.to_ron().unwrap()).unwrap();
        assert_eq!(GenOptions::load(&path).unwrap(), options);
    }

    #[test]
    fn test_compound_stack() {
        let mut ctx = GenContext::default();
        ctx.push_compound("NG_a").unwrap();
        ctx.push_compound("NG_b").unwrap();
        let err = ctx.push_compound("NG_a").unwrap_err();
        assert!(matches!(err, GenError::CyclicCompound(_)));
        ctx.pop_compound();
        ctx.pop_compound();
        assert!(!ctx.in_compound());
    }
}
