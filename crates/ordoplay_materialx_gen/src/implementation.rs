// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node implementations: how a node turns into code.

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::generator::ShaderGenerator;
use crate::graph::ShaderGraph;
use crate::node::ShaderNode;
use crate::stage::ShaderStage;
use ordoplay_materialx_core::document;
use std::fmt;
use std::sync::Arc;

/// Node implemented by code rather than by a source file
pub trait ProceduralNode: fmt::Debug + Send + Sync {
    /// Category the implementation is registered for
    fn name(&self) -> &str;

    /// Emit helper functions the calls depend on
    fn emit_function_definition(
        &self,
        _node: &ShaderNode,
        _generator: &dyn ShaderGenerator,
        _ctx: &mut GenContext,
        _stage: &mut ShaderStage,
    ) -> GenResult<()> {
        Ok(())
    }

    /// Emit the code computing the node's outputs
    fn emit_function_call(
        &self,
        node: &ShaderNode,
        graph: &ShaderGraph,
        generator: &dyn ShaderGenerator,
        ctx: &mut GenContext,
        stage: &mut ShaderStage,
    ) -> GenResult<()>;
}

/// Implementation backed by source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCodeImpl {
    /// Implementation element name
    pub name: String,
    /// Function to call
    pub function: String,
    /// Function source, or the expression for inline implementations
    pub source: String,
    /// Whether `source` is an inline expression with `{{input}}` tokens
    pub inlined: bool,
}

impl SourceCodeImpl {
    /// Load the source of an implementation element.
    ///
    /// Embedded source wins over `file`; files are resolved through the
    /// context's search path. Inline expressions have their newlines
    /// removed.
    pub fn load(implementation: &document::Implementation, ctx: &mut GenContext) -> GenResult<Self> {
        let inlined = implementation.is_inline();
        let mut source = match (&implementation.source, &implementation.file) {
            (Some(source), _) => source.clone(),
            (None, Some(file)) => ctx.load_source(file)?,
            (None, None) => return Err(GenError::MissingSourceFile(implementation.name.clone())),
        };
        if inlined {
            source.retain(|c| c != '\n' && c != '\r');
        }

        Ok(Self {
            name: implementation.name.clone(),
            function: implementation.function_name().to_string(),
            source,
            inlined,
        })
    }
}

/// Implementation backed by a node graph
#[derive(Debug, Clone)]
pub struct CompoundImpl {
    /// Node graph name
    pub name: String,
    /// Generated function name
    pub function: String,
    /// Graph built from the node graph
    pub graph: Box<ShaderGraph>,
}

/// How a node is emitted
#[derive(Debug, Clone)]
pub enum Implementation {
    /// Source file or inline expression
    SourceCode(SourceCodeImpl),
    /// Node graph emitted as a function, or inlined by flattening
    Compound(CompoundImpl),
    /// Code-generating implementation owned by the generator
    Procedural(Arc<dyn ProceduralNode>),
}

impl Implementation {
    /// Inline expression implementation
    pub fn inline(name: impl Into<String>, expression: impl Into<String>) -> Self {
        let name = name.into();
        Self::SourceCode(SourceCodeImpl {
            function: name.clone(),
            name,
            source: expression.into(),
            inlined: true,
        })
    }

    /// Name of the implementation
    pub fn name(&self) -> &str {
        match self {
            Self::SourceCode(s) => &s.name,
            Self::Compound(c) => &c.name,
            Self::Procedural(p) => p.name(),
        }
    }

    /// Whether this is a compound implementation
    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenOptions;

    fn element(file: Option<&str>, source: Option<&str>) -> document::Implementation {
        document::Implementation {
            name: "IM_test".to_string(),
            nodedef: "ND_test".to_string(),
            file: file.map(String::from),
            function: None,
            language: "osl".to_string(),
            target: String::new(),
            source: source.map(String::from),
        }
    }

    #[test]
    fn test_inline_newlines_removed() {
        let mut ctx = GenContext::new(GenOptions::default());
        let im = SourceCodeImpl::load(&element(Some("mx_test.inline"), Some("{{in1}}\n * {{in2}}\n")), &mut ctx).unwrap();
        assert!(im.inlined);
        assert_eq!(im.source, "{{in1}} * {{in2}}");
        assert_eq!(im.function, "ND_test");
    }

    #[test]
    fn test_source_read_through_search_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mx_test.osl"), "void ND_test() {}\n").unwrap();
        let mut ctx = GenContext::new(GenOptions::default());
        ctx.search_path.append(dir.path());

        let im = SourceCodeImpl::load(&element(Some("mx_test.osl"), None), &mut ctx).unwrap();
        assert!(!im.inlined);
        assert_eq!(im.source, "void ND_test() {}\n");
    }

    #[test]
    fn test_missing_file() {
        let mut ctx = GenContext::new(GenOptions::default());
        let err = SourceCodeImpl::load(&element(None, None), &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ordoplay_materialx_core::ErrorKind::Lookup);

        let err = SourceCodeImpl::load(&element(Some("mx_missing.osl"), None), &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ordoplay_materialx_core::ErrorKind::Io);
    }
}
