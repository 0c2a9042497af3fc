// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader generation for `OrdoPlay` materials.
//!
//! This crate turns a material document's node graph into shading
//! language source:
//! - Shader graph construction with implementation lookup per target
//! - Compound flattening
//! - Topological scheduling and conditional scope propagation
//! - OSL, MDL and GLSL fragment generators
//! - Fragment wrapping with content-hashed names
//!
//! ## Architecture
//!
//! A [`ShaderGraph`] is an arena of [`ShaderNode`]s keyed by [`NodeId`].
//! Connections are `(owner, index)` handles into the arena, so the graph
//! can be cloned, flattened and reordered without reference juggling.
//! Generators implement [`ShaderGenerator`]; the shared emission logic
//! lives in free functions that take `&dyn ShaderGenerator`.

pub mod error;
pub mod node;
pub mod port;
pub mod scope;
pub mod graph;
pub mod edge;
pub mod build;
pub mod flatten;
pub mod sort;
pub mod implementation;
pub mod context;
pub mod stage;
pub mod shader;
pub mod generator;
pub mod generators;
pub mod nodes;
pub mod fragment;

pub use context::{GenContext, GenOptions};
pub use error::{GenError, GenResult};
pub use fragment::{Fragment, FragmentGenerator};
pub use generator::{generate_from_node, generate_from_node_graph, ShaderGenerator};
pub use generators::{GlslShaderGenerator, MdlShaderGenerator, OslShaderGenerator};
pub use graph::ShaderGraph;
pub use implementation::{Implementation, ProceduralNode};
pub use node::{Classification, NodeId, ShaderNode};
pub use nodes::ProceduralRegistry;
pub use port::{PortOwner, PortRef, ShaderInput, ShaderOutput};
pub use scope::ScopeInfo;
pub use shader::Shader;
