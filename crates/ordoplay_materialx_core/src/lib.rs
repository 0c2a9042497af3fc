// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core data model for `OrdoPlay` material shader generation.
//!
//! This crate holds everything the generation pipeline reads but never
//! mutates while generating:
//! - Type descriptors for the material value types
//! - Typed literal values with string round-tripping
//! - Per-target syntax tables (type names, defaults, value formatting)
//! - The material document model and the standard node library
//! - Library discovery and loading
//!
//! ## Architecture
//!
//! Registries are populated once (a [`Syntax`] per target language, a
//! [`Document`] per library set) and are shared read-only afterwards.

pub mod error;
pub mod types;
pub mod format;
pub mod value;
pub mod syntax;
pub mod document;
pub mod stdlib;
pub mod library;

pub use document::{Document, Implementation, NodeDef, NodeGraph, NodeInstance, PortDef};
pub use error::{CoreError, ErrorKind};
pub use format::{FloatFormat, FloatMode};
pub use library::FileSearchPath;
pub use syntax::{Syntax, TypeSyntax, ValueSyntax};
pub use types::{TypeDesc, TypeRef};
pub use value::Value;
