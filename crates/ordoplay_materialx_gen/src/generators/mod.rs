// SPDX-License-Identifier: MIT OR Apache-2.0
//! Target language generators.

pub mod glsl;
pub mod mdl;
pub mod osl;

pub use glsl::GlslShaderGenerator;
pub use mdl::MdlShaderGenerator;
pub use osl::OslShaderGenerator;

use crate::error::GenResult;
use crate::generator::ShaderGenerator;

/// Create the generator for a language name (`osl`, `mdl`, `glsl`)
pub fn for_language(language: &str) -> GenResult<Option<Box<dyn ShaderGenerator>>> {
    Ok(match language {
        osl::OSL_LANGUAGE => Some(Box::new(OslShaderGenerator::new()?)),
        mdl::MDL_LANGUAGE => Some(Box::new(MdlShaderGenerator::new()?)),
        glsl::GLSL_LANGUAGE => Some(Box::new(GlslShaderGenerator::new()?)),
        _ => None,
    })
}
