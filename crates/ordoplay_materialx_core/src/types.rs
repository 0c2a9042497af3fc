// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type descriptors for values flowing through a shading network.
//!
//! Descriptors are statics: they are created once, never mutated, and
//! compared by name. Use [`TypeDesc::get`] to resolve a type name read
//! from a document.

use std::fmt;

/// Reference to a registered type descriptor
pub type TypeRef = &'static TypeDesc;

/// Storage type of each component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// No storage (closures, shaders)
    None,
    /// Boolean
    Boolean,
    /// 32-bit integer
    Integer,
    /// 32-bit float
    Float,
    /// Text
    String,
}

/// What the components mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    /// Plain value
    None,
    /// Color channels (r, g, b, a)
    Color,
    /// Vector components (x, y, z, w)
    Vector,
    /// Square matrix
    Matrix,
    /// Texture file reference
    Filename,
    /// Light integration closure
    Closure,
    /// Shader
    Shader,
    /// Material
    Material,
}

/// Immutable description of a value type
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TypeDesc {
    name: &'static str,
    base: BaseType,
    semantic: Semantic,
    size: usize,
    array: bool,
}

impl TypeDesc {
    const fn new(
        name: &'static str,
        base: BaseType,
        semantic: Semantic,
        size: usize,
        array: bool,
    ) -> Self {
        Self {
            name,
            base,
            semantic,
            size,
            array,
        }
    }

    /// Registered name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Component storage type
    pub fn base_type(&self) -> BaseType {
        self.base
    }

    /// Component meaning
    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    /// Number of components (zero for closures and arrays)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this is a variable-length array type
    pub fn is_array(&self) -> bool {
        self.array
    }

    /// Whether this is a single-component, non-array type
    pub fn is_scalar(&self) -> bool {
        self.size == 1 && !self.array
    }

    /// Whether this type has more than one component
    pub fn is_aggregate(&self) -> bool {
        self.size > 1
    }

    /// Whether this is a closure type (BSDF, EDF, VDF)
    pub fn is_closure(&self) -> bool {
        self.semantic == Semantic::Closure
    }

    /// Whether this is a shader or material type
    pub fn is_shader(&self) -> bool {
        matches!(self.semantic, Semantic::Shader | Semantic::Material)
    }

    /// Index of a swizzle channel within this type.
    ///
    /// Scalars accept `r` and `x` as their single channel. Two-component
    /// colors use `r` and `a`.
    pub fn channel_index(&self, channel: char) -> Option<usize> {
        let index = match (self.semantic, self.size, channel) {
            (_, 1, 'r' | 'x') => 0,
            (Semantic::Color, 2, 'r') => 0,
            (Semantic::Color, 2, 'a') => 1,
            (Semantic::Color, _, 'r') => 0,
            (Semantic::Color, _, 'g') => 1,
            (Semantic::Color, _, 'b') => 2,
            (Semantic::Color, _, 'a') => 3,
            (Semantic::Vector, _, 'x') => 0,
            (Semantic::Vector, _, 'y') => 1,
            (Semantic::Vector, _, 'z') => 2,
            (Semantic::Vector, _, 'w') => 3,
            _ => return None,
        };
        (index < self.size).then_some(index)
    }

    /// Look up a type by name
    pub fn get(name: &str) -> Option<TypeRef> {
        ALL.iter().copied().find(|t| t.name == name)
    }

    /// Look up the first type with the given semantic and component count
    pub fn find(semantic: Semantic, size: usize) -> Option<TypeRef> {
        ALL.iter()
            .copied()
            .find(|t| t.semantic == semantic && t.size == size && !t.array)
    }

    /// All registered types
    pub fn all() -> &'static [TypeRef] {
        ALL
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// `boolean`
pub static BOOLEAN: TypeDesc = TypeDesc::new("boolean", BaseType::Boolean, Semantic::None, 1, false);
/// `integer`
pub static INTEGER: TypeDesc = TypeDesc::new("integer", BaseType::Integer, Semantic::None, 1, false);
/// `float`
pub static FLOAT: TypeDesc = TypeDesc::new("float", BaseType::Float, Semantic::None, 1, false);
/// `vector2`
pub static VECTOR2: TypeDesc = TypeDesc::new("vector2", BaseType::Float, Semantic::Vector, 2, false);
/// `vector3`
pub static VECTOR3: TypeDesc = TypeDesc::new("vector3", BaseType::Float, Semantic::Vector, 3, false);
/// `vector4`
pub static VECTOR4: TypeDesc = TypeDesc::new("vector4", BaseType::Float, Semantic::Vector, 4, false);
/// `color2`
pub static COLOR2: TypeDesc = TypeDesc::new("color2", BaseType::Float, Semantic::Color, 2, false);
/// `color3`
pub static COLOR3: TypeDesc = TypeDesc::new("color3", BaseType::Float, Semantic::Color, 3, false);
/// `color4`
pub static COLOR4: TypeDesc = TypeDesc::new("color4", BaseType::Float, Semantic::Color, 4, false);
/// `matrix33`
pub static MATRIX33: TypeDesc = TypeDesc::new("matrix33", BaseType::Float, Semantic::Matrix, 9, false);
/// `matrix44`
pub static MATRIX44: TypeDesc = TypeDesc::new("matrix44", BaseType::Float, Semantic::Matrix, 16, false);
/// `string`
pub static STRING: TypeDesc = TypeDesc::new("string", BaseType::String, Semantic::None, 1, false);
/// `filename`
pub static FILENAME: TypeDesc = TypeDesc::new("filename", BaseType::String, Semantic::Filename, 1, false);
/// `integerarray`
pub static INTEGERARRAY: TypeDesc = TypeDesc::new("integerarray", BaseType::Integer, Semantic::None, 0, true);
/// `floatarray`
pub static FLOATARRAY: TypeDesc = TypeDesc::new("floatarray", BaseType::Float, Semantic::None, 0, true);
/// `BSDF`
pub static BSDF: TypeDesc = TypeDesc::new("BSDF", BaseType::None, Semantic::Closure, 1, false);
/// `EDF`
pub static EDF: TypeDesc = TypeDesc::new("EDF", BaseType::None, Semantic::Closure, 1, false);
/// `VDF`
pub static VDF: TypeDesc = TypeDesc::new("VDF", BaseType::None, Semantic::Closure, 1, false);
/// `surfaceshader`
pub static SURFACESHADER: TypeDesc = TypeDesc::new("surfaceshader", BaseType::None, Semantic::Shader, 1, false);
/// `volumeshader`
pub static VOLUMESHADER: TypeDesc = TypeDesc::new("volumeshader", BaseType::None, Semantic::Shader, 1, false);
/// `displacementshader`
pub static DISPLACEMENTSHADER: TypeDesc = TypeDesc::new("displacementshader", BaseType::None, Semantic::Shader, 1, false);
/// `lightshader`
pub static LIGHTSHADER: TypeDesc = TypeDesc::new("lightshader", BaseType::None, Semantic::Shader, 1, false);
/// `material`
pub static MATERIAL: TypeDesc = TypeDesc::new("material", BaseType::None, Semantic::Material, 1, false);

static ALL: &[TypeRef] = &[
    &BOOLEAN,
    &INTEGER,
    &FLOAT,
    &VECTOR2,
    &VECTOR3,
    &VECTOR4,
    &COLOR2,
    &COLOR3,
    &COLOR4,
    &MATRIX33,
    &MATRIX44,
    &STRING,
    &FILENAME,
    &INTEGERARRAY,
    &FLOATARRAY,
    &BSDF,
    &EDF,
    &VDF,
    &SURFACESHADER,
    &VOLUMESHADER,
    &DISPLACEMENTSHADER,
    &LIGHTSHADER,
    &MATERIAL,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(TypeDesc::get("color3"), Some(&COLOR3));
        assert_eq!(TypeDesc::get("BSDF").map(TypeDesc::is_closure), Some(true));
        assert!(TypeDesc::get("colour3").is_none());
    }

    #[test]
    fn test_lookup_by_semantic() {
        assert_eq!(TypeDesc::find(Semantic::Vector, 3), Some(&VECTOR3));
        assert_eq!(TypeDesc::find(Semantic::Color, 4), Some(&COLOR4));
        assert_eq!(TypeDesc::find(Semantic::Matrix, 9), Some(&MATRIX33));
    }

    #[test]
    fn test_channel_index() {
        assert_eq!(COLOR3.channel_index('b'), Some(2));
        assert_eq!(COLOR3.channel_index('a'), None);
        assert_eq!(COLOR2.channel_index('a'), Some(1));
        assert_eq!(VECTOR4.channel_index('w'), Some(3));
        assert_eq!(FLOAT.channel_index('x'), Some(0));
        assert_eq!(VECTOR2.channel_index('r'), None);
    }
}
