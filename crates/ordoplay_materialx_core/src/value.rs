// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed literal values.
//!
//! A [`Value`] always knows its own type, so reading it through the wrong
//! accessor is a checked error rather than a reinterpretation of bytes.
//! Components of aggregate values are written as `"1.0, 2.0, 3.0"`.

use crate::error::CoreError;
use crate::format::FloatFormat;
use crate::types::{self, BaseType, Semantic, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i32),
    /// Float
    Float(f32),
    /// Two-channel color
    Color2([f32; 2]),
    /// RGB color
    Color3([f32; 3]),
    /// RGBA color
    Color4([f32; 4]),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
    /// Row-major 3x3 matrix
    Matrix33(Box<[f32; 9]>),
    /// Row-major 4x4 matrix
    Matrix44(Box<[f32; 16]>),
    /// String
    String(String),
    /// File path
    Filename(String),
    /// Integer array
    IntegerArray(Vec<i32>),
    /// Float array
    FloatArray(Vec<f32>),
}

const IDENTITY33: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
const IDENTITY44: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

impl Value {
    /// The declared type of this value
    pub fn type_desc(&self) -> TypeRef {
        match self {
            Self::Boolean(_) => &types::BOOLEAN,
            Self::Integer(_) => &types::INTEGER,
            Self::Float(_) => &types::FLOAT,
            Self::Color2(_) => &types::COLOR2,
            Self::Color3(_) => &types::COLOR3,
            Self::Color4(_) => &types::COLOR4,
            Self::Vector2(_) => &types::VECTOR2,
            Self::Vector3(_) => &types::VECTOR3,
            Self::Vector4(_) => &types::VECTOR4,
            Self::Matrix33(_) => &types::MATRIX33,
            Self::Matrix44(_) => &types::MATRIX44,
            Self::String(_) => &types::STRING,
            Self::Filename(_) => &types::FILENAME,
            Self::IntegerArray(_) => &types::INTEGERARRAY,
            Self::FloatArray(_) => &types::FLOATARRAY,
        }
    }

    /// The zero value of a type (identity for matrices).
    ///
    /// Closure and shader types have no literal value.
    pub fn zero(type_desc: TypeRef) -> Option<Self> {
        let value = match type_desc.name() {
            "boolean" => Self::Boolean(false),
            "integer" => Self::Integer(0),
            "float" => Self::Float(0.0),
            "color2" => Self::Color2([0.0; 2]),
            "color3" => Self::Color3([0.0; 3]),
            "color4" => Self::Color4([0.0; 4]),
            "vector2" => Self::Vector2([0.0; 2]),
            "vector3" => Self::Vector3([0.0; 3]),
            "vector4" => Self::Vector4([0.0; 4]),
            "matrix33" => Self::Matrix33(Box::new(IDENTITY33)),
            "matrix44" => Self::Matrix44(Box::new(IDENTITY44)),
            "string" => Self::String(String::new()),
            "filename" => Self::Filename(String::new()),
            "integerarray" => Self::IntegerArray(Vec::new()),
            "floatarray" => Self::FloatArray(Vec::new()),
            _ => return None,
        };
        Some(value)
    }

    /// Parse a value of the given type from its string form
    pub fn from_string(type_desc: TypeRef, text: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidValue {
            type_name: type_desc.name().to_string(),
            text: text.to_string(),
        };

        match (type_desc.base_type(), type_desc.semantic()) {
            (BaseType::String, Semantic::Filename) => return Ok(Self::Filename(text.to_string())),
            (BaseType::String, _) => return Ok(Self::String(text.to_string())),
            (BaseType::None, _) => return Err(invalid()),
            _ => {}
        }

        if type_desc.is_array() {
            let parts = split_components(text);
            return match type_desc.base_type() {
                BaseType::Integer => parts
                    .iter()
                    .map(|p| p.parse::<i32>().map_err(|_| invalid()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::IntegerArray),
                BaseType::Float => parse_floats(&parts)
                    .ok_or_else(invalid)
                    .map(Self::FloatArray),
                _ => Err(invalid()),
            };
        }

        match type_desc.name() {
            "boolean" => match text.trim() {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                _ => Err(invalid()),
            },
            "integer" => text.trim().parse().map(Self::Integer).map_err(|_| invalid()),
            "float" => text.trim().parse().map(Self::Float).map_err(|_| invalid()),
            _ => {
                let floats = parse_floats(&split_components(text)).ok_or_else(invalid)?;
                Self::from_components(type_desc, &floats).ok_or_else(invalid)
            }
        }
    }

    fn from_components(type_desc: TypeRef, c: &[f32]) -> Option<Self> {
        let value = match type_desc.name() {
            "color2" => Self::Color2(c.try_into().ok()?),
            "color3" => Self::Color3(c.try_into().ok()?),
            "color4" => Self::Color4(c.try_into().ok()?),
            "vector2" => Self::Vector2(c.try_into().ok()?),
            "vector3" => Self::Vector3(c.try_into().ok()?),
            "vector4" => Self::Vector4(c.try_into().ok()?),
            "matrix33" => Self::Matrix33(Box::new(c.try_into().ok()?)),
            "matrix44" => Self::Matrix44(Box::new(c.try_into().ok()?)),
            _ => return None,
        };
        Some(value)
    }

    /// Float components of a numeric aggregate or scalar value
    pub fn components(&self) -> Option<Vec<f32>> {
        match self {
            Self::Float(v) => Some(vec![*v]),
            Self::Color2(c) | Self::Vector2(c) => Some(c.to_vec()),
            Self::Color3(c) | Self::Vector3(c) => Some(c.to_vec()),
            Self::Color4(c) | Self::Vector4(c) => Some(c.to_vec()),
            Self::Matrix33(m) => Some(m.to_vec()),
            Self::Matrix44(m) => Some(m.to_vec()),
            Self::FloatArray(a) => Some(a.clone()),
            _ => None,
        }
    }

    /// Convert to a string using the given float formatting
    pub fn to_string_with(&self, fmt: &FloatFormat) -> String {
        let join = |c: &[f32]| {
            c.iter()
                .map(|v| fmt.format(*v))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::Boolean(v) => v.to_string(),
            Self::Integer(v) => v.to_string(),
            Self::Float(v) => fmt.format(*v),
            Self::String(s) | Self::Filename(s) => s.clone(),
            Self::IntegerArray(a) => a
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            _ => self.components().map(|c| join(&c)).unwrap_or_default(),
        }
    }

    /// Value of `target` type built from the components named by
    /// `channels` (e.g. `"bgr"`, `"x"`)
    pub fn swizzle(&self, channels: &str, target: TypeRef) -> Result<Self, CoreError> {
        let source = self.type_desc();
        let components = self.components().ok_or_else(|| self.mismatch(target))?;
        let picked = channels
            .chars()
            .map(|channel| {
                source
                    .channel_index(channel)
                    .and_then(|index| components.get(index).copied())
                    .ok_or_else(|| CoreError::InvalidChannel {
                        type_name: source.name().to_string(),
                        channel,
                    })
            })
            .collect::<Result<Vec<f32>, _>>()?;

        match picked.as_slice() {
            [v] if target == &types::FLOAT => Ok(Self::Float(*v)),
            _ => Self::from_components(target, &picked).ok_or_else(|| CoreError::TypeMismatch {
                expected: target.name().to_string(),
                got: format!("{}.{channels}", source.name()),
            }),
        }
    }

    /// Element count of an array value
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Self::IntegerArray(a) => Some(a.len()),
            Self::FloatArray(a) => Some(a.len()),
            _ => None,
        }
    }

    /// Whether this is an array value with no elements
    pub fn is_empty_array(&self) -> bool {
        match self {
            Self::IntegerArray(a) => a.is_empty(),
            Self::FloatArray(a) => a.is_empty(),
            _ => false,
        }
    }

    fn mismatch(&self, expected: TypeRef) -> CoreError {
        CoreError::TypeMismatch {
            expected: expected.name().to_string(),
            got: self.type_desc().name().to_string(),
        }
    }

    /// Read as a boolean
    pub fn as_bool(&self) -> Result<bool, CoreError> {
        match self {
            Self::Boolean(v) => Ok(*v),
            _ => Err(self.mismatch(&types::BOOLEAN)),
        }
    }

    /// Read as an integer
    pub fn as_integer(&self) -> Result<i32, CoreError> {
        match self {
            Self::Integer(v) => Ok(*v),
            _ => Err(self.mismatch(&types::INTEGER)),
        }
    }

    /// Read as a float
    pub fn as_float(&self) -> Result<f32, CoreError> {
        match self {
            Self::Float(v) => Ok(*v),
            _ => Err(self.mismatch(&types::FLOAT)),
        }
    }

    /// Read as an RGB color
    pub fn as_color3(&self) -> Result<[f32; 3], CoreError> {
        match self {
            Self::Color3(v) => Ok(*v),
            _ => Err(self.mismatch(&types::COLOR3)),
        }
    }

    /// Read as an RGBA color
    pub fn as_color4(&self) -> Result<[f32; 4], CoreError> {
        match self {
            Self::Color4(v) => Ok(*v),
            _ => Err(self.mismatch(&types::COLOR4)),
        }
    }

    /// Read as a 2D vector
    pub fn as_vector2(&self) -> Result<[f32; 2], CoreError> {
        match self {
            Self::Vector2(v) => Ok(*v),
            _ => Err(self.mismatch(&types::VECTOR2)),
        }
    }

    /// Read as a 3D vector
    pub fn as_vector3(&self) -> Result<[f32; 3], CoreError> {
        match self {
            Self::Vector3(v) => Ok(*v),
            _ => Err(self.mismatch(&types::VECTOR3)),
        }
    }

    /// Read as a 3x3 matrix
    pub fn as_matrix33(&self) -> Result<&[f32; 9], CoreError> {
        match self {
            Self::Matrix33(m) => Ok(m),
            _ => Err(self.mismatch(&types::MATRIX33)),
        }
    }

    /// Read as a 4x4 matrix
    pub fn as_matrix44(&self) -> Result<&[f32; 16], CoreError> {
        match self {
            Self::Matrix44(m) => Ok(m),
            _ => Err(self.mismatch(&types::MATRIX44)),
        }
    }

    /// Read as a string (plain strings and filenames)
    pub fn as_str(&self) -> Result<&str, CoreError> {
        match self {
            Self::String(s) | Self::Filename(s) => Ok(s),
            _ => Err(self.mismatch(&types::STRING)),
        }
    }

    /// Read as a float array
    pub fn as_float_array(&self) -> Result<&[f32], CoreError> {
        match self {
            Self::FloatArray(a) => Ok(a),
            _ => Err(self.mismatch(&types::FLOATARRAY)),
        }
    }

    /// Read as an integer array
    pub fn as_integer_array(&self) -> Result<&[i32], CoreError> {
        match self {
            Self::IntegerArray(a) => Ok(a),
            _ => Err(self.mismatch(&types::INTEGERARRAY)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(&FloatFormat::default()))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

fn split_components(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_floats(parts: &[&str]) -> Option<Vec<f32>> {
    parts.iter().map(|p| p.parse::<f32>().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swizzle() {
        let c = Value::Color3([0.25, 0.5, 1.0]);
        assert_eq!(c.swizzle("g", &types::FLOAT).unwrap(), Value::Float(0.5));
        assert_eq!(c.swizzle("bgr", &types::COLOR3).unwrap(), Value::Color3([1.0, 0.5, 0.25]));
        assert!(matches!(
            c.swizzle("a", &types::FLOAT).unwrap_err(),
            CoreError::InvalidChannel { channel: 'a', .. }
        ));
        assert!(matches!(
            c.swizzle("rg", &types::COLOR3).unwrap_err(),
            CoreError::TypeMismatch { .. }
        ));
    }

    fn round_trip(value: &Value) -> Value {
        let text = value.to_string();
        Value::from_string(value.type_desc(), &text).unwrap()
    }

    #[test]
    fn test_round_trip_all_types() {
        let values = [
            Value::Boolean(true),
            Value::Boolean(false),
            Value::Integer(0),
            Value::Integer(-42),
            Value::Float(0.0),
            Value::Float(-1.5),
            Value::Float(f32::MAX),
            Value::Float(1.0e-7),
            Value::Color2([0.0, -1.0]),
            Value::Color3([0.18, 0.5, 1.0]),
            Value::Color4([-0.5, 0.25, 1.0e6, 1.0]),
            Value::Vector2([f32::MIN_POSITIVE, 2.0]),
            Value::Vector3([0.0, -0.0, 3.25]),
            Value::Vector4([1.0, 2.0, 3.0, -4.0]),
            Value::Matrix33(Box::new(IDENTITY33)),
            Value::Matrix44(Box::new([
                1.0, 2.0, 3.0, 4.0, -5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0,
                -16.0,
            ])),
            Value::String("checker".to_string()),
            Value::Filename("textures/wood.png".to_string()),
            Value::IntegerArray(vec![1, -2, 3]),
            Value::FloatArray(vec![0.5, -0.25]),
            Value::FloatArray(Vec::new()),
        ];

        for value in &values {
            assert_eq!(&round_trip(value), value, "round trip of {value:?}");
        }
    }

    #[test]
    fn test_string_form() {
        assert_eq!(Value::Color3([1.0, 0.5, 0.0]).to_string(), "1.0, 0.5, 0.0");
        assert_eq!(
            Value::Vector2([1.0, 2.0]).to_string_with(&FloatFormat::fixed(2)),
            "1.00, 2.00"
        );
    }

    #[test]
    fn test_parse_rejects_wrong_component_count() {
        let err = Value::from_string(&types::COLOR3, "1.0, 2.0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue { .. }));
        assert!(Value::from_string(&types::BSDF, "").is_err());
    }

    #[test]
    fn test_checked_accessors() {
        let value = Value::Color3([1.0, 0.0, 0.0]);
        assert_eq!(value.as_color3().unwrap(), [1.0, 0.0, 0.0]);
        let err = value.as_float().unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero(&types::FLOAT), Some(Value::Float(0.0)));
        assert_eq!(
            Value::zero(&types::MATRIX33).unwrap().as_matrix33().unwrap(),
            &IDENTITY33
        );
        assert!(Value::zero(&types::SURFACESHADER).is_none());
    }
}
