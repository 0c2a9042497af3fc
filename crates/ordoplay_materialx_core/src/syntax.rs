// SPDX-License-Identifier: MIT OR Apache-2.0
//! Target-language syntax tables.
//!
//! A [`Syntax`] maps every [`TypeDesc`](crate::TypeDesc) a target supports
//! to a [`TypeSyntax`]: the type name, default literals, swizzle member
//! suffixes, and the rule used to print values. It also owns the target's
//! reserved words for identifier generation.

use crate::error::CoreError;
use crate::format::FloatFormat;
use crate::types::{TypeRef, MATRIX33};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Rule used to print a value of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSyntax {
    /// Value string as-is
    Scalar,
    /// Quoted string
    String,
    /// Constructor call with the components: `name(a, b, c)`
    Aggregate,
    /// User-defined struct: brace initializer in uniform context (when
    /// `brace_uniform` is set), constructor call otherwise
    Struct {
        /// Use `{a, b}` for uniform values
        brace_uniform: bool,
    },
    /// Four-channel color stored as a three-channel color plus alpha
    Color4 {
        /// Name of the three-channel color constructor
        color: &'static str,
        /// Use `{color(r, g, b), a}` for uniform values
        brace_uniform: bool,
    },
    /// 3x3 matrix written into a 4x4-only language, padded with an
    /// identity row and column
    PaddedMatrix33,
    /// Array literal; `{n}` in `open` is replaced by the element count
    Array {
        /// Opening text
        open: &'static str,
        /// Closing text
        close: &'static str,
    },
}

/// Syntax rules for one type in one target language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntax {
    /// Type name in the target language
    pub name: String,
    /// Default value literal
    pub default_value: String,
    /// Default value literal in uniform context
    pub uniform_default_value: String,
    /// Alias the type name stands for, defined once per file
    pub type_alias: Option<String>,
    /// Type definition emitted once per file
    pub type_definition: Option<String>,
    /// Member access suffixes, one per component. A member containing
    /// `{}` is a template the variable is substituted into.
    pub members: Vec<String>,
    /// How values are printed
    pub value_syntax: ValueSyntax,
}

impl TypeSyntax {
    /// Create a scalar type syntax
    pub fn scalar(
        name: impl Into<String>,
        default_value: impl Into<String>,
        uniform_default_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
            uniform_default_value: uniform_default_value.into(),
            type_alias: None,
            type_definition: None,
            members: Vec::new(),
            value_syntax: ValueSyntax::Scalar,
        }
    }

    /// Set the value printing rule
    pub fn with_syntax(mut self, value_syntax: ValueSyntax) -> Self {
        self.value_syntax = value_syntax;
        self
    }

    /// Set the swizzle member suffixes
    pub fn with_members(mut self, members: &[&str]) -> Self {
        self.members = members.iter().map(|m| (*m).to_string()).collect();
        self
    }

    /// Set the type alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.type_alias = Some(alias.into());
        self
    }

    /// Set the type definition
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.type_definition = Some(definition.into());
        self
    }

    /// Default literal for the given context
    pub fn default_for(&self, uniform: bool) -> &str {
        if uniform {
            &self.uniform_default_value
        } else {
            &self.default_value
        }
    }

    /// Print a value of this type
    pub fn value(&self, value: &Value, uniform: bool, fmt: &FloatFormat) -> Result<String, CoreError> {
        match &self.value_syntax {
            ValueSyntax::Scalar => Ok(value.to_string_with(fmt)),
            ValueSyntax::String => Ok(format!("\"{}\"", value.to_string_with(fmt))),
            ValueSyntax::Aggregate => match value {
                Value::String(s) | Value::Filename(s) if s.is_empty() => Ok(self.default_for(uniform).to_string()),
                Value::String(s) | Value::Filename(s) => Ok(format!("{}(\"{s}\")", self.name)),
                _ => Ok(format!("{}({})", self.name, value.to_string_with(fmt))),
            },
            ValueSyntax::Struct { brace_uniform } => {
                if uniform && *brace_uniform {
                    Ok(format!("{{{}}}", value.to_string_with(fmt)))
                } else {
                    Ok(format!("{}({})", self.name, value.to_string_with(fmt)))
                }
            }
            ValueSyntax::Color4 { .. } => {
                let c = value.as_color4()?;
                let parts: Vec<String> = c.iter().map(|v| fmt.format(*v)).collect();
                self.value_from_strings(&parts, uniform)
            }
            ValueSyntax::PaddedMatrix33 => {
                let m = value.as_matrix33()?;
                let parts: Vec<String> = m.iter().map(|v| fmt.format(*v)).collect();
                self.padded_matrix33(&parts, &fmt.format(0.0), &fmt.format(1.0))
            }
            ValueSyntax::Array { open, close } => {
                if !value.type_desc().is_array() {
                    return Err(CoreError::TypeMismatch {
                        expected: self.name.clone(),
                        got: value.type_desc().name().to_string(),
                    });
                }
                let count = match value {
                    Value::FloatArray(a) => a.len(),
                    Value::IntegerArray(a) => a.len(),
                    _ => 0,
                };
                if count == 0 {
                    if uniform {
                        return Err(CoreError::EmptyArray(self.name.clone()));
                    }
                    return Ok(format!("{}{}", open.replace("{n}", "0"), close));
                }
                Ok(format!(
                    "{}{}{}",
                    open.replace("{n}", &count.to_string()),
                    value.to_string_with(fmt),
                    close
                ))
            }
        }
    }

    /// Compose a value from component expressions
    pub fn value_from_strings(&self, values: &[String], uniform: bool) -> Result<String, CoreError> {
        let first = values
            .first()
            .ok_or_else(|| CoreError::TooFewValues(self.name.clone()))?;
        match &self.value_syntax {
            ValueSyntax::Scalar | ValueSyntax::String => Ok(first.clone()),
            ValueSyntax::Aggregate => Ok(format!("{}({})", self.name, values.join(", "))),
            ValueSyntax::Struct { brace_uniform } => {
                if uniform && *brace_uniform {
                    Ok(format!("{{{}}}", values.join(", ")))
                } else {
                    Ok(format!("{}({})", self.name, values.join(", ")))
                }
            }
            ValueSyntax::Color4 {
                color,
                brace_uniform,
            } => {
                if values.len() < 4 {
                    return Err(CoreError::TooFewValues(self.name.clone()));
                }
                let rgb = format!("{color}({}, {}, {})", values[0], values[1], values[2]);
                if uniform && *brace_uniform {
                    Ok(format!("{{{rgb}, {}}}", values[3]))
                } else {
                    Ok(format!("{}({rgb}, {})", self.name, values[3]))
                }
            }
            ValueSyntax::PaddedMatrix33 => self.padded_matrix33(values, "0.0", "1.0"),
            ValueSyntax::Array { open, close } => Ok(format!(
                "{}{}{}",
                open.replace("{n}", &values.len().to_string()),
                values.join(", "),
                close
            )),
        }
    }
}

impl TypeSyntax {
    /// 4x4 constructor from nine 3x3 components, padded with an identity
    /// row and column
    fn padded_matrix33(&self, values: &[String], zero: &str, one: &str) -> Result<String, CoreError> {
        if values.len() < MATRIX33.size() {
            return Err(CoreError::TooFewValues(self.name.clone()));
        }
        let mut parts = Vec::with_capacity(16);
        for (i, v) in values.iter().take(MATRIX33.size()).enumerate() {
            parts.push(v.as_str());
            if (i + 1) % 3 == 0 {
                parts.push(zero);
            }
        }
        parts.extend([zero, zero, zero, one]);
        Ok(format!("{}({})", self.name, parts.join(", ")))
    }
}

/// Syntax table for one target language
#[derive(Debug, Clone)]
pub struct Syntax {
    name: String,
    type_syntax: IndexMap<&'static str, TypeSyntax>,
    reserved_words: HashSet<String>,
    uniform_qualifier: String,
    output_qualifier: String,
}

impl Syntax {
    /// Create an empty syntax table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_syntax: IndexMap::new(),
            reserved_words: HashSet::new(),
            uniform_qualifier: String::new(),
            output_qualifier: String::new(),
        }
    }

    /// Set the qualifier written before uniform parameters
    pub fn with_uniform_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.uniform_qualifier = qualifier.into();
        self
    }

    /// Set the qualifier written before output parameters
    pub fn with_output_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.output_qualifier = qualifier.into();
        self
    }

    /// Name of the target language
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualifier for uniform parameters (may be empty)
    pub fn uniform_qualifier(&self) -> &str {
        &self.uniform_qualifier
    }

    /// Qualifier for output parameters (may be empty)
    pub fn output_qualifier(&self) -> &str {
        &self.output_qualifier
    }

    /// Register the syntax for a type
    pub fn register_type_syntax(&mut self, type_desc: TypeRef, syntax: TypeSyntax) -> Result<(), CoreError> {
        if self.type_syntax.contains_key(type_desc.name()) {
            return Err(CoreError::DuplicateTypeSyntax {
                type_name: type_desc.name().to_string(),
                syntax: self.name.clone(),
            });
        }
        self.type_syntax.insert(type_desc.name(), syntax);
        Ok(())
    }

    /// Add reserved words
    pub fn register_reserved_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_words.extend(words.into_iter().map(Into::into));
    }

    /// Whether a word is reserved in this language
    pub fn is_reserved(&self, word: &str) -> bool {
        self.reserved_words.contains(word)
    }

    /// Get the syntax for a type
    pub fn type_syntax(&self, type_desc: TypeRef) -> Result<&TypeSyntax, CoreError> {
        self.type_syntax
            .get(type_desc.name())
            .ok_or_else(|| CoreError::MissingTypeSyntax {
                type_name: type_desc.name().to_string(),
                syntax: self.name.clone(),
            })
    }

    /// Whether a type has a registered syntax
    pub fn supports(&self, type_desc: TypeRef) -> bool {
        self.type_syntax.contains_key(type_desc.name())
    }

    /// Type name in the target language
    pub fn type_name(&self, type_desc: TypeRef) -> Result<&str, CoreError> {
        Ok(&self.type_syntax(type_desc)?.name)
    }

    /// Default literal for a type
    pub fn default_value(&self, type_desc: TypeRef, uniform: bool) -> Result<&str, CoreError> {
        Ok(self.type_syntax(type_desc)?.default_for(uniform))
    }

    /// Print a value of the given type
    pub fn value_string(
        &self,
        type_desc: TypeRef,
        value: &Value,
        uniform: bool,
        fmt: &FloatFormat,
    ) -> Result<String, CoreError> {
        self.type_syntax(type_desc)?.value(value, uniform, fmt)
    }

    /// Make a valid, unique identifier from a name.
    ///
    /// Invalid characters become `_`; a name that is reserved or already
    /// used gets an incrementing integer suffix. The result is recorded in
    /// `identifiers`.
    pub fn make_valid_name(&self, name: &str, identifiers: &mut HashSet<String>) -> String {
        let mut base: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            base.insert(0, '_');
        }

        let mut candidate = base.clone();
        let mut suffix = 0;
        while self.is_reserved(&candidate) || identifiers.contains(&candidate) {
            suffix += 1;
            candidate = format!("{base}{suffix}");
        }
        identifiers.insert(candidate.clone());
        candidate
    }

    /// Expression converting `variable` of `src_type` to `dst_type` by
    /// picking `channels` (e.g. `"rgb"`, `"x"`)
    pub fn swizzled_variable(
        &self,
        variable: &str,
        src_type: TypeRef,
        channels: &str,
        dst_type: TypeRef,
    ) -> Result<String, CoreError> {
        let members = &self.type_syntax(src_type)?.members;
        let mut parts = Vec::with_capacity(channels.len());
        for channel in channels.chars() {
            let index = src_type
                .channel_index(channel)
                .ok_or_else(|| CoreError::InvalidChannel {
                    type_name: src_type.name().to_string(),
                    channel,
                })?;
            if src_type.size() == 1 {
                parts.push(variable.to_string());
            } else {
                let member = members.get(index).ok_or_else(|| CoreError::InvalidChannel {
                    type_name: src_type.name().to_string(),
                    channel,
                })?;
                parts.push(if member.contains("{}") {
                    member.replace("{}", variable)
                } else {
                    format!("{variable}{member}")
                });
            }
        }

        if parts.len() != dst_type.size() {
            return Err(CoreError::TypeMismatch {
                expected: dst_type.name().to_string(),
                got: format!("{}.{channels}", src_type.name()),
            });
        }
        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        self.type_syntax(dst_type)?.value_from_strings(&parts, false)
    }

    /// Type definitions and aliases needed by a set of types, in
    /// registration order
    pub fn type_definitions<'a>(&'a self, used: &HashSet<&str>) -> Vec<&'a TypeSyntax> {
        self.type_syntax
            .iter()
            .filter(|(name, ts)| {
                used.contains(*name) && (ts.type_definition.is_some() || ts.type_alias.is_some())
            })
            .map(|(_, ts)| ts)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    fn test_syntax() -> Syntax {
        let mut syntax = Syntax::new("test");
        syntax
            .register_type_syntax(&types::FLOAT, TypeSyntax::scalar("float", "0.0", "0.0"))
            .unwrap();
        syntax
            .register_type_syntax(
                &types::COLOR3,
                TypeSyntax::scalar("color", "color(0.0)", "color(0.0)")
                    .with_syntax(ValueSyntax::Aggregate)
                    .with_members(&["[0]", "[1]", "[2]"]),
            )
            .unwrap();
        syntax
            .register_type_syntax(
                &types::COLOR4,
                TypeSyntax::scalar("color4", "color4(color(0.0), 0.0)", "{color(0.0), 0.0}")
                    .with_syntax(ValueSyntax::Color4 {
                        color: "color",
                        brace_uniform: true,
                    })
                    .with_members(&[".rgb[0]", ".rgb[1]", ".rgb[2]", ".a"]),
            )
            .unwrap();
        syntax
            .register_type_syntax(
                &types::MATRIX33,
                TypeSyntax::scalar("matrix", "matrix(1.0)", "matrix(1.0)")
                    .with_syntax(ValueSyntax::PaddedMatrix33),
            )
            .unwrap();
        syntax
            .register_type_syntax(
                &types::FLOATARRAY,
                TypeSyntax::scalar("float", "", "").with_syntax(ValueSyntax::Array {
                    open: "{",
                    close: "}",
                }),
            )
            .unwrap();
        syntax.register_reserved_words(["color", "output"]);
        syntax
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut syntax = test_syntax();
        let err = syntax
            .register_type_syntax(&types::FLOAT, TypeSyntax::scalar("float", "0.0", "0.0"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_missing_syntax_fails() {
        let err = test_syntax().type_syntax(&types::VECTOR2).unwrap_err();
        assert!(matches!(err, CoreError::MissingTypeSyntax { .. }));
    }

    #[test]
    fn test_color4_nested_composition() {
        let syntax = test_syntax();
        let fmt = FloatFormat::default();
        let value = Value::Color4([1.0, 0.5, 0.25, 1.0]);
        assert_eq!(
            syntax.value_string(&types::COLOR4, &value, false, &fmt).unwrap(),
            "color4(color(1.0, 0.5, 0.25), 1.0)"
        );
        assert_eq!(
            syntax.value_string(&types::COLOR4, &value, true, &fmt).unwrap(),
            "{color(1.0, 0.5, 0.25), 1.0}"
        );
    }

    #[test]
    fn test_matrix33_padding() {
        let syntax = test_syntax();
        let value = Value::zero(&types::MATRIX33).unwrap();
        let text = syntax
            .value_string(&types::MATRIX33, &value, false, &FloatFormat::default())
            .unwrap();
        assert_eq!(
            text,
            "matrix(1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, \
             0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0)"
        );
    }

    #[test]
    fn test_matrix33_padding_follows_float_format() {
        let syntax = test_syntax();
        let value = Value::Matrix33(Box::new([2.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 1.0]));
        let text = syntax
            .value_string(&types::MATRIX33, &value, true, &FloatFormat::fixed(3))
            .unwrap();
        assert_eq!(
            text,
            "matrix(2.000, 0.000, 0.000, 0.000, 0.000, 0.500, 0.000, 0.000, \
             0.000, 0.000, 1.000, 0.000, 0.000, 0.000, 0.000, 1.000)"
        );
    }

    #[test]
    fn test_empty_uniform_array_fails() {
        let syntax = test_syntax();
        let fmt = FloatFormat::default();
        let empty = Value::FloatArray(Vec::new());
        let err = syntax
            .value_string(&types::FLOATARRAY, &empty, true, &fmt)
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyArray(_)));
        assert_eq!(
            syntax.value_string(&types::FLOATARRAY, &empty, false, &fmt).unwrap(),
            "{}"
        );
        let filled = Value::FloatArray(vec![1.0, 2.0]);
        assert_eq!(
            syntax.value_string(&types::FLOATARRAY, &filled, true, &fmt).unwrap(),
            "{1.0, 2.0}"
        );
    }

    #[test]
    fn test_make_valid_name() {
        let syntax = test_syntax();
        let mut ids = HashSet::new();
        assert_eq!(syntax.make_valid_name("base color", &mut ids), "base_color");
        assert_eq!(syntax.make_valid_name("base color", &mut ids), "base_color1");
        assert_eq!(syntax.make_valid_name("color", &mut ids), "color1");
        assert_eq!(syntax.make_valid_name("2d", &mut ids), "_2d");
    }

    #[test]
    fn test_swizzle() {
        let syntax = test_syntax();
        assert_eq!(
            syntax
                .swizzled_variable("c4", &types::COLOR4, "rgb", &types::COLOR3)
                .unwrap(),
            "color(c4.rgb[0], c4.rgb[1], c4.rgb[2])"
        );
        assert_eq!(
            syntax
                .swizzled_variable("c", &types::COLOR3, "g", &types::FLOAT)
                .unwrap(),
            "c[1]"
        );
        assert!(syntax
            .swizzled_variable("c", &types::COLOR3, "a", &types::FLOAT)
            .is_err());
    }
}
