// SPDX-License-Identifier: MIT OR Apache-2.0
//! Float formatting used when values are converted to text.
//!
//! Formatting is an explicit setting passed into each conversion rather
//! than process-wide state, so concurrent generation requests can use
//! different precisions.

use serde::{Deserialize, Serialize};

/// How floats are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FloatMode {
    /// Shortest text that reads back to the same float
    #[default]
    Shortest,
    /// Fixed number of digits after the decimal point
    Fixed,
    /// Scientific notation with a fixed mantissa precision
    Scientific,
}

/// Float formatting mode and precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatFormat {
    /// Formatting mode
    pub mode: FloatMode,
    /// Digits after the decimal point (ignored by [`FloatMode::Shortest`])
    pub precision: usize,
}

impl FloatFormat {
    /// Fixed-point formatting with the given precision
    pub fn fixed(precision: usize) -> Self {
        Self {
            mode: FloatMode::Fixed,
            precision,
        }
    }

    /// Scientific formatting with the given precision
    pub fn scientific(precision: usize) -> Self {
        Self {
            mode: FloatMode::Scientific,
            precision,
        }
    }

    /// Format a float.
    ///
    /// Finite values always contain a decimal point or exponent, so the
    /// text is a float literal in every target language. Fixed mode
    /// writes at least one digit after the point.
    pub fn format(&self, value: f32) -> String {
        match self.mode {
            FloatMode::Shortest => {
                let mut text = value.to_string();
                if value.is_finite() && !text.contains(['.', 'e', 'E']) {
                    text.push_str(".0");
                }
                text
            }
            FloatMode::Fixed => format!("{:.*}", self.precision.max(1), value),
            FloatMode::Scientific => format!("{:.*e}", self.precision, value),
        }
    }
}

impl Default for FloatFormat {
    fn default() -> Self {
        Self {
            mode: FloatMode::Shortest,
            precision: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_keeps_decimal_point() {
        let fmt = FloatFormat::default();
        assert_eq!(fmt.format(2.0), "2.0");
        assert_eq!(fmt.format(-0.25), "-0.25");
        assert_eq!(fmt.format(0.1), "0.1");
    }

    #[test]
    fn test_fixed_and_scientific() {
        assert_eq!(FloatFormat::fixed(3).format(1.0), "1.000");
        assert_eq!(FloatFormat::fixed(2).format(0.126), "0.13");
        assert_eq!(FloatFormat::scientific(2).format(1500.0), "1.50e3");
    }

    #[test]
    fn test_zero_precision_fixed_is_still_a_float() {
        assert_eq!(FloatFormat::fixed(0).format(2.0), "2.0");
        assert_eq!(FloatFormat::fixed(0).format(-0.5), "-0.5");
    }
}
