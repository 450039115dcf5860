//! Typed value decoding for `get` responses.
//!
//! A `get` data line is a list of whitespace-separated tokens ending in the
//! register's type tag. The position of the value depends on the tag:
//!
//! | Tag prefix | Value token | Example line |
//! |------------|-------------|--------------|
//! | `INTEGER`, `UNSIGNED` | second (index 1) | `0x00c8 200 INTEGER16` |
//! | `REAL` | first (index 0) | `21.500000 REAL32` |
//!
//! Integer lines carry the raw hex word in front of the decimal value. When
//! that prefix is absent (`200 INTEGER16`) the value is the first token.
//!
//! # Example
//!
//! ```
//! use ecd_client::TypedValue;
//!
//! assert_eq!(TypedValue::decode("0x00c8 200 INTEGER16").unwrap(), TypedValue::Integer(200));
//! assert_eq!(TypedValue::decode("12.5 REAL32").unwrap(), TypedValue::Real(12.5));
//! assert!(TypedValue::decode("1 BOOLEAN").is_err());
//! ```

use crate::error::{EcdError, Result};

/// A decoded register value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypedValue {
    /// `INTEGER*` and `UNSIGNED*` registers.
    Integer(i64),
    /// `REAL32` and `REAL64` registers.
    Real(f64),
}

impl TypedValue {
    /// Decodes one data line.
    ///
    /// # Errors
    ///
    /// - `EcdError::DecodeAmbiguity` if the tag is not an integer or real type
    /// - `EcdError::InvalidValue` if the value token is missing or malformed
    pub fn decode(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&tag, values)) = tokens.split_last() else {
            return Err(EcdError::decode_ambiguity("", line));
        };

        if tag.starts_with("INTEGER") || tag.starts_with("UNSIGNED") {
            let token = match values {
                [] => return Err(EcdError::invalid_value(line, "missing integer value")),
                [value] => *value,
                [_, value, ..] => *value,
            };
            token
                .parse::<i64>()
                .map(TypedValue::Integer)
                .map_err(|e| EcdError::invalid_value(token, format!("{} ({})", e, tag)))
        } else if tag.starts_with("REAL") {
            let Some(&token) = values.first() else {
                return Err(EcdError::invalid_value(line, "missing real value"));
            };
            token
                .parse::<f64>()
                .map(TypedValue::Real)
                .map_err(|e| EcdError::invalid_value(token, format!("{} ({})", e, tag)))
        } else {
            Err(EcdError::decode_ambiguity(tag, line))
        }
    }

    /// Returns the integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(v) => Some(*v),
            TypedValue::Real(_) => None,
        }
    }

    /// Returns the value as `f64`, converting integers.
    ///
    /// # Example
    ///
    /// ```
    /// use ecd_client::TypedValue;
    ///
    /// // Thermocouple terminals report tenths of a degree
    /// let celsius = TypedValue::Integer(215).as_f64() / 10.0;
    /// assert_eq!(celsius, 21.5);
    /// ```
    pub fn as_f64(&self) -> f64 {
        match self {
            TypedValue::Integer(v) => *v as f64,
            TypedValue::Real(v) => *v,
        }
    }

    /// Returns `true` for `Integer` values.
    pub fn is_integer(&self) -> bool {
        matches!(self, TypedValue::Integer(_))
    }

    /// Returns `true` for `Real` values.
    pub fn is_real(&self) -> bool {
        matches!(self, TypedValue::Real(_))
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Integer(v) => write!(f, "{}", v),
            TypedValue::Real(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Integer(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Real(v)
    }
}
