//! Inline configuration values.
//!
//! [`SettingValue`] is the tagged union carried by configuration entries. Its
//! [`canonical_bytes`](SettingValue::canonical_bytes) encoding is what gets
//! hashed, so semantically equal values always produce the same digest.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Enum variant, stored by name.
    Enum(String),
}

impl SettingValue {
    /// Short type name used in messages and canonical encoding.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
        }
    }

    /// Deterministic byte encoding: `<type>:<value>`.
    ///
    /// Floats use the shortest round-trip form with `-0.0` folded into `0.0`
    /// and every NaN written as `NaN`. Strings are length-prefixed.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let body = match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => canonical_float(*f),
            Self::String(s) | Self::Enum(s) => format!("{}:{s}", s.len()),
        };
        format!("{}:{body}", self.type_name()).into_bytes()
    }

    /// Interpret a plain JSON scalar as an untyped value.
    ///
    /// Strings come back as [`SettingValue::String`]; callers that know a key
    /// is an enum convert afterwards.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    /// Plain JSON scalar for the live settings document.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) | Self::Enum(s) => serde_json::Value::String(s.clone()),
        }
    }
}

fn canonical_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == 0.0 {
        "0.0".to_string()
    } else {
        format!("{f:?}")
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) | Self::Enum(s) => f.write_str(s),
        }
    }
}
