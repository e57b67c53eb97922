//! Scalar values and presence flags.
//!
//! Variable values may be written as YAML strings, numbers, or booleans.
//! Several boolean options are written as bare keys whose presence alone
//! turns them on.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;

/// A YAML scalar kept as the text it renders to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScalarValue(String);

impl ScalarValue {
    /// Creates a scalar from text.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the rendered text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders a YAML scalar, or `None` for sequences, mappings, and tags.
    #[must_use]
    pub fn from_yaml(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Bool(b) => Some(Self(b.to_string())),
            Value::Null => Some(Self(String::new())),
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_yaml(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a string, number, or boolean"))
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Deserializes a presence flag: any value other than `false` means set.
///
/// Used with `#[serde(default, deserialize_with = "presence_flag")]` so an
/// absent key yields `false`.
///
/// # Errors
///
/// Returns an error only if the underlying YAML is malformed.
pub fn presence_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(!matches!(value, Value::Bool(false)))
}
