// Nested value model
//
// JSON-shaped input as a tagged union: Scalar, Sequence or Mapping.
// Mappings keep insertion order so traversal follows the source document.

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

/// String-keyed mapping of nested values, in source order
pub type Mapping = IndexMap<String, NestedValue>;

/// A leaf value: anything that is neither a sequence nor a mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl Scalar {
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Number(_) => "number",
            Scalar::String(_) => "string",
        }
    }
}

impl From<Scalar> for JsonValue {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Null => JsonValue::Null,
            Scalar::Bool(b) => JsonValue::Bool(b),
            Scalar::Number(n) => JsonValue::Number(n),
            Scalar::String(s) => JsonValue::String(s),
        }
    }
}

impl From<&Scalar> for JsonValue {
    fn from(scalar: &Scalar) -> Self {
        scalar.clone().into()
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n.into())
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

/// Recursive JSON-shaped value
///
/// Built from `serde_json::Value`, so inputs are acyclic by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedValue {
    Scalar(Scalar),
    Sequence(Vec<NestedValue>),
    Mapping(Mapping),
}

impl NestedValue {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            NestedValue::Scalar(scalar) => scalar.kind(),
            NestedValue::Sequence(_) => "array",
            NestedValue::Mapping(_) => "object",
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            NestedValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_mapping(self) -> Option<Mapping> {
        match self {
            NestedValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, NestedValue::Scalar(_))
    }
}

impl From<Scalar> for NestedValue {
    fn from(scalar: Scalar) -> Self {
        NestedValue::Scalar(scalar)
    }
}

impl From<Mapping> for NestedValue {
    fn from(map: Mapping) -> Self {
        NestedValue::Mapping(map)
    }
}

impl From<JsonValue> for NestedValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => NestedValue::Scalar(Scalar::Null),
            JsonValue::Bool(b) => NestedValue::Scalar(Scalar::Bool(b)),
            JsonValue::Number(n) => NestedValue::Scalar(Scalar::Number(n)),
            JsonValue::String(s) => NestedValue::Scalar(Scalar::String(s)),
            JsonValue::Array(items) => {
                NestedValue::Sequence(items.into_iter().map(NestedValue::from).collect())
            }
            JsonValue::Object(map) => NestedValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, NestedValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<NestedValue> for JsonValue {
    fn from(value: NestedValue) -> Self {
        match value {
            NestedValue::Scalar(scalar) => scalar.into(),
            NestedValue::Sequence(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
            NestedValue::Mapping(map) => JsonValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for NestedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(NestedValue::from)
    }
}

/// Count the leaf scalars reachable from `value`
pub fn leaf_count(value: &NestedValue) -> usize {
    match value {
        NestedValue::Scalar(_) => 1,
        NestedValue::Sequence(items) => items.iter().map(leaf_count).sum(),
        NestedValue::Mapping(map) => map.values().map(leaf_count).sum(),
    }
}
