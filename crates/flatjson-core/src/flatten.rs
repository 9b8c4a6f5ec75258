// Recursive structure flattener
//
// Depth-first pre-order walk over a NestedValue. Every scalar lands in the
// output under its composite key: the top-level key, then one segment per
// descent (mapping key or 0-based sequence index), joined by the separator.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::error::FlattenError;
use crate::value::{Mapping, NestedValue, Scalar};

pub const DEFAULT_SEPARATOR: &str = ".";

/// Same nesting limit serde_json enforces while parsing
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do when two paths produce the same composite key
///
/// Only reachable when input keys contain the separator, e.g.
/// `{"a.b": 1, "a": {"b": 2}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Last write wins, silently
    #[default]
    Overwrite,
    /// Fail with `FlattenError::KeyCollision`
    Error,
    /// Keep every colliding scalar, in traversal order
    Collect,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::Error => write!(f, "error"),
            CollisionPolicy::Collect => write!(f, "collect"),
        }
    }
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" | "last-write-wins" => Ok(CollisionPolicy::Overwrite),
            "error" | "fail" => Ok(CollisionPolicy::Error),
            "collect" | "list" => Ok(CollisionPolicy::Collect),
            _ => Err(format!(
                "unsupported collision policy: {}. Supported: overwrite, error, collect",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenOptions {
    pub separator: String,
    pub max_depth: usize,
    pub on_collision: CollisionPolicy,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            on_collision: CollisionPolicy::Overwrite,
        }
    }
}

/// Value stored in a flattened mapping
#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    Scalar(Scalar),
    /// Colliding scalars kept under `CollisionPolicy::Collect`
    Collected(Vec<Scalar>),
}

impl FlatValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            FlatValue::Scalar(s) => Some(s),
            FlatValue::Collected(_) => None,
        }
    }

    fn push(&mut self, scalar: Scalar) {
        match self {
            FlatValue::Collected(items) => items.push(scalar),
            FlatValue::Scalar(existing) => {
                let first = std::mem::replace(existing, Scalar::Null);
                *self = FlatValue::Collected(vec![first, scalar]);
            }
        }
    }
}

impl From<FlatValue> for JsonValue {
    fn from(value: FlatValue) -> Self {
        match value {
            FlatValue::Scalar(s) => s.into(),
            FlatValue::Collected(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
        }
    }
}

impl Serialize for FlatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FlatValue::Scalar(s) => s.serialize(serializer),
            FlatValue::Collected(items) => items.serialize(serializer),
        }
    }
}

/// Single-level mapping from composite key to scalar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMap {
    entries: IndexMap<String, FlatValue>,
}

impl FlatMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flat JSON object with keys in traversal order
    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(
            self.entries
                .into_iter()
                .map(|(k, v)| (k, JsonValue::from(v)))
                .collect(),
        )
    }

    /// Re-wrap as a mapping so the result can be fed back to the flattener
    pub fn into_mapping(self) -> Mapping {
        self.entries
            .into_iter()
            .map(|(k, v)| {
                let nested = match v {
                    FlatValue::Scalar(s) => NestedValue::Scalar(s),
                    FlatValue::Collected(items) => {
                        NestedValue::Sequence(items.into_iter().map(NestedValue::Scalar).collect())
                    }
                };
                (k, nested)
            })
            .collect()
    }
}

impl IntoIterator for FlatMap {
    type Item = (String, FlatValue);
    type IntoIter = indexmap::map::IntoIter<String, FlatValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for FlatMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Configured flattener. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    options: FlattenOptions,
}

impl Flattener {
    pub fn new(options: FlattenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FlattenOptions {
        &self.options
    }

    /// Flatten a top-level mapping into a fresh `FlatMap`
    pub fn flatten(&self, map: &Mapping) -> Result<FlatMap, FlattenError> {
        let mut out = FlatMap::with_capacity(map.len());
        for (key, value) in map {
            self.descend(key.clone(), value, 1, &mut out)?;
        }
        Ok(out)
    }

    /// Flatten any nested value; the root must be a mapping
    pub fn flatten_value(&self, value: &NestedValue) -> Result<FlatMap, FlattenError> {
        match value {
            NestedValue::Mapping(map) => self.flatten(map),
            other => Err(FlattenError::RootNotMapping {
                found: other.kind(),
            }),
        }
    }

    // `depth` is the number of segments in `path`
    fn descend(
        &self,
        path: String,
        value: &NestedValue,
        depth: usize,
        out: &mut FlatMap,
    ) -> Result<(), FlattenError> {
        match value {
            NestedValue::Scalar(scalar) => self.insert(out, path, scalar.clone()),
            NestedValue::Sequence(items) => {
                self.check_depth(&path, depth)?;
                for (index, item) in items.iter().enumerate() {
                    let child = self.join(&path, &index.to_string());
                    self.descend(child, item, depth + 1, out)?;
                }
                Ok(())
            }
            NestedValue::Mapping(map) => {
                self.check_depth(&path, depth)?;
                for (key, item) in map {
                    let child = self.join(&path, key);
                    self.descend(child, item, depth + 1, out)?;
                }
                Ok(())
            }
        }
    }

    fn check_depth(&self, path: &str, depth: usize) -> Result<(), FlattenError> {
        if depth >= self.options.max_depth {
            return Err(FlattenError::TooDeep {
                path: path.to_string(),
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    fn join(&self, path: &str, segment: &str) -> String {
        let mut key =
            String::with_capacity(path.len() + self.options.separator.len() + segment.len());
        key.push_str(path);
        key.push_str(&self.options.separator);
        key.push_str(segment);
        key
    }

    fn insert(&self, out: &mut FlatMap, key: String, scalar: Scalar) -> Result<(), FlattenError> {
        match out.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(FlatValue::Scalar(scalar));
            }
            Entry::Occupied(mut slot) => match self.options.on_collision {
                CollisionPolicy::Overwrite => {
                    slot.insert(FlatValue::Scalar(scalar));
                }
                CollisionPolicy::Error => {
                    return Err(FlattenError::KeyCollision {
                        key: slot.key().clone(),
                    });
                }
                CollisionPolicy::Collect => slot.get_mut().push(scalar),
            },
        }
        Ok(())
    }
}

/// Flatten with default options
pub fn flatten(map: &Mapping) -> Result<FlatMap, FlattenError> {
    Flattener::default().flatten(map)
}

/// Flatten any nested value with default options; the root must be a mapping
pub fn flatten_value(value: &NestedValue) -> Result<FlatMap, FlattenError> {
    Flattener::default().flatten_value(value)
}
