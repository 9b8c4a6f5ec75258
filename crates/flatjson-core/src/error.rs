//! Error types for flattening and record decoding

use thiserror::Error;

/// Errors raised by the flattener itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlattenError {
    /// The root value handed to the flattener was not a mapping
    #[error("cannot flatten a top-level {found}; expected an object")]
    RootNotMapping { found: &'static str },

    /// Nesting exceeded the configured depth limit
    #[error("structure too deep at '{path}': nesting exceeds limit of {limit}")]
    TooDeep { path: String, limit: usize },

    /// Two paths produced the same composite key under `CollisionPolicy::Error`
    #[error("composite key '{key}' produced by more than one path")]
    KeyCollision { key: String },
}

impl FlattenError {
    /// Stable identifier for logs and transformation metadata
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::RootNotMapping { .. } => "RootNotMapping",
            Self::TooDeep { .. } => "TooDeep",
            Self::KeyCollision { .. } => "KeyCollision",
        }
    }
}

/// Errors raised while turning raw record bytes into a flattened line
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record root is a {found}, expected an object")]
    NotAnObject { found: &'static str },

    #[error("record is empty")]
    Empty,

    /// Nesting deeper than the JSON parser accepts
    #[error("structure too deep at line {line} column {column}: nesting exceeds limit of {limit}")]
    NestingLimit {
        line: usize,
        column: usize,
        limit: usize,
    },

    #[error(transparent)]
    Flatten(#[from] FlattenError),
}

impl RecordError {
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "InvalidJson",
            Self::NotAnObject { .. } => "NotAnObject",
            Self::Empty => "Empty",
            Self::NestingLimit { .. } => "TooDeep",
            Self::Flatten(err) => err.error_type(),
        }
    }
}
