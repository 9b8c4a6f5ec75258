// flatjson-core - Platform-agnostic flattening logic
//
// Converts nested JSON-shaped records into single-level key/value records
// for ingest pipelines that only accept flat rows. Pure: no I/O, no async,
// no global state. Runtimes (CLI, Lambda) live in their own crates.

pub mod codec;
pub mod error;
pub mod flatten;
pub mod value;

pub use codec::{
    encode_line, flatten_record, parse_document, parse_record, split_json_lines, InputFormat,
};
pub use error::{FlattenError, RecordError};
pub use flatten::{
    flatten, flatten_value, CollisionPolicy, FlatMap, FlatValue, FlattenOptions, Flattener,
    DEFAULT_MAX_DEPTH, DEFAULT_SEPARATOR,
};
pub use value::{leaf_count, Mapping, NestedValue, Scalar};
