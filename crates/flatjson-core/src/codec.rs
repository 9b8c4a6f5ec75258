// Record codec
//
// Raw bytes in, flattened JSON line out. Shared by the CLI and the
// Firehose transformation handler.

use serde::de::IgnoredAny;

use crate::error::RecordError;
use crate::flatten::Flattener;
use crate::value::{Mapping, NestedValue};

/// Input layout of a buffer handed to the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One JSON document: an object, or an array of objects
    Json,
    /// One JSON object per line
    JsonLines,
}

impl InputFormat {
    /// Guess the layout of `bytes`
    ///
    /// A buffer that parses as a single JSON document is `Json`; anything
    /// else (including several concatenated objects) is `JsonLines`.
    pub fn detect(bytes: &[u8]) -> Self {
        let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace());
        match first {
            Some(b'{') | Some(b'[') => {
                if serde_json::from_slice::<IgnoredAny>(bytes).is_ok() {
                    InputFormat::Json
                } else {
                    InputFormat::JsonLines
                }
            }
            _ => InputFormat::JsonLines,
        }
    }
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(InputFormat::Json),
            "jsonl" | "ndjson" | "json-lines" => Ok(InputFormat::JsonLines),
            _ => Err(format!("unsupported input format: {}. Supported: json, jsonl", s)),
        }
    }
}

/// Containers serde_json will nest before giving up
const PARSER_NESTING_LIMIT: usize = 128;

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

// The parser's recursion limit is reported as too deep, not as invalid JSON
fn decode(bytes: &[u8]) -> Result<NestedValue, RecordError> {
    serde_json::from_slice(bytes).map_err(|err| {
        if err.to_string().starts_with("recursion limit exceeded") {
            RecordError::NestingLimit {
                line: err.line(),
                column: err.column(),
                limit: PARSER_NESTING_LIMIT,
            }
        } else {
            RecordError::Json(err)
        }
    })
}

/// Parse one JSON object; surrounding whitespace is ignored
pub fn parse_record(bytes: &[u8]) -> Result<Mapping, RecordError> {
    if is_blank(bytes) {
        return Err(RecordError::Empty);
    }
    let value = decode(bytes)?;
    match value {
        NestedValue::Mapping(map) => Ok(map),
        other => Err(RecordError::NotAnObject {
            found: other.kind(),
        }),
    }
}

/// Parse a whole JSON document into records
///
/// An object yields one record; an array must contain only objects.
pub fn parse_document(bytes: &[u8]) -> Result<Vec<Mapping>, RecordError> {
    if is_blank(bytes) {
        return Err(RecordError::Empty);
    }
    let value = decode(bytes)?;
    match value {
        NestedValue::Mapping(map) => Ok(vec![map]),
        NestedValue::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                NestedValue::Mapping(map) => Ok(map),
                other => Err(RecordError::NotAnObject {
                    found: other.kind(),
                }),
            })
            .collect(),
        other => Err(RecordError::NotAnObject {
            found: other.kind(),
        }),
    }
}

/// Flatten one record and serialize it as a compact JSON line
pub fn flatten_record(flattener: &Flattener, bytes: &[u8]) -> Result<Vec<u8>, RecordError> {
    let record = parse_record(bytes)?;
    encode_line(flattener, &record)
}

/// Flatten a parsed record into a compact JSON line ending in `\n`
pub fn encode_line(flattener: &Flattener, record: &Mapping) -> Result<Vec<u8>, RecordError> {
    let flat = flattener.flatten(record)?;
    let mut line = serde_json::to_vec(&flat)?;
    line.push(b'\n');
    Ok(line)
}

/// Non-blank lines of a JSON Lines buffer, with 1-based line numbers
pub fn split_json_lines(bytes: &[u8]) -> impl Iterator<Item = (usize, &[u8])> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(idx, line)| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            (idx + 1, line)
        })
        .filter(|(_, line)| !is_blank(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{CollisionPolicy, FlattenOptions};
    use serde_json::json;

    #[test]
    fn test_flatten_record_emits_json_line() {
        let line = flatten_record(&Flattener::default(), b" {\"a\": {\"b\": [1, 2]}} \n").unwrap();
        assert_eq!(line, b"{\"a.b.0\":1,\"a.b.1\":2}\n");
    }

    #[test]
    fn test_parse_record_rejects_non_objects() {
        let err = parse_record(b"[1, 2]").unwrap_err();
        assert!(matches!(err, RecordError::NotAnObject { found: "array" }));

        let err = parse_record(b"42").unwrap_err();
        assert!(matches!(err, RecordError::NotAnObject { found: "number" }));
    }

    #[test]
    fn test_parse_record_rejects_blank_and_invalid() {
        assert!(matches!(parse_record(b"  \n").unwrap_err(), RecordError::Empty));
        assert!(matches!(
            parse_record(b"{\"a\": ").unwrap_err(),
            RecordError::Json(_)
        ));
    }

    #[test]
    fn test_flatten_record_propagates_policy_errors() {
        let flattener = Flattener::new(FlattenOptions {
            on_collision: CollisionPolicy::Error,
            ..Default::default()
        });
        let err = flatten_record(&flattener, br#"{"a.b": 1, "a": {"b": 2}}"#).unwrap_err();
        assert_eq!(err.error_type(), "KeyCollision");
    }

    #[test]
    fn test_flat_record_bytes_are_unchanged() {
        let input = br#"{"price":48.862400168521596,"qty":3,"name":"x"}"#;
        let line = flatten_record(&Flattener::default(), input).unwrap();
        assert_eq!(&line[..line.len() - 1], &input[..]);
    }

    fn nested_arrays(depth: usize) -> Vec<u8> {
        format!("{{\"a\":{}1{}}}", "[".repeat(depth), "]".repeat(depth)).into_bytes()
    }

    #[test]
    fn test_deep_records_report_too_deep() {
        for depth in [128, 129, 201] {
            let err = flatten_record(&Flattener::default(), &nested_arrays(depth)).unwrap_err();
            assert_eq!(err.error_type(), "TooDeep", "depth {}", depth);
        }

        let shallow = Flattener::new(FlattenOptions {
            max_depth: 10,
            ..Default::default()
        });
        let err = flatten_record(&shallow, &nested_arrays(20)).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Flatten(crate::FlattenError::TooDeep { limit: 10, .. })
        ));

        let line = flatten_record(&Flattener::default(), &nested_arrays(100)).unwrap();
        assert!(line.starts_with(b"{\"a.0.0."));
    }

    #[test]
    fn test_parse_document() {
        let records = parse_document(br#"[{"a": 1}, {"b": {"c": 2}}]"#).unwrap();
        assert_eq!(records.len(), 2);

        let records = parse_document(br#"{"a": 1}"#).unwrap();
        assert_eq!(records.len(), 1);

        assert!(parse_document(br#"[{"a": 1}, 2]"#).is_err());
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(InputFormat::detect(br#"{"a": {"b": 1}}"#), InputFormat::Json);
        assert_eq!(InputFormat::detect(b"[{\"a\": 1}]\n"), InputFormat::Json);
        assert_eq!(
            InputFormat::detect(b"{\"a\": 1}\n{\"b\": 2}\n"),
            InputFormat::JsonLines
        );
        assert_eq!(InputFormat::detect(b""), InputFormat::JsonLines);
        assert_eq!("ndjson".parse::<InputFormat>().unwrap(), InputFormat::JsonLines);
        assert!("csv".parse::<InputFormat>().is_err());
    }

    #[test]
    fn test_split_json_lines_skips_blanks_and_numbers_lines() {
        let input = b"{\"a\": 1}\r\n\n  \n{\"b\": 2}";
        let lines: Vec<(usize, &[u8])> = split_json_lines(input).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (1, &b"{\"a\": 1}"[..]));
        assert_eq!(lines[1].0, 4);

        let flat: serde_json::Value = serde_json::from_slice(
            &flatten_record(&Flattener::default(), lines[1].1).unwrap(),
        )
        .unwrap();
        assert_eq!(flat, json!({"b": 2}));
    }
}
