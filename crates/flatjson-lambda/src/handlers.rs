// Firehose batch transformation
//
// Every input record yields exactly one response record, in input order.
// A bad record is reported as ProcessingFailed and never fails the invocation.

use aws_lambda_events::firehose::{KinesisFirehoseEvent, KinesisFirehoseResponse};
use flatjson_core::{flatten_record, RecordError};
use tracing::{debug, info, warn};

use crate::response::{build_response, build_response_record, RecordOutcome};
use crate::LambdaState;

/// Counts logged once per invocation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransformSummary {
    pub ok: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl TransformSummary {
    fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Ok(_) => self.ok += 1,
            RecordOutcome::Dropped => self.dropped += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Decide the outcome for one record payload
pub(crate) fn transform_record(data: &[u8], state: &LambdaState) -> RecordOutcome {
    if data.len() > state.max_record_bytes {
        return RecordOutcome::Failed {
            error_type: "RecordTooLarge",
            message: format!(
                "record is {} bytes, limit is {}",
                data.len(),
                state.max_record_bytes
            ),
        };
    }

    match flatten_record(&state.flattener, data) {
        Ok(line) => RecordOutcome::Ok(line),
        Err(RecordError::Empty) => RecordOutcome::Dropped,
        Err(err) => RecordOutcome::Failed {
            error_type: err.error_type(),
            message: err.to_string(),
        },
    }
}

/// Transform a whole Firehose batch
pub(crate) fn transform_event(
    event: KinesisFirehoseEvent,
    request_id: &str,
    state: &LambdaState,
) -> KinesisFirehoseResponse {
    let mut summary = TransformSummary::default();
    let mut records = Vec::with_capacity(event.records.len());

    for record in event.records {
        let outcome = transform_record(&record.data.0, state);
        summary.record(&outcome);

        match &outcome {
            RecordOutcome::Failed {
                error_type,
                message,
            } => warn!(
                record_id = record.record_id.as_deref().unwrap_or("-"),
                error_type = *error_type,
                error = %message,
                "Record failed transformation"
            ),
            RecordOutcome::Dropped => debug!(
                record_id = record.record_id.as_deref().unwrap_or("-"),
                "Dropping blank record"
            ),
            RecordOutcome::Ok(_) => {}
        }

        records.push(build_response_record(record.record_id, record.data, outcome));
    }

    info!(
        request_id,
        invocation_id = event.invocation_id.as_deref().unwrap_or("-"),
        ok = summary.ok,
        dropped = summary.dropped,
        failed = summary.failed,
        "Transformed Firehose batch"
    );

    build_response(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatjson_core::{CollisionPolicy, FlattenOptions, Flattener};

    fn state(options: FlattenOptions, max_record_bytes: usize) -> LambdaState {
        LambdaState {
            flattener: Flattener::new(options),
            max_record_bytes,
        }
    }

    #[test]
    fn test_transform_record_flattens_objects() {
        let state = state(FlattenOptions::default(), 1024);
        let outcome = transform_record(br#"{"Keys": {"id": {"S": "42"}}}"#, &state);
        assert_eq!(outcome, RecordOutcome::Ok(b"{\"Keys.id.S\":\"42\"}\n".to_vec()));
    }

    #[test]
    fn test_transform_record_drops_blank_payloads() {
        let state = state(FlattenOptions::default(), 1024);
        assert_eq!(transform_record(b"", &state), RecordOutcome::Dropped);
        assert_eq!(transform_record(b" \n\t", &state), RecordOutcome::Dropped);
    }

    #[test]
    fn test_transform_record_failures() {
        let state = state(FlattenOptions::default(), 16);

        let outcome = transform_record(br#"{"payload": "far too long for the limit"}"#, &state);
        assert!(matches!(
            outcome,
            RecordOutcome::Failed {
                error_type: "RecordTooLarge",
                ..
            }
        ));

        let outcome = transform_record(b"[1, 2]", &state);
        assert!(matches!(
            outcome,
            RecordOutcome::Failed {
                error_type: "NotAnObject",
                ..
            }
        ));

        let outcome = transform_record(b"{nope", &state);
        assert_eq!(outcome.result(), "ProcessingFailed");
    }

    #[test]
    fn test_transform_record_reports_flatten_errors() {
        let strict = state(
            FlattenOptions {
                on_collision: CollisionPolicy::Error,
                ..Default::default()
            },
            1024,
        );
        let outcome = transform_record(br#"{"a.b": 1, "a": {"b": 2}}"#, &strict);
        assert!(matches!(
            outcome,
            RecordOutcome::Failed {
                error_type: "KeyCollision",
                ..
            }
        ));

        let shallow = state(
            FlattenOptions {
                max_depth: 1,
                ..Default::default()
            },
            1024,
        );
        let outcome = transform_record(br#"{"a": {"b": 1}}"#, &shallow);
        assert!(matches!(
            outcome,
            RecordOutcome::Failed {
                error_type: "TooDeep",
                ..
            }
        ));
    }

    #[test]
    fn test_transform_record_labels_parser_depth_as_too_deep() {
        let state = state(FlattenOptions::default(), 4096);
        let payload = format!("{{\"a\":{}1{}}}", "[".repeat(150), "]".repeat(150));
        let outcome = transform_record(payload.as_bytes(), &state);
        assert!(matches!(
            outcome,
            RecordOutcome::Failed {
                error_type: "TooDeep",
                ..
            }
        ));
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = TransformSummary::default();
        summary.record(&RecordOutcome::Ok(Vec::new()));
        summary.record(&RecordOutcome::Ok(Vec::new()));
        summary.record(&RecordOutcome::Dropped);
        summary.record(&RecordOutcome::Failed {
            error_type: "InvalidJson",
            message: String::new(),
        });
        assert_eq!(
            summary,
            TransformSummary {
                ok: 2,
                dropped: 1,
                failed: 1
            }
        );
    }
}
