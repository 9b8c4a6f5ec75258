// Firehose response builders
//
// Converts per-record outcomes into the response records Firehose expects

use aws_lambda_events::encodings::Base64Data;
use aws_lambda_events::firehose::{
    KinesisFirehoseResponse, KinesisFirehoseResponseRecord, KinesisFirehoseResponseRecordMetadata,
};
use std::collections::HashMap;

/// What happened to a single Firehose record
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordOutcome {
    /// Flattened JSON line to deliver
    Ok(Vec<u8>),
    /// Blank payload; nothing to deliver
    Dropped,
    /// Record could not be transformed; the original payload is handed back
    Failed {
        error_type: &'static str,
        message: String,
    },
}

impl RecordOutcome {
    /// Firehose `result` value
    pub fn result(&self) -> &'static str {
        match self {
            RecordOutcome::Ok(_) => "Ok",
            RecordOutcome::Dropped => "Dropped",
            RecordOutcome::Failed { .. } => "ProcessingFailed",
        }
    }
}

/// Build the response record for one input record
pub(crate) fn build_response_record(
    record_id: Option<String>,
    original: Base64Data,
    outcome: RecordOutcome,
) -> KinesisFirehoseResponseRecord {
    let result = Some(outcome.result().to_string());
    let data = match outcome {
        RecordOutcome::Ok(line) => Base64Data(line),
        RecordOutcome::Dropped | RecordOutcome::Failed { .. } => original,
    };

    KinesisFirehoseResponseRecord {
        record_id,
        result,
        data,
        metadata: KinesisFirehoseResponseRecordMetadata {
            partition_keys: HashMap::new(),
        },
    }
}

pub(crate) fn build_response(records: Vec<KinesisFirehoseResponseRecord>) -> KinesisFirehoseResponse {
    KinesisFirehoseResponse { records }
}
