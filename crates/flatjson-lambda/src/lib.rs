// AWS Lambda runtime adapter
//
// Kinesis Data Firehose transformation: every record in the batch is flattened
// independently and handed back with the same recordId.
//
// Philosophy: Use lambda_runtime's provided tokio

use aws_lambda_events::firehose::{KinesisFirehoseEvent, KinesisFirehoseResponse};
use flatjson_config::{LogConfig, LogFormat, Platform, RuntimeConfig};
use flatjson_core::Flattener;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::info;

mod handlers;
mod response;

use handlers::transform_event;

/// Lambda handler for Firehose transformation batches
async fn handle_request(
    event: LambdaEvent<KinesisFirehoseEvent>,
    state: Arc<LambdaState>,
) -> Result<KinesisFirehoseResponse, Error> {
    let (event, context) = event.into_parts();
    Ok(transform_event(event, &context.request_id, &state))
}

/// Per-process dependencies shared by every invocation
pub(crate) struct LambdaState {
    pub flattener: Flattener,
    pub max_record_bytes: usize,
}

impl LambdaState {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            flattener: Flattener::new(config.flatten.options()),
            max_record_bytes: config.request.max_record_bytes,
        }
    }
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = RuntimeConfig::load_for_platform(Platform::Lambda)
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;

    init_tracing(&config.log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        built_at = env!("BUILD_TIMESTAMP"),
        separator = %config.flatten.separator,
        max_depth = config.flatten.max_depth,
        on_collision = %config.flatten.on_collision,
        max_record_bytes = config.request.max_record_bytes,
        "Firehose transformer starting"
    );

    let state = Arc::new(LambdaState::from_config(&config));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<KinesisFirehoseEvent>| {
        let state = state.clone();
        async move { handle_request(event, state).await }
    }))
    .await
}

fn init_tracing(log: &LogConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    // CloudWatch stamps each line already
    let _ = match log.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().without_time()),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().without_time().with_ansi(false)),
        ),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use lambda_runtime::Context;
    use serde_json::{json, Value};

    fn firehose_event(payloads: &[&str]) -> KinesisFirehoseEvent {
        let records: Vec<Value> = payloads
            .iter()
            .enumerate()
            .map(|(idx, payload)| {
                json!({
                    "recordId": format!("record-{}", idx),
                    "approximateArrivalTimestamp": 1507217624302i64,
                    "data": STANDARD.encode(payload),
                })
            })
            .collect();

        serde_json::from_value(json!({
            "invocationId": "invocation-1",
            "deliveryStreamArn": "arn:aws:firehose:us-east-1:123456789012:deliverystream/orders",
            "region": "us-east-1",
            "records": records,
        }))
        .expect("Failed to create KinesisFirehoseEvent")
    }

    #[tokio::test]
    async fn handle_request_flattens_every_record() {
        let config = RuntimeConfig::from_platform_defaults(Platform::Lambda);
        let state = Arc::new(LambdaState::from_config(&config));
        let event = LambdaEvent::new(
            firehose_event(&[
                r#"{"order": {"sku": "ET-9973", "price": 512.5}}"#,
                "not json",
                "   ",
            ]),
            Context::default(),
        );

        let response = handle_request(event, state).await.unwrap();
        let body = serde_json::to_value(&response).unwrap();
        let records = body["records"].as_array().unwrap();
        assert_eq!(records.len(), 3);

        let ids: Vec<&str> = records
            .iter()
            .map(|r| r["recordId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["record-0", "record-1", "record-2"]);

        assert_eq!(records[0]["result"], "Ok");
        let data = STANDARD
            .decode(records[0]["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(
            String::from_utf8(data).unwrap(),
            "{\"order.sku\":\"ET-9973\",\"order.price\":512.5}\n"
        );

        assert_eq!(records[1]["result"], "ProcessingFailed");
        assert_eq!(records[2]["result"], "Dropped");
    }
}
