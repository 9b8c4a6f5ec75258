// Configuration validation
//
// Validates that values are present and sensible

use crate::*;
use flatjson_core::DEFAULT_MAX_DEPTH;
use anyhow::{bail, Result};
use tracing::warn;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// PutRecordBatch accepts at most 500 records per call
const MAX_CHUNK_SIZE: usize = 500;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_flatten_config(&config.flatten)?;
    validate_request_config(&config.request)?;
    validate_log_config(&config.log)?;
    validate_generator_config(&config.generator)?;
    Ok(())
}

fn validate_flatten_config(config: &FlattenConfig) -> Result<()> {
    if config.separator.is_empty() {
        bail!("flatten.separator must not be empty");
    }

    if config.max_depth == 0 {
        bail!("flatten.max_depth must be greater than 0");
    }

    if config.max_depth > DEFAULT_MAX_DEPTH {
        warn!(
            max_depth = config.max_depth,
            "flatten.max_depth is above the JSON parser's nesting limit; parsed input never gets that deep"
        );
    }

    Ok(())
}

fn validate_request_config(config: &RequestConfig) -> Result<()> {
    if config.max_record_bytes == 0 {
        bail!("request.max_record_bytes must be greater than 0");
    }

    // Warn about very large records
    if config.max_record_bytes > 100 * 1024 * 1024 {
        // 100 MB
        warn!(
            max_record_bytes = config.max_record_bytes,
            "request.max_record_bytes is very large; may cause memory issues"
        );
    }

    Ok(())
}

fn validate_log_config(config: &LogConfig) -> Result<()> {
    let level = config.level.trim();
    if level.is_empty() {
        bail!("log.level must not be empty");
    }

    // Directives such as "flatjson=debug,info" are passed to the filter as-is
    let is_directive = level.contains('=') || level.contains(',');
    if !is_directive && !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        bail!(
            "log.level '{}' is not one of: {}",
            config.level,
            LOG_LEVELS.join(", ")
        );
    }

    Ok(())
}

fn validate_generator_config(config: &GeneratorConfig) -> Result<()> {
    if config.chunk_size == 0 {
        bail!("generator.chunk_size must be greater than 0");
    }

    if config.chunk_size > MAX_CHUNK_SIZE {
        bail!(
            "generator.chunk_size must be at most {} (PutRecordBatch limit)",
            MAX_CHUNK_SIZE
        );
    }

    if config.events_count < config.chunk_size {
        warn!(
            events_count = config.events_count,
            chunk_size = config.chunk_size,
            "generator.events_count is smaller than one chunk; nothing will be generated"
        );
    }

    Ok(())
}
