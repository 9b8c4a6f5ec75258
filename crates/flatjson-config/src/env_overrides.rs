use crate::{LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};
use flatjson_core::CollisionPolicy;

pub const ENV_PREFIX: &str = "FLATJSON_";

/// Abstraction over environment-variable lookups so tests and embedded
/// runtimes can supply their own source of overrides.
pub trait EnvSource {
    /// Look up `key` with the `FLATJSON_` prefix applied
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Flattener
    if let Some(separator) = get_env_string(env, "SEPARATOR")? {
        config.flatten.separator = separator;
    }
    if let Some(val) = get_env_usize(env, "MAX_DEPTH")? {
        config.flatten.max_depth = val;
    }
    if let Some(policy) = get_env_string(env, "ON_COLLISION")? {
        config.flatten.on_collision = policy
            .parse::<CollisionPolicy>()
            .map_err(|e| anyhow!(e))
            .context("Invalid FLATJSON_ON_COLLISION value")?;
    }

    // Request configuration
    if let Some(val) = get_env_usize(env, "MAX_RECORD_BYTES")? {
        config.request.max_record_bytes = val;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.log.format = format
            .parse::<LogFormat>()
            .context("Invalid FLATJSON_LOG_FORMAT value")?;
    }

    // Generator
    if let Some(val) = get_env_usize(env, "GENERATOR_EVENTS_COUNT")? {
        config.generator.events_count = val;
    }
    if let Some(val) = get_env_usize(env, "GENERATOR_CHUNK_SIZE")? {
        config.generator.chunk_size = val;
    }
    if let Some(val) = get_env_u64(env, "GENERATOR_SLEEP_INTERVAL_MS")? {
        config.generator.sleep_interval_ms = val;
    }
    if let Some(val) = get_env_u64(env, "GENERATOR_SEED")? {
        config.generator.seed = Some(val);
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key))
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
