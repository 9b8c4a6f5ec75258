// flatjson-config - Unified configuration for all runtimes
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from FLATJSON_CONFIG env var
// 3. Config file contents from FLATJSON_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.flatjson.toml)
// 5. Platform-specific defaults (lowest priority)

use anyhow::{Context, Result};
use flatjson_core::{CollisionPolicy, FlattenOptions, DEFAULT_MAX_DEPTH, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod env_overrides;
mod platform;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use platform::{Platform, PlatformDefaults};

/// Main runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub flatten: FlattenConfig,

    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Flattener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenConfig {
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub on_collision: CollisionPolicy,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            max_depth: default_max_depth(),
            on_collision: CollisionPolicy::default(),
        }
    }
}

impl FlattenConfig {
    pub fn options(&self) -> FlattenOptions {
        FlattenOptions {
            separator: self.separator.clone(),
            max_depth: self.max_depth,
            on_collision: self.on_collision,
        }
    }
}

/// Per-record limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub max_record_bytes: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_record_bytes: 8 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Synthetic order generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub events_count: usize,
    pub chunk_size: usize,
    pub sleep_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            events_count: 10_000,
            chunk_size: 15,
            sleep_interval_ms: 100,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_interval_ms)
    }
}

/// One TOML layer. Only the fields a layer names override the values below it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub flatten: Option<FlattenLayer>,
    #[serde(default)]
    pub request: Option<RequestLayer>,
    #[serde(default)]
    pub log: Option<LogLayer>,
    #[serde(default)]
    pub generator: Option<GeneratorLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlattenLayer {
    pub separator: Option<String>,
    pub max_depth: Option<usize>,
    pub on_collision: Option<CollisionPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestLayer {
    pub max_record_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogLayer {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorLayer {
    pub events_count: Option<usize>,
    pub chunk_size: Option<usize>,
    pub sleep_interval_ms: Option<u64>,
    pub seed: Option<u64>,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        let platform = Platform::detect();
        sources::load_config(platform)
    }

    /// Load configuration for a specific platform (useful for testing)
    pub fn load_for_platform(platform: Platform) -> Result<Self> {
        sources::load_config(platform)
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with graceful fallback to defaults.
    /// Does not fail if config file is missing - uses platform defaults instead.
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default(Platform::detect())
    }

    /// Construct a config that contains only platform defaults (no env or files).
    pub fn from_platform_defaults(platform: Platform) -> Self {
        platform_defaults(platform)
    }

    /// Merge a file layer into this one (used for TOML layering).
    /// Fields the layer leaves out keep their current value.
    pub fn merge(&mut self, other: ConfigFile) {
        if let Some(flatten) = other.flatten {
            if let Some(separator) = flatten.separator {
                self.flatten.separator = separator;
            }
            if let Some(max_depth) = flatten.max_depth {
                self.flatten.max_depth = max_depth;
            }
            if let Some(policy) = flatten.on_collision {
                self.flatten.on_collision = policy;
            }
        }
        if let Some(request) = other.request {
            if let Some(max_record_bytes) = request.max_record_bytes {
                self.request.max_record_bytes = max_record_bytes;
            }
        }
        if let Some(log) = other.log {
            if let Some(level) = log.level {
                self.log.level = level;
            }
            if let Some(format) = log.format {
                self.log.format = format;
            }
        }
        if let Some(generator) = other.generator {
            if let Some(events_count) = generator.events_count {
                self.generator.events_count = events_count;
            }
            if let Some(chunk_size) = generator.chunk_size {
                self.generator.chunk_size = chunk_size;
            }
            if let Some(sleep_interval_ms) = generator.sleep_interval_ms {
                self.generator.sleep_interval_ms = sleep_interval_ms;
            }
            if generator.seed.is_some() {
                self.generator.seed = generator.seed;
            }
        }
    }

    /// Apply environment overrides from a custom source
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration for the given platform from inline content plus
    /// overrides supplied by an `EnvSource`. No filesystem or host env access.
    pub fn load_for_platform_with_env<E: EnvSource>(
        platform: Platform,
        inline_config: Option<&str>,
        env: &E,
    ) -> Result<Self> {
        let mut config = RuntimeConfig::from_platform_defaults(platform);

        if let Some(inline) = inline_config {
            let file_config =
                ConfigFile::parse(inline).context("Failed to parse inline config content")?;
            config.merge(file_config);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

fn platform_defaults(platform: Platform) -> RuntimeConfig {
    let defaults = platform.defaults();

    RuntimeConfig {
        flatten: FlattenConfig::default(),
        request: RequestConfig {
            max_record_bytes: defaults.max_record_bytes,
        },
        log: LogConfig {
            level: default_log_level(),
            format: defaults.log_format,
        },
        generator: GeneratorConfig::default(),
    }
}
