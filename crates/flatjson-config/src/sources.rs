// Configuration source loading
//
// Priority order:
// 1. Environment variables (FLATJSON_* prefix)
// 2. Config file path from FLATJSON_CONFIG
// 3. Inline config content from FLATJSON_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.flatjson.toml)
// 5. Platform defaults (based on auto-detected Platform)

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::platform::Platform;
use crate::{ConfigFile, RuntimeConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_PATHS: &[&str] = &["./config.toml", "./.flatjson.toml"];

/// Load configuration for the detected platform using native environment/file access.
pub fn load_config(platform: Platform) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    ConfigFile::parse(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn load_from_file() -> Result<Option<ConfigFile>> {
    if let Ok(path) = env::var("FLATJSON_CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("FLATJSON_CONFIG_CONTENT") {
        let config = ConfigFile::parse(&content)
            .context("Failed to parse inline config from FLATJSON_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
/// Platform defaults sit underneath the file; environment overrides on top.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let file_config = read_config_file(path.as_ref())?;

    let mut config = RuntimeConfig::from_platform_defaults(Platform::detect());
    config.merge(file_config);

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration with graceful fallback to defaults.
/// Tries standard config file locations, returns platform defaults if none found.
pub fn load_or_default(platform: Platform) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);

    // Unreadable default files are not fatal here
    match load_from_file() {
        Ok(Some(file_config)) => config.merge(file_config),
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "Ignoring unreadable config file"),
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use std::io::Write;

    #[test]
    fn platform_defaults_match_expectations() {
        let cli = RuntimeConfig::from_platform_defaults(Platform::Cli);
        assert_eq!(cli.log.format, LogFormat::Text);
        assert_eq!(cli.request.max_record_bytes, 8 * 1024 * 1024);

        let lambda = RuntimeConfig::from_platform_defaults(Platform::Lambda);
        assert_eq!(lambda.log.format, LogFormat::Json);
        assert_eq!(lambda.request.max_record_bytes, 1_024_000);
    }

    #[test]
    fn read_config_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[flatten]\nmax_depth = \"lots\"").unwrap();

        let err = read_config_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(&file.path().display().to_string()));
    }

    #[test]
    fn read_config_file_parses_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[generator]\nevents_count = 30\nchunk_size = 10\nseed = 7\n\n[request]\nmax_record_bytes = 2048"
        )
        .unwrap();

        let parsed = read_config_file(file.path()).unwrap();
        let generator = parsed.generator.unwrap();
        assert_eq!(generator.events_count, Some(30));
        assert_eq!(generator.chunk_size, Some(10));
        assert_eq!(generator.sleep_interval_ms, None);
        assert_eq!(generator.seed, Some(7));
        assert_eq!(parsed.request.unwrap().max_record_bytes, Some(2048));
        assert!(parsed.flatten.is_none());
    }
}
