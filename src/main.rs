use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flatjson::flatten::FlattenCommand;
use flatjson::generate::GenerateCommand;
use flatjson_config::RuntimeConfig;
use flatjson_core::{CollisionPolicy, Flattener};
use std::path::PathBuf;

/// Flatten nested JSON records into single-level key/value records
#[derive(Parser)]
#[command(name = "flatjson")]
#[command(version)]
#[command(about = "Flatten nested JSON records into single-level key/value records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Separator placed between path segments (default ".")
    #[arg(long, value_name = "SEP", global = true)]
    separator: Option<String>,

    /// Maximum nesting depth before a record is rejected
    #[arg(long, value_name = "N", global = true)]
    max_depth: Option<usize>,

    /// What to do when two paths produce the same key: overwrite, error, collect
    #[arg(long, value_name = "POLICY", global = true)]
    on_collision: Option<CollisionPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten a JSON document or JSON Lines stream
    Flatten(FlattenCommand),
    /// Write synthetic order records as JSON Lines
    Generate(GenerateCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load_or_default().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority) and re-check the result
    apply_cli_overrides(&mut config, &cli);
    if let Commands::Generate(command) = &cli.command {
        command.apply_overrides(&mut config.generator);
    }
    config.validate().context("Invalid configuration")?;

    // Step 3: Initialize tracing once the log settings are final
    flatjson::init_tracing(&config.log);

    match &cli.command {
        Commands::Flatten(command) => {
            let flattener = Flattener::new(config.flatten.options());
            command.run(&flattener)?;
        }
        Commands::Generate(command) => {
            command.run(&config.generator)?;
        }
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if let Some(separator) = &cli.separator {
        config.flatten.separator = separator.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.flatten.max_depth = max_depth;
    }
    if let Some(policy) = cli.on_collision {
        config.flatten.on_collision = policy;
    }
}
