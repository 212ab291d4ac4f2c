//! speedsync - debounced playback speed control across pages
//!
//! CLI entry point for the interactive session and store commands.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use speedstore::{SpeedStore, SpeedValue};
use speedsync::cli::{Cli, Command};
use speedsync::config::Config;
use speedsync::repl;
use speedsync::speed::PRESET_SPEEDS;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("speedsync")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // Write to log file, not stdout/stderr - the session owns the terminal
    let log_file = fs::File::create(log_dir.join("speedsync.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("speedsync loaded config: store={}", config.store_path.display());

    match cli.command {
        Command::Repl => repl::run_interactive(&config).await,
        Command::Get => cmd_get(&config),
        Command::Set { value } => cmd_set(&config, value),
        Command::Presets => cmd_presets(),
    }
}

/// Print the committed speed
fn cmd_get(config: &Config) -> Result<()> {
    let store = SpeedStore::open(&config.store_path)?;
    match store.read()? {
        Some(speed) => println!("{}", speed),
        None => println!("{} {}", SpeedValue::DEFAULT, "(default, nothing committed)".dimmed()),
    }
    Ok(())
}

/// Commit a speed to the shared store
fn cmd_set(config: &Config, value: f64) -> Result<()> {
    let store = SpeedStore::open(&config.store_path)?;
    let speed = SpeedValue::from_f64(value);
    store.write(speed)?;
    println!("{} Committed speed: {}", "✓".green(), speed.to_string().cyan());
    Ok(())
}

/// List the control surface presets
fn cmd_presets() -> Result<()> {
    println!("{}", "Preset speeds:".bright_cyan());
    for (index, preset) in PRESET_SPEEDS.iter().enumerate() {
        let speed = SpeedValue::from_f64(*preset);
        println!("  {}. {}", index + 1, speed.to_string().cyan());
    }
    Ok(())
}
