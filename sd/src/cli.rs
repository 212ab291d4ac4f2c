//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// speedsync - debounced playback speed control across pages
#[derive(Parser)]
#[command(
    name = "sd",
    about = "Debounced playback speed control synchronized across pages",
    version,
    after_help = "Logs are written to: ~/.local/share/speedsync/logs/speedsync.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the interactive session (pages, triggers, control surface)
    Repl,

    /// Print the committed speed from the shared store
    Get,

    /// Commit a speed to the shared store (normalized first)
    Set {
        /// Speed value, e.g. 1.5
        value: f64,
    },

    /// List the control surface's preset speeds
    Presets,
}
