//! CLI argument parsing for speedstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ss")]
#[command(author, version, about = "Durable playback-speed store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the committed speed
    Get,

    /// Commit a new speed (clamped to the valid range)
    Set {
        /// Speed value, e.g. 1.5
        #[arg(required = true)]
        value: f64,
    },

    /// Poll the record and print every commit as it lands
    Watch {
        /// Poll interval in milliseconds (default from config)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Print the record file path
    Path,
}
