//! Interactive session for speedsync
//!
//! Drives the whole triad from a prompt: simulated pages, triggers, and
//! the control surface commands, all against the real store and
//! coordinator.

mod session;

pub use session::Session;

use eyre::Result;

use crate::config::Config;

/// Run the interactive session
///
/// This is the main entry point for `sd repl`.
pub async fn run_interactive(config: &Config) -> Result<()> {
    let mut session = Session::start(config.clone())?;
    session.run().await
}
