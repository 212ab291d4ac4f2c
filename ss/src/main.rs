use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::time::Duration;

use speedstore::cli::{Cli, Command};
use speedstore::config::Config;
use speedstore::{SPEED_KEY, SpeedStore, SpeedValue};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("speedstore starting");

    match cli.command {
        Command::Get => {
            let store = SpeedStore::open(&config.store_path)?;
            match store.read()? {
                Some(speed) => println!("{}", speed),
                None => println!("{} {}", SpeedValue::DEFAULT, "(default, nothing committed)".dimmed()),
            }
        }
        Command::Set { value } => {
            let store = SpeedStore::open(&config.store_path)?;
            let speed = SpeedValue::from_f64(value);
            store.write(speed)?;
            println!("{} Committed speed: {}", "✓".green(), speed.to_string().cyan());
        }
        Command::Watch { interval } => {
            let store = SpeedStore::open(&config.store_path)?;
            let interval = interval.map(Duration::from_millis).unwrap_or(config.poll_interval());
            watch(&store, interval)?;
        }
        Command::Path => {
            let store = SpeedStore::open(&config.store_path)?;
            println!("{}", store.record_path().display());
        }
    }

    Ok(())
}

/// Poll the record and print each commit. This is how a second process
/// observes commits; in-process consumers subscribe to the channel instead.
fn watch(store: &SpeedStore, interval: Duration) -> Result<()> {
    println!(
        "Watching {} every {}ms (Ctrl-C to stop)",
        store.record_path().display(),
        interval.as_millis()
    );

    let mut last_version = store.version()?;
    loop {
        std::thread::sleep(interval);
        if let Some(record) = store.read_record()?
            && record.version != last_version
        {
            last_version = record.version;
            println!(
                "{} {} = {} {}",
                record.updated_at.format("%H:%M:%S").to_string().dimmed(),
                SPEED_KEY,
                record.speed.to_string().cyan(),
                format!("(version {})", record.version).dimmed()
            );
        }
    }
}
