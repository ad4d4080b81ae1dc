//! CivicSphere CLI - Command-line interface for the city services assistant.

use civic_cli::cli::ChatArgs;
use civic_cli::commands;
use civic_cli::config::StoreBackend;
use civic_cli::{Cli, Command, Config, Formatter};
use civic_store::MemoryStore;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never mix with command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> civic_cli::Result<()> {
    let cli = Cli::parse();

    // Load or create config
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command.unwrap_or_else(|| Command::Chat(ChatArgs::default())) {
        Command::Chat(args) => match config.store.backend {
            StoreBackend::Memory => {
                let store = Arc::new(MemoryStore::new());
                commands::execute_chat(args, store, &config, &formatter).await?;
            }
            StoreBackend::Sqlite => {
                let store = Arc::new(commands::open_sqlite(&config.store)?);
                commands::execute_chat(args, store, &config, &formatter).await?;
            }
        },
        Command::Ask(args) => match config.store.backend {
            StoreBackend::Memory => {
                let store = Arc::new(MemoryStore::new());
                commands::execute_ask(args, store, &config, &formatter).await?;
            }
            StoreBackend::Sqlite => {
                let store = Arc::new(commands::open_sqlite(&config.store)?);
                commands::execute_ask(args, store, &config, &formatter).await?;
            }
        },
        Command::Rules(args) => {
            commands::execute_rules(args, &config, &formatter)?;
        }
        Command::Departments => {
            commands::execute_departments(&formatter)?;
        }
        Command::History(args) => {
            commands::execute_history(args, &config, &formatter).await?;
        }
    }

    Ok(())
}
