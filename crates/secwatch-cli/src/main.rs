use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secwatch_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "secwatch")]
#[command(author, version, about = "Desktop notifications for new security advisories and forum posts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (default: ~/.config/secwatch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Display extra information
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Display debug information
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch all sources until interrupted
    Run,
    /// List configured sources
    List,
    /// Fetch sources once and print matching articles, without notifying
    Check {
        /// Only check the source with this name
        #[arg(short, long)]
        source: Option<String>,
    },
}

fn log_filter(cli: &Cli, config: &AppConfig) -> String {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return filter;
    }
    if cli.debug {
        "debug".to_string()
    } else if cli.verbose {
        "info".to_string()
    } else {
        config.general.log_level.clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal before anything starts
    let config = Arc::new(AppConfig::load(cli.config.as_deref())?);

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter(&cli, &config)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Some(Commands::Run) | None => commands::run::run(config).await,
        Some(Commands::List) => commands::list::run(&config),
        Some(Commands::Check { source }) => commands::check::run(&config, source.as_deref()).await,
    }
}
