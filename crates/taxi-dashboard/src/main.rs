//! # taxi-dash
//!
//! Binary entry point for the taxi trip dashboard.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taxi_dashboard::{commands, Cli, Config, LogFormat};

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    // Logs go to stderr; stdout carries command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    let cli = Cli::parse();
    tracing::debug!(version = taxi_dashboard::VERSION, command = ?cli.command, "Starting taxi-dash");

    let stdout = std::io::stdout();
    commands::run(&cli, &config, &mut stdout.lock())
}
