// Fractonix Discord bot
// Main entry point for the fractonix binary

use clap::Parser;
use fractonix_engine::cli::{Cli, Command};
use fractonix_engine::config::{Config, Secrets};
use fractonix_engine::handlers::{handle_ask, handle_memory, handle_serve};
use fractonix_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set variables directly
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    if let Some(level) = &cli.log {
        config.core.log_level = level.clone();
        config.validate_and_process()?;
    }

    // RUST_LOG, when set, wins over the configured level
    init_telemetry_with_level(&config.core.log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Fractonix v{} ({} - {})", version, commit, timestamp);

    let secrets = Secrets::from_env();

    match cli.command {
        Command::Serve => {
            tracing::info!("Starting interactions server...");
            handle_serve(config, &secrets).await
        }

        Command::Ask {
            question,
            user,
            image,
        } => handle_ask(config, &secrets, question, user, image).await,

        Command::Memory { user } => handle_memory(&config, &user),
    }
}
