use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod campaign;
mod cli;
mod config;
mod core;
mod creative;
mod http_client;
mod report;
mod server;
mod storage;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    let cli = Cli::parse();

    // `forge config` must keep working when the file or an override is broken
    let mut config = match &cli.command {
        Some(Commands::Config(_)) => Config::load_lenient()?,
        _ => Config::load()?,
    };

    match cli.command {
        Some(Commands::Serve(args)) => {
            cli::commands::serve::run(args, config).await?;
        }
        Some(Commands::Run(args)) => {
            cli::commands::run::run(args, config).await?;
        }
        Some(Commands::Campaigns(args)) => {
            cli::commands::campaigns::run(args, config).await?;
        }
        Some(Commands::Config(args)) => {
            cli::commands::config::run(args, &mut config)?;
        }
        None => {
            cli::commands::serve::run(Default::default(), config).await?;
        }
    }

    Ok(())
}
