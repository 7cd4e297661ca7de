use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use watchpost::app::AppContext;
use watchpost::cli::{commands, Cli, Commands};
use watchpost::config::{Config, ConfigWatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let config = Arc::new(Config::load(&cli.config)?);
            let ctx = AppContext::new(&config)?;
            commands::run(&ctx, config).await?;
        }
        Commands::Watch { interval } => {
            let config_watcher = ConfigWatcher::new(cli.config)?;
            let ctx = AppContext::new(&config_watcher.current())?;
            commands::watch(&ctx, config_watcher, interval).await?;
        }
        Commands::List { limit } => {
            let config = Config::load(&cli.config)?;
            let ctx = AppContext::new(&config)?;
            commands::list(&ctx, limit)?;
        }
        Commands::Pending => {
            let config = Config::load(&cli.config)?;
            let ctx = AppContext::new(&config)?;
            commands::pending(&ctx)?;
        }
    }

    Ok(())
}
