pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "watchpost")]
#[command(about = "Forum listing monitor with webhook notifications", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the listing once and exit
    Run,
    /// Keep checking on an interval until interrupted
    Watch {
        /// Check interval (e.g., "90s", "5m", "1h"); overrides the config file
        #[arg(short, long)]
        interval: Option<String>,
    },
    /// Show recently seen articles
    List {
        /// Maximum number of articles to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show articles not yet announced to the webhook
    Pending,
}
