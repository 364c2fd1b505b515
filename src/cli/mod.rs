pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{validate_feed_url, Config, ConfigError};

#[derive(Parser)]
#[command(name = "broadsheet")]
#[command(about = "A local, always-readable cache of a JSON article feed", long_about = None)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Feed URL, overriding the config file
    #[arg(long, global = true)]
    pub feed_url: Option<String>,

    /// Database path, overriding the config file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the feed once and replace the cached snapshot
    Refresh,
    /// List cached articles, newest first
    List,
    /// Show a single cached article
    Show {
        /// Server id of the article
        id: String,
    },
    /// Show metadata about the cached snapshot
    Status,
    /// Keep refreshing on an interval and print list updates
    Watch {
        /// Refresh interval (e.g., "30s", "15m", "1h")
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the refresh on start
        #[arg(long)]
        no_initial_refresh: bool,
    },
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
        if let Some(url) = &self.feed_url {
            validate_feed_url(url)?;
            config.feed.url = url.clone();
        }
        if let Some(db) = &self.db {
            config.store.path = Some(db.clone());
        }
        if let Commands::Watch {
            interval: Some(interval),
            ..
        } = &self.command
        {
            config.watch.interval = interval.clone();
            config.watch_interval()?;
        }
        Ok(())
    }
}
