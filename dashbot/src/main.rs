//! Dashbot - find Tableau dashboards from Slack and post them as images.
//!
//! Architecture:
//! - On startup the bot signs in to Tableau and loads the full view catalog
//! - `find <query>` mentions are answered from the in-memory catalog
//! - A picked view is acknowledged at once, rendered to PNG and uploaded
//!   to the channel by a bounded background pool

mod catalog;
mod chat;
mod cli;
mod error;
mod fulfillment;
mod models;
mod server;
mod tableau;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    execute(cli).await
}
