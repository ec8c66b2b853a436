//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::chat::DEFAULT_SLACK_API_URL;

/// Dashbot - find Tableau dashboards from Slack and post them as images
#[derive(Parser, Debug)]
#[command(name = "dashbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port the Slack callback server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // === Slack ===
    /// Bot OAuth token used for chat.postMessage and files.upload
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Bot user id a `find` mention must address
    #[arg(long, env = "BOT_ID")]
    pub bot_id: Option<String>,

    /// Token every Slack callback must carry
    #[arg(long, env = "VERIFICATION_TOKEN", hide_env_values = true)]
    pub verification_token: Option<String>,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_URL", default_value = DEFAULT_SLACK_API_URL)]
    pub slack_api_url: String,

    // === Tableau ===
    /// Tableau server base URL (e.g. https://tableau.example.com)
    #[arg(long, env = "TABLEAU_URL")]
    pub tableau_url: String,

    /// REST API version segment
    #[arg(long, env = "TABLEAU_API_VERSION", default_value = "3.0")]
    pub tableau_api_version: String,

    /// Site content URL; empty for the default site
    #[arg(long, env = "TABLEAU_SITE", default_value = "")]
    pub tableau_site: String,

    /// Tableau user name
    #[arg(long, env = "TABLEAU_LOGIN")]
    pub tableau_login: String,

    /// Tableau password
    #[arg(long, env = "TABLEAU_PASSWORD", hide_env_values = true)]
    pub tableau_password: String,

    // === Limits ===
    /// Maximum number of dashboards offered per search
    #[arg(long, env = "BOT_CONFIG_LIMIT", default_value_t = 20, value_parser = positive)]
    pub limit: usize,

    /// Timeout for every outbound HTTP request, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Selections fetched or delivered at the same time
    #[arg(long, env = "MAX_CONCURRENT_RENDERS", default_value_t = 4, value_parser = positive)]
    pub max_concurrent: usize,

    /// Selections accepted but not yet finished before new ones are refused
    #[arg(long, env = "MAX_PENDING_RENDERS", default_value_t = 32, value_parser = positive)]
    pub max_pending: usize,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate, load the catalog and serve Slack callbacks
    Serve,

    /// Search the catalog and print the matches
    Search {
        /// Text to look for in dashboard names
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Render a view and write the image to a file
    Render {
        /// View path such as `Workbook/Sheet`
        render_key: String,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
