//! CLI command execution.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::chat::{results_text, ChatTransport, SlackClient, NO_RESULTS_TEXT};
use crate::fulfillment::{FulfillmentPool, PoolLimits, ViewRenderer};
use crate::server::{self, ServerSettings, ServerState};
use crate::tableau::{TableauClient, TableauConfig, TableauService};

use super::args::{Cli, Commands};

impl Cli {
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn tableau_config(&self) -> TableauConfig {
        TableauConfig {
            base_url: self.tableau_url.clone(),
            api_version: self.tableau_api_version.clone(),
            site_content_url: self.tableau_site.clone(),
            request_timeout: self.request_timeout(),
        }
    }

    const fn pool_limits(&self) -> PoolLimits {
        PoolLimits {
            max_concurrent: self.max_concurrent,
            max_pending: self.max_pending,
        }
    }
}

/// Execute the CLI command.
pub async fn execute(cli: Cli) -> Result<()> {
    match &cli.command {
        None | Some(Commands::Serve) => serve(&cli).await,
        Some(Commands::Search { query }) => search(&cli, &query.join(" ")).await,
        Some(Commands::Render { render_key, out }) => render(&cli, render_key, out).await,
    }
}

/// Sign in to Tableau. Any failure here is fatal for every command.
async fn connect(cli: &Cli) -> Result<Arc<TableauService>> {
    let client =
        TableauClient::new(&cli.tableau_config()).context("Failed to build Tableau client")?;
    let service = TableauService::new(client);
    service
        .authenticate(&cli.tableau_login, &cli.tableau_password)
        .await
        .context("Tableau sign-in failed")?;
    Ok(Arc::new(service))
}

async fn connect_and_load(cli: &Cli) -> Result<Arc<TableauService>> {
    let service = connect(cli).await?;
    service
        .load_catalog()
        .await
        .context("Failed to load the view catalog")?;
    Ok(service)
}

async fn serve(cli: &Cli) -> Result<()> {
    let Some(bot_token) = cli.bot_token.as_deref() else {
        bail!("--bot-token (BOT_TOKEN) is required to serve");
    };
    let Some(verification_token) = cli.verification_token.clone() else {
        bail!("--verification-token (VERIFICATION_TOKEN) is required to serve");
    };

    let tableau = connect_and_load(cli).await?;

    let chat: Arc<dyn ChatTransport> = Arc::new(
        SlackClient::new(&cli.slack_api_url, bot_token, cli.request_timeout())
            .context("Failed to build Slack client")?,
    );
    let (pool, mut events) = FulfillmentPool::with_events(
        Arc::clone(&tableau) as Arc<dyn ViewRenderer>,
        Arc::clone(&chat),
        cli.pool_limits(),
    );
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Fulfillment progress");
        }
    });

    let limits = pool.limits();
    info!(
        max_concurrent = limits.max_concurrent,
        max_pending = limits.max_pending,
        limit = cli.limit,
        "Fulfillment pool ready"
    );
    let state = ServerState::new(
        tableau,
        chat,
        pool,
        ServerSettings {
            verification_token,
            bot_id: cli.bot_id.clone(),
            limit: cli.limit,
        },
    );

    server::start_server(cli.port, Arc::new(state)).await
}

async fn search(cli: &Cli, query: &str) -> Result<()> {
    let tableau = connect_and_load(cli).await?;
    let result = tableau.search(query, cli.limit).await;

    if result.is_empty() {
        println!("{NO_RESULTS_TEXT}");
        return Ok(());
    }

    println!("{}", results_text(result.truncated, cli.limit));
    for entry in &result.matches {
        println!("  {}  ({})", entry.display_name, entry.render_key);
    }
    Ok(())
}

async fn render(cli: &Cli, render_key: &str, out: &Path) -> Result<()> {
    let tableau = connect(cli).await?;
    let bytes = tableau
        .render(render_key)
        .await
        .with_context(|| format!("Failed to render {render_key}"))?;

    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    info!(render_key, bytes = bytes.len(), path = %out.display(), "View written");
    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::can_bind_localhost;
    use clap::Parser;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    const SIGN_IN_OK: &str =
        r#"<tsResponse><credentials token="tok-1"><site id="site-1" contentUrl=""/></credentials></tsResponse>"#;

    fn cli(server: &MockServer, extra: &[&str]) -> Cli {
        let url = server.base_url();
        let mut args = vec![
            "dashbot",
            "--tableau-url",
            url.as_str(),
            "--tableau-login",
            "bot",
            "--tableau-password",
            "secret",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn test_render_writes_file() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/3.0/auth/signin");
                then.status(200).body(SIGN_IN_OK);
            })
            .await;
        let render = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/views/Book/Sheet.png")
                    .header("cookie", "workgroup_session_id=tok-1");
                then.status(200).body(b"\x89PNG-bytes".as_slice());
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("view.png");
        let out_arg = out.to_string_lossy().to_string();

        execute(cli(&server, &["render", "Book/Sheet", "--out", out_arg.as_str()]))
            .await
            .unwrap();

        render.assert_async().await;
        assert_eq!(std::fs::read(&out).unwrap(), b"\x89PNG-bytes");
    }

    #[tokio::test]
    async fn test_failed_sign_in_aborts() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/3.0/auth/signin");
                then.status(401).body("<tsResponse/>");
            })
            .await;

        let err = execute(cli(&server, &["search", "sales"])).await.unwrap_err();
        assert!(err.to_string().contains("sign-in"));
    }

    #[tokio::test]
    async fn test_serve_requires_bot_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }
        let server = MockServer::start_async().await;
        let mut cli = cli(&server, &["serve"]);
        cli.bot_token = None;

        let err = execute(cli).await.unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }
}
