//! `rexi-mcp`: MCP server for the Rexi API.

mod config;
mod resources;
mod server;
mod tools;
mod transport;

use anyhow::Context as _;
use clap::Parser as _;
use config::Cli;
use rexi_openapi::{Catalog, CatalogHandle, Dispatcher, DispatcherConfig, RexiService, SchemaDirectory};
use server::RexiMcpServer;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Real environment variables win over `.env`.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    config::init_tracing(&cli.log_level, cli.log_format);
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let dispatcher_config = cli.dispatcher_config()?;
    let service = build_service(&cli.spec, &cli.schema_dir, dispatcher_config)?;

    let shutdown = CancellationToken::new();
    spawn_ctrl_c(shutdown.clone());
    #[cfg(unix)]
    spawn_reload_on_sighup(Arc::clone(service.catalog_handle()), shutdown.clone())?;

    let server = RexiMcpServer::new(service);
    match cli.bind {
        Some(bind) => transport::serve_http(server, bind, shutdown).await,
        None => transport::serve_stdio(server, shutdown).await,
    }
}

/// Load the catalog and wire up the service.
///
/// # Errors
///
/// Returns an error if the spec file exists but cannot be read or parsed.
pub(crate) fn build_service(
    spec: &Path,
    schema_dir: &Path,
    dispatcher_config: DispatcherConfig,
) -> anyhow::Result<RexiService> {
    let catalog = Catalog::load(spec)
        .with_context(|| format!("load OpenAPI spec {}", spec.display()))?;
    tracing::info!(
        schema_dir = %schema_dir.display(),
        api_key = dispatcher_config.api_key.is_some(),
        base_url_override = dispatcher_config.base_url.as_deref().unwrap_or("-"),
        "starting rexi-mcp"
    );

    Ok(RexiService::new(
        Arc::new(CatalogHandle::new(catalog)),
        SchemaDirectory::new(schema_dir),
        Dispatcher::new(dispatcher_config),
    ))
}

fn spawn_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        shutdown.cancel();
    });
}

#[cfg(unix)]
fn spawn_reload_on_sighup(
    catalog: Arc<CatalogHandle>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    use rexi_openapi::ReloadOutcome;
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("install SIGHUP handler")?;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    match catalog.reload() {
                        Ok(ReloadOutcome::Unchanged) => tracing::info!("spec unchanged; keeping catalog"),
                        Ok(ReloadOutcome::Replaced { endpoints }) => {
                            tracing::info!(endpoints, "catalog reloaded");
                        }
                        Err(e) => tracing::warn!(error = %e, "reload failed; keeping previous catalog"),
                    }
                }
            }
        }
    });
    Ok(())
}
