use crate::server::RexiMcpServer;
use anyhow::Context as _;
use axum::Router;
use axum::routing::get;
use rmcp::ServiceExt as _;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Serve one MCP session over stdin/stdout until the peer disconnects or `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the MCP handshake fails or the service task panics.
pub async fn serve_stdio(server: RexiMcpServer, shutdown: CancellationToken) -> anyhow::Result<()> {
    tracing::info!("serving MCP over stdio");
    let running = server
        .serve_with_ct(rmcp::transport::stdio(), shutdown)
        .await
        .context("start stdio MCP session")?;
    let reason = running.waiting().await.context("stdio MCP session task")?;
    tracing::info!(?reason, "stdio MCP session ended");
    Ok(())
}

/// Serve streamable HTTP MCP at `/mcp` and a liveness probe at `/health`.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_http(
    server: RexiMcpServer,
    bind: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );
    let app = router().nest_service("/mcp", mcp);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    let addr = listener.local_addr().context("local_addr")?;
    tracing::info!(addr = %addr, "serving MCP over streamable HTTP at /mcp");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server")?;
    Ok(())
}

fn router() -> Router {
    Router::new().route("/health", get(|| async { "ok" }))
}
