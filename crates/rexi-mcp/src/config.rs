use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use rexi_openapi::DispatcherConfig;
use rexi_openapi::dispatcher::DEFAULT_API_KEY_HEADER;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// MCP server wrapping the Rexi API.
///
/// Serves over stdio unless `--bind` is given, in which case it serves streamable HTTP at
/// `/mcp` (plus `/health`).
#[derive(Debug, Clone, Parser)]
#[command(name = "rexi-mcp", version)]
#[command(about = "MCP server wrapping the Rexi API", long_about = None)]
pub struct Cli {
    /// `OpenAPI` spec file (YAML or JSON).
    #[arg(
        long,
        env = "REXI_OPENAPI_PATH",
        default_value = "docs/openapi.generated.yaml"
    )]
    pub spec: PathBuf,

    /// Directory of schema files exposed as `rexi-schemas://<name>`.
    #[arg(long, env = "REXI_SCHEMA_DIR", default_value = "schema")]
    pub schema_dir: PathBuf,

    /// API key sent with every upstream call.
    #[arg(long, env = "REXI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Header carrying the API key.
    #[arg(long, default_value = DEFAULT_API_KEY_HEADER)]
    pub api_key_header: String,

    /// Upstream base URL; replaces `servers[0].url` from the spec.
    #[arg(long, env = "REXI_BASE_URL")]
    pub base_url: Option<String>,

    /// Default per-call timeout.
    #[arg(long, default_value_t = 30.0)]
    pub timeout_seconds: f64,

    /// Serve streamable HTTP on this address instead of stdio.
    #[arg(long, env = "REXI_MCP_BIND")]
    pub bind: Option<SocketAddr>,

    /// Log level (overridden by `RUST_LOG`).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// # Errors
    ///
    /// Returns an error if the default timeout is not a positive number of seconds.
    pub fn dispatcher_config(&self) -> anyhow::Result<DispatcherConfig> {
        anyhow::ensure!(
            self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0,
            "--timeout-seconds must be positive, got {}",
            self.timeout_seconds
        );
        let default_timeout = Duration::try_from_secs_f64(self.timeout_seconds)
            .context("--timeout-seconds out of range")?;

        Ok(DispatcherConfig {
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
            api_key_header: self.api_key_header.clone(),
            base_url: self.base_url.clone().filter(|u| !u.is_empty()),
            default_timeout,
        })
    }
}

/// Install the global subscriber. Logs go to stderr so the stdio transport stays clean.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.is_empty() => filter,
        _ => level.to_string(),
    };
    let filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
