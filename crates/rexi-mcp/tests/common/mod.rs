use anyhow::Context as _;
use std::path::Path;
use std::process::{Child, Command};
use std::time::Duration;

pub use rexi_test_support::{EchoUpstream, KillOnDrop};

pub fn pick_unused_port() -> anyhow::Result<u16> {
    rexi_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    rexi_test_support::wait_http_ok(url, timeout_dur).await
}

pub fn spawn_rexi_mcp(
    spec: &Path,
    schema_dir: &Path,
    port: u16,
    extra_args: &[&str],
) -> anyhow::Result<Child> {
    let bin = env!("CARGO_BIN_EXE_rexi-mcp");
    Command::new(bin)
        .arg("--spec")
        .arg(spec)
        .arg("--schema-dir")
        .arg(schema_dir)
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--log-level")
        .arg("info")
        .args(extra_args)
        .env_remove("REXI_API_KEY")
        .env_remove("REXI_BASE_URL")
        .spawn()
        .context("spawn rexi-mcp")
}
