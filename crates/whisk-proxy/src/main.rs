use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};
use whisk_proxy::lifecycle::ActionLifecycle;
use whisk_proxy::proxy::{AppState, router};
use whisk_runtime::WasmLoader;

#[derive(Parser)]
#[command(
    name = "actionproxy",
    about = "Action container proxy — one-shot /init, repeated /run"
)]
struct Cli {
    /// Address to serve the lifecycle contract on
    #[arg(long, env = "ACTIONPROXY_BIND", default_value = "0.0.0.0:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    // Logs go to stderr; stdout belongs to action output and the
    // end-of-activation markers the log collector reads
    fmt()
        .with_env_filter(EnvFilter::from_env("ACTIONPROXY_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let loader = Arc::new(WasmLoader::new()?);
    let lifecycle = Arc::new(ActionLifecycle::new(loader));
    let app = router(AppState { lifecycle });

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!(addr = %cli.bind, "Action proxy listening");

    axum::serve(listener, app).await?;

    Ok(())
}
