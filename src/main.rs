//! mcpgate - a resilient stdio-to-HTTP/SSE bridge for MCP servers
#![doc = "Bridges a local stdio JSON-RPC client to a remote MCP server over HTTP POST + SSE."]

use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use mcpgate::cli::Cli;
use mcpgate::config::Config;
use mcpgate::frame_io::{FrameWriter, LineReader};
use mcpgate::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse_args();
    let url = match Url::parse(&cli.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("[mcpgate] invalid upstream URL {:?}: {e}", cli.url);
            std::process::exit(1);
        }
    };

    let config = Config::from_env(url);
    tracing::info!(
        "[mcpgate] bridging stdio to {} (base_delay={:?}, max_delay={:?}, max_attempts={}, recovery_interval={:?})",
        config.url,
        config.base_delay,
        config.max_delay,
        config.max_reconnect_attempts,
        config.recovery_interval,
    );

    let client = reqwest::Client::builder()
        .build()
        .expect("reqwest client with default TLS config");

    let supervisor = Supervisor::new(config, client, FrameWriter::new());
    let stdin = LineReader::new();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(wait_for_shutdown_signal(shutdown_tx));

    supervisor.run(stdin, shutdown_rx).await;
    Ok(())
}

/// Waits for SIGINT or SIGTERM (Unix) and signals the supervisor to begin
/// its graceful shutdown sequence (spec §5/§6).
async fn wait_for_shutdown_signal(tx: oneshot::Sender<()>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("[mcpgate] failed to install SIGTERM handler: {e}");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    let _ = tx.send(());
}

/// Stderr-only structured logging, `RUST_LOG`-tunable, defaulting to
/// `mcpgate=debug` per the always-on debug logging contract (spec §4.1).
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mcpgate=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
