pub mod agent;
pub mod gateway;
pub mod http;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;

pub use agent::{AgentError, GatewayClient};
pub use gateway::{Gateway, GatewayError};

/// Initialize the tracing subscriber — structured logs on stderr.
///
/// Filter comes from `RUST_LOG` when set, otherwise gateway logs at info and
/// everything else at warn.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_gateway=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    // Startup banner — makes it easy to correlate a log with a process
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "=== mcp-gateway starting ==="
    );
}

/// Run the gateway: load config, start providers, serve HTTP until a
/// shutdown signal arrives, then terminate the providers.
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing FIRST — before any tracing::info!() calls
    init_tracing();

    let config_path = gateway::config::config_path();
    let configs = gateway::config::load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let port = gateway::config::listen_port()?;

    run_with(configs, port).await
}

/// Start the providers, serve until the listener stops, then terminate the
/// providers. The shutdown leg runs whether serving ended cleanly or failed
/// (a taken port, for instance), so spawned process groups never outlive
/// the gateway.
async fn run_with(
    configs: BTreeMap<String, gateway::ProviderConfig>,
    port: u16,
) -> anyhow::Result<()> {
    let gateway = Arc::new(Gateway::start(configs).await?);

    // Returns once the shutdown signal resolves and connections drain
    let served = http::serve(Arc::clone(&gateway), port).await;
    gateway.shutdown().await;
    served.context("http server failed")?;

    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
