// =============================================================================
// ta-panel — Main Entry Point
// =============================================================================
//
// Loads `.env` and the JSON config, wires the Yahoo chart provider into the
// cached loader and serves the REST API until Ctrl-C.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ta_panel::api;
use ta_panel::app_state::AppState;
use ta_panel::runtime_config::{PanelConfig, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use ta_panel::yahoo::YahooChartClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "ta-panel starting up");

    let config_path =
        std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = PanelConfig::load_or_default(&config_path)?;
    config.apply_env_overrides();

    // ── 2. Provider & shared state ───────────────────────────────────────
    let provider = YahooChartClient::new(
        &config.provider.base_url,
        &config.provider.user_agent,
        config.request_timeout(),
    )
    .context("failed to build market-data HTTP client")?;
    info!(base_url = %config.provider.base_url, "market-data provider ready");

    let bind_addr = config.listen_addr.clone();
    let state = Arc::new(AppState::new(config, Arc::new(provider)));

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, shutting down");
        })
        .await
        .context("API server failed")?;

    info!("ta-panel stopped");
    Ok(())
}
