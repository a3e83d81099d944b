//! Process entry point: load configuration, initialize structured logging,
//! bind the listener, serve (spec §2.1 "Ambient stack", §6.1 "Process entry
//! point and health").

use std::path::PathBuf;

use dialvox_axum::state::AppContext;
use dialvox_core::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("DIALVOX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("dialvox.toml"));
    let config = PipelineConfig::load(&config_path)?;

    let ws_base_url = std::env::var("DIALVOX_WS_BASE_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080".to_string());
    let state = AppContext::new(config, ws_base_url);

    let bind_addr = std::env::var("DIALVOX_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "dialvox server listening");

    let app = dialvox_axum::routes::build_router(state);
    axum::serve(listener, app).await?;

    Ok(())
}
