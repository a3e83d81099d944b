//! Shared application state (spec §6 "External interfaces").
//!
//! Grounded in `gglib-axum/src/state.rs`'s `AppState = Arc<AxumContext>`
//! pattern: handlers take `State<AppState>` and never reach for globals.

use std::sync::Arc;

use dialvox_core::PipelineConfig;

/// Everything a handler needs beyond the request itself.
pub struct AppContext {
    pub config: PipelineConfig,
    pub http_client: reqwest::Client,
    /// Base WebSocket URL (`wss://host/socket`) handed back in the
    /// call-control webhook response, per spec §9.1.
    pub ws_base_url: String,
}

pub type AppState = Arc<AppContext>;

impl AppContext {
    #[must_use]
    pub fn new(config: PipelineConfig, ws_base_url: String) -> AppState {
        Arc::new(Self {
            config,
            http_client: reqwest::Client::new(),
            ws_base_url,
        })
    }
}
