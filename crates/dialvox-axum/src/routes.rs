//! Router assembly (spec §6 "External interfaces", §6.1 "Process entry
//! point and health").
//!
//! Grounded in `gglib-axum/src/routes.rs`'s builder-pattern router and CORS
//! layer construction, trimmed to this service's three endpoints.

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{webhooks, ws};

async fn health() -> &'static str {
    "OK"
}

#[must_use]
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/socket", get(ws::socket))
        .route("/webhooks/answer", get(webhooks::answer))
        .route("/webhooks/events", get(webhooks::events).post(webhooks::events))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
