//! Telephony call-control webhooks (spec §6 "Telephony webhook endpoints").
//!
//! `GET /webhooks/answer` tells the telephony provider to play a brief
//! greeting, then connect the call's media to `/socket`. `GET|POST
//! /webhooks/events` just acknowledges whatever event callbacks the
//! provider sends.
//!
//! Payload shape follows the minimal call-control array convention recorded
//! in the design notes (`[{"action":"talk",...}, {"action":"connect",...}]`).

use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};

use crate::state::AppState;

/// `GET /webhooks/answer`.
pub async fn answer(State(state): State<AppState>) -> Json<Value> {
    let greeting = state.config.effective_system_prompt();
    let ws_url = format!("{}/socket", state.ws_base_url);

    Json(json!([
        { "action": "talk", "text": greeting },
        { "action": "connect", "endpoint": ws_url },
    ]))
}

/// `GET|POST /webhooks/events`. Event payload contents are not
/// interpreted; this just logs and acknowledges.
pub async fn events(body: Option<Json<Value>>) -> axum::http::StatusCode {
    if let Some(Json(event)) = body {
        tracing::debug!(?event, "telephony event callback");
    }
    axum::http::StatusCode::OK
}
