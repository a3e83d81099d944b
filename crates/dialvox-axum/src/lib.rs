//! Telephony transport: the `/socket` WebSocket, call-control webhooks, and
//! a `/health` liveness probe, wired over `dialvox-voice`'s pipeline.

pub mod error;
pub mod routes;
pub mod state;
pub mod webhooks;
pub mod ws;

pub use error::HttpError;
pub use state::{AppContext, AppState};
