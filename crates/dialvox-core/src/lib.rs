//! Domain types shared by the voice pipeline and its HTTP adapter.
//!
//! This crate has no dependency on tokio's networking stack or on any
//! particular STT/LLM/TTS provider — it holds the conversation model,
//! configuration shapes, the error taxonomy for configuration/validation
//! failures, and per-call metrics bookkeeping.

pub mod config;
pub mod conversation;
pub mod error;
pub mod metrics;

pub use config::PipelineConfig;
pub use conversation::{ConversationContext, Role, Turn};
pub use error::CoreError;
pub use metrics::CallMetrics;
