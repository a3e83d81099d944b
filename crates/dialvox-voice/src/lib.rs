//! The concurrent pipeline orchestrator: VAD, STT, LLM, TTS stages coupled
//! by bounded purge-able queues and a turn-taking controller.
//!
//! This crate never touches the WebSocket directly — `dialvox-axum` owns the
//! socket and feeds raw bytes in through [`ingress::FrameIngress`] /
//! [`egress::FrameEgress`]. Everything in between is transport-agnostic so
//! it can be exercised by tests without a network.

pub mod controller;
pub mod egress;
pub mod error;
pub mod frame;
pub mod ingress;
pub mod llm;
pub mod pipeline;
pub mod queue;
pub mod recognizer;
pub mod synthesizer;
pub mod sync;
pub mod vad;

pub use controller::TurnState;
pub use error::VoiceError;
pub use pipeline::{CallPipeline, PipelineHandle};
