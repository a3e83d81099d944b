//! Configuration- and domain-level error taxonomy.
//!
//! Stage-level errors (transient upstream, protocol, resource exhaustion,
//! fatal) live in `dialvox-voice::error::VoiceError`; this enum covers the
//! narrower set of failures that can occur while building a `PipelineConfig`
//! or mutating a `ConversationContext`.

use thiserror::Error;

/// Errors surfaced by the core domain crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required configuration value was missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A value failed validation (e.g. speech threshold out of range).
    #[error("validation error: {0}")]
    Validation(String),
}
