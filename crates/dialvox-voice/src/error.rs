//! Stage error taxonomy (spec §7 "Error handling design").
//!
//! Every stage boundary returns this enum rather than a bare `String` or
//! `anyhow::Error`, so the controller can dispatch on the *kind* of failure
//! (transient upstream vs. protocol vs. fatal) instead of matching text.

use thiserror::Error;

/// Errors produced by the VAD/STT/LLM/TTS stages and the controller.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// (a) Transient upstream: recognizer/LLM/synthesizer throttling or a
    /// transport hiccup. The enclosing turn is abandoned; state returns to
    /// `LISTENING`.
    #[error("transient upstream error from {collaborator}: {message}")]
    TransientUpstream {
        collaborator: &'static str,
        message: String,
    },

    /// (b) Protocol: malformed incoming frame or unexpected handshake.
    /// Logged and dropped; does not abandon the turn.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// (c) Resource exhaustion: a bounded queue was full. The oldest item
    /// was dropped; this is carried as a warning, not a failure.
    #[error("queue '{queue}' full, dropped oldest item")]
    ResourceExhausted { queue: &'static str },

    /// (d) Fatal: unable to open any stream after retries, or the socket
    /// closed unexpectedly. Triggers `system_shutdown`.
    #[error("fatal pipeline error: {0}")]
    Fatal(String),

    /// IO error bubbled up from the WebSocket transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Whether this error should abandon the in-flight turn and return the
    /// controller to `LISTENING`, per §7(a).
    #[must_use]
    pub fn is_lost_turn(&self) -> bool {
        matches!(self, Self::TransientUpstream { .. })
    }

    /// Whether this error should trigger `system_shutdown`, per §7(d).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Io(_))
    }
}
