//! C2: frame egress (spec §4.2).
//!
//! Concatenates PCM chunks popped from `outQ` into an internal buffer and
//! hands the transport layer exactly one `FRAME_BYTES`-sized frame at a
//! time, paced ~15ms apart (real-time playback rate) so the callee receives
//! a steady stream of fixed-size frames rather than whatever chunk size C6
//! happened to produce. Drops the buffered-but-unsent remainder and purges
//! `outQ` the instant `user_barge_in` latches, and exits without flushing on
//! `system_shutdown`.
//!
//! Grounded in `gglib-axum/src/handlers/voice_ws.rs`'s egress task (drain
//! sink channel, binary WS frame per tick) and `src/ws_audio.rs`'s channel
//! pattern.

use std::time::Duration;

use async_trait::async_trait;

use crate::frame::FRAME_BYTES;
use crate::queue::BoundedQueue;
use crate::sync::EventMesh;

/// Real-time pacing interval for one 640-byte (20ms @ 16kHz) frame.
pub const FRAME_PACING: Duration = Duration::from_millis(15);

/// The transport-side half of the egress loop: anything that can accept one
/// outbound frame at a time. `dialvox-axum` implements this over a split
/// WebSocket sender; tests implement it over an in-memory `Vec`.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one frame. `Err` means the transport is gone; the stage exits.
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), ()>;
}

pub struct FrameEgress {
    out_q: BoundedQueue<Vec<u8>>,
    events: EventMesh,
}

impl FrameEgress {
    #[must_use]
    pub fn new(out_q: BoundedQueue<Vec<u8>>, events: EventMesh) -> Self {
        Self { out_q, events }
    }

    /// Run until shutdown, concatenating PCM popped off `outQ` into an
    /// internal buffer and forwarding exactly one `FRAME_BYTES`-sized frame
    /// to `sink` at a time, per spec §4.2.
    pub async fn run(&self, sink: &mut dyn FrameSink) {
        let mut buffer: Vec<u8> = Vec::with_capacity(FRAME_BYTES * 2);

        loop {
            if self.events.system_shutdown.is_set() {
                tracing::debug!("egress: shutdown observed, exiting without flush");
                return;
            }

            if self.events.user_barge_in.is_set() {
                buffer.clear();
                self.out_q.purge();
            }

            if buffer.len() < FRAME_BYTES {
                match self.out_q.pop_timeout(Duration::from_millis(100)).await {
                    Some(chunk) => buffer.extend_from_slice(&chunk),
                    None => continue,
                }
            }

            while buffer.len() >= FRAME_BYTES {
                if self.events.user_barge_in.is_set() {
                    buffer.clear();
                    self.out_q.purge();
                    break;
                }

                let frame: Vec<u8> = buffer.drain(..FRAME_BYTES).collect();
                if sink.send_frame(frame).await.is_err() {
                    tracing::warn!("egress: transport closed, exiting");
                    return;
                }
                tokio::time::sleep(FRAME_PACING).await;
            }
        }
    }
}
