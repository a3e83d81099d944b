//! C1: frame ingress (spec §4.1).
//!
//! Accepts raw binary frames handed in by the transport layer
//! (`dialvox-axum`'s WebSocket receive loop) and enqueues them onto `inQ`
//! verbatim. The first inbound message is a telephony handshake, not audio,
//! and is skipped. Exits when `system_shutdown` latches or the transport
//! signals the socket closed.
//!
//! Grounded in `gglib-axum/src/handlers/voice_ws.rs`'s ingest task: decode
//! PCM16LE, validate even-length frames, forward downstream.

use crate::frame::AudioFrame;
use crate::queue::BoundedQueue;
use crate::sync::EventMesh;

/// One inbound unit: either a raw audio frame or a signal that the
/// transport closed the socket.
pub enum IngressEvent {
    Audio(Vec<u8>),
    SocketClosed,
}

pub struct FrameIngress {
    in_q: BoundedQueue<AudioFrame>,
    events: EventMesh,
    handshake_skipped: bool,
}

impl FrameIngress {
    #[must_use]
    pub fn new(in_q: BoundedQueue<AudioFrame>, events: EventMesh) -> Self {
        Self {
            in_q,
            events,
            handshake_skipped: false,
        }
    }

    /// Feed one inbound transport event. Returns `false` once the stage
    /// should stop being driven (socket closed or shutdown observed).
    pub fn on_event(&mut self, event: IngressEvent) -> bool {
        if self.events.system_shutdown.is_set() {
            return false;
        }

        match event {
            IngressEvent::SocketClosed => {
                tracing::debug!("ingress: socket closed");
                false
            }
            IngressEvent::Audio(bytes) => {
                if !self.handshake_skipped {
                    self.handshake_skipped = true;
                    tracing::debug!("ingress: skipped handshake message");
                    return true;
                }
                if bytes.len() % 2 != 0 {
                    tracing::warn!(len = bytes.len(), "ingress: dropping malformed odd-length frame");
                    return true;
                }
                self.in_q.push(AudioFrame::from_le_bytes(&bytes));
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_first_message_as_handshake() {
        let events = EventMesh::new();
        let in_q = BoundedQueue::new("inQ", 4);
        let mut ingress = FrameIngress::new(in_q.clone(), events);

        assert!(ingress.on_event(IngressEvent::Audio(vec![0u8; 8])));
        assert!(in_q.is_empty());

        assert!(ingress.on_event(IngressEvent::Audio(vec![1, 0, 2, 0])));
        assert_eq!(in_q.len(), 1);
    }

    #[test]
    fn drops_odd_length_frames() {
        let events = EventMesh::new();
        let in_q = BoundedQueue::new("inQ", 4);
        let mut ingress = FrameIngress::new(in_q.clone(), events);
        ingress.on_event(IngressEvent::Audio(vec![])); // handshake
        assert!(ingress.on_event(IngressEvent::Audio(vec![1, 2, 3])));
        assert!(in_q.is_empty());
    }

    #[test]
    fn socket_closed_stops_driving() {
        let events = EventMesh::new();
        let in_q = BoundedQueue::new("inQ", 4);
        let mut ingress = FrameIngress::new(in_q, events);
        assert!(!ingress.on_event(IngressEvent::SocketClosed));
    }

    #[test]
    fn shutdown_stops_driving() {
        let events = EventMesh::new();
        events.system_shutdown.set();
        let in_q = BoundedQueue::new("inQ", 4);
        let mut ingress = FrameIngress::new(in_q, events);
        assert!(!ingress.on_event(IngressEvent::Audio(vec![1, 2])));
    }
}
