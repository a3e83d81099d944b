//! Latching and sticky event primitives (spec §9 "cyclic event dependencies").
//!
//! The pipeline is coordinated through four latching events
//! (`speech_started`, `silence_detected`, `llm_done`, `tts_done`) and two
//! sticky events (`user_barge_in`, `system_shutdown`). Both are modeled as
//! explicit `set`/`clear`/`wait` condition variables rather than polled
//! flags, per the design note: a latching event behaves exactly like a
//! sticky one from the primitive's point of view — the distinction
//! (auto-clearing vs. persistent) is purely in which call sites clear it.
//!
//! Grounded in the `EchoGate` pattern (`Arc<AtomicBool>`, cloned handles
//! share state) generalized with a `tokio::sync::Notify` so `wait()` parks
//! instead of spinning.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// A boolean condition variable: `set`/`clear`/`is_set` plus an async
/// `wait_set`/`wait_cleared` that parks on a `Notify` instead of polling.
///
/// Cloning an `Event` shares the same underlying state (like `EchoGate`).
#[derive(Clone)]
pub struct Event {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
    name: &'static str,
}

impl Event {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            name,
        }
    }

    pub fn set(&self) {
        let was_set = self.flag.swap(true, Ordering::SeqCst);
        if !was_set {
            tracing::debug!(event = self.name, "set");
        }
        self.notify.notify_waiters();
    }

    pub fn clear(&self) {
        let was_set = self.flag.swap(false, Ordering::SeqCst);
        if was_set {
            tracing::debug!(event = self.name, "clear");
        }
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Wait until the event becomes set. Returns immediately if already set.
    pub async fn wait_set(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }

    /// Wait until the event becomes set, or the timeout elapses first.
    /// Returns `true` if the event became set, `false` on timeout.
    pub async fn wait_set_timeout(&self, timeout: std::time::Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_set()).await.is_ok()
    }

    /// Wait until the event becomes (or stays) cleared.
    pub async fn wait_cleared(&self) {
        loop {
            if !self.is_set() {
                return;
            }
            let notified = self.notify.notified();
            if !self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// The full coordination mesh for one call: four latching events plus two
/// sticky events. "Latching" vs. "sticky" is a convention enforced by
/// callers (the controller clears latching events after each transition;
/// `user_barge_in`/`system_shutdown` are cleared only by the controller's
/// explicit reset / never at all for shutdown).
#[derive(Clone)]
pub struct EventMesh {
    pub speech_started: Event,
    pub silence_detected: Event,
    pub transcribe_done: Event,
    pub llm_done: Event,
    pub tts_done: Event,
    pub user_barge_in: Event,
    pub system_shutdown: Event,
}

impl EventMesh {
    #[must_use]
    pub fn new() -> Self {
        Self {
            speech_started: Event::new("speech_started"),
            silence_detected: Event::new("silence_detected"),
            transcribe_done: Event::new("transcribe_done"),
            llm_done: Event::new("llm_done"),
            tts_done: Event::new("tts_done"),
            user_barge_in: Event::new("user_barge_in"),
            system_shutdown: Event::new("system_shutdown"),
        }
    }

    /// Clear the four latching events plus (if set) `user_barge_in`, in the
    /// order spec §4.7 "Event reset" specifies.
    pub fn reset_after_turn(&self) {
        self.silence_detected.clear();
        self.transcribe_done.clear();
        self.llm_done.clear();
        self.tts_done.clear();
        self.user_barge_in.clear();
    }

    /// `stop()`: set every event to unblock any waiter, including the
    /// sticky ones, per spec §4.7 "Lifecycle".
    pub fn set_all(&self) {
        self.speech_started.set();
        self.silence_detected.set();
        self.transcribe_done.set();
        self.llm_done.set();
        self.tts_done.set();
        self.user_barge_in.set();
        self.system_shutdown.set();
    }
}

impl Default for EventMesh {
    fn default() -> Self {
        Self::new()
    }
}
