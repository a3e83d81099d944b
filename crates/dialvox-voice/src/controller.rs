//! C7: turn-taking controller (spec §4.7).
//!
//! Drives the call through `IDLE -> WARMUP -> LISTENING -> THINKING ->
//! SPEAKING -> TEARDOWN`, alternating `LISTENING`/`THINKING`/`SPEAKING` for
//! every subsequent turn. `WARMUP` runs one synthetic turn (a greeting)
//! before the first real caller turn, hidden from the observable
//! conversation context, to amortize cold-start latency on the real
//! collaborators.
//!
//! Grounded in `gglib-voice/src/pipeline.rs`'s state-machine shape,
//! generalized from local-audio turn-taking to the WARMUP/TEARDOWN states
//! and barge-in handling this spec requires.

use std::time::Duration;

use dialvox_core::CallMetrics;

use crate::queue::BoundedQueue;
use crate::sync::EventMesh;

/// Deadline the controller waits for the pipeline's stage tasks to join
/// during `stop()`, per spec §4.7 "Lifecycle".
const STAGE_JOIN_DEADLINE: Duration = Duration::from_secs(1);

/// Fixed warm-up prompt injected directly into `sttQ`, bypassing the
/// recognizer, to pre-warm C5/C6 before any caller audio arrives.
const WARM_UP_PROMPT: &str = "are you ready? respond with yes or no";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    WarmUp,
    Listening,
    Thinking,
    Speaking,
    Teardown,
}

pub struct Controller {
    events: EventMesh,
    state: TurnState,
    stt_q: BoundedQueue<String>,
    llm_q: BoundedQueue<String>,
    out_q: BoundedQueue<Vec<u8>>,
}

impl Controller {
    #[must_use]
    pub fn new(
        events: EventMesh,
        stt_q: BoundedQueue<String>,
        llm_q: BoundedQueue<String>,
        out_q: BoundedQueue<Vec<u8>>,
    ) -> Self {
        Self {
            events,
            state: TurnState::Idle,
            stt_q,
            llm_q,
            out_q,
        }
    }

    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Run the warm-up turn: inject the fixed warm-up prompt directly onto
    /// `sttQ` (skipping the recognizer entirely) and signal `transcribe_done`
    /// so the always-running C5/C6 tasks pre-warm their upstream connections
    /// on a synthetic turn. The resulting text and audio are never observed
    /// by the caller or the conversation context (per spec §9.1's warm-up
    /// design note) -- once C6 signals `tts_done`, the discarded output is
    /// purged from `llmQ`/`outQ` before any real turn begins.
    pub async fn run_warm_up(&mut self, metrics: &mut CallMetrics) {
        self.state = TurnState::WarmUp;
        tracing::info!("controller: entering WARMUP");

        self.stt_q.push(WARM_UP_PROMPT.to_string());
        self.events.transcribe_done.set();

        tokio::select! {
            () = self.events.tts_done.wait_set() => {}
            () = self.events.system_shutdown.wait_set() => {
                self.state = TurnState::Teardown;
                return;
            }
        }

        self.llm_q.purge();
        self.out_q.purge();
        metrics.record_warm_up_completed();
        self.events.reset_after_turn();
        self.state = TurnState::Listening;
        tracing::info!("controller: WARMUP complete, entering LISTENING");
    }

    /// Drive one full LISTENING -> THINKING -> SPEAKING cycle, or transition
    /// to TEARDOWN if shutdown is observed first. The conversation history
    /// itself is accumulated by the LLM stage, which runs independently of
    /// turn-state bookkeeping.
    pub async fn run_turn(&mut self, metrics: &mut CallMetrics) {
        self.state = TurnState::Listening;
        tracing::debug!("controller: LISTENING");

        tokio::select! {
            () = self.events.silence_detected.wait_set() => {}
            () = self.events.system_shutdown.wait_set() => {
                self.state = TurnState::Teardown;
                return;
            }
        }

        self.state = TurnState::Thinking;
        tracing::debug!("controller: THINKING");

        tokio::select! {
            () = self.events.llm_done.wait_set() => {}
            () = self.events.user_barge_in.wait_set() => {
                metrics.record_barge_in();
                self.events.reset_after_turn();
                self.state = TurnState::Listening;
                return;
            }
            () = self.events.system_shutdown.wait_set() => {
                self.state = TurnState::Teardown;
                return;
            }
        }

        self.state = TurnState::Speaking;
        tracing::debug!("controller: SPEAKING");

        tokio::select! {
            () = self.events.tts_done.wait_set() => {
                metrics.record_turn_completed();
            }
            () = self.events.user_barge_in.wait_set() => {
                metrics.record_barge_in();
            }
            () = self.events.system_shutdown.wait_set() => {
                self.state = TurnState::Teardown;
                return;
            }
        }

        self.events.reset_after_turn();
        self.state = TurnState::Listening;
    }

    /// Tear the call down: set every event to unblock any stage waiters,
    /// then give stage tasks `STAGE_JOIN_DEADLINE` to observe shutdown and
    /// exit before the caller moves on.
    pub async fn stop(&mut self) {
        self.state = TurnState::Teardown;
        tracing::info!("controller: TEARDOWN");
        self.events.set_all();
        tokio::time::sleep(STAGE_JOIN_DEADLINE).await;
    }
}
