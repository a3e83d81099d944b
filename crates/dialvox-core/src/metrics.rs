//! Per-call metrics bookkeeping.
//!
//! The collector these counters feed into is an external concern (out of
//! scope per spec §1); `CallMetrics` just accumulates the checkpoints C5/C6
//! are required to record, emitting them as `tracing` fields so any
//! downstream collector can scrape the logs.

use std::time::{Duration, Instant};

/// Counters and latency checkpoints for a single call.
#[derive(Debug)]
pub struct CallMetrics {
    started_at: Instant,
    turns_completed: u32,
    barge_ins: u32,
    time_to_first_token: Option<Duration>,
    time_to_first_audio: Option<Duration>,
    warm_up_completed_at: Option<Instant>,
}

impl CallMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            turns_completed: 0,
            barge_ins: 0,
            time_to_first_token: None,
            time_to_first_audio: None,
            warm_up_completed_at: None,
        }
    }

    pub fn record_turn_completed(&mut self) {
        self.turns_completed += 1;
        tracing::info!(turns_completed = self.turns_completed, "turn completed");
    }

    pub fn record_barge_in(&mut self) {
        self.barge_ins += 1;
        tracing::info!(barge_ins = self.barge_ins, "barge-in");
    }

    /// Record time-to-first-token if this is the first LLM chunk of the turn.
    pub fn record_first_token(&mut self, turn_started_at: Instant) {
        if self.time_to_first_token.is_none() {
            let elapsed = turn_started_at.elapsed();
            tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "time to first token");
            self.time_to_first_token = Some(elapsed);
        }
    }

    /// Record time-to-first-audio if this is the first synthesized chunk of the turn.
    pub fn record_first_audio(&mut self, turn_started_at: Instant) {
        if self.time_to_first_audio.is_none() {
            let elapsed = turn_started_at.elapsed();
            tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "time to first audio");
            self.time_to_first_audio = Some(elapsed);
        }
    }

    pub fn record_warm_up_completed(&mut self) {
        self.warm_up_completed_at = Some(Instant::now());
    }

    /// Reset the per-turn checkpoints (first-token/first-audio), called at
    /// the start of each new user turn.
    pub fn reset_turn_checkpoints(&mut self) {
        self.time_to_first_token = None;
        self.time_to_first_audio = None;
    }

    #[must_use]
    pub fn turns_completed(&self) -> u32 {
        self.turns_completed
    }

    #[must_use]
    pub fn barge_ins(&self) -> u32 {
        self.barge_ins
    }

    #[must_use]
    pub fn call_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[must_use]
    pub fn warm_up_completed_at(&self) -> Option<Instant> {
        self.warm_up_completed_at
    }

    pub fn log_summary(&self) {
        tracing::info!(
            turns_completed = self.turns_completed,
            barge_ins = self.barge_ins,
            call_duration_ms = self.call_duration().as_millis() as u64,
            "call ended"
        );
    }
}

impl Default for CallMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = CallMetrics::new();
        assert_eq!(m.turns_completed(), 0);
        assert_eq!(m.barge_ins(), 0);
    }

    #[test]
    fn record_turn_and_barge_in_increments() {
        let mut m = CallMetrics::new();
        m.record_turn_completed();
        m.record_turn_completed();
        m.record_barge_in();
        assert_eq!(m.turns_completed(), 2);
        assert_eq!(m.barge_ins(), 1);
    }

    #[test]
    fn first_token_only_recorded_once_per_turn() {
        let mut m = CallMetrics::new();
        let start = Instant::now();
        m.record_first_token(start);
        assert!(m.time_to_first_token.is_some());
        let first = m.time_to_first_token;
        std::thread::sleep(Duration::from_millis(5));
        m.record_first_token(start);
        assert_eq!(m.time_to_first_token, first);
    }
}
