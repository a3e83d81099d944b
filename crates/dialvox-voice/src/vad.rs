//! C3: voice-activity detection stage (spec §4.3).
//!
//! Consumes raw frames from `inQ`, accumulates 512-sample windows, scores
//! each window with an injected [`VadModel`], and drives `user_barge_in`/
//! `silence_detected` off two run-length counters (`MIN_SPEECH_WINDOWS`,
//! `MIN_SILENCE_WINDOWS`): reaching the speech run-length sets
//! `user_barge_in` and clears `silence_detected` (this fires on every
//! speech onset, whether that's the start of a new turn during LISTENING or
//! an interruption during THINKING/SPEAKING -- the controller and C5/C6
//! distinguish the two by what state they're in when it latches); reaching
//! the silence run-length sets `silence_detected` and clears
//! `user_barge_in`. Scored windows are pushed to `vadQ` for the recognizer
//! stage to consume.
//!
//! Grounded in `gglib-voice/src/vad.rs`'s role in the teacher's pipeline
//! (rolling-buffer windowing feeding a probability model) generalized from a
//! local ONNX model to an injectable trait so tests can supply a
//! deterministic stub.

use std::sync::Arc;

use async_trait::async_trait;

use crate::frame::{AudioFrame, VadWindow, WindowAccumulator};
use crate::queue::BoundedQueue;
use crate::sync::EventMesh;

/// A speech/non-speech probability model: a pure function from one 512
/// sample window to a `[0, 1]` score. Implementations may be a simple energy
/// heuristic or a neural model; the stage itself is agnostic.
#[async_trait]
pub trait VadModel: Send + Sync {
    async fn score(&self, window: &VadWindow) -> f32;
}

/// Energy-based default: root-mean-square of the normalized window, good
/// enough as a fallback when no neural model is configured.
pub struct EnergyVadModel;

#[async_trait]
impl VadModel for EnergyVadModel {
    async fn score(&self, window: &VadWindow) -> f32 {
        let samples = window.as_normalized_f32();
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        let rms = (sum_sq / samples.len() as f32).sqrt();
        (rms * 6.0).min(1.0)
    }
}

/// Tunable thresholds for the speech/silence run-length state machine,
/// sourced from [`crate`]'s caller (ultimately `dialvox-core::PipelineConfig`).
#[derive(Debug, Clone, Copy)]
pub struct VadThresholds {
    pub speech_threshold: f32,
    pub min_speech_windows: u32,
    pub min_silence_windows: u32,
}

pub struct VadStage {
    model: Arc<dyn VadModel>,
    thresholds: VadThresholds,
    in_q: BoundedQueue<AudioFrame>,
    vad_q: BoundedQueue<VadWindow>,
    events: EventMesh,
}

impl VadStage {
    #[must_use]
    pub fn new(
        model: Arc<dyn VadModel>,
        thresholds: VadThresholds,
        in_q: BoundedQueue<AudioFrame>,
        vad_q: BoundedQueue<VadWindow>,
        events: EventMesh,
    ) -> Self {
        Self {
            model,
            thresholds,
            in_q,
            vad_q,
            events,
        }
    }

    /// Run until `system_shutdown` is set. One iteration: drain frames,
    /// extract windows, score each, advance the run-length counters.
    pub async fn run(&self) {
        let mut accumulator = WindowAccumulator::new();
        let mut speech_run = 0u32;
        let mut silence_run = 0u32;
        let mut in_speech = false;

        loop {
            if self.events.system_shutdown.is_set() {
                tracing::debug!("vad stage: shutdown observed, exiting");
                return;
            }

            let frame = match self
                .in_q
                .pop_timeout(std::time::Duration::from_millis(100))
                .await
            {
                Some(frame) => frame,
                None => continue,
            };

            accumulator.push_frame(&frame);
            for window in accumulator.drain_windows() {
                let score = self.model.score(&window).await;
                let is_speech = score >= self.thresholds.speech_threshold;

                if is_speech {
                    speech_run += 1;
                    silence_run = 0;
                } else {
                    silence_run += 1;
                    speech_run = 0;
                }

                if !in_speech && speech_run >= self.thresholds.min_speech_windows {
                    in_speech = true;
                    self.events.user_barge_in.set();
                    self.events.silence_detected.clear();
                    tracing::debug!("vad: speech run-length threshold reached, user_barge_in set");
                }
                if in_speech && silence_run >= self.thresholds.min_silence_windows {
                    in_speech = false;
                    self.events.silence_detected.set();
                    self.events.user_barge_in.clear();
                    speech_run = 0;
                    silence_run = 0;
                    tracing::debug!("vad: silence run-length threshold reached, user_barge_in cleared");
                }

                if in_speech {
                    self.vad_q.push(window);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVadModel(f32);

    #[async_trait]
    impl VadModel for FixedVadModel {
        async fn score(&self, _window: &VadWindow) -> f32 {
            self.0
        }
    }

    fn thresholds() -> VadThresholds {
        VadThresholds {
            speech_threshold: 0.5,
            min_speech_windows: 2,
            min_silence_windows: 2,
        }
    }

    fn silent_frame(samples: usize) -> AudioFrame {
        AudioFrame {
            samples: vec![0i16; samples],
        }
    }

    #[tokio::test]
    async fn user_barge_in_latches_after_min_run_length() {
        let events = EventMesh::new();
        let in_q = BoundedQueue::new("inQ", 64);
        let vad_q = BoundedQueue::new("vadQ", 64);
        let stage = VadStage::new(
            Arc::new(FixedVadModel(0.9)),
            thresholds(),
            in_q.clone(),
            vad_q.clone(),
            events.clone(),
        );

        events.silence_detected.set();
        let handle = tokio::spawn(async move { stage.run().await });

        // 3 windows' worth of "speech" samples; min_speech_windows = 2.
        in_q.push(silent_frame(512 * 3));
        events.user_barge_in.wait_set_timeout(std::time::Duration::from_millis(500)).await;
        assert!(events.user_barge_in.is_set());
        assert!(!events.silence_detected.is_set());

        events.system_shutdown.set();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn stays_quiet_below_threshold() {
        let events = EventMesh::new();
        let in_q = BoundedQueue::new("inQ", 64);
        let vad_q = BoundedQueue::new("vadQ", 64);
        let stage = VadStage::new(
            Arc::new(FixedVadModel(0.1)),
            thresholds(),
            in_q.clone(),
            vad_q.clone(),
            events.clone(),
        );

        let handle = tokio::spawn(async move { stage.run().await });
        in_q.push(silent_frame(512 * 3));
        let woke = events
            .user_barge_in
            .wait_set_timeout(std::time::Duration::from_millis(150))
            .await;
        assert!(!woke);
        assert!(vad_q.is_empty());

        events.system_shutdown.set();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }

    #[test]
    fn energy_model_scores_silence_low_and_loud_high() {
        let quiet = VadWindow::from_slice(&[0i16; 512]);
        let loud = VadWindow::from_slice(&[i16::MAX; 512]);
        let model = EnergyVadModel;
        let rt = tokio::runtime::Runtime::new().unwrap();
        let quiet_score = rt.block_on(model.score(&quiet));
        let loud_score = rt.block_on(model.score(&loud));
        assert!(quiet_score < loud_score);
    }
}
