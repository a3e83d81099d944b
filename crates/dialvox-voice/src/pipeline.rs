//! Wiring layer: builds the queues and event mesh, spawns the C1-C7 stage
//! tasks, and exposes the narrow surface `dialvox-axum`'s WebSocket handler
//! drives (spec §2 "System overview" -- the transport layer never touches
//! stage internals directly).
//!
//! Grounded in `gglib-axum/src/handlers/voice_ws.rs`'s split between a
//! connection handler and the background service it talks to, and
//! `gglib-voice/src/service.rs`'s role as the facade over the pipeline.

use std::sync::Arc;

use parking_lot::Mutex;

use dialvox_core::{CallMetrics, ConversationContext, PipelineConfig};

use crate::controller::{Controller, TurnState};
use crate::egress::{FrameEgress, FrameSink};
use crate::frame::AudioFrame;
use crate::ingress::{FrameIngress, IngressEvent};
use crate::llm::LlmClient;
use crate::recognizer::Recognizer;
use crate::synthesizer::Synthesizer;
use crate::sync::EventMesh;
use crate::vad::{VadModel, VadStage, VadThresholds};

const QUEUE_CAPACITY: usize = 256;

/// The set of injected collaborators a call needs. Built by `dialvox-axum`
/// from `PipelineConfig` for production use, or supplied as deterministic
/// stubs in tests.
pub struct Collaborators {
    pub vad_model: Arc<dyn VadModel>,
    pub recognizer: Arc<dyn Recognizer>,
    pub llm_client: Arc<dyn LlmClient>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// One call's running pipeline: the spawned stage tasks plus the handle the
/// transport layer uses to feed audio in and read state back out.
pub struct CallPipeline {
    ingress: Mutex<FrameIngress>,
    egress: FrameEgress,
    events: EventMesh,
    stage_handles: Vec<tokio::task::JoinHandle<()>>,
    controller_handle: tokio::task::JoinHandle<CallMetrics>,
}

/// Shared handle a transport task can clone freely to feed audio frames
/// while another task drains outbound ones.
pub struct PipelineHandle {
    pipeline: Arc<CallPipeline>,
}

impl CallPipeline {
    /// Build the queues and event mesh, spawn all stage tasks, and return a
    /// handle. The warm-up turn is synthesized immediately so the greeting
    /// is already queued by the time the transport starts forwarding audio.
    #[must_use]
    pub fn start(config: &PipelineConfig, collaborators: Collaborators) -> PipelineHandle {
        let events = EventMesh::new();

        let in_q: crate::queue::BoundedQueue<AudioFrame> = crate::queue::BoundedQueue::new("inQ", QUEUE_CAPACITY);
        let vad_q = crate::queue::BoundedQueue::new("vadQ", QUEUE_CAPACITY);
        let stt_q = crate::queue::BoundedQueue::new("sttQ", 16);
        let llm_q = crate::queue::BoundedQueue::new("llmQ", 64);
        let out_q = crate::queue::BoundedQueue::new("outQ", QUEUE_CAPACITY);

        let thresholds = VadThresholds {
            speech_threshold: config.effective_speech_threshold(),
            min_speech_windows: config.effective_min_speech_windows(),
            min_silence_windows: config.effective_min_silence_windows(),
        };

        let vad_stage = VadStage::new(
            Arc::clone(&collaborators.vad_model),
            thresholds,
            in_q.clone(),
            vad_q.clone(),
            events.clone(),
        );
        let recognizer_stage = crate::recognizer::RecognizerStage::new(
            Arc::clone(&collaborators.recognizer),
            vad_q.clone(),
            stt_q.clone(),
            events.clone(),
        );
        let llm_stage = crate::llm::LlmStage::new(
            Arc::clone(&collaborators.llm_client),
            stt_q.clone(),
            llm_q.clone(),
            events.clone(),
            config.effective_system_prompt().to_string(),
        );
        let synthesizer_stage = crate::synthesizer::SynthesizerStage::new(
            Arc::clone(&collaborators.synthesizer),
            llm_q.clone(),
            out_q.clone(),
            events.clone(),
        );

        let mut stage_handles = Vec::new();
        stage_handles.push(tokio::spawn(async move { vad_stage.run().await }));
        stage_handles.push(tokio::spawn(async move { recognizer_stage.run().await }));
        stage_handles.push(tokio::spawn(async move { synthesizer_stage.run().await }));

        stage_handles.push(tokio::spawn(async move {
            let mut context = ConversationContext::new();
            llm_stage.run(&mut context).await;
        }));

        let controller_events = events.clone();
        let controller_stt_q = stt_q.clone();
        let controller_llm_q = llm_q.clone();
        let controller_out_q = out_q.clone();
        let controller_handle = tokio::spawn(async move {
            let mut controller = Controller::new(
                controller_events.clone(),
                controller_stt_q,
                controller_llm_q,
                controller_out_q,
            );
            let mut metrics = CallMetrics::new();

            controller.run_warm_up(&mut metrics).await;
            while controller.state() != TurnState::Teardown {
                if controller_events.system_shutdown.is_set() {
                    break;
                }
                controller.run_turn(&mut metrics).await;
            }
            controller.stop().await;
            metrics.log_summary();
            metrics
        });

        let ingress = Mutex::new(FrameIngress::new(in_q, events.clone()));
        let egress = FrameEgress::new(out_q, events.clone());

        let pipeline = Arc::new(Self {
            ingress,
            egress,
            events,
            stage_handles,
            controller_handle,
        });

        PipelineHandle { pipeline }
    }
}

impl PipelineHandle {
    /// Feed one inbound transport event (audio bytes or socket-closed) to
    /// ingress. Returns `false` once the caller should stop driving it.
    pub fn feed(&self, event: IngressEvent) -> bool {
        self.pipeline.ingress.lock().on_event(event)
    }

    /// Drive the egress loop, forwarding each outbound frame to `sink`.
    /// Returns once shutdown is observed or the sink reports the transport
    /// died.
    pub async fn drain_outbound(&self, sink: &mut dyn FrameSink) {
        self.pipeline.egress.run(sink).await;
    }

    #[must_use]
    pub fn events(&self) -> EventMesh {
        self.pipeline.events.clone()
    }

    /// Signal the caller hung up or the transport otherwise ended; tears
    /// the call down and waits (up to the controller's join deadline) for
    /// every stage task to stop.
    pub async fn shutdown(self) {
        self.pipeline.events.system_shutdown.set();
        if let Ok(pipeline) = Arc::try_unwrap(self.pipeline) {
            for handle in pipeline.stage_handles {
                let _ = tokio::time::timeout(std::time::Duration::from_secs(2), handle).await;
            }
            let _ = tokio::time::timeout(std::time::Duration::from_secs(2), pipeline.controller_handle).await;
        }
    }
}

impl Clone for PipelineHandle {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::VadWindow;
    use crate::llm::TokenStream;
    use crate::recognizer::RecognizerSession;
    use async_trait::async_trait;

    struct AlwaysSpeechVad;
    #[async_trait]
    impl VadModel for AlwaysSpeechVad {
        async fn score(&self, _window: &VadWindow) -> f32 {
            1.0
        }
    }

    struct StubRecognizer;
    #[async_trait]
    impl Recognizer for StubRecognizer {
        async fn open(&self) -> Result<Box<dyn RecognizerSession>, crate::error::VoiceError> {
            Ok(Box::new(StubSession))
        }
    }
    struct StubSession;
    #[async_trait]
    impl RecognizerSession for StubSession {
        async fn push(&mut self, _window: &VadWindow) -> Result<(), crate::error::VoiceError> {
            Ok(())
        }
        async fn finalize(&mut self) -> Result<String, crate::error::VoiceError> {
            Ok("hello".to_string())
        }
    }

    struct StubLlm;
    #[async_trait]
    impl LlmClient for StubLlm {
        async fn stream_reply(
            &self,
            _context: &ConversationContext,
            _system_prompt: &str,
        ) -> Result<Box<dyn TokenStream>, crate::error::VoiceError> {
            Ok(Box::new(StubTokenStream { done: false }))
        }
    }
    struct StubTokenStream {
        done: bool,
    }
    #[async_trait]
    impl TokenStream for StubTokenStream {
        async fn next_delta(&mut self) -> Result<Option<String>, crate::error::VoiceError> {
            if self.done {
                Ok(None)
            } else {
                self.done = true;
                Ok(Some("hi.".to_string()))
            }
        }
    }

    struct StubSynthesizer;
    #[async_trait]
    impl Synthesizer for StubSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, crate::error::VoiceError> {
            Ok(vec![0u8; 8])
        }
    }

    #[tokio::test]
    async fn pipeline_starts_and_shuts_down_cleanly() {
        let config = PipelineConfig::with_defaults();
        let collaborators = Collaborators {
            vad_model: Arc::new(AlwaysSpeechVad),
            recognizer: Arc::new(StubRecognizer),
            llm_client: Arc::new(StubLlm),
            synthesizer: Arc::new(StubSynthesizer),
        };
        let handle = CallPipeline::start(&config, collaborators);

        let events = handle.events();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.shutdown().await;
        assert!(events.system_shutdown.is_set());
    }
}
