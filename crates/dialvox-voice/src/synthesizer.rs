//! C6: text-to-speech stage (spec §4.6).
//!
//! Drains text chunks from `llmQ`, requests PCM audio from an injected
//! [`Synthesizer`], and re-chunks the returned PCM into exact
//! [`crate::frame::FRAME_BYTES`]-sized pieces pushed to `outQ`. Rechecks
//! `user_barge_in` before every read; on interruption it sets `tts_done`,
//! purges `outQ`, and stops synthesizing rather than moving on to the next
//! queued chunk, per spec §4.6/I4.
//!
//! Grounded in `gglib-voice/src/tts.rs`'s request/chunk shape, generalized
//! from local Kokoro inference to an HTTP collaborator returning raw PCM.

use async_trait::async_trait;

use crate::error::VoiceError;
use crate::frame::FRAME_BYTES;
use crate::queue::BoundedQueue;
use crate::sync::EventMesh;

/// A text-to-speech collaborator: render one chunk of text to 16kHz mono
/// s16le PCM.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

/// HTTP-based implementation calling a cloud TTS endpoint and expecting raw
/// PCM bytes back (spec §6 "collaborator interfaces").
pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    voice_id: String,
    language: String,
}

impl HttpSynthesizer {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        voice_id: String,
        language: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            voice_id,
            language,
        }
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "text": text,
                "voice_id": self.voice_id,
                "language": self.language,
                "sample_rate": dialvox_core::config::SAMPLE_RATE_HZ,
            }))
            .send()
            .await
            .map_err(|e| VoiceError::TransientUpstream {
                collaborator: "synthesizer",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(VoiceError::TransientUpstream {
                collaborator: "synthesizer",
                message: format!("status {}", response.status()),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| VoiceError::TransientUpstream {
                collaborator: "synthesizer",
                message: e.to_string(),
            })
    }
}

pub struct SynthesizerStage {
    synthesizer: std::sync::Arc<dyn Synthesizer>,
    llm_q: BoundedQueue<String>,
    out_q: BoundedQueue<Vec<u8>>,
    events: EventMesh,
}

impl SynthesizerStage {
    #[must_use]
    pub fn new(
        synthesizer: std::sync::Arc<dyn Synthesizer>,
        llm_q: BoundedQueue<String>,
        out_q: BoundedQueue<Vec<u8>>,
        events: EventMesh,
    ) -> Self {
        Self {
            synthesizer,
            llm_q,
            out_q,
            events,
        }
    }

    /// Run until shutdown: synthesize each queued chunk, push fixed-size
    /// frames to `outQ`, set `tts_done` once `llmQ` drains and `llm_done`
    /// has already latched.
    pub async fn run(&self) {
        loop {
            if self.events.system_shutdown.is_set() {
                tracing::debug!("synthesizer stage: shutdown observed, exiting");
                return;
            }

            let chunk = match self
                .llm_q
                .pop_timeout(std::time::Duration::from_millis(100))
                .await
            {
                Some(chunk) => chunk,
                None => {
                    if self.events.llm_done.is_set() && self.llm_q.is_empty() {
                        self.events.tts_done.set();
                    }
                    continue;
                }
            };

            if self.events.user_barge_in.is_set() {
                self.events.tts_done.set();
                self.out_q.purge();
                continue;
            }

            let pcm = match self.synthesizer.synthesize(&chunk).await {
                Ok(pcm) => pcm,
                Err(e) => {
                    tracing::warn!(error = %e, "synthesizer: request failed, dropping chunk");
                    continue;
                }
            };

            let mut aborted = false;
            for frame in pcm.chunks(FRAME_BYTES) {
                if self.events.system_shutdown.is_set() {
                    return;
                }
                if self.events.user_barge_in.is_set() {
                    aborted = true;
                    break;
                }
                self.out_q.push(frame.to_vec());
            }
            if aborted {
                self.events.tts_done.set();
                self.out_q.purge();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StubSynthesizer;

    #[async_trait]
    impl Synthesizer for StubSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
            Ok(vec![1u8; text.len() * 10])
        }
    }

    #[tokio::test]
    async fn chunks_pcm_into_fixed_size_frames() {
        let events = EventMesh::new();
        let llm_q = BoundedQueue::new("llmQ", 8);
        let out_q = BoundedQueue::new("outQ", 64);
        let stage = SynthesizerStage::new(Arc::new(StubSynthesizer), llm_q.clone(), out_q.clone(), events.clone());
        let handle = tokio::spawn(async move { stage.run().await });

        llm_q.push("x".repeat(100)); // 1000 bytes of PCM

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let mut total = 0;
        while let Some(frame) = out_q.try_pop() {
            assert!(frame.len() <= FRAME_BYTES);
            total += frame.len();
        }
        assert_eq!(total, 1000);

        events.system_shutdown.set();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn sets_tts_done_once_llm_done_and_queue_drained() {
        let events = EventMesh::new();
        let llm_q = BoundedQueue::new("llmQ", 8);
        let out_q = BoundedQueue::new("outQ", 64);
        let stage = SynthesizerStage::new(Arc::new(StubSynthesizer), llm_q.clone(), out_q.clone(), events.clone());
        let handle = tokio::spawn(async move { stage.run().await });

        events.llm_done.set();
        let woke = events
            .tts_done
            .wait_set_timeout(std::time::Duration::from_millis(300))
            .await;
        assert!(woke);

        events.system_shutdown.set();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn barge_in_before_dequeue_sets_tts_done_and_purges_output() {
        let events = EventMesh::new();
        let llm_q = BoundedQueue::new("llmQ", 8);
        let out_q = BoundedQueue::new("outQ", 64);
        let stage = SynthesizerStage::new(Arc::new(StubSynthesizer), llm_q.clone(), out_q.clone(), events.clone());
        llm_q.push("x".repeat(1000)); // 10000 bytes -> many frames
        events.user_barge_in.set();
        let handle = tokio::spawn(async move { stage.run().await });

        let woke = events
            .tts_done
            .wait_set_timeout(std::time::Duration::from_millis(300))
            .await;
        assert!(woke);
        assert!(out_q.is_empty());

        events.system_shutdown.set();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }

    struct SlowSynthesizer;

    #[async_trait]
    impl Synthesizer for SlowSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            Ok(vec![1u8; text.len() * 10])
        }
    }

    #[tokio::test]
    async fn barge_in_during_synthesis_aborts_chunk_and_purges_output() {
        let events = EventMesh::new();
        let llm_q = BoundedQueue::new("llmQ", 8);
        let out_q = BoundedQueue::new("outQ", 64);
        let stage = SynthesizerStage::new(Arc::new(SlowSynthesizer), llm_q.clone(), out_q.clone(), events.clone());
        llm_q.push("x".repeat(1000)); // 10000 bytes -> many frames
        let handle = tokio::spawn(async move { stage.run().await });

        // Interrupt while synthesis is still in flight; the frame loop's
        // first recheck of user_barge_in (once PCM comes back) must abort
        // before any frame reaches outQ.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        events.user_barge_in.set();

        let woke = events
            .tts_done
            .wait_set_timeout(std::time::Duration::from_millis(300))
            .await;
        assert!(woke);
        assert!(out_q.is_empty());

        events.system_shutdown.set();
        let _ = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
    }
}
