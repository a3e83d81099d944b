//! C4: speech-to-text stage (spec §4.4).
//!
//! Drains scored windows from `vadQ` and streams them to an injected
//! [`Recognizer`] collaborator. A turn starts once `user_barge_in` latches
//! (the VAD stage's speech-run-length signal -- during LISTENING this marks
//! ordinary turn onset, not an interruption) and is committed when
//! `silence_detected` latches; the committed text is pushed to `sttQ` and
//! `transcribe_done` is set. A turn's windows are consumed at-most-once: on
//! a transient upstream error the stage abandons the in-flight transcript
//! and returns to waiting for the next speech run, per spec §7(a).
//!
//! Grounded in `gglib-voice/src/stt.rs`'s streaming-session shape
//! (open/push/finalize) generalized from a local whisper session to an HTTP
//! streaming collaborator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::VoiceError;
use crate::frame::VadWindow;
use crate::queue::BoundedQueue;
use crate::sync::EventMesh;

/// A streaming speech-to-text session: push audio windows, then finalize to
/// get the committed transcript for the turn.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn open(&self) -> Result<Box<dyn RecognizerSession>, VoiceError>;
}

#[async_trait]
pub trait RecognizerSession: Send {
    async fn push(&mut self, window: &VadWindow) -> Result<(), VoiceError>;
    async fn finalize(&mut self) -> Result<String, VoiceError>;
}

/// HTTP-based recognizer calling a cloud transcription endpoint with
/// accumulated PCM on finalize (spec §6 "collaborator interfaces").
pub struct HttpRecognizer {
    client: Client,
    endpoint: String,
    api_key: String,
    language: String,
}

impl HttpRecognizer {
    #[must_use]
    pub fn new(client: Client, endpoint: String, api_key: String, language: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            language,
        }
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn open(&self) -> Result<Box<dyn RecognizerSession>, VoiceError> {
        Ok(Box::new(HttpRecognizerSession {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            language: self.language.clone(),
            buffer: Vec::new(),
        }))
    }
}

struct HttpRecognizerSession {
    client: Client,
    endpoint: String,
    api_key: String,
    language: String,
    buffer: Vec<i16>,
}

#[async_trait]
impl RecognizerSession for HttpRecognizerSession {
    async fn push(&mut self, window: &VadWindow) -> Result<(), VoiceError> {
        self.buffer.extend_from_slice(&window.samples);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<String, VoiceError> {
        let mut body = Vec::with_capacity(self.buffer.len() * 2);
        for s in &self.buffer {
            body.extend_from_slice(&s.to_le_bytes());
        }
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("language", self.language.as_str())])
            .header("content-type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| VoiceError::TransientUpstream {
                collaborator: "recognizer",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(VoiceError::TransientUpstream {
                collaborator: "recognizer",
                message: format!("status {}", response.status()),
            });
        }

        #[derive(serde::Deserialize)]
        struct TranscriptResponse {
            text: String,
        }
        let parsed: TranscriptResponse =
            response.json().await.map_err(|e| VoiceError::TransientUpstream {
                collaborator: "recognizer",
                message: e.to_string(),
            })?;
        Ok(parsed.text)
    }
}

pub struct RecognizerStage {
    recognizer: std::sync::Arc<dyn Recognizer>,
    vad_q: BoundedQueue<VadWindow>,
    stt_q: BoundedQueue<String>,
    events: EventMesh,
}

impl RecognizerStage {
    #[must_use]
    pub fn new(
        recognizer: std::sync::Arc<dyn Recognizer>,
        vad_q: BoundedQueue<VadWindow>,
        stt_q: BoundedQueue<String>,
        events: EventMesh,
    ) -> Self {
        Self {
            recognizer,
            vad_q,
            stt_q,
            events,
        }
    }

    /// Run one turn: wait for the VAD stage to signal speech onset via
    /// `user_barge_in`, stream windows until `silence_detected` latches,
    /// finalize, publish the transcript. Returns on `system_shutdown`.
    pub async fn run(&self) {
        loop {
            if self.events.system_shutdown.is_set() {
                tracing::debug!("recognizer stage: shutdown observed, exiting");
                return;
            }

            tokio::select! {
                () = self.events.user_barge_in.wait_set() => {}
                () = self.events.system_shutdown.wait_set() => return,
            }

            let mut session = match self.recognizer.open().await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(error = %e, "recognizer: failed to open session, abandoning turn");
                    continue;
                }
            };

            let mut turn_failed = false;
            loop {
                if self.events.silence_detected.is_set() {
                    break;
                }
                if self.events.system_shutdown.is_set() {
                    turn_failed = true;
                    break;
                }
                match self.vad_q.pop_timeout(Duration::from_millis(50)).await {
                    Some(window) => {
                        if let Err(e) = session.push(&window).await {
                            tracing::warn!(error = %e, "recognizer: push failed, abandoning turn");
                            turn_failed = true;
                            break;
                        }
                    }
                    None => continue,
                }
            }

            if turn_failed {
                continue;
            }

            match session.finalize().await {
                Ok(text) => {
                    self.stt_q.push(text);
                    self.events.transcribe_done.set();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "recognizer: finalize failed, abandoning turn");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubRecognizer {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Recognizer for StubRecognizer {
        async fn open(&self) -> Result<Box<dyn RecognizerSession>, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubSession { windows: 0 }))
        }
    }

    struct StubSession {
        windows: usize,
    }

    #[async_trait]
    impl RecognizerSession for StubSession {
        async fn push(&mut self, _window: &VadWindow) -> Result<(), VoiceError> {
            self.windows += 1;
            Ok(())
        }
        async fn finalize(&mut self) -> Result<String, VoiceError> {
            Ok(format!("heard {} windows", self.windows))
        }
    }

    #[tokio::test]
    async fn commits_transcript_on_silence() {
        let events = EventMesh::new();
        let vad_q = BoundedQueue::new("vadQ", 64);
        let stt_q = BoundedQueue::new("sttQ", 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = RecognizerStage::new(
            Arc::new(StubRecognizer { calls: calls.clone() }),
            vad_q.clone(),
            stt_q.clone(),
            events.clone(),
        );
        let handle = tokio::spawn(async move { stage.run().await });

        events.user_barge_in.set();
        vad_q.push(VadWindow::from_slice(&[0i16; 512]));
        vad_q.push(VadWindow::from_slice(&[0i16; 512]));
        tokio::time::sleep(Duration::from_millis(20)).await;
        events.silence_detected.set();

        let transcript = stt_q.pop_timeout(Duration::from_millis(500)).await;
        assert_eq!(transcript, Some("heard 2 windows".to_string()));
        assert!(events.transcribe_done.is_set());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        events.system_shutdown.set();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn shutdown_mid_turn_abandons_without_publishing() {
        let events = EventMesh::new();
        let vad_q = BoundedQueue::new("vadQ", 64);
        let stt_q = BoundedQueue::new("sttQ", 4);
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = RecognizerStage::new(
            Arc::new(StubRecognizer { calls }),
            vad_q.clone(),
            stt_q.clone(),
            events.clone(),
        );
        let handle = tokio::spawn(async move { stage.run().await });

        events.user_barge_in.set();
        tokio::time::sleep(Duration::from_millis(20)).await;
        events.system_shutdown.set();

        let transcript = stt_q.pop_timeout(Duration::from_millis(200)).await;
        assert_eq!(transcript, None);

        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
