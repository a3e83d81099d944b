//! C5: LLM response stage (spec §4.5).
//!
//! Drains committed transcripts from `sttQ`, streams a chat completion from
//! an injected [`LlmClient`], and chunks the streamed text at punctuation
//! boundaries (`. , ! ? |`) so the synthesizer can start speaking before the
//! full response has arrived. Checks `user_barge_in` at every chunk
//! boundary; on interruption it purges `llmQ`, keeps the partial reply as
//! the assistant turn, and still signals `llm_done` so the controller
//! isn't left waiting on a turn that will never otherwise complete.
//!
//! The configured system prompt is passed alongside `ConversationContext` on
//! every call, never pushed into its history: `context` holds only user and
//! assistant turns per spec §3.
//!
//! Grounded in `reqwest-eventsource`'s SSE consumption pattern (brought in
//! from the wider example pack, since the teacher's LLM usage is a local
//! GGUF proxy rather than a streaming chat API).

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event as SseEvent, EventSource};

use dialvox_core::{ConversationContext, Role};

use crate::error::VoiceError;
use crate::queue::BoundedQueue;
use crate::sync::EventMesh;

const CHUNK_BOUNDARIES: [char; 5] = ['.', ',', '!', '?', '|'];

/// A streaming chat-completion collaborator: given the conversation so far,
/// yields text deltas as they arrive.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn stream_reply(
        &self,
        context: &ConversationContext,
        system_prompt: &str,
    ) -> Result<Box<dyn TokenStream>, VoiceError>;
}

#[async_trait]
pub trait TokenStream: Send {
    /// Returns the next delta, or `None` once the stream is exhausted.
    async fn next_delta(&mut self) -> Result<Option<String>, VoiceError>;
}

/// HTTP SSE-based implementation calling an OpenAI-compatible
/// `/chat/completions` streaming endpoint.
pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_id: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpLlmClient {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        model_id: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            model_id,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn stream_reply(
        &self,
        context: &ConversationContext,
        system_prompt: &str,
    ) -> Result<Box<dyn TokenStream>, VoiceError> {
        let mut messages = vec![serde_json::json!({ "role": "system", "content": system_prompt })];
        messages.extend(context.as_messages().into_iter().map(|(role, text)| {
            let role_str = match role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            serde_json::json!({ "role": role_str, "content": text })
        }));

        let body = serde_json::json!({
            "model": self.model_id,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": true,
        });

        let request_builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);

        let event_source = EventSource::new(request_builder).map_err(|e| VoiceError::Fatal(e.to_string()))?;

        Ok(Box::new(SseTokenStream { source: event_source }))
    }
}

struct SseTokenStream {
    source: EventSource,
}

#[async_trait]
impl TokenStream for SseTokenStream {
    async fn next_delta(&mut self) -> Result<Option<String>, VoiceError> {
        loop {
            match self.source.next().await {
                None => return Ok(None),
                Some(Ok(SseEvent::Open)) => continue,
                Some(Ok(SseEvent::Message(message))) => {
                    if message.data == "[DONE]" {
                        return Ok(None);
                    }
                    #[derive(serde::Deserialize)]
                    struct Delta {
                        content: Option<String>,
                    }
                    #[derive(serde::Deserialize)]
                    struct Choice {
                        delta: Delta,
                    }
                    #[derive(serde::Deserialize)]
                    struct ChunkResponse {
                        choices: Vec<Choice>,
                    }
                    let parsed: ChunkResponse = serde_json::from_str(&message.data)
                        .map_err(|e| VoiceError::TransientUpstream {
                            collaborator: "llm",
                            message: e.to_string(),
                        })?;
                    if let Some(choice) = parsed.choices.into_iter().next() {
                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                return Ok(Some(content));
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    return Err(VoiceError::TransientUpstream {
                        collaborator: "llm",
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

pub struct LlmStage {
    client: std::sync::Arc<dyn LlmClient>,
    stt_q: BoundedQueue<String>,
    llm_q: BoundedQueue<String>,
    events: EventMesh,
    system_prompt: String,
}

impl LlmStage {
    #[must_use]
    pub fn new(
        client: std::sync::Arc<dyn LlmClient>,
        stt_q: BoundedQueue<String>,
        llm_q: BoundedQueue<String>,
        events: EventMesh,
        system_prompt: String,
    ) -> Self {
        Self {
            client,
            stt_q,
            llm_q,
            events,
            system_prompt,
        }
    }

    /// Run one turn per committed transcript: stream deltas, flush a chunk
    /// whenever a punctuation boundary is hit, abort on barge-in.
    pub async fn run(&self, context: &mut ConversationContext) {
        loop {
            if self.events.system_shutdown.is_set() {
                tracing::debug!("llm stage: shutdown observed, exiting");
                return;
            }

            let transcript = match self
                .stt_q
                .pop_timeout(std::time::Duration::from_millis(100))
                .await
            {
                Some(text) => text,
                None => continue,
            };

            context.push(dialvox_core::Turn::user(transcript));

            let mut stream = match self.client.stream_reply(context, &self.system_prompt).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "llm: failed to open stream, abandoning turn");
                    continue;
                }
            };

            let mut pending = String::new();
            let mut full_reply = String::new();
            let mut interrupted = false;
            let mut turn_failed = false;

            loop {
                if self.events.user_barge_in.is_set() || self.events.system_shutdown.is_set() {
                    interrupted = true;
                    break;
                }

                match stream.next_delta().await {
                    Ok(Some(delta)) => {
                        pending.push_str(&delta);
                        full_reply.push_str(&delta);
                        if delta.chars().any(|c| CHUNK_BOUNDARIES.contains(&c)) {
                            self.llm_q.push(std::mem::take(&mut pending));
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "llm: stream error, abandoning turn");
                        turn_failed = true;
                        break;
                    }
                }
            }

            if turn_failed {
                continue;
            }

            if interrupted {
                self.llm_q.purge();
                if !full_reply.is_empty() {
                    context.push(dialvox_core::Turn::assistant(full_reply));
                }
                self.events.llm_done.set();
                continue;
            }

            if !pending.is_empty() {
                self.llm_q.push(pending);
            }
            if !full_reply.is_empty() {
                context.push(dialvox_core::Turn::assistant(full_reply));
            }
            self.events.llm_done.set();
        }
    }
}
