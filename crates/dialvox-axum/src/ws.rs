//! `/socket` — the telephony audio-plane WebSocket (spec §6 "WebSocket
//! endpoint").
//!
//! First inbound message is a JSON handshake (ignored). Subsequent inbound
//! messages are binary PCM frames of arbitrary size; outbound messages are
//! exactly 640-byte binary PCM frames, paced ~15ms apart. One call = one
//! [`dialvox_voice::CallPipeline`].
//!
//! Grounded directly in `gglib-axum/src/handlers/voice_ws.rs`: split the
//! socket into sender/receiver, spawn an ingest task and an egress task,
//! `tokio::select!` on whichever finishes first and abort the other.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use dialvox_voice::egress::FrameSink;
use dialvox_voice::ingress::IngressEvent;
use dialvox_voice::llm::HttpLlmClient;
use dialvox_voice::pipeline::{CallPipeline, Collaborators};
use dialvox_voice::recognizer::HttpRecognizer;
use dialvox_voice::synthesizer::HttpSynthesizer;
use dialvox_voice::vad::EnergyVadModel;

use crate::state::AppState;

/// Adapts a split WebSocket sender to [`FrameSink`] so `dialvox-voice`'s
/// egress stage never has to know about axum types.
struct WsFrameSink {
    sender: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), ()> {
        self.sender.send(Message::Binary(frame.into())).await.map_err(|_| ())
    }
}

pub async fn socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let collaborators = Collaborators {
        vad_model: Arc::new(EnergyVadModel),
        recognizer: Arc::new(HttpRecognizer::new(
            state.http_client.clone(),
            state.config.recognizer.endpoint.clone().unwrap_or_default(),
            state.config.recognizer.api_key.clone().unwrap_or_default(),
            state.config.recognizer.language.clone().unwrap_or_else(|| "en".to_string()),
        )),
        llm_client: Arc::new(HttpLlmClient::new(
            state.http_client.clone(),
            state.config.llm.endpoint.clone().unwrap_or_default(),
            state.config.llm.api_key.clone().unwrap_or_default(),
            state.config.llm.model_id.clone().unwrap_or_default(),
            state.config.llm.temperature.unwrap_or(0.7),
            state.config.llm.max_tokens.unwrap_or(256),
        )),
        synthesizer: Arc::new(HttpSynthesizer::new(
            state.http_client.clone(),
            state.config.synthesizer.endpoint.clone().unwrap_or_default(),
            state.config.synthesizer.api_key.clone().unwrap_or_default(),
            state.config.synthesizer.voice_id.clone().unwrap_or_default(),
            state.config.synthesizer.language.clone().unwrap_or_else(|| "en".to_string()),
        )),
    };

    let handle = CallPipeline::start(&state.config, collaborators);
    tracing::info!("call socket opened, pipeline started");

    let (ws_sender, ws_receiver) = socket.split();

    let ingest_handle = handle.clone();
    let mut ingest = tokio::spawn(async move {
        let mut ws_receiver = ws_receiver;
        while let Some(msg_result) = ws_receiver.next().await {
            let keep_going = match msg_result {
                Ok(Message::Binary(data)) => ingest_handle.feed(IngressEvent::Audio(data.to_vec())),
                Ok(Message::Close(_)) | Err(_) => ingest_handle.feed(IngressEvent::SocketClosed),
                Ok(_) => true,
            };
            if !keep_going {
                break;
            }
        }
        ingest_handle.feed(IngressEvent::SocketClosed);
    });

    let egress_handle = handle.clone();
    let mut egress = tokio::spawn(async move {
        let mut sink = WsFrameSink { sender: ws_sender };
        egress_handle.drain_outbound(&mut sink).await;
    });

    tokio::select! {
        _ = &mut ingest => { egress.abort(); }
        _ = &mut egress => { ingest.abort(); }
    }

    handle.shutdown().await;
    tracing::info!("call socket closed, pipeline torn down");
}
