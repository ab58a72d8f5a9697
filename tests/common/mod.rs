//! Shared test infrastructure: a scripted realtime upstream and an in-process
//! gateway server.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use interview_gateway::{
    InMemoryConversationStore, InMemoryInterviewRepository, InterviewScript, ServerConfig,
    WebSocketConnector, routes, state::AppState,
};

/// PCM16 payload the mock upstream speaks with.
pub const MOCK_AUDIO_PCM: [u8; 4] = [0x01, 0x00, 0xff, 0x7f];

/// How the mock upstream behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamBehavior {
    /// Full handshake, then answers every `response.create`
    Normal,
    /// Never confirms `session.update`
    StallConfiguration,
    /// Sends an error event instead of `session.created`
    RejectSession,
}

/// Events the mock upstream received, in order.
#[derive(Debug, Default)]
pub struct UpstreamLog {
    pub events: Mutex<Vec<Value>>,
}

impl UpstreamLog {
    pub fn types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e["type"].as_str().map(str::to_owned))
            .collect()
    }

    pub fn appended_audio(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e["type"] == "input_audio_buffer.append")
            .filter_map(|e| e["audio"].as_str().map(str::to_owned))
            .collect()
    }

    pub fn session_update(&self) -> Option<Value> {
        self.events
            .lock()
            .iter()
            .find(|e| e["type"] == "session.update")
            .cloned()
    }
}

/// Start a mock realtime model and return its WebSocket URL.
pub async fn start_mock_upstream(behavior: UpstreamBehavior) -> (String, Arc<UpstreamLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(UpstreamLog::default());

    let accept_log = log.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = accept_log.clone();
            tokio::spawn(async move {
                let _ = serve_upstream(stream, behavior, log).await;
            });
        }
    });

    (format!("ws://{addr}/v1/realtime"), log)
}

async fn serve_upstream(
    stream: tokio::net::TcpStream,
    behavior: UpstreamBehavior,
    log: Arc<UpstreamLog>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws = accept_async(stream).await?;
    let (mut write, mut read) = ws.split();

    if behavior == UpstreamBehavior::RejectSession {
        let error = json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "code": "invalid_api_key", "message": "Bad key"}
        });
        write.send(Message::Text(error.to_string().into())).await?;
        return Ok(());
    }

    let created = json!({"type": "session.created", "session": {"id": "sess_mock"}});
    write.send(Message::Text(created.to_string().into())).await?;

    let mut responses = 0;
    while let Some(message) = read.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let event: Value = serde_json::from_str(text.as_str())?;
        log.events.lock().push(event.clone());

        match event["type"].as_str() {
            Some("session.update") if behavior == UpstreamBehavior::Normal => {
                let updated = json!({"type": "session.updated", "session": {"id": "sess_mock"}});
                write.send(Message::Text(updated.to_string().into())).await?;
            }
            Some("response.create") => {
                responses += 1;
                for reply in spoken_response(responses) {
                    write.send(Message::Text(reply.to_string().into())).await?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Events of one spoken agent response.
fn spoken_response(n: usize) -> Vec<Value> {
    use base64::Engine;
    let audio = base64::engine::general_purpose::STANDARD.encode(MOCK_AUDIO_PCM);
    let response_id = format!("resp_{n}");
    vec![
        json!({"type": "response.audio.delta", "response_id": response_id, "item_id": "item", "delta": audio}),
        json!({"type": "response.audio_transcript.delta", "response_id": response_id, "delta": "Hei! "}),
        json!({"type": "response.audio_transcript.delta", "response_id": response_id, "delta": "Miten meni?"}),
        json!({"type": "response.audio_transcript.done", "response_id": response_id, "transcript": "Hei! Miten meni?"}),
        json!({"type": "response.done", "response": {"id": response_id, "status": "completed"}}),
    ]
}

/// Interview used across the integration tests.
pub fn feedback_interview() -> InterviewScript {
    InterviewScript::new(
        "int-1",
        "Palaute",
        vec!["Miten meni?".to_string(), "Mitä parantaisit?".to_string()],
    )
}

/// Gateway configuration pointing at a mock upstream.
pub fn test_config(upstream_url: Option<&str>) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.openai_api_key = Some("sk-test".to_string());
    config.openai_realtime_url = upstream_url.map(str::to_owned);
    config.public_base_url = Some("https://gw.example.com".to_string());
    config.setup_timeout_ms = 2_000;
    config
}

/// State with in-memory stores holding `interviews`.
pub fn test_state(config: ServerConfig, interviews: Vec<InterviewScript>) -> Arc<AppState> {
    let connector = WebSocketConnector::new(config.realtime_provider_config());
    AppState::from_parts(
        config,
        Arc::new(InMemoryInterviewRepository::new(interviews)),
        Arc::new(InMemoryConversationStore::new()),
        Arc::new(connector),
    )
}

/// Serve the gateway on a random local port.
pub async fn spawn_gateway(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::create_app(state);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}
