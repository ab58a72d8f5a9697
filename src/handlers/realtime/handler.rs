//! Browser interview relay.
//!
//! Upgrades `GET /realtime/interview?interviewId=` to a WebSocket, resolves the
//! interview and runs a [`RelaySession`] between the browser and the upstream
//! realtime model until either side ends it.

use axum::{
    Extension,
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::socket::split_socket;
use crate::core::relay::{ClientKind, ClientRoute, RelayOutgoingMessage, RelaySession};
use crate::core::telephony::InterviewQuery;
use crate::middleware::ClientIp;
use crate::state::{AppState, ConnectionGuard};

/// Maximum WebSocket frame size (10 MB)
pub(crate) const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
pub(crate) const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Browser relay WebSocket handler
///
/// # Protocol
///
/// Client to server:
/// - `{"type":"input_audio_buffer.append","audio":"<base64 pcm16>"}`
/// - binary frames of little-endian float32 microphone samples
/// - `{"type":"text","text":"..."}` typed answer
/// - `{"type":"end"}` finish the interview
///
/// Server to client:
/// - `ready` once the upstream session is configured
/// - `transcript`, `speaking_started`, `speaking_stopped`, `response_done`
/// - binary WAV frames with the agent's speech, in order
/// - `error` and finally `closing`
pub async fn browser_relay_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<InterviewQuery>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let interview_id = query.interview_id().map(str::to_owned);
    let ip = client_ip.map(|Extension(ClientIp(ip))| ip);
    info!(interview_id = ?interview_id, "Browser relay upgrade requested");

    let guard = ConnectionGuard::new(state.clone(), ip);
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_browser_socket(socket, state, interview_id, guard))
}

async fn handle_browser_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    interview_id: Option<String>,
    _guard: ConnectionGuard,
) {
    let (frames, writer) = split_socket(socket);

    let script = match state.interviews.resolve(interview_id.as_deref()).await {
        Ok(Some(script)) => script,
        Ok(None) => {
            warn!(interview_id = ?interview_id, "No interview for browser relay");
            let _ = writer
                .sender()
                .send(ClientRoute::Outgoing(RelayOutgoingMessage::error(
                    "interview_not_found",
                    "Interview not found",
                )))
                .await;
            writer.finish().await;
            return;
        }
        Err(e) => {
            error!(interview_id = ?interview_id, error = %e, "Interview lookup failed");
            let _ = writer
                .sender()
                .send(ClientRoute::Outgoing(RelayOutgoingMessage::error(
                    "interview_unavailable",
                    "Interview could not be loaded",
                )))
                .await;
            writer.finish().await;
            return;
        }
    };

    let configurator = state.session_configurator(script, false);
    let session = RelaySession::new(ClientKind::Browser, configurator, writer.sender())
        .with_setup_timeout(state.config.setup_timeout());

    let summary = session.run(state.connector.as_ref(), frames).await;
    info!(
        session_id = %summary.session_id,
        outcome = ?summary.outcome,
        transcript_entries = summary.transcript.len(),
        "Browser relay finished"
    );

    writer.finish().await;
}
