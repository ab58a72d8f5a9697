//! Telephony voice webhooks and media stream.
//!
//! - `POST /voice/incoming` answers a new call, either attaching a media stream
//!   to the realtime relay or starting the gather loop
//! - `POST /voice/turn` runs one half-duplex turn
//! - `GET /voice/stream` is the media stream WebSocket

use axum::{
    Extension, Form,
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::realtime::socket::split_socket;
use super::realtime::{MAX_WS_FRAME_SIZE, MAX_WS_MESSAGE_SIZE};
use crate::config::ServerConfig;
use crate::core::interview::{InboundTurn, InterviewPhrases, TurnInstruction};
use crate::core::relay::{
    ClientKind, DEFAULT_STREAM_START_TIMEOUT, RelaySession, await_stream_start,
};
use crate::core::telephony::{
    InterviewQuery, TWIML_CONTENT_TYPE, TelephonyMode, TwimlBuilder, VoiceWebhookForm,
};
use crate::errors::{AppError, AppResult};
use crate::middleware::ClientIp;
use crate::state::{AppState, ConnectionGuard};

pub const TURN_PATH: &str = "/voice/turn";
pub const STREAM_PATH: &str = "/voice/stream";

// =============================================================================
// Webhooks
// =============================================================================

/// Incoming call webhook.
pub async fn voice_incoming_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InterviewQuery>,
    headers: HeaderMap,
    Form(form): Form<VoiceWebhookForm>,
) -> AppResult<Response> {
    let call_id = require_call_sid(&form)?;
    let base_url = base_url(&state.config, &headers);
    info!(
        call_id,
        from = ?form.from,
        mode = %state.config.telephony_mode,
        "Incoming call"
    );

    match state.config.telephony_mode {
        TelephonyMode::Gather => {
            let inbound = InboundTurn {
                call_id: call_id.to_string(),
                utterance: None,
                interview_id: query.interview_id().map(str::to_owned),
            };
            Ok(run_turn(&state, &inbound, &base_url).await)
        }
        TelephonyMode::Stream => Ok(connect_stream(&state, query.interview_id(), &base_url).await),
    }
}

/// Half-duplex turn webhook.
pub async fn voice_turn_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InterviewQuery>,
    headers: HeaderMap,
    Form(form): Form<VoiceWebhookForm>,
) -> AppResult<Response> {
    let call_id = require_call_sid(&form)?;
    let inbound = InboundTurn {
        call_id: call_id.to_string(),
        utterance: form.speech_result.clone(),
        interview_id: query.interview_id().map(str::to_owned),
    };
    info!(
        call_id,
        has_speech = inbound.spoken().is_some(),
        confidence = ?form.confidence,
        "Voice turn"
    );

    Ok(run_turn(&state, &inbound, &base_url(&state.config, &headers)).await)
}

fn require_call_sid(form: &VoiceWebhookForm) -> AppResult<&str> {
    let call_id = form.call_sid.trim();
    if call_id.is_empty() {
        return Err(AppError::BadRequest("CallSid is required".to_string()));
    }
    Ok(call_id)
}

/// Run the turn engine and render its instruction.
async fn run_turn(state: &AppState, inbound: &InboundTurn, base_url: &str) -> Response {
    let say = state.config.say_options();
    let phrases = state.turn_engine.phrases();

    let document = match state.turn_engine.handle(inbound).await {
        Ok(reply) => match reply.instruction {
            TurnInstruction::Continue { say: line } => {
                let action = turn_action_url(base_url, inbound.interview_id.as_deref());
                TwimlBuilder::say_and_gather(
                    &line,
                    &phrases.no_answer,
                    &say,
                    &state.config.gather_options(action),
                )
            }
            TurnInstruction::Hangup { say: line } => TwimlBuilder::say_and_hangup(&line, &say),
        },
        Err(e) => {
            error!(call_id = %inbound.call_id, error = %e, "Turn failed");
            TwimlBuilder::say_and_hangup(&phrases.error, &say)
        }
    };
    twiml(document)
}

/// Greet the caller and attach the media stream.
async fn connect_stream(state: &AppState, interview_id: Option<&str>, base_url: &str) -> Response {
    let say = state.config.say_options();
    let phrases = &state.config.phrases;

    let script = match state.interviews.resolve(interview_id).await {
        Ok(Some(script)) => script,
        Ok(None) => {
            info!(interview_id = ?interview_id, "No interview for incoming call");
            return twiml(TwimlBuilder::say_and_hangup(&phrases.not_found, &say));
        }
        Err(e) => {
            error!(interview_id = ?interview_id, error = %e, "Interview lookup failed");
            return twiml(TwimlBuilder::say_and_hangup(&phrases.error, &say));
        }
    };

    let greeting = InterviewPhrases::render(&phrases.call_greeting, script.display_title(phrases));
    let stream_url = websocket_url(base_url, STREAM_PATH);
    twiml(
        TwimlBuilder::new()
            .say(&greeting, &say)
            .connect_stream(&stream_url, &[("interviewId", script.id.as_str())])
            .build(),
    )
}

fn twiml(document: String) -> Response {
    ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], document).into_response()
}

// =============================================================================
// URLs
// =============================================================================

/// Externally reachable base URL: configured, or derived from the request.
fn base_url(config: &ServerConfig, headers: &HeaderMap) -> String {
    if let Some(url) = config.public_base_url() {
        return url.to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| config.address());
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| {
            if config.is_tls_enabled() {
                "https".to_string()
            } else {
                "http".to_string()
            }
        });
    format!("{scheme}://{host}")
}

fn turn_action_url(base_url: &str, interview_id: Option<&str>) -> String {
    match interview_id {
        Some(id) => {
            let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
            format!("{base_url}{TURN_PATH}?interviewId={encoded}")
        }
        None => format!("{base_url}{TURN_PATH}"),
    }
}

fn websocket_url(base_url: &str, path: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}{path}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}{path}")
    } else {
        format!("{base_url}{path}")
    }
}

// =============================================================================
// Media stream
// =============================================================================

/// Telephony media stream WebSocket handler
///
/// Waits for the stream's `start` frame, resolves the interview named in its
/// custom parameters (or the query string), then relays G.711 u-law audio both
/// ways until the call ends.
pub async fn voice_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<InterviewQuery>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    let fallback_interview = query.interview_id().map(str::to_owned);
    let ip = client_ip.map(|Extension(ClientIp(ip))| ip);
    let guard = ConnectionGuard::new(state.clone(), ip);

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_stream(socket, state, fallback_interview, guard))
}

async fn handle_media_stream(
    socket: WebSocket,
    state: Arc<AppState>,
    fallback_interview: Option<String>,
    _guard: ConnectionGuard,
) {
    let (mut frames, writer) = split_socket(socket);

    let start = match await_stream_start(&mut frames, DEFAULT_STREAM_START_TIMEOUT).await {
        Ok(start) => start,
        Err(e) => {
            warn!(error = %e, "Media stream never started");
            writer.finish().await;
            return;
        }
    };

    let interview_id = start
        .interview_id()
        .map(str::to_owned)
        .or(fallback_interview);
    info!(
        call_id = %start.call_sid,
        stream_sid = %start.stream_sid,
        interview_id = ?interview_id,
        "Media stream started"
    );

    let script = match state.interviews.resolve(interview_id.as_deref()).await {
        Ok(Some(script)) => script,
        Ok(None) => {
            warn!(call_id = %start.call_sid, interview_id = ?interview_id, "No interview for media stream");
            writer.finish().await;
            return;
        }
        Err(e) => {
            error!(call_id = %start.call_sid, error = %e, "Interview lookup failed");
            writer.finish().await;
            return;
        }
    };

    let configurator = state.session_configurator(script, true);
    let kind = ClientKind::Telephony {
        stream_sid: start.stream_sid.clone(),
    };
    let session = RelaySession::new(kind, configurator, writer.sender())
        .with_setup_timeout(state.config.setup_timeout());

    let summary = session.run(state.connector.as_ref(), frames).await;
    info!(
        call_id = %start.call_sid,
        session_id = %summary.session_id,
        outcome = ?summary.outcome,
        transcript_entries = summary.transcript.len(),
        "Media stream relay finished"
    );

    writer.finish().await;
}
