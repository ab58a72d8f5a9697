//! Realtime WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::browser_relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the browser relay router
///
/// # Endpoint
///
/// `GET /realtime/interview?interviewId=` - WebSocket upgrade for a browser
/// interview. Without `interviewId` the most recent interview is used.
///
/// # Example
///
/// ```json
/// // Server, once the upstream session is configured
/// {"type": "ready", "session_id": "...", "interview_id": "int-1", "title": "Palaute"}
///
/// // Client streams microphone audio
/// {"type": "input_audio_buffer.append", "audio": "<base64 pcm16>"}
///
/// // Server streams transcripts and binary WAV frames
/// {"type": "transcript", "text": "Hei!", "role": "assistant", "is_final": false}
/// ```
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/realtime/interview", get(browser_relay_handler))
        .layer(TraceLayer::new_for_http())
}
