//! Telephony route configuration

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::voice::{
    STREAM_PATH, TURN_PATH, voice_incoming_handler, voice_stream_handler, voice_turn_handler,
};
use crate::state::AppState;
use std::sync::Arc;

/// Webhooks posted by the telephony gateway. Responses are TwiML.
pub fn create_voice_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice/incoming", post(voice_incoming_handler))
        .route(TURN_PATH, post(voice_turn_handler))
        .layer(TraceLayer::new_for_http())
}

/// Media stream WebSocket; apply the connection limit middleware to this router.
pub fn create_voice_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(STREAM_PATH, get(voice_stream_handler))
        .layer(TraceLayer::new_for_http())
}
