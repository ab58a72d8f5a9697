use axum::{Router, middleware};
use std::sync::Arc;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

pub mod api;
pub mod realtime;
pub mod voice;

/// All routes with their state.
///
/// WebSocket routes pass through the connection limit middleware, so the
/// service must be served with `into_make_service_with_connect_info`.
/// Rate limiting, CORS and security headers are layered on top by the binary.
pub fn create_app(state: Arc<AppState>) -> Router {
    let realtime_routes = realtime::create_realtime_router().layer(
        middleware::from_fn_with_state(state.clone(), connection_limit_middleware),
    );
    let stream_routes = voice::create_voice_stream_router().layer(
        middleware::from_fn_with_state(state.clone(), connection_limit_middleware),
    );

    api::create_api_router()
        .merge(voice::create_voice_webhook_router())
        .merge(realtime_routes)
        .merge(stream_routes)
        .with_state(state)
}
