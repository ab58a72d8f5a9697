//! Global and per-IP limits on concurrent relay sockets.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use interview_gateway::middleware::connection_limit_middleware;
//!
//! let app = Router::new()
//!     .route("/realtime/interview", get(browser_relay_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         connection_limit_middleware,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

/// Client address of an upgrade that holds a connection slot.
///
/// The relay handler wraps it in a [`ConnectionGuard`](crate::state::ConnectionGuard)
/// so the slot is returned when the session ends.
#[derive(Clone, Debug)]
pub struct ClientIp(pub IpAddr);

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

/// Reserve a connection slot for every WebSocket upgrade.
///
/// Over the global limit the upgrade is refused with 503, over the per-IP
/// limit with 429. An accepted upgrade carries [`ClientIp`] so its handler can
/// hand the slot back. Other requests pass through untouched.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let ip = addr.ip();
    if let Err(limit) = state.try_acquire_connection(ip) {
        warn!(
            ip = %ip,
            path = %request.uri().path(),
            limit = ?limit,
            "Refusing WebSocket upgrade"
        );
        return AppError::from(limit).into_response();
    }

    request.extensions_mut().insert(ClientIp(ip));
    next.run(request).await
}
