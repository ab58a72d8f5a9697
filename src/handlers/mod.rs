//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `realtime` - Browser interview relay (WebSocket)
//! - `voice` - Telephony webhooks and media stream relay

pub mod api;
pub mod realtime;
pub mod voice;

pub use realtime::browser_relay_handler;
pub use voice::{voice_incoming_handler, voice_stream_handler, voice_turn_handler};
