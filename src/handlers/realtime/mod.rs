//! Full-duplex relay WebSocket handlers
//!
//! - [`browser_relay_handler`] - browser microphone and speaker
//! - the telephony media stream lives in [`crate::handlers::voice`] and shares
//!   the socket adapter defined here

mod handler;
pub(crate) mod socket;

pub(crate) use handler::{MAX_WS_FRAME_SIZE, MAX_WS_MESSAGE_SIZE};
pub use handler::browser_relay_handler;
