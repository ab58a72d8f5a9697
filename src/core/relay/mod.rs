//! Full-duplex interview relay.
//!
//! Bridges a browser socket or a telephony media stream to an upstream
//! realtime model session. The connection handler adapts its socket into a
//! stream of [`ClientFrame`]s plus a [`ClientRoute`] writer channel and hands
//! both to a [`RelaySession`].

pub mod messages;
mod session;
mod sink;
mod telephony;

pub use messages::{
    BrowserIncomingMessage, ClientFrame, ClientRoute, MAX_TEXT_SIZE, RelayOutgoingMessage,
    RelayValidationError,
};
pub use session::{
    ClientKind, DEFAULT_SETUP_TIMEOUT, RelayOutcome, RelaySession, RelayState, RelaySummary,
};
pub use sink::{ClientAudioSink, TelephonyMediaSink};
pub use telephony::{DEFAULT_STREAM_START_TIMEOUT, StreamStartError, await_stream_start};
