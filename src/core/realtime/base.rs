//! Base traits and types for the upstream realtime model link.
//!
//! A [`RealtimeBackend`] knows how to build the authenticated WebSocket
//! handshake for one provider. An [`UpstreamConnector`] turns a backend into a
//! live [`UpstreamLink`]: a pair of channels pumped by a background task. The
//! relay only ever sees the link, so tests can substitute an in-process
//! connector.
//!
//! # Audio Format
//!
//! Browser sessions use PCM 16-bit signed little-endian at 24kHz. Telephony
//! sessions pass G.711 u-law through unchanged.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::messages::ClientEvent;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur on the upstream link.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Provider reported an error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Link already closed
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Backend
// =============================================================================

/// Provider-specific handshake for the realtime WebSocket.
pub trait RealtimeBackend: Send + Sync {
    /// Provider name, as accepted by the factory.
    fn name(&self) -> &'static str;

    /// Endpoint URL including query parameters.
    fn endpoint_url(&self) -> String;

    /// Complete upgrade request with authentication headers.
    fn build_request(&self) -> RealtimeResult<http::Request<()>>;
}

// =============================================================================
// Link
// =============================================================================

/// Inbound frame from the upstream model.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamFrame {
    /// A JSON event, not yet parsed
    Text(String),
    /// The upstream side closed or the transport failed
    Closed {
        /// Close reason or transport error, if known
        reason: Option<String>,
    },
}

/// A live upstream connection.
///
/// Dropping `sender` asks the pump to close the WebSocket; `receiver` yields
/// [`UpstreamFrame::Closed`] once and then ends.
pub struct UpstreamLink {
    /// Outbound events
    pub sender: mpsc::Sender<ClientEvent>,
    /// Inbound frames
    pub receiver: mpsc::Receiver<UpstreamFrame>,
    /// Pump task, if the link owns one
    pub task: Option<JoinHandle<()>>,
}

/// Opens upstream links.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    async fn connect(&self) -> RealtimeResult<UpstreamLink>;
}
