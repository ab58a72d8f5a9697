//! Client-facing relay message types.
//!
//! Browser clients speak a small JSON protocol tagged by `type`; telephony
//! clients receive raw media frames. Both sides are routed through
//! [`ClientRoute`] to the connection's writer task.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::telephony::OutboundMedia;

/// Maximum allowed size for client text messages (50 KB)
pub const MAX_TEXT_SIZE: usize = 50 * 1024;

/// Maximum allowed size for one base64 audio append (1 MB)
pub const MAX_AUDIO_APPEND_SIZE: usize = 1024 * 1024;

// =============================================================================
// Incoming Messages (Browser -> Server)
// =============================================================================

/// JSON messages a browser client may send once connected.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum BrowserIncomingMessage {
    /// Microphone audio already in the upstream wire format; forwarded verbatim
    #[serde(rename = "input_audio_buffer.append")]
    AudioAppend {
        /// Base64 PCM16 at 24kHz
        audio: String,
    },

    /// Typed answer added to the conversation
    #[serde(rename = "text")]
    Text {
        /// Text content
        text: String,
    },

    /// The participant ended the interview
    #[serde(rename = "end")]
    End,
}

/// Error type for message validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayValidationError {
    /// Text content exceeds maximum allowed size
    TextTooLarge { size: usize, max: usize },
    /// Audio append exceeds maximum allowed size
    AudioTooLarge { size: usize, max: usize },
}

impl std::fmt::Display for RelayValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextTooLarge { size, max } => {
                write!(f, "Text too large: {} bytes (max: {} bytes)", size, max)
            }
            Self::AudioTooLarge { size, max } => {
                write!(f, "Audio too large: {} bytes (max: {} bytes)", size, max)
            }
        }
    }
}

impl std::error::Error for RelayValidationError {}

impl BrowserIncomingMessage {
    /// Validates message field sizes to prevent resource exhaustion.
    pub fn validate_size(&self) -> Result<(), RelayValidationError> {
        match self {
            BrowserIncomingMessage::Text { text } if text.len() > MAX_TEXT_SIZE => {
                Err(RelayValidationError::TextTooLarge {
                    size: text.len(),
                    max: MAX_TEXT_SIZE,
                })
            }
            BrowserIncomingMessage::AudioAppend { audio } if audio.len() > MAX_AUDIO_APPEND_SIZE => {
                Err(RelayValidationError::AudioTooLarge {
                    size: audio.len(),
                    max: MAX_AUDIO_APPEND_SIZE,
                })
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Outgoing Messages (Server -> Browser)
// =============================================================================

/// JSON messages sent to a browser client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum RelayOutgoingMessage {
    /// Upstream configured; the interview is starting
    #[serde(rename = "ready")]
    Ready {
        /// Relay session ID
        session_id: String,
        /// Interview being conducted
        interview_id: String,
        /// Interview title
        title: String,
    },

    /// Transcript text for either speaker
    #[serde(rename = "transcript")]
    Transcript {
        /// Transcribed text; a delta when not final
        text: String,
        /// "user" or "assistant"
        role: String,
        /// Whether this closes the speaker turn
        is_final: bool,
    },

    /// The participant started speaking
    #[serde(rename = "speaking_started")]
    SpeakingStarted,

    /// The participant stopped speaking
    #[serde(rename = "speaking_stopped")]
    SpeakingStopped,

    /// Agent response completed
    #[serde(rename = "response_done")]
    ResponseDone {
        /// Response ID
        response_id: String,
    },

    /// Error message
    #[serde(rename = "error")]
    Error {
        /// Error code (optional)
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Error message
        message: String,
    },

    /// Connection closing
    #[serde(rename = "closing")]
    Closing {
        /// Reason for closing
        reason: String,
    },
}

impl RelayOutgoingMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        RelayOutgoingMessage::Error {
            code: Some(code.to_string()),
            message: message.into(),
        }
    }
}

// =============================================================================
// Message Routing
// =============================================================================

/// Frame received from the client socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// JSON text frame
    Text(String),
    /// Binary frame (browser float32 microphone samples)
    Binary(Bytes),
    /// Client closed the socket or the socket failed
    Close,
}

/// Frame routed to the client writer task.
#[derive(Debug, Clone)]
pub enum ClientRoute {
    /// JSON message for a browser client
    Outgoing(RelayOutgoingMessage),
    /// Media frame for a telephony stream
    Media(OutboundMedia),
    /// Binary audio data (WAV container)
    Audio(Bytes),
    /// Close connection
    Close,
}
