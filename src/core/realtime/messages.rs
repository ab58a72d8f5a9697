//! Realtime model WebSocket event types.
//!
//! Both supported backends speak the same JSON event contract; only the
//! handshake differs. All events are JSON text frames tagged by `type`.
//!
//! # Protocol Overview
//!
//! Client events (sent upstream):
//! - session.update - Configure voice, formats, VAD and instructions
//! - input_audio_buffer.append - Append base64 audio to the input buffer
//! - conversation.item.create - Add a text item to the conversation
//! - response.create - Ask the model to speak
//!
//! Server events (received from upstream):
//! - session.created / session.updated
//! - input_audio_buffer.speech_started / speech_stopped
//! - conversation.item.input_audio_transcription.completed
//! - response.audio.delta
//! - response.audio_transcript.delta / done
//! - response.done
//! - error
//!
//! Unknown server events deserialize to [`ServerEvent::Unknown`] and are ignored.

use serde::{Deserialize, Serialize};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent in `session.update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the interviewer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum response output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxTokens>,
}

/// Maximum tokens configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    /// Specific number of tokens
    Number(u32),
    /// Unbounded, serialized as "inf"
    Infinite(String),
}

impl MaxTokens {
    /// The unbounded value.
    pub fn infinite() -> Self {
        MaxTokens::Infinite("inf".to_string())
    }
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none", default)]
        threshold: Option<f32>,
        /// Audio kept before detected speech, in ms
        #[serde(skip_serializing_if = "Option::is_none", default)]
        prefix_padding_ms: Option<u32>,
        /// Silence that ends a user turn, in ms
        #[serde(skip_serializing_if = "Option::is_none", default)]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant, system)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    /// Content parts
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<Vec<ContentPart>>,
}

impl ConversationItem {
    /// A message item carrying a single text part.
    ///
    /// User text goes in an `input_text` part, assistant text in a `text` part.
    pub fn text_message(role: &str, text: impl Into<String>) -> Self {
        let content_type = if role == "user" { "input_text" } else { "text" };
        Self {
            id: None,
            item_type: "message".to_string(),
            role: Some(role.to_string()),
            content: Some(vec![ContentPart {
                content_type: content_type.to_string(),
                text: Some(text.into()),
                transcript: None,
            }]),
        }
    }
}

/// Content part within a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    /// Transcript of audio content
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transcript: Option<String>,
}

// =============================================================================
// Client Events (sent upstream)
// =============================================================================

/// Client events sent to the realtime model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

// =============================================================================
// Server Events (received from upstream)
// =============================================================================

/// Server events received from the realtime model.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Session,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: Session,
    },

    /// VAD detected speech
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        audio_start_ms: u64,
        #[serde(default)]
        item_id: String,
    },

    /// VAD detected silence
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        audio_end_ms: u64,
        #[serde(default)]
        item_id: String,
    },

    /// Input audio transcription completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        #[serde(default)]
        item_id: String,
        /// Transcript text
        transcript: String,
    },

    /// Response done
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: Response,
    },

    /// Audio transcript delta
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        #[serde(default)]
        response_id: String,
        #[serde(default)]
        item_id: String,
        /// Transcript delta
        delta: String,
    },

    /// Audio transcript done
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        #[serde(default)]
        response_id: String,
        #[serde(default)]
        item_id: String,
        /// Full transcript
        #[serde(default)]
        transcript: String,
    },

    /// Audio data chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        response_id: String,
        #[serde(default)]
        item_id: String,
        /// Base64-encoded audio delta
        delta: String,
    },

    /// Any event the relay does not act on
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Event name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Error { .. } => "error",
            ServerEvent::SessionCreated { .. } => "session.created",
            ServerEvent::SessionUpdated { .. } => "session.updated",
            ServerEvent::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            ServerEvent::SpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            ServerEvent::TranscriptionCompleted { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            ServerEvent::ResponseDone { .. } => "response.done",
            ServerEvent::AudioTranscriptDelta { .. } => "response.audio_transcript.delta",
            ServerEvent::AudioTranscriptDone { .. } => "response.audio_transcript.done",
            ServerEvent::AudioDelta { .. } => "response.audio.delta",
            ServerEvent::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Session information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    /// Session ID
    #[serde(default)]
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Voice
    #[serde(default)]
    pub voice: Option<String>,
}

/// Response information.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Response status
    #[serde(default)]
    pub status: String,
    /// Output items
    #[serde(default)]
    pub output: Vec<ConversationItem>,
}

impl Response {
    /// Transcript of the first audio part in the output, if any.
    pub fn transcript(&self) -> Option<&str> {
        self.output
            .iter()
            .filter_map(|item| item.content.as_ref())
            .flatten()
            .find_map(|part| part.transcript.as_deref())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_create_serialization() {
        let json = serde_json::to_value(ClientEvent::ResponseCreate).unwrap();
        assert_eq!(json, json!({"type": "response.create"}));
    }

    #[test]
    fn test_session_update_skips_unset_fields() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig {
                voice: Some("alloy".to_string()),
                turn_detection: Some(TurnDetection::ServerVad {
                    threshold: Some(0.5),
                    prefix_padding_ms: Some(300),
                    silence_duration_ms: Some(1000),
                }),
                max_response_output_tokens: Some(MaxTokens::Number(100)),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "session.update");
        assert_eq!(json["session"]["voice"], "alloy");
        assert_eq!(json["session"]["turn_detection"]["type"], "server_vad");
        assert_eq!(json["session"]["turn_detection"]["silence_duration_ms"], 1000);
        assert_eq!(json["session"]["max_response_output_tokens"], 100);
        assert!(json["session"].get("instructions").is_none());
    }

    #[test]
    fn test_infinite_max_tokens() {
        let json = serde_json::to_value(MaxTokens::infinite()).unwrap();
        assert_eq!(json, json!("inf"));
    }

    #[test]
    fn test_text_message_item() {
        let user = ConversationItem::text_message("user", "hello");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "input_text");
        assert_eq!(json["content"][0]["text"], "hello");

        let assistant = ConversationItem::text_message("assistant", "hei");
        let json = serde_json::to_value(&assistant).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
    }

    #[test]
    fn test_server_error_deserialization() {
        let json = r#"{
            "type": "error",
            "error": {
                "type": "invalid_request_error",
                "code": "invalid_value",
                "message": "Test error"
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::Error { error } => {
                assert_eq!(error.message, "Test error");
                assert_eq!(error.code.as_deref(), Some("invalid_value"));
            }
            other => panic!("Wrong event type: {:?}", other),
        }
    }

    #[test]
    fn test_minimal_events_deserialize() {
        let created: ServerEvent = serde_json::from_str(r#"{"type":"session.created"}"#).unwrap();
        assert!(matches!(created, ServerEvent::SessionCreated { .. }));

        let delta: ServerEvent =
            serde_json::from_str(r#"{"type":"response.audio.delta","delta":"AAA="}"#).unwrap();
        match delta {
            ServerEvent::AudioDelta { delta, .. } => assert_eq!(delta, "AAA="),
            other => panic!("Wrong event type: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_tolerated() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"rate_limits.updated","rate_limits":[]}"#).unwrap();
        assert!(matches!(event, ServerEvent::Unknown));
        assert_eq!(event.kind(), "unknown");
    }

    #[test]
    fn test_response_transcript_lookup() {
        let json = r#"{
            "type": "response.done",
            "response": {
                "id": "resp_1",
                "status": "completed",
                "output": [{
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "audio", "transcript": "Kerro itsestäsi."}]
                }]
            }
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::ResponseDone { response } => {
                assert_eq!(response.transcript(), Some("Kerro itsestäsi."));
            }
            other => panic!("Wrong event type: {:?}", other),
        }
    }
}
