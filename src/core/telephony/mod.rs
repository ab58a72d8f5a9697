//! Telephony gateway plumbing: webhook forms, TwiML replies and media frames.

mod media;
mod twiml;

pub use media::{MediaPayload, MediaStreamEvent, OutboundMedia, StreamStart};
pub use twiml::{GatherOptions, SayOptions, TWIML_CONTENT_TYPE, TwimlBuilder, escape_xml};

use serde::Deserialize;

/// Form fields posted by the telephony gateway on every voice webhook.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceWebhookForm {
    #[serde(default)]
    pub call_sid: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// Transcribed caller speech, present on gather callbacks
    #[serde(default)]
    pub speech_result: Option<String>,
    /// Recognizer confidence for `speech_result`
    #[serde(default)]
    pub confidence: Option<String>,
}

/// Query string accepted by the voice webhooks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuery {
    #[serde(default)]
    pub interview_id: Option<String>,
}

impl InterviewQuery {
    pub fn interview_id(&self) -> Option<&str> {
        self.interview_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// How an incoming call is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelephonyMode {
    /// Attach a bidirectional media stream to the realtime relay
    #[default]
    Stream,
    /// Speak-and-gather turns through the turn webhook
    Gather,
}

impl TelephonyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "stream" | "realtime" => Some(TelephonyMode::Stream),
            "gather" | "webhook" | "turn" => Some(TelephonyMode::Gather),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TelephonyMode::Stream => "stream",
            TelephonyMode::Gather => "gather",
        }
    }
}

impl std::fmt::Display for TelephonyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field_names() {
        let json = serde_json::json!({
            "CallSid": "CA1",
            "From": "+358401234567",
            "To": "+358900000",
            "SpeechResult": "Olen Matti",
            "Confidence": "0.92"
        });
        let form: VoiceWebhookForm = serde_json::from_value(json).unwrap();
        assert_eq!(form.call_sid, "CA1");
        assert_eq!(form.speech_result.as_deref(), Some("Olen Matti"));
        assert_eq!(form.from.as_deref(), Some("+358401234567"));
    }

    #[test]
    fn test_interview_query_trims() {
        let query = InterviewQuery {
            interview_id: Some("  ".to_string()),
        };
        assert_eq!(query.interview_id(), None);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(TelephonyMode::parse("Stream"), Some(TelephonyMode::Stream));
        assert_eq!(TelephonyMode::parse("gather"), Some(TelephonyMode::Gather));
        assert_eq!(TelephonyMode::parse("sip"), None);
        assert_eq!(TelephonyMode::Gather.to_string(), "gather");
    }
}
