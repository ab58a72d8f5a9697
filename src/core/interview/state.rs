//! Persisted progress of a half-duplex interview call.

use serde::{Deserialize, Serialize};

/// Who spoke a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Speaker,
    pub text: String,
    /// Unix epoch milliseconds
    pub timestamp_ms: u64,
}

/// Progress of one call, keyed by `call_id` in the conversation store.
///
/// `question_index` only grows and never exceeds the question count; reaching
/// the count means the interview is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Telephony call identifier
    pub call_id: String,
    /// Interview the call is bound to
    pub interview_id: String,
    /// Index of the question currently awaiting an answer
    pub question_index: usize,
    /// Set once the closing line has been spoken
    pub completed: bool,
    /// Everything said so far
    pub transcript: Vec<TranscriptEntry>,
    /// Incremented by the store on every successful write
    pub revision: u64,
}

impl ConversationState {
    /// A fresh state for the first turn of a call. Revision 0 means never stored.
    pub fn new(call_id: impl Into<String>, interview_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            interview_id: interview_id.into(),
            question_index: 0,
            completed: false,
            transcript: Vec::new(),
            revision: 0,
        }
    }

    pub fn push(&mut self, role: Speaker, text: impl Into<String>, timestamp_ms: u64) {
        self.transcript.push(TranscriptEntry {
            role,
            text: text.into(),
            timestamp_ms,
        });
    }

    /// Number of answers recorded.
    pub fn answer_count(&self) -> usize {
        self.transcript
            .iter()
            .filter(|e| e.role == Speaker::User)
            .count()
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_serialization() {
        let mut state = ConversationState::new("CA1", "int-1");
        state.push(Speaker::Assistant, "Mikä nimesi on?", 10);
        state.push(Speaker::User, "Matti", 20);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["transcript"][0]["role"], "assistant");
        assert_eq!(json["transcript"][1]["role"], "user");
        assert_eq!(state.answer_count(), 1);

        let back: ConversationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_now_ms_is_epoch_milliseconds() {
        let before = now_ms();
        // 2020-01-01T00:00:00Z
        assert!(before > 1_577_836_800_000);
        assert!(now_ms() >= before);
    }
}
