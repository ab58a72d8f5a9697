//! Interview scripts, spoken phrases and agent settings.

use serde::{Deserialize, Serialize};

use crate::core::realtime::{RealtimeAudioFormat, RealtimeVoice};

/// An interview as configured by its author. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewScript {
    /// Unique interview identifier
    pub id: String,
    /// Title spoken in greetings
    #[serde(default)]
    pub title: String,
    /// Questions in the order they are asked
    #[serde(default)]
    pub questions: Vec<String>,
}

impl InterviewScript {
    pub fn new(id: impl Into<String>, title: impl Into<String>, questions: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            questions,
        }
    }

    /// Non-blank questions, or the fallback question when there are none.
    ///
    /// The result is never empty, so an agent always has something to ask.
    pub fn effective_questions(&self, phrases: &InterviewPhrases) -> Vec<String> {
        let questions: Vec<String> = self
            .questions
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect();

        if questions.is_empty() {
            vec![phrases.fallback_question.clone()]
        } else {
            questions
        }
    }

    /// Title to speak, or the generic one when the script has none.
    pub fn display_title<'a>(&'a self, phrases: &'a InterviewPhrases) -> &'a str {
        let title = self.title.trim();
        if title.is_empty() {
            &phrases.default_title
        } else {
            title
        }
    }
}

/// Everything the agent says that is not a question.
///
/// `{title}` in a phrase is replaced by the interview title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewPhrases {
    /// Language the agent speaks, named in the model instructions
    pub language: String,
    /// Greeting spoken before the first question
    pub opening: String,
    /// Greeting on an incoming call before the media stream attaches
    pub call_greeting: String,
    /// Assistant message seeded into browser sessions
    pub browser_seed: String,
    /// Prefix before each follow-on question
    pub acknowledgment: String,
    /// Final line; the call ends after it
    pub closing: String,
    /// Spoken when the caller says nothing before the gather times out
    pub no_answer: String,
    /// Spoken when no interview can be resolved
    pub not_found: String,
    /// Spoken when the turn cannot be processed
    pub error: String,
    /// Asked when a script has no usable questions
    pub fallback_question: String,
    /// Title used when a script has none
    pub default_title: String,
}

impl Default for InterviewPhrases {
    fn default() -> Self {
        Self {
            language: "Finnish".to_string(),
            opening: "Hei! Aloitetaan {title} haastattelu.".to_string(),
            call_greeting: "Hei! Aloitetaan {title} haastattelu. Hetki kun yhdistän sinut tekoälyyn."
                .to_string(),
            browser_seed:
                "Hei! Olen haastattelija. Aloitetaan haastattelu - kerro vapaasti ajatuksiasi."
                    .to_string(),
            acknowledgment: "Kiitos vastauksesta.".to_string(),
            closing: "Kiitos kaikista vastauksista! Haastattelu on valmis.".to_string(),
            no_answer: "En kuullut vastausta. Lopetan puhelun.".to_string(),
            not_found: "Anteeksi, en löydä aktiivista haastattelua.".to_string(),
            error: "Tapahtui virhe. Lopetan puhelun.".to_string(),
            fallback_question: "Kerro itsestäsi.".to_string(),
            default_title: "haastattelu".to_string(),
        }
    }
}

impl InterviewPhrases {
    /// Fill `{title}` in a phrase.
    pub fn render(template: &str, title: &str) -> String {
        template.replace("{title}", title)
    }

    /// Opening line followed by the first question.
    pub fn opening_line(&self, title: &str, first_question: &str) -> String {
        format!("{} {}", Self::render(&self.opening, title), first_question)
    }

    /// Acknowledgment followed by the next question.
    pub fn follow_on(&self, question: &str) -> String {
        format!("{} {}", self.acknowledgment, question)
    }
}

/// Agent voice and model parameters shared by every session.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSettings {
    /// Realtime model voice
    pub voice: RealtimeVoice,
    /// Input transcription model
    pub transcription_model: String,
    /// VAD activation threshold
    pub vad_threshold: f32,
    /// Audio kept before detected speech, in ms
    pub vad_prefix_padding_ms: u32,
    /// Silence that ends a user turn, in ms
    pub vad_silence_duration_ms: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Cap on each spoken reply
    pub max_response_output_tokens: u32,
    /// Word limit stated in the instructions
    pub max_reply_words: u32,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            voice: RealtimeVoice::Alloy,
            transcription_model: "whisper-1".to_string(),
            vad_threshold: 0.5,
            vad_prefix_padding_ms: 300,
            vad_silence_duration_ms: 1000,
            temperature: 0.7,
            max_response_output_tokens: 100,
            max_reply_words: 20,
        }
    }
}

/// Audio format for the two client kinds.
pub fn audio_format_for(telephony: bool) -> RealtimeAudioFormat {
    if telephony {
        RealtimeAudioFormat::G711Ulaw
    } else {
        RealtimeAudioFormat::Pcm16
    }
}
