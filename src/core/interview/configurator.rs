//! Upstream session configuration for a scripted interview.

use std::fmt::Write;

use super::script::{InterviewPhrases, InterviewScript, InterviewSettings};
use super::utterance::{RealtimeUtterances, UtteranceSource};
use crate::core::realtime::RealtimeAudioFormat;
use crate::core::realtime::messages::{
    ClientEvent, InputAudioTranscription, MaxTokens, SessionConfig, TurnDetection,
};

/// Builds the `session.update` for one interview and the events that start it.
#[derive(Debug, Clone)]
pub struct SessionConfigurator {
    script: InterviewScript,
    settings: InterviewSettings,
    phrases: InterviewPhrases,
    audio_format: RealtimeAudioFormat,
    seed_greeting: bool,
}

impl SessionConfigurator {
    pub fn new(
        script: InterviewScript,
        settings: InterviewSettings,
        phrases: InterviewPhrases,
        audio_format: RealtimeAudioFormat,
    ) -> Self {
        Self {
            script,
            settings,
            phrases,
            audio_format,
            seed_greeting: false,
        }
    }

    /// Seed an assistant greeting into the conversation before the first response.
    pub fn with_seed_greeting(mut self, enabled: bool) -> Self {
        self.seed_greeting = enabled;
        self
    }

    pub fn script(&self) -> &InterviewScript {
        &self.script
    }

    pub fn phrases(&self) -> &InterviewPhrases {
        &self.phrases
    }

    pub fn audio_format(&self) -> RealtimeAudioFormat {
        self.audio_format
    }

    /// Interviewer instructions: the questions in order, the rules, and the exact
    /// opening and closing lines.
    pub fn instructions(&self) -> String {
        let questions = self.script.effective_questions(&self.phrases);
        let title = self.script.display_title(&self.phrases);
        let opening = self.phrases.opening_line(title, &questions[0]);

        let mut text = String::new();
        let _ = writeln!(
            text,
            "You are an interviewer conducting the \"{}\" interview. Speak only {}.",
            title, self.phrases.language
        );
        let _ = writeln!(text);
        let _ = writeln!(text, "START IMMEDIATELY by saying: \"{}\"", opening);
        let _ = writeln!(text);
        let _ = writeln!(text, "ASK THESE QUESTIONS IN ORDER:");
        for (i, question) in questions.iter().enumerate() {
            let _ = writeln!(text, "{}. {}", i + 1, question);
        }
        let _ = writeln!(text);
        let _ = writeln!(text, "RULES:");
        let _ = writeln!(text, "- Ask exactly one question at a time");
        let _ = writeln!(text, "- Wait for the answer before moving on");
        let _ = writeln!(
            text,
            "- If an answer is vague or negative, you may ask one short natural follow-up such as asking what was missing"
        );
        let _ = writeln!(text, "- Never invent new interview questions");
        let _ = writeln!(
            text,
            "- Keep every reply under {} words",
            self.settings.max_reply_words
        );
        let _ = write!(
            text,
            "- When every question has been answered, say exactly: \"{}\" and stop",
            self.phrases.closing
        );
        text
    }

    /// The `session.update` event.
    pub fn session_update(&self) -> ClientEvent {
        let format = self.audio_format.as_str().to_string();
        ClientEvent::SessionUpdate {
            session: SessionConfig {
                modalities: Some(vec!["text".to_string(), "audio".to_string()]),
                instructions: Some(self.instructions()),
                voice: Some(self.settings.voice.as_str().to_string()),
                input_audio_format: Some(format.clone()),
                output_audio_format: Some(format),
                input_audio_transcription: Some(InputAudioTranscription {
                    model: self.settings.transcription_model.clone(),
                }),
                turn_detection: Some(TurnDetection::ServerVad {
                    threshold: Some(self.settings.vad_threshold),
                    prefix_padding_ms: Some(self.settings.vad_prefix_padding_ms),
                    silence_duration_ms: Some(self.settings.vad_silence_duration_ms),
                }),
                temperature: Some(self.settings.temperature),
                max_response_output_tokens: Some(MaxTokens::Number(
                    self.settings.max_response_output_tokens,
                )),
            },
        }
    }

    /// Events to send once the upstream confirms `session.updated`.
    pub fn on_configured(&self) -> Vec<ClientEvent> {
        self.utterances().opening().into_events()
    }

    /// Line source for the live session.
    pub fn utterances(&self) -> RealtimeUtterances {
        let title = self.script.display_title(&self.phrases);
        let seed = self
            .seed_greeting
            .then(|| InterviewPhrases::render(&self.phrases.browser_seed, title));
        RealtimeUtterances::new(seed)
    }
}
