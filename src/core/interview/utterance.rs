//! What the agent says next.
//!
//! Both transports drive the same script. In webhook mode the gateway speaks
//! fixed lines itself ([`ScriptedUtterances`]); in relay mode the realtime
//! model generates speech from its instructions and the gateway only triggers
//! it ([`RealtimeUtterances`]).

use super::script::{InterviewPhrases, InterviewScript};
use crate::core::realtime::messages::{ClientEvent, ConversationItem};

/// The next thing the agent says.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentUtterance {
    /// Speak this exact text
    Speak {
        text: String,
        /// No reply is expected; the conversation ends after this line
        ends_conversation: bool,
    },
    /// Let the realtime model generate the line, optionally seeded with an
    /// assistant message first
    Generate { seed: Option<String> },
}

impl AgentUtterance {
    fn speak(text: impl Into<String>) -> Self {
        AgentUtterance::Speak {
            text: text.into(),
            ends_conversation: false,
        }
    }

    fn last(text: impl Into<String>) -> Self {
        AgentUtterance::Speak {
            text: text.into(),
            ends_conversation: true,
        }
    }

    /// Spoken text, if this is a fixed line.
    pub fn text(&self) -> Option<&str> {
        match self {
            AgentUtterance::Speak { text, .. } => Some(text),
            AgentUtterance::Generate { .. } => None,
        }
    }

    pub fn ends_conversation(&self) -> bool {
        matches!(
            self,
            AgentUtterance::Speak {
                ends_conversation: true,
                ..
            }
        )
    }

    /// Upstream events that make the realtime model produce this utterance.
    ///
    /// A fixed line is seeded as an assistant message and spoken from there.
    pub fn into_events(self) -> Vec<ClientEvent> {
        let seed = match self {
            AgentUtterance::Speak { text, .. } => Some(text),
            AgentUtterance::Generate { seed } => seed,
        };

        let mut events = Vec::with_capacity(2);
        if let Some(text) = seed {
            events.push(ClientEvent::ConversationItemCreate {
                item: ConversationItem::text_message("assistant", text),
            });
        }
        events.push(ClientEvent::ResponseCreate);
        events
    }
}

/// Source of agent lines at each point of an interview.
pub trait UtteranceSource: Send + Sync {
    /// First line of the conversation.
    fn opening(&self) -> AgentUtterance;

    /// Line after the question at `answered_index` has been answered.
    fn after_answer(&self, answered_index: usize) -> AgentUtterance;

    /// Line when the caller said nothing while `current_index` was pending.
    fn reprompt(&self, current_index: usize, completed: bool) -> AgentUtterance;
}

/// Fixed lines straight from the script, for the webhook loop.
#[derive(Debug, Clone)]
pub struct ScriptedUtterances {
    questions: Vec<String>,
    phrases: InterviewPhrases,
}

impl ScriptedUtterances {
    pub fn new(script: &InterviewScript, phrases: &InterviewPhrases) -> Self {
        Self {
            questions: script.effective_questions(phrases),
            phrases: phrases.clone(),
        }
    }

    /// Number of questions, never zero.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    fn question(&self, index: usize) -> &str {
        let last = self.questions.len() - 1;
        &self.questions[index.min(last)]
    }
}

impl UtteranceSource for ScriptedUtterances {
    fn opening(&self) -> AgentUtterance {
        AgentUtterance::speak(self.question(0))
    }

    fn after_answer(&self, answered_index: usize) -> AgentUtterance {
        let next = answered_index + 1;
        if next < self.questions.len() {
            AgentUtterance::speak(self.phrases.follow_on(self.question(next)))
        } else {
            AgentUtterance::last(self.phrases.closing.clone())
        }
    }

    fn reprompt(&self, current_index: usize, completed: bool) -> AgentUtterance {
        if completed || current_index >= self.questions.len() {
            AgentUtterance::last(self.phrases.closing.clone())
        } else {
            AgentUtterance::speak(self.question(current_index))
        }
    }
}

/// Model-generated lines, for the full-duplex relay.
///
/// The instructions already carry the script, so every point of the interview
/// is a plain generate request. Only the opening may carry a seed greeting.
#[derive(Debug, Clone, Default)]
pub struct RealtimeUtterances {
    seed_greeting: Option<String>,
}

impl RealtimeUtterances {
    pub fn new(seed_greeting: Option<String>) -> Self {
        Self { seed_greeting }
    }
}

impl UtteranceSource for RealtimeUtterances {
    fn opening(&self) -> AgentUtterance {
        AgentUtterance::Generate {
            seed: self.seed_greeting.clone(),
        }
    }

    fn after_answer(&self, _answered_index: usize) -> AgentUtterance {
        AgentUtterance::Generate { seed: None }
    }

    fn reprompt(&self, _current_index: usize, _completed: bool) -> AgentUtterance {
        AgentUtterance::Generate { seed: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(questions: &[&str]) -> ScriptedUtterances {
        ScriptedUtterances::new(
            &InterviewScript::new(
                "i",
                "t",
                questions.iter().map(|q| q.to_string()).collect(),
            ),
            &InterviewPhrases::default(),
        )
    }

    #[test]
    fn test_scripted_progression() {
        let s = scripted(&["Q1", "Q2"]);
        assert_eq!(s.opening().text(), Some("Q1"));
        assert_eq!(s.after_answer(0).text(), Some("Kiitos vastauksesta. Q2"));

        let closing = s.after_answer(1);
        assert!(closing.ends_conversation());
        assert_eq!(
            closing.text(),
            Some("Kiitos kaikista vastauksista! Haastattelu on valmis.")
        );
    }

    #[test]
    fn test_scripted_reprompt() {
        let s = scripted(&["Q1", "Q2"]);
        assert_eq!(s.reprompt(1, false).text(), Some("Q2"));
        assert!(s.reprompt(2, true).ends_conversation());
    }

    #[test]
    fn test_realtime_opening_events() {
        let seeded = RealtimeUtterances::new(Some("Hei!".into())).opening().into_events();
        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded[1], ClientEvent::ResponseCreate);

        let plain = RealtimeUtterances::default().opening().into_events();
        assert_eq!(plain, vec![ClientEvent::ResponseCreate]);
    }

    #[test]
    fn test_fixed_line_as_events() {
        let events = scripted(&["Q1"]).opening().into_events();
        match &events[0] {
            ClientEvent::ConversationItemCreate { item } => {
                let json = serde_json::to_value(item).unwrap();
                assert_eq!(json["content"][0]["text"], "Q1");
            }
            other => panic!("Expected item, got {:?}", other),
        }
    }
}
