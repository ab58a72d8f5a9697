//! Half-duplex turn progression.
//!
//! Each webhook invocation carries only a call id and maybe a transcribed
//! utterance. [`advance`] is the pure step from stored progress to the next
//! line; [`TurnEngine`] wraps it with script lookup and conditional
//! persistence so every invocation starts from what the store holds.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::script::{InterviewPhrases, InterviewScript};
use super::state::{ConversationState, Speaker, now_ms};
use super::utterance::{AgentUtterance, ScriptedUtterances, UtteranceSource};
use crate::core::store::{ConversationStore, InterviewRepository, StoreError};

/// Reload-and-recompute attempts after losing a revision race.
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// Errors that end a turn with an apology instead of a question.
#[derive(Debug, Error)]
pub enum TurnError {
    /// No interview could be resolved for the call
    #[error("Interview not found: {0}")]
    InterviewNotFound(String),

    /// The interview source failed
    #[error("Interview lookup failed: {0}")]
    Lookup(#[from] StoreError),
}

/// One webhook invocation.
#[derive(Debug, Clone, Default)]
pub struct InboundTurn {
    /// Telephony call identifier
    pub call_id: String,
    /// Transcribed caller speech, if any was captured
    pub utterance: Option<String>,
    /// Interview requested by the webhook URL
    pub interview_id: Option<String>,
}

impl InboundTurn {
    /// Utterance with surrounding whitespace removed; blank counts as absent.
    pub fn spoken(&self) -> Option<&str> {
        self.utterance
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// What the telephony gateway should do after speaking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnInstruction {
    /// Speak, then listen for the next answer
    Continue { say: String },
    /// Speak, then end the call
    Hangup { say: String },
}

impl TurnInstruction {
    pub fn say(&self) -> &str {
        match self {
            TurnInstruction::Continue { say } | TurnInstruction::Hangup { say } => say,
        }
    }

    pub fn is_hangup(&self) -> bool {
        matches!(self, TurnInstruction::Hangup { .. })
    }
}

/// Result of the pure step.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnDecision {
    /// State to persist
    pub state: ConversationState,
    pub instruction: TurnInstruction,
}

/// Compute the next line and the new state.
///
/// - No stored state: first turn, ask the first question. An utterance is
///   recorded but answers nothing.
/// - Utterance while a question is pending: move to the next question, or
///   close once the last one is answered.
/// - No utterance: repeat the pending question.
/// - Already complete: repeat the closing line.
pub fn advance(
    stored: Option<ConversationState>,
    inbound: &InboundTurn,
    script: &InterviewScript,
    phrases: &InterviewPhrases,
    timestamp_ms: u64,
) -> TurnDecision {
    let lines = ScriptedUtterances::new(script, phrases);
    let total = lines.question_count();
    let spoken = inbound.spoken();

    let (mut state, utterance) = match stored {
        None => {
            let mut state = ConversationState::new(&inbound.call_id, &script.id);
            if let Some(text) = spoken {
                state.push(Speaker::User, text, timestamp_ms);
            }
            (state, lines.opening())
        }
        Some(mut state) => {
            if let Some(text) = spoken {
                state.push(Speaker::User, text, timestamp_ms);
            }

            let utterance = match spoken {
                Some(_) if !state.completed && state.question_index < total => {
                    lines.after_answer(state.question_index)
                }
                _ => lines.reprompt(state.question_index, state.completed),
            };

            if utterance.ends_conversation() {
                state.question_index = total.max(state.question_index);
                state.completed = true;
            } else if spoken.is_some() && !state.completed {
                state.question_index += 1;
            }
            (state, utterance)
        }
    };

    let say = utterance.text().unwrap_or_default().to_string();
    state.push(Speaker::Assistant, say.clone(), timestamp_ms);

    let instruction = match utterance {
        AgentUtterance::Speak {
            ends_conversation: true,
            ..
        } => TurnInstruction::Hangup { say },
        _ => TurnInstruction::Continue { say },
    };

    TurnDecision { state, instruction }
}

/// Reply for one webhook invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub instruction: TurnInstruction,
    /// Question pending after this turn, if the interview continues
    pub question_index: usize,
    /// The new state reached the store
    pub persisted: bool,
}

/// Runs [`advance`] against the stores.
pub struct TurnEngine {
    interviews: Arc<dyn InterviewRepository>,
    conversations: Arc<dyn ConversationStore>,
    phrases: InterviewPhrases,
}

impl TurnEngine {
    pub fn new(
        interviews: Arc<dyn InterviewRepository>,
        conversations: Arc<dyn ConversationStore>,
        phrases: InterviewPhrases,
    ) -> Self {
        Self {
            interviews,
            conversations,
            phrases,
        }
    }

    pub fn phrases(&self) -> &InterviewPhrases {
        &self.phrases
    }

    /// Process one invocation.
    ///
    /// Store outages are retried once and then the turn is answered without
    /// persistence. A missing interview yields the not-found apology and a
    /// hangup rather than an error.
    pub async fn handle(&self, inbound: &InboundTurn) -> Result<TurnReply, TurnError> {
        let mut stored = self.load_state(&inbound.call_id).await;

        let script = match self.resolve_script(inbound, stored.as_ref()).await {
            Ok(script) => script,
            Err(TurnError::InterviewNotFound(id)) => {
                info!(call_id = %inbound.call_id, interview_id = %id, "No interview for call");
                return Ok(TurnReply {
                    instruction: TurnInstruction::Hangup {
                        say: self.phrases.not_found.clone(),
                    },
                    question_index: 0,
                    persisted: false,
                });
            }
            Err(e) => return Err(e),
        };

        let mut conflicts = 0;
        loop {
            let decision = advance(stored.clone(), inbound, &script, &self.phrases, now_ms());
            let reply = |persisted| TurnReply {
                question_index: decision.state.question_index,
                instruction: decision.instruction.clone(),
                persisted,
            };

            let expected = stored.as_ref().map(|s| s.revision);
            match self.persist(decision.state.clone(), expected).await {
                Ok(()) => {
                    debug!(
                        call_id = %inbound.call_id,
                        question_index = decision.state.question_index,
                        completed = decision.state.completed,
                        "Turn persisted"
                    );
                    return Ok(reply(true));
                }
                Err(StoreError::RevisionConflict { .. } | StoreError::AlreadyExists(_))
                    if conflicts < MAX_CONFLICT_RETRIES =>
                {
                    conflicts += 1;
                    debug!(call_id = %inbound.call_id, attempt = conflicts, "Concurrent turn, reloading state");
                    stored = self.load_state(&inbound.call_id).await;
                }
                Err(e) => {
                    warn!(
                        call_id = %inbound.call_id,
                        error = %e,
                        "Answering turn without persistence"
                    );
                    return Ok(reply(false));
                }
            }
        }
    }

    async fn resolve_script(
        &self,
        inbound: &InboundTurn,
        stored: Option<&ConversationState>,
    ) -> Result<InterviewScript, TurnError> {
        // A call stays on the interview it started with
        let requested = stored
            .map(|s| s.interview_id.as_str())
            .or(inbound.interview_id.as_deref());

        let script = match self.interviews.resolve(requested).await {
            Ok(script) => script,
            Err(e) => {
                warn!(error = %e, "Interview lookup failed, retrying once");
                self.interviews.resolve(requested).await?
            }
        };

        script.ok_or_else(|| TurnError::InterviewNotFound(requested.unwrap_or("latest").to_string()))
    }

    async fn load_state(&self, call_id: &str) -> Option<ConversationState> {
        for attempt in 1..=2 {
            match self.conversations.get(call_id).await {
                Ok(state) => return state,
                Err(e) => warn!(call_id, attempt, error = %e, "Failed to load conversation state"),
            }
        }
        None
    }

    /// Create or conditionally update. Conflicts are returned to the caller;
    /// other failures are retried once.
    async fn persist(
        &self,
        state: ConversationState,
        expected_revision: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut last_error = None;
        for _ in 0..2 {
            let result = match expected_revision {
                None => self.conversations.create(state.clone()).await,
                Some(revision) => {
                    self.conversations
                        .update_if_revision(state.clone(), revision)
                        .await
                }
            };
            match result {
                Ok(_) => return Ok(()),
                Err(e @ (StoreError::RevisionConflict { .. } | StoreError::AlreadyExists(_))) => {
                    return Err(e);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| StoreError::Unavailable("persist failed".to_string())))
    }
}
