//! Scripted interview logic shared by both transports.
//!
//! - [`SessionConfigurator`] - upstream instructions for the full-duplex relay
//! - [`advance`] / [`TurnEngine`] - question progression for the webhook loop
//! - [`UtteranceSource`] - what the agent says next, in either mode

mod configurator;
mod script;
mod state;
mod turn;
mod utterance;

pub use configurator::SessionConfigurator;
pub use script::{InterviewPhrases, InterviewScript, InterviewSettings, audio_format_for};
pub use state::{ConversationState, Speaker, TranscriptEntry, now_ms};
pub use turn::{
    InboundTurn, MAX_CONFLICT_RETRIES, TurnDecision, TurnEngine, TurnError, TurnInstruction,
    TurnReply, advance,
};
pub use utterance::{AgentUtterance, RealtimeUtterances, ScriptedUtterances, UtteranceSource};
