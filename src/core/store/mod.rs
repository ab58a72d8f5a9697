//! Storage collaborators.
//!
//! - [`ConversationStore`] - per-call interview progress with conditional update
//! - [`InterviewRepository`] - interview scripts by id, with latest fallback
//!
//! Both are traits so a deployment can back them with a real database; the
//! gateway ships in-memory implementations.

mod conversation;
mod interviews;

pub use conversation::{ConversationStore, InMemoryConversationStore};
pub use interviews::{InMemoryInterviewRepository, InterviewRepository, InterviewsFile};

use thiserror::Error;

/// Errors raised by storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `create` found an existing record
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// Conditional update lost a race
    #[error("Revision conflict for {key}: expected {expected}, found {found}")]
    RevisionConflict {
        key: String,
        expected: u64,
        found: u64,
    },

    /// Record missing
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Source data could not be loaded
    #[error("Failed to load: {0}")]
    Load(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
