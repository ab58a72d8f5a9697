use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{StoreError, StoreResult};
use crate::core::interview::ConversationState;

/// Durable record of call progress, keyed by call id.
///
/// Writers compare-and-swap on [`ConversationState::revision`]; the store
/// assigns the new revision on every successful write.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, call_id: &str) -> StoreResult<Option<ConversationState>>;

    /// Insert a new record. Fails with [`StoreError::AlreadyExists`] when the
    /// call already has one. Returns the stored state.
    async fn create(&self, state: ConversationState) -> StoreResult<ConversationState>;

    /// Replace the record if its revision still equals `expected_revision`.
    /// Returns the stored state.
    async fn update_if_revision(
        &self,
        state: ConversationState,
        expected_revision: u64,
    ) -> StoreResult<ConversationState>;
}

/// Process-local conversation store.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    records: DashMap<String, ConversationState>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, call_id: &str) -> StoreResult<Option<ConversationState>> {
        Ok(self.records.get(call_id).map(|r| r.value().clone()))
    }

    async fn create(&self, mut state: ConversationState) -> StoreResult<ConversationState> {
        match self.records.entry(state.call_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(state.call_id)),
            Entry::Vacant(slot) => {
                state.revision = 1;
                slot.insert(state.clone());
                Ok(state)
            }
        }
    }

    async fn update_if_revision(
        &self,
        mut state: ConversationState,
        expected_revision: u64,
    ) -> StoreResult<ConversationState> {
        match self.records.get_mut(&state.call_id) {
            None => Err(StoreError::NotFound(state.call_id)),
            Some(mut current) => {
                if current.revision != expected_revision {
                    return Err(StoreError::RevisionConflict {
                        key: state.call_id,
                        expected: expected_revision,
                        found: current.revision,
                    });
                }
                state.revision = expected_revision + 1;
                *current = state.clone();
                Ok(state)
            }
        }
    }
}
