//! Half-duplex interview turns through the engine and its stores.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use interview_gateway::core::interview::{InboundTurn, MAX_CONFLICT_RETRIES, Speaker};
use interview_gateway::core::store::StoreResult;
use interview_gateway::{
    ConversationState, ConversationStore, InMemoryConversationStore, InMemoryInterviewRepository,
    InterviewPhrases, InterviewScript, StoreError, TurnEngine, TurnInstruction,
};

fn engine_with(
    scripts: Vec<InterviewScript>,
    conversations: Arc<dyn ConversationStore>,
) -> TurnEngine {
    TurnEngine::new(
        Arc::new(InMemoryInterviewRepository::new(scripts)),
        conversations,
        InterviewPhrases::default(),
    )
}

fn turn(call_id: &str, utterance: Option<&str>) -> InboundTurn {
    InboundTurn {
        call_id: call_id.to_string(),
        utterance: utterance.map(str::to_owned),
        interview_id: None,
    }
}

fn three_questions() -> InterviewScript {
    InterviewScript::new(
        "int-3",
        "Kurssi",
        vec!["Q1".to_string(), "Q2".to_string(), "Q3".to_string()],
    )
}

#[tokio::test]
async fn test_full_interview_sequence() {
    let store = Arc::new(InMemoryConversationStore::new());
    let engine = engine_with(vec![three_questions()], store.clone());
    let phrases = InterviewPhrases::default();

    let reply = engine.handle(&turn("CA1", None)).await.unwrap();
    assert_eq!(reply.instruction, TurnInstruction::Continue { say: "Q1".to_string() });
    assert!(reply.persisted);

    let reply = engine.handle(&turn("CA1", Some("A1"))).await.unwrap();
    assert_eq!(reply.instruction.say(), "Kiitos vastauksesta. Q2");
    assert_eq!(reply.question_index, 1);

    let reply = engine.handle(&turn("CA1", Some("A2"))).await.unwrap();
    assert_eq!(reply.instruction.say(), "Kiitos vastauksesta. Q3");

    let reply = engine.handle(&turn("CA1", Some("A3"))).await.unwrap();
    assert_eq!(
        reply.instruction,
        TurnInstruction::Hangup {
            say: phrases.closing.clone()
        }
    );
    assert_eq!(reply.question_index, 3);

    let state = store.get("CA1").await.unwrap().unwrap();
    assert!(state.completed);
    assert_eq!(state.question_index, 3);
    assert_eq!(state.answer_count(), 3);
    assert_eq!(state.revision, 4);
    let roles: Vec<Speaker> = state.transcript.iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![
            Speaker::Assistant,
            Speaker::User,
            Speaker::Assistant,
            Speaker::User,
            Speaker::Assistant,
            Speaker::User,
            Speaker::Assistant,
        ]
    );
}

#[tokio::test]
async fn test_one_question_interview() {
    let script = InterviewScript::new("one", "Lyhyt", vec!["Only?".to_string()]);
    let engine = engine_with(vec![script], Arc::new(InMemoryConversationStore::new()));

    let first = engine.handle(&turn("CA2", None)).await.unwrap();
    assert_eq!(first.instruction.say(), "Only?");
    assert!(!first.instruction.is_hangup());

    let last = engine.handle(&turn("CA2", Some("Yes"))).await.unwrap();
    assert!(last.instruction.is_hangup());
    assert_eq!(last.question_index, 1);
}

#[tokio::test]
async fn test_empty_script_uses_fallback_question() {
    let script = InterviewScript::new("empty", "Tyhjä", vec!["  ".to_string()]);
    let engine = engine_with(vec![script], Arc::new(InMemoryConversationStore::new()));

    let reply = engine.handle(&turn("CA3", None)).await.unwrap();
    assert_eq!(
        reply.instruction.say(),
        InterviewPhrases::default().fallback_question
    );
}

#[tokio::test]
async fn test_first_turn_with_utterance_does_not_advance() {
    let store = Arc::new(InMemoryConversationStore::new());
    let engine = engine_with(vec![three_questions()], store.clone());

    let reply = engine.handle(&turn("CA4", Some("Hello?"))).await.unwrap();
    assert_eq!(reply.instruction.say(), "Q1");
    assert_eq!(reply.question_index, 0);

    let state = store.get("CA4").await.unwrap().unwrap();
    assert_eq!(state.answer_count(), 1);
}

#[tokio::test]
async fn test_call_stays_on_its_interview() {
    let store = Arc::new(InMemoryConversationStore::new());
    let other = InterviewScript::new("later", "Uusi", vec!["Other?".to_string()]);
    let repository = Arc::new(InMemoryInterviewRepository::new(vec![three_questions()]));
    let engine = TurnEngine::new(repository.clone(), store, InterviewPhrases::default());

    engine.handle(&turn("CA5", None)).await.unwrap();
    // A newer interview appears mid-call
    repository.insert(other);

    let reply = engine.handle(&turn("CA5", Some("A1"))).await.unwrap();
    assert_eq!(reply.instruction.say(), "Kiitos vastauksesta. Q2");
}

#[tokio::test]
async fn test_concurrent_answers_never_skip_questions() {
    let store = Arc::new(InMemoryConversationStore::new());
    let engine = Arc::new(engine_with(vec![three_questions()], store.clone()));
    engine.handle(&turn("CA6", None)).await.unwrap();

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.handle(&turn("CA6", Some("first"))).await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.handle(&turn("CA6", Some("second"))).await })
    };
    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert!(a.persisted && b.persisted);

    // Each answer moved the interview exactly one question forward
    let state = store.get("CA6").await.unwrap().unwrap();
    assert_eq!(state.question_index, 2);
    assert_eq!(state.answer_count(), 2);
    assert_eq!(state.revision, 3);
}

/// Store whose every call fails.
struct UnavailableStore {
    calls: AtomicUsize,
}

#[async_trait]
impl ConversationStore for UnavailableStore {
    async fn get(&self, _call_id: &str) -> StoreResult<Option<ConversationState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("offline".to_string()))
    }

    async fn create(&self, _state: ConversationState) -> StoreResult<ConversationState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("offline".to_string()))
    }

    async fn update_if_revision(
        &self,
        _state: ConversationState,
        _expected_revision: u64,
    ) -> StoreResult<ConversationState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("offline".to_string()))
    }
}

#[tokio::test]
async fn test_store_outage_degrades_to_stateless_turn() {
    let store = Arc::new(UnavailableStore {
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(vec![three_questions()], store.clone());

    let reply = engine.handle(&turn("CA7", Some("A1"))).await.unwrap();
    assert_eq!(reply.instruction.say(), "Q1");
    assert!(!reply.persisted);
    // Load and persist are each retried once
    assert_eq!(store.calls.load(Ordering::SeqCst), 4);
}

/// Always holds revision 1 of a call but never accepts a write.
struct ContendedStore {
    updates: AtomicUsize,
}

#[async_trait]
impl ConversationStore for ContendedStore {
    async fn get(&self, call_id: &str) -> StoreResult<Option<ConversationState>> {
        let mut state = ConversationState::new(call_id, "int-3");
        state.revision = 1;
        Ok(Some(state))
    }

    async fn create(&self, state: ConversationState) -> StoreResult<ConversationState> {
        Err(StoreError::AlreadyExists(state.call_id))
    }

    async fn update_if_revision(
        &self,
        state: ConversationState,
        expected_revision: u64,
    ) -> StoreResult<ConversationState> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::RevisionConflict {
            key: state.call_id,
            expected: expected_revision,
            found: expected_revision + 1,
        })
    }
}

#[tokio::test]
async fn test_exhausted_conflict_retries_answer_without_persisting() {
    let store = Arc::new(ContendedStore {
        updates: AtomicUsize::new(0),
    });
    let engine = engine_with(vec![three_questions()], store.clone());

    let reply = engine.handle(&turn("CA9", Some("A1"))).await.unwrap();
    assert!(!reply.persisted);
    assert_eq!(reply.instruction.say(), "Kiitos vastauksesta. Q2");
    assert_eq!(reply.question_index, 1);
    assert_eq!(
        store.updates.load(Ordering::SeqCst),
        MAX_CONFLICT_RETRIES + 1
    );
}

#[tokio::test]
async fn test_no_interviews_hangs_up_with_apology() {
    let engine = engine_with(Vec::new(), Arc::new(InMemoryConversationStore::new()));
    let reply = engine.handle(&turn("CA8", None)).await.unwrap();
    assert_eq!(
        reply.instruction,
        TurnInstruction::Hangup {
            say: InterviewPhrases::default().not_found
        }
    );
    assert!(!reply.persisted);
}
