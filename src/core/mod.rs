pub mod audio;
pub mod interview;
pub mod playback;
pub mod realtime;
pub mod relay;
pub mod store;
pub mod telephony;

// Re-export commonly used types for convenience
pub use audio::{AudioCodecError, decode_from_transport, encode_for_transport};

pub use playback::{PlaybackEntry, PlaybackError, PlaybackQueue, PlaybackSink};

pub use realtime::{
    RealtimeBackend, RealtimeError, RealtimeProvider, RealtimeProviderConfig, RealtimeResult,
    UpstreamConnector, UpstreamLink, WebSocketConnector, create_realtime_backend,
    get_supported_realtime_providers,
};

pub use interview::{
    ConversationState, InterviewPhrases, InterviewScript, InterviewSettings, SessionConfigurator,
    TurnEngine, TurnInstruction,
};

pub use relay::{ClientKind, RelayOutcome, RelaySession};

pub use store::{
    ConversationStore, InMemoryConversationStore, InMemoryInterviewRepository,
    InterviewRepository, StoreError,
};
