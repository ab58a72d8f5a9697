//! Shared application state.
//!
//! One [`AppState`] is built at startup and shared by every handler behind an
//! `Arc`. It owns the configuration, the storage collaborators, the upstream
//! connector and the WebSocket connection counters.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::core::interview::{InterviewScript, SessionConfigurator, TurnEngine, audio_format_for};
use crate::core::realtime::{UpstreamConnector, WebSocketConnector};
use crate::core::store::{
    ConversationStore, InMemoryConversationStore, InMemoryInterviewRepository,
    InterviewRepository, StoreResult,
};

/// Why a WebSocket upgrade was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLimitError {
    /// `max_websocket_connections` reached
    GlobalLimitReached,
    /// `max_connections_per_ip` reached for the caller's address
    PerIpLimitReached,
}

pub struct AppState {
    pub config: ServerConfig,
    pub interviews: Arc<dyn InterviewRepository>,
    pub conversations: Arc<dyn ConversationStore>,
    pub connector: Arc<dyn UpstreamConnector>,
    pub turn_engine: TurnEngine,

    // Connection tracking
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, usize>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// Interviews are loaded from `interviews_path` when set; conversations are
    /// kept in memory.
    pub async fn new(config: ServerConfig) -> StoreResult<Arc<Self>> {
        let interviews = match &config.interviews_path {
            Some(path) => InMemoryInterviewRepository::from_yaml_file(path)?,
            None => {
                info!("INTERVIEWS_PATH not set, starting with no interviews");
                InMemoryInterviewRepository::default()
            }
        };
        let connector = WebSocketConnector::new(config.realtime_provider_config());

        Ok(Self::from_parts(
            config,
            Arc::new(interviews),
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(connector),
        ))
    }

    /// Build state around caller-supplied collaborators.
    pub fn from_parts(
        config: ServerConfig,
        interviews: Arc<dyn InterviewRepository>,
        conversations: Arc<dyn ConversationStore>,
        connector: Arc<dyn UpstreamConnector>,
    ) -> Arc<Self> {
        let turn_engine = TurnEngine::new(
            interviews.clone(),
            conversations.clone(),
            config.phrases.clone(),
        );

        Arc::new(Self {
            config,
            interviews,
            conversations,
            connector,
            turn_engine,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        })
    }

    /// Upstream configuration for one relay session.
    pub fn session_configurator(
        &self,
        script: InterviewScript,
        telephony: bool,
    ) -> SessionConfigurator {
        SessionConfigurator::new(
            script,
            self.config.interview_settings(),
            self.config.phrases.clone(),
            audio_format_for(telephony),
        )
        .with_seed_greeting(!telephony)
    }

    // =========================================================================
    // Connection limits
    // =========================================================================

    /// Reserve a WebSocket slot for `ip`.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let max_global = self.config.max_websocket_connections;
        let reserved = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                match max_global {
                    Some(max) if current >= max => None,
                    _ => Some(current + 1),
                }
            });
        if reserved.is_err() {
            return Err(ConnectionLimitError::GlobalLimitReached);
        }

        let max_per_ip = self.config.max_connections_per_ip as usize;
        let mut count = self.ip_connections.entry(ip).or_insert(0);
        if *count >= max_per_ip {
            drop(count);
            self.ip_connections.remove_if(&ip, |_, c| *c == 0);
            self.ws_connections.fetch_sub(1, Ordering::SeqCst);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *count += 1;
        debug!(ip = %ip, ip_connections = *count, "WebSocket slot acquired");
        Ok(())
    }

    /// Return a slot taken by [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_sub(1)
            });

        if let Some(mut count) = self.ip_connections.get_mut(&ip) {
            *count = count.saturating_sub(1);
        }
        self.ip_connections.remove_if(&ip, |_, c| *c == 0);
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> usize {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }
}

/// Releases a connection slot when dropped.
pub struct ConnectionGuard {
    state: Arc<AppState>,
    ip: Option<IpAddr>,
}

impl ConnectionGuard {
    /// Guard for a slot already acquired for `ip`; `None` guards nothing.
    pub fn new(state: Arc<AppState>, ip: Option<IpAddr>) -> Self {
        Self { state, ip }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(ip) = self.ip.take() {
            self.state.release_connection(ip);
        }
    }
}
