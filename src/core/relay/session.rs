//! Full-duplex relay between one client and one upstream model session.
//!
//! A [`RelaySession`] is owned by the connection task that created it. It
//! connects upstream, configures the interview, then forwards client audio up
//! and agent audio down until either side goes away. Both sides are always
//! closed together.

use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::messages::{BrowserIncomingMessage, ClientFrame, ClientRoute, RelayOutgoingMessage};
use super::sink::{ClientAudioSink, TelephonyMediaSink};
use crate::core::audio::{decode_from_transport, encode_for_transport, f32_frame_from_le_bytes};
use crate::core::interview::{SessionConfigurator, Speaker, TranscriptEntry, now_ms};
use crate::core::playback::PlaybackQueue;
use crate::core::realtime::messages::{ClientEvent, ConversationItem, ServerEvent};
use crate::core::realtime::{
    RealtimeError, RealtimeResult, UpstreamConnector, UpstreamFrame, UpstreamLink,
};
use crate::core::telephony::MediaStreamEvent;

/// Default bound on connect plus configure.
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(15);

/// How long teardown waits for the upstream close handshake.
const UPSTREAM_CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Connecting,
    Configuring,
    Active,
    Closing,
    Closed,
}

/// The client side of a relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKind {
    /// Browser: JSON control messages, WAV playback frames
    Browser,
    /// Telephony media stream: u-law passthrough in `media` frames
    Telephony {
        /// Stream the media frames belong to
        stream_sid: String,
    },
}

impl ClientKind {
    pub fn is_telephony(&self) -> bool {
        matches!(self, ClientKind::Telephony { .. })
    }
}

/// Why a relay session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Client socket closed
    ClientClosed,
    /// Browser sent `end`
    ClientEnded,
    /// Telephony stream sent `stop`
    TelephonyStopped,
    /// Upstream closed or failed
    UpstreamClosed { reason: Option<String> },
    /// Upstream connect or configuration failed
    SetupFailed(String),
    /// Setup did not finish within the setup timeout
    SetupTimedOut,
}

impl RelayOutcome {
    fn reason(&self) -> String {
        match self {
            RelayOutcome::ClientClosed => "client_closed".to_string(),
            RelayOutcome::ClientEnded => "client_ended".to_string(),
            RelayOutcome::TelephonyStopped => "telephony_stopped".to_string(),
            RelayOutcome::UpstreamClosed { .. } => "upstream_closed".to_string(),
            RelayOutcome::SetupFailed(_) => "setup_failed".to_string(),
            RelayOutcome::SetupTimedOut => "configuration_timeout".to_string(),
        }
    }
}

/// What a finished session leaves behind.
#[derive(Debug, Clone)]
pub struct RelaySummary {
    pub session_id: String,
    pub outcome: RelayOutcome,
    /// Lifecycle state at teardown; `Closed` once `run` returns
    pub state: RelayState,
    /// Final lines from both speakers, in order
    pub transcript: Vec<TranscriptEntry>,
}

/// Control flow after handling one frame.
enum Flow {
    Continue,
    Stop(RelayOutcome),
}

pub struct RelaySession {
    session_id: String,
    kind: ClientKind,
    configurator: SessionConfigurator,
    client_tx: mpsc::Sender<ClientRoute>,
    state: RelayState,
    setup_timeout: Duration,
    transcript: Vec<TranscriptEntry>,
    /// Assistant transcript deltas of the response in progress
    assistant_turn: String,
}

impl RelaySession {
    pub fn new(
        kind: ClientKind,
        configurator: SessionConfigurator,
        client_tx: mpsc::Sender<ClientRoute>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            kind,
            configurator,
            client_tx,
            state: RelayState::Connecting,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            transcript: Vec::new(),
            assistant_turn: String::new(),
        }
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Drive the session until either side ends it, then tear both down.
    pub async fn run<S>(mut self, connector: &dyn UpstreamConnector, mut inbound: S) -> RelaySummary
    where
        S: Stream<Item = ClientFrame> + Unpin + Send,
    {
        info!(
            session_id = %self.session_id,
            interview_id = %self.configurator.script().id,
            telephony = self.kind.is_telephony(),
            "Relay session starting"
        );

        let outcome = match self.setup(connector, &mut inbound).await {
            Ok(link) => self.relay(link, &mut inbound).await,
            Err(outcome) => {
                self.report_setup_failure(&outcome).await;
                outcome
            }
        };

        self.state = RelayState::Closing;
        if let ClientKind::Browser = self.kind {
            self.notify(RelayOutgoingMessage::Closing {
                reason: outcome.reason(),
            })
            .await;
        }
        let _ = self.client_tx.send(ClientRoute::Close).await;
        self.state = RelayState::Closed;

        info!(
            session_id = %self.session_id,
            outcome = ?outcome,
            entries = self.transcript.len(),
            "Relay session closed"
        );

        RelaySummary {
            session_id: self.session_id,
            outcome,
            state: self.state,
            transcript: self.transcript,
        }
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Connect and configure within the setup timeout, watching the client for
    /// an early hang-up meanwhile.
    async fn setup<S>(
        &mut self,
        connector: &dyn UpstreamConnector,
        inbound: &mut S,
    ) -> Result<UpstreamLink, RelayOutcome>
    where
        S: Stream<Item = ClientFrame> + Unpin + Send,
    {
        let session_id = self.session_id.clone();
        let telephony = self.kind.is_telephony();
        let timeout = self.setup_timeout;
        let establish = tokio::time::timeout(timeout, self.establish(connector));
        tokio::pin!(establish);

        loop {
            select! {
                result = &mut establish => {
                    return match result {
                        Ok(Ok(link)) => Ok(link),
                        Ok(Err(e)) => {
                            error!(session_id = %session_id, error = %e, "Upstream setup failed");
                            Err(RelayOutcome::SetupFailed(e.to_string()))
                        }
                        Err(_) => {
                            warn!(session_id = %session_id, timeout_ms = timeout.as_millis() as u64, "Upstream setup timed out");
                            Err(RelayOutcome::SetupTimedOut)
                        }
                    };
                }
                frame = inbound.next() => match frame {
                    None | Some(ClientFrame::Close) => return Err(RelayOutcome::ClientClosed),
                    Some(ClientFrame::Text(text)) => {
                        if let Some(outcome) = ending_frame(telephony, &text) {
                            return Err(outcome);
                        }
                        debug!(session_id = %session_id, "Dropping client frame during setup");
                    }
                    Some(ClientFrame::Binary(_)) => {
                        debug!(session_id = %session_id, "Dropping client audio during setup");
                    }
                },
            }
        }
    }

    async fn establish(&mut self, connector: &dyn UpstreamConnector) -> RealtimeResult<UpstreamLink> {
        self.state = RelayState::Connecting;
        let mut link = connector.connect().await?;

        self.state = RelayState::Configuring;
        wait_for(&mut link, |event| matches!(event, ServerEvent::SessionCreated { .. })).await?;
        debug!(session_id = %self.session_id, "Upstream session created, configuring");

        send_upstream(&link, self.configurator.session_update()).await?;
        wait_for(&mut link, |event| matches!(event, ServerEvent::SessionUpdated { .. })).await?;

        for event in self.configurator.on_configured() {
            send_upstream(&link, event).await?;
        }
        Ok(link)
    }

    async fn report_setup_failure(&self, outcome: &RelayOutcome) {
        let message = match outcome {
            RelayOutcome::SetupTimedOut => RelayOutgoingMessage::error(
                "configuration_timeout",
                "Realtime session could not be configured in time",
            ),
            RelayOutcome::SetupFailed(reason) => RelayOutgoingMessage::error(
                "setup_failed",
                format!("Realtime session could not be started: {reason}"),
            ),
            _ => return,
        };
        self.notify(message).await;
    }

    // =========================================================================
    // Active relay
    // =========================================================================

    async fn relay<S>(&mut self, mut link: UpstreamLink, inbound: &mut S) -> RelayOutcome
    where
        S: Stream<Item = ClientFrame> + Unpin + Send,
    {
        self.state = RelayState::Active;
        let queue = match &self.kind {
            ClientKind::Browser => PlaybackQueue::new(ClientAudioSink::new(self.client_tx.clone())),
            ClientKind::Telephony { stream_sid } => PlaybackQueue::new(TelephonyMediaSink::new(
                self.client_tx.clone(),
                stream_sid.clone(),
            )),
        };

        let script = self.configurator.script();
        self.notify(RelayOutgoingMessage::Ready {
            session_id: self.session_id.clone(),
            interview_id: script.id.clone(),
            title: script.title.clone(),
        })
        .await;
        info!(session_id = %self.session_id, "Relay session active");

        let outcome = loop {
            let flow = select! {
                frame = inbound.next() => match frame {
                    Some(frame) => self.handle_client_frame(frame, &link).await,
                    None => Flow::Stop(RelayOutcome::ClientClosed),
                },
                frame = link.receiver.recv() => match frame {
                    Some(frame) => self.handle_upstream_frame(frame, &queue).await,
                    None => Flow::Stop(RelayOutcome::UpstreamClosed { reason: None }),
                },
            };
            if let Flow::Stop(outcome) = flow {
                break outcome;
            }
        };

        queue.discard();
        close_upstream(link).await;
        outcome
    }

    async fn handle_client_frame(&mut self, frame: ClientFrame, link: &UpstreamLink) -> Flow {
        let events = match (self.kind.is_telephony(), frame) {
            (_, ClientFrame::Close) => return Flow::Stop(RelayOutcome::ClientClosed),
            (false, ClientFrame::Text(text)) => {
                match self.browser_message(&text).await {
                    Ok(events) => events,
                    Err(flow) => return flow,
                }
            }
            (false, ClientFrame::Binary(data)) => match f32_frame_from_le_bytes(&data)
            {
                Ok(samples) => vec![ClientEvent::InputAudioBufferAppend {
                    audio: encode_for_transport(&samples),
                }],
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Dropping client audio frame");
                    return Flow::Continue;
                }
            },
            (true, ClientFrame::Text(text)) => {
                match serde_json::from_str::<MediaStreamEvent>(&text) {
                    Ok(MediaStreamEvent::Media { media }) => {
                        vec![ClientEvent::InputAudioBufferAppend {
                            audio: media.payload,
                        }]
                    }
                    Ok(MediaStreamEvent::Stop) => {
                        return Flow::Stop(RelayOutcome::TelephonyStopped);
                    }
                    Ok(_) => return Flow::Continue,
                    Err(e) => {
                        warn!(session_id = %self.session_id, error = %e, "Dropping malformed media frame");
                        return Flow::Continue;
                    }
                }
            }
            (true, ClientFrame::Binary(_)) => return Flow::Continue,
        };

        for event in events {
            if let Err(e) = send_upstream(link, event).await {
                return Flow::Stop(RelayOutcome::UpstreamClosed {
                    reason: Some(e.to_string()),
                });
            }
        }
        Flow::Continue
    }

    /// Translate one browser JSON message into upstream events.
    async fn browser_message(&mut self, text: &str) -> Result<Vec<ClientEvent>, Flow> {
        let message = match serde_json::from_str::<BrowserIncomingMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Dropping malformed client message");
                self.notify(RelayOutgoingMessage::error(
                    "parse_error",
                    format!("Invalid message format: {e}"),
                ))
                .await;
                return Err(Flow::Continue);
            }
        };

        if let Err(e) = message.validate_size() {
            warn!(session_id = %self.session_id, error = %e, "Message validation failed");
            self.notify(RelayOutgoingMessage::error("validation_error", e.to_string()))
                .await;
            return Err(Flow::Continue);
        }

        match message {
            BrowserIncomingMessage::AudioAppend { audio } => {
                Ok(vec![ClientEvent::InputAudioBufferAppend { audio }])
            }
            BrowserIncomingMessage::Text { text } => {
                self.record(Speaker::User, text.clone());
                Ok(vec![
                    ClientEvent::ConversationItemCreate {
                        item: ConversationItem::text_message("user", text),
                    },
                    ClientEvent::ResponseCreate,
                ])
            }
            BrowserIncomingMessage::End => Err(Flow::Stop(RelayOutcome::ClientEnded)),
        }
    }

    async fn handle_upstream_frame(&mut self, frame: UpstreamFrame, queue: &PlaybackQueue) -> Flow {
        let text = match frame {
            UpstreamFrame::Text(text) => text,
            UpstreamFrame::Closed { reason } => {
                info!(session_id = %self.session_id, reason = ?reason, "Upstream closed");
                return Flow::Stop(RelayOutcome::UpstreamClosed { reason });
            }
        };

        let event = match serde_json::from_str::<ServerEvent>(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Dropping malformed upstream event");
                return Flow::Continue;
            }
        };

        match event {
            ServerEvent::AudioDelta { delta, .. } => match decode_from_transport(&delta) {
                Ok(audio) => {
                    if let Err(e) = queue.enqueue(audio) {
                        warn!(session_id = %self.session_id, error = %e, "Playback rejected audio");
                    }
                }
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Dropping undecodable audio delta");
                }
            },
            ServerEvent::AudioTranscriptDelta { delta, .. } => {
                self.assistant_turn.push_str(&delta);
                self.notify(RelayOutgoingMessage::Transcript {
                    text: delta,
                    role: Speaker::Assistant.as_str().to_string(),
                    is_final: false,
                })
                .await;
            }
            ServerEvent::AudioTranscriptDone { transcript, .. } => {
                self.finish_assistant_turn(Some(transcript)).await;
            }
            ServerEvent::ResponseDone { response } => {
                if !self.assistant_turn.is_empty() {
                    let transcript = response.transcript().map(str::to_string);
                    self.finish_assistant_turn(transcript).await;
                }
                self.notify(RelayOutgoingMessage::ResponseDone {
                    response_id: response.id,
                })
                .await;
            }
            ServerEvent::TranscriptionCompleted { transcript, .. } => {
                let transcript = transcript.trim().to_string();
                if !transcript.is_empty() {
                    debug!(session_id = %self.session_id, "User turn transcribed");
                    self.record(Speaker::User, transcript.clone());
                    self.notify(RelayOutgoingMessage::Transcript {
                        text: transcript,
                        role: Speaker::User.as_str().to_string(),
                        is_final: true,
                    })
                    .await;
                }
            }
            ServerEvent::SpeechStarted { .. } => {
                self.notify(RelayOutgoingMessage::SpeakingStarted).await;
            }
            ServerEvent::SpeechStopped { .. } => {
                self.notify(RelayOutgoingMessage::SpeakingStopped).await;
            }
            ServerEvent::Error { error } => {
                warn!(
                    session_id = %self.session_id,
                    error_type = %error.error_type,
                    message = %error.message,
                    "Upstream reported an error"
                );
                self.notify(RelayOutgoingMessage::Error {
                    code: Some(error.code.unwrap_or_else(|| "provider_error".to_string())),
                    message: error.message,
                })
                .await;
            }
            other => debug!(session_id = %self.session_id, kind = other.kind(), "Ignoring upstream event"),
        }
        Flow::Continue
    }

    /// Close the assistant turn, preferring the upstream's full transcript.
    async fn finish_assistant_turn(&mut self, transcript: Option<String>) {
        let accumulated = std::mem::take(&mut self.assistant_turn);
        let text = transcript
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(accumulated);
        if text.trim().is_empty() {
            return;
        }

        self.record(Speaker::Assistant, text.clone());
        self.notify(RelayOutgoingMessage::Transcript {
            text,
            role: Speaker::Assistant.as_str().to_string(),
            is_final: true,
        })
        .await;
    }

    fn record(&mut self, role: Speaker, text: String) {
        self.transcript.push(TranscriptEntry {
            role,
            text,
            timestamp_ms: now_ms(),
        });
    }

    /// Send a JSON message to a browser client. Telephony streams only take media.
    async fn notify(&self, message: RelayOutgoingMessage) {
        if self.kind.is_telephony() {
            return;
        }
        if self
            .client_tx
            .send(ClientRoute::Outgoing(message))
            .await
            .is_err()
        {
            debug!(session_id = %self.session_id, "Client writer gone, message dropped");
        }
    }
}

/// Whether a text frame received during setup ends the session.
fn ending_frame(telephony: bool, text: &str) -> Option<RelayOutcome> {
    if telephony {
        matches!(
            serde_json::from_str::<MediaStreamEvent>(text),
            Ok(MediaStreamEvent::Stop)
        )
        .then_some(RelayOutcome::TelephonyStopped)
    } else {
        matches!(
            serde_json::from_str::<BrowserIncomingMessage>(text),
            Ok(BrowserIncomingMessage::End)
        )
        .then_some(RelayOutcome::ClientEnded)
    }
}

async fn send_upstream(link: &UpstreamLink, event: ClientEvent) -> RealtimeResult<()> {
    link.sender
        .send(event)
        .await
        .map_err(|_| RealtimeError::NotConnected)
}

/// Read upstream events until one matches, failing on error or close.
async fn wait_for<F>(link: &mut UpstreamLink, mut matches: F) -> RealtimeResult<()>
where
    F: FnMut(&ServerEvent) -> bool,
{
    loop {
        let text = match link.receiver.recv().await {
            Some(UpstreamFrame::Text(text)) => text,
            Some(UpstreamFrame::Closed { reason }) => {
                return Err(RealtimeError::ConnectionFailed(format!(
                    "upstream closed during setup: {}",
                    reason.as_deref().unwrap_or("no reason")
                )));
            }
            None => return Err(RealtimeError::NotConnected),
        };

        match serde_json::from_str::<ServerEvent>(&text) {
            Ok(ServerEvent::Error { error }) => {
                return Err(RealtimeError::ProviderError(error.message));
            }
            Ok(event) if matches(&event) => return Ok(()),
            Ok(event) => debug!(kind = event.kind(), "Skipping upstream event during setup"),
            Err(e) => warn!(error = %e, "Dropping malformed upstream event during setup"),
        }
    }
}

/// Drop the sender so the pump closes the socket, then wait briefly for it.
async fn close_upstream(link: UpstreamLink) {
    let UpstreamLink {
        sender,
        receiver,
        task,
    } = link;
    drop(sender);
    drop(receiver);
    if let Some(mut task) = task
        && tokio::time::timeout(UPSTREAM_CLOSE_GRACE, &mut task)
            .await
            .is_err()
    {
        task.abort();
    }
}
