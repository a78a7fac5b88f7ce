//! Chat orchestration: the message log and the public operations.
//!
//! `ChatStore` is the only component a UI collaborator touches. It composes
//! the session manager, the HTTP transport, and the push-channel machinery,
//! and owns the ordered, append-only message log.

use std::time::Duration;

use anyhow::Result;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::api::{ApiClient, CheckpointInfo, ProvenanceRecord, SessionIds};
use crate::chat::events::{ChatEvent, ChatEventTx, EventSender};
use crate::chat::message::Message;
use crate::chat::session::SessionManager;
use crate::config::Config;
use crate::error::EngineResult;
use crate::stream::{Frame, PushChannel, TurnAccumulator, TurnStep, resolve_stream_url};

/// The session context object: message log plus the four public operations.
///
/// `send`/`resume` take `&mut self` and drive the push channel to its
/// terminal state before returning, so turns are sequential by construction
/// and readers always observe a log with no half-applied turn.
pub struct ChatStore {
    api: ApiClient,
    session: SessionManager,
    messages: Vec<Message>,
    idle_timeout: Duration,
    events: Option<EventSender>,
}

impl ChatStore {
    /// Builds a store from configuration (env override applies to the API
    /// base, per [`Config::resolved_api_base`]).
    ///
    /// # Errors
    /// Returns an error if the configured API base is not a valid URL.
    pub fn new(config: &Config) -> Result<Self> {
        let api_base = config.resolved_api_base()?;
        Ok(Self {
            api: ApiClient::new(api_base),
            session: SessionManager::new(),
            messages: Vec::new(),
            idle_timeout: config.stream_idle_timeout(),
            events: None,
        })
    }

    /// Attaches an event channel for streaming observers.
    #[must_use]
    pub fn with_events(mut self, tx: ChatEventTx) -> Self {
        self.events = Some(EventSender::new(tx));
        self
    }

    /// Read-only ordered message log.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current session identity, if established.
    pub fn session_ids(&self) -> Option<&SessionIds> {
        self.session.ids()
    }

    /// Creates the session if absent. Idempotent; see
    /// [`SessionManager::ensure_session`].
    ///
    /// # Errors
    /// Propagates `SessionCreation` failures to the caller.
    pub async fn ensure_session(&mut self) -> EngineResult<()> {
        self.session.ensure_session(&self.api).await
    }

    /// Submits a user turn.
    ///
    /// Without a session this is a silent no-op (the UI is expected to call
    /// `ensure_session` first; the guard is documented behavior, not an
    /// error). The user entry is appended optimistically before the network
    /// confirms the turn started, and is not rolled back if the start fails.
    ///
    /// # Errors
    /// Returns a `TurnStart` error when the turn-start request fails.
    /// Streaming faults after a successful start never surface here; they
    /// become a sentinel log entry.
    pub async fn send(&mut self, text: &str) -> EngineResult<()> {
        let Some(ids) = self.session.ids().cloned() else {
            debug!("send without an established session; ignoring");
            return Ok(());
        };
        self.messages.push(Message::user(text));
        let stream_url = self
            .api
            .start_turn(&ids.session_id, &ids.user_id, text)
            .await?;
        self.run_turn(&stream_url).await;
        Ok(())
    }

    /// Submits clarification text against an existing checkpoint.
    ///
    /// The clarification is not rendered as a turn: no user entry is
    /// appended to the log.
    ///
    /// # Errors
    /// Returns a `TurnStart` error when the request fails or the backend
    /// rejects the checkpoint.
    pub async fn resume(&mut self, checkpoint_id: &str, text: &str) -> EngineResult<()> {
        let stream_url = self.api.resume_turn(checkpoint_id, text).await?;
        self.run_turn(&stream_url).await;
        Ok(())
    }

    /// Clears the message log and the session identity. Synchronous.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.session.reset();
    }

    /// Pending checkpoints for the current session; empty without a session.
    ///
    /// # Errors
    /// Returns an `HttpStatus` error when the listing request fails.
    pub async fn list_checkpoints(&self) -> EngineResult<Vec<CheckpointInfo>> {
        match self.session.ids() {
            Some(ids) => self.api.checkpoints(&ids.session_id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Provenance rows for the current session; empty without a session.
    ///
    /// # Errors
    /// Returns an `HttpStatus` error when the listing request fails.
    pub async fn list_provenance(&self) -> EngineResult<Vec<ProvenanceRecord>> {
        match self.session.ids() {
            Some(ids) => self.api.provenance(&ids.session_id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Drives one turn's push channel to its terminal state.
    ///
    /// Streaming faults are contained here: each becomes exactly one
    /// sentinel log entry, never a returned error. No automatic retry; a
    /// fresh `send`/`resume` is the caller's recourse.
    async fn run_turn(&mut self, stream_url: &str) {
        let mut accumulator = TurnAccumulator::new();
        self.emit_important(ChatEvent::TurnStarted).await;

        match self.open_channel(stream_url).await {
            Some(mut channel) => {
                accumulator.open();
                self.read_frames(&mut channel, &mut accumulator).await;
                channel.close().await;
            }
            None => self.append_fault(&mut accumulator).await,
        }
        self.emit_important(ChatEvent::TurnClosed).await;
    }

    async fn open_channel(&self, stream_url: &str) -> Option<PushChannel> {
        let resolved = match resolve_stream_url(self.api.base_url(), stream_url) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(error = %e, "stream url could not be resolved");
                return None;
            }
        };
        match PushChannel::connect(&resolved).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(error = %e, "push channel connect failed");
                None
            }
        }
    }

    async fn read_frames(&mut self, channel: &mut PushChannel, accumulator: &mut TurnAccumulator) {
        loop {
            match timeout(self.idle_timeout, channel.next_frame()).await {
                Err(_elapsed) => {
                    warn!(timeout = ?self.idle_timeout, "push channel idle past deadline");
                    self.append_fault(accumulator).await;
                    return;
                }
                // Clean EOF without `done`: close without a sentinel.
                Ok(None) => {
                    accumulator.close();
                    return;
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "streaming fault");
                    self.append_fault(accumulator).await;
                    return;
                }
                Ok(Some(Ok(frame))) => {
                    if let Frame::Token(text) = &frame {
                        self.emit_delta(ChatEvent::TextDelta { text: text.clone() });
                    }
                    match accumulator.apply(frame) {
                        TurnStep::Continue => {}
                        TurnStep::Finalized(message) => self.append(message).await,
                        TurnStep::Closed => return,
                        TurnStep::Faulted(sentinel) => {
                            warn!("server declared a stream fault");
                            self.append(sentinel).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Applies the fault policy: at most one sentinel per turn.
    async fn append_fault(&mut self, accumulator: &mut TurnAccumulator) {
        if let Some(sentinel) = accumulator.fault() {
            self.append(sentinel).await;
        }
    }

    async fn append(&mut self, message: Message) {
        self.emit_important(ChatEvent::MessageFinalized {
            message: message.clone(),
        })
        .await;
        self.messages.push(message);
    }

    async fn emit_important(&self, event: ChatEvent) {
        if let Some(events) = &self.events {
            events.send_important(event).await;
        }
    }

    fn emit_delta(&self, event: ChatEvent) {
        if let Some(events) = &self.events {
            events.send_delta(event);
        }
    }
}
