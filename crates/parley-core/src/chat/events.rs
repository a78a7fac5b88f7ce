//! Chat events for streaming observers.
//!
//! Entirely optional: the store works with no subscriber. Events are
//! serializable so a UI process boundary can forward them as JSON.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::chat::Message;

/// Events emitted by the store while a turn is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A push channel is being opened for a turn.
    TurnStarted,
    /// Incremental assistant text fragment (best-effort delivery).
    TextDelta { text: String },
    /// A message was appended to the log (finalized unit or fault sentinel).
    MessageFinalized { message: Message },
    /// The turn reached its terminal state and the channel was released.
    TurnClosed,
}

/// Channel-based event sender (async, bounded).
pub type ChatEventTx = mpsc::Sender<ChatEvent>;

/// Channel-based event receiver (async, bounded).
pub type ChatEventRx = mpsc::Receiver<ChatEvent>;

/// Default channel capacity for event streams.
///
/// Sized to absorb best-effort delta sends without blocking.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Creates a bounded event channel with the default capacity.
pub fn create_event_channel() -> (ChatEventTx, ChatEventRx) {
    mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY)
}

/// Event sender wrapper with best-effort and reliable send modes.
///
/// `send_delta` never awaits and may drop when the consumer is slow; use it
/// for `TextDelta`. `send_important` awaits delivery; use it for lifecycle
/// events and finalized messages.
#[derive(Clone)]
pub struct EventSender {
    tx: ChatEventTx,
}

impl EventSender {
    pub fn new(tx: ChatEventTx) -> Self {
        Self { tx }
    }

    /// Best-effort send: never awaits, drops if the channel is full.
    pub fn send_delta(&self, event: ChatEvent) {
        let _ = self.tx.try_send(event);
    }

    /// Reliable send: awaits delivery.
    pub async fn send_important(&self, event: ChatEvent) {
        let _ = self.tx.send(event).await;
    }
}
