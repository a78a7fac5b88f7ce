//! Chat orchestration: message log, session identity, public operations.

pub mod events;
pub mod message;
pub mod session;
pub mod store;

pub use events::{ChatEvent, ChatEventRx, ChatEventTx, EventSender, create_event_channel};
pub use message::{Message, Role};
pub use session::SessionManager;
pub use store::ChatStore;
