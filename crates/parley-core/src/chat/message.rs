//! Message log entry types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Author of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the ordered, append-only message log.
///
/// Entries are never mutated or removed after append except by a full
/// `reset`; insertion order is the only ordering guarantee exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Client-generated, unique.
    pub id: Uuid,
    pub role: Role,
    /// Final display text.
    pub text: String,
    /// Label of the backend responder that produced the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Opaque explanation of how the answer was derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
    /// Presence signals the turn is paused awaiting clarification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
}

impl Message {
    /// Creates a user-authored entry with a fresh id.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            agent: None,
            provenance: None,
            checkpoint_id: None,
        }
    }

    /// Creates a bare assistant entry with a fresh id.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: text.into(),
            agent: None,
            provenance: None,
            checkpoint_id: None,
        }
    }

    /// Whether this entry carries a checkpoint the caller may `resume`.
    pub fn is_paused(&self) -> bool {
        self.checkpoint_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_message_omits_absent_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["text"], "hi");
        assert!(json.get("agent").is_none());
        assert!(json.get("checkpoint_id").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Message::user("a").id, Message::user("a").id);
    }
}
