//! Wire types for the backend's request/response endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-issued session identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIds {
    pub session_id: String,
    pub user_id: String,
}

/// Body for `POST /api/chat/send`.
#[derive(Debug, Serialize)]
pub struct ChatSendRequest<'a> {
    pub session_id: &'a str,
    pub user_id: &'a str,
    pub text: &'a str,
}

/// Response to a turn-start request (`send` or `resume`).
///
/// The backend answers `{"stream_url": ...}` on success and, for an invalid
/// checkpoint, HTTP 200 with `{"error": "invalid_checkpoint"}` instead.
#[derive(Debug, Deserialize)]
pub struct TurnStartResponse {
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One pending checkpoint, from `GET /api/checkpoints/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    pub checkpoint_id: String,
    #[serde(default)]
    pub pending_agent: Option<String>,
    #[serde(default)]
    pub pending_question: Option<String>,
    /// Opaque server timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One provenance row, from `GET /api/provenance/{session_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub session_id: String,
    pub agent: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub quantization: Option<String>,
    /// Opaque source listing; shape is owned by the backend.
    #[serde(default)]
    pub sources: Value,
}
