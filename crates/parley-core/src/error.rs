//! Engine-wide error type shared across transport, streaming, and chat.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of engine errors for consistent handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    /// Session bootstrap request failed; fatal to all turn operations
    /// until retried successfully.
    SessionCreation,
    /// Turn-start request (send/resume) failed.
    TurnStart,
    /// HTTP status error (4xx, 5xx) from a read endpoint.
    HttpStatus,
    /// A push-channel payload could not be decoded.
    FrameDecode,
    /// Connection-level failure on the push channel.
    Channel,
    /// The push channel went idle past the configured deadline.
    Timeout,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErrorKind::SessionCreation => write!(f, "session_creation"),
            EngineErrorKind::TurnStart => write!(f, "turn_start"),
            EngineErrorKind::HttpStatus => write!(f, "http_status"),
            EngineErrorKind::FrameDecode => write!(f, "frame_decode"),
            EngineErrorKind::Channel => write!(f, "channel"),
            EngineErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Structured engine error with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineError {
    /// Error category
    pub kind: EngineErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw response body)
    pub details: Option<String>,
}

impl EngineError {
    /// Creates a new engine error.
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error from a non-success HTTP response.
    ///
    /// When the body carries a JSON `{"error": {"message": ...}}` or
    /// `{"error": "..."}` shape, the inner message is surfaced and the raw
    /// body kept as details.
    pub fn http_status(kind: EngineErrorKind, status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}");
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body)
                && let Some(error_val) = json.get("error")
                && let Some(msg) = error_val
                    .get("message")
                    .and_then(Value::as_str)
                    .or_else(|| error_val.as_str())
            {
                return Self {
                    kind,
                    message: format!("HTTP {status}: {msg}"),
                    details: Some(body.to_string()),
                };
            }
            Some(body.to_string())
        };
        Self {
            kind,
            message,
            details,
        }
    }

    /// Creates a frame-decode error.
    pub fn frame_decode(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::FrameDecode, message)
    }

    /// Creates a channel-level error.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Channel, message)
    }

    /// Creates an idle-timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Timeout, message)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
