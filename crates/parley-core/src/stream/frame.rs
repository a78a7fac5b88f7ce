//! Push-channel frame decoding.
//!
//! Each WebSocket text payload carries one JSON object `{"type": ..., "data":
//! ...}`. Decoding classifies the payload; reconciliation policy (what a
//! `meta` means for the final text) lives in [`super::turn`].

use serde::Deserialize;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// A decoded push-channel frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Incremental fragment of assistant text.
    Token(String),
    /// End of one finalized response unit.
    Meta(MetaFields),
    /// The channel may be closed; no further frames are expected.
    Done,
    /// Server-declared stream fault (e.g. `no_pending`, orchestration error).
    Error(String),
    /// Recognized but carrying nothing actionable: a `token` with non-string
    /// data (reserved for future status signaling) or an unknown `type` tag.
    Ignored,
}

/// Fields of a `meta` frame, normalized at the wire boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaFields {
    /// Server-provided final text. `Some` only when the wire value is a JSON
    /// string; emptiness is judged by the accumulator, not here.
    pub text: Option<String>,
    /// Label of the backend responder that produced the unit.
    pub agent: Option<String>,
    /// Opaque explanation of how the answer was derived.
    pub provenance: Option<Value>,
    /// Present (and non-empty) when the turn is paused awaiting clarification.
    pub checkpoint_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    data: Value,
}

/// Decodes a single text payload into a [`Frame`].
///
/// # Errors
/// Returns a `FrameDecode` error when the payload is not a JSON object with
/// a `type` tag. Unknown tags are not decode errors; they yield
/// [`Frame::Ignored`].
pub fn decode_frame(payload: &str) -> EngineResult<Frame> {
    let raw: RawFrame = serde_json::from_str(payload)
        .map_err(|e| EngineError::frame_decode(format!("malformed frame: {e}")))?;

    let frame = match raw.frame_type.as_str() {
        "token" => match raw.data {
            Value::String(text) => Frame::Token(text),
            _ => Frame::Ignored,
        },
        "meta" => Frame::Meta(decode_meta(&raw.data)),
        "done" => Frame::Done,
        "error" => Frame::Error(match raw.data {
            Value::String(reason) => reason,
            Value::Null => "unspecified".to_string(),
            other => other.to_string(),
        }),
        _ => Frame::Ignored,
    };
    Ok(frame)
}

fn decode_meta(data: &Value) -> MetaFields {
    MetaFields {
        text: data
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string),
        agent: data
            .get("agent")
            .and_then(Value::as_str)
            .map(str::to_string),
        provenance: data
            .get("provenance")
            .filter(|v| !v.is_null())
            .cloned(),
        checkpoint_id: data
            .get("checkpoint_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}
