//! Turn accumulation: folds decoded frames into finalized messages.
//!
//! One accumulator exists per open push channel and dies with it. The
//! reconciliation policy supports both delivery styles first-class: a backend
//! may stream token-by-token with no final `text`, or skip streaming and put
//! the whole answer in `meta.text` — identical final content must produce
//! identical log entries.

use crate::chat::Message;
use crate::stream::frame::{Frame, MetaFields};

/// Placeholder when neither the server text nor the buffer has content.
pub const NO_OUTPUT_PLACEHOLDER: &str = "(no output)";

/// Fixed text of the sentinel appended on any channel-level fault.
pub const STREAM_ERROR_TEXT: &str = "[Error streaming response]";

/// Lifecycle of one turn's push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No channel opened yet.
    Idle,
    /// Channel open, folding frames.
    Streaming,
    /// Terminal; no further frames are processed.
    Closed,
}

/// What a folded frame produced.
#[derive(Debug, PartialEq)]
pub enum TurnStep {
    /// Frame folded (or ignored); keep reading.
    Continue,
    /// A `meta` frame finalized one assistant message; keep reading.
    Finalized(Message),
    /// `done` received; the channel may be closed.
    Closed,
    /// A server `error` frame faulted the turn; append the sentinel and close.
    Faulted(Message),
}

/// Accumulation state for one in-flight turn.
#[derive(Debug)]
pub struct TurnAccumulator {
    buffer: String,
    phase: TurnPhase,
}

impl Default for TurnAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            phase: TurnPhase::Idle,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Marks the channel open (`Idle → Streaming`).
    pub fn open(&mut self) {
        if self.phase == TurnPhase::Idle {
            self.phase = TurnPhase::Streaming;
        }
    }

    /// Folds one decoded frame. Frames arriving after `Closed` are dropped.
    pub fn apply(&mut self, frame: Frame) -> TurnStep {
        if self.phase == TurnPhase::Closed {
            return TurnStep::Continue;
        }
        match frame {
            Frame::Token(text) => {
                self.buffer.push_str(&text);
                TurnStep::Continue
            }
            Frame::Meta(meta) => TurnStep::Finalized(self.finalize(meta)),
            Frame::Done => {
                self.phase = TurnPhase::Closed;
                TurnStep::Closed
            }
            Frame::Error(_) => match self.fault() {
                Some(sentinel) => TurnStep::Faulted(sentinel),
                None => TurnStep::Continue,
            },
            Frame::Ignored => TurnStep::Continue,
        }
    }

    /// Faults the turn: closes it and yields the sentinel message, or `None`
    /// if the turn is already closed (at most one sentinel per turn).
    pub fn fault(&mut self) -> Option<Message> {
        if self.phase == TurnPhase::Closed {
            return None;
        }
        self.phase = TurnPhase::Closed;
        Some(Message::assistant(STREAM_ERROR_TEXT))
    }

    /// Closes without a sentinel (clean EOF with no `done` frame).
    pub fn close(&mut self) {
        self.phase = TurnPhase::Closed;
    }

    /// Builds one finalized assistant message from a `meta` frame.
    ///
    /// Final text preference: server-provided `text` iff its trimmed form is
    /// non-empty, else the accumulated buffer, else the placeholder. The
    /// buffer is cleared afterwards so consecutive `meta` units on one
    /// channel stay independent.
    fn finalize(&mut self, meta: MetaFields) -> Message {
        let final_text = match meta.text.filter(|t| !t.trim().is_empty()) {
            Some(server_text) => server_text,
            None if self.buffer.is_empty() => NO_OUTPUT_PLACEHOLDER.to_string(),
            None => std::mem::take(&mut self.buffer),
        };
        self.buffer.clear();

        let mut message = Message::assistant(final_text);
        message.agent = meta.agent;
        message.provenance = meta.provenance;
        message.checkpoint_id = meta.checkpoint_id;
        message
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::chat::Role;
    use crate::stream::frame::decode_frame;

    fn open_accumulator() -> TurnAccumulator {
        let mut acc = TurnAccumulator::new();
        acc.open();
        assert_eq!(acc.phase(), TurnPhase::Streaming);
        acc
    }

    fn meta(fields: MetaFields) -> Frame {
        Frame::Meta(fields)
    }

    #[test]
    fn test_tokens_concatenate_into_final_text() {
        let mut acc = open_accumulator();
        assert_eq!(acc.apply(Frame::Token("ab".into())), TurnStep::Continue);
        assert_eq!(acc.apply(Frame::Token("cd".into())), TurnStep::Continue);
        let TurnStep::Finalized(msg) = acc.apply(meta(MetaFields::default())) else {
            panic!("expected finalized message");
        };
        assert_eq!(msg.text, "abcd");
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_server_text_wins_over_buffer() {
        let mut acc = open_accumulator();
        acc.apply(Frame::Token("ab".into()));
        let TurnStep::Finalized(msg) = acc.apply(meta(MetaFields {
            text: Some("final".into()),
            ..MetaFields::default()
        })) else {
            panic!("expected finalized message");
        };
        assert_eq!(msg.text, "final");
    }

    #[test]
    fn test_blank_server_text_falls_back_to_buffer() {
        let mut acc = open_accumulator();
        acc.apply(Frame::Token("streamed".into()));
        let TurnStep::Finalized(msg) = acc.apply(meta(MetaFields {
            text: Some("   ".into()),
            ..MetaFields::default()
        })) else {
            panic!("expected finalized message");
        };
        assert_eq!(msg.text, "streamed");
    }

    #[test]
    fn test_empty_everything_yields_placeholder() {
        let mut acc = open_accumulator();
        let TurnStep::Finalized(msg) = acc.apply(meta(MetaFields {
            text: Some(String::new()),
            ..MetaFields::default()
        })) else {
            panic!("expected finalized message");
        };
        assert_eq!(msg.text, NO_OUTPUT_PLACEHOLDER);
    }

    #[test]
    fn test_meta_fields_propagate() {
        let mut acc = open_accumulator();
        let TurnStep::Finalized(msg) = acc.apply(meta(MetaFields {
            text: Some("answer".into()),
            agent: Some("summary".into()),
            provenance: Some(json!({"sources": ["a"]})),
            checkpoint_id: Some("ck1".into()),
        })) else {
            panic!("expected finalized message");
        };
        assert_eq!(msg.agent.as_deref(), Some("summary"));
        assert_eq!(msg.provenance, Some(json!({"sources": ["a"]})));
        assert_eq!(msg.checkpoint_id.as_deref(), Some("ck1"));
        assert!(msg.is_paused());
    }

    /// Consecutive `meta` units must be independent: the buffer reset is
    /// load-bearing, not an oversight.
    #[test]
    fn test_buffer_resets_between_meta_units() {
        let mut acc = open_accumulator();
        acc.apply(Frame::Token("first".into()));
        let TurnStep::Finalized(first) = acc.apply(meta(MetaFields::default())) else {
            panic!("expected finalized message");
        };
        acc.apply(Frame::Token("second".into()));
        let TurnStep::Finalized(second) = acc.apply(meta(MetaFields::default())) else {
            panic!("expected finalized message");
        };
        assert_eq!(first.text, "first");
        assert_eq!(second.text, "second");
    }

    #[test]
    fn test_done_closes_and_drops_later_frames() {
        let mut acc = open_accumulator();
        assert_eq!(acc.apply(Frame::Done), TurnStep::Closed);
        assert_eq!(acc.phase(), TurnPhase::Closed);
        // Frames after close are dropped, not folded.
        assert_eq!(acc.apply(Frame::Token("late".into())), TurnStep::Continue);
        assert_eq!(acc.apply(meta(MetaFields::default())), TurnStep::Continue);
    }

    #[test]
    fn test_server_error_frame_faults_once() {
        let mut acc = open_accumulator();
        acc.apply(Frame::Token("partial".into()));
        let TurnStep::Faulted(sentinel) = acc.apply(Frame::Error("no_pending".into())) else {
            panic!("expected fault");
        };
        assert_eq!(sentinel.text, STREAM_ERROR_TEXT);
        assert_eq!(sentinel.agent, None);
        assert_eq!(sentinel.provenance, None);
        assert_eq!(sentinel.checkpoint_id, None);
        // A second fault on the same turn yields nothing.
        assert_eq!(acc.fault(), None);
    }

    #[test]
    fn test_fault_from_transport_error() {
        let mut acc = open_accumulator();
        let sentinel = acc.fault().expect("open turn must fault");
        assert_eq!(sentinel.text, STREAM_ERROR_TEXT);
        assert_eq!(acc.phase(), TurnPhase::Closed);
    }

    /// Streamed tokens and a server-delivered `meta.text` must produce
    /// identical log content for identical final text.
    #[test]
    fn test_delivery_styles_converge() {
        let mut streamed = open_accumulator();
        streamed.apply(Frame::Token("same ".into()));
        streamed.apply(Frame::Token("answer".into()));
        let TurnStep::Finalized(a) = streamed.apply(meta(MetaFields::default())) else {
            panic!("expected finalized message");
        };

        let mut direct = open_accumulator();
        let TurnStep::Finalized(b) = direct.apply(meta(MetaFields {
            text: Some("same answer".into()),
            ..MetaFields::default()
        })) else {
            panic!("expected finalized message");
        };

        assert_eq!(a.text, b.text);
    }

    /// End-to-end over the decoder, mirroring the backend's frame sequence.
    #[test]
    fn test_decoded_backend_sequence() {
        let payloads = [
            r#"{"type":"token","data":"Your plan "}"#,
            r#"{"type":"token","data":"covers dental."}"#,
            r#"{"type":"meta","data":{"agent":"summary","text":"","provenance":[],"checkpoint_id":null}}"#,
            r#"{"type":"done"}"#,
        ];
        let mut acc = open_accumulator();
        let mut finalized = Vec::new();
        for payload in payloads {
            match acc.apply(decode_frame(payload).unwrap()) {
                TurnStep::Finalized(msg) => finalized.push(msg),
                TurnStep::Closed => break,
                TurnStep::Continue => {}
                TurnStep::Faulted(_) => panic!("unexpected fault"),
            }
        }
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].text, "Your plan covers dental.");
        assert_eq!(finalized[0].agent.as_deref(), Some("summary"));
        assert_eq!(finalized[0].checkpoint_id, None);
        assert_eq!(acc.phase(), TurnPhase::Closed);
    }
}
