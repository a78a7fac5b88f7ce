//! Push-channel plumbing: stream-URL resolution and the WebSocket frame feed.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

use crate::error::{EngineError, EngineResult};

pub mod frame;
pub mod turn;

pub use frame::{Frame, MetaFields, decode_frame};
pub use turn::{
    NO_OUTPUT_PLACEHOLDER, STREAM_ERROR_TEXT, TurnAccumulator, TurnPhase, TurnStep,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Resolves the push-channel address returned by a turn-start call.
///
/// Absolute `ws://`/`wss://` URLs are used as given; anything else is taken
/// relative to the API base with the scheme translated (`http` → `ws`,
/// `https` → `wss`).
///
/// # Errors
/// Returns a `Channel` error when the base URL cannot be parsed or joined.
pub fn resolve_stream_url(api_base: &str, stream_url: &str) -> EngineResult<String> {
    if stream_url.starts_with("ws://") || stream_url.starts_with("wss://") {
        return Ok(stream_url.to_string());
    }
    let mut base = Url::parse(api_base)
        .map_err(|e| EngineError::channel(format!("invalid API base {api_base}: {e}")))?;
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    base.set_scheme(scheme)
        .map_err(|()| EngineError::channel(format!("cannot derive ws scheme from {api_base}")))?;
    let resolved = base
        .join(stream_url)
        .map_err(|e| EngineError::channel(format!("invalid stream url {stream_url}: {e}")))?;
    Ok(resolved.to_string())
}

/// An open push channel for one turn.
///
/// At most one exists per turn; dropped (or closed) when the turn reaches
/// its terminal state.
pub struct PushChannel {
    ws: WsStream,
}

impl PushChannel {
    /// Opens the channel at an already-resolved `ws://`/`wss://` URL.
    ///
    /// # Errors
    /// Returns a `Channel` error when the connection cannot be established.
    pub async fn connect(url: &str) -> EngineResult<Self> {
        debug!(%url, "opening push channel");
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| EngineError::channel(format!("websocket connect failed: {e}")))?;
        Ok(Self { ws })
    }

    /// Reads the next decoded frame.
    ///
    /// `None` means the peer ended the stream (close frame or EOF). Decode
    /// failures and transport errors surface as `Err` items; the caller
    /// applies the streaming-fault policy.
    pub async fn next_frame(&mut self) -> Option<EngineResult<Frame>> {
        loop {
            let message = match self.ws.next().await? {
                Ok(message) => message,
                Err(e) => {
                    return Some(Err(EngineError::channel(format!("websocket error: {e}"))));
                }
            };
            match message {
                WsMessage::Text(text) => return Some(decode_frame(&text)),
                WsMessage::Close(_) => return None,
                // Binary and control frames carry nothing for this protocol.
                _ => {}
            }
        }
    }

    /// Closes the channel; best-effort, errors are dropped.
    pub async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_ws_url_passes_through() {
        let url = resolve_stream_url("http://api:8000", "ws://other:9000/api/stream/s/t").unwrap();
        assert_eq!(url, "ws://other:9000/api/stream/s/t");
    }

    #[test]
    fn test_relative_url_joins_http_base() {
        let url = resolve_stream_url("http://127.0.0.1:8000", "/api/stream/s_1/tok").unwrap();
        assert_eq!(url, "ws://127.0.0.1:8000/api/stream/s_1/tok");
    }

    #[test]
    fn test_https_base_becomes_wss() {
        let url = resolve_stream_url("https://assist.example.com", "/api/stream/s/t").unwrap();
        assert_eq!(url, "wss://assist.example.com/api/stream/s/t");
    }

    #[test]
    fn test_absolute_path_replaces_base_path() {
        let url = resolve_stream_url("http://api:8000/ignored", "/api/stream/s/t").unwrap();
        assert_eq!(url, "ws://api:8000/api/stream/s/t");
    }

    #[test]
    fn test_invalid_base_is_channel_error() {
        let err = resolve_stream_url("not a url", "/api/stream/s/t").unwrap_err();
        assert_eq!(err.kind, crate::error::EngineErrorKind::Channel);
    }
}
