//! HTTP transport for the assistant backend.
//!
//! Pure request/response plumbing: session creation, turn start (send and
//! resume), and the read-only checkpoint/provenance listings. Push-channel
//! handling lives in [`crate::stream`].

use serde_json::json;
use tracing::debug;

use crate::error::{EngineError, EngineErrorKind, EngineResult};

mod types;

pub use types::{ChatSendRequest, CheckpointInfo, ProvenanceRecord, SessionIds, TurnStartResponse};

/// Standard User-Agent header for parley API requests.
pub const USER_AGENT: &str = concat!("parley/", env!("CARGO_PKG_VERSION"));

/// Backend API client.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client against the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Backend origin this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/session/create` with an empty payload.
    ///
    /// # Errors
    /// Returns a `SessionCreation` error on network failure, non-success
    /// status, or an unparseable response body.
    pub async fn create_session(&self) -> EngineResult<SessionIds> {
        let kind = EngineErrorKind::SessionCreation;
        let url = format!("{}/api/session/create", self.base_url);
        debug!(%url, "creating session");

        let response = self
            .http
            .post(&url)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| EngineError::new(kind, format!("session create failed: {e}")))?;
        let body = read_success_body(response, kind).await?;
        serde_json::from_str(&body)
            .map_err(|e| EngineError::new(kind, format!("invalid session response: {e}")))
    }

    /// `POST /api/chat/send`; returns the push-channel address for the turn.
    ///
    /// # Errors
    /// Returns a `TurnStart` error when the request or response fails.
    pub async fn start_turn(
        &self,
        session_id: &str,
        user_id: &str,
        text: &str,
    ) -> EngineResult<String> {
        let url = format!("{}/api/chat/send", self.base_url);
        debug!(%session_id, "starting turn");

        let request = ChatSendRequest {
            session_id,
            user_id,
            text,
        };
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                EngineError::new(EngineErrorKind::TurnStart, format!("chat send failed: {e}"))
            })?;
        extract_stream_url(response).await
    }

    /// `POST /api/chat/resume` (form-encoded) against an existing checkpoint.
    ///
    /// # Errors
    /// Returns a `TurnStart` error when the request fails or the backend
    /// rejects the checkpoint.
    pub async fn resume_turn(&self, checkpoint_id: &str, text: &str) -> EngineResult<String> {
        let url = format!("{}/api/chat/resume", self.base_url);
        debug!(%checkpoint_id, "resuming turn");

        let response = self
            .http
            .post(&url)
            .form(&[("checkpoint_id", checkpoint_id), ("text", text)])
            .send()
            .await
            .map_err(|e| {
                EngineError::new(EngineErrorKind::TurnStart, format!("resume failed: {e}"))
            })?;
        extract_stream_url(response).await
    }

    /// `GET /api/checkpoints/{session_id}`.
    ///
    /// # Errors
    /// Returns an `HttpStatus` error when the request or decode fails.
    pub async fn checkpoints(&self, session_id: &str) -> EngineResult<Vec<CheckpointInfo>> {
        self.get_json(&format!("{}/api/checkpoints/{session_id}", self.base_url))
            .await
    }

    /// `GET /api/provenance/{session_id}`.
    ///
    /// # Errors
    /// Returns an `HttpStatus` error when the request or decode fails.
    pub async fn provenance(&self, session_id: &str) -> EngineResult<Vec<ProvenanceRecord>> {
        self.get_json(&format!("{}/api/provenance/{session_id}", self.base_url))
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> EngineResult<T> {
        let kind = EngineErrorKind::HttpStatus;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::new(kind, format!("request failed: {e}")))?;
        let body = read_success_body(response, kind).await?;
        serde_json::from_str(&body)
            .map_err(|e| EngineError::new(kind, format!("invalid response body: {e}")))
    }
}

/// Reads the body of a response, converting non-success statuses into errors.
async fn read_success_body(
    response: reqwest::Response,
    kind: EngineErrorKind,
) -> EngineResult<String> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(EngineError::http_status(kind, status.as_u16(), &body));
    }
    Ok(body)
}

/// Parses a turn-start response and requires a `stream_url`.
///
/// The backend signals an invalid checkpoint with HTTP 200 and an `error`
/// field instead of a URL; both that and a missing URL map to `TurnStart`.
async fn extract_stream_url(response: reqwest::Response) -> EngineResult<String> {
    let kind = EngineErrorKind::TurnStart;
    let body = read_success_body(response, kind).await?;
    let parsed: TurnStartResponse = serde_json::from_str(&body)
        .map_err(|e| EngineError::new(kind, format!("invalid turn-start response: {e}")))?;
    if let Some(stream_url) = parsed.stream_url {
        return Ok(stream_url);
    }
    let reason = parsed.error.unwrap_or_else(|| "missing stream_url".to_string());
    Err(EngineError::new(kind, format!("turn not started: {reason}")))
}
