//! Session identity and its one-time creation.

use tracing::{debug, info};

use crate::api::{ApiClient, SessionIds};
use crate::error::EngineResult;

/// Owns the server-issued session/user identifiers.
///
/// Absence of the pair means "no session": all turn operations are no-ops
/// until creation succeeds.
#[derive(Debug, Default)]
pub struct SessionManager {
    ids: Option<SessionIds>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the session if absent; idempotent once established (a second
    /// call issues no request).
    ///
    /// # Errors
    /// Propagates the `SessionCreation` failure: absent identifiers leave
    /// the engine permanently unable to send, so this must not be swallowed.
    pub async fn ensure_session(&mut self, api: &ApiClient) -> EngineResult<()> {
        if self.ids.is_some() {
            return Ok(());
        }
        let ids = api.create_session().await?;
        info!(session_id = %ids.session_id, user_id = %ids.user_id, "session created");
        self.ids = Some(ids);
        Ok(())
    }

    /// Current identifiers, if established.
    pub fn ids(&self) -> Option<&SessionIds> {
        self.ids.as_ref()
    }

    pub fn is_established(&self) -> bool {
        self.ids.is_some()
    }

    /// Clears the identifiers. Synchronous; no network call.
    pub fn reset(&mut self) {
        if self.ids.take().is_some() {
            debug!("session identifiers cleared");
        }
    }
}
