//! The handshake coordinator
//!
//! Owns the session state machine: absent → `Pending` (begin) →
//! `Authenticated` (complete), with each phase under its own TTL. The
//! pending window only needs to outlive a human completing the provider
//! redirect; the authenticated window is a durable login. Both are
//! constructor parameters — the value at stake differs, so the windows do
//! too.
//!
//! The coordinator never retries and never partially recovers: every
//! failure is terminal for the current call, the caller restarts or
//! resumes per the error variant.

use std::sync::Arc;
use std::time::Duration;

use provider::IdentityProvider;
use session_store::{SessionState, SessionStore, UserIdentity};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session_id;

/// Outcome of `begin`: the id for the client cookie and the provider URL
/// to redirect the user to.
#[derive(Debug, Clone)]
pub struct HandshakeStart {
    pub session_id: String,
    pub authorization_url: String,
}

/// Orchestrates the three handshake phases against its collaborators.
pub struct Coordinator {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    pending_ttl: Duration,
    authenticated_ttl: Duration,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        pending_ttl: Duration,
        authenticated_ttl: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            pending_ttl,
            authenticated_ttl,
        }
    }

    /// Start a handshake: mint a session id, obtain a request token, and
    /// store the pending record.
    ///
    /// Provider failure surfaces before anything is written — an aborted
    /// begin leaves no trace in the store.
    pub async fn begin(&self) -> Result<HandshakeStart> {
        let session_id = session_id::generate();
        let request = self.provider.request_token().await?;

        self.store
            .put(
                &session_id,
                SessionState::Pending {
                    request_secret: request.secret,
                },
                self.pending_ttl,
            )
            .await?;

        info!(
            session = %session_id::fingerprint(&session_id),
            provider = self.provider.id(),
            "handshake started"
        );

        Ok(HandshakeStart {
            session_id,
            authorization_url: request.authorization_url,
        })
    }

    /// Complete a handshake with the provider-returned token and verifier.
    ///
    /// The caller-supplied values are untrusted input and are never
    /// persisted — only the resulting identity is. A provider rejection
    /// leaves the pending record untouched (the TTL still bounds it); an
    /// absent or expired record means the handshake cannot be resumed.
    pub async fn complete(
        &self,
        session_id: &str,
        returned_token: &str,
        verifier: &str,
    ) -> Result<UserIdentity> {
        let record = self
            .store
            .get(session_id)
            .await?
            .ok_or(Error::SessionNotFound)?;

        let request_secret = match record.state {
            SessionState::Pending { request_secret } => request_secret,
            SessionState::Authenticated { identity } => {
                // Duplicate completion (double-submitted callback): the
                // identity write is idempotent, return what we have.
                debug!(
                    session = %session_id::fingerprint(session_id),
                    "completion of an already-authenticated session"
                );
                return Ok(identity);
            }
        };

        let access = self
            .provider
            .exchange_token(returned_token, &request_secret, verifier)
            .await
            .inspect_err(|e| {
                warn!(
                    session = %session_id::fingerprint(session_id),
                    error = %e,
                    "token exchange failed, pending record left in place"
                );
            })?;

        let profile = self.provider.verify_credentials(&access).await?;
        let identity = UserIdentity {
            provider_user_id: profile.id,
            display_name: profile.name,
            handle: profile.screen_name,
            avatar_url: profile.avatar_url,
        };

        self.store
            .put(
                session_id,
                SessionState::Authenticated {
                    identity: identity.clone(),
                },
                self.authenticated_ttl,
            )
            .await?;

        info!(
            session = %session_id::fingerprint(session_id),
            user = %identity.handle,
            "handshake completed"
        );

        Ok(identity)
    }
}
