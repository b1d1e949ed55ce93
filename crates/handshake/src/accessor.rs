//! Client-facing session resolution
//!
//! Read-only, idempotent, side-effect-free lookup of the identity behind
//! a caller-presented session id. The accessor distinguishes outcomes the
//! coordinator's state machine makes possible: an expired or unknown id
//! (start over), a pending handshake (finish logging in), and a verified
//! identity.

use std::sync::Arc;

use session_store::{SessionState, SessionStore, UserIdentity};
use tracing::debug;

use crate::error::{Error, Result};
use crate::session_id;

/// Resolves session ids to identities.
pub struct Accessor {
    store: Arc<dyn SessionStore>,
}

impl Accessor {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Resolve a session id to its verified identity.
    ///
    /// Absent or expired records fail `SessionExpired`; a record whose
    /// handshake never completed fails `NotAuthenticated`. The request
    /// secret of a pending record is never part of any outcome.
    pub async fn resolve(&self, session_id: &str) -> Result<UserIdentity> {
        let record = self
            .store
            .get(session_id)
            .await?
            .ok_or(Error::SessionExpired)?;

        match record.state {
            SessionState::Authenticated { identity } => Ok(identity),
            SessionState::Pending { .. } => {
                debug!(
                    session = %session_id::fingerprint(session_id),
                    "resolve on a pending session"
                );
                Err(Error::NotAuthenticated)
            }
        }
    }
}
