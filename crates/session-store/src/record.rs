//! Session record types
//!
//! The record's state is an explicit tagged enum rather than a bag of
//! optional fields: `Pending` can only hold the request secret and
//! `Authenticated` can only hold the identity, so there is never ambiguity
//! about which fields are valid to read. The same session id carries the
//! record across both phases; the transition happens in place.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verified identity returned by the provider's profile lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Provider-assigned user id (stable across renames)
    pub provider_user_id: String,
    /// Human-readable display name
    pub display_name: String,
    /// Short handle / screen name
    pub handle: String,
    /// Avatar image URL
    pub avatar_url: String,
}

/// Handshake phase, tagged with the data valid in that phase.
///
/// Transitions: absent → `Pending` (handshake start) → `Authenticated`
/// (handshake completion). Records leave either state only by TTL expiry.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Handshake started; holds the provider-issued request secret needed
    /// to complete the token exchange. Never exposed to the client.
    Pending { request_secret: String },
    /// Handshake completed; holds the verified identity.
    Authenticated { identity: UserIdentity },
}

impl SessionState {
    /// State label for logging and health reporting.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Pending { .. } => "pending",
            SessionState::Authenticated { .. } => "authenticated",
        }
    }
}

// Hand-written so the request secret can never reach a log line through
// `{:?}` formatting of a record.
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Pending { .. } => f
                .debug_struct("Pending")
                .field("request_secret", &"[REDACTED]")
                .finish(),
            SessionState::Authenticated { identity } => f
                .debug_struct("Authenticated")
                .field("identity", identity)
                .finish(),
        }
    }
}

/// The stored session record: a state plus an absolute expiry.
///
/// `expires_at` is unix epoch seconds, recomputed on every write from the
/// store's clock and the caller-supplied TTL. A record past `expires_at`
/// is unreadable even if the backend has not reclaimed it yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub state: SessionState,
    pub expires_at: u64,
}

impl SessionRecord {
    /// Whether the record is past its expiry at the given time.
    pub fn expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}
