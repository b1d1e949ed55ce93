//! Handshake error taxonomy
//!
//! Every failure is a tagged outcome scoped to a single call; nothing here
//! is fatal to the process and nothing is retried internally. The front
//! door maps the variant to a user-visible status via `code()` — no
//! string parsing anywhere.

use thiserror::Error;

/// Outcomes of handshake and resolution calls.
#[derive(Error, Debug)]
pub enum Error {
    /// The identity provider rejected or failed a call. The handshake
    /// must be restarted from `begin`.
    #[error("identity provider call failed: {0}")]
    Provider(#[from] provider::ProviderError),

    /// No pending record exists for the presented session id at
    /// completion time; the client must restart the handshake.
    #[error("no handshake in progress for the presented session id")]
    SessionNotFound,

    /// The record is absent or past its TTL at resolution time.
    /// Observably identical to an id that never existed.
    #[error("session expired or never existed")]
    SessionExpired,

    /// The record exists but the handshake never completed; the caller
    /// should finish authorizing, not start over.
    #[error("handshake started but not completed")]
    NotAuthenticated,

    /// The session store itself failed.
    #[error("session store failure: {0}")]
    Store(#[from] session_store::Error),
}

impl Error {
    /// Stable machine-readable code for boundary layers.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Provider(_) => "provider_error",
            Error::SessionNotFound => "session_not_found",
            Error::SessionExpired => "login_expired",
            Error::NotAuthenticated => "not_logged_in",
            Error::Store(_) => "store_error",
        }
    }
}

/// Result alias for handshake operations.
pub type Result<T> = std::result::Result<T, Error>;
