//! The session store contract
//!
//! A TTL key-value abstraction over opaque session ids. `put` is a
//! full-record upsert that resets the absolute expiry from the store's
//! clock; there are no partial-field updates, callers read-modify-write.
//! `get` returns `None` both for ids that were never written and for
//! entries whose TTL has elapsed.
//!
//! No concurrency control beyond last-write-wins: a given session id is
//! driven by a single client through a strictly sequential handshake.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn SessionStore>`).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::Result;
use crate::record::{SessionRecord, SessionState};

/// Abstraction over TTL-aware session storage backends.
pub trait SessionStore: Send + Sync {
    /// Upsert the record for `session_id`, resetting its expiry to
    /// now + `ttl`. The previous record, if any, is replaced whole.
    fn put<'a>(
        &'a self,
        session_id: &'a str,
        state: SessionState,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Fetch the record for `session_id`. Returns `Ok(None)` when the id
    /// was never written or when its TTL has elapsed.
    fn get<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>>;
}
