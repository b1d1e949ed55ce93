//! TTL-aware session storage
//!
//! Holds the single persistent entity of the login handshake: the session
//! record, keyed by an opaque session id and expiring autonomously after a
//! configured lifetime. The record is a tagged state (`Pending` holding the
//! provider request secret, `Authenticated` holding the resolved identity)
//! plus an absolute expiry timestamp.
//!
//! Two backends implement the same `SessionStore` contract:
//! - `MemoryStore` — a map behind a tokio Mutex, for tests and single-node
//!   deployments that accept losing sessions on restart
//! - `FileStore` — the same map persisted as JSON with atomic temp-file +
//!   rename writes, surviving restarts
//!
//! Expiry is enforced by the reader: a `get` past `expires_at` behaves
//! identically to a `get` of an id that was never written, regardless of
//! when the backend physically reclaims the entry.

pub mod clock;
pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{SessionRecord, SessionState, UserIdentity};
pub use store::SessionStore;
