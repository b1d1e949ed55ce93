//! Session-backed handshake coordination
//!
//! The state machine that ties an anonymous client-held session id to
//! provider-issued OAuth secrets, advances it through the handshake, and
//! resolves it to a verified identity, all under time-based expiry.
//!
//! Handshake flow:
//! 1. `Coordinator::begin` — mint a session id, obtain a request token,
//!    store `Pending { request_secret }` under the short TTL, hand back
//!    the id and the provider authorization URL
//! 2. The user authorizes at the provider, which redirects back with a
//!    token and verifier
//! 3. `Coordinator::complete` — look up the pending record, exchange the
//!    stored secret + verifier for access credentials, fetch the profile,
//!    store `Authenticated { identity }` under the long TTL
//! 4. `Accessor::resolve` — read-only identity lookup for every later
//!    request, distinguishing "expired, start over" from "pending, finish
//!    logging in"
//!
//! The coordinator is constructed with its collaborators (session store,
//! identity provider); it owns no connections and holds no state of its
//! own, so operations on distinct session ids are fully independent.

pub mod accessor;
pub mod coordinator;
pub mod error;
pub mod session_id;

pub use accessor::Accessor;
pub use coordinator::{Coordinator, HandshakeStart};
pub use error::{Error, Result};
pub use session_id::{fingerprint, generate};
