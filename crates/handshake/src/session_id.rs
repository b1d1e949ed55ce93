//! Session id generation and log-safe fingerprints
//!
//! Session ids are the lookup key the client holds across the two
//! handshake legs. They are not credentials, but an attacker who guesses
//! one hijacks the login, so they carry 256 bits of randomness. Ids never
//! appear raw in log output; log lines use an 8-hex-char SHA-256
//! fingerprint instead.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Generate a fresh, unguessable session id.
///
/// 32 random bytes as URL-safe base64 (43 characters), cookie-safe
/// without further encoding.
pub fn generate() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Short log-safe fingerprint of a session id.
///
/// First four bytes of SHA-256 as lowercase hex — enough to correlate log
/// lines for one session without ever writing the cookie value itself.
pub fn fingerprint(session_id: &str) -> String {
    let hash = Sha256::digest(session_id.as_bytes());
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}
