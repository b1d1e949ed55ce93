//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1)
//!
//! Builds the signature base string from the request method, URL, and the
//! full parameter set (protocol parameters plus any query/body parameters),
//! signs it with the consumer secret and token secret, and assembles the
//! `Authorization: OAuth ...` header.
//!
//! Percent-encoding here is the strict RFC 3986 variant the signature
//! algorithm requires — only ALPHA / DIGIT / `-` / `.` / `_` / `~` pass
//! through, everything else becomes uppercase `%XX`.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngExt;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Percent-encode a string per RFC 3986 section 2.1 as OAuth requires.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Generate a random nonce for a single signed request.
///
/// 24 random bytes as URL-safe base64 (32 characters); uniqueness per
/// (timestamp, nonce) pair is all the protocol asks for.
pub fn nonce() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the signature base string: METHOD & encoded-URL & encoded-params.
///
/// Parameters are percent-encoded first, then sorted by encoded name (and
/// encoded value for ties), then joined `k=v` with `&`, and the whole
/// parameter string is encoded once more.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

/// HMAC-SHA1 sign a base string; returns the standard-base64 signature.
///
/// The signing key is `encode(consumer_secret) & encode(token_secret)`;
/// before a token exists the token secret is the empty string.
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Assemble the `Authorization: OAuth ...` header value from the protocol
/// parameters (including the computed `oauth_signature`).
pub fn authorization_header(oauth_params: &[(String, String)]) -> String {
    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {fields}")
}
