//! Identity provider gateway abstraction
//!
//! Defines the `IdentityProvider` trait that decouples the handshake
//! coordinator from the provider's wire protocol. The coordinator only
//! needs three opaque capabilities: obtain a request token, exchange it
//! (plus the verifier) for an access token, and call the authenticated
//! profile API. `TwitterProvider` implements the trait over OAuth 1.0a
//! with HMAC-SHA1 request signing; tests substitute stub implementations.
//!
//! Every operation may fail with `ProviderError`. The coordinator treats
//! any failure as fatal for the current call — it never interprets
//! provider-specific error codes or retries.

pub mod signature;
pub mod twitter;

pub use twitter::{TwitterEndpoints, TwitterProvider};

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Provider-issued request token, valid for one authorization redirect.
///
/// `secret` correlates with the token and is required to complete the
/// exchange; it is stored server-side and never shown to the client.
#[derive(Clone)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
    /// Provider authorization URL (embedding the token) to redirect the
    /// user to.
    pub authorization_url: String,
}

/// Access credentials obtained by completing the token exchange.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
}

/// Profile returned by the provider's authenticated lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub screen_name: String,
    pub avatar_url: String,
}

// Token secrets are live credentials; keep them out of Debug output.
impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("token", &self.token)
            .field("secret", &"[REDACTED]")
            .field("authorization_url", &self.authorization_url)
            .finish()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &self.token)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Errors from identity provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request never completed (connect failure, timeout)
    #[error("provider request failed: {0}")]
    Http(String),

    /// The provider answered with a non-success status
    #[error("provider rejected the call: {0}")]
    Rejected(String),

    /// The provider answered but the body was not what the protocol promises
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Abstraction over the three-legged OAuth capability.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn IdentityProvider>`).
pub trait IdentityProvider: Send + Sync {
    /// Identifier for logging (e.g. "twitter")
    fn id(&self) -> &str;

    /// Obtain a request token and the authorization URL to redirect to.
    fn request_token(&self) -> Pin<Box<dyn Future<Output = Result<RequestToken>> + Send + '_>>;

    /// Exchange a request token + verifier for access credentials.
    ///
    /// `request_secret` is the server-held secret issued alongside the
    /// token; `returned_token` and `verifier` are the values the provider
    /// handed back through the client and are treated as untrusted input.
    fn exchange_token<'a>(
        &'a self,
        returned_token: &'a str,
        request_secret: &'a str,
        verifier: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>>;

    /// Look up the authenticated user's profile.
    fn verify_credentials<'a>(
        &'a self,
        access: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<Profile>> + Send + 'a>>;
}
