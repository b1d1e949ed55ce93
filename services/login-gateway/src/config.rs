//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The consumer secret is loaded from the TWITTER_CONSUMER_SECRET env var
//! or consumer_secret_file, never stored in the TOML directly to avoid
//! leaking secrets.

use common::Secret;
use provider::TwitterEndpoints;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Origin allowed to read /me from a browser (sets the CORS headers).
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

/// Identity provider settings
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    pub consumer_key: String,
    #[serde(skip)]
    pub consumer_secret: Option<Secret<String>>,
    /// Path to a file containing the consumer secret (alternative to the
    /// TWITTER_CONSUMER_SECRET env var)
    #[serde(default)]
    pub consumer_secret_file: Option<PathBuf>,
    /// Where the provider redirects the user after authorization
    pub callback_url: String,
    #[serde(default = "default_request_token_url")]
    pub request_token_url: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_access_token_url")]
    pub access_token_url: String,
    #[serde(default = "default_verify_credentials_url")]
    pub verify_credentials_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Session storage and cookie settings
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,
    /// Required when backend = "file"
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// How long an unfinished handshake stays completable
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: u64,
    /// How long a completed login stays valid
    #[serde(default = "default_authenticated_ttl")]
    pub authenticated_ttl_secs: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Memory,
    File,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            file_path: None,
            pending_ttl_secs: default_pending_ttl(),
            authenticated_ttl_secs: default_authenticated_ttl(),
            cookie_name: default_cookie_name(),
            cookie_secure: false,
        }
    }
}

impl ProviderConfig {
    /// Endpoint URLs assembled for the provider constructor.
    pub fn endpoints(&self) -> TwitterEndpoints {
        TwitterEndpoints {
            request_token_url: self.request_token_url.clone(),
            authorize_url: self.authorize_url.clone(),
            access_token_url: self.access_token_url.clone(),
            verify_credentials_url: self.verify_credentials_url.clone(),
        }
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_timeout() -> u64 {
    10
}

// The original deployment's literal TTLs (minutes-scale) read like a
// units mistake; these defaults are 15 minutes for a pending handshake
// and 30 days for a login, both overridable.
fn default_pending_ttl() -> u64 {
    900
}

fn default_authenticated_ttl() -> u64 {
    2_592_000
}

fn default_cookie_name() -> String {
    "sessid".into()
}

fn default_request_token_url() -> String {
    "https://api.twitter.com/oauth/request_token".into()
}

fn default_authorize_url() -> String {
    "https://api.twitter.com/oauth/authenticate".into()
}

fn default_access_token_url() -> String {
    "https://api.twitter.com/oauth/access_token".into()
}

fn default_verify_credentials_url() -> String {
    "https://api.twitter.com/1.1/account/verify_credentials.json".into()
}

fn must_be_http_url(what: &str, value: &str) -> common::Result<()> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{what} must start with http:// or https://, got: {value}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Consumer secret resolution order:
    /// 1. TWITTER_CONSUMER_SECRET env var
    /// 2. consumer_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.provider.consumer_key.trim().is_empty() {
            return Err(common::Error::Config("consumer_key must not be empty".into()));
        }

        must_be_http_url("callback_url", &config.provider.callback_url)?;
        must_be_http_url("request_token_url", &config.provider.request_token_url)?;
        must_be_http_url("authorize_url", &config.provider.authorize_url)?;
        must_be_http_url("access_token_url", &config.provider.access_token_url)?;
        must_be_http_url(
            "verify_credentials_url",
            &config.provider.verify_credentials_url,
        )?;

        if config.provider.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if config.session.pending_ttl_secs == 0 {
            return Err(common::Error::Config(
                "pending_ttl_secs must be greater than 0".into(),
            ));
        }
        if config.session.authenticated_ttl_secs == 0 {
            return Err(common::Error::Config(
                "authenticated_ttl_secs must be greater than 0".into(),
            ));
        }
        if config.session.backend == SessionBackend::File && config.session.file_path.is_none() {
            return Err(common::Error::Config(
                "session.file_path is required when backend = \"file\"".into(),
            ));
        }

        // Resolve consumer secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("TWITTER_CONSUMER_SECRET") {
            config.provider.consumer_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.provider.consumer_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read consumer_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.provider.consumer_secret = Some(Secret::new(secret));
            }
        }

        if config.provider.consumer_secret.is_none() {
            return Err(common::Error::Config(
                "no consumer secret: set TWITTER_CONSUMER_SECRET or consumer_secret_file".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("login-gateway.toml")
    }
}
