//! Twitter OAuth 1.0a provider
//!
//! Implements the three gateway calls over Twitter's token endpoints:
//! request token (with `oauth_callback`), access token exchange (with
//! `oauth_verifier`), and the authenticated `account/verify_credentials`
//! profile lookup. Token endpoints answer form-encoded bodies; the profile
//! endpoint answers JSON.
//!
//! Every call carries a bounded timeout — a hung provider surfaces as a
//! `ProviderError`, never as a stuck handshake.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::Secret;
use serde::Deserialize;
use tracing::debug;

use crate::signature::{authorization_header, nonce, percent_encode, sign, signature_base_string};
use crate::{AccessToken, IdentityProvider, Profile, ProviderError, RequestToken, Result};

/// Provider endpoint URLs. Configurable so tests (and API-compatible
/// providers) can point at their own servers.
#[derive(Debug, Clone)]
pub struct TwitterEndpoints {
    pub request_token_url: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub verify_credentials_url: String,
}

impl Default for TwitterEndpoints {
    fn default() -> Self {
        Self {
            request_token_url: "https://api.twitter.com/oauth/request_token".into(),
            authorize_url: "https://api.twitter.com/oauth/authenticate".into(),
            access_token_url: "https://api.twitter.com/oauth/access_token".into(),
            verify_credentials_url:
                "https://api.twitter.com/1.1/account/verify_credentials.json".into(),
        }
    }
}

/// OAuth 1.0a identity provider gateway.
pub struct TwitterProvider {
    client: reqwest::Client,
    consumer_key: String,
    consumer_secret: Secret<String>,
    callback_url: String,
    endpoints: TwitterEndpoints,
    timeout: Duration,
}

/// Shape of the `verify_credentials` JSON answer (the fields we keep).
#[derive(Debug, Deserialize)]
struct VerifyCredentialsResponse {
    id_str: String,
    name: String,
    screen_name: String,
    #[serde(default)]
    profile_image_url_https: String,
}

impl TwitterProvider {
    pub fn new(
        client: reqwest::Client,
        consumer_key: String,
        consumer_secret: Secret<String>,
        callback_url: String,
        endpoints: TwitterEndpoints,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            consumer_key,
            consumer_secret,
            callback_url,
            endpoints,
            timeout,
        }
    }

    /// Build the signed `Authorization` header for one call.
    ///
    /// `token` is the (token, token_secret) pair once one exists; `extra`
    /// carries call-specific protocol parameters (`oauth_callback`,
    /// `oauth_verifier`). Query parameters in `url` take part in the
    /// signature base string but stay out of the header.
    fn signed_header(
        &self,
        method: &str,
        url: &str,
        token: Option<(&str, &str)>,
        extra: &[(&str, &str)],
    ) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string();

        let mut oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer_key.clone()),
            ("oauth_nonce".into(), nonce()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), timestamp),
            ("oauth_version".into(), "1.0".into()),
        ];
        if let Some((tok, _)) = token {
            oauth_params.push(("oauth_token".into(), tok.to_string()));
        }
        for (k, v) in extra {
            oauth_params.push((k.to_string(), v.to_string()));
        }

        let (base_url, query_params) = split_query(url);
        let mut signing_params = oauth_params.clone();
        signing_params.extend(query_params);

        let base = signature_base_string(method, base_url, &signing_params);
        let token_secret = token.map(|(_, s)| s).unwrap_or("");
        let signature = sign(&base, self.consumer_secret.expose(), token_secret);
        oauth_params.push(("oauth_signature".into(), signature));

        authorization_header(&oauth_params)
    }

    /// POST a signed request to a token endpoint and parse the
    /// form-encoded answer.
    async fn token_call(
        &self,
        url: &str,
        token: Option<(&str, &str)>,
        extra: &[(&str, &str)],
        what: &str,
    ) -> Result<Vec<(String, String)>> {
        let header = self.signed_header("POST", url, token, extra);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, header)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Http(format!("{what} request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(format!("{what} response read failed: {e}")))?;

        if !status.is_success() {
            return Err(ProviderError::Rejected(format!(
                "{what} endpoint returned {status}: {body}"
            )));
        }

        Ok(parse_form(&body))
    }
}

impl IdentityProvider for TwitterProvider {
    fn id(&self) -> &str {
        "twitter"
    }

    fn request_token(&self) -> Pin<Box<dyn Future<Output = Result<RequestToken>> + Send + '_>> {
        Box::pin(async move {
            let fields = self
                .token_call(
                    &self.endpoints.request_token_url,
                    None,
                    &[("oauth_callback", self.callback_url.as_str())],
                    "request token",
                )
                .await?;

            let token = form_field(&fields, "oauth_token", "request token")?;
            let secret = form_field(&fields, "oauth_token_secret", "request token")?;

            // A provider that did not accept our callback cannot complete
            // the handshake later; fail now rather than at the exchange.
            if lookup(&fields, "oauth_callback_confirmed") != Some("true") {
                return Err(ProviderError::Malformed(
                    "request token response did not confirm the callback".into(),
                ));
            }

            let authorization_url = format!(
                "{}?oauth_token={}",
                self.endpoints.authorize_url,
                percent_encode(&token)
            );
            debug!(token = %token, "obtained request token");

            Ok(RequestToken {
                token,
                secret,
                authorization_url,
            })
        })
    }

    fn exchange_token<'a>(
        &'a self,
        returned_token: &'a str,
        request_secret: &'a str,
        verifier: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AccessToken>> + Send + 'a>> {
        Box::pin(async move {
            let fields = self
                .token_call(
                    &self.endpoints.access_token_url,
                    Some((returned_token, request_secret)),
                    &[("oauth_verifier", verifier)],
                    "token exchange",
                )
                .await?;

            let token = form_field(&fields, "oauth_token", "token exchange")?;
            let secret = form_field(&fields, "oauth_token_secret", "token exchange")?;
            debug!("exchanged request token for access token");

            Ok(AccessToken { token, secret })
        })
    }

    fn verify_credentials<'a>(
        &'a self,
        access: &'a AccessToken,
    ) -> Pin<Box<dyn Future<Output = Result<Profile>> + Send + 'a>> {
        Box::pin(async move {
            let url = &self.endpoints.verify_credentials_url;
            let header = self.signed_header("GET", url, Some((&access.token, &access.secret)), &[]);

            let response = self
                .client
                .get(url)
                .header(reqwest::header::AUTHORIZATION, header)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| ProviderError::Http(format!("profile lookup failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<no body>"));
                return Err(ProviderError::Rejected(format!(
                    "profile endpoint returned {status}: {body}"
                )));
            }

            let profile: VerifyCredentialsResponse = response.json().await.map_err(|e| {
                ProviderError::Malformed(format!("invalid profile response: {e}"))
            })?;

            Ok(Profile {
                id: profile.id_str,
                name: profile.name,
                screen_name: profile.screen_name,
                avatar_url: profile.profile_image_url_https,
            })
        })
    }
}

/// Split a URL into its query-free base and decoded query pairs.
///
/// The base string algorithm signs over the request's query parameters
/// alongside the protocol parameters, against the URL without its query.
fn split_query(url: &str) -> (&str, Vec<(String, String)>) {
    match url.split_once('?') {
        Some((base, query)) => (base, parse_form(query)),
        None => (url, Vec::new()),
    }
}

/// Parse a form-encoded response body into key/value pairs.
fn parse_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((form_decode(k), form_decode(v)))
        })
        .collect()
}

/// Decode `%XX` escapes and `+` in a form-encoded component.
fn form_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(byte: Option<&u8>) -> Option<u8> {
    match byte? {
        b @ b'0'..=b'9' => Some(b - b'0'),
        b @ b'a'..=b'f' => Some(b - b'a' + 10),
        b @ b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn lookup<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn form_field(fields: &[(String, String)], key: &str, what: &str) -> Result<String> {
    lookup(fields, key)
        .map(|v| v.to_string())
        .ok_or_else(|| ProviderError::Malformed(format!("{what} response missing {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::{get, post};
    use tokio::net::TcpListener;

    // --- Form parsing ---

    #[test]
    fn parse_form_splits_pairs() {
        let fields = parse_form("oauth_token=tok1&oauth_token_secret=sec1&x=1");
        assert_eq!(lookup(&fields, "oauth_token"), Some("tok1"));
        assert_eq!(lookup(&fields, "oauth_token_secret"), Some("sec1"));
        assert_eq!(lookup(&fields, "x"), Some("1"));
        assert_eq!(lookup(&fields, "missing"), None);
    }

    #[test]
    fn parse_form_decodes_escapes() {
        let fields = parse_form("a=hello%20world&b=1%2B1&c=plus+space");
        assert_eq!(lookup(&fields, "a"), Some("hello world"));
        assert_eq!(lookup(&fields, "b"), Some("1+1"));
        assert_eq!(lookup(&fields, "c"), Some("plus space"));
    }

    #[test]
    fn form_decode_tolerates_truncated_escape() {
        assert_eq!(form_decode("abc%2"), "abc%2");
        assert_eq!(form_decode("abc%"), "abc%");
        assert_eq!(form_decode("%ZZok"), "%ZZok");
    }

    #[test]
    fn split_query_separates_base_and_pairs() {
        let (base, pairs) = split_query("https://api.example/path?a=1&b=two%20words");
        assert_eq!(base, "https://api.example/path");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two words".to_string())
            ]
        );

        let (base, pairs) = split_query("https://api.example/path");
        assert_eq!(base, "https://api.example/path");
        assert!(pairs.is_empty());
    }

    #[test]
    fn query_pairs_take_part_in_the_base_string() {
        // Signing a URL with a query must equal signing the query-free URL
        // with the pairs provided as explicit parameters, and must differ
        // from signing without them.
        let oauth_params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), "ck".into()),
            ("oauth_nonce".into(), "fixed-nonce".into()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), "1300000000".into()),
            ("oauth_version".into(), "1.0".into()),
        ];

        let (base_url, query) = split_query("https://api.example/v?include_entities=false");
        let mut with_query = oauth_params.clone();
        with_query.extend(query);
        let signed_with_query = crate::signature::signature_base_string("GET", base_url, &with_query);

        let mut explicit = oauth_params.clone();
        explicit.push(("include_entities".into(), "false".into()));
        let signed_explicit =
            crate::signature::signature_base_string("GET", "https://api.example/v", &explicit);

        assert_eq!(signed_with_query, signed_explicit);

        let signed_without =
            crate::signature::signature_base_string("GET", "https://api.example/v", &oauth_params);
        assert_ne!(signed_with_query, signed_without);
    }

    #[test]
    fn form_field_missing_is_malformed() {
        let err = form_field(&parse_form("a=1"), "oauth_token", "request token").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
        assert!(err.to_string().contains("oauth_token"));
    }

    // --- HTTP behavior against a stub provider ---

    fn stub_provider(base: &str, timeout: Duration) -> TwitterProvider {
        TwitterProvider::new(
            reqwest::Client::new(),
            "ck".into(),
            Secret::new("cs".into()),
            "https://app.example/callback".into(),
            TwitterEndpoints {
                request_token_url: format!("{base}/oauth/request_token"),
                authorize_url: format!("{base}/oauth/authenticate"),
                access_token_url: format!("{base}/oauth/access_token"),
                verify_credentials_url: format!("{base}/1.1/account/verify_credentials.json"),
            },
            timeout,
        )
    }

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn request_token_happy_path() {
        let router = Router::new().route(
            "/oauth/request_token",
            post(|headers: axum::http::HeaderMap| async move {
                // The call must be OAuth-signed
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                assert!(auth.starts_with("OAuth "), "got: {auth}");
                assert!(auth.contains("oauth_signature="));
                assert!(auth.contains("oauth_callback="));
                "oauth_token=tok1&oauth_token_secret=sec1&oauth_callback_confirmed=true"
            }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_secs(5));

        let request = provider.request_token().await.unwrap();
        assert_eq!(request.token, "tok1");
        assert_eq!(request.secret, "sec1");
        assert_eq!(
            request.authorization_url,
            format!("{base}/oauth/authenticate?oauth_token=tok1")
        );
    }

    #[tokio::test]
    async fn request_token_unconfirmed_callback_is_malformed() {
        let router = Router::new().route(
            "/oauth/request_token",
            post(|| async { "oauth_token=t&oauth_token_secret=s&oauth_callback_confirmed=false" }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_secs(5));

        let err = provider.request_token().await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)), "got: {err}");
    }

    #[tokio::test]
    async fn request_token_rejection_carries_status() {
        let router = Router::new().route(
            "/oauth/request_token",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad consumer key") }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_secs(5));

        let err = provider.request_token().await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(_)));
        assert!(err.to_string().contains("401"), "got: {err}");
    }

    #[tokio::test]
    async fn exchange_token_happy_path() {
        let router = Router::new().route(
            "/oauth/access_token",
            post(|headers: axum::http::HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                assert!(auth.contains("oauth_token=\"tok1\""), "got: {auth}");
                assert!(auth.contains("oauth_verifier=\"verifier1\""), "got: {auth}");
                "oauth_token=at1&oauth_token_secret=as1"
            }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_secs(5));

        let access = provider
            .exchange_token("tok1", "sec1", "verifier1")
            .await
            .unwrap();
        assert_eq!(access.token, "at1");
        assert_eq!(access.secret, "as1");
    }

    #[tokio::test]
    async fn exchange_token_missing_field_is_malformed() {
        let router = Router::new().route(
            "/oauth/access_token",
            post(|| async { "oauth_token=at1" }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_secs(5));

        let err = provider
            .exchange_token("tok1", "sec1", "v")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn verify_credentials_happy_path() {
        let router = Router::new().route(
            "/1.1/account/verify_credentials.json",
            get(|| async {
                axum::Json(serde_json::json!({
                    "id_str": "42",
                    "name": "Ada",
                    "screen_name": "ada",
                    "profile_image_url_https": "https://img.example/ada.png"
                }))
            }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_secs(5));

        let access = AccessToken {
            token: "at1".into(),
            secret: "as1".into(),
        };
        let profile = provider.verify_credentials(&access).await.unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.screen_name, "ada");
        assert_eq!(profile.avatar_url, "https://img.example/ada.png");
    }

    #[tokio::test]
    async fn verify_credentials_with_query_in_endpoint_url() {
        let router = Router::new().route(
            "/1.1/account/verify_credentials.json",
            get(
                |axum::extract::RawQuery(query): axum::extract::RawQuery,
                 headers: axum::http::HeaderMap| async move {
                    assert_eq!(query.as_deref(), Some("include_entities=false"));
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    assert!(auth.starts_with("OAuth "), "got: {auth}");
                    // Query pairs are signed over, never protocol parameters
                    assert!(!auth.contains("include_entities"), "got: {auth}");
                    axum::Json(serde_json::json!({
                        "id_str": "42",
                        "name": "Ada",
                        "screen_name": "ada"
                    }))
                },
            ),
        );
        let base = serve(router).await;
        let mut provider = stub_provider(&base, Duration::from_secs(5));
        provider.endpoints.verify_credentials_url = format!(
            "{base}/1.1/account/verify_credentials.json?include_entities=false"
        );

        let access = AccessToken {
            token: "at1".into(),
            secret: "as1".into(),
        };
        let profile = provider.verify_credentials(&access).await.unwrap();
        assert_eq!(profile.id, "42");
    }

    #[tokio::test]
    async fn verify_credentials_rejection() {
        let router = Router::new().route(
            "/1.1/account/verify_credentials.json",
            get(|| async { (axum::http::StatusCode::UNAUTHORIZED, "invalid token") }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_secs(5));

        let access = AccessToken {
            token: "bad".into(),
            secret: "bad".into(),
        };
        let err = provider.verify_credentials(&access).await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let router = Router::new().route(
            "/oauth/request_token",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "oauth_token=t&oauth_token_secret=s&oauth_callback_confirmed=true"
            }),
        );
        let base = serve(router).await;
        let provider = stub_provider(&base, Duration::from_millis(100));

        let err = provider.request_token().await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)), "got: {err}");
    }
}
