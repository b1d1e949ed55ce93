//! HTTP routes and response shaping
//!
//! The front door owns everything the coordinator must not know about:
//! cookie transport, query parameters, HTTP status codes, and CORS. The
//! coordinator hands back tagged outcomes; this layer maps `code()` to a
//! status and a structured JSON error body — no string parsing.
//!
//! Error body shape:
//! `{"error":{"code":"...","message":"...","request_id":"req_..."}}`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use handshake::{Accessor, Coordinator, Error as HandshakeError};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tracing::{error, warn};

use crate::cookies;
use crate::metrics;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub accessor: Arc<Accessor>,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub pending_ttl_secs: u64,
    pub authenticated_ttl_secs: u64,
    pub allowed_origin: Option<String>,
    pub prometheus: PrometheusHandle,
    pub started_at: Instant,
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/auth", get(auth_handler))
        .route("/callback", get(callback_handler))
        .route("/me", get(me_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// Structured JSON error response.
fn error_response(status: StatusCode, code: &str, message: &str, request_id: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message,
            "request_id": request_id,
        }
    });
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Map a handshake outcome to its HTTP status.
fn status_for(err: &HandshakeError) -> StatusCode {
    match err {
        HandshakeError::Provider(_) => StatusCode::BAD_GATEWAY,
        HandshakeError::SessionNotFound => StatusCode::UNAUTHORIZED,
        HandshakeError::SessionExpired => StatusCode::UNAUTHORIZED,
        HandshakeError::NotAuthenticated => StatusCode::FORBIDDEN,
        HandshakeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn handshake_error_response(err: &HandshakeError, request_id: &str) -> Response {
    match err {
        HandshakeError::Provider(_) | HandshakeError::Store(_) => {
            error!(error = %err, request_id, "handshake failure")
        }
        _ => warn!(code = err.code(), request_id, "handshake refused"),
    }
    error_response(status_for(err), err.code(), &err.to_string(), request_id)
}

/// Start a handshake: sets the session cookie and returns the provider
/// authorization URL for the client to redirect to.
async fn auth_handler(State(state): State<AppState>) -> Response {
    let request_id = new_request_id();
    state.requests_total.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();

    match state.coordinator.begin().await {
        Ok(start) => {
            metrics::record_begin("ok", started.elapsed().as_secs_f64());
            let cookie = cookies::set_cookie(
                &state.cookie_name,
                &start.session_id,
                state.pending_ttl_secs,
                state.cookie_secure,
            );
            (
                StatusCode::OK,
                [
                    (header::SET_COOKIE, cookie),
                    (header::CONTENT_TYPE, "application/json".to_string()),
                ],
                serde_json::json!({ "authorization_url": start.authorization_url }).to_string(),
            )
                .into_response()
        }
        Err(e) => {
            metrics::record_begin(e.code(), started.elapsed().as_secs_f64());
            state.errors_total.fetch_add(1, Ordering::Relaxed);
            handshake_error_response(&e, &request_id)
        }
    }
}

#[derive(Deserialize)]
struct CallbackQuery {
    oauth_token: Option<String>,
    oauth_verifier: Option<String>,
}

/// Provider redirect target: completes the handshake for the session in
/// the cookie with the token/verifier from the query string.
async fn callback_handler(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: axum::http::HeaderMap,
) -> Response {
    let request_id = new_request_id();
    state.requests_total.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();

    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let Some(session_id) = cookies::session_id_from_header(cookie_header, &state.cookie_name)
    else {
        metrics::record_complete("invalid_request", started.elapsed().as_secs_f64());
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "missing session cookie",
            &request_id,
        );
    };
    let (Some(token), Some(verifier)) = (query.oauth_token, query.oauth_verifier) else {
        metrics::record_complete("invalid_request", started.elapsed().as_secs_f64());
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "missing oauth_token or oauth_verifier",
            &request_id,
        );
    };

    match state.coordinator.complete(&session_id, &token, &verifier).await {
        Ok(identity) => {
            metrics::record_complete("ok", started.elapsed().as_secs_f64());
            // Refresh the cookie to the long-lived login window
            let cookie = cookies::set_cookie(
                &state.cookie_name,
                &session_id,
                state.authenticated_ttl_secs,
                state.cookie_secure,
            );
            (
                StatusCode::OK,
                [(header::SET_COOKIE, cookie)],
                axum::Json(identity),
            )
                .into_response()
        }
        Err(e) => {
            metrics::record_complete(e.code(), started.elapsed().as_secs_f64());
            state.errors_total.fetch_add(1, Ordering::Relaxed);
            handshake_error_response(&e, &request_id)
        }
    }
}

/// Who-am-I lookup for the session in the cookie.
///
/// Answers carry the configured CORS headers (success and failure alike)
/// so a browser frontend on another origin can read the login state.
async fn me_handler(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Response {
    let request_id = new_request_id();
    state.requests_total.fetch_add(1, Ordering::Relaxed);

    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let session_id = cookies::session_id_from_header(cookie_header, &state.cookie_name);

    let mut response = match session_id {
        // No cookie reads the same as a session that never existed
        None => {
            metrics::record_resolve("login_expired");
            handshake_error_response(&HandshakeError::SessionExpired, &request_id)
        }
        Some(session_id) => match state.accessor.resolve(&session_id).await {
            Ok(identity) => {
                metrics::record_resolve("ok");
                axum::Json(identity).into_response()
            }
            Err(e) => {
                metrics::record_resolve(e.code());
                handshake_error_response(&e, &request_id)
            }
        },
    };

    if let Some(origin) = &state.allowed_origin {
        match HeaderValue::from_str(origin) {
            Ok(value) => {
                let headers = response.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
            Err(e) => warn!(origin = %origin, error = %e, "invalid allowed_origin, skipping CORS headers"),
        }
    }

    response
}

/// Health endpoint: uptime and request counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "requests_served": state.requests_total.load(Ordering::Relaxed),
        "errors_total": state.errors_total.load(Ordering::Relaxed),
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint — text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
