//! API Middleware
//!
//! Request context extraction and request logging.

use std::time::Instant;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderName, Request, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::OperationContext;

pub const REQUEST_USER_HEADER: &str = "X-Request-User-Id";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

// =========================================================================
// Request context
// =========================================================================

/// Build an [`OperationContext`] from request headers and store it in the
/// request extensions.
///
/// `X-Request-User-Id` is optional; when present it must be an integer and
/// handlers use it for ownership checks. A missing or malformed
/// `X-Correlation-Id` gets a fresh one.
pub async fn context_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let headers = request.headers();

    let request_user_id = match headers.get(REQUEST_USER_HEADER) {
        Some(value) => match value.to_str().ok().and_then(|s| s.parse::<i64>().ok()) {
            Some(user_id) => Some(user_id),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Invalid X-Request-User-Id header format",
                        "error_code": "invalid_user_id"
                    })),
                )
                    .into_response());
            }
        },
        None => None,
    };

    let correlation_id = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());

    let mut context = OperationContext::new();
    if let Some(correlation_id) = correlation_id {
        context = context.with_correlation_id(correlation_id);
    }
    if let Some(user_id) = request_user_id {
        context = context.with_request_user(user_id);
    }
    context.ensure_correlation_id();

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

// =========================================================================
// Request logging
// =========================================================================

/// Credential headers redacted from request logs. Identity headers such as
/// `X-Request-User-Id` carry no secret and are logged as sent.
static REDACTED_HEADERS: [HeaderName; 3] = [AUTHORIZATION, COOKIE, SET_COOKIE];

/// Request headers as they appear in the logs
pub fn loggable_headers(headers: &HeaderMap) -> Vec<(&str, &str)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if REDACTED_HEADERS.contains(name) {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("[non-ascii]")
            };
            (name.as_str(), shown)
        })
        .collect()
}

/// Run the request inside a `request` span tagged with its correlation id,
/// logging the headers on arrival and the status on completion.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let correlation_id = request
        .extensions()
        .get::<OperationContext>()
        .and_then(|ctx| ctx.correlation_id);

    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        correlation_id = ?correlation_id,
    );
    tracing::debug!(
        parent: &span,
        headers = ?loggable_headers(request.headers()),
        "Request received"
    );

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;

    tracing::info!(
        parent: &span,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request finished"
    );

    response
}
