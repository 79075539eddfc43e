//! API Middleware
//!
//! Bearer-token authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::OperationContext;
use crate::error::AppError;

use super::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id set by the request-id layer, if it parses as a UUID
pub fn request_correlation_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =========================================================================
// Authentication
// =========================================================================

/// Decode the bearer token and attach the caller to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let user = AuthUser::from(state.tokens.verify(token)?);

    let mut context = OperationContext::new().with_user(user.id);
    if let Some(correlation_id) = request_correlation_id(request.headers()) {
        context = context.with_correlation_id(correlation_id);
    }
    context.ensure_correlation_id();

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

// =========================================================================
// Logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let masked_value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

/// One span per request, tagged with the correlation id, so errors logged
/// further down carry it.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let correlation_id = request_correlation_id(request.headers());
    let headers = mask_headers_for_logging(request.headers());

    let span = tracing::info_span!(
        "request",
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
    );

    async move {
        let start = std::time::Instant::now();
        tracing::info!(headers = ?headers, "Incoming request");

        let response = next.run(request).await;

        tracing::info!(
            status = %response.status(),
            duration_ms = %start.elapsed().as_millis(),
            "Request completed"
        );
        response
    }
    .instrument(span)
    .await
}
