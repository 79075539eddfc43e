//! Request extractors

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON request body. Malformed or mistyped bodies are rejected as
/// validation errors with the usual `{error, error_code}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
