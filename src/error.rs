//! Application error type.
//!
//! Every fallible operation in the crate returns `AppError`, which carries the
//! process exit code used by the `credit` binary:
//!
//! - `2`: input, configuration or file I/O problems
//! - `3`: no usable rows after filtering
//! - `4`: training or model consistency failures
//! - `5`: HTTP server failures

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors that escape a request handler become `500 {"detail": ...}`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(exit_code = self.exit_code, "request failed: {}", self.message);
        let body = serde_json::json!({ "detail": self.message });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
