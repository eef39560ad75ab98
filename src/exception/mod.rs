use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Typed HTTP-status error for crossing the handler boundary.
///
/// Raise this inside a handler to have the boundary turn it into a wire
/// error body with the carried status. Any other handler error is reported
/// as a generic 500 with full detail forwarded to the logging sink only.
///
/// # Example
/// ```
/// use trellis::HttpStatusError;
/// use axum::http::StatusCode;
///
/// let err = HttpStatusError::new(StatusCode::NOT_FOUND, "todo does not exist");
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct HttpStatusError {
    status: StatusCode,
    message: String,
}

impl HttpStatusError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// JSON error body written by the boundary for failed requests.
pub fn error_body(status: StatusCode, message: &str) -> Value {
    json!({
        "statusCode": status.as_u16(),
        "message": message,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}
