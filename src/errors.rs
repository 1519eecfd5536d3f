use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Terminal failure of a credential request.
///
/// Client-side kinds carry just enough detail for the caller to correct the
/// request. `SigningFailed` is deliberately opaque; the provider error is
/// logged where it happens and never reaches the response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IssueError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("declared size exceeds the maximum of {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("extension is not allowed (allowed: {})", .allowed.join(", "))]
    UnsupportedMediaType { allowed: Vec<String> },
    #[error("could not issue an upload credential, retry later")]
    SigningFailed,
}

impl IssueError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Machine-readable kind used in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::UnsupportedMediaType { .. } => "unsupported_media_type",
            Self::SigningFailed => "signing_failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::SigningFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct IssueErrorBody<'a> {
    error: &'static str,
    message: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed: Option<&'a [String]>,
}

impl IntoResponse for IssueError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = IssueErrorBody {
            error: self.kind(),
            message: self.to_string(),
            status: status.as_u16(),
            limit: match &self {
                Self::PayloadTooLarge { limit } => Some(*limit),
                _ => None,
            },
            allowed: match &self {
                Self::UnsupportedMediaType { allowed } => Some(allowed.as_slice()),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 503 Service Unavailable
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: IssueError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn payload_too_large_carries_limit() {
        let (status, body) = body_json(IssueError::PayloadTooLarge { limit: 1024 }).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "payload_too_large");
        assert_eq!(body["limit"], 1024);
        assert_eq!(body["status"], 413);
        assert!(body.get("allowed").is_none());
    }

    #[tokio::test]
    async fn unsupported_media_type_carries_allowed_set() {
        let (status, body) = body_json(IssueError::UnsupportedMediaType {
            allowed: vec!["jpg".into(), "jpeg".into()],
        })
        .await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"], "unsupported_media_type");
        assert_eq!(body["allowed"], json!(["jpg", "jpeg"]));
        assert_eq!(body["message"], "extension is not allowed (allowed: jpg, jpeg)");
    }

    #[tokio::test]
    async fn signing_failed_is_opaque_server_error() {
        let (status, body) = body_json(IssueError::SigningFailed).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "signing_failed");
        assert!(body.get("limit").is_none());
        assert!(body.get("allowed").is_none());
    }

    #[tokio::test]
    async fn invalid_request_is_bad_request() {
        let (status, body) = body_json(IssueError::invalid("size is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "size is required");
    }
}
