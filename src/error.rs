use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::net::IpAddr;

use crate::webhooks::ValidationError;

/// The main error type for the webhook service
///
/// Every variant maps to exactly one HTTP status. Client-facing bodies are
/// plain text and never include internal details; the full `Display` form is
/// only written to the server log.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Unauthorized IP address: {0}")]
    ForbiddenSource(IpAddr),

    #[error("Missing signature")]
    MissingSignature,

    #[error(transparent)]
    InvalidPayload(#[from] ValidationError),

    #[error("Invalid JSON payload: {0}")]
    MalformedBody(String),

    #[error("Request too old: {age_seconds}s exceeds the replay window")]
    StaleRequest { age_seconds: i64 },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl WebhookError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ForbiddenSource(_) => StatusCode::FORBIDDEN,
            Self::MissingSignature
            | Self::InvalidPayload(_)
            | Self::MalformedBody(_)
            | Self::StaleRequest { .. }
            | Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message sent back to the caller.
    ///
    /// Rejections carry the reason the payment provider needs to see. Server
    /// errors collapse to a generic message (CWE-209); the detail is logged.
    pub fn safe_message(&self) -> String {
        match self {
            Self::ForbiddenSource(_) => "Unauthorized IP address".to_string(),
            Self::MissingSignature => "Missing signature".to_string(),
            Self::InvalidPayload(reason) => reason.to_string(),
            Self::MalformedBody(_) => "Invalid JSON payload".to_string(),
            Self::StaleRequest { .. } => "Request too old (replay attack prevention)".to_string(),
            Self::InvalidSignature => "Invalid signature".to_string(),
            Self::Config(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, self.safe_message()).into_response()
    }
}

/// Result type alias for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            WebhookError::Internal(format!("JSON I/O error: {}", err))
        } else {
            WebhookError::MalformedBody(err.to_string())
        }
    }
}
