//! Mapping from domain errors to HTTP responses.
//!
//! Every recoverable failure gets its own status code; only genuinely
//! unexpected conditions (persistence outage, bugs) collapse into an opaque
//! 500 with the detail kept in the logs.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::error,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Voice(#[from] nexus_voice::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use nexus_voice::Error as Voice;

        let (status, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Voice(e) => match e {
                Voice::InvalidInput { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
                Voice::ChannelNotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
                Voice::ChannelFull { .. } => (StatusCode::BAD_REQUEST, "Channel is full".into()),
                Voice::Unconfigured => (
                    StatusCode::BAD_REQUEST,
                    "Voice chat is not configured".into(),
                ),
                Voice::CredentialIssuance { .. } => (StatusCode::BAD_GATEWAY, e.to_string()),
                Voice::InvariantViolation { .. } => {
                    error!(error = %e, "voice invariant violated");
                    (StatusCode::CONFLICT, e.to_string())
                },
                Voice::Sqlx(source) => {
                    error!(error = %source, "voice persistence failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
                },
            },
            Self::Internal(e) => {
                error!(error = %e, "unexpected failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            },
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
