//! Error types for the review API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use review_export::ExportError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Review not found: {0}")]
    ReviewNotFound(String),

    #[error("Review is closed: {0}")]
    ReviewClosed(String),

    #[error("Only the owner of a review can {0} it")]
    NotOwner(&'static str),

    #[error("User is not an administrator")]
    NotAdmin,

    #[error("Missing user identity")]
    Unauthenticated,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No suitable comments could be found: {0}")]
    NoMatchingComments(String),

    #[error("Could not process archive file")]
    ArchiveFailed { debug: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::NotFound(id) => ApiError::ReviewNotFound(id),
            ExportError::NoMatchingComments(id) => ApiError::NoMatchingComments(id),
            ExportError::ExternalToolFailure { output } => ApiError::ArchiveFailed { debug: output },
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::ReviewNotFound(_) => (
                StatusCode::NOT_FOUND,
                "The specified review could not be located.".to_string(),
            ),
            ApiError::ReviewClosed(_) => (
                StatusCode::CONFLICT,
                "The review has been declared closed. No further comments are accepted."
                    .to_string(),
            ),
            ApiError::NotOwner(_) | ApiError::NotAdmin => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NoMatchingComments(_) => (
                StatusCode::NOT_FOUND,
                "No suitable comments could be found.".to_string(),
            ),
            ApiError::ArchiveFailed { debug: output } => {
                tracing::warn!("Archive tool failed: {}", output);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": message,
            "status": status.as_u16(),
        });
        if let ApiError::ArchiveFailed { debug } = self {
            body["debug"] = json!(debug);
        }

        (status, Json(body)).into_response()
    }
}
