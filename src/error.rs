use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::jwt::TokenError;

/// Unified request error. Every handler returns `AppResult<T>` and maps
/// domain failures onto one of these variants; the message is what the
/// client sees.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    // Conflicts report 400 on this API, not 409.
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, message = %self, "request failed");
        } else {
            tracing::debug!(status = %status, message = %self, "request rejected");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthenticated("Token expired".into()),
            TokenError::Invalid => AppError::Unauthenticated("Invalid token".into()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "internal error");
        AppError::Internal("Internal server error".into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => {
                    let detail = db
                        .constraint()
                        .map(|c| format!("Duplicate value for {c}"))
                        .unwrap_or_else(|| "Duplicate value".into());
                    AppError::Conflict(detail)
                }
                Some("23503") => AppError::Validation("Referenced record not found".into()),
                Some("23502") => AppError::Validation("Missing required field".into()),
                Some("23514") => AppError::Validation("Validation failed".into()),
                _ => {
                    tracing::error!(error = %err, "unhandled database error");
                    AppError::Internal("Internal server error".into())
                }
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                tracing::error!(error = %err, "database unavailable");
                AppError::Unavailable("Service temporarily unavailable".into())
            }
            _ => {
                tracing::error!(error = %err, "unhandled database error");
                AppError::Internal("Internal server error".into())
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[tokio::test]
    async fn renders_status_and_message_body() {
        let response = AppError::NotFound("Job not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Job not found");
    }

    #[test]
    fn conflict_maps_to_bad_request() {
        assert_eq!(
            AppError::Conflict("User already exists".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn token_errors_map_to_unauthenticated() {
        let expired: AppError = TokenError::Expired.into();
        let invalid: AppError = TokenError::Invalid.into();
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
