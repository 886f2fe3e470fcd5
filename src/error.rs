use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt::Display;

use crate::services::aggregation::AggregationError;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<AppError> for (StatusCode, String) {
    fn from(err: AppError) -> Self {
        (err.status, err.message)
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn internal_error(err: impl Display) -> (StatusCode, String) {
    tracing::error!(error = %err, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

pub fn map_db_error(err: sqlx::Error) -> (StatusCode, String) {
    let status = match &err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23503") => StatusCode::BAD_REQUEST, // foreign_key_violation
            Some("23502") => StatusCode::BAD_REQUEST, // not_null_violation
            Some("22P02") => StatusCode::BAD_REQUEST, // invalid_text_representation
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::error!(error = %err, status = %status, "database error");

    let message = match status {
        StatusCode::NOT_FOUND => "Resource not found",
        StatusCode::BAD_REQUEST => "Invalid request",
        _ => "Database error",
    };

    (status, message.to_string())
}

pub fn map_aggregation_error(err: AggregationError) -> (StatusCode, String) {
    match err {
        AggregationError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        AggregationError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        AggregationError::Store(db) => internal_error(db),
    }
}
