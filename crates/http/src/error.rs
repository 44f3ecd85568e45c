//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Message returned for every unclassified failure
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

/// Failure envelope: `{ "success": false, "error": ... }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

/// A single message, or one message per violated constraint
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Messages(Vec<String>),
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("validation error: {}", details.join("; "))]
    Validation { details: Vec<String> },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error carrying a single message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a validation error with one message per violation
    pub fn validation(details: Vec<String>) -> Self {
        Self::Validation { details }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = match self {
            AppError::BadRequest { message } | AppError::NotFound { message } => {
                ErrorDetail::Message(message)
            }
            AppError::Validation { details } => ErrorDetail::Messages(details),
            AppError::Internal(source) => {
                // Internal detail stays in the logs.
                let error_id = Uuid::new_v4();
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = %format!("{source:#}"),
                    "unclassified request failure"
                );
                ErrorDetail::Message(SERVER_ERROR_MESSAGE.to_string())
            }
        };

        let body = ErrorBody {
            success: false,
            error,
        };

        (status, Json(body)).into_response()
    }
}
