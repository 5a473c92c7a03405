//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidPayload(#[from] ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{error} - {description}")]
    Unauthorized { error: String, description: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request axum could not extract, with the status it chose
    #[error("Rejected request: {message}")]
    Rejected { status: StatusCode, message: String },
}

macro_rules! from_rejection {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )*
    };
}

from_rejection!(JsonRejection, QueryRejection, PathRejection, MultipartRejection);

/// Error response structure
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Validation(_) | AppError::InvalidPayload(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Rejected { status, .. } => *status,
        }
    }

    fn body(&self) -> ErrorResponse {
        let code = self.status().as_u16();
        let (error, description, error_details) = match self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                ("A database error occurred".to_string(), None, None)
            }
            AppError::Pool(e) => {
                error!("Pool error: {:?}", e);
                ("Database connection pool exhausted".to_string(), None, None)
            }
            AppError::Validation(msg) => (
                "Validation Error".to_string(),
                Some(msg.clone()),
                None,
            ),
            AppError::InvalidPayload(errors) => (
                "Validation Error".to_string(),
                None,
                serde_json::to_value(errors).ok(),
            ),
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                (msg.clone(), None, None)
            }
            AppError::Unauthorized { error, description } => {
                error!(error = %error, description = %description, "Authentication Failure");
                (error.clone(), Some(description.clone()), None)
            }
            AppError::Forbidden(msg) => (
                "Not Authorized".to_string(),
                Some(msg.clone()),
                None,
            ),
            AppError::Rejected { status, message } => (
                status.canonical_reason().unwrap_or("Bad Request").to_string(),
                Some(message.clone()),
                None,
            ),
        };

        ErrorResponse {
            code,
            error,
            description,
            error_details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create an authentication error
pub fn unauthorized(error: impl Into<String>, description: impl Into<String>) -> AppError {
    AppError::Unauthorized {
        error: error.into(),
        description: description.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_found_body() {
        let err = AppError::NotFound("Domain 7 not found".to_string());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"code": 404, "error": "Domain 7 not found"})
        );
    }

    #[test]
    fn test_unauthorized_body() {
        let err = unauthorized("Invalid Cognito JWT header", "Token missing");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["error"], "Invalid Cognito JWT header");
        assert_eq!(body["description"], "Token missing");
    }

    #[test]
    fn test_validation_errors_carry_details() {
        let mut errors = ValidationErrors::new();
        errors.add("service_name", validator::ValidationError::new("required"));
        let err = AppError::from(errors);

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = err.body();
        assert_eq!(body.error, "Validation Error");
        assert!(body.error_details.unwrap().get("service_name").is_some());
    }

    #[test]
    fn test_rejection_keeps_status() {
        let err = AppError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Failed to deserialize the JSON body".to_string(),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "code": 422,
                "error": "Unprocessable Entity",
                "description": "Failed to deserialize the JSON body"
            })
        );
    }
}
