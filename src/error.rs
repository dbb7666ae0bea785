use crate::services::registration_service::RegistrationError;
use crate::services::user_service::UserServiceError;
use crate::services::validation::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal server error")]
    InternalError,
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Maps the registration outcome onto the HTTP contract: caller mistakes are
/// 400, storage and mail failures are 500.
impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(errors) => AppError::Validation(errors),
            RegistrationError::DuplicateEmail | RegistrationError::DuplicateUsername => {
                AppError::BadRequest(err.to_string())
            }
            RegistrationError::Internal(msg) => {
                tracing::error!("Registration failed: {}", msg);
                AppError::InternalError
            }
            RegistrationError::Dispatch(e) => {
                tracing::error!("Registration failed, invitation not delivered: {}", e);
                AppError::InternalError
            }
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserNotFound => AppError::NotFound("User"),
            UserServiceError::InvitationNotFound => AppError::NotFound("Invitation"),
            other => {
                tracing::error!("User service error: {}", other);
                AppError::InternalError
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{} not found", what.to_lowercase()) }),
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "details": errors.messages() }),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "the server encountered a problem" }),
                )
            }
            AppError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "the server encountered a problem" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
