use crate::error::AppError;
use crate::handlers::extract::ApiJson;
use crate::models::User;
use crate::services::RegisterUserRequest;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RegisterUserResponse {
    #[serde(flatten)]
    pub user: User,
    /// Omitted in production, where the token only travels by email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// POST /v1/authentication/user - Register a user and email an activation link
///
/// ## Request Body (JSON)
/// ```json
/// { "username": "alice", "email": "alice@x.com", "password": "secret123" }
/// ```
///
/// ## Errors
/// - 400 Bad Request: validation failure, email or username already taken
/// - 500 Internal Server Error: storage failure or the invitation could not be sent
pub async fn register_user_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterUserRequest>,
) -> Result<Response, AppError> {
    let registered = state
        .registration_service
        .register_and_invite(payload)
        .await?;

    let token = if state.settings.is_production() {
        None
    } else {
        Some(registered.token)
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterUserResponse {
            user: registered.user,
            token,
        }),
    )
        .into_response())
}
