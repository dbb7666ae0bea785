use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// GET /v1/users/{user_id}
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let user = state.user_service.get_user(user_id).await?;
    Ok(Json(user))
}

/// PUT /v1/users/activate/{token} - Activate the account the token was mailed for
pub async fn activate_user_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, AppError> {
    state.user_service.activate(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
