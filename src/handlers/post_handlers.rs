use crate::error::AppError;
use crate::handlers::extract::ApiJson;
use crate::models::{Comment, CreateCommentRequest, CreatePostRequest, Post, UpdatePostRequest};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

// Handlers that work on an existing post load it here first and pass it on
// explicitly.
async fn load_post(state: &AppState, post_id: i64) -> Result<Post, AppError> {
    state.post_service.get_post(post_id).await
}

/// POST /v1/posts
pub async fn create_post_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.post_service.create_post(payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /v1/posts/{post_id} - The post with its comments
pub async fn get_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Post>, AppError> {
    let post = load_post(&state, post_id).await?;
    let post = state.post_service.with_comments(post).await?;
    Ok(Json(post))
}

/// PATCH /v1/posts/{post_id}
pub async fn update_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let post = load_post(&state, post_id).await?;
    let updated = state.post_service.update_post(post, payload).await?;
    Ok(Json(updated))
}

/// DELETE /v1/posts/{post_id}
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.post_service.delete_post(post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/posts/{post_id}/comments
pub async fn create_comment_handler(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let post = load_post(&state, post_id).await?;
    let comment = state.post_service.create_comment(&post, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
