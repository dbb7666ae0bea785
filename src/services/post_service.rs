use crate::error::{AppError, Result};
use crate::models::{Comment, CreateCommentRequest, CreatePostRequest, Post, UpdatePostRequest};
use crate::repositories::{CommentRepository, PostRepository};
use crate::services::validation::ValidationErrors;
use std::sync::Arc;

pub const TITLE_MAX_LEN: usize = 100;
pub const CONTENT_MAX_LEN: usize = 1000;

pub struct PostService {
    repository: Arc<dyn PostRepository>,
    comment_repository: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(
        repository: Arc<dyn PostRepository>,
        comment_repository: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            repository,
            comment_repository,
        }
    }

    pub async fn create_post(&self, request: CreatePostRequest) -> Result<Post> {
        let mut errors = ValidationErrors::new();
        if errors.required("title", &request.title) {
            errors.max_length("title", &request.title, TITLE_MAX_LEN);
        }
        if errors.required("content", &request.content) {
            errors.max_length("content", &request.content, CONTENT_MAX_LEN);
        }
        errors.into_result()?;

        self.repository.create(&request).await
    }

    pub async fn get_post(&self, id: i64) -> Result<Post> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Post"))
    }

    /// Attaches the post's comments, oldest first.
    pub async fn with_comments(&self, mut post: Post) -> Result<Post> {
        post.comments = self.comment_repository.get_by_post_id(post.id).await?;
        Ok(post)
    }

    /// Applies the fields present in `changes` to an already loaded post.
    pub async fn update_post(&self, mut post: Post, changes: UpdatePostRequest) -> Result<Post> {
        let mut errors = ValidationErrors::new();
        if let Some(ref title) = changes.title {
            if errors.required("title", title) {
                errors.max_length("title", title, TITLE_MAX_LEN);
            }
        }
        if let Some(ref content) = changes.content {
            if errors.required("content", content) {
                errors.max_length("content", content, CONTENT_MAX_LEN);
            }
        }
        errors.into_result()?;

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }

        self.repository
            .update(&post)
            .await?
            .ok_or(AppError::NotFound("Post"))
    }

    pub async fn delete_post(&self, id: i64) -> Result<()> {
        if self.repository.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Post"))
        }
    }

    pub async fn create_comment(
        &self,
        post: &Post,
        request: CreateCommentRequest,
    ) -> Result<Comment> {
        let mut errors = ValidationErrors::new();
        if errors.required("content", &request.content) {
            errors.max_length("content", &request.content, CONTENT_MAX_LEN);
        }
        errors.into_result()?;

        self.comment_repository.create(post.id, &request).await
    }
}
