use super::post_repository::map_reference_error;
use crate::error::Result;
use crate::models::{Comment, CreateCommentRequest};
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, post_id: i64, request: &CreateCommentRequest) -> Result<Comment>;
    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Comment>>;
}

pub struct SqliteCommentRepository {
    pool: SqlitePool,
}

impl SqliteCommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn create(&self, post_id: i64, request: &CreateCommentRequest) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, user_id, content)
            VALUES (?, ?, ?)
            RETURNING id, post_id, user_id, content, created_at
            "#,
        )
        .bind(post_id)
        .bind(request.user_id)
        .bind(&request.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_reference_error)?;

        Ok(comment)
    }

    async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, content, created_at
            FROM comments
            WHERE post_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }
}
