use crate::error::{AppError, Result};
use crate::models::{CreatePostRequest, Post, PostRow};
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PostRepository: Send + Sync {
    async fn create(&self, request: &CreatePostRequest) -> Result<Post>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;
    async fn update(&self, post: &Post) -> Result<Option<Post>>;
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlitePostRepository {
    pool: SqlitePool,
}

impl SqlitePostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// A dangling `user_id` or `post_id` on insert is reported as a bad request.
pub(crate) fn map_reference_error(err: sqlx::Error) -> AppError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_foreign_key_violation() => {
            AppError::BadRequest("referenced record does not exist".to_string())
        }
        _ => AppError::Database(err),
    }
}

fn into_post(row: PostRow) -> Result<Post> {
    Post::try_from(row).map_err(|e| {
        tracing::error!("Corrupt tags column: {}", e);
        AppError::InternalError
    })
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(&self, request: &CreatePostRequest) -> Result<Post> {
        let tags = serde_json::to_string(&request.tags).map_err(|_| AppError::InternalError)?;

        let row = sqlx::query_as::<_, PostRow>(
            r#"
            INSERT INTO posts (title, content, user_id, tags)
            VALUES (?, ?, ?, ?)
            RETURNING id, title, content, user_id, tags, created_at, updated_at
            "#,
        )
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.user_id)
        .bind(tags)
        .fetch_one(&self.pool)
        .await
        .map_err(map_reference_error)?;

        into_post(row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, content, user_id, tags, created_at, updated_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_post).transpose()
    }

    async fn update(&self, post: &Post) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts
            SET title = ?, content = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            RETURNING id, title, content, user_id, tags, created_at, updated_at
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_post).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
