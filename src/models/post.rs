use super::Comment;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Raw `posts` row; tags are stored as a JSON array string.
#[derive(Debug, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<PostRow> for Post {
    type Error = serde_json::Error;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Post {
            id: row.id,
            title: row.title,
            content: row.content,
            user_id: row.user_id,
            tags: serde_json::from_str(&row.tags)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            comments: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub user_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}
