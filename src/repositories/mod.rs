pub mod comment_repository;
pub mod post_repository;
pub mod user_repository;

pub use comment_repository::{CommentRepository, SqliteCommentRepository};
pub use post_repository::{PostRepository, SqlitePostRepository};
pub use user_repository::{RepositoryError, SqliteUserRepository, UserRepository};
