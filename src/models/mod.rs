pub mod comment;
pub mod invitation;
pub mod post;
pub mod user;

pub use comment::{Comment, CreateCommentRequest};
pub use invitation::UserInvitation;
pub use post::{CreatePostRequest, Post, PostRow, UpdatePostRequest};
pub use user::{NewUser, User};
