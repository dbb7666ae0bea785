pub mod auth_handlers;
pub mod extract;
pub mod health_handlers;
pub mod post_handlers;
pub mod user_handlers;

pub use auth_handlers::register_user_handler;
pub use health_handlers::health_check_handler;
pub use post_handlers::{
    create_comment_handler, create_post_handler, delete_post_handler, get_post_handler,
    update_post_handler,
};
pub use user_handlers::{activate_user_handler, get_user_handler};
