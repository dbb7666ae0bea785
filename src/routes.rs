use crate::{handlers, AppState};
use axum::{
    http::header,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Builds the `/v1` API router around the shared state.
pub fn build_router(state: AppState) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let api = Router::new()
        .route("/health", get(handlers::health_check_handler))
        .route(
            "/authentication/user",
            post(handlers::register_user_handler),
        )
        .route(
            "/users/activate/{token}",
            put(handlers::activate_user_handler),
        )
        .route("/users/{user_id}", get(handlers::get_user_handler))
        .route("/posts", post(handlers::create_post_handler))
        .route(
            "/posts/{post_id}",
            get(handlers::get_post_handler)
                .patch(handlers::update_post_handler)
                .delete(handlers::delete_post_handler),
        )
        .route(
            "/posts/{post_id}/comments",
            post(handlers::create_comment_handler),
        );

    Router::new()
        .nest("/v1", api)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
