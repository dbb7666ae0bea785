pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub registration_service: Arc<services::RegistrationService>,
    pub user_service: Arc<services::UserService>,
    pub post_service: Arc<services::PostService>,
}

impl AppState {
    /// Wires the SQLite repositories and the given mailer into the services.
    pub fn new(
        settings: config::Settings,
        pool: sqlx::SqlitePool,
        mailer: Arc<dyn services::Mailer>,
    ) -> Self {
        let user_repository = Arc::new(repositories::SqliteUserRepository::new(pool.clone()));
        let post_repository = Arc::new(repositories::SqlitePostRepository::new(pool.clone()));
        let comment_repository = Arc::new(repositories::SqliteCommentRepository::new(pool));

        let invitation_settings = services::InvitationSettings {
            frontend_url: settings.frontend_url.clone(),
            ttl: settings.mail.invitation_ttl,
            is_sandbox: !settings.is_production(),
        };

        Self {
            registration_service: Arc::new(services::RegistrationService::new(
                user_repository.clone(),
                mailer,
                invitation_settings,
            )),
            user_service: Arc::new(services::UserService::new(user_repository)),
            post_service: Arc::new(services::PostService::new(
                post_repository,
                comment_repository,
            )),
            settings: Arc::new(settings),
        }
    }
}
