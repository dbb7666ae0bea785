//! Account registration with an emailed activation invite.
//!
//! The user row and its invitation are committed together first. The mail is
//! sent afterwards; it cannot join that transaction, so a failed send is
//! undone by deleting the user again.

use crate::models::{NewUser, User};
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::mailer::{MailError, MailTemplate, Mailer};
use crate::services::validation::ValidationErrors;
use crate::services::{password, token_codec};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const USERNAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 3;
pub const PASSWORD_MAX_LEN: usize = 72;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("a user with that email already exists")]
    DuplicateEmail,
    #[error("a user with that username already exists")]
    DuplicateUsername,
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Failed to send invitation: {0}")]
    Dispatch(#[source] MailError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterUserRequest {
    /// Strips surrounding whitespace so the stored username and email are
    /// the ones that were validated.
    pub fn normalize(&mut self) {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if errors.required("username", &self.username) {
            errors.max_length("username", &self.username, USERNAME_MAX_LEN);
        }
        if errors.required("email", &self.email) {
            errors.max_length("email", &self.email, EMAIL_MAX_LEN);
            errors.email("email", &self.email);
        }
        errors.length_between("password", &self.password, PASSWORD_MIN_LEN, PASSWORD_MAX_LEN);

        errors.into_result()
    }
}

/// A freshly registered user and the plaintext activation token that was
/// mailed to it. The token is not recoverable from storage.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct InvitationSettings {
    /// Base of the activation link, e.g. `http://localhost:5173`.
    pub frontend_url: String,
    pub ttl: Duration,
    pub is_sandbox: bool,
}

pub struct RegistrationService {
    repository: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    settings: InvitationSettings,
}

impl RegistrationService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        mailer: Arc<dyn Mailer>,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            repository,
            mailer,
            settings,
        }
    }

    pub async fn register_and_invite(
        &self,
        mut request: RegisterUserRequest,
    ) -> Result<RegisteredUser, RegistrationError> {
        request.normalize();
        request.validate().map_err(RegistrationError::Validation)?;

        let password_hash = password::hash_password(&request.password)
            .map_err(|e| RegistrationError::Internal(format!("password hashing failed: {}", e)))?;

        let new_user = NewUser {
            username: request.username,
            email: request.email,
            password_hash,
        };

        let token = token_codec::generate();
        let expires_at = Utc::now()
            .checked_add_signed(self.settings.ttl)
            .ok_or_else(|| {
                RegistrationError::Internal("invitation expiry out of range".to_string())
            })?;

        let user = self
            .repository
            .create_and_invite(&new_user, &token.digest, expires_at)
            .await
            .map_err(|e| match e {
                RepositoryError::DuplicateEmail => RegistrationError::DuplicateEmail,
                RepositoryError::DuplicateUsername => RegistrationError::DuplicateUsername,
                other => RegistrationError::Internal(other.to_string()),
            })?;

        let activation_url = self.activation_url(&token.plaintext);
        let template = MailTemplate::UserInvitation { activation_url };

        if let Err(e) = self
            .mailer
            .send(
                template,
                &user.username,
                &user.email,
                self.settings.is_sandbox,
            )
            .await
        {
            tracing::warn!(
                "Invitation to {} failed, removing user {}: {}",
                user.email,
                user.id,
                e
            );
            self.compensate(&user).await;
            return Err(RegistrationError::Dispatch(e));
        }

        tracing::info!("Sent invitation to {} (user {})", user.email, user.id);

        Ok(RegisteredUser {
            user,
            token: token.plaintext,
        })
    }

    fn activation_url(&self, plaintext: &str) -> String {
        format!(
            "{}/confirm/{}",
            self.settings.frontend_url.trim_end_matches('/'),
            plaintext
        )
    }

    /// Best effort: a failure here leaves an inactive user whose invite was
    /// never delivered. It needs manual cleanup, the caller still only sees
    /// the dispatch error.
    async fn compensate(&self, user: &User) {
        if let Err(e) = self.repository.delete_user(user.id).await {
            tracing::error!(
                user_id = user.id,
                email = %user.email,
                "Failed to remove user after invitation failure, orphaned pending user left behind: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_repository::MockUserRepository;
    use crate::services::mailer::MockMailer;
    use mockall::predicate::*;

    fn settings() -> InvitationSettings {
        InvitationSettings {
            frontend_url: "http://localhost:5173/".to_string(),
            ttl: Duration::days(3),
            is_sandbox: true,
        }
    }

    fn request(username: &str, email: &str, password: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn stored_user(id: i64) -> User {
        User {
            id,
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "hash".to_string(),
            created_at: "2025-03-01 00:00:00".to_string(),
            is_active: false,
        }
    }

    #[test]
    fn test_validation_boundaries() {
        assert!(request(&"a".repeat(100), "a@x.com", "abc").validate().is_ok());
        assert!(request(&"a".repeat(101), "a@x.com", "abc").validate().is_err());
        assert!(request("alice", "a@x.com", "ab").validate().is_err());
        assert!(request("alice", "a@x.com", &"p".repeat(72)).validate().is_ok());
        assert!(request("alice", "a@x.com", &"p".repeat(73)).validate().is_err());
    }

    fn email_of_len(last_label: usize) -> String {
        format!(
            "{}@{}.{}.{}.{}.com",
            "a".repeat(64),
            "b".repeat(45),
            "c".repeat(45),
            "d".repeat(45),
            "e".repeat(last_label)
        )
    }

    #[test]
    fn test_validation_email_length() {
        let ok = email_of_len(48);
        assert_eq!(ok.len(), 255);
        assert!(request("alice", &ok, "abc").validate().is_ok());

        let too_long = email_of_len(49);
        assert_eq!(too_long.len(), 256);
        assert!(request("alice", &too_long, "abc").validate().is_err());
    }

    #[test]
    fn test_normalize_trims_username_and_email() {
        let mut req = request("  alice ", " alice@x.com  ", " secret ");
        req.normalize();
        assert_eq!(req.username, "alice");
        assert_eq!(req.email, "alice@x.com");
        assert_eq!(req.password, " secret ");
    }

    #[test]
    fn test_validation_lists_every_violation() {
        let errors = request("", "not-an-email", "x").validate().unwrap_err();
        assert_eq!(errors.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_request_has_no_side_effects() {
        // No expectations: any repository or mailer call panics.
        let service = RegistrationService::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockMailer::new()),
            settings(),
        );

        let result = service
            .register_and_invite(request("alice", "alice@x.com", "no"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_success_mails_plaintext_and_stores_digest() {
        let mut mock_repo = MockUserRepository::new();
        let captured_digest = Arc::new(std::sync::Mutex::new(String::new()));
        let digest_slot = captured_digest.clone();

        mock_repo
            .expect_create_and_invite()
            .times(1)
            .returning(move |user, digest, _| {
                assert_eq!(user.username, "alice");
                assert_ne!(user.password_hash, "secret123");
                *digest_slot.lock().unwrap() = digest.to_string();
                let stored = stored_user(7);
                Box::pin(async move { Ok(stored) })
            });
        mock_repo.expect_delete_user().never();

        let mut mock_mailer = MockMailer::new();
        let captured_url = Arc::new(std::sync::Mutex::new(String::new()));
        let url_slot = captured_url.clone();
        mock_mailer
            .expect_send()
            .with(always(), eq("alice"), eq("alice@x.com"), eq(true))
            .times(1)
            .returning(move |template, _, _, _| {
                let MailTemplate::UserInvitation { activation_url } = template;
                *url_slot.lock().unwrap() = activation_url;
                Box::pin(async { Ok(()) })
            });

        let service =
            RegistrationService::new(Arc::new(mock_repo), Arc::new(mock_mailer), settings());

        let registered = service
            .register_and_invite(request("alice", "alice@x.com", "secret123"))
            .await
            .expect("registration should succeed");

        assert_eq!(registered.user.id, 7);
        assert_eq!(
            *captured_digest.lock().unwrap(),
            token_codec::digest(&registered.token)
        );
        assert_eq!(
            *captured_url.lock().unwrap(),
            format!("http://localhost:5173/confirm/{}", registered.token)
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_is_reported() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_create_and_invite()
            .times(1)
            .returning(|_, _, _| Box::pin(async { Err(RepositoryError::DuplicateUsername) }));

        let mut mock_mailer = MockMailer::new();
        mock_mailer.expect_send().never();

        let service =
            RegistrationService::new(Arc::new(mock_repo), Arc::new(mock_mailer), settings());

        let result = service
            .register_and_invite(request("alice", "alice@x.com", "secret123"))
            .await;
        assert!(matches!(result, Err(RegistrationError::DuplicateUsername)));
    }

    #[tokio::test]
    async fn test_storage_fault_is_internal() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_create_and_invite()
            .times(1)
            .returning(|_, _, _| {
                Box::pin(async { Err(RepositoryError::Database(sqlx::Error::PoolTimedOut)) })
            });

        let service = RegistrationService::new(
            Arc::new(mock_repo),
            Arc::new(MockMailer::new()),
            settings(),
        );

        let result = service
            .register_and_invite(request("alice", "alice@x.com", "secret123"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Internal(_))));
    }

    #[tokio::test]
    async fn test_dispatch_failure_deletes_user() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_create_and_invite()
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(stored_user(11)) }));
        mock_repo
            .expect_delete_user()
            .with(eq(11))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut mock_mailer = MockMailer::new();
        mock_mailer.expect_send().times(1).returning(|_, _, _, _| {
            Box::pin(async { Err(MailError::SendFailed("connection refused".to_string())) })
        });

        let service =
            RegistrationService::new(Arc::new(mock_repo), Arc::new(mock_mailer), settings());

        let result = service
            .register_and_invite(request("alice", "alice@x.com", "secret123"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Dispatch(_))));
    }

    #[tokio::test]
    async fn test_failed_compensation_still_reports_dispatch_error() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_create_and_invite()
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(stored_user(12)) }));
        mock_repo
            .expect_delete_user()
            .with(eq(12))
            .times(1)
            .returning(|_| {
                Box::pin(async { Err(RepositoryError::Database(sqlx::Error::PoolClosed)) })
            });

        let mut mock_mailer = MockMailer::new();
        mock_mailer.expect_send().times(1).returning(|_, _, _, _| {
            Box::pin(async { Err(MailError::SendFailed("timeout".to_string())) })
        });

        let service =
            RegistrationService::new(Arc::new(mock_repo), Arc::new(mock_mailer), settings());

        let result = service
            .register_and_invite(request("alice", "alice@x.com", "secret123"))
            .await;
        assert!(matches!(result, Err(RegistrationError::Dispatch(_))));
    }
}
