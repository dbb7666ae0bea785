use crate::models::User;
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::token_codec;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("User not found")]
    UserNotFound,
    #[error("Invitation not found or expired")]
    InvitationNotFound,
    #[error("Invalid invitation expiry: {0}")]
    InvalidExpiry(String),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    /// Activates the pending user the token was issued to. Expired
    /// invitations are removed and reported as not found.
    pub async fn activate(&self, token: &str) -> Result<(), UserServiceError> {
        let token_hash = token_codec::digest(token);

        let invitation = self
            .repository
            .find_invitation(&token_hash)
            .await?
            .ok_or(UserServiceError::InvitationNotFound)?;

        let expires_at = DateTime::parse_from_rfc3339(&invitation.expires_at)
            .map_err(|e| UserServiceError::InvalidExpiry(e.to_string()))?;

        if expires_at < Utc::now() {
            self.repository.delete_invitation(&token_hash).await?;
            return Err(UserServiceError::InvitationNotFound);
        }

        match self.repository.activate_user(invitation.user_id).await {
            Ok(()) => {
                tracing::info!("Activated user {}", invitation.user_id);
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserInvitation;
    use crate::repositories::user_repository::MockUserRepository;
    use chrono::Duration;
    use mockall::predicate::*;

    fn invitation(token: &str, expires_at: DateTime<Utc>) -> UserInvitation {
        UserInvitation {
            token_hash: token_codec::digest(token),
            user_id: 3,
            expires_at: expires_at.to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_activate_looks_up_by_digest() {
        let mut mock_repo = MockUserRepository::new();
        let pending = invitation("plain-token", Utc::now() + Duration::hours(1));
        let expected_hash = pending.token_hash.clone();

        mock_repo
            .expect_find_invitation()
            .withf(move |hash| hash == expected_hash)
            .times(1)
            .returning(move |_| {
                let pending = pending.clone();
                Box::pin(async move { Ok(Some(pending)) })
            });
        mock_repo
            .expect_activate_user()
            .with(eq(3))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let service = UserService::new(Arc::new(mock_repo));
        assert!(service.activate("plain-token").await.is_ok());
    }

    #[tokio::test]
    async fn test_activate_expired_invitation() {
        let mut mock_repo = MockUserRepository::new();
        let expired = invitation("old-token", Utc::now() - Duration::hours(1));

        mock_repo
            .expect_find_invitation()
            .times(1)
            .returning(move |_| {
                let expired = expired.clone();
                Box::pin(async move { Ok(Some(expired)) })
            });
        mock_repo
            .expect_delete_invitation()
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));
        mock_repo.expect_activate_user().never();

        let service = UserService::new(Arc::new(mock_repo));
        assert!(matches!(
            service.activate("old-token").await,
            Err(UserServiceError::InvitationNotFound)
        ));
    }

    #[tokio::test]
    async fn test_activate_unknown_token() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_find_invitation()
            .times(1)
            .returning(|_| Box::pin(async { Ok(None) }));

        let service = UserService::new(Arc::new(mock_repo));
        assert!(matches!(
            service.activate("nope").await,
            Err(UserServiceError::InvitationNotFound)
        ));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_find_by_id()
            .with(eq(42))
            .times(1)
            .returning(|_| Box::pin(async { Ok(None) }));

        let service = UserService::new(Arc::new(mock_repo));
        assert!(matches!(
            service.get_user(42).await,
            Err(UserServiceError::UserNotFound)
        ));
    }
}
