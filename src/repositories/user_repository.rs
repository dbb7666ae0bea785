use crate::models::{NewUser, User, UserInvitation};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Username already taken")]
    DuplicateUsername,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, created_at, is_active
    FROM users
"#;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    /// Inserts the user and its invitation in one transaction. Either both
    /// rows exist afterwards or neither does.
    async fn create_and_invite(
        &self,
        user: &NewUser,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<User>;
    /// Inserts a user without an invitation, already active or not.
    async fn create_user(&self, user: &NewUser, is_active: bool) -> RepositoryResult<User>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
    /// Removes the user together with any outstanding invitation.
    async fn delete_user(&self, id: i64) -> RepositoryResult<()>;
    async fn find_invitation(&self, token_hash: &str) -> RepositoryResult<Option<UserInvitation>>;
    async fn delete_invitation(&self, token_hash: &str) -> RepositoryResult<()>;
    /// Marks the user active and drops every invitation it still has.
    async fn activate_user(&self, id: i64) -> RepositoryResult<()>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn classify_write_error(err: sqlx::Error) -> RepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("users.email") {
                return RepositoryError::DuplicateEmail;
            }
            if message.contains("users.username") {
                return RepositoryError::DuplicateUsername;
            }
        }
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_and_invite(
        &self,
        user: &NewUser,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<User> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_active) VALUES (?, ?, ?, 0)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&mut *tx)
        .await
        .map_err(classify_write_error)?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO user_invitations (token_hash, user_id, expires_at) VALUES (?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, User>(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn create_user(&self, user: &NewUser, is_active: bool) -> RepositoryResult<User> {
        let user_id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_active) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(is_active)
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?
        .last_insert_rowid();

        self.find_by_id(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_invitations WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn find_invitation(&self, token_hash: &str) -> RepositoryResult<Option<UserInvitation>> {
        let invitation = sqlx::query_as::<_, UserInvitation>(
            "SELECT token_hash, user_id, expires_at FROM user_invitations WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    async fn delete_invitation(&self, token_hash: &str) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM user_invitations WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn activate_user(&self, id: i64) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE users SET is_active = 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM user_invitations WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_invite_writes_both_rows() {
        let pool = create_test_pool().await;
        let repo = SqliteUserRepository::new(pool.clone());

        let user = repo
            .create_and_invite(
                &new_user("alice", "alice@x.com"),
                "digest",
                Utc::now() + Duration::days(3),
            )
            .await
            .unwrap();

        assert!(user.id > 0);
        assert!(!user.is_active);
        assert_eq!(count(&pool, "users").await, 1);

        let invitation = repo.find_invitation("digest").await.unwrap().unwrap();
        assert_eq!(invitation.user_id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_rolls_back() {
        let pool = create_test_pool().await;
        let repo = SqliteUserRepository::new(pool.clone());
        let expires_at = Utc::now() + Duration::days(3);

        repo.create_and_invite(&new_user("alice", "alice@x.com"), "first", expires_at)
            .await
            .unwrap();

        let result = repo
            .create_and_invite(&new_user("alice", "other@x.com"), "second", expires_at)
            .await;

        assert!(matches!(result, Err(RepositoryError::DuplicateUsername)));
        assert_eq!(count(&pool, "users").await, 1);
        assert_eq!(count(&pool, "user_invitations").await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let pool = create_test_pool().await;
        let repo = SqliteUserRepository::new(pool);
        let expires_at = Utc::now() + Duration::days(3);

        repo.create_and_invite(&new_user("alice", "alice@x.com"), "first", expires_at)
            .await
            .unwrap();

        let result = repo
            .create_and_invite(&new_user("alice2", "ALICE@x.com"), "second", expires_at)
            .await;

        assert!(matches!(result, Err(RepositoryError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_delete_user_removes_invitation() {
        let pool = create_test_pool().await;
        let repo = SqliteUserRepository::new(pool.clone());

        let user = repo
            .create_and_invite(
                &new_user("bob", "bob@x.com"),
                "digest",
                Utc::now() + Duration::days(3),
            )
            .await
            .unwrap();

        repo.delete_user(user.id).await.unwrap();

        assert_eq!(count(&pool, "users").await, 0);
        assert_eq!(count(&pool, "user_invitations").await, 0);
        assert!(matches!(
            repo.delete_user(user.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_activate_user() {
        let pool = create_test_pool().await;
        let repo = SqliteUserRepository::new(pool.clone());

        let user = repo
            .create_and_invite(
                &new_user("carol", "carol@x.com"),
                "digest",
                Utc::now() + Duration::days(3),
            )
            .await
            .unwrap();

        repo.activate_user(user.id).await.unwrap();

        let activated = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(activated.is_active);
        assert!(repo.find_invitation("digest").await.unwrap().is_none());
    }
}
