pub mod test_helpers {
    use crate::config::{DatabaseSettings, MailSettings, Settings};
    use crate::services::{MailError, MailTemplate, Mailer};
    use async_trait::async_trait;
    use sqlx::{
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
        SqlitePool,
    };
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::NamedTempFile;
    use tokio::sync::Mutex;

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Allows several connections, so requests can race each other
    pub async fn create_test_db_file() -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let options = SqliteConnectOptions::new()
            .filename(temp_file.path())
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Settings pointing at nothing external: log-only mail, development env
    pub fn test_settings() -> Settings {
        Settings {
            addr: "127.0.0.1:0".to_string(),
            environment: "development".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            database: DatabaseSettings {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            mail: MailSettings {
                invitation_ttl: chrono::Duration::hours(72),
                from_email: "noreply@sodia.test".to_string(),
                from_name: "Sodia".to_string(),
                smtp: None,
            },
        }
    }

    /// Insert a test user with hashed password
    pub async fn insert_test_user(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        active: bool,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = crate::services::password::hash_password(password).map_err(|e| {
            sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
        })?;

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_active) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(active)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Create a test post for testing
    pub async fn insert_test_post(
        pool: &SqlitePool,
        user_id: i64,
        title: &str,
        content: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO posts (title, content, user_id, tags) VALUES (?, ?, ?, '[]')",
        )
        .bind(title)
        .bind(content)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
    }

    #[derive(Debug, Clone)]
    pub struct SentMail {
        pub template: MailTemplate,
        pub username: String,
        pub email: String,
        pub is_sandbox: bool,
    }

    /// Keeps every message instead of delivering it
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<SentMail>>,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            template: MailTemplate,
            username: &str,
            email: &str,
            is_sandbox: bool,
        ) -> Result<(), MailError> {
            self.sent.lock().await.push(SentMail {
                template,
                username: username.to_string(),
                email: email.to_string(),
                is_sandbox,
            });
            Ok(())
        }
    }

    /// Rejects every message, counting the attempts
    #[derive(Default)]
    pub struct FailingMailer {
        attempts: AtomicUsize,
    }

    impl FailingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(
            &self,
            _template: MailTemplate,
            _username: &str,
            _email: &str,
            _is_sandbox: bool,
        ) -> Result<(), MailError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(MailError::SendFailed("connection refused".to_string()))
        }
    }
}

// Note: This is test-only code. Panic on error is acceptable in tests.
#[cfg(test)]
pub async fn create_test_pool() -> sqlx::SqlitePool {
    match test_helpers::create_test_db().await {
        Ok(pool) => pool,
        Err(e) => panic!("Failed to create test pool: {}", e),
    }
}
