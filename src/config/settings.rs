use chrono::{Duration, Utc};
use std::{env, str::FromStr};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpEncryption {
    Tls,
    StartTls,
    None,
}

impl FromStr for SmtpEncryption {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "tls" => Ok(SmtpEncryption::Tls),
            "starttls" => Ok(SmtpEncryption::StartTls),
            "none" => Ok(SmtpEncryption::None),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub encryption: SmtpEncryption,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    /// How long an activation link stays valid.
    pub invitation_ttl: Duration,
    pub from_email: String,
    pub from_name: String,
    /// `None` when `SMTP_HOST` is unset; mail is then only logged.
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: String,
    pub environment: String,
    pub frontend_url: String,
    pub database: DatabaseSettings,
    pub mail: MailSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let smtp = match env::var("SMTP_HOST") {
            Ok(host) if !host.is_empty() => Some(SmtpSettings {
                host,
                port: get_parsed("SMTP_PORT", 587)?,
                username: get_required("SMTP_USERNAME")?,
                password: get_required("SMTP_PASSWORD")?,
                encryption: get_parsed("SMTP_ENCRYPTION", SmtpEncryption::StartTls)?,
            }),
            _ => None,
        };

        Ok(Settings {
            addr: get_string("ADDR", "0.0.0.0:8080"),
            environment: get_string("ENV", "development"),
            frontend_url: get_string("FRONTEND_URL", "http://localhost:5173"),
            database: DatabaseSettings {
                url: get_string("DATABASE_URL", "sqlite://data/sodia.db"),
                max_connections: get_parsed("DB_MAX_CONNECTIONS", 5)?,
            },
            mail: MailSettings {
                invitation_ttl: get_ttl_hours("INVITATION_TTL_HOURS", 72)?,
                from_email: get_string("FROM_EMAIL", ""),
                from_name: get_string("FROM_NAME", "Sodia"),
                smtp,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn get_string(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn get_required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn get_parsed<T: FromStr>(key: &'static str, fallback: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(fallback),
    }
}

/// A positive number of hours that still yields a representable expiry.
fn get_ttl_hours(key: &'static str, fallback: i64) -> Result<Duration, ConfigError> {
    let hours: i64 = get_parsed(key, fallback)?;
    Duration::try_hours(hours)
        .filter(|ttl| hours > 0 && Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: hours.to_string(),
        })
}
