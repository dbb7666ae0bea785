pub mod settings;

pub use settings::{ConfigError, DatabaseSettings, MailSettings, Settings, SmtpEncryption, SmtpSettings};
