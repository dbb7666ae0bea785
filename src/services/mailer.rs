use crate::config::{MailSettings, SmtpEncryption, SmtpSettings};
use askama::Template;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::{sync::Arc, time::Duration};

pub const APP_NAME: &str = "Sodia";
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to render template {0}: {1}")]
    Template(&'static str, String),
    #[error("Failed to build email message: {0}")]
    MessageBuild(String),
    #[error("Failed to send email: {0}")]
    SendFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A mail template together with the variables it is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTemplate {
    UserInvitation { activation_url: String },
}

#[derive(Template)]
#[template(path = "email/user_invitation.html")]
struct UserInvitationHtml<'a> {
    app_name: &'a str,
    username: &'a str,
    activation_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/user_invitation.txt")]
struct UserInvitationText<'a> {
    app_name: &'a str,
    username: &'a str,
    activation_url: &'a str,
}

#[derive(Debug, Clone)]
pub struct RenderedMail {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl MailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MailTemplate::UserInvitation { .. } => "user_invitation",
        }
    }

    pub fn render(&self, username: &str) -> Result<RenderedMail, MailError> {
        let to_mail_error = |e: askama::Error| MailError::Template(self.name(), e.to_string());

        match self {
            MailTemplate::UserInvitation { activation_url } => Ok(RenderedMail {
                subject: format!("Finish registration with {}", APP_NAME),
                text_body: UserInvitationText {
                    app_name: APP_NAME,
                    username,
                    activation_url,
                }
                .render()
                .map_err(to_mail_error)?,
                html_body: UserInvitationHtml {
                    app_name: APP_NAME,
                    username,
                    activation_url,
                }
                .render()
                .map_err(to_mail_error)?,
            }),
        }
    }
}

/// Delivers templated mail. `is_sandbox` asks the implementation not to reach
/// a real inbox.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        template: MailTemplate,
        username: &str,
        email: &str,
        is_sandbox: bool,
    ) -> Result<(), MailError>;
}

/// Renders mail and writes it to the log instead of sending it.
pub struct LogMailer {
    from_email: String,
}

impl LogMailer {
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        template: MailTemplate,
        username: &str,
        email: &str,
        is_sandbox: bool,
    ) -> Result<(), MailError> {
        let rendered = template.render(username)?;
        tracing::info!("📧 [LOG MAILER] {} to: {} <{}>", template.name(), username, email);
        tracing::info!("   From: {}", self.from_email);
        tracing::info!("   Subject: {}", rendered.subject);
        tracing::info!("   Sandbox: {}", is_sandbox);
        if let MailTemplate::UserInvitation { activation_url } = &template {
            tracing::info!("   Activation link: {}", activation_url);
        }
        tracing::info!("   ---");
        Ok(())
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
    retry_delay: Duration,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpSettings, from_email: &str, from_name: &str) -> Result<Self, MailError> {
        if from_email.is_empty() {
            return Err(MailError::ConfigError("FROM_EMAIL not set".to_string()));
        }

        let credentials = Credentials::new(smtp.username.clone(), smtp.password.clone());

        let transport = match smtp.encryption {
            SmtpEncryption::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                .map_err(|e| MailError::ConfigError(format!("SMTP relay error: {}", e)))?
                .port(smtp.port)
                .credentials(credentials)
                .build(),
            SmtpEncryption::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                    .map_err(|e| MailError::ConfigError(format!("SMTP starttls error: {}", e)))?
                    .port(smtp.port)
                    .credentials(credentials)
                    .build()
            }
            SmtpEncryption::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
                    .port(smtp.port)
                    .credentials(credentials)
                    .build()
            }
        };

        Ok(Self {
            transport,
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
            retry_delay: Duration::from_secs(1),
        })
    }

    fn build_message(
        &self,
        rendered: RenderedMail,
        username: &str,
        email: &str,
    ) -> Result<Message, MailError> {
        Message::builder()
            .from(
                format!("{} <{}>", self.from_name, self.from_email)
                    .parse()
                    .map_err(|e| MailError::MessageBuild(format!("Invalid from address: {}", e)))?,
            )
            .to(Mailbox::new(
                Some(username.to_string()),
                email
                    .parse()
                    .map_err(|e| MailError::MessageBuild(format!("Invalid to address: {}", e)))?,
            ))
            .subject(rendered.subject)
            .multipart(MultiPart::alternative_plain_html(
                rendered.text_body,
                rendered.html_body,
            ))
            .map_err(|e| MailError::MessageBuild(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        template: MailTemplate,
        username: &str,
        email: &str,
        is_sandbox: bool,
    ) -> Result<(), MailError> {
        let rendered = template.render(username)?;
        let message = self.build_message(rendered, username, email)?;

        if is_sandbox {
            tracing::info!(
                "Sandbox mode: {} mail to {} built but not delivered",
                template.name(),
                email
            );
            return Ok(());
        }

        let mut last_error = String::new();
        for attempt in 1..=MAX_RETRIES {
            match self.transport.send(message.clone()).await {
                Ok(_) => {
                    tracing::info!("Sent {} mail to {}", template.name(), email);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        "Attempt {}/{} to send {} mail to {} failed: {}",
                        attempt,
                        MAX_RETRIES,
                        template.name(),
                        email,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        Err(MailError::SendFailed(format!(
            "gave up after {} attempts: {}",
            MAX_RETRIES, last_error
        )))
    }
}

pub fn create_mailer(settings: &MailSettings) -> Arc<dyn Mailer> {
    if let Some(smtp) = &settings.smtp {
        match SmtpMailer::new(smtp, &settings.from_email, &settings.from_name) {
            Ok(mailer) => {
                tracing::info!("Using SMTP mailer via {}", smtp.host);
                return Arc::new(mailer);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize SMTP mailer: {}. Falling back to log mailer",
                    e
                );
            }
        }
    } else {
        tracing::info!("SMTP not configured. Using log mailer (mail is written to the log)");
    }
    Arc::new(LogMailer::new(settings.from_email.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_contains_link_and_username() {
        let template = MailTemplate::UserInvitation {
            activation_url: "http://localhost:5173/confirm/abc-123".to_string(),
        };

        let rendered = template.render("alice").unwrap();
        assert_eq!(rendered.subject, "Finish registration with Sodia");
        assert!(rendered.html_body.contains("http://localhost:5173/confirm/abc-123"));
        assert!(rendered.html_body.contains("alice"));
        assert!(rendered.text_body.contains("http://localhost:5173/confirm/abc-123"));
    }

    #[test]
    fn test_html_body_escapes_username() {
        let template = MailTemplate::UserInvitation {
            activation_url: "http://localhost/confirm/t".to_string(),
        };

        let rendered = template.render("<script>").unwrap();
        assert!(!rendered.html_body.contains("<script>"));
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        let mailer = LogMailer::new("noreply@sodia.test");
        let result = mailer
            .send(
                MailTemplate::UserInvitation {
                    activation_url: "http://localhost/confirm/t".to_string(),
                },
                "alice",
                "alice@x.com",
                true,
            )
            .await;
        assert!(result.is_ok());
    }

    // Nothing listens on this port; sandbox mode must not try to connect.
    fn sandbox_mailer() -> SmtpMailer {
        let smtp = SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "user".to_string(),
            password: "pass".to_string(),
            encryption: SmtpEncryption::None,
        };
        SmtpMailer::new(&smtp, "noreply@sodia.test", APP_NAME).unwrap()
    }

    #[tokio::test]
    async fn test_smtp_mailer_sandbox_skips_delivery() {
        let mailer = sandbox_mailer();

        let result = mailer
            .send(
                MailTemplate::UserInvitation {
                    activation_url: "http://localhost/confirm/t".to_string(),
                },
                "alice",
                "alice@x.com",
                true,
            )
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_smtp_mailer_requires_from_email() {
        let smtp = SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 25,
            username: "user".to_string(),
            password: "pass".to_string(),
            encryption: SmtpEncryption::None,
        };
        assert!(matches!(
            SmtpMailer::new(&smtp, "", APP_NAME),
            Err(MailError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_validated_addresses_are_deliverable() {
        use crate::services::validation::is_valid_email;

        let mailer = sandbox_mailer();
        for email in [
            "alice@x.com",
            "first.last+tag@example.co.uk",
            "a,b@x.com",
            "a@b@x.com",
            "al ice@x.com",
        ] {
            let result = mailer
                .send(
                    MailTemplate::UserInvitation {
                        activation_url: "http://localhost/confirm/t".to_string(),
                    },
                    "alice",
                    email,
                    true,
                )
                .await;
            if is_valid_email(email) {
                assert!(result.is_ok(), "{} validated but could not be sent", email);
            } else {
                assert!(result.is_err(), "{} was rejected but the mailer accepts it", email);
            }
        }
    }
}
