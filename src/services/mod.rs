pub mod mailer;
pub mod password;
pub mod post_service;
pub mod registration_service;
pub mod token_codec;
pub mod user_service;
pub mod validation;

pub use mailer::{create_mailer, LogMailer, MailError, MailTemplate, Mailer, SmtpMailer};
pub use post_service::PostService;
pub use registration_service::{
    InvitationSettings, RegisterUserRequest, RegisteredUser, RegistrationError,
    RegistrationService,
};
pub use user_service::{UserService, UserServiceError};
pub use validation::ValidationErrors;
