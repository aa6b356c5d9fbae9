pub mod application;
pub mod auth;
pub mod csrf;
pub mod email;
pub mod password_reset;
pub mod token;

pub use application::ApplicationService;
pub use auth::{AuthService, AuthSession};
pub use csrf::{CsrfService, SessionBinding};
pub use email::{EmailService, LogMailer, Mailer};
pub use password_reset::PasswordResetService;
