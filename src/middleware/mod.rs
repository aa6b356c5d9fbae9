pub mod auth;
pub mod csrf;

pub use auth::{AuthUser, bearer_token};
pub use csrf::{cookie_value, csrf_protection, session_binding};
