pub mod applications;
pub mod csrf;
pub mod health;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod profile;
pub mod register;
pub mod stages;

pub use applications::{
    application_statistics, create_application, delete_application, get_application,
    list_applications, update_application,
};
pub use csrf::csrf_token;
pub use health::health_check;
pub use login::login;
pub use logout::{logout, logout_all};
pub use password_reset::{request_password_reset, reset_password};
pub use profile::profile;
pub use register::register;
pub use stages::list_stages;
