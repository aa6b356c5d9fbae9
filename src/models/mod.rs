pub mod application;
pub mod stage;
pub mod user;

pub use application::{Application, ApplicationChanges, NewApplication};
pub use stage::{DEFAULT_STAGES, NewStage, Stage, StageType};
pub use user::{NewUser, User, UserProfile};
