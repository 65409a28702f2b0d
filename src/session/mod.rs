pub mod controller;
pub mod state;

pub use controller::{SessionConfig, SessionController, DEFAULT_PROJECT_DESCRIPTION};
pub use state::{SessionPhase, SessionSnapshot};
