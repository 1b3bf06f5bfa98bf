// Library surface for the binary and the headless integration tests.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod logging;
pub mod metrics;
pub mod session;
pub mod terminal;
pub mod typing_policy;

pub use error::{Error, Result};
