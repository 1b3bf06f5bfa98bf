//! Error types for keysprint.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the leaderboard, the session and the terminal layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("leaderboard at {} is corrupt: {source}", path.display())]
    CorruptData {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("could not save leaderboard to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("input interrupted")]
    InputInterrupted,

    #[error("could not start session clock: {0}")]
    ClockStart(#[source] io::Error),

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}
