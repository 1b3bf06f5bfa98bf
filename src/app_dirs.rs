use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "keysprint")
    }

    /// Default leaderboard file; `./leaderboard.json` when no home directory is known.
    pub fn leaderboard_path() -> PathBuf {
        Self::project()
            .map(|dirs| dirs.data_local_dir().join("leaderboard.json"))
            .unwrap_or_else(|| PathBuf::from("leaderboard.json"))
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("keysprint_config.json"))
    }

    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("keysprint");
            Some(state_dir.join("keysprint.log"))
        } else {
            Self::project().map(|dirs| dirs.data_local_dir().join("keysprint.log"))
        }
    }
}
