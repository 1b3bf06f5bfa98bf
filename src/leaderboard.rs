use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metrics::Speed;

/// One recorded result. Field names on disk follow the original file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CharactersPerMinute")]
    pub chars_per_minute: u32,
    #[serde(rename = "CharactersPerSecond")]
    pub chars_per_second: u32,
}

impl ScoreEntry {
    pub fn new(name: impl Into<String>, chars_per_minute: u32, chars_per_second: u32) -> Self {
        Self {
            name: name.into(),
            chars_per_minute,
            chars_per_second,
        }
    }

    pub fn from_speed(name: impl Into<String>, speed: Speed) -> Self {
        Self::new(name, speed.chars_per_minute, speed.chars_per_second)
    }
}

/// Durable storage for the full list of entries.
pub trait ScoreStore {
    /// Returns the stored entries, or an empty list when nothing was stored yet.
    fn load(&self) -> Result<Vec<ScoreEntry>>;
    /// Replaces the stored entries with `entries`.
    fn save(&self, entries: &[ScoreEntry]) -> Result<()>;
}

/// JSON array of entries in a single file, rewritten wholesale on every save.
#[derive(Debug, Clone)]
pub struct FileScoreStore {
    path: PathBuf,
}

impl FileScoreStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
        Error::CorruptData {
            path: self.path.clone(),
            source: source.into(),
        }
    }

    fn persistence(&self, source: io::Error) -> Error {
        Error::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

impl ScoreStore for FileScoreStore {
    fn load(&self) -> Result<Vec<ScoreEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no leaderboard yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.corrupt(e)),
        };

        // a file that was created but never written counts as empty
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice::<Vec<ScoreEntry>>(&bytes).map_err(|e| self.corrupt(e))
    }

    fn save(&self, entries: &[ScoreEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persistence(e))?;
        }
        let data = serde_json::to_vec(entries).map_err(|e| self.persistence(e.into()))?;
        fs::write(&self.path, data).map_err(|e| self.persistence(e))
    }
}

/// In-memory history of results, written through to its store on every append.
///
/// Entries keep insertion order; the leaderboard is a log, not a ranking.
#[derive(Debug)]
pub struct Leaderboard<S: ScoreStore> {
    store: S,
    entries: Vec<ScoreEntry>,
}

impl<S: ScoreStore> Leaderboard<S> {
    /// Reads whatever `store` holds. Fails with [`Error::CorruptData`] when the
    /// stored content is not a list of entries.
    pub fn load(store: S) -> Result<Self> {
        let entries = store.load()?;
        info!(entries = entries.len(), "leaderboard loaded");
        Ok(Self { store, entries })
    }

    /// Adds `entry` at the end and persists the complete list.
    ///
    /// On [`Error::Persistence`] the entry stays in memory, so the next
    /// successful append writes it as well.
    pub fn append(&mut self, entry: ScoreEntry) -> Result<()> {
        self.entries.push(entry);
        if let Err(e) = self.store.save(&self.entries) {
            warn!(error = %e, "leaderboard write failed");
            return Err(e);
        }
        debug!(entries = self.entries.len(), "leaderboard saved");
        Ok(())
    }

    pub fn all(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
