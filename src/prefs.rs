use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed preference file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("failed to persist preference file: {0}")]
    Persist(String),

    #[error("invalid tempo range \"{0}\" (expected LOW-HIGH, e.g. 90-140)")]
    TempoRange(String),
}

/// Saved user taste, layered over the static knowledge table at selection
/// time. Genre and artist strings are opaque identifiers matched by exact
/// equality; nothing validates them against the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceProfile {
    pub favorite_genres: BTreeSet<String>,
    pub disliked_genres: BTreeSet<String>,
    pub favorite_artists: BTreeSet<String>,
    /// Preferred tempo range in BPM, if the user set one.
    pub preferred_tempo_range: Option<(u16, u16)>,
}

impl PreferenceProfile {
    pub fn is_empty(&self) -> bool {
        self.favorite_genres.is_empty()
            && self.disliked_genres.is_empty()
            && self.favorite_artists.is_empty()
            && self.preferred_tempo_range.is_none()
    }
}

/// Reads and writes the preference document at a fixed path.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default preference file location (XDG config dir, or the current
    /// directory if no home is available).
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("preferences.json"))
            .unwrap_or_else(|| PathBuf::from("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved profile. A missing file is the normal first-run state
    /// and yields the empty default; a file that exists but does not parse
    /// is an error.
    pub fn load(&self) -> Result<PreferenceProfile, PrefsError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No preference file at {}, using defaults", self.path.display());
                return Ok(PreferenceProfile::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents).map_err(|e| PrefsError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Overwrite the whole document. Atomic from a reader's perspective: the
    /// profile is written to a temp file in the same directory, then renamed
    /// over the target, so a concurrent `load` sees either the old document
    /// or the new one.
    pub fn save(&self, profile: &PreferenceProfile) -> Result<(), PrefsError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| PrefsError::Persist(e.to_string()))?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path)
            .map_err(|e| PrefsError::Persist(e.to_string()))?;
        Ok(())
    }
}

/// Parse a "LOW-HIGH" BPM range, e.g. "90-140".
pub fn parse_tempo_range(input: &str) -> Result<(u16, u16), PrefsError> {
    let bad = || PrefsError::TempoRange(input.to_string());
    let (low, high) = input.split_once('-').ok_or_else(bad)?;
    let low: u16 = low.trim().parse().map_err(|_| bad())?;
    let high: u16 = high.trim().parse().map_err(|_| bad())?;
    if low > high {
        return Err(bad());
    }
    Ok((low, high))
}
