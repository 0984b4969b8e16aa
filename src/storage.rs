//! Persistent session storage with zstd compression.
//!
//! # Storage Strategy
//!
//! One session is persisted per data directory, as a versioned JSON
//! document compressed with zstd into `saved_game.json.zst`. The document
//! carries the full history (the board and controller snapshot of every
//! ply) plus the live status, winner and view preferences, so a reloaded
//! session can keep navigating its history and resume play from any point.
//!
//! Writes go through a temporary file in the same directory followed by an
//! atomic rename, so a crash mid-save leaves either the old snapshot or
//! the new one, never a torn file. A mutex serializes concurrent saves.
//!
//! A missing save file is a recoverable condition (`StorageError::NotFound`)
//! that callers turn into a fresh session. A file that exists but fails to
//! decompress, parse or version-match is reported as-is and never silently
//! replaced.

use crate::controller::ControllerState;
use crate::types::{Color, Piece, Status};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Current save document version.
pub const FORMAT_VERSION: u32 = 1;

/// zstd compression level for saved sessions.
const COMPRESSION_LEVEL: i32 = 19;

/// File name of the session snapshot inside the data directory.
const SAVE_FILE: &str = "saved_game.json.zst";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    /// No snapshot exists at the save path. Recoverable: start fresh.
    #[error("no saved game at {0}")]
    NotFound(PathBuf),
    #[error("save file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save file is not a valid session document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported save format version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
}

// ---------------------------------------------------------------------------
// Save document schema
// ---------------------------------------------------------------------------

/// One history entry: the board after a ply (as a piece list, since JSON
/// maps cannot be keyed by squares) plus the matching controller snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEntry {
    pub pieces: Vec<Piece>,
    pub state: ControllerState,
}

/// The complete persisted form of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub version: u32,
    pub status: Status,
    pub winner: Option<Color>,
    pub game_over: bool,
    pub main_player: Color,
    pub theme_dir: PathBuf,
    pub history: Vec<SavedEntry>,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Filesystem-backed store for a single session snapshot.
pub struct SessionStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionStorage {
    /// Creates a store rooted at `data_dir`, creating the directory if
    /// needed.
    pub fn new(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SAVE_FILE);
        log::info!("session storage at {}", path.display());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// The save file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists a session snapshot atomically.
    pub fn save(&self, saved: &SavedSession) -> Result<(), StorageError> {
        let json = serde_json::to_vec(saved)?;
        let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &compressed)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!(
            "saved session ({} plies, {} bytes compressed)",
            saved.history.len(),
            compressed.len()
        );
        Ok(())
    }

    /// Loads the stored snapshot, verifying the format version.
    pub fn load(&self) -> Result<SavedSession, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::NotFound(self.path.clone()));
        }
        let compressed = fs::read(&self.path)?;
        let json = zstd::decode_all(compressed.as_slice())?;
        let saved: SavedSession = serde_json::from_slice(&json)?;
        if saved.version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: saved.version,
            });
        }
        log::debug!("loaded session with {} plies", saved.history.len());
        Ok(saved)
    }

    /// Deletes the stored snapshot, if any.
    pub fn remove(&self) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
