//! JSON snapshot persistence for the patient record set.
//!
//! The whole record set is written as one JSON array after every
//! mutation. Writes go to a sibling temporary file which is then renamed
//! over the target, so a reader never observes a half-written snapshot.
//!
//! Snapshots carry the store revision they were taken at. Concurrent
//! writers may finish out of order; a snapshot older than the last one
//! written is dropped instead of overwriting newer state.
//!
//! A snapshot that exists but cannot be loaded is never overwritten: the
//! store moves it aside with [`SnapshotFile::quarantine`] before the first
//! write, so its records can be recovered by hand.

use std::path::{Path, PathBuf};

use antrian_types::Patient;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors raised while reading or writing the snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The file could not be read, written, or renamed.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot content is not a valid record array.
    #[error("snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A snapshot file on local disk.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    /// Revision of the most recent snapshot that reached disk.
    written: Mutex<u64>,
}

impl SnapshotFile {
    /// Bind to a snapshot path. Nothing is read or created yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: Mutex::new(0),
        }
    }

    /// The target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record set.
    ///
    /// A missing file is not an error and yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the file exists but cannot be read,
    /// or [`PersistError::Serialization`] if it does not parse.
    pub async fn load(&self) -> Result<Vec<Patient>, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot file, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PersistError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        // An empty file is what a crash between create and first write leaves.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        // Older snapshots may contain `null` for an empty set.
        let patients: Option<Vec<Patient>> = serde_json::from_slice(&bytes)?;
        Ok(patients.unwrap_or_default())
    }

    /// Write a serialized snapshot taken at `revision`.
    ///
    /// Returns `false` without touching disk when a newer revision has
    /// already been written.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the temporary file cannot be written
    /// or renamed into place.
    pub async fn write(&self, revision: u64, bytes: &[u8]) -> Result<bool, PersistError> {
        let mut written = self.written.lock().await;
        if revision <= *written {
            debug!(revision, latest = *written, "Skipping stale snapshot");
            return Ok(false);
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| PersistError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| PersistError::Io {
                path: self.path.clone(),
                source,
            })?;

        *written = revision;
        Ok(true)
    }

    /// Move an unloadable snapshot aside to
    /// `<name>.corrupt-<timestamp>` and return the new path.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the file cannot be renamed.
    pub async fn quarantine(&self) -> Result<PathBuf, PersistError> {
        let suffix = format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
        let target = self.sibling(&suffix);
        tokio::fs::rename(&self.path, &target)
            .await
            .map_err(|source| PersistError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(target)
    }

    fn tmp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
