//! Durable checkpoint storage
//!
//! Checkpoints are small JSON documents replaced atomically: the new content
//! is written and flushed to a temporary sibling, then renamed over the
//! canonical file, so a reader never sees a half-written checkpoint.

use crate::state::Checkpoint;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or saving state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt checkpoint at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;

/// Storage backend for checkpoints
pub trait StateStore {
    /// Loads the checkpoint for a dataset
    ///
    /// Returns a zero-valued checkpoint when nothing is stored or when the
    /// stored document belongs to a different dataset.
    fn load(&self, dataset_id: &str) -> StateResult<Checkpoint>;

    /// Persists a checkpoint; must be atomic with respect to a crash
    fn save(&mut self, checkpoint: &Checkpoint) -> StateResult<()>;

    /// Human-readable location, used in resume messages
    fn location(&self) -> String;
}

/// Checkpoint store backed by one JSON file per dataset
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self, dataset_id: &str) -> StateResult<Checkpoint> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Checkpoint::new(dataset_id));
            }
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if checkpoint.dataset_id != dataset_id {
            tracing::warn!(
                "Checkpoint at {} belongs to dataset {}, starting {} from zero",
                self.path.display(),
                checkpoint.dataset_id,
                dataset_id
            );
            return Ok(Checkpoint::new(dataset_id));
        }

        Ok(checkpoint)
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> StateResult<()> {
        atomic_write_json(&self.path, checkpoint)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Writes `value` as pretty JSON to `path` via write-temp-then-rename
pub fn atomic_write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StateResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
    }

    let body = serde_json::to_vec_pretty(value)?;

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    {
        let mut file = File::create(&temp).map_err(io_error(&temp))?;
        file.write_all(&body).map_err(io_error(&temp))?;
        file.sync_all().map_err(io_error(&temp))?;
    }

    std::fs::rename(&temp, path).map_err(io_error(path))?;
    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StateError {
    let path = path.to_path_buf();
    move |source| StateError::Io { path, source }
}
