//! On-disk layout of a dumped dataset
//!
//! ```text
//! <data-dir>/<dataset-id>/
//!     state.json        checkpoint
//!     meta/bible.json   raw dataset metadata
//!     meta/index.json   raw dataset index
//!     passages.db       verse archive
//! ```

use std::path::{Path, PathBuf};

/// Paths for one dataset under a data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(data_dir: impl AsRef<Path>, dataset_id: &str) -> Self {
        Self {
            root: data_dir.as_ref().join(safe_dir_name(dataset_id)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join("meta")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.meta_dir().join("bible.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.meta_dir().join("index.json")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join("passages.db")
    }

    /// Creates the dataset directory tree if it does not exist yet
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.meta_dir())
    }

    /// The import artifacts (metadata, index, archive) that are not on disk
    pub fn missing_artifacts(&self) -> Vec<PathBuf> {
        [self.metadata_path(), self.index_path(), self.archive_path()]
            .into_iter()
            .filter(|p| !p.exists())
            .collect()
    }
}

/// Replaces anything outside `[A-Za-z0-9._-]` with `_`
pub fn safe_dir_name(s: &str) -> String {
    let name: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // "." and ".." would escape the data directory
    if name.chars().all(|c| c == '.') {
        name.replace('.', "_")
    } else {
        name
    }
}
