//! Progress report for a dataset harvest
//!
//! This module gathers the checkpoint, the archive row count and the index
//! size for one dataset and prints them for the `status` command.

use crate::dataset::DatasetIndex;
use crate::layout::DatasetLayout;
use crate::state::{Checkpoint, CrawlPhase, JsonStateStore, StateStore};
use crate::storage::VerseArchive;
use crate::Result;
use std::path::PathBuf;

/// Harvest progress summary
#[derive(Debug, Clone)]
pub struct HarvestStatus {
    pub dataset_id: String,

    /// Where the checkpoint lives
    pub state_path: PathBuf,

    /// Persisted checkpoint (zeroed if none exists yet)
    pub checkpoint: Checkpoint,

    /// Rows in the verse archive
    pub archived_units: u64,

    /// Verses in the index, if the index has been fetched
    pub total_units: Option<usize>,

    /// Import artifacts not yet on disk
    pub missing_artifacts: Vec<PathBuf>,
}

impl HarvestStatus {
    pub fn phase(&self) -> CrawlPhase {
        self.checkpoint.phase()
    }

    /// Archived units as a percentage of the index
    pub fn percent_complete(&self) -> Option<f64> {
        match self.total_units {
            Some(0) => Some(100.0),
            Some(total) => Some((self.archived_units as f64 / total as f64) * 100.0),
            None => None,
        }
    }
}

/// Loads the status of one dataset
///
/// A missing archive or index is not an error; an unreadable index is logged
/// and reported as unknown size.
pub fn load_status(layout: &DatasetLayout, dataset_id: &str) -> Result<HarvestStatus> {
    let store = JsonStateStore::new(layout.state_path());
    let checkpoint = store.load(dataset_id)?;

    let archive_path = layout.archive_path();
    let archived_units = if archive_path.exists() {
        VerseArchive::open_read_only(&archive_path)?.count(dataset_id)?
    } else {
        0
    };

    let index_path = layout.index_path();
    let total_units = if index_path.exists() {
        let content = std::fs::read_to_string(&index_path)?;
        match serde_json::from_str::<serde_json::Value>(&content)
            .map_err(|e| e.to_string())
            .and_then(|value| DatasetIndex::from_value(&value).map_err(|e| e.to_string()))
        {
            Ok(index) => Some(index.unit_count()),
            Err(e) => {
                tracing::warn!("Could not read index {}: {}", index_path.display(), e);
                None
            }
        }
    } else {
        None
    };

    Ok(HarvestStatus {
        dataset_id: dataset_id.to_string(),
        state_path: store.path().to_path_buf(),
        checkpoint,
        archived_units,
        total_units,
        missing_artifacts: layout.missing_artifacts(),
    })
}

/// Prints the status to stdout in a formatted manner
pub fn print_status(status: &HarvestStatus) {
    println!("=== Harvest Status: {} ===\n", status.dataset_id);

    println!("Checkpoint ({}):", status.state_path.display());
    println!("  Phase: {}", status.phase());
    if status.phase() == CrawlPhase::InProgress {
        println!("  Next unit: {}", status.checkpoint.cursor());
    }
    println!("  Requests made: {}", status.checkpoint.requests_made);
    if let Some(updated) = status.checkpoint.updated_at {
        println!("  Last updated: {}", updated.to_rfc3339());
    }
    println!();

    println!("Archive:");
    match (status.total_units, status.percent_complete()) {
        (Some(total), Some(percent)) => println!(
            "  Verses archived: {} / {} ({:.1}%)",
            status.archived_units, total, percent
        ),
        _ => println!("  Verses archived: {} (index not fetched)", status.archived_units),
    }
    println!();

    if let Some(info) = &status.checkpoint.last_rate_limit {
        println!("Last rate limit: {}", info);
        println!();
    }

    if !status.missing_artifacts.is_empty() {
        println!("Missing import artifacts:");
        for path in &status.missing_artifacts {
            println!("  - {}", path.display());
        }
    }
}
