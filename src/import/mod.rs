//! Import module: loads a harvested dataset into the relational catalog

mod importer;

pub use importer::{import_dataset, ImportReport, DEFAULT_CANON};

use crate::config::Config;
use crate::layout::DatasetLayout;
use crate::storage::SqliteCatalog;
use crate::Result;
use std::path::Path;

/// Imports `dataset_id` from the configured data directory into the SQLite catalog
pub fn run_import(config: &Config, dataset_id: &str) -> Result<ImportReport> {
    let layout = DatasetLayout::new(&config.output.data_dir, dataset_id);
    let mut catalog = SqliteCatalog::new(Path::new(&config.import.database_path))?;
    import_dataset(&layout, dataset_id, &mut catalog, config.import.batch_size)
}
