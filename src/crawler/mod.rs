//! Crawler module for harvesting a dataset from the remote API
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry logic and rate-limit detection
//! - The resumable book → chapter → verse traversal

mod fetcher;
mod harvester;

pub use fetcher::{build_http_client, parse_rate_limit_headers, ApiClient, FetchOutcome};
pub use harvester::{HarvestReport, Harvester};

use crate::config::Config;
use crate::Result;

/// Runs a complete harvest for one dataset
///
/// This is the main entry point for the dump command. It will:
/// 1. Load (or initialise) the dataset's checkpoint
/// 2. Fetch metadata and the index
/// 3. Unless `meta_only`, fetch every verse not yet covered by the checkpoint
///
/// # Arguments
///
/// * `config` - The harvester configuration, with the API key already resolved
/// * `dataset_id` - The dataset to harvest
/// * `meta_only` - Stop after the metadata and index are written
pub async fn dump(config: Config, dataset_id: &str, meta_only: bool) -> Result<HarvestReport> {
    let mut harvester = Harvester::new(config, dataset_id)?;
    harvester.run(meta_only).await
}
