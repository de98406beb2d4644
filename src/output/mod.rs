//! Output module for run summaries and progress reports
//!
//! This module handles:
//! - Loading the harvest status of a dataset
//! - Printing harvest, import and status reports

pub mod status;

pub use status::{load_status, print_status, HarvestStatus};

use crate::crawler::HarvestReport;
use crate::import::ImportReport;

/// Prints the summary of a finished harvest run
pub fn print_harvest_report(report: &HarvestReport) {
    println!("=== Harvest: {} ===\n", report.dataset_id);
    println!("  Phase: {}", report.phase);
    match report.units_total {
        Some(total) => println!("  Verses fetched this run: {} (index: {})", report.units_fetched, total),
        None => println!("  Verses fetched this run: {}", report.units_fetched),
    }
    println!(
        "  Requests: {} this run, {} total",
        report.requests_this_run, report.requests_total
    );
}

/// Prints the summary of a finished import run
pub fn print_import_report(report: &ImportReport) {
    println!("=== Import: {} ===\n", report.dataset_id);
    println!("  Version id: {}", report.version_id);
    println!("  Books: {}", report.books);
    println!("  Verses imported: {}", report.verses_imported);
    if report.verses_skipped > 0 {
        println!("  Verses skipped: {} (see warnings above)", report.verses_skipped);
    }
}
