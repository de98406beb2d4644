//! Storage module for persisting harvested data
//!
//! This module handles all database operations, including:
//! - The per-dataset verse archive the crawler writes into
//! - The relational catalog (versions → books → verses) the importer fills
//! - Schema management for both

mod archive;
mod catalog;
mod schema;
mod traits;

pub use archive::VerseArchive;
pub use catalog::SqliteCatalog;
pub use traits::{Catalog, StorageError, StorageResult};

use crate::config::PassageConfig;
use crate::dataset::Label;

/// Query parameters a passage was fetched with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub format: String,
    pub include_headings: bool,
    pub include_notes: bool,
}

impl FetchParams {
    pub fn from_config(config: &PassageConfig) -> Self {
        Self {
            format: config.format.clone(),
            include_headings: config.include_headings,
            include_notes: config.include_notes,
        }
    }

    /// Query string pairs for a passage request
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format", self.format.clone()),
            ("include_headings", self.include_headings.to_string()),
            ("include_notes", self.include_notes.to_string()),
        ]
    }
}

/// One archived verse
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub dataset_id: String,
    pub book_id: String,
    pub chapter: Label,
    pub verse: Label,
    pub passage_id: String,
    pub params: FetchParams,
    /// Raw JSON body of the passage response
    pub payload: String,
    pub fetched_at: String,
}

/// Version row for the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRow {
    pub natural_id: String,
    pub abbreviation: String,
    pub title: String,
    pub localized_title: String,
    pub localized_abbreviation: Option<String>,
    pub language_tag: String,
    pub copyright: Option<String>,
    pub promotional_content: Option<String>,
    pub publisher_url: Option<String>,
    pub deep_link: Option<String>,
    pub organization_id: Option<String>,
    pub is_active: bool,
}

/// Book row for the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub version_id: i64,
    pub book_code: String,
    pub title: String,
    pub full_title: Option<String>,
    pub abbreviation: Option<String>,
    pub canon: String,
    pub sequence: f64,
    pub chapter_count: u32,
}

/// Verse row for the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct VerseRow {
    pub book_id: i64,
    pub chapter: i64,
    pub verse: i64,
    pub passage_id: String,
    pub content: String,
}
