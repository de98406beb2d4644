//! Bulk importer: metadata + index + archive → relational catalog
//!
//! Every step upserts on a unique key, so the importer can be re-run from
//! scratch at any time. Verses are committed in fixed-size batches; a failed
//! batch rolls back and aborts the run while earlier batches stay committed.

use crate::dataset::{DatasetIndex, DatasetMeta};
use crate::layout::DatasetLayout;
use crate::storage::{ArchiveRecord, BookRow, Catalog, VerseArchive, VerseRow, VersionRow};
use crate::{HarvestError, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Canon assigned to books whose index entry has none
pub const DEFAULT_CANON: &str = "old_testament";

/// Gap between consecutive book sequence values
const SEQUENCE_STEP: f64 = 0.001;

/// Summary of one import run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub dataset_id: String,
    pub version_id: i64,
    pub books: usize,
    pub verses_imported: u64,
    pub verses_skipped: u64,
}

/// Imports one harvested dataset into `catalog`
///
/// # Arguments
///
/// * `layout` - Where the dataset's artifacts live
/// * `dataset_id` - The dataset the archive rows are keyed by
/// * `catalog` - The relational sink
/// * `batch_size` - Verses per transaction
///
/// # Errors
///
/// * `MissingArtifact` if the metadata, index or archive is absent
/// * `Json`/`Structure` if the metadata or index cannot be parsed
/// * `Storage` if a batch fails; earlier batches remain committed
pub fn import_dataset<C: Catalog>(
    layout: &DatasetLayout,
    dataset_id: &str,
    catalog: &mut C,
    batch_size: usize,
) -> Result<ImportReport> {
    let missing = layout.missing_artifacts();
    if let Some(path) = missing.first() {
        for path in &missing {
            tracing::error!("Missing artifact: {}", path.display());
        }
        return Err(HarvestError::MissingArtifact { path: path.clone() });
    }

    let meta = DatasetMeta::from_value(read_json(&layout.metadata_path())?)?;
    let index = DatasetIndex::from_value(&read_json(&layout.index_path())?)?;

    if meta.id != dataset_id {
        tracing::warn!(
            "Metadata id {} differs from dataset id {}; the version is keyed by {}",
            meta.id,
            dataset_id,
            meta.id
        );
    }

    // 1. Version
    let version_id = catalog.upsert_version(&version_row(&meta))?;
    tracing::info!("Version {} ({}) → id {}", meta.id, meta.display_title(), version_id);

    // 2. Books
    let book_rows = book_rows(version_id, &index, Utc::now().timestamp() as f64);
    let book_ids: HashMap<String, i64> = catalog.upsert_books(&book_rows)?.into_iter().collect();
    tracing::info!("Imported {} books", book_ids.len());

    // 3. Verses
    let archive = VerseArchive::open_read_only(&layout.archive_path())?;
    let batch_size = batch_size.max(1);
    let mut batch: Vec<VerseRow> = Vec::with_capacity(batch_size);
    let mut imported = 0u64;
    let mut skipped = 0u64;

    let visited = archive.stream_all(dataset_id, |record| {
        match verse_row(&record, &book_ids) {
            Some(row) => batch.push(row),
            None => {
                skipped += 1;
                return Ok(());
            }
        }

        if batch.len() >= batch_size {
            catalog.write_verse_batch(&batch)?;
            imported += batch.len() as u64;
            tracing::debug!("Committed batch, {} verses imported so far", imported);
            batch.clear();
        }
        Ok::<(), HarvestError>(())
    })?;

    if !batch.is_empty() {
        catalog.write_verse_batch(&batch)?;
        imported += batch.len() as u64;
    }

    tracing::info!(
        "Imported {} of {} archived verses ({} skipped)",
        imported,
        visited,
        skipped
    );

    Ok(ImportReport {
        dataset_id: dataset_id.to_string(),
        version_id,
        books: book_ids.len(),
        verses_imported: imported,
        verses_skipped: skipped,
    })
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn version_row(meta: &DatasetMeta) -> VersionRow {
    VersionRow {
        natural_id: meta.id.clone(),
        abbreviation: meta.abbreviation.clone(),
        title: meta.title.clone(),
        localized_title: meta.localized_title.clone(),
        localized_abbreviation: meta.localized_abbreviation.clone(),
        language_tag: meta.language_tag.clone(),
        copyright: meta.copyright.clone(),
        promotional_content: meta.promotional_content.clone(),
        publisher_url: meta.publisher_url.clone(),
        deep_link: meta.deep_link.clone(),
        organization_id: meta.organization_id.clone(),
        is_active: true,
    }
}

/// Book rows in index order, `sequence` strictly increasing from `base`
fn book_rows(version_id: i64, index: &DatasetIndex, base: f64) -> Vec<BookRow> {
    index
        .books
        .iter()
        .enumerate()
        .map(|(i, book)| BookRow {
            version_id,
            book_code: book.id.clone(),
            title: book.title.clone().unwrap_or_default(),
            full_title: book.full_title.clone(),
            abbreviation: book.abbreviation.clone(),
            canon: book
                .canon
                .clone()
                .unwrap_or_else(|| DEFAULT_CANON.to_string()),
            sequence: base + (i + 1) as f64 * SEQUENCE_STEP,
            chapter_count: book.chapters.len() as u32,
        })
        .collect()
}

/// Maps an archive record to a catalog row, or logs why it cannot be imported
fn verse_row(record: &ArchiveRecord, book_ids: &HashMap<String, i64>) -> Option<VerseRow> {
    let Some(&book_id) = book_ids.get(&record.book_id) else {
        tracing::warn!(
            "Book not found for book code {}, skipping verse {}",
            record.book_id,
            record.passage_id
        );
        return None;
    };

    let (Some(chapter), Some(verse)) = (record.chapter.as_number(), record.verse.as_number()) else {
        tracing::warn!(
            "Non-numeric chapter/verse {}:{} for {}, skipping",
            record.chapter,
            record.verse,
            record.passage_id
        );
        return None;
    };

    let Some(content) = payload_content(&record.payload) else {
        tracing::warn!("Failed to parse verse content for {}, skipping", record.passage_id);
        return None;
    };

    Some(VerseRow {
        book_id,
        chapter,
        verse,
        passage_id: record.passage_id.clone(),
        content,
    })
}

/// `content` of a passage payload, also accepted under a `data` wrapper
fn payload_content(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let content = value
        .get("content")
        .or_else(|| value.get("data").and_then(|d| d.get("content")))?;
    content.as_str().map(str::to_string)
}
