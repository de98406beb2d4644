//! Storage traits and error types
//!
//! This module defines the relational sink interface the importer writes
//! through, and the error type shared by both databases.

use crate::storage::{BookRow, VerseRow, VersionRow};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Relational sink for imported datasets
///
/// Every write is an upsert keyed on the table's unique constraint, so
/// replaying the same rows leaves the catalog unchanged.
pub trait Catalog {
    // ===== Versions =====

    /// Inserts or refreshes a version keyed on its natural id
    ///
    /// # Returns
    ///
    /// The row id of the version
    fn upsert_version(&mut self, version: &VersionRow) -> StorageResult<i64>;

    /// Looks up a version by natural id
    fn version_id(&self, natural_id: &str) -> StorageResult<Option<i64>>;

    // ===== Books =====

    /// Inserts or refreshes books keyed on `(version_id, book_code)` in one transaction
    ///
    /// A book that already exists keeps its original `sequence`.
    ///
    /// # Returns
    ///
    /// `(book_code, book_id)` pairs in input order
    fn upsert_books(&mut self, books: &[BookRow]) -> StorageResult<Vec<(String, i64)>>;

    // ===== Verses =====

    /// Writes a batch of verses keyed on `(book_id, passage_id)`
    ///
    /// The batch is one transaction: either every row lands or none do.
    fn write_verse_batch(&mut self, verses: &[VerseRow]) -> StorageResult<()>;

    // ===== Statistics =====

    /// Number of books stored for a version
    fn count_books(&self, version_id: i64) -> StorageResult<u64>;

    /// Number of verses stored for a version
    fn count_verses(&self, version_id: i64) -> StorageResult<u64>;
}
