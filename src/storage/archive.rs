//! SQLite verse archive
//!
//! One database file per dataset, one row per fetched verse. The crawler is
//! the only writer; the importer reads it back in `(book_id, chapter, verse)`
//! order.

use crate::storage::schema::initialize_archive_schema;
use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::{ArchiveRecord, FetchParams};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

const SELECT_COLUMNS: &str = "SELECT dataset_id, book_id, chapter, verse, passage_id, format,
     include_headings, include_notes, data, fetched_at FROM verses";

/// Local archive of fetched passages
pub struct VerseArchive {
    conn: Connection,
}

impl VerseArchive {
    /// Opens (or creates) the archive at `path` and ensures the schema exists
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // FULL sync: a persisted checkpoint must never point past a row that
        // could still be lost
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        let archive = Self { conn };
        archive.init()?;
        Ok(archive)
    }

    /// Opens an existing archive without writing to it
    ///
    /// No pragmas are changed and no schema is created; a missing file is an
    /// error rather than a new empty archive.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Creates an in-memory archive
    pub fn open_in_memory() -> StorageResult<Self> {
        let archive = Self {
            conn: Connection::open_in_memory()?,
        };
        archive.init()?;
        Ok(archive)
    }

    /// Ensures the table and indexes exist; safe to call any number of times
    pub fn init(&self) -> StorageResult<()> {
        initialize_archive_schema(&self.conn)?;
        Ok(())
    }

    /// Inserts a record, replacing any row with the same position or passage id
    pub fn upsert(&self, record: &ArchiveRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO verses (
                dataset_id, book_id, chapter, verse, passage_id,
                format, include_headings, include_notes, data, fetched_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.dataset_id,
                record.book_id,
                record.chapter,
                record.verse,
                record.passage_id,
                record.params.format,
                record.params.include_headings,
                record.params.include_notes,
                record.payload,
                record.fetched_at,
            ],
        )?;
        Ok(())
    }

    /// Feeds every record of a dataset to `f`, ordered by `(book_id, chapter, verse)`
    ///
    /// Rows are read one at a time; stops at the first error from `f`.
    ///
    /// # Returns
    ///
    /// The number of records visited
    pub fn stream_all<F, E>(&self, dataset_id: &str, mut f: F) -> Result<usize, E>
    where
        F: FnMut(ArchiveRecord) -> Result<(), E>,
        E: From<StorageError>,
    {
        let sql = format!(
            "{} WHERE dataset_id = ?1 ORDER BY book_id, chapter, verse",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql).map_err(StorageError::from)?;
        let rows = stmt
            .query_map(params![dataset_id], record_from_row)
            .map_err(StorageError::from)?;

        let mut visited = 0;
        for row in rows {
            f(row.map_err(StorageError::from)?)?;
            visited += 1;
        }
        Ok(visited)
    }

    /// Collects every record of a dataset in `(book_id, chapter, verse)` order
    pub fn records(&self, dataset_id: &str) -> StorageResult<Vec<ArchiveRecord>> {
        let mut records = Vec::new();
        self.stream_all(dataset_id, |record| {
            records.push(record);
            Ok::<(), StorageError>(())
        })?;
        Ok(records)
    }

    pub fn get_by_passage(
        &self,
        dataset_id: &str,
        passage_id: &str,
    ) -> StorageResult<Option<ArchiveRecord>> {
        let sql = format!("{} WHERE dataset_id = ?1 AND passage_id = ?2", SELECT_COLUMNS);
        let record = self
            .conn
            .query_row(&sql, params![dataset_id, passage_id], record_from_row)
            .optional()?;
        Ok(record)
    }

    pub fn count(&self, dataset_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM verses WHERE dataset_id = ?1",
            params![dataset_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ArchiveRecord> {
    Ok(ArchiveRecord {
        dataset_id: row.get(0)?,
        book_id: row.get(1)?,
        chapter: row.get(2)?,
        verse: row.get(3)?,
        passage_id: row.get(4)?,
        params: FetchParams {
            format: row.get(5)?,
            include_headings: row.get(6)?,
            include_notes: row.get(7)?,
        },
        payload: row.get(8)?,
        fetched_at: row.get(9)?,
    })
}
