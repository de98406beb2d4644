//! SQLite catalog implementation
//!
//! This module provides a SQLite-based implementation of the Catalog trait.

use crate::storage::schema::initialize_catalog_schema;
use crate::storage::traits::{Catalog, StorageResult};
use crate::storage::{BookRow, VerseRow, VersionRow};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite relational catalog
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Opens (or creates) the catalog database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_catalog_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory catalog
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_catalog_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Direct access for inspection queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Catalog for SqliteCatalog {
    // ===== Versions =====

    fn upsert_version(&mut self, version: &VersionRow) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO bible_versions (
                natural_id, abbreviation, title, localized_title, localized_abbreviation,
                language_tag, copyright, promotional_content, publisher_url, deep_link,
                organization_id, is_active
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(natural_id) DO UPDATE SET
                abbreviation = excluded.abbreviation,
                title = excluded.title,
                localized_title = excluded.localized_title,
                localized_abbreviation = excluded.localized_abbreviation,
                language_tag = excluded.language_tag,
                copyright = excluded.copyright,
                promotional_content = excluded.promotional_content,
                publisher_url = excluded.publisher_url,
                deep_link = excluded.deep_link,
                organization_id = excluded.organization_id,
                is_active = excluded.is_active",
            params![
                version.natural_id,
                version.abbreviation,
                version.title,
                version.localized_title,
                version.localized_abbreviation,
                version.language_tag,
                version.copyright,
                version.promotional_content,
                version.publisher_url,
                version.deep_link,
                version.organization_id,
                version.is_active,
            ],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM bible_versions WHERE natural_id = ?1",
            params![version.natural_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn version_id(&self, natural_id: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM bible_versions WHERE natural_id = ?1",
                params![natural_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    // ===== Books =====

    fn upsert_books(&mut self, books: &[BookRow]) -> StorageResult<Vec<(String, i64)>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(books.len());

        {
            // An existing book keeps its first-assigned sequence
            let mut upsert = tx.prepare(
                "INSERT INTO bible_books (
                    version_id, book_code, title, full_title, abbreviation, canon,
                    sequence, chapter_count
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(version_id, book_code) DO UPDATE SET
                    title = excluded.title,
                    full_title = excluded.full_title,
                    abbreviation = excluded.abbreviation,
                    canon = excluded.canon,
                    chapter_count = excluded.chapter_count",
            )?;
            let mut lookup =
                tx.prepare("SELECT id FROM bible_books WHERE version_id = ?1 AND book_code = ?2")?;

            for book in books {
                upsert.execute(params![
                    book.version_id,
                    book.book_code,
                    book.title,
                    book.full_title,
                    book.abbreviation,
                    book.canon,
                    book.sequence,
                    book.chapter_count,
                ])?;
                let id: i64 =
                    lookup.query_row(params![book.version_id, book.book_code], |row| row.get(0))?;
                ids.push((book.book_code.clone(), id));
            }
        }

        tx.commit()?;
        Ok(ids)
    }

    // ===== Verses =====

    fn write_verse_batch(&mut self, verses: &[VerseRow]) -> StorageResult<()> {
        // Any early return drops the transaction, which rolls it back
        let tx = self.conn.transaction()?;

        {
            let mut upsert = tx.prepare(
                "INSERT INTO bible_verses (book_id, chapter, verse, passage_id, content)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(book_id, passage_id) DO UPDATE SET
                    chapter = excluded.chapter,
                    verse = excluded.verse,
                    content = excluded.content",
            )?;

            for verse in verses {
                upsert.execute(params![
                    verse.book_id,
                    verse.chapter,
                    verse.verse,
                    verse.passage_id,
                    verse.content,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_books(&self, version_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bible_books WHERE version_id = ?1",
            params![version_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_verses(&self, version_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bible_verses v
             JOIN bible_books b ON b.id = v.book_id
             WHERE b.version_id = ?1",
            params![version_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
