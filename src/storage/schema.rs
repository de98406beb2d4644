//! Database schema definitions
//!
//! This module contains the SQL for both databases: the per-dataset verse
//! archive written by the crawler and the relational catalog written by the
//! importer.

/// SQL schema for the verse archive (`passages.db`)
pub const ARCHIVE_SCHEMA_SQL: &str = r#"
-- One row per fetched verse
CREATE TABLE IF NOT EXISTS verses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dataset_id TEXT NOT NULL,
    book_id TEXT NOT NULL,
    -- No declared type: numeric labels stay INTEGER, literal labels stay TEXT
    chapter NOT NULL,
    verse NOT NULL,
    passage_id TEXT NOT NULL,
    format TEXT NOT NULL,
    include_headings INTEGER NOT NULL DEFAULT 0,
    include_notes INTEGER NOT NULL DEFAULT 0,
    data TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    UNIQUE(dataset_id, book_id, chapter, verse),
    UNIQUE(dataset_id, passage_id)
);

CREATE INDEX IF NOT EXISTS idx_verses_passage_id ON verses(passage_id);
CREATE INDEX IF NOT EXISTS idx_verses_book_chapter_verse
    ON verses(dataset_id, book_id, chapter, verse);
"#;

/// SQL schema for the relational catalog
pub const CATALOG_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bible_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    natural_id TEXT NOT NULL UNIQUE,
    abbreviation TEXT NOT NULL,
    title TEXT NOT NULL,
    localized_title TEXT NOT NULL,
    localized_abbreviation TEXT,
    language_tag TEXT NOT NULL,
    copyright TEXT,
    promotional_content TEXT,
    publisher_url TEXT,
    deep_link TEXT,
    organization_id TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_bible_versions_language ON bible_versions(language_tag);

-- Books belong to exactly one version
CREATE TABLE IF NOT EXISTS bible_books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES bible_versions(id) ON DELETE CASCADE,
    book_code TEXT NOT NULL,
    title TEXT NOT NULL,
    full_title TEXT,
    abbreviation TEXT,
    canon TEXT NOT NULL,
    sequence REAL NOT NULL,
    chapter_count INTEGER NOT NULL,
    UNIQUE(version_id, book_code)
);

CREATE INDEX IF NOT EXISTS idx_bible_books_version ON bible_books(version_id);

-- Verses belong to exactly one book; the version is implied through it
CREATE TABLE IF NOT EXISTS bible_verses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id INTEGER NOT NULL REFERENCES bible_books(id) ON DELETE CASCADE,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    passage_id TEXT NOT NULL,
    content TEXT NOT NULL,
    UNIQUE(book_id, passage_id),
    UNIQUE(book_id, chapter, verse)
);

CREATE INDEX IF NOT EXISTS idx_bible_verses_book ON bible_verses(book_id);
"#;

/// Initializes the archive schema
pub fn initialize_archive_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(ARCHIVE_SCHEMA_SQL)
}

/// Initializes the catalog schema
pub fn initialize_catalog_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CATALOG_SCHEMA_SQL)
}
