//! Integration tests for the bulk importer
//!
//! Each test lays out a harvested dataset on disk (metadata, index, archive)
//! and imports it into a SQLite catalog.

use bible_harvest::config::Config;
use bible_harvest::dataset::Label;
use bible_harvest::import::{import_dataset, run_import};
use bible_harvest::state::atomic_write_json;
use bible_harvest::storage::{ArchiveRecord, Catalog, FetchParams, SqliteCatalog, VerseArchive};
use bible_harvest::{DatasetLayout, HarvestError};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

const DATASET: &str = "111";

fn record(book: &str, chapter: Label, verse: Label, passage_id: &str, payload: &str) -> ArchiveRecord {
    ArchiveRecord {
        dataset_id: DATASET.to_string(),
        book_id: book.to_string(),
        chapter,
        verse,
        passage_id: passage_id.to_string(),
        params: FetchParams {
            format: "text".to_string(),
            include_headings: false,
            include_notes: false,
        },
        payload: payload.to_string(),
        fetched_at: "2026-01-01T00:00:00+00:00".to_string(),
    }
}

fn verse(book: &str, chapter: i64, verse: i64, content: &str) -> ArchiveRecord {
    let passage_id = format!("{}.{}.{}", book, chapter, verse);
    let payload = json!({"id": passage_id, "content": content}).to_string();
    record(
        book,
        Label::Numeric(chapter),
        Label::Numeric(verse),
        &passage_id,
        &payload,
    )
}

/// Writes metadata and a two-book index, and archives `records`
fn write_dataset(data_dir: &Path, records: &[ArchiveRecord]) -> DatasetLayout {
    let layout = DatasetLayout::new(data_dir, DATASET);
    layout.ensure_dirs().unwrap();

    atomic_write_json(
        &layout.metadata_path(),
        &json!({
            "id": 111,
            "abbreviation": "NIV",
            "title": "New International Version",
            "localized_title": "New International Version",
            "localized_abbreviation": "NIV",
            "language_tag": "en",
            "copyright": "Biblica",
            "youversion_deep_link": "https://www.bible.com/versions/111"
        }),
    )
    .unwrap();

    atomic_write_json(
        &layout.index_path(),
        &json!({
            "books": [
                {"id": "GEN", "title": "Genesis", "full_title": "The Book of Genesis",
                 "abbreviation": "Gen", "canon": "old_testament", "chapters": [
                    {"id": "1", "verses": [
                        {"id": "1", "passage_id": "GEN.1.1"},
                        {"id": "2", "passage_id": "GEN.1.2"}
                    ]},
                    {"id": "2", "verses": [
                        {"id": "1", "passage_id": "GEN.2.1"}
                    ]}
                ]},
                {"id": "MAT", "title": "Matthew", "canon": "new_testament", "chapters": [
                    {"id": "1", "verses": [
                        {"id": "1", "passage_id": "MAT.1.1"}
                    ]}
                ]}
            ]
        }),
    )
    .unwrap();

    let archive = VerseArchive::open(&layout.archive_path()).unwrap();
    for r in records {
        archive.upsert(r).unwrap();
    }

    layout
}

fn full_archive() -> Vec<ArchiveRecord> {
    vec![
        verse("GEN", 1, 1, "In the beginning"),
        verse("GEN", 1, 2, "Now the earth was formless"),
        verse("GEN", 2, 1, "Thus the heavens and the earth were completed"),
        verse("MAT", 1, 1, "This is the genealogy"),
    ]
}

type BookSnapshot = (String, String, Option<String>, String, f64, i64);
type VerseSnapshot = (i64, i64, i64, String, String);

fn snapshot(catalog: &SqliteCatalog) -> (Vec<BookSnapshot>, Vec<VerseSnapshot>) {
    let conn = catalog.connection();

    let mut stmt = conn
        .prepare(
            "SELECT book_code, title, full_title, canon, sequence, chapter_count
             FROM bible_books ORDER BY id",
        )
        .unwrap();
    let books = stmt
        .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let mut stmt = conn
        .prepare("SELECT book_id, chapter, verse, passage_id, content FROM bible_verses ORDER BY id")
        .unwrap();
    let verses = stmt
        .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    (books, verses)
}

#[test]
fn test_import_populates_catalog() {
    let dir = TempDir::new().unwrap();
    let layout = write_dataset(dir.path(), &full_archive());
    let mut catalog = SqliteCatalog::new(&dir.path().join("catalog.db")).unwrap();

    let report = import_dataset(&layout, DATASET, &mut catalog, 1000).unwrap();

    assert_eq!(report.books, 2);
    assert_eq!(report.verses_imported, 4);
    assert_eq!(report.verses_skipped, 0);
    assert_eq!(catalog.version_id("111").unwrap(), Some(report.version_id));
    assert_eq!(catalog.count_books(report.version_id).unwrap(), 2);
    assert_eq!(catalog.count_verses(report.version_id).unwrap(), 4);

    let (books, verses) = snapshot(&catalog);
    assert_eq!(books[0].0, "GEN");
    assert_eq!(books[0].2.as_deref(), Some("The Book of Genesis"));
    assert_eq!(books[0].5, 2);
    assert_eq!(books[1].0, "MAT");
    assert_eq!(books[1].3, "new_testament");
    assert!(books[0].4 < books[1].4, "sequence must follow index order");

    let genesis_1_1 = verses.iter().find(|v| v.3 == "GEN.1.1").unwrap();
    assert_eq!((genesis_1_1.1, genesis_1_1.2), (1, 1));
    assert_eq!(genesis_1_1.4, "In the beginning");

    let deep_link: Option<String> = catalog
        .connection()
        .query_row(
            "SELECT deep_link FROM bible_versions WHERE id = ?1",
            [report.version_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(deep_link.as_deref(), Some("https://www.bible.com/versions/111"));
}

#[test]
fn test_import_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let layout = write_dataset(dir.path(), &full_archive());
    let mut catalog = SqliteCatalog::new(&dir.path().join("catalog.db")).unwrap();

    let first = import_dataset(&layout, DATASET, &mut catalog, 1000).unwrap();
    let before = snapshot(&catalog);

    let second = import_dataset(&layout, DATASET, &mut catalog, 1000).unwrap();
    let after = snapshot(&catalog);

    assert_eq!(first.version_id, second.version_id);
    assert_eq!(first.verses_imported, second.verses_imported);
    assert_eq!(before, after);
}

#[test]
fn test_import_in_small_batches() {
    let dir = TempDir::new().unwrap();
    let layout = write_dataset(dir.path(), &full_archive());
    let mut catalog = SqliteCatalog::new_in_memory().unwrap();

    let report = import_dataset(&layout, DATASET, &mut catalog, 3).unwrap();

    assert_eq!(report.verses_imported, 4);
    assert_eq!(catalog.count_verses(report.version_id).unwrap(), 4);
}

fn passage_ids(catalog: &SqliteCatalog) -> Vec<String> {
    snapshot(catalog).1.into_iter().map(|v| v.3).collect()
}

#[test]
fn test_failed_batch_aborts_import_and_keeps_earlier_batches() {
    let dir = TempDir::new().unwrap();
    let layout = write_dataset(dir.path(), &full_archive());
    let mut catalog = SqliteCatalog::new(&dir.path().join("catalog.db")).unwrap();
    import_dataset(&layout, DATASET, &mut catalog, 1000).unwrap();

    // Leave only a row that holds GEN 2:1 under a different passage id
    catalog
        .connection()
        .execute_batch(
            "UPDATE bible_verses SET passage_id = 'GEN.2.1-legacy' WHERE passage_id = 'GEN.2.1';
             DELETE FROM bible_verses WHERE passage_id <> 'GEN.2.1-legacy';",
        )
        .unwrap();

    // Batches: [GEN.1.1, GEN.1.2] then [GEN.2.1, MAT.1.1]
    let err = import_dataset(&layout, DATASET, &mut catalog, 2).unwrap_err();
    assert!(matches!(err, HarvestError::Storage(_)), "got {:?}", err);

    let ids = passage_ids(&catalog);
    assert!(ids.contains(&"GEN.1.1".to_string()));
    assert!(ids.contains(&"GEN.1.2".to_string()));
    assert!(!ids.contains(&"GEN.2.1".to_string()));
    assert!(!ids.contains(&"MAT.1.1".to_string()));
    assert!(ids.contains(&"GEN.2.1-legacy".to_string()));
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_import_skips_unusable_rows() {
    let dir = TempDir::new().unwrap();
    let mut records = full_archive();
    // Book not in the index
    records.push(verse("XYZ", 1, 1, "orphan"));
    // Literal verse label
    records.push(record(
        "GEN",
        Label::Numeric(1),
        Label::Literal("title".to_string()),
        "GEN.1.title",
        r#"{"content":"Heading"}"#,
    ));
    // Payload without parsable content
    records.push(record(
        "MAT",
        Label::Numeric(1),
        Label::Numeric(2),
        "MAT.1.2",
        "<html>oops</html>",
    ));

    let layout = write_dataset(dir.path(), &records);
    let mut catalog = SqliteCatalog::new_in_memory().unwrap();

    let report = import_dataset(&layout, DATASET, &mut catalog, 1000).unwrap();

    assert_eq!(report.verses_imported, 4);
    assert_eq!(report.verses_skipped, 3);
    assert_eq!(catalog.count_verses(report.version_id).unwrap(), 4);
}

#[test]
fn test_import_requires_all_artifacts() {
    let dir = TempDir::new().unwrap();
    let layout = DatasetLayout::new(dir.path(), DATASET);
    let mut catalog = SqliteCatalog::new_in_memory().unwrap();

    let err = import_dataset(&layout, DATASET, &mut catalog, 1000).unwrap_err();
    match err {
        HarvestError::MissingArtifact { path } => assert_eq!(path, layout.metadata_path()),
        other => panic!("expected MissingArtifact, got {:?}", other),
    }

    // Metadata and index present, archive missing
    let layout = write_dataset(dir.path(), &[]);
    std::fs::remove_file(layout.archive_path()).unwrap();

    let err = import_dataset(&layout, DATASET, &mut catalog, 1000).unwrap_err();
    assert!(matches!(
        err,
        HarvestError::MissingArtifact { ref path } if *path == layout.archive_path()
    ));
    assert_eq!(catalog.version_id("111").unwrap(), None);
}

#[test]
fn test_run_import_uses_config_paths() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), &full_archive());

    let mut config = Config::default();
    config.output.data_dir = dir.path().to_string_lossy().into_owned();
    config.import.database_path = dir.path().join("out/catalog.db").to_string_lossy().into_owned();

    let report = run_import(&config, DATASET).unwrap();
    assert_eq!(report.verses_imported, 4);

    let catalog = SqliteCatalog::new(&dir.path().join("out/catalog.db")).unwrap();
    assert_eq!(catalog.count_verses(report.version_id).unwrap(), 4);
}
