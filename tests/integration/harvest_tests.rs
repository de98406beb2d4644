//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the dataset API and drive the
//! full dump cycle end-to-end: metadata, index, passages and checkpoints.

use bible_harvest::config::Config;
use bible_harvest::crawler::Harvester;
use bible_harvest::dataset::Label;
use bible_harvest::state::{
    Checkpoint, CrawlPhase, Cursor, JsonStateStore, StateResult, StateStore,
};
use bible_harvest::storage::{ArchiveRecord, FetchParams, VerseArchive};
use bible_harvest::{DatasetLayout, HarvestError};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATASET: &str = "111";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/v1/bibles", server.uri());
    config.api.app_key = Some("test-key".to_string());
    config.fetch.timeout_ms = 2_000;
    config.fetch.max_retries = 0;
    config.fetch.retry_interval_ms = 10;
    config.output.data_dir = data_dir.to_string_lossy().into_owned();
    config
}

fn metadata() -> Value {
    json!({
        "id": 111,
        "abbreviation": "NIV",
        "title": "New International Version",
        "localized_title": "New International Version",
        "language_tag": "en"
    })
}

/// Book A (GEN) has one chapter with two verses, book B (EXO) one chapter with one verse
fn small_index() -> Value {
    json!({
        "books": [
            {"id": "GEN", "title": "Genesis", "chapters": [
                {"id": "1", "verses": [
                    {"id": "1", "passage_id": "GEN.1.1"},
                    {"id": "2", "passage_id": "GEN.1.2"}
                ]}
            ]},
            {"id": "EXO", "title": "Exodus", "chapters": [
                {"id": "1", "verses": [
                    {"id": "1", "passage_id": "EXO.1.1"}
                ]}
            ]}
        ]
    })
}

async fn mount_meta(server: &MockServer, index: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/bibles/{}", DATASET)))
        .and(header("X-YVP-App-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/bibles/{}/index", DATASET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(index))
        .mount(server)
        .await;
}

fn passage_path(passage_id: &str) -> String {
    format!("/v1/bibles/{}/passages/{}", DATASET, passage_id)
}

async fn mount_passage(server: &MockServer, passage_id: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(passage_path(passage_id)))
        .and(query_param("format", "text"))
        .and(query_param("include_headings", "false"))
        .and(query_param("include_notes", "false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": passage_id, "content": content})),
        )
        .mount(server)
        .await;
}

async fn mount_small_dataset(server: &MockServer) {
    mount_meta(server, small_index()).await;
    mount_passage(server, "GEN.1.1", "In the beginning").await;
    mount_passage(server, "GEN.1.2", "Now the earth was formless").await;
    mount_passage(server, "EXO.1.1", "These are the names").await;
}

/// Number of requests the server received for `request_path`
async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

async fn passage_hits(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().contains("/passages/"))
        .count()
}

fn load_checkpoint(data_dir: &Path) -> Checkpoint {
    let layout = DatasetLayout::new(data_dir, DATASET);
    JsonStateStore::new(layout.state_path()).load(DATASET).unwrap()
}

fn open_archive(data_dir: &Path) -> VerseArchive {
    let layout = DatasetLayout::new(data_dir, DATASET);
    VerseArchive::open(&layout.archive_path()).unwrap()
}

/// Checkpoint store that keeps every saved checkpoint in memory
struct RecordingStore {
    initial: Checkpoint,
    saved: Vec<Checkpoint>,
}

impl RecordingStore {
    fn starting_at(initial: Checkpoint) -> Self {
        Self {
            initial,
            saved: Vec::new(),
        }
    }
}

impl StateStore for RecordingStore {
    fn load(&self, _dataset_id: &str) -> StateResult<Checkpoint> {
        Ok(self.initial.clone())
    }

    fn save(&mut self, checkpoint: &Checkpoint) -> StateResult<()> {
        self.saved.push(checkpoint.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[tokio::test]
async fn test_full_harvest_small_dataset() {
    let server = MockServer::start().await;
    mount_small_dataset(&server).await;
    let dir = TempDir::new().unwrap();

    let mut harvester = Harvester::new(create_test_config(&server, dir.path()), DATASET).unwrap();
    let report = harvester.run(false).await.unwrap();

    assert_eq!(report.units_fetched, 3);
    assert_eq!(report.units_total, Some(3));
    assert_eq!(report.phase, CrawlPhase::Completed);
    // metadata + index + 3 passages
    assert_eq!(report.requests_this_run, 5);

    let checkpoint = load_checkpoint(dir.path());
    assert_eq!(checkpoint.cursor(), Cursor::new(2, 0, 0));
    assert!(checkpoint.completed);
    assert_eq!(checkpoint.requests_made, 5);
    assert!(checkpoint.updated_at.is_some());

    let records = open_archive(dir.path()).records(DATASET).unwrap();
    assert_eq!(records.len(), 3);
    let gen1 = records.iter().find(|r| r.passage_id == "GEN.1.1").unwrap();
    assert_eq!(gen1.book_id, "GEN");
    assert_eq!(gen1.chapter, Label::Numeric(1));
    assert_eq!(gen1.verse, Label::Numeric(1));
    assert_eq!(gen1.params.format, "text");
    let payload: Value = serde_json::from_str(&gen1.payload).unwrap();
    assert_eq!(payload["content"], "In the beginning");

    let layout = DatasetLayout::new(dir.path(), DATASET);
    assert!(layout.missing_artifacts().is_empty());
    let saved_index: Value =
        serde_json::from_str(&std::fs::read_to_string(layout.index_path()).unwrap()).unwrap();
    assert_eq!(saved_index, small_index());
}

#[tokio::test]
async fn test_crash_after_archive_before_checkpoint_refetches_once() {
    let server = MockServer::start().await;
    mount_small_dataset(&server).await;
    let dir = TempDir::new().unwrap();

    // GEN.1.1 made it into the archive but the checkpoint still points at it
    open_archive(dir.path())
        .upsert(&ArchiveRecord {
            dataset_id: DATASET.to_string(),
            book_id: "GEN".to_string(),
            chapter: Label::Numeric(1),
            verse: Label::Numeric(1),
            passage_id: "GEN.1.1".to_string(),
            params: FetchParams {
                format: "text".to_string(),
                include_headings: false,
                include_notes: false,
            },
            payload: r#"{"id":"GEN.1.1","content":"stale"}"#.to_string(),
            fetched_at: "2026-01-01T00:00:00+00:00".to_string(),
        })
        .unwrap();

    let mut harvester = Harvester::new(create_test_config(&server, dir.path()), DATASET).unwrap();
    harvester.run(false).await.unwrap();

    assert_eq!(hits(&server, &passage_path("GEN.1.1")).await, 1);
    assert_eq!(hits(&server, &passage_path("GEN.1.2")).await, 1);
    assert_eq!(hits(&server, &passage_path("EXO.1.1")).await, 1);

    let archive = open_archive(dir.path());
    assert_eq!(archive.count(DATASET).unwrap(), 3);
    let gen1 = archive.get_by_passage(DATASET, "GEN.1.1").unwrap().unwrap();
    assert!(gen1.payload.contains("In the beginning"));

    let checkpoint = load_checkpoint(dir.path());
    assert_eq!(checkpoint.cursor(), Cursor::new(2, 0, 0));
    assert!(checkpoint.completed);
}

#[tokio::test]
async fn test_resume_mid_chapter_skips_done_units() {
    let server = MockServer::start().await;
    mount_small_dataset(&server).await;
    let dir = TempDir::new().unwrap();
    let layout = DatasetLayout::new(dir.path(), DATASET);

    let mut checkpoint = Checkpoint::new(DATASET);
    checkpoint.advance_verse(0, 0, 0);
    checkpoint.requests_made = 7;
    JsonStateStore::new(layout.state_path())
        .save(&checkpoint)
        .unwrap();

    let mut harvester = Harvester::new(create_test_config(&server, dir.path()), DATASET).unwrap();
    let report = harvester.run(false).await.unwrap();

    assert_eq!(report.units_fetched, 2);
    assert_eq!(hits(&server, &passage_path("GEN.1.1")).await, 0);
    assert_eq!(hits(&server, &passage_path("GEN.1.2")).await, 1);
    assert_eq!(hits(&server, &passage_path("EXO.1.1")).await, 1);

    let checkpoint = load_checkpoint(dir.path());
    assert!(checkpoint.completed);
    // 7 from earlier runs, then metadata + index + 2 passages
    assert_eq!(checkpoint.requests_made, 11);
}

#[tokio::test]
async fn test_resume_exactness_from_deep_cursor() {
    let server = MockServer::start().await;

    // 3 books × 5 chapters × 6 verses
    let books: Vec<Value> = (0..3)
        .map(|b| {
            let chapters: Vec<Value> = (0..5)
                .map(|c| {
                    let verses: Vec<Value> = (0..6)
                        .map(|v| {
                            json!({
                                "id": (v + 1).to_string(),
                                "passage_id": format!("B{}.{}.{}", b, c + 1, v + 1)
                            })
                        })
                        .collect();
                    json!({"id": (c + 1).to_string(), "verses": verses})
                })
                .collect();
            json!({"id": format!("B{}", b), "chapters": chapters})
        })
        .collect();
    mount_meta(&server, json!({ "books": books })).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/bibles/111/passages/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "x"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut start = Checkpoint::new(DATASET);
    start.advance_verse(2, 3, 4); // next unit is (2, 3, 5)
    let store = RecordingStore::starting_at(start);

    let mut harvester =
        Harvester::with_store(create_test_config(&server, dir.path()), DATASET, store).unwrap();
    let report = harvester.run(false).await.unwrap();

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .filter(|p| p.contains("/passages/"))
        .map(|p| p.rsplit('/').next().unwrap_or_default().to_string())
        .collect();

    let expected: Vec<String> = std::iter::once("B2.4.6".to_string())
        .chain((1..=6).map(|v| format!("B2.5.{}", v)))
        .collect();
    assert_eq!(requested, expected);
    assert_eq!(report.units_fetched, 7);

    let last = harvester.store().saved.last().unwrap();
    assert!(last.completed);
    assert_eq!(last.cursor(), Cursor::new(3, 0, 0));
}

#[tokio::test]
async fn test_checkpoints_are_monotonic() {
    let server = MockServer::start().await;
    mount_small_dataset(&server).await;
    let dir = TempDir::new().unwrap();

    let store = RecordingStore::starting_at(Checkpoint::new(DATASET));
    let mut harvester =
        Harvester::with_store(create_test_config(&server, dir.path()), DATASET, store).unwrap();
    harvester.run(false).await.unwrap();

    let saved = &harvester.store().saved;
    assert!(!saved.is_empty());

    for pair in saved.windows(2) {
        assert!(
            pair[0].cursor() <= pair[1].cursor(),
            "cursor went backwards: {} -> {}",
            pair[0].cursor(),
            pair[1].cursor()
        );
        assert!(pair[0].requests_made <= pair[1].requests_made);
    }

    let last = saved.last().unwrap();
    assert!(last.completed);
    assert_eq!(last.cursor(), Cursor::new(2, 0, 0));
    assert!(saved[..saved.len() - 1].iter().all(|c| !c.completed));
}

#[tokio::test]
async fn test_rate_limit_stops_without_advancing() {
    let server = MockServer::start().await;
    mount_meta(&server, small_index()).await;
    mount_passage(&server, "GEN.1.1", "In the beginning").await;

    // First request for GEN.1.2 is rate limited; later ones succeed
    Mock::given(method("GET"))
        .and(path(passage_path("GEN.1.2")))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("X-RateLimit-Limit", "5000")
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", "1767225600")
                .set_body_json(json!({"message": "Too many requests"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_passage(&server, "GEN.1.2", "Now the earth was formless").await;
    mount_passage(&server, "EXO.1.1", "These are the names").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    let mut harvester = Harvester::new(config.clone(), DATASET).unwrap();
    let err = harvester.run(false).await.unwrap_err();

    match &err {
        HarvestError::RateLimited { info } => {
            assert_eq!(info.limit, Some(5000));
            assert_eq!(info.remaining, Some(0));
            assert_eq!(info.reset.as_deref(), Some("1767225600"));
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
    assert!(err.is_resumable());
    assert_eq!(hits(&server, &passage_path("EXO.1.1")).await, 0);

    let checkpoint = load_checkpoint(dir.path());
    assert_eq!(checkpoint.cursor(), Cursor::new(0, 0, 1));
    assert!(!checkpoint.completed);
    let info = checkpoint.last_rate_limit.unwrap();
    assert_eq!(info.limit, Some(5000));
    assert_eq!(info.remaining, Some(0));
    assert_eq!(info.reset.as_deref(), Some("1767225600"));
    assert_eq!(open_archive(dir.path()).count(DATASET).unwrap(), 1);

    // Re-running picks up at GEN.1.2
    let mut harvester = Harvester::new(config, DATASET).unwrap();
    let report = harvester.run(false).await.unwrap();
    assert_eq!(report.units_fetched, 2);
    assert_eq!(hits(&server, &passage_path("GEN.1.1")).await, 1);
    assert_eq!(hits(&server, &passage_path("GEN.1.2")).await, 2);
    assert!(load_checkpoint(dir.path()).completed);
}

#[tokio::test]
async fn test_http_error_is_fatal() {
    let server = MockServer::start().await;
    mount_meta(&server, small_index()).await;

    Mock::given(method("GET"))
        .and(path(passage_path("GEN.1.1")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut harvester = Harvester::new(create_test_config(&server, dir.path()), DATASET).unwrap();
    let err = harvester.run(false).await.unwrap_err();

    match err {
        HarvestError::Http {
            status,
            url,
            message,
        } => {
            assert_eq!(status, 500);
            assert!(url.ends_with("/passages/GEN.1.1"));
            assert_eq!(message, "boom");
        }
        other => panic!("expected Http, got {:?}", other),
    }

    // Not retried
    assert_eq!(hits(&server, &passage_path("GEN.1.1")).await, 1);

    let checkpoint = load_checkpoint(dir.path());
    assert_eq!(checkpoint.cursor(), Cursor::new(0, 0, 0));
    assert!(!checkpoint.completed);
    assert_eq!(checkpoint.requests_made, 3);
}

#[tokio::test]
async fn test_malformed_index_stops_before_passages() {
    let server = MockServer::start().await;
    mount_meta(
        &server,
        json!({"books": [{"id": "GEN", "chapters": [{"id": "1", "verses": [{"id": "1"}]}]}]}),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut harvester = Harvester::new(create_test_config(&server, dir.path()), DATASET).unwrap();
    let err = harvester.run(false).await.unwrap_err();

    assert!(matches!(err, HarvestError::Structure(_)));
    assert!(!err.is_resumable());
    assert_eq!(passage_hits(&server).await, 0);

    let layout = DatasetLayout::new(dir.path(), DATASET);
    assert!(layout.metadata_path().exists());
    assert!(!layout.index_path().exists());

    let checkpoint = load_checkpoint(dir.path());
    assert_eq!(checkpoint.requests_made, 2);
    assert_eq!(checkpoint.phase(), CrawlPhase::NotStarted);
}

#[tokio::test]
async fn test_meta_only_fetches_no_passages() {
    let server = MockServer::start().await;
    mount_small_dataset(&server).await;
    let dir = TempDir::new().unwrap();

    let mut harvester = Harvester::new(create_test_config(&server, dir.path()), DATASET).unwrap();
    let report = harvester.run(true).await.unwrap();

    assert_eq!(report.units_fetched, 0);
    assert_eq!(report.units_total, Some(3));
    assert_eq!(report.phase, CrawlPhase::NotStarted);
    assert_eq!(passage_hits(&server).await, 0);

    let layout = DatasetLayout::new(dir.path(), DATASET);
    assert!(layout.metadata_path().exists());
    assert!(layout.index_path().exists());
    assert!(!layout.archive_path().exists());
    assert_eq!(layout.missing_artifacts(), vec![layout.archive_path()]);

    let checkpoint = load_checkpoint(dir.path());
    assert!(!checkpoint.completed);
    assert_eq!(checkpoint.requests_made, 2);
}

#[tokio::test]
async fn test_completed_dataset_is_noop() {
    let server = MockServer::start().await;
    mount_small_dataset(&server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    Harvester::new(config.clone(), DATASET)
        .unwrap()
        .run(false)
        .await
        .unwrap();
    let requests_after_first = server.received_requests().await.unwrap().len();

    let report = Harvester::new(config, DATASET)
        .unwrap()
        .run(false)
        .await
        .unwrap();

    assert_eq!(report.units_fetched, 0);
    assert_eq!(report.requests_this_run, 0);
    assert_eq!(report.phase, CrawlPhase::Completed);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
}

#[tokio::test]
async fn test_timeout_is_retried_then_fatal() {
    let server = MockServer::start().await;
    mount_meta(&server, small_index()).await;

    Mock::given(method("GET"))
        .and(path(passage_path("GEN.1.1")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content": "late"}))
                .set_delay(Duration::from_millis(1_500)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.fetch.timeout_ms = 200;
    config.fetch.max_retries = 2;

    let mut harvester = Harvester::new(config, DATASET).unwrap();
    let err = harvester.run(false).await.unwrap_err();

    match &err {
        HarvestError::Transient { attempts, url, .. } => {
            assert_eq!(*attempts, 3);
            assert!(url.ends_with("/passages/GEN.1.1"));
        }
        other => panic!("expected Transient, got {:?}", other),
    }
    assert!(err.is_resumable());
    assert_eq!(hits(&server, &passage_path("GEN.1.1")).await, 3);

    // One counted request per unit, however many attempts it took
    let checkpoint = load_checkpoint(dir.path());
    assert_eq!(checkpoint.cursor(), Cursor::new(0, 0, 0));
    assert_eq!(checkpoint.requests_made, 3);
}

#[tokio::test]
async fn test_request_budget_stops_resumably() {
    let server = MockServer::start().await;
    mount_small_dataset(&server).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.fetch.request_budget = Some(3);

    let mut harvester = Harvester::new(config.clone(), DATASET).unwrap();
    let err = harvester.run(false).await.unwrap_err();

    assert!(matches!(err, HarvestError::BudgetExhausted { used: 3 }));
    assert!(err.is_resumable());
    assert_eq!(passage_hits(&server).await, 1);

    let checkpoint = load_checkpoint(dir.path());
    assert_eq!(checkpoint.cursor(), Cursor::new(0, 0, 1));
    assert_eq!(checkpoint.requests_made, 3);

    // A fresh run gets a fresh budget: metadata + index + 2 passages = 4 > 3
    config.fetch.request_budget = Some(4);
    let report = Harvester::new(config, DATASET)
        .unwrap()
        .run(false)
        .await
        .unwrap();
    assert_eq!(report.units_fetched, 2);
    assert!(load_checkpoint(dir.path()).completed);
}
