//! Harvester - main crawl orchestration logic
//!
//! This module contains the crawl loop that walks a dataset index
//! book → chapter → verse, including:
//! - Loading the checkpoint and resuming from its cursor
//! - Fetching metadata and the index once per run
//! - Fetching, archiving and checkpointing one verse at a time
//! - Persisting the checkpoint on every fatal stop

use crate::config::Config;
use crate::crawler::{ApiClient, FetchOutcome};
use crate::dataset::{DatasetIndex, DatasetMeta};
use crate::layout::DatasetLayout;
use crate::state::{atomic_write_json, Checkpoint, CrawlPhase, JsonStateStore, StateStore};
use crate::storage::{ArchiveRecord, FetchParams, VerseArchive};
use crate::{HarvestError, Result};
use chrono::Utc;
use serde_json::Value;

/// Summary of one harvest run
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestReport {
    pub dataset_id: String,
    /// Verses fetched and archived by this run
    pub units_fetched: u64,
    /// Verses in the index, when the passage loop ran
    pub units_total: Option<usize>,
    /// Requests issued by this run
    pub requests_this_run: u64,
    /// Requests recorded on the checkpoint across all runs
    pub requests_total: u64,
    pub phase: CrawlPhase,
}

/// Sequential, resumable crawler for one dataset
///
/// Exactly one unit is in flight at a time. After every archived verse the
/// checkpoint is rewritten, so the cursor never points past unarchived work.
pub struct Harvester<S: StateStore = JsonStateStore> {
    config: Config,
    dataset_id: String,
    layout: DatasetLayout,
    client: ApiClient,
    store: S,
    checkpoint: Checkpoint,
    params: FetchParams,
    requests_this_run: u64,
}

impl Harvester<JsonStateStore> {
    /// Creates a harvester that keeps its checkpoint in `<data_dir>/<dataset>/state.json`
    pub fn new(config: Config, dataset_id: &str) -> Result<Self> {
        let layout = DatasetLayout::new(&config.output.data_dir, dataset_id);
        let store = JsonStateStore::new(layout.state_path());
        Self::with_store(config, dataset_id, store)
    }
}

impl<S: StateStore> Harvester<S> {
    /// Creates a harvester over an arbitrary checkpoint store
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built or the stored checkpoint is
    /// unreadable.
    pub fn with_store(config: Config, dataset_id: &str, store: S) -> Result<Self> {
        let layout = DatasetLayout::new(&config.output.data_dir, dataset_id);
        let client = ApiClient::new(&config)?;
        let checkpoint = store.load(dataset_id)?;
        let params = FetchParams::from_config(&config.passages);

        Ok(Self {
            config,
            dataset_id: dataset_id.to_string(),
            layout,
            client,
            store,
            checkpoint,
            params,
            requests_this_run: 0,
        })
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the harvest
    ///
    /// A dataset whose checkpoint is already completed is a no-op unless
    /// `meta_only` is set, in which case the metadata is refreshed.
    ///
    /// # Errors
    ///
    /// Every error leaves the checkpoint persisted at its last consistent
    /// value; see [`HarvestError::is_resumable`].
    pub async fn run(&mut self, meta_only: bool) -> Result<HarvestReport> {
        if self.checkpoint.completed && !meta_only {
            tracing::info!(
                "Dataset {} is already complete ({} requests recorded), nothing to do",
                self.dataset_id,
                self.checkpoint.requests_made
            );
            return Ok(self.report(0, None));
        }

        tracing::info!(
            "Starting harvest of dataset {} into {} ({})",
            self.dataset_id,
            self.layout.root().display(),
            self.checkpoint.phase()
        );

        match self.harvest(meta_only).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!("Harvest of dataset {} stopped: {}", self.dataset_id, e);
                match self.persist() {
                    Ok(()) => tracing::error!(
                        "State saved to {}; re-run the same command to resume.",
                        self.store.location()
                    ),
                    Err(save_err) => tracing::error!(
                        "Failed to save state to {}: {}",
                        self.store.location(),
                        save_err
                    ),
                }
                Err(e)
            }
        }
    }

    async fn harvest(&mut self, meta_only: bool) -> Result<HarvestReport> {
        self.layout.ensure_dirs()?;

        let index = self.dump_meta().await?;

        // Meta-only runs never create the archive
        if meta_only {
            tracing::info!(
                "Metadata for {} written ({} books, {} verses); skipping passages",
                self.dataset_id,
                index.books.len(),
                index.unit_count()
            );
            return Ok(self.report(0, Some(index.unit_count())));
        }

        let archive = VerseArchive::open(&self.layout.archive_path())?;
        let fetched = self.dump_passages(&index, &archive).await?;
        Ok(self.report(fetched, Some(index.unit_count())))
    }

    /// Fetches metadata and the index, writes both under `meta/`
    ///
    /// The index is fully validated before it is written, so a malformed
    /// index stops the run before any passage request.
    async fn dump_meta(&mut self) -> Result<DatasetIndex> {
        let dataset_id = self.dataset_id.clone();

        let meta = self.request(&[&dataset_id], &[]).await?;
        match DatasetMeta::from_value(meta.clone()) {
            Ok(parsed) => tracing::info!("Dataset {}: {}", parsed.id, parsed.display_title()),
            Err(e) => tracing::warn!("Metadata for {} is incomplete: {}", dataset_id, e),
        }
        atomic_write_json(&self.layout.metadata_path(), &meta)?;

        let raw_index = self.request(&[&dataset_id, "index"], &[]).await?;
        let index = DatasetIndex::from_value(&raw_index)?;
        atomic_write_json(&self.layout.index_path(), &raw_index)?;

        Ok(index)
    }

    /// The nested book → chapter → verse loop
    ///
    /// Only the exact frontier position is offset: the first book resumes at
    /// the checkpoint's chapter, the first chapter at its verse, and every
    /// later book or chapter starts from zero.
    async fn dump_passages(&mut self, index: &DatasetIndex, archive: &VerseArchive) -> Result<u64> {
        let dataset_id = self.dataset_id.clone();
        let query = self.params.query();
        let start = self.checkpoint.cursor();
        let total = index.unit_count();
        let done = index.units_before(start.book, start.chapter, start.verse);

        if done > 0 {
            tracing::info!(
                "Resuming at {} ({}/{} verses already archived)",
                start,
                done,
                total
            );
        }

        let mut fetched = 0u64;

        for bi in start.book..index.books.len() {
            let book = &index.books[bi];
            let first_ci = if bi == start.book { start.chapter } else { 0 };

            tracing::info!(
                "Book {}/{}: {} ({} chapters)",
                bi + 1,
                index.books.len(),
                book.id,
                book.chapters.len()
            );

            for ci in first_ci..book.chapters.len() {
                let chapter = &book.chapters[ci];
                let first_vi = if bi == start.book && ci == start.chapter {
                    start.verse
                } else {
                    0
                };

                for vi in first_vi..chapter.verses.len() {
                    let verse = &chapter.verses[vi];
                    tracing::debug!("Fetching {} ({}:{})", verse.passage_id, chapter.label, verse.label);

                    let payload = self
                        .request(&[&dataset_id, "passages", &verse.passage_id], &query)
                        .await?;

                    archive.upsert(&ArchiveRecord {
                        dataset_id: dataset_id.clone(),
                        book_id: book.id.clone(),
                        chapter: chapter.label.clone(),
                        verse: verse.label.clone(),
                        passage_id: verse.passage_id.clone(),
                        params: self.params.clone(),
                        payload: serde_json::to_string(&payload)?,
                        fetched_at: Utc::now().to_rfc3339(),
                    })?;

                    self.checkpoint.advance_verse(bi, ci, vi);
                    self.persist()?;
                    fetched += 1;
                }

                self.checkpoint.finish_chapter(bi, ci);
                self.persist()?;
            }

            self.checkpoint.finish_book(bi);
            self.persist()?;
        }

        self.checkpoint.mark_completed();
        self.persist()?;

        tracing::info!(
            "Dataset {} complete: {} verses fetched this run, {} requests recorded",
            dataset_id,
            fetched,
            self.checkpoint.requests_made
        );

        Ok(fetched)
    }

    /// Issues one API request
    ///
    /// The request counter is incremented and persisted before the network
    /// call, so a crash mid-request is still counted on resume.
    async fn request(&mut self, segments: &[&str], query: &[(&str, String)]) -> Result<Value> {
        if let Some(budget) = self.config.fetch.request_budget {
            if self.requests_this_run >= budget {
                return Err(HarvestError::BudgetExhausted {
                    used: self.requests_this_run,
                });
            }
        }

        self.checkpoint.requests_made += 1;
        self.requests_this_run += 1;
        self.persist()?;

        let url = self.client.endpoint(segments);

        match self.client.get(&url, query).await {
            FetchOutcome::Ok(body) => Ok(body),
            FetchOutcome::RateLimited(info) => {
                self.checkpoint.last_rate_limit = Some(info.clone());
                self.persist()?;
                Err(HarvestError::RateLimited { info })
            }
            FetchOutcome::TransientFailure { error, attempts } => Err(HarvestError::Transient {
                url: url.to_string(),
                attempts,
                message: error,
            }),
            FetchOutcome::HardFailure { status, message } => Err(HarvestError::Http {
                status,
                url: url.to_string(),
                message,
            }),
        }
    }

    fn persist(&mut self) -> Result<()> {
        self.checkpoint.touch();
        self.store.save(&self.checkpoint)?;
        Ok(())
    }

    fn report(&self, units_fetched: u64, units_total: Option<usize>) -> HarvestReport {
        HarvestReport {
            dataset_id: self.dataset_id.clone(),
            units_fetched,
            units_total,
            requests_this_run: self.requests_this_run,
            requests_total: self.checkpoint.requests_made,
            phase: self.checkpoint.phase(),
        }
    }
}
