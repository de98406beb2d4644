/// Checkpoint definitions for tracking crawl progress
///
/// A checkpoint is the single source of truth for where a crawl resumes. Its
/// cursor always names the next verse to fetch, never one already fetched.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version written into every checkpoint document
pub const CHECKPOINT_VERSION: u32 = 1;

/// Position of the next unit to fetch: `books[book].chapters[chapter].verses[verse]`
///
/// Field order gives the derived `Ord` its lexicographic meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor {
    pub book: usize,
    pub chapter: usize,
    pub verse: usize,
}

impl Cursor {
    pub fn new(book: usize, chapter: usize, verse: usize) -> Self {
        Self {
            book,
            chapter,
            verse,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.book, self.chapter, self.verse)
    }
}

/// Snapshot of the `X-RateLimit-*` headers from a 429 response
///
/// Any subset may be missing; absent headers stay `None` and are omitted from
/// the stored document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<String>,
}

impl RateLimitInfo {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset.is_none()
    }
}

impl fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no rate-limit headers");
        }
        let mut parts = Vec::new();
        if let Some(limit) = self.limit {
            parts.push(format!("limit: {}", limit));
        }
        if let Some(remaining) = self.remaining {
            parts.push(format!("remaining: {}", remaining));
        }
        if let Some(reset) = &self.reset {
            parts.push(format!("reset: {}", reset));
        }
        f.write_str(&parts.join(", "))
    }
}

/// Lifecycle of a dataset crawl
///
/// There is no paused state: an interrupted crawl is simply `InProgress`
/// with its checkpoint at the last completed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    NotStarted,
    InProgress,
    Completed,
}

impl CrawlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable crawl state for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default = "default_version")]
    pub version: u32,
    pub dataset_id: String,
    #[serde(default)]
    pub requests_made: u64,
    #[serde(default)]
    pub last_book_index: usize,
    #[serde(default)]
    pub last_chapter_index: usize,
    #[serde(default)]
    pub last_verse_index: usize,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_rate_limit: Option<RateLimitInfo>,
}

fn default_version() -> u32 {
    CHECKPOINT_VERSION
}

impl Checkpoint {
    /// A zero-valued checkpoint for a dataset that has never been crawled
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            dataset_id: dataset_id.into(),
            requests_made: 0,
            last_book_index: 0,
            last_chapter_index: 0,
            last_verse_index: 0,
            completed: false,
            updated_at: None,
            last_rate_limit: None,
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::new(
            self.last_book_index,
            self.last_chapter_index,
            self.last_verse_index,
        )
    }

    pub fn phase(&self) -> CrawlPhase {
        if self.completed {
            CrawlPhase::Completed
        } else if self.cursor() == Cursor::default() {
            CrawlPhase::NotStarted
        } else {
            CrawlPhase::InProgress
        }
    }

    fn set_cursor(&mut self, book: usize, chapter: usize, verse: usize) {
        self.last_book_index = book;
        self.last_chapter_index = chapter;
        self.last_verse_index = verse;
        self.completed = false;
    }

    /// Verse `(bi, ci, vi)` is archived; the next unit is `vi + 1`
    pub fn advance_verse(&mut self, bi: usize, ci: usize, vi: usize) {
        self.set_cursor(bi, ci, vi + 1);
    }

    /// Every verse of chapter `(bi, ci)` is archived
    pub fn finish_chapter(&mut self, bi: usize, ci: usize) {
        self.set_cursor(bi, ci + 1, 0);
    }

    /// Every chapter of book `bi` is archived
    pub fn finish_book(&mut self, bi: usize) {
        self.set_cursor(bi + 1, 0, 0);
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
