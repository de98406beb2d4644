//! State module for tracking crawl progress
//!
//! This module provides the durable resume state for a dataset crawl.
//!
//! # Components
//!
//! - `Checkpoint`: cursor into the book/chapter/verse space plus request counters
//! - `CrawlPhase`: NotStarted → InProgress → Completed
//! - `StateStore`: persistence trait; `JsonStateStore` replaces a JSON file atomically

mod checkpoint;
mod store;

// Re-export main types
pub use checkpoint::{Checkpoint, CrawlPhase, Cursor, RateLimitInfo, CHECKPOINT_VERSION};
pub use store::{atomic_write_json, JsonStateStore, StateError, StateResult, StateStore};
