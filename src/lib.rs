//! Bible-Harvest: a resumable passage crawler and bulk importer
//!
//! This crate harvests a Bible translation (books → chapters → verses) from a
//! rate-limited remote API into a local archive, one verse at a time, with a
//! durable cursor that lets any interrupted run pick up exactly where it stopped.
//! A separate importer bulk-loads the archive into a relational catalog.

pub mod config;
pub mod crawler;
pub mod dataset;
pub mod import;
pub mod layout;
pub mod output;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Bible-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rate limited by remote API ({info})")]
    RateLimited { info: state::RateLimitInfo },

    #[error("Request to {url} failed after {attempts} attempts: {message}")]
    Transient {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("HTTP {status} GET {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Malformed dataset index: {0}")]
    Structure(#[from] dataset::IndexError),

    #[error("Request budget of {used} requests exhausted for this run")]
    BudgetExhausted { used: u64 },

    #[error("Required artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("State error: {0}")]
    State(#[from] state::StateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true if the run stopped with a checkpoint that a re-run resumes from
    ///
    /// Structural, storage and configuration failures need an operator to fix
    /// something first; the network and quota stops only need a re-run.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Transient { .. }
                | Self::Http { .. }
                | Self::BudgetExhausted { .. }
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Bible-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Harvester, HarvestReport};
pub use dataset::{DatasetIndex, Label};
pub use import::{import_dataset, ImportReport};
pub use layout::DatasetLayout;
pub use state::{Checkpoint, CrawlPhase, RateLimitInfo};
