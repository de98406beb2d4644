use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Bible-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub passages: PassageConfig,
    pub output: OutputConfig,
    pub import: ImportConfig,
}

/// Remote API connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL that dataset paths are appended to
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Header that carries the application key
    #[serde(rename = "app-key-header")]
    pub app_key_header: String,

    /// Environment variable the application key is read from
    #[serde(rename = "app-key-env")]
    pub app_key_env: String,

    /// Resolved application key; filled from the environment, never from the file
    #[serde(skip)]
    pub app_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.youversion.com/v1/bibles".to_string(),
            app_key_header: "X-YVP-App-Key".to_string(),
            app_key_env: "YVP_APP_KEY".to_string(),
            app_key: None,
        }
    }
}

/// Request timing and retry behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Extra attempts after a timeout or connection failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed delay between retry attempts (milliseconds)
    #[serde(rename = "retry-interval-ms")]
    pub retry_interval_ms: u64,

    /// Sleep after every successful request (milliseconds)
    #[serde(rename = "sleep-ms")]
    pub sleep_ms: u64,

    /// Maximum requests a single run may issue
    #[serde(rename = "request-budget")]
    pub request_budget: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_interval_ms: 5_000,
            sleep_ms: 0,
            request_budget: None,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn sleep(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }
}

/// Query parameters sent with every passage request
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PassageConfig {
    pub format: String,

    #[serde(rename = "include-headings")]
    pub include_headings: bool,

    #[serde(rename = "include-notes")]
    pub include_notes: bool,
}

impl Default for PassageConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            include_headings: false,
            include_notes: false,
        }
    }
}

/// Where dumped datasets live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory; each dataset gets its own subdirectory
    #[serde(rename = "data-dir")]
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "bible_data".to_string(),
        }
    }
}

/// Bulk import settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Path to the relational catalog database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Verses written per transaction
    #[serde(rename = "batch-size")]
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_path: "catalog.db".to_string(),
            batch_size: 1000,
        }
    }
}

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct DumpOverrides {
    pub data_dir: Option<String>,
    pub timeout_secs: Option<f64>,
    pub sleep_secs: Option<f64>,
    pub format: Option<String>,
    pub include_headings: bool,
    pub include_notes: bool,
    pub request_budget: Option<u64>,
}

impl Config {
    /// Applies command-line overrides for the dump command
    ///
    /// Boolean flags can only switch an option on; leaving a flag off keeps
    /// whatever the configuration file says.
    pub fn apply_dump_overrides(&mut self, overrides: &DumpOverrides) {
        if let Some(dir) = &overrides.data_dir {
            self.output.data_dir = dir.clone();
        }
        if let Some(secs) = overrides.timeout_secs {
            self.fetch.timeout_ms = secs_to_millis(secs);
        }
        if let Some(secs) = overrides.sleep_secs {
            self.fetch.sleep_ms = secs_to_millis(secs);
        }
        if let Some(format) = &overrides.format {
            self.passages.format = format.clone();
        }
        if overrides.include_headings {
            self.passages.include_headings = true;
        }
        if overrides.include_notes {
            self.passages.include_notes = true;
        }
        if overrides.request_budget.is_some() {
            self.fetch.request_budget = overrides.request_budget;
        }
    }
}

fn secs_to_millis(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}
