//! Configuration module for Bible-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every setting has a default, so running without a file is valid.
//!
//! # Example
//!
//! ```no_run
//! use bible_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Fetching from: {}", config.api.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, DumpOverrides, FetchConfig, ImportConfig, OutputConfig, PassageConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, resolve_app_key};
pub use validation::validate;
