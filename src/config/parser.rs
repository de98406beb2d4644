use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the file if one was given, otherwise starts from defaults
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

/// Reads the application key from the environment variable named in the config
///
/// This is the only place the environment is consulted; everything downstream
/// receives the key through `Config.api.app_key`. Empty values count as unset.
pub fn resolve_app_key(config: &mut Config) {
    config.api.app_key = std::env::var(&config.api.app_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty());

    if config.api.app_key.is_none() {
        tracing::warn!(
            "{} is not set; requests will be sent without {}",
            config.api.app_key_env,
            config.api.app_key_header
        );
    }
}
