use crate::config::types::{ApiConfig, Config, FetchConfig, ImportConfig, PassageConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetch_config(&config.fetch)?;
    validate_passage_config(&config.passages)?;
    validate_import_config(&config.import)?;

    if config.output.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.app_key_header.is_empty() {
        return Err(ConfigError::Validation(
            "app_key_header cannot be empty".to_string(),
        ));
    }

    // Header names are tokens: no whitespace or separators
    if !config
        .app_key_header
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "app_key_header must be a valid header name, got '{}'",
            config.app_key_header
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "timeout_ms must be greater than 0".to_string(),
        ));
    }

    if config.max_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be at most 20, got {}",
            config.max_retries
        )));
    }

    if config.request_budget == Some(0) {
        return Err(ConfigError::Validation(
            "request_budget must be at least 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_passage_config(config: &PassageConfig) -> Result<(), ConfigError> {
    if config.format.is_empty() {
        return Err(ConfigError::Validation(
            "passage format cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_import_config(config: &ImportConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 100_000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100000, got {}",
            config.batch_size
        )));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
