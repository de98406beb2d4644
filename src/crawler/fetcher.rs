//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with the fixed header set and timeout
//! - GET requests against the dataset API
//! - Retry logic for connection and timeout failures
//! - Rate-limit header parsing
//! - Error classification

use crate::config::{ApiConfig, Config, FetchConfig};
use crate::state::RateLimitInfo;
use crate::{ConfigError, HarvestError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

/// Longest response body excerpt carried into logs and error messages
const BODY_EXCERPT_CHARS: usize = 500;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx with a parsed JSON body
    Ok(Value),

    /// HTTP 429; never retried
    RateLimited(RateLimitInfo),

    /// Connection or timeout failure that outlived every retry
    TransientFailure {
        /// Error description of the last attempt
        error: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Any other non-success status, or a body that is not JSON
    HardFailure {
        /// The HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },
}

/// Builds an HTTP client with the configured headers and timeout
///
/// Every request carries `Accept: application/json`, plus the API key
/// header when a key was resolved.
pub fn build_http_client(api: &ApiConfig, fetch: &FetchConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(key) = &api.app_key {
        let name = HeaderName::from_bytes(api.app_key_header.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!(
                "invalid API key header name '{}': {}",
                api.app_key_header, e
            ))
        })?;
        let mut value = HeaderValue::from_str(key).map_err(|_| {
            ConfigError::Validation("API key contains characters not allowed in a header".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }

    let client = Client::builder()
        .user_agent(concat!("bible-harvest/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(fetch.timeout())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Client for the dataset API
pub struct ApiClient {
    client: Client,
    base_url: Url,
    fetch: FetchConfig,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.api.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.api.base_url, e)))?;

        Ok(Self {
            client: build_http_client(&config.api, &config.fetch)?,
            base_url,
            fetch: config.fetch.clone(),
        })
    }

    /// Appends percent-encoded path segments to the base URL
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a GET request and classifies the result
    ///
    /// Each attempt covers both the request and the body read, so a body that
    /// stalls past the timeout is retried like a failed connect.
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Throttle sleep, then Ok |
    /// | HTTP 429 | Immediate → RateLimited |
    /// | Other 4xx/5xx | Immediate → HardFailure |
    /// | Timeout / connect / body read error | Retry `max_retries` times with a fixed delay |
    pub async fn get(&self, url: &Url, query: &[(&str, String)]) -> FetchOutcome {
        let attempts = self.fetch.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.send_once(url, query).await {
                Ok(raw) => return self.classify(raw).await,
                Err(e) if is_retryable(&e) => {
                    last_error = describe(&e);
                    if attempt < attempts {
                        tracing::warn!(
                            "GET {} failed ({}), retry {}/{} in {:?}",
                            url,
                            last_error,
                            attempt,
                            self.fetch.max_retries,
                            self.fetch.retry_interval()
                        );
                        tokio::time::sleep(self.fetch.retry_interval()).await;
                    }
                }
                Err(e) => {
                    return FetchOutcome::TransientFailure {
                        error: describe(&e),
                        attempts: attempt,
                    }
                }
            }
        }

        FetchOutcome::TransientFailure {
            error: last_error,
            attempts,
        }
    }

    /// One request, read to the end of its body
    async fn send_once(&self, url: &Url, query: &[(&str, String)]) -> Result<RawResponse, reqwest::Error> {
        let response = self.client.get(url.clone()).query(query).send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        // A 429 is classified from its headers; the body only feeds the log line
        let body = if status == StatusCode::TOO_MANY_REQUESTS {
            response.text().await.unwrap_or_default()
        } else {
            response.text().await?
        };

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    async fn classify(&self, raw: RawResponse) -> FetchOutcome {
        let RawResponse {
            status,
            headers,
            body,
        } = raw;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let info = parse_rate_limit_headers(&headers);
            tracing::warn!("Rate limited ({}): {}", info, excerpt(&body));
            return FetchOutcome::RateLimited(info);
        }

        if !status.is_success() {
            return FetchOutcome::HardFailure {
                status: status.as_u16(),
                message: error_message(status, &body),
            };
        }

        match serde_json::from_str(&body) {
            Ok(value) => {
                if !self.fetch.sleep().is_zero() {
                    tokio::time::sleep(self.fetch.sleep()).await;
                }
                FetchOutcome::Ok(value)
            }
            Err(e) => FetchOutcome::HardFailure {
                status: status.as_u16(),
                message: format!("response is not valid JSON: {}", e),
            },
        }
    }
}

struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// Reads the `X-RateLimit-*` headers; absent or non-numeric counts are omitted
pub fn parse_rate_limit_headers(headers: &HeaderMap) -> RateLimitInfo {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    RateLimitInfo {
        limit: text("x-ratelimit-limit").and_then(|v| v.parse().ok()),
        remaining: text("x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        reset: text("x-ratelimit-reset"),
    }
}

fn is_retryable(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body()
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Picks `message` or `error` out of a JSON error body, else an excerpt of the text
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(Value::String(message)) = obj.get(key) {
                return message.clone();
            }
        }
    }

    let text = excerpt(body);
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("empty response body")
            .to_string()
    } else {
        text
    }
}

fn excerpt(body: &str) -> String {
    body.trim().chars().take(BODY_EXCERPT_CHARS).collect()
}
