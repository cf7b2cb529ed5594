// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};

use crate::error::{AppError, Result};
use crate::models::FetcherConfig;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Create a configured asynchronous HTTP client for page fetches.
///
/// The cookie store lets a warm-up visit carry over into the target request.
pub fn create_async_client(config: &FetcherConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;
    Ok(client)
}

/// Create a plain client with a timeout, used for outbound notifications.
pub fn create_notify_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Headers for one request attempt.
#[derive(Debug, Clone)]
pub struct RequestProfile {
    pub user_agent: String,
    pub referer: Option<String>,
    pub accept_language: String,
}

impl RequestProfile {
    /// Pick a random User-Agent and Referer from the configured pools.
    pub fn rotate(config: &FetcherConfig) -> Self {
        let mut rng = rand::thread_rng();
        let user_agent = config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect::<Vec<_>>()
            .choose(&mut rng)
            .map(|ua| ua.to_string())
            .unwrap_or_default();
        let referer = config.referers.choose(&mut rng).cloned();

        Self {
            user_agent,
            referer,
            accept_language: config.accept_language.clone(),
        }
    }

    /// Build the header map for this profile.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&self.accept_language)?);
        if let Some(referer) = &self.referer {
            headers.insert(REFERER, header_value(referer)?);
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("Invalid header value {value:?}: {e}")))
}

/// A random delay within `[min_ms, max_ms]`.
pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Exponential backoff for transient retry `attempt` (0-based).
pub fn backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(16)))
}
