// src/services/http_fetch.rs

//! Lightweight HTTP fetch strategy.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::{AppError, Result};
use crate::models::{FetcherConfig, PageSnapshot};
use crate::services::blocking::{BlockDetector, ResponseProbe};
use crate::services::extract::html_to_text;
use crate::services::fetcher::FetchStrategy;
use crate::utils::http::{RequestProfile, backoff, create_async_client, random_delay};

/// Statuses worth re-sending the same request for.
const TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Fetches the page with reqwest, rotating headers between attempts.
pub struct HttpStrategy {
    client: Client,
    config: FetcherConfig,
    detector: BlockDetector,
}

impl HttpStrategy {
    pub fn new(config: &FetcherConfig, detector: BlockDetector) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            config: config.clone(),
            detector,
        })
    }

    /// Visit the warm-up page so the target request carries its cookies.
    async fn warm_up(&self) {
        let Some(url) = self.config.warm_up_url.as_deref() else {
            return;
        };

        let headers = match RequestProfile::rotate(&self.config).headers() {
            Ok(headers) => headers,
            Err(e) => {
                log::debug!("Skipping warm-up visit: {}", e);
                return;
            }
        };

        match self.client.get(url).headers(headers).send().await {
            Ok(response) => log::debug!("Warm-up visit to {} returned {}", url, response.status()),
            Err(e) => log::debug!("Warm-up visit to {} failed: {}", url, e),
        }
    }

    /// One attempt with a fresh header profile, re-sending on transient statuses.
    /// Returns the normalized page text.
    async fn attempt(&self, url: &str) -> Result<String> {
        let profile = RequestProfile::rotate(&self.config);
        let headers = profile.headers()?;
        log::debug!(
            "Request profile: ua={:?} referer={:?}",
            profile.user_agent,
            profile.referer
        );

        let mut retries = 0;
        loop {
            let response = self.client.get(url).headers(headers.clone()).send().await?;
            let status = response.status();

            if is_transient(status) && retries < self.config.max_retries {
                let wait = backoff(self.config.retry_backoff_ms, retries);
                log::warn!(
                    "HTTP {} from {}, retrying in {}ms ({}/{})",
                    status,
                    url,
                    wait.as_millis(),
                    retries + 1,
                    self.config.max_retries
                );
                tokio::time::sleep(wait).await;
                retries += 1;
                continue;
            }

            let response_headers = response.headers().clone();
            let body = response.text().await?;
            let text = html_to_text(&body);

            let probe = ResponseProbe {
                status,
                headers: &response_headers,
                body: &body,
                text: &text,
            };
            if let Some(signal) = self.detector.detect(&probe) {
                return Err(AppError::Blocked {
                    signal: signal.to_string(),
                    status: status.as_u16(),
                });
            }

            if !status.is_success() {
                return Err(AppError::fetch(self.name(), format!("HTTP {status}")));
            }

            return Ok(text);
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    TRANSIENT_STATUSES.contains(&status.as_u16())
}

#[async_trait]
impl FetchStrategy for HttpStrategy {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<PageSnapshot> {
        self.warm_up().await;

        let attempts = self.config.block_retries + 1;
        let mut last_block = None;

        for attempt in 1..=attempts {
            let delay = random_delay(self.config.min_delay_ms, self.config.max_delay_ms);
            if !delay.is_zero() {
                log::debug!("Waiting {}ms before request", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.attempt(url).await {
                Ok(text) => return Ok(PageSnapshot::new(text, self.name())),
                Err(e @ AppError::Blocked { .. }) => {
                    log::warn!("Attempt {}/{} blocked: {}", attempt, attempts, e);
                    last_block = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_block.unwrap_or_else(|| AppError::fetch(self.name(), "no attempts made")))
    }
}
