// src/services/fetcher.rs

//! Page fetcher with ordered fallback strategies.

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::PageSnapshot;

/// One way of turning a URL into a normalized snapshot.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Name reported in logs and in the snapshot.
    fn name(&self) -> &str;

    /// Fetch the page and return its normalized text.
    async fn fetch(&self, url: &str) -> Result<PageSnapshot>;
}

/// Tries each strategy in order until one returns plausible content.
pub struct Fetcher {
    strategies: Vec<Box<dyn FetchStrategy>>,
    min_content_length: usize,
}

impl Fetcher {
    pub fn new(min_content_length: usize) -> Self {
        Self {
            strategies: Vec::new(),
            min_content_length,
        }
    }

    /// Append a strategy to the fallback order.
    pub fn with_strategy(mut self, strategy: impl FetchStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Fetch the page.
    ///
    /// A strategy that errors or returns fewer than `min_content_length`
    /// characters hands over to the next one. When every strategy errors the
    /// result is [`AppError::FetchExhausted`]. When some strategy produced only
    /// short content, the last such snapshot is returned and the caller decides
    /// what to do with it.
    pub async fn fetch(&self, url: &str) -> Result<PageSnapshot> {
        if self.strategies.is_empty() {
            return Err(AppError::config("No fetch strategies configured"));
        }

        let mut failures = Vec::new();
        let mut short_snapshot: Option<PageSnapshot> = None;

        for strategy in &self.strategies {
            log::info!("Fetching {} via {}", url, strategy.name());

            match strategy.fetch(url).await {
                Ok(snapshot) if snapshot.char_len() >= self.min_content_length => {
                    log::info!(
                        "Fetched {} chars via {}",
                        snapshot.char_len(),
                        strategy.name()
                    );
                    return Ok(snapshot);
                }
                Ok(snapshot) => {
                    log::warn!(
                        "{} returned only {} chars (minimum {}), trying next strategy",
                        strategy.name(),
                        snapshot.char_len(),
                        self.min_content_length
                    );
                    failures.push(format!(
                        "{}: short content ({} chars)",
                        strategy.name(),
                        snapshot.char_len()
                    ));
                    short_snapshot = Some(snapshot);
                }
                Err(e) => {
                    log::warn!("{} failed: {}", strategy.name(), e);
                    failures.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        match short_snapshot {
            Some(snapshot) => Ok(snapshot),
            None => Err(AppError::FetchExhausted(failures.join("; "))),
        }
    }
}
