// src/pipeline/watch.rs

//! One watch pass: fetch, guard, hash, compare, notify, persist.

use chrono::Local;

use crate::error::{AppError, Result};
use crate::models::{Config, ContentDigest, NotificationMessage, select_snippet};
use crate::services::{Delivery, Fetcher, Notifier, build_fetcher};
use crate::storage::DigestStore;

use super::detect::{Change, ChangeDetector};
use super::guard::{ContentGuard, ContentGuardConfig, GuardResult};

/// Terminal state of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every fetch strategy failed; an alert was attempted
    FetchFailed { reason: String, alert: Delivery },
    /// Content too short to trust; nothing hashed or persisted
    Implausible { length: usize, min_length: usize },
    /// Content matches the stored digest
    Unchanged { digest: ContentDigest },
    /// Change delivered and digest persisted
    Notified {
        digest: ContentDigest,
        first_run: bool,
    },
    /// Change detected but not delivered; stored digest left as it was
    NotDelivered {
        digest: ContentDigest,
        delivery: Delivery,
    },
}

impl RunOutcome {
    /// Short label for logs and Lambda responses.
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::FetchFailed { .. } => "fetch_failed",
            RunOutcome::Implausible { .. } => "implausible",
            RunOutcome::Unchanged { .. } => "unchanged",
            RunOutcome::Notified { .. } => "notified",
            RunOutcome::NotDelivered { .. } => "not_delivered",
        }
    }

    /// Digest computed during the pass, if it got that far.
    pub fn digest(&self) -> Option<&ContentDigest> {
        match self {
            RunOutcome::Unchanged { digest }
            | RunOutcome::Notified { digest, .. }
            | RunOutcome::NotDelivered { digest, .. } => Some(digest),
            RunOutcome::FetchFailed { .. } | RunOutcome::Implausible { .. } => None,
        }
    }

    /// Whether this pass advanced the stored digest.
    pub fn persisted(&self) -> bool {
        matches!(self, RunOutcome::Notified { .. })
    }
}

/// Result of a pass with the top-level error policy applied.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub outcome: Option<RunOutcome>,
    pub error: Option<String>,
}

impl CheckReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Watches one page.
pub struct Watcher {
    url: String,
    fetcher: Fetcher,
    guard: ContentGuard,
    detector: ChangeDetector,
    store: Box<dyn DigestStore>,
    notifier: Box<dyn Notifier>,
    snippet_min_line_chars: usize,
    snippet_max_chars: usize,
}

impl Watcher {
    /// Assemble a watcher from explicit collaborators.
    pub fn new(
        config: &Config,
        fetcher: Fetcher,
        store: Box<dyn DigestStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            url: config.target.url.clone(),
            fetcher,
            guard: ContentGuard::with_config(ContentGuardConfig {
                min_content_length: config.guard.min_content_length,
            }),
            detector: ChangeDetector::new(),
            store,
            notifier,
            snippet_min_line_chars: config.notifier.snippet_min_line_chars,
            snippet_max_chars: config.notifier.snippet_max_chars,
        }
    }

    /// Assemble a watcher with the fetch strategies the configuration asks for.
    pub fn from_config(
        config: &Config,
        store: Box<dyn DigestStore>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self> {
        let fetcher = build_fetcher(config)?;
        log::debug!("Fetch strategies: {}", fetcher.strategy_names().join(" -> "));
        Ok(Self::new(config, fetcher, store, notifier))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run one pass.
    ///
    /// Fetch failures, implausible content and delivery failures are outcomes,
    /// not errors. `Err` means something unexpected, typically digest store I/O.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        log::info!("Checking {} for updates", self.url);

        let previous = self.store.load().await?;
        log::debug!("Stored digest: {}", previous);

        let snapshot = match self.fetcher.fetch(&self.url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("No content fetched from {}: {}", self.url, e);
                let reason = e.to_string();
                let alert = self
                    .notifier
                    .deliver(&NotificationMessage::fetch_failure(&self.url, &reason))
                    .await;
                return Ok(RunOutcome::FetchFailed { reason, alert });
            }
        };

        match self.guard.check(&snapshot) {
            GuardResult::Plausible { .. } => {}
            GuardResult::TooShort { length, min_length } => {
                log::warn!(
                    "Fetched content is only {} chars (minimum {}), aborting without changes",
                    length,
                    min_length
                );
                return Ok(RunOutcome::Implausible { length, min_length });
            }
            GuardResult::Empty => {
                log::warn!("Fetched content is empty, aborting without changes");
                return Ok(RunOutcome::Implausible {
                    length: 0,
                    min_length: self.guard.min_content_length(),
                });
            }
        }

        let (digest, first_run) = match self.detector.detect(&snapshot, &previous) {
            Change::Unchanged { digest } => {
                log::info!("No change detected (digest {})", digest.short());
                return Ok(RunOutcome::Unchanged { digest });
            }
            Change::Changed { digest, first_run } => (digest, first_run),
        };

        if first_run {
            log::info!("First observation, digest {}", digest.short());
        } else {
            log::info!(
                "Change detected: {} -> {}",
                previous.short(),
                digest.short()
            );
        }

        let snippet = select_snippet(
            &snapshot.text,
            self.snippet_min_line_chars,
            self.snippet_max_chars,
        );
        let message = NotificationMessage::change_at(
            &self.url,
            snippet,
            snapshot.fetched_at.with_timezone(&Local),
        );
        drop(snapshot);

        let delivery = self.notifier.deliver(&message).await;

        if !delivery.is_sent() {
            log::warn!(
                "Change not delivered ({:?}), keeping digest {} so the next run retries",
                delivery,
                previous
            );
            return Ok(RunOutcome::NotDelivered { digest, delivery });
        }

        self.store.save(&digest).await?;
        log::info!("Change detected and notified");
        Ok(RunOutcome::Notified { digest, first_run })
    }

    /// Best-effort alert for an unexpected error.
    pub async fn alert_crash(&self, error: &AppError) -> Delivery {
        self.notifier
            .deliver(&NotificationMessage::crash(error.to_string()))
            .await
    }

    /// Run one pass; unexpected errors are logged and alerted, never returned.
    pub async fn check(&self) -> CheckReport {
        match self.run_once().await {
            Ok(outcome) => {
                log::info!("Run finished: {}", outcome.label());
                CheckReport {
                    outcome: Some(outcome),
                    error: None,
                }
            }
            Err(e) => {
                log::error!("Run failed: {}", e);
                let alert = self.alert_crash(&e).await;
                log::debug!("Crash alert: {:?}", alert);
                CheckReport {
                    outcome: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
