//! Service layer for the watcher.
//!
//! This module contains the pipeline's collaborators:
//! - Page fetching (`Fetcher`, `HttpStrategy`, `BrowserStrategy`)
//! - Blocking signature detection (`BlockDetector`)
//! - HTML to text extraction (`html_to_text`)
//! - Notification delivery (`TelegramNotifier`)

pub mod blocking;
#[cfg(feature = "browser")]
mod browser;
pub mod extract;
mod fetcher;
mod http_fetch;
mod notifier;

pub use blocking::{BlockDetector, BlockSignal, BodySignal, HeaderSignal, ResponseProbe, StatusSignal};
#[cfg(feature = "browser")]
pub use browser::BrowserStrategy;
pub use extract::{html_to_text, normalize_text};
pub use fetcher::{FetchStrategy, Fetcher};
pub use http_fetch::HttpStrategy;
pub use notifier::{Delivery, LogNotifier, Notifier, TelegramNotifier};

use std::fmt;

use crate::error::Result;
use crate::models::Config;

/// Whether the headless browser fallback will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFallback {
    Enabled,
    /// Turned off in the configuration
    Disabled,
    /// Requested, but the `browser` feature is not compiled in
    NotCompiled,
}

impl BrowserFallback {
    pub fn for_config(config: &Config) -> Self {
        if !config.browser.enabled {
            BrowserFallback::Disabled
        } else if cfg!(feature = "browser") {
            BrowserFallback::Enabled
        } else {
            BrowserFallback::NotCompiled
        }
    }
}

impl fmt::Display for BrowserFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BrowserFallback::Enabled => "enabled",
            BrowserFallback::Disabled => "disabled",
            BrowserFallback::NotCompiled => {
                "requested but not compiled in (build with --features browser)"
            }
        })
    }
}

/// Build the fetcher for a configuration: HTTP first, then the headless
/// browser when the `browser` feature is compiled in and enabled.
pub fn build_fetcher(config: &Config) -> Result<Fetcher> {
    let detector = BlockDetector::from_config(&config.blocking);
    let fetcher = Fetcher::new(config.guard.min_content_length)
        .with_strategy(HttpStrategy::new(&config.fetcher, detector)?);

    #[cfg(feature = "browser")]
    let fetcher = if config.browser.enabled {
        fetcher.with_strategy(BrowserStrategy::new(&config.browser, &config.fetcher))
    } else {
        fetcher
    };

    if BrowserFallback::for_config(config) == BrowserFallback::NotCompiled {
        log::warn!(
            "Browser fallback is enabled but the `browser` feature is not compiled in, \
             only HTTP fetching will run"
        );
    }

    Ok(fetcher)
}
