// src/services/browser.rs

//! Headless Chrome fetch strategy.
//!
//! Used when the plain HTTP fetch is blocked or the page only renders its
//! content through JavaScript.

use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};

use crate::error::{AppError, Result};
use crate::models::{BrowserConfig, FetcherConfig, PageSnapshot};
use crate::services::extract::html_to_text;
use crate::services::fetcher::FetchStrategy;
use crate::utils::http::RequestProfile;

/// Renders the page in headless Chrome and extracts the resulting DOM text.
pub struct BrowserStrategy {
    config: BrowserConfig,
    fetcher: FetcherConfig,
}

impl BrowserStrategy {
    pub fn new(config: &BrowserConfig, fetcher: &FetcherConfig) -> Self {
        Self {
            config: config.clone(),
            fetcher: fetcher.clone(),
        }
    }
}

/// Blocking part of the fetch; runs on tokio's blocking pool.
fn render_page(url: &str, timeout: Duration, sandbox: bool, profile: &RequestProfile) -> Result<String> {
    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(sandbox)
        .idle_browser_timeout(timeout + Duration::from_secs(30))
        .build()
        .map_err(AppError::browser)?;

    let browser = Browser::new(options).map_err(AppError::browser)?;
    let tab = browser.new_tab().map_err(AppError::browser)?;
    tab.set_default_timeout(timeout);
    tab.set_user_agent(&profile.user_agent, Some(&profile.accept_language), None)
        .map_err(AppError::browser)?;

    tab.navigate_to(url).map_err(AppError::browser)?;
    tab.wait_until_navigated().map_err(AppError::browser)?;
    tab.wait_for_element("body").map_err(AppError::browser)?;

    tab.get_content().map_err(AppError::browser)
}

#[async_trait]
impl FetchStrategy for BrowserStrategy {
    fn name(&self) -> &str {
        "browser"
    }

    async fn fetch(&self, url: &str) -> Result<PageSnapshot> {
        let url = url.to_string();
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let sandbox = self.config.sandbox;
        let profile = RequestProfile::rotate(&self.fetcher);

        log::debug!("Launching headless browser (timeout {}s)", timeout.as_secs());

        let html = tokio::task::spawn_blocking(move || render_page(&url, timeout, sandbox, &profile))
            .await
            .map_err(|e| AppError::browser(format!("browser task failed: {e}")))??;

        Ok(PageSnapshot::new(html_to_text(&html), self.name()))
    }
}
