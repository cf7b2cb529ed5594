// src/lambda/mod.rs

//! AWS Lambda handler for the watcher.
//!
//! Each scheduled invocation runs one watch pass:
//! 1. Loads configuration (optional bundled TOML + environment)
//! 2. Reads the last notified digest from S3
//! 3. Fetches the page, compares digests, notifies on change
//! 4. Writes the new digest back to S3 only after a confirmed send

use std::time::Instant;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::{Config, NotificationMessage};
use crate::pipeline::{CheckReport, Watcher};
use crate::services::{LogNotifier, Notifier, TelegramNotifier};
use crate::storage::S3DigestStore;

/// Lambda invocation payload.
#[derive(Debug, Default, Deserialize)]
pub struct CheckRequest {
    /// Fetch and compare, but never send or persist
    #[serde(default)]
    pub dry_run: bool,
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct CheckResponse {
    /// Whether the pass completed without an unexpected error
    pub success: bool,

    /// Outcome label (`notified`, `unchanged`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,

    /// Digest computed during the pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl CheckResponse {
    fn from_report(report: CheckReport, started: Instant) -> Self {
        Self {
            success: report.is_success(),
            outcome: report.outcome.as_ref().map(|o| o.label().to_string()),
            digest: report
                .outcome
                .as_ref()
                .and_then(|o| o.digest())
                .map(|d| d.as_str().to_string()),
            error: report.error,
            execution_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<CheckRequest>,
) -> std::result::Result<CheckResponse, LambdaError> {
    let started = Instant::now();
    let (request, _context) = event.into_parts();
    info!("Starting check: dry_run={}", request.dry_run);

    let config = load_lambda_config();

    match build_watcher(&config, request.dry_run).await {
        Ok(watcher) => {
            let report = watcher.check().await;
            let response = CheckResponse::from_report(report, started);
            info!(
                "Check completed: outcome={:?} in {}ms",
                response.outcome, response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!("Watcher setup failed: {}", e);
            alert_setup_failure(&config, &e.to_string()).await;
            Ok(CheckResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            })
        }
    }
}

/// Load configuration suitable for Lambda environment.
fn load_lambda_config() -> Config {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "watcher.toml".to_string());
    let mut config = Config::load_or_default(&path);
    config.apply_process_env();
    config
}

async fn build_watcher(config: &Config, dry_run: bool) -> Result<Watcher> {
    config.validate()?;

    let store = S3DigestStore::from_env(&config.storage.s3_key).await?;
    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(LogNotifier)
    } else {
        Box::new(TelegramNotifier::new(&config.notifier)?)
    };

    Watcher::from_config(config, Box::new(store), notifier)
}

/// Best-effort crash alert when the watcher itself could not be built.
async fn alert_setup_failure(config: &Config, reason: &str) {
    match TelegramNotifier::new(&config.notifier) {
        Ok(notifier) => {
            let delivery = notifier.deliver(&NotificationMessage::crash(reason)).await;
            info!("Setup failure alert: {:?}", delivery);
        }
        Err(e) => error!("Could not build notifier for setup failure alert: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_request_defaults() {
        let req: CheckRequest = serde_json::from_str("{}").unwrap();
        assert!(!req.dry_run);
    }

    #[test]
    fn test_check_request_ignores_scheduler_fields() {
        let json = r#"{"dry_run": true, "source": "aws.events", "detail-type": "Scheduled Event"}"#;
        let req: CheckRequest = serde_json::from_str(json).unwrap();
        assert!(req.dry_run);
    }

    #[test]
    fn test_response_skips_empty_fields() {
        let response = CheckResponse {
            success: true,
            outcome: Some("unchanged".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "unchanged");
        assert!(json.get("error").is_none());
        assert!(json.get("digest").is_none());
    }
}
