//! AWS Lambda entry point for the watcher
//!
//! Deploy with `cargo lambda build --release --features lambda` and attach a
//! scheduled trigger (e.g. every 15 minutes).
//!
//! ## Environment Variables
//!
//! - `WATCH_URL`: Page to watch
//! - `TG_BOT_TOKEN`, `TG_CHAT_ID`: Telegram credentials
//! - `S3_BUCKET`: Bucket holding the digest
//! - `S3_KEY`: Digest object key (default: `watcher/last_hash.txt`)
//! - `CONFIG_PATH`: Bundled TOML config (default: `watcher.toml`)
//! - `RUST_LOG`: Log level (e.g., `info`, `debug`)

use lambda_runtime::service_fn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    // Initialize tracing for Lambda
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Watcher Lambda starting...");

    lambda_runtime::run(service_fn(watcher::lambda::handler)).await
}
