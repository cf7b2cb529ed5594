// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains the data structures passed between the pipeline
//! stages, plus the configuration tree.

mod config;
mod message;
mod snapshot;

// Re-export all public types
pub use config::{
    BlockingConfig, BrowserConfig, Config, ENV_BOT_TOKEN, ENV_CHAT_ID, ENV_HASH_FILE,
    ENV_WATCH_URL, FetcherConfig, GuardConfig, NotifierConfig, StorageConfig, TargetConfig,
};
pub use message::{NotificationMessage, TRUNCATION_MARKER, select_snippet};
pub use snapshot::{ContentDigest, PageSnapshot};
