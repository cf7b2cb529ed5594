// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The response carried a blocking signature
    #[error("Blocked by {signal} (HTTP {status})")]
    Blocked { signal: String, status: u16 },

    /// A single fetch strategy failed
    #[error("Fetch error ({strategy}): {message}")]
    Fetch { strategy: String, message: String },

    /// Every fetch strategy failed
    #[error("All fetch strategies failed: {0}")]
    FetchExhausted(String),

    /// Notification channel error
    #[error("Notification error: {0}")]
    Notify(String),

    /// Digest store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Headless browser error
    #[error("Browser error: {0}")]
    Browser(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error tagged with the strategy that produced it.
    pub fn fetch(strategy: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            strategy: strategy.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create a browser error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }
}
