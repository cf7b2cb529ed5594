// src/services/notifier.rs

//! Notification delivery.
//!
//! Delivery never propagates errors: the caller gets a [`Delivery`] report and
//! decides whether the run may persist its digest.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{NotificationMessage, NotifierConfig};
use crate::utils::http::create_notify_client;

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The channel confirmed the message
    Sent,
    /// The channel is not configured; nothing was sent
    Skipped(String),
    /// Sending failed
    Failed(String),
}

impl Delivery {
    /// Only a confirmed send counts.
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent)
    }
}

/// A channel that can deliver notification messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, message: &NotificationMessage) -> Delivery;
}

/// Telegram Bot API `sendMessage` response envelope.
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers messages through a Telegram bot.
pub struct TelegramNotifier {
    client: Client,
    config: NotifierConfig,
}

impl TelegramNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        Ok(Self {
            client: create_notify_client(config.timeout_secs)?,
            config: config.clone(),
        })
    }

    fn endpoint(&self, token: &str) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            token
        )
    }

    /// Messages are only escaped for HTML; any other mode is sent as plain text.
    fn uses_html(&self) -> bool {
        self.config.parse_mode.trim().eq_ignore_ascii_case("html")
    }

    async fn send(&self, token: &str, chat_id: &str, text: &str) -> Result<()> {
        let mut form = vec![
            ("chat_id", chat_id),
            ("text", text),
            ("disable_web_page_preview", "true"),
        ];
        if self.uses_html() {
            form.push(("parse_mode", "HTML"));
        }

        let response = self
            .client
            .post(self.endpoint(token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::notify(format!(
                "Telegram returned HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: TelegramResponse = serde_json::from_str(&body)?;
        if !parsed.ok {
            return Err(AppError::notify(format!(
                "Telegram rejected the message: {}",
                parsed.description.unwrap_or_else(|| "no description".to_string())
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, message: &NotificationMessage) -> Delivery {
        let (Some(token), Some(chat_id)) = (
            self.config.bot_token.as_deref().filter(|t| !t.trim().is_empty()),
            self.config.chat_id.as_deref().filter(|c| !c.trim().is_empty()),
        ) else {
            log::warn!("Telegram is not configured, skipping {} message", message.kind());
            return Delivery::Skipped("missing Telegram bot token or chat id".to_string());
        };

        let text = message.render(self.uses_html());
        match self.send(token, chat_id, &text).await {
            Ok(()) => {
                log::info!("Telegram {} message sent", message.kind());
                Delivery::Sent
            }
            Err(e) => {
                log::warn!("Telegram send failed: {}", e);
                Delivery::Failed(e.to_string())
            }
        }
    }
}

/// Logs messages instead of sending them; used by dry runs.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, message: &NotificationMessage) -> Delivery {
        log::info!("[dry run] would send {} message:\n{}", message.kind(), message.render(false));
        Delivery::Skipped("dry run".to_string())
    }
}
