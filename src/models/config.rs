//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable holding the page to watch.
pub const ENV_WATCH_URL: &str = "WATCH_URL";
/// Environment variable holding the Telegram bot token.
pub const ENV_BOT_TOKEN: &str = "TG_BOT_TOKEN";
/// Environment variable holding the Telegram chat id.
pub const ENV_CHAT_ID: &str = "TG_CHAT_ID";
/// Environment variable overriding the digest file path.
pub const ENV_HASH_FILE: &str = "HASH_FILE";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// The page being watched
    #[serde(default)]
    pub target: TargetConfig,

    /// HTTP fetch behavior
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Blocking signature heuristics
    #[serde(default)]
    pub blocking: BlockingConfig,

    /// Headless browser fallback
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Content plausibility checks
    #[serde(default)]
    pub guard: GuardConfig,

    /// Telegram delivery and message layout
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Where the last notified digest lives
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config file at {:?}, using defaults", path);
            return Self::default();
        }

        Self::load(path).unwrap_or_else(|e| {
            log::warn!("Config load failed from {:?}: {}. Using defaults.", path, e);
            Self::default()
        })
    }

    /// Overlay values from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Overlay values from an environment lookup.
    ///
    /// Empty values are ignored so a blank `.env` entry does not wipe out a
    /// value from the config file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_WATCH_URL) {
            self.target.url = url.trim().to_string();
        }
        if let Some(token) = get(ENV_BOT_TOKEN) {
            self.notifier.bot_token = Some(token.trim().to_string());
        }
        if let Some(chat) = get(ENV_CHAT_ID) {
            self.notifier.chat_id = Some(chat.trim().to_string());
        }
        if let Some(path) = get(ENV_HASH_FILE) {
            self.storage.digest_path = path.trim().to_string();
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.target.url.trim().is_empty() {
            return Err(AppError::validation(format!(
                "target.url is empty (set it in the config file or {ENV_WATCH_URL})"
            )));
        }
        url::Url::parse(&self.target.url)
            .map_err(|e| AppError::validation(format!("target.url is not a valid URL: {e}")))?;

        if self.fetcher.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("fetcher.user_agents is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        if self.fetcher.min_delay_ms > self.fetcher.max_delay_ms {
            return Err(AppError::validation(
                "fetcher.min_delay_ms must be <= fetcher.max_delay_ms",
            ));
        }
        if self.browser.enabled && self.browser.timeout_secs == 0 {
            return Err(AppError::validation("browser.timeout_secs must be > 0"));
        }
        if self.notifier.timeout_secs == 0 {
            return Err(AppError::validation("notifier.timeout_secs must be > 0"));
        }
        // Only HTML escaping is implemented for dynamic message text.
        let mode = self.notifier.parse_mode.trim();
        if !mode.is_empty() && !mode.eq_ignore_ascii_case("html") {
            return Err(AppError::validation(format!(
                "notifier.parse_mode must be \"HTML\" or empty, got {mode:?}"
            )));
        }
        if self.notifier.snippet_max_chars == 0 {
            return Err(AppError::validation("notifier.snippet_max_chars must be > 0"));
        }
        if self.storage.digest_path.trim().is_empty() {
            return Err(AppError::validation("storage.digest_path is empty"));
        }
        Ok(())
    }
}

/// The page being watched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TargetConfig {
    /// URL of the notice page
    #[serde(default)]
    pub url: String,
}

/// HTTP fetch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent pool; one is picked at random per attempt
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Referer pool; one is picked at random per attempt
    #[serde(default = "defaults::referers")]
    pub referers: Vec<String>,

    /// Accept-Language header value
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Lower bound of the random pre-request delay in milliseconds
    #[serde(default = "defaults::min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the random pre-request delay in milliseconds
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Page visited once before the target to pick up cookies
    #[serde(default = "defaults::warm_up_url")]
    pub warm_up_url: Option<String>,

    /// Re-sends on transient HTTP statuses (429, 5xx)
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base backoff between transient retries in milliseconds
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Extra attempts with rotated headers after a blocked response
    #[serde(default = "defaults::block_retries")]
    pub block_retries: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::user_agents(),
            referers: defaults::referers(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
            min_delay_ms: defaults::min_delay(),
            max_delay_ms: defaults::max_delay(),
            warm_up_url: defaults::warm_up_url(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
            block_retries: defaults::block_retries(),
        }
    }
}

/// Heuristics that mark a response as blocked or challenged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingConfig {
    /// Status codes that always mean "blocked"
    #[serde(default = "defaults::block_status_codes")]
    pub status_codes: Vec<u16>,

    /// Response header inspected for edge-protection markers
    #[serde(default = "defaults::block_header_name")]
    pub header_name: String,

    /// Substrings of the header value naming an edge-protection service
    #[serde(default = "defaults::block_header_markers")]
    pub header_markers: Vec<String>,

    /// Case-insensitive substrings of a block or challenge page's visible text
    #[serde(default = "defaults::block_body_markers")]
    pub body_markers: Vec<String>,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            status_codes: defaults::block_status_codes(),
            header_name: defaults::block_header_name(),
            header_markers: defaults::block_header_markers(),
            body_markers: defaults::block_body_markers(),
        }
    }
}

/// Headless browser fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Try the headless browser when the HTTP strategy fails
    #[serde(default = "defaults::browser_enabled")]
    pub enabled: bool,

    /// Navigation and element wait timeout in seconds
    #[serde(default = "defaults::browser_timeout")]
    pub timeout_secs: u64,

    /// Run Chrome with its sandbox (disable inside containers)
    #[serde(default = "defaults::browser_sandbox")]
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::browser_enabled(),
            timeout_secs: defaults::browser_timeout(),
            sandbox: defaults::browser_sandbox(),
        }
    }
}

/// Content plausibility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Normalized text shorter than this is treated as a block or error page
    #[serde(default = "defaults::min_content_length")]
    pub min_content_length: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_content_length: defaults::min_content_length(),
        }
    }
}

/// Telegram delivery and message layout settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Bot token (normally supplied through `TG_BOT_TOKEN`)
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Destination chat (normally supplied through `TG_CHAT_ID`)
    #[serde(default)]
    pub chat_id: Option<String>,

    /// Bot API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Send timeout in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,

    /// Telegram `parse_mode` field
    #[serde(default = "defaults::parse_mode")]
    pub parse_mode: String,

    /// A line must be longer than this to be picked as the snippet
    #[serde(default = "defaults::snippet_min_line_chars")]
    pub snippet_min_line_chars: usize,

    /// Snippet cap before the truncation marker
    #[serde(default = "defaults::snippet_max_chars")]
    pub snippet_max_chars: usize,
}

impl NotifierConfig {
    /// Both credentials present and non-empty.
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.bot_token) && present(&self.chat_id)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: defaults::api_base(),
            timeout_secs: defaults::notify_timeout(),
            parse_mode: defaults::parse_mode(),
            snippet_min_line_chars: defaults::snippet_min_line_chars(),
            snippet_max_chars: defaults::snippet_max_chars(),
        }
    }
}

// Keeps the bot token out of logs.
impl fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("parse_mode", &self.parse_mode)
            .field("snippet_min_line_chars", &self.snippet_min_line_chars)
            .field("snippet_max_chars", &self.snippet_max_chars)
            .finish()
    }
}

/// Digest persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// One-line file holding the last notified digest
    #[serde(default = "defaults::digest_path")]
    pub digest_path: String,

    /// Object key used by the S3 digest store
    #[serde(default = "defaults::s3_key")]
    pub s3_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            digest_path: defaults::digest_path(),
            s3_key: defaults::s3_key(),
        }
    }
}

mod defaults {
    // Fetcher defaults
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".into(),
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".into(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36 Edg/120.0".into(),
        ]
    }
    pub fn referers() -> Vec<String> {
        vec![
            "https://www.google.com/".into(),
            "https://www.bing.com/".into(),
            "https://duckduckgo.com/".into(),
        ]
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.9".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn min_delay() -> u64 {
        1_000
    }
    pub fn max_delay() -> u64 {
        4_000
    }
    pub fn warm_up_url() -> Option<String> {
        Some("https://www.google.com/".into())
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_backoff() -> u64 {
        1_000
    }
    pub fn block_retries() -> u32 {
        1
    }

    // Blocking defaults
    pub fn block_status_codes() -> Vec<u16> {
        vec![403, 429]
    }
    pub fn block_header_name() -> String {
        "server".into()
    }
    pub fn block_header_markers() -> Vec<String> {
        vec![
            "cloudflare".into(),
            "akamai".into(),
            "sucuri".into(),
            "incapsula".into(),
            "ddos-guard".into(),
        ]
    }
    pub fn block_body_markers() -> Vec<String> {
        vec![
            "attention required".into(),
            "checking your browser".into(),
            "verify you are human".into(),
            "access denied".into(),
            "are you a robot".into(),
            "just a moment...".into(),
        ]
    }

    // Browser defaults
    pub fn browser_enabled() -> bool {
        true
    }
    pub fn browser_timeout() -> u64 {
        45
    }
    pub fn browser_sandbox() -> bool {
        false
    }

    // Guard defaults
    pub fn min_content_length() -> usize {
        100
    }

    // Notifier defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn notify_timeout() -> u64 {
        10
    }
    pub fn parse_mode() -> String {
        "HTML".into()
    }
    pub fn snippet_min_line_chars() -> usize {
        50
    }
    pub fn snippet_max_chars() -> usize {
        500
    }

    // Storage defaults
    pub fn digest_path() -> String {
        "last_hash.txt".into()
    }
    pub fn s3_key() -> String {
        "watcher/last_hash.txt".into()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.target.url = "https://example.com/notices".to_string();
        config
    }

    #[test]
    fn validate_restricts_parse_mode() {
        let mut config = valid_config();
        config.notifier.parse_mode = "MarkdownV2".to_string();
        assert!(config.validate().is_err());

        config.notifier.parse_mode = "html".to_string();
        assert!(config.validate().is_ok());

        config.notifier.parse_mode = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_requires_target_url() {
        assert!(Config::default().validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unparseable_url() {
        let mut config = valid_config();
        config.target.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delay_range() {
        let mut config = valid_config();
        config.fetcher.min_delay_ms = 5_000;
        config.fetcher.max_delay_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_user_agent_pool() {
        let mut config = valid_config();
        config.fetcher.user_agents = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn apply_env_overrides_secrets_and_paths() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_WATCH_URL, "https://example.org/board"),
            (ENV_BOT_TOKEN, "123:abc"),
            (ENV_CHAT_ID, " 42 "),
            (ENV_HASH_FILE, ""),
        ]);

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.target.url, "https://example.org/board");
        assert_eq!(config.notifier.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.notifier.chat_id.as_deref(), Some("42"));
        // Blank values leave the default in place
        assert_eq!(config.storage.digest_path, "last_hash.txt");
        assert!(config.notifier.is_configured());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [target]
            url = "https://example.com"

            [guard]
            min_content_length = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.guard.min_content_length, 250);
        assert_eq!(config.notifier.snippet_min_line_chars, 50);
        assert_eq!(config.blocking.status_codes, vec![403, 429]);
    }

    #[test]
    fn debug_output_redacts_token() {
        let mut config = Config::default();
        config.notifier.bot_token = Some("super-secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
    }
}
