//! Notification messages and snippet selection.

use chrono::{DateTime, Local};
use unicode_segmentation::UnicodeSegmentation;

/// Appended when a snippet is cut.
pub const TRUNCATION_MARKER: &str = "…";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

/// A message handed to the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationMessage {
    /// The page content changed
    Change {
        url: String,
        snippet: String,
        observed_at: DateTime<Local>,
    },
    /// No strategy could fetch the page
    FetchFailure {
        url: String,
        reason: String,
        observed_at: DateTime<Local>,
    },
    /// The run hit an unexpected error
    Crash {
        reason: String,
        observed_at: DateTime<Local>,
    },
}

impl NotificationMessage {
    pub fn change(url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self::change_at(url, snippet, Local::now())
    }

    /// Change message stamped with the time the page was fetched.
    pub fn change_at(
        url: impl Into<String>,
        snippet: impl Into<String>,
        observed_at: DateTime<Local>,
    ) -> Self {
        Self::Change {
            url: url.into(),
            snippet: snippet.into(),
            observed_at,
        }
    }

    pub fn fetch_failure(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailure {
            url: url.into(),
            reason: reason.into(),
            observed_at: Local::now(),
        }
    }

    pub fn crash(reason: impl Into<String>) -> Self {
        Self::Crash {
            reason: reason.into(),
            observed_at: Local::now(),
        }
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Change { .. } => "change",
            Self::FetchFailure { .. } => "fetch-failure",
            Self::Crash { .. } => "crash",
        }
    }

    /// Render the message text.
    ///
    /// With `html` set, dynamic parts are escaped and headings are bold, which
    /// matches Telegram's `HTML` parse mode.
    pub fn render(&self, html: bool) -> String {
        let esc = |s: &str| if html { escape_html(s) } else { s.to_string() };
        let bold = |s: &str| if html { format!("<b>{s}</b>") } else { s.to_string() };

        match self {
            Self::Change {
                url,
                snippet,
                observed_at,
            } => format!(
                "📢 {}\n{}\n\n{}\n\n🕒 {}",
                bold("Notice page updated"),
                esc(url),
                esc(snippet),
                observed_at.format(TIMESTAMP_FORMAT)
            ),
            Self::FetchFailure {
                url,
                reason,
                observed_at,
            } => format!(
                "⚠️ {}\n{}\n\nReason: {}\n\n🕒 {}",
                bold("Could not fetch the notice page"),
                esc(url),
                esc(reason),
                observed_at.format(TIMESTAMP_FORMAT)
            ),
            Self::Crash {
                reason,
                observed_at,
            } => format!(
                "🔥 {}\n\n{}\n\n🕒 {}",
                bold("Notice watcher crashed"),
                esc(reason),
                observed_at.format(TIMESTAMP_FORMAT)
            ),
        }
    }
}

/// Pick the excerpt shown in a change message.
///
/// The first line longer than `min_line_chars` wins, since the head of a page
/// is usually navigation. Without such a line the whole text is folded onto one
/// line. Either way the result is capped at `max_chars` graphemes.
pub fn select_snippet(text: &str, min_line_chars: usize, max_chars: usize) -> String {
    let substantial = text
        .lines()
        .map(str::trim)
        .find(|line| line.chars().count() > min_line_chars);

    let raw = match substantial {
        Some(line) => line.to_string(),
        None => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };

    truncate_graphemes(&raw, max_chars)
}

fn truncate_graphemes(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{}{}", head.trim_end(), TRUNCATION_MARKER)
    } else {
        head
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
