// src/services/blocking.rs

//! Blocking signature detection.
//!
//! A response is "blocked" when any registered [`BlockSignal`] matches it.
//! New heuristics are added by implementing the trait and registering it with
//! [`BlockDetector::with_signal`].

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use crate::models::BlockingConfig;

/// The parts of a response the signals look at.
#[derive(Debug, Clone, Copy)]
pub struct ResponseProbe<'a> {
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    /// Raw response body
    pub body: &'a str,
    /// Visible text of the body, as produced by `html_to_text`
    pub text: &'a str,
}

/// One blocking heuristic.
pub trait BlockSignal: Send + Sync {
    /// Name reported in logs and errors.
    fn name(&self) -> &str;

    /// Whether the response looks blocked or challenged.
    fn matches(&self, probe: &ResponseProbe<'_>) -> bool;
}

/// Matches configured status codes (403 by default).
#[derive(Debug, Clone)]
pub struct StatusSignal {
    codes: Vec<u16>,
}

impl StatusSignal {
    pub fn new(codes: Vec<u16>) -> Self {
        Self { codes }
    }
}

impl BlockSignal for StatusSignal {
    fn name(&self) -> &str {
        "status"
    }

    fn matches(&self, probe: &ResponseProbe<'_>) -> bool {
        self.codes.contains(&probe.status.as_u16())
    }
}

/// Matches an edge-protection service named in a response header.
///
/// Plenty of healthy sites sit behind such services, so a successful response
/// never matches.
#[derive(Debug, Clone)]
pub struct HeaderSignal {
    header: String,
    markers: Vec<String>,
}

impl HeaderSignal {
    pub fn new(header: impl Into<String>, markers: Vec<String>) -> Self {
        Self {
            header: header.into(),
            markers: markers.into_iter().map(|m| m.to_lowercase()).collect(),
        }
    }
}

impl BlockSignal for HeaderSignal {
    fn name(&self) -> &str {
        "header"
    }

    fn matches(&self, probe: &ResponseProbe<'_>) -> bool {
        if probe.status.is_success() {
            return false;
        }
        probe
            .headers
            .get_all(self.header.as_str())
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_lowercase)
            .any(|value| self.markers.iter().any(|m| value.contains(m.as_str())))
    }
}

/// Matches challenge page markers in the visible text.
///
/// Script URLs and attributes are not searched, so a page that merely embeds
/// a CAPTCHA widget is not treated as blocked.
#[derive(Debug, Clone)]
pub struct BodySignal {
    markers: Vec<String>,
}

impl BodySignal {
    pub fn new(markers: Vec<String>) -> Self {
        Self {
            markers: markers.into_iter().map(|m| m.to_lowercase()).collect(),
        }
    }
}

impl BlockSignal for BodySignal {
    fn name(&self) -> &str {
        "body"
    }

    fn matches(&self, probe: &ResponseProbe<'_>) -> bool {
        if self.markers.is_empty() {
            return false;
        }
        let text = probe.text.to_lowercase();
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }
}

/// An ordered set of blocking signals.
pub struct BlockDetector {
    signals: Vec<Box<dyn BlockSignal>>,
}

impl BlockDetector {
    /// Detector with no signals; nothing is ever blocked.
    pub fn empty() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    /// Detector with the built-in status, header and body signals.
    pub fn from_config(config: &BlockingConfig) -> Self {
        Self::empty()
            .with_signal(StatusSignal::new(config.status_codes.clone()))
            .with_signal(HeaderSignal::new(
                config.header_name.clone(),
                config.header_markers.clone(),
            ))
            .with_signal(BodySignal::new(config.body_markers.clone()))
    }

    /// Register another signal.
    pub fn with_signal(mut self, signal: impl BlockSignal + 'static) -> Self {
        self.signals.push(Box::new(signal));
        self
    }

    /// Name of the first matching signal, if any.
    pub fn detect(&self, probe: &ResponseProbe<'_>) -> Option<&str> {
        self.signals
            .iter()
            .find(|signal| signal.matches(probe))
            .map(|signal| signal.name())
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl Default for BlockDetector {
    fn default() -> Self {
        Self::from_config(&BlockingConfig::default())
    }
}
