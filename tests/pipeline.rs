use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use watcher::error::{AppError, Result};
use watcher::models::{Config, ContentDigest, NotificationMessage, PageSnapshot};
use watcher::pipeline::{RunOutcome, Watcher};
use watcher::services::{Delivery, FetchStrategy, Fetcher, Notifier, html_to_text};
use watcher::storage::{DigestStore, LocalDigestStore};

const URL: &str = "https://example.com/notices";

/// Strategy whose page can be swapped between runs.
#[derive(Clone)]
struct FakePage {
    page: Arc<Mutex<std::result::Result<String, String>>>,
}

impl FakePage {
    fn serving(text: &str) -> Self {
        Self {
            page: Arc::new(Mutex::new(Ok(text.to_string()))),
        }
    }

    fn failing(reason: &str) -> Self {
        Self {
            page: Arc::new(Mutex::new(Err(reason.to_string()))),
        }
    }

    fn set(&self, text: &str) {
        *self.page.lock().unwrap() = Ok(text.to_string());
    }
}

#[async_trait]
impl FetchStrategy for FakePage {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch(&self, _url: &str) -> Result<PageSnapshot> {
        match &*self.page.lock().unwrap() {
            Ok(text) => Ok(PageSnapshot::new(text.clone(), "fake")),
            Err(reason) => Err(AppError::fetch("fake", reason)),
        }
    }
}

#[derive(Clone, Default)]
struct MemoryStore {
    digest: Arc<Mutex<ContentDigest>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    fn with(digest: ContentDigest) -> Self {
        Self {
            digest: Arc::new(Mutex::new(digest)),
            saves: Arc::default(),
        }
    }

    fn current(&self) -> ContentDigest {
        self.digest.lock().unwrap().clone()
    }

    fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl DigestStore for MemoryStore {
    async fn load(&self) -> Result<ContentDigest> {
        Ok(self.current())
    }

    async fn save(&self, digest: &ContentDigest) -> Result<()> {
        *self.digest.lock().unwrap() = digest.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.digest.lock().unwrap() = ContentDigest::empty();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Store whose reads always fail.
struct BrokenStore;

#[async_trait]
impl DigestStore for BrokenStore {
    async fn load(&self) -> Result<ContentDigest> {
        Err(AppError::storage("disk on fire"))
    }

    async fn save(&self, _digest: &ContentDigest) -> Result<()> {
        Err(AppError::storage("disk on fire"))
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn location(&self) -> String {
        "broken".to_string()
    }
}

#[derive(Clone)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
    result: Arc<Mutex<Delivery>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            sent: Arc::default(),
            result: Arc::new(Mutex::new(Delivery::Sent)),
        }
    }

    fn fail_with(&self, reason: &str) {
        *self.result.lock().unwrap() = Delivery::Failed(reason.to_string());
    }

    fn succeed(&self) {
        *self.result.lock().unwrap() = Delivery::Sent;
    }

    fn messages(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, message: &NotificationMessage) -> Delivery {
        self.sent.lock().unwrap().push(message.clone());
        self.result.lock().unwrap().clone()
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.target.url = URL.to_string();
    config
}

fn build_watcher(
    page: &FakePage,
    store: impl DigestStore + 'static,
    notifier: &RecordingNotifier,
) -> Watcher {
    let config = config();
    let fetcher = Fetcher::new(config.guard.min_content_length).with_strategy(page.clone());
    Watcher::new(&config, fetcher, Box::new(store), Box::new(notifier.clone()))
}

fn notice_page(headline: &str) -> String {
    format!(
        "{headline}\n{}",
        "Applications must be submitted through the student portal before the deadline."
    )
}

#[tokio::test]
async fn first_run_notifies_and_persists() {
    let text = notice_page("Notice: deadline is March 1");
    assert!(text.chars().count() > 100);

    let page = FakePage::serving(&text);
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::new();

    let outcome = build_watcher(&page, store.clone(), &notifier).run_once().await.unwrap();

    let expected = ContentDigest::of_text(&text);
    assert_eq!(
        outcome,
        RunOutcome::Notified {
            digest: expected.clone(),
            first_run: true
        }
    );
    assert_eq!(store.current(), expected);
    assert_eq!(notifier.count(), 1);

    match &notifier.messages()[0] {
        NotificationMessage::Change { url, snippet, .. } => {
            assert_eq!(url, URL);
            assert_eq!(
                snippet,
                "Applications must be submitted through the student portal before the deadline."
            );
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn unchanged_content_is_silent() {
    let text = notice_page("Notice: deadline is March 1");
    let page = FakePage::serving(&text);
    let store = MemoryStore::with(ContentDigest::of_text(&text));
    let notifier = RecordingNotifier::new();

    let outcome = build_watcher(&page, store.clone(), &notifier).run_once().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Unchanged { .. }));
    assert_eq!(notifier.count(), 0);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn two_runs_on_same_page_notify_once() {
    let page = FakePage::serving(&notice_page("Notice: deadline is March 1"));
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::new();
    let watcher = build_watcher(&page, store.clone(), &notifier);

    let first = watcher.run_once().await.unwrap();
    let second = watcher.run_once().await.unwrap();

    assert!(first.persisted());
    assert!(matches!(second, RunOutcome::Unchanged { .. }));
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn failed_delivery_keeps_digest_and_retries_next_run() {
    let old = notice_page("Notice: deadline is March 1");
    let new = notice_page("Notice: deadline moved to March 8");
    let page = FakePage::serving(&old);
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::new();
    let watcher = build_watcher(&page, store.clone(), &notifier);

    watcher.run_once().await.unwrap();
    let before = store.current();

    page.set(&new);
    notifier.fail_with("connection reset");
    let failed = watcher.run_once().await.unwrap();

    assert!(matches!(
        failed,
        RunOutcome::NotDelivered {
            delivery: Delivery::Failed(_),
            ..
        }
    ));
    assert!(!failed.persisted());
    assert_eq!(store.current(), before);

    notifier.succeed();
    let retried = watcher.run_once().await.unwrap();

    assert_eq!(
        retried,
        RunOutcome::Notified {
            digest: ContentDigest::of_text(&new),
            first_run: false
        }
    );
    assert_eq!(notifier.count(), 3);
    assert_eq!(store.current(), ContentDigest::of_text(&new));
}

#[tokio::test]
async fn skipped_delivery_is_not_success() {
    let page = FakePage::serving(&notice_page("Notice: deadline is March 1"));
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::new();
    *notifier.result.lock().unwrap() = Delivery::Skipped("not configured".to_string());

    let outcome = build_watcher(&page, store.clone(), &notifier).run_once().await.unwrap();

    assert!(matches!(outcome, RunOutcome::NotDelivered { .. }));
    assert!(store.current().is_empty());
}

#[tokio::test]
async fn short_content_aborts_before_hashing() {
    let short = "x".repeat(40);
    let page = FakePage::serving(&short);
    let stored = ContentDigest::of_text("previous page");
    let store = MemoryStore::with(stored.clone());
    let notifier = RecordingNotifier::new();

    let outcome = build_watcher(&page, store.clone(), &notifier).run_once().await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Implausible {
            length: 40,
            min_length: 100
        }
    );
    assert_eq!(outcome.digest(), None);
    assert_eq!(store.current(), stored);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn fetch_failure_sends_alert_without_persisting() {
    let page = FakePage::failing("HTTP 403");
    let stored = ContentDigest::of_text("previous page");
    let store = MemoryStore::with(stored.clone());
    let notifier = RecordingNotifier::new();

    let outcome = build_watcher(&page, store.clone(), &notifier).run_once().await.unwrap();

    match outcome {
        RunOutcome::FetchFailed { reason, alert } => {
            assert!(reason.contains("HTTP 403"));
            assert_eq!(alert, Delivery::Sent);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(matches!(
        notifier.messages()[0],
        NotificationMessage::FetchFailure { .. }
    ));
    assert_eq!(store.current(), stored);
}

#[tokio::test]
async fn store_error_is_reported_as_crash() {
    let page = FakePage::serving(&notice_page("Notice: deadline is March 1"));
    let notifier = RecordingNotifier::new();

    let report = build_watcher(&page, BrokenStore, &notifier).check().await;

    assert!(!report.is_success());
    assert!(report.outcome.is_none());
    assert!(report.error.unwrap().contains("disk on fire"));
    assert!(matches!(
        notifier.messages()[0],
        NotificationMessage::Crash { .. }
    ));
}

/// Strategy that stamps its snapshot with a fixed fetch time.
struct FetchedAt(chrono::DateTime<chrono::Utc>);

#[async_trait]
impl FetchStrategy for FetchedAt {
    fn name(&self) -> &str {
        "fixed-time"
    }

    async fn fetch(&self, _url: &str) -> Result<PageSnapshot> {
        let mut snapshot =
            PageSnapshot::new(notice_page("Notice: deadline is March 1"), "fixed-time");
        snapshot.fetched_at = self.0;
        Ok(snapshot)
    }
}

#[tokio::test]
async fn change_message_carries_fetch_time() {
    use chrono::TimeZone;

    let fetched_at = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    let config = config();
    let fetcher =
        Fetcher::new(config.guard.min_content_length).with_strategy(FetchedAt(fetched_at));
    let notifier = RecordingNotifier::new();
    let watcher = Watcher::new(
        &config,
        fetcher,
        Box::new(MemoryStore::default()),
        Box::new(notifier.clone()),
    );

    watcher.run_once().await.unwrap();

    match &notifier.messages()[0] {
        NotificationMessage::Change { observed_at, .. } => {
            assert_eq!(observed_at.with_timezone(&chrono::Utc), fetched_at);
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn corrupt_stored_digest_is_treated_as_changed() {
    let text = notice_page("Notice: deadline is March 1");
    let page = FakePage::serving(&text);
    let store = MemoryStore::with(ContentDigest::from_stored("abcdefghijké"));
    let notifier = RecordingNotifier::new();

    let report = build_watcher(&page, store.clone(), &notifier).check().await;

    assert!(report.is_success());
    assert_eq!(
        report.outcome,
        Some(RunOutcome::Notified {
            digest: ContentDigest::of_text(&text),
            first_run: false
        })
    );
    assert_eq!(store.current(), ContentDigest::of_text(&text));
}

#[tokio::test]
async fn markup_churn_does_not_count_as_change() {
    let body = "<p>Notice: deadline is March 1</p><p>Applications must be submitted through the student portal before the deadline.</p>";
    let before = html_to_text(&format!(
        "<html><body><nav>Home</nav><main>{body}</main><script>var t = 1;</script></body></html>"
    ));
    let after = html_to_text(&format!(
        "<html><body>\n\n<nav>Home | Login</nav>\n<main>\n\n{body}\n\n</main><script>var t = 2;</script><footer>2026</footer></body></html>"
    ));

    let page = FakePage::serving(&before);
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::new();
    let watcher = build_watcher(&page, store.clone(), &notifier);

    watcher.run_once().await.unwrap();
    page.set(&after);
    let outcome = watcher.run_once().await.unwrap();

    assert!(matches!(outcome, RunOutcome::Unchanged { .. }));
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn local_store_round_trip_through_pipeline() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("last_hash.txt");
    let text = notice_page("Notice: deadline is March 1");
    let page = FakePage::serving(&text);
    let notifier = RecordingNotifier::new();

    build_watcher(&page, LocalDigestStore::new(&path), &notifier)
        .run_once()
        .await
        .unwrap();

    let stored = std::fs::read_to_string(&path).unwrap();
    assert_eq!(stored, ContentDigest::of_text(&text).as_str());

    let outcome = build_watcher(&page, LocalDigestStore::new(&path), &notifier)
        .run_once()
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Unchanged { .. }));
}
