//! End-to-end monitoring pipeline.
//!
//! One run walks the whole chain: launch a browser, establish a session,
//! snapshot the listing, shut the browser down, detect unseen articles and
//! deliver notifications. Runs are isolated from the scheduler: a panic
//! anywhere inside a run surfaces as [`RunOutcome::Failed`] instead of
//! tearing down the process.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::app::{Result, WatchpostError};
use crate::browser::{humanize, ChromeDriver};
use crate::config::Config;
use crate::detect::detect_new;
use crate::domain::{Article, ListingSnapshot};
use crate::extractor::ListingExtractor;
use crate::notifier::Notifier;
use crate::session::{CookieStore, SessionManager};
use crate::store::{SqliteStore, Store};

/// Upper bound on the whole session establishment, cached or interactive.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Counters from one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Rows in the extracted listing snapshot.
    pub extracted: usize,
    /// Articles seen for the first time.
    pub new_articles: usize,
    /// Notifications the webhook accepted.
    pub notified: usize,
}

/// How a pipeline run ended.
///
/// `Failed` covers panics as well as errors; the scheduler logs the
/// outcome and waits for the next tick either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunStats),
    /// The run never started, e.g. credentials are missing.
    Skipped(String),
    Failed(String),
}

/// Run the pipeline once, catching panics.
///
/// The work happens in a spawned task so a panic is contained; failures
/// are additionally reported to the error webhook, fire-and-forget.
pub async fn run_once(
    config: Arc<Config>,
    store: Arc<SqliteStore>,
    notifier: Arc<dyn Notifier>,
) -> RunOutcome {
    if !config.forum.has_credentials() {
        let reason = "forum credentials not configured".to_string();
        warn!("Skipping run: {}", reason);
        return RunOutcome::Skipped(reason);
    }

    let task_config = config.clone();
    let task_store = store.clone();
    let task_notifier = notifier.clone();
    let handle = tokio::spawn(async move {
        execute(&task_config, task_store.as_ref(), task_notifier.as_ref()).await
    });

    let outcome = match handle.await {
        Ok(Ok(stats)) => RunOutcome::Completed(stats),
        Ok(Err(e)) => RunOutcome::Failed(e.to_string()),
        Err(join_err) => RunOutcome::Failed(describe_panic(join_err)),
    };

    if let RunOutcome::Failed(ref message) = outcome {
        error!("Run failed: {}", message);
        let message = message.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_error(&message).await {
                warn!("Failed to report error to webhook: {}", e);
            }
        });
    }

    outcome
}

/// One pipeline run against an immutable config snapshot.
///
/// The browser's lifetime is contained here: whatever the browser-bound
/// phase does, Chromium is shut down before detection and delivery run.
async fn execute(config: &Config, store: &SqliteStore, notifier: &dyn Notifier) -> Result<RunStats> {
    let origin = config.site.origin_url()?;

    info!("Starting run against {}", config.site.listing_url);
    let driver = ChromeDriver::launch(&config.browser).await?;

    let observed = observe_listing(&driver, config).await;
    shutdown_browser(driver).await;
    let snapshot = observed?;

    let fresh = detect_new(store, &origin, &snapshot);
    info!("{} of {} listing rows are new", fresh.len(), snapshot.len());

    let notified = deliver_notifications(
        store,
        notifier,
        &fresh,
        config.schedule.notify_delay_min_ms,
        config.schedule.notify_delay_max_ms,
    )
    .await;

    Ok(RunStats {
        extracted: snapshot.len(),
        new_articles: fresh.len(),
        notified,
    })
}

/// The browser-bound phase: establish a session, then snapshot the listing.
async fn observe_listing(driver: &ChromeDriver, config: &Config) -> Result<ListingSnapshot> {
    let cookie_store = CookieStore::new(config.storage.cookie_file.clone());
    let mut session = SessionManager::new(
        driver,
        cookie_store,
        &config.site,
        &config.forum,
        &config.humanize,
    );

    let method = tokio::time::timeout(LOGIN_TIMEOUT, session.establish())
        .await
        .map_err(|_| {
            WatchpostError::Browser(format!("Session establishment exceeded {:?}", LOGIN_TIMEOUT))
        })??;
    info!("Session established via {:?}", method);

    // Give client-side rendering a moment before reading the listing
    tokio::time::sleep(config.schedule.settle()).await;

    let extractor = ListingExtractor::new(driver, &config.site, &config.humanize);
    extractor.extract().await
}

async fn shutdown_browser(driver: ChromeDriver) {
    if let Err(e) = driver.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }
}

/// Deliver one notification per article, pacing consecutive sends with a
/// random delay. An article is marked notified only after the webhook
/// accepted its message, so an interrupted run re-sends instead of
/// silently dropping.
pub async fn deliver_notifications<S: Store>(
    store: &S,
    notifier: &dyn Notifier,
    articles: &[Article],
    delay_min_ms: u64,
    delay_max_ms: u64,
) -> usize {
    let mut delivered = 0;

    for (i, article) in articles.iter().enumerate() {
        if i > 0 {
            humanize::pause(delay_min_ms, delay_max_ms).await;
        }

        match notifier.send(article.display_title(), &article.url).await {
            Ok(()) => {
                delivered += 1;
                if let Err(e) = store.mark_notified(article.id) {
                    warn!("Could not mark {} as notified: {}", article.url, e);
                }
            }
            Err(e) => warn!("Failed to notify about {}: {}", article.url, e),
        }
    }

    delivered
}

fn describe_panic(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        match err.into_panic().downcast::<String>() {
            Ok(message) => format!("Run panicked: {}", message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => format!("Run panicked: {}", message),
                Err(_) => "Run panicked".to_string(),
            },
        }
    } else {
        "Run was cancelled".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
        /// URLs containing this substring fail to deliver.
        reject: Option<String>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, _title: &str, url: &str) -> Result<()> {
            if let Some(ref reject) = self.reject {
                if url.contains(reject.as_str()) {
                    return Err(WatchpostError::Browser("delivery refused".to_string()));
                }
            }
            self.sent.lock().unwrap().push(url.to_string());
            Ok(())
        }

        async fn send_error(&self, message: &str) -> Result<()> {
            self.errors.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn seeded_store(urls: &[&str]) -> (SqliteStore, Vec<Article>) {
        let store = SqliteStore::in_memory().unwrap();
        let mut articles = Vec::new();
        for url in urls {
            let mut article = Article::new(
                format!("Post {}", url),
                url.to_string(),
                String::new(),
                String::new(),
                String::new(),
            );
            article.id = store.save_article(&article).unwrap();
            articles.push(article);
        }
        (store, articles)
    }

    #[tokio::test]
    async fn test_run_once_skips_without_credentials() {
        let config = Arc::new(Config::default());
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());

        let outcome = run_once(config, store, notifier).await;
        assert!(matches!(outcome, RunOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn test_deliver_marks_after_send() {
        let (store, articles) = seeded_store(&[
            "https://bbs.robomaster.com/article/1",
            "https://bbs.robomaster.com/article/2",
        ]);
        let notifier = RecordingNotifier::default();

        let delivered = deliver_notifications(&store, &notifier, &articles, 0, 0).await;
        assert_eq!(delivered, 2);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
        assert!(store.unnotified_articles().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delivery_stays_pending() {
        let (store, articles) = seeded_store(&[
            "https://bbs.robomaster.com/article/1",
            "https://bbs.robomaster.com/article/2",
            "https://bbs.robomaster.com/article/3",
        ]);
        let notifier = RecordingNotifier {
            reject: Some("article/2".to_string()),
            ..Default::default()
        };

        let delivered = deliver_notifications(&store, &notifier, &articles, 0, 0).await;
        assert_eq!(delivered, 2);

        let pending = store.unnotified_articles().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].url, "https://bbs.robomaster.com/article/2");
    }

    #[tokio::test]
    async fn test_describe_panic_with_formatted_message() {
        let handle = tokio::spawn(async { panic!("boom at row {}", 7) });
        let err = handle.await.unwrap_err();
        let message = describe_panic(err);
        assert!(message.contains("boom at row 7"), "got: {}", message);
    }

    #[tokio::test]
    async fn test_describe_panic_with_static_message() {
        let handle = tokio::spawn(async { panic!("plain panic") });
        let err = handle.await.unwrap_err();
        assert!(describe_panic(err).contains("plain panic"));
    }
}
