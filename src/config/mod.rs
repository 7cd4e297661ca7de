//! Configuration management.
//!
//! Configuration is read from a TOML file (default: `config/watchpost.toml`).
//! If the file doesn't exist, a commented default template is created so a
//! deployment only has to fill in credentials and webhook URLs. Every run of
//! the pipeline consumes an immutable snapshot; [`ConfigWatcher`] swaps the
//! snapshot between runs when the file changes on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::app::{Result, WatchpostError};
use crate::browser::humanize::HumanizeConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/watchpost.toml";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub forum: ForumConfig,
    pub site: SiteConfig,
    pub browser: BrowserOptions,
    pub webhook: WebhookConfig,
    pub schedule: ScheduleConfig,
    pub humanize: HumanizeConfig,
    pub storage: StorageConfig,
}

/// Forum account credentials. Empty values make the pipeline skip its run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForumConfig {
    pub username: String,
    pub password: String,
}

impl ForumConfig {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// The monitored site: one fixed listing endpoint and the CSS selectors
/// describing its structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme+host used to absolutize relative article links.
    pub origin: String,
    /// The content listing page, also the login entry point.
    pub listing_url: String,
    /// Newest non-pinned rows to consider per run.
    pub max_items: usize,
    pub selectors: Selectors,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: "https://bbs.robomaster.com".to_string(),
            listing_url: "https://bbs.robomaster.com/article".to_string(),
            max_items: 10,
            selectors: Selectors::default(),
        }
    }
}

impl SiteConfig {
    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin)
            .map_err(|e| WatchpostError::Config(format!("invalid site.origin `{}`: {}", self.origin, e)))
    }
}

/// CSS selectors for the login flow and the listing structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// The login affordance in the page header.
    pub login_button: String,
    /// Tab switching the dialog to password-based login.
    pub password_tab: String,
    pub username_input: String,
    pub password_input: String,
    pub submit_button: String,
    /// Element only rendered for an authenticated session (the avatar).
    pub logged_in_marker: String,
    /// One listing row.
    pub listing_item: String,
    pub item_title: String,
    /// Marker distinguishing pinned/official rows, matched inside a row.
    /// Fragile external contract: if the site drops the marker element,
    /// every row classifies as non-pinned (and vice versa).
    pub pinned_marker: String,
    pub item_author: String,
    pub item_category: String,
    pub item_time: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            login_button: ".loginItem".to_string(),
            password_tab: r#"a[data-usagetag="password_login_tab"]"#.to_string(),
            username_input: r#"input[name="username"]"#.to_string(),
            password_input: r#"input[type="password"]"#.to_string(),
            submit_button: r#"button[data-usagetag="login_button"]"#.to_string(),
            logged_in_marker: "img.user-header.g-avatar".to_string(),
            listing_item: "a.articleItem".to_string(),
            item_title: "div.articleItem__title".to_string(),
            pinned_marker: "div.articleItem__titles svg".to_string(),
            item_author: ".articleItem__info-author".to_string(),
            item_category: ".articleItem__category".to_string(),
            item_time: ".articleItem__info-time".to_string(),
        }
    }
}

/// Chromium launch options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub no_sandbox: bool,
    pub disable_gpu: bool,
    pub disable_dev_shm_usage: bool,
    pub user_agent: Option<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: false,
            disable_gpu: false,
            disable_dev_shm_usage: false,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

/// Webhook endpoints. Unset endpoints turn deliveries into logged no-ops.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub error_url: Option<String>,
}

impl WebhookConfig {
    /// The new-article endpoint. An empty string counts as unset, so the
    /// untouched template behaves like a missing key.
    pub fn article_endpoint(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }

    /// The error-report endpoint, falling back to the article endpoint.
    pub fn error_endpoint(&self) -> Option<&str> {
        non_empty(self.error_url.as_deref()).or_else(|| self.article_endpoint())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Pipeline cadence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between pipeline runs in watch mode.
    pub check_interval_secs: u64,
    /// Fixed pause between login and extraction.
    pub settle_secs: u64,
    /// Randomized pause between webhook deliveries, to respect rate limits.
    pub notify_delay_min_ms: u64,
    pub notify_delay_max_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            settle_secs: 2,
            notify_delay_min_ms: 1000,
            notify_delay_max_ms: 3000,
        }
    }
}

impl ScheduleConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

/// Local artifact locations, relative to the working directory by default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub cookie_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/articles.db"),
            cookie_file: PathBuf::from("config/cookies.json"),
        }
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file is created with a commented default template and the
    /// defaults are returned. Invalid TOML is an error. Missing fields fall
    /// back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::create_default_config(path)?;
            info!("Created default configuration at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            WatchpostError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            WatchpostError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    fn create_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                WatchpostError::Config(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| {
            WatchpostError::Config(format!("failed to create {}: {}", path.display(), e))
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| {
                WatchpostError::Config(format!("failed to write {}: {}", path.display(), e))
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# watchpost configuration
#
# Fill in [forum] credentials and at least [webhook] url; everything else
# has working defaults. Selector defaults match the current forum markup
# and only need touching when the site changes.

[forum]
username = ""
password = ""

[webhook]
# New-article notifications (text message webhook).
url = ""
# Optional separate endpoint for pipeline error reports.
error_url = ""

[schedule]
# Seconds between checks in watch mode. Cookie reuse keeps the cost of a
# run low, but stay >= 60 to remain polite.
check_interval_secs = 60

[browser]
headless = true
no_sandbox = false
disable_gpu = false
disable_dev_shm_usage = false

[storage]
db_path = "data/articles.db"
cookie_file = "config/cookies.json"
"##
        .to_string()
    }
}

/// Re-reads the config file between runs so every run gets an immutable
/// snapshot. A change is detected via the file's mtime; a snapshot is never
/// replaced while a run borrows it.
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    current: Arc<Config>,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf) -> Result<Self> {
        let config = Config::load(&path)?;
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
        Ok(Self {
            path,
            modified,
            current: Arc::new(config),
        })
    }

    pub fn current(&self) -> Arc<Config> {
        self.current.clone()
    }

    /// Return the freshest snapshot, re-reading the file if it changed.
    /// A file that no longer parses keeps the previous snapshot.
    pub fn poll(&mut self) -> Arc<Config> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();

        if modified.is_some() && modified != self.modified {
            match Config::load(&self.path) {
                Ok(config) => {
                    info!("Configuration reloaded from {}", self.path.display());
                    self.current = Arc::new(config);
                    self.modified = modified;
                }
                Err(e) => {
                    warn!("Configuration reload failed, keeping previous: {}", e);
                }
            }
        }

        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert!(config.browser.headless);
        assert_eq!(config.site.max_items, 10);
        assert_eq!(config.schedule.check_interval_secs, 60);
        assert_eq!(config.schedule.notify_delay_min_ms, 1000);
        assert_eq!(config.schedule.notify_delay_max_ms, 3000);
        assert!(!config.forum.has_credentials());
        assert_eq!(config.site.selectors.listing_item, "a.articleItem");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [forum]
            username = "user"
            password = "pass"
            "#,
        )
        .unwrap();

        assert!(config.forum.has_credentials());
        assert_eq!(config.site.max_items, 10);
        assert!(config.webhook.url.is_none());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchpost.toml");
        fs::write(&path, "this is not toml [").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_missing_file_creates_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/watchpost.toml");

        let config = Config::load(&path).unwrap();
        assert!(path.exists());
        assert!(!config.forum.has_credentials());

        // The template itself must parse back.
        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.site.max_items, 10);
    }

    #[test]
    fn test_webhook_endpoints_treat_empty_as_unset() {
        let webhook: WebhookConfig = toml::from_str("url = \"\"\nerror_url = \"\"").unwrap();
        assert_eq!(webhook.article_endpoint(), None);
        assert_eq!(webhook.error_endpoint(), None);

        let configured = WebhookConfig {
            url: Some("https://hooks.example.com/main".to_string()),
            error_url: None,
        };
        assert_eq!(
            configured.error_endpoint(),
            Some("https://hooks.example.com/main")
        );

        let dedicated = WebhookConfig {
            url: Some("https://hooks.example.com/main".to_string()),
            error_url: Some("https://hooks.example.com/errors".to_string()),
        };
        assert_eq!(
            dedicated.error_endpoint(),
            Some("https://hooks.example.com/errors")
        );
    }

    #[test]
    fn test_origin_url_validation() {
        let config = Config::default();
        assert!(config.site.origin_url().is_ok());

        let mut bad = Config::default();
        bad.site.origin = "not a url".into();
        assert!(bad.site.origin_url().is_err());
    }

    #[test]
    fn test_watcher_reloads_on_mtime_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchpost.toml");
        fs::write(&path, "[site]\nmax_items = 5\n").unwrap();

        let mut watcher = ConfigWatcher::new(path.clone()).unwrap();
        assert_eq!(watcher.current().site.max_items, 5);

        fs::write(&path, "[site]\nmax_items = 7\n").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert_eq!(watcher.poll().site.max_items, 7);
    }

    #[test]
    fn test_watcher_keeps_snapshot_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchpost.toml");
        fs::write(&path, "[site]\nmax_items = 5\n").unwrap();

        let mut watcher = ConfigWatcher::new(path.clone()).unwrap();

        fs::write(&path, "broken [").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert_eq!(watcher.poll().site.max_items, 5);
    }
}
