//! Session establishment for the forum.
//!
//! A run needs an authenticated browser session before it can read the
//! listing. The cheap path replays cookies saved by a previous login and
//! probes for the logged-in marker; only when that fails does the manager
//! walk the interactive login flow with humanized pacing.
//!
//! # Architecture
//!
//! ```text
//! Init ── cookies ──▶ CookiesAttempted ── probe ──▶ SessionVerified
//!    │                        │
//!    │ (no usable cookies)    │ (marker absent)
//!    ▼                        ▼
//!    SessionUnverified ──▶ CredentialLoginInProgress ──▶ LoginSucceeded
//!                                                   └──▶ LoginFailed
//! ```
//!
//! Interactive login is a fixed sequence of named steps, each with its own
//! timeout, so a failure report names the exact step that broke instead of
//! a generic "login failed".

mod cookies;

pub use cookies::{CookieError, CookieStore};

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::{Result, WatchpostError};
use crate::browser::{simulate_browsing, BrowserDriver, HumanizeConfig};
use crate::config::{ForumConfig, SiteConfig};

/// How long the cached-session probe waits for the logged-in marker.
/// Deliberately short: an expired session should cost seconds, not the
/// full login budget.
const SESSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// The interactive login flow, in order, with per-step timeouts in seconds.
const INTERACTIVE_STEPS: &[(LoginStep, u64)] = &[
    (LoginStep::Navigate, 30),
    (LoginStep::OpenLoginDialog, 10),
    (LoginStep::SelectPasswordLogin, 10),
    (LoginStep::EnterUsername, 10),
    (LoginStep::EnterPassword, 10),
    (LoginStep::Submit, 10),
    (LoginStep::ConfirmListing, 20),
    (LoginStep::ConfirmAvatar, 15),
];

/// Observable states of session establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    /// Saved cookies were installed and the listing page loaded.
    CookiesAttempted,
    /// The logged-in marker appeared; the cached session is live.
    SessionVerified,
    /// No usable cookies, or the server rejected them.
    SessionUnverified,
    CredentialLoginInProgress,
    LoginSucceeded,
    LoginFailed,
}

/// Named steps of the interactive login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Navigate,
    OpenLoginDialog,
    SelectPasswordLogin,
    EnterUsername,
    EnterPassword,
    Submit,
    ConfirmListing,
    ConfirmAvatar,
}

impl fmt::Display for LoginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginStep::Navigate => "navigate",
            LoginStep::OpenLoginDialog => "open_login_dialog",
            LoginStep::SelectPasswordLogin => "select_password_login",
            LoginStep::EnterUsername => "enter_username",
            LoginStep::EnterPassword => "enter_password",
            LoginStep::Submit => "submit",
            LoginStep::ConfirmListing => "confirm_listing",
            LoginStep::ConfirmAvatar => "confirm_avatar",
        };
        f.write_str(name)
    }
}

/// How the session was ultimately established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    /// Restored from saved cookies, no credentials touched.
    CachedSession,
    /// Full interactive credential login.
    Credentials,
}

/// Drives session establishment on a [`BrowserDriver`].
pub struct SessionManager<'a> {
    driver: &'a dyn BrowserDriver,
    cookie_store: CookieStore,
    site: &'a SiteConfig,
    forum: &'a ForumConfig,
    humanize: &'a HumanizeConfig,
    state: SessionState,
}

impl<'a> SessionManager<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        cookie_store: CookieStore,
        site: &'a SiteConfig,
        forum: &'a ForumConfig,
        humanize: &'a HumanizeConfig,
    ) -> Self {
        Self {
            driver,
            cookie_store,
            site,
            forum,
            humanize,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Establish an authenticated session, preferring saved cookies.
    ///
    /// Any failure on the cached path degrades to the interactive login;
    /// only the interactive login itself can fail the run. On either
    /// success path the browser's cookies are written back for the next
    /// run, and a save failure never fails an established session.
    pub async fn establish(&mut self) -> Result<LoginMethod> {
        match self.try_cached_session().await {
            Ok(()) => {
                self.state = SessionState::SessionVerified;
                info!("Session restored from saved cookies");
                self.persist_cookies().await;
                return Ok(LoginMethod::CachedSession);
            }
            Err(reason) => {
                self.state = SessionState::SessionUnverified;
                info!("No cached session ({}), logging in with credentials", reason);
            }
        }

        self.credential_login().await?;
        self.persist_cookies().await;

        Ok(LoginMethod::Credentials)
    }

    /// Install saved cookies, load the listing, and probe for the
    /// logged-in marker. The error is a human-readable reason only; the
    /// caller always falls back to the interactive flow.
    async fn try_cached_session(&mut self) -> std::result::Result<(), String> {
        let cookies = self.cookie_store.load().map_err(|e| e.to_string())?;
        debug!("Replaying {} saved cookies", cookies.len());

        self.driver
            .import_cookies(&cookies)
            .await
            .map_err(|e| e.to_string())?;
        self.driver
            .navigate(&self.site.listing_url)
            .await
            .map_err(|e| e.to_string())?;
        self.state = SessionState::CookiesAttempted;

        self.driver
            .wait_for_element(&self.site.selectors.logged_in_marker, SESSION_PROBE_TIMEOUT)
            .await
            .map_err(|_| {
                format!(
                    "logged-in marker `{}` not present",
                    self.site.selectors.logged_in_marker
                )
            })?;

        Ok(())
    }

    async fn credential_login(&mut self) -> Result<()> {
        self.state = SessionState::CredentialLoginInProgress;
        info!("Logging in as {}", self.forum.username);

        for &(step, timeout_secs) in INTERACTIVE_STEPS {
            debug!("Login step: {}", step);
            if let Err(e) = self.run_step(step, Duration::from_secs(timeout_secs)).await {
                self.state = SessionState::LoginFailed;
                return Err(WatchpostError::login_step(step, e));
            }
        }

        self.state = SessionState::LoginSucceeded;
        info!("Credential login succeeded");
        Ok(())
    }

    async fn run_step(&self, step: LoginStep, timeout: Duration) -> Result<()> {
        let selectors = &self.site.selectors;
        match step {
            LoginStep::Navigate => {
                self.driver.navigate(&self.site.listing_url).await?;
                self.driver.wait_for_element("body", timeout).await?;
                // Skim the listing a little before touching the dialog
                simulate_browsing(self.driver, self.humanize).await;
                self.driver
                    .wait_for_element(&selectors.login_button, timeout)
                    .await
            }
            LoginStep::OpenLoginDialog => {
                self.driver.click(&selectors.login_button).await?;
                self.driver
                    .wait_for_element(&selectors.password_tab, timeout)
                    .await
            }
            LoginStep::SelectPasswordLogin => {
                self.driver.click(&selectors.password_tab).await?;
                self.driver
                    .wait_for_element(&selectors.username_input, timeout)
                    .await
            }
            LoginStep::EnterUsername => {
                self.driver
                    .wait_for_element(&selectors.username_input, timeout)
                    .await?;
                self.driver
                    .type_text(&selectors.username_input, &self.forum.username, self.humanize)
                    .await
            }
            LoginStep::EnterPassword => {
                self.driver
                    .wait_for_element(&selectors.password_input, timeout)
                    .await?;
                self.driver
                    .type_text(&selectors.password_input, &self.forum.password, self.humanize)
                    .await
            }
            LoginStep::Submit => {
                self.driver
                    .wait_for_element(&selectors.submit_button, timeout)
                    .await?;
                self.driver.click(&selectors.submit_button).await
            }
            LoginStep::ConfirmListing => {
                self.driver
                    .wait_for_element(&selectors.listing_item, timeout)
                    .await
            }
            LoginStep::ConfirmAvatar => {
                self.driver
                    .wait_for_element(&selectors.logged_in_marker, timeout)
                    .await
            }
        }
    }

    async fn persist_cookies(&self) {
        match self.driver.export_cookies().await {
            Ok(cookies) => match self.cookie_store.save(&cookies) {
                Ok(()) => info!(
                    "Saved {} session cookies to {}",
                    cookies.len(),
                    self.cookie_store.path().display()
                ),
                Err(e) => warn!("Failed to save session cookies: {}", e),
            },
            Err(e) => warn!("Failed to export session cookies: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::mock::MockDriver;
    use crate::domain::StoredCookie;

    fn fast_humanize() -> HumanizeConfig {
        HumanizeConfig {
            key_delay_min_ms: 0,
            key_delay_max_ms: 0,
            scroll_count_min: 0,
            scroll_count_max: 0,
            scroll_px_min: 0,
            scroll_px_max: 0,
            scroll_pause_min_ms: 0,
            scroll_pause_max_ms: 0,
        }
    }

    fn forum() -> ForumConfig {
        ForumConfig {
            username: "scout".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn session_cookie() -> StoredCookie {
        StoredCookie {
            name: "sid".to_string(),
            value: "abc123".to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: None,
            expires: 0.0,
        }
    }

    #[tokio::test]
    async fn test_cached_session_skips_login() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_store = CookieStore::new(dir.path().join("cookies.json"));
        cookie_store.save(&[session_cookie()]).unwrap();

        let driver = MockDriver::new();
        let site = SiteConfig::default();
        let forum = forum();
        let humanize = fast_humanize();

        let mut manager = SessionManager::new(&driver, cookie_store, &site, &forum, &humanize);

        let method = manager.establish().await.unwrap();
        assert_eq!(method, LoginMethod::CachedSession);
        assert_eq!(manager.state(), SessionState::SessionVerified);

        assert!(driver.called("import_cookies:1"));
        assert!(driver.called("navigate:"));
        // The interactive flow never ran
        assert!(!driver.called("click:"));
        assert!(!driver.called("type:"));
        // But the jar is still written back for the next run
        assert!(driver.called("export_cookies"));
    }

    #[tokio::test]
    async fn test_missing_cookie_file_falls_back_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_store = CookieStore::new(dir.path().join("cookies.json"));

        let driver = MockDriver::new();
        driver.seed_cookies(vec![session_cookie()]);
        let site = SiteConfig::default();
        let forum = forum();
        let humanize = fast_humanize();

        let mut manager = SessionManager::new(&driver, cookie_store, &site, &forum, &humanize);

        let method = manager.establish().await.unwrap();
        assert_eq!(method, LoginMethod::Credentials);
        assert_eq!(manager.state(), SessionState::LoginSucceeded);

        let calls = driver.calls();
        assert!(calls.contains(&format!(
            "type:{}:{}",
            site.selectors.username_input, "scout"
        )));
        assert!(calls.contains(&format!(
            "type:{}:{}",
            site.selectors.password_input, "hunter2"
        )));
        assert!(calls.contains(&format!("click:{}", site.selectors.submit_button)));

        // After login the browser cookies were written back to disk
        assert!(driver.called("export_cookies"));
        assert!(dir.path().join("cookies.json").exists());
    }

    #[tokio::test]
    async fn test_rejected_cookies_fall_back_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_store = CookieStore::new(dir.path().join("cookies.json"));
        cookie_store.save(&[session_cookie()]).unwrap();

        let driver = MockDriver::new();
        let site = SiteConfig::default();
        // The probe after cookie replay misses; the post-login confirm hits.
        driver.script_wait(&site.selectors.logged_in_marker, false);
        driver.script_wait(&site.selectors.logged_in_marker, true);
        let forum = forum();
        let humanize = fast_humanize();

        let mut manager = SessionManager::new(&driver, cookie_store, &site, &forum, &humanize);

        let method = manager.establish().await.unwrap();
        assert_eq!(method, LoginMethod::Credentials);
        assert_eq!(manager.state(), SessionState::LoginSucceeded);
        assert!(driver.called("import_cookies:1"));
        assert!(driver.called("type:"));
    }

    #[tokio::test]
    async fn test_step_failure_names_the_step() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_store = CookieStore::new(dir.path().join("cookies.json"));

        let driver = MockDriver::new();
        let site = SiteConfig::default();
        driver.script_wait(&site.selectors.submit_button, false);
        let forum = forum();
        let humanize = fast_humanize();

        let mut manager = SessionManager::new(&driver, cookie_store, &site, &forum, &humanize);

        let err = manager.establish().await.unwrap_err();
        match err {
            WatchpostError::Login { step, .. } => assert_eq!(step, LoginStep::Submit),
            other => panic!("expected login error, got: {}", other),
        }
        assert_eq!(manager.state(), SessionState::LoginFailed);

        // Nothing gets saved after a failed login
        assert!(!driver.called("export_cookies"));
        assert!(!dir.path().join("cookies.json").exists());
    }

    #[tokio::test]
    async fn test_cookie_save_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Parent "directory" is a file, so the save must fail
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let cookie_store = CookieStore::new(blocker.join("cookies.json"));

        let driver = MockDriver::new();
        driver.seed_cookies(vec![session_cookie()]);
        let site = SiteConfig::default();
        let forum = forum();
        let humanize = fast_humanize();

        let mut manager = SessionManager::new(&driver, cookie_store, &site, &forum, &humanize);

        let method = manager.establish().await.unwrap();
        assert_eq!(method, LoginMethod::Credentials);
        assert_eq!(manager.state(), SessionState::LoginSucceeded);
    }
}
