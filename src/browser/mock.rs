//! Scripted in-memory driver for exercising flows without a browser.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{Result, WatchpostError};
use crate::browser::humanize::HumanizeConfig;
use crate::browser::BrowserDriver;
use crate::domain::StoredCookie;

/// Mock [`BrowserDriver`] driven by per-selector scripts.
///
/// `wait_for_element` consumes one scripted outcome per call for its
/// selector and falls back to "found" when nothing is scripted. Every call
/// is recorded so tests can assert on the exact interaction sequence.
pub(crate) struct MockDriver {
    wait_scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    navigate_fails: Mutex<bool>,
    html: Mutex<String>,
    cookies: Mutex<Vec<StoredCookie>>,
    calls: Mutex<Vec<String>>,
}

impl MockDriver {
    pub(crate) fn new() -> Self {
        Self {
            wait_scripts: Mutex::new(HashMap::new()),
            navigate_fails: Mutex::new(false),
            html: Mutex::new(String::new()),
            cookies: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue the outcome of the next `wait_for_element` call on `selector`.
    pub(crate) fn script_wait(&self, selector: &str, found: bool) {
        self.wait_scripts
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_default()
            .push_back(found);
    }

    pub(crate) fn fail_navigation(&self) {
        *self.navigate_fails.lock().unwrap() = true;
    }

    pub(crate) fn set_html(&self, html: &str) {
        *self.html.lock().unwrap() = html.to_string();
    }

    pub(crate) fn seed_cookies(&self, cookies: Vec<StoredCookie>) {
        *self.cookies.lock().unwrap() = cookies;
    }

    pub(crate) fn cookies(&self) -> Vec<StoredCookie> {
        self.cookies.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn called(&self, prefix: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|call| call.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{}", url));
        if *self.navigate_fails.lock().unwrap() {
            return Err(WatchpostError::Navigation(format!("Failed to load {}", url)));
        }
        Ok(())
    }

    async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<()> {
        self.record(format!("wait:{}", selector));
        let found = self
            .wait_scripts
            .lock()
            .unwrap()
            .get_mut(selector)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(true);

        if found {
            Ok(())
        } else {
            Err(WatchpostError::Browser(format!(
                "Timed out waiting for element `{}`",
                selector
            )))
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click:{}", selector));
        Ok(())
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        _humanize: &HumanizeConfig,
    ) -> Result<()> {
        self.record(format!("type:{}:{}", selector, text));
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<()> {
        self.record("evaluate".to_string());
        Ok(())
    }

    async fn page_html(&self) -> Result<String> {
        self.record("page_html".to_string());
        Ok(self.html.lock().unwrap().clone())
    }

    async fn export_cookies(&self) -> Result<Vec<StoredCookie>> {
        self.record("export_cookies".to_string());
        Ok(self.cookies.lock().unwrap().clone())
    }

    async fn import_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
        self.record(format!("import_cookies:{}", cookies.len()));
        *self.cookies.lock().unwrap() = cookies.to_vec();
        Ok(())
    }
}
