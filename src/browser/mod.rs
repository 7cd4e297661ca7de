//! Browser automation layer for the forum session.
//!
//! The forum renders its listing client-side and gates it behind a login,
//! so monitoring runs inside a real Chromium instance. Everything above
//! this module talks to the [`BrowserDriver`] trait; [`ChromeDriver`] is
//! the chromiumoxide-backed implementation.
//!
//! # Architecture
//!
//! ```text
//! SessionManager ─┐
//!                 ├─ BrowserDriver ── ChromeDriver ── Chromium (CDP)
//! ListingExtractor┘
//! ```

mod chrome;
pub mod humanize;
#[cfg(test)]
pub(crate) mod mock;

pub use chrome::ChromeDriver;
pub use humanize::{simulate_browsing, HumanizeConfig};

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::StoredCookie;

/// Trait for driving an interactive browser session
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load a URL in the driver's page and wait for navigation to settle
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` exists, failing after `timeout`
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str) -> Result<()>;

    /// Focus `selector` and type `text` one keystroke at a time, pacing
    /// keystrokes per the humanize policy
    async fn type_text(&self, selector: &str, text: &str, humanize: &HumanizeConfig)
        -> Result<()>;

    /// Run a script in the page, discarding its result
    async fn evaluate(&self, script: &str) -> Result<()>;

    /// Full HTML of the current page
    async fn page_html(&self) -> Result<String>;

    /// All cookies visible to the current page
    async fn export_cookies(&self) -> Result<Vec<StoredCookie>>;

    /// Install cookies into the browser, normally before navigating
    async fn import_cookies(&self, cookies: &[StoredCookie]) -> Result<()>;
}
