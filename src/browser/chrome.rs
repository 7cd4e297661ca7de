use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::debug;

use crate::app::{Result, WatchpostError};
use crate::browser::humanize::HumanizeConfig;
use crate::browser::BrowserDriver;
use crate::config::BrowserOptions;
use crate::domain::StoredCookie;

/// How often `wait_for_element` re-probes the DOM.
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Chromium-backed driver using chromiumoxide.
///
/// One driver owns one browser process and one page; the whole login +
/// extraction flow happens on that single page, so the forum sees an
/// ordinary single-tab visitor.
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
}

impl ChromeDriver {
    /// Launch a Chromium instance with the given options.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--window-size=1920,1080");

        if options.no_sandbox {
            builder = builder.arg("--no-sandbox");
        }
        if options.disable_gpu {
            builder = builder.arg("--disable-gpu");
        }
        if options.disable_dev_shm_usage {
            builder = builder.arg("--disable-dev-shm-usage");
        }
        if !options.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| WatchpostError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            WatchpostError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        // Spawn the browser handler
        tokio::spawn(async move {
            while let Some(_event) = handler.next().await {
                // Handle browser events
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| WatchpostError::Browser(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = options.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| WatchpostError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(Self { browser, page })
    }

    /// Close the browser and reap the Chromium process.
    pub async fn shutdown(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| WatchpostError::Browser(format!("Failed to close browser: {}", e)))?;

        if let Err(e) = self.browser.wait().await {
            debug!("Browser process did not report exit cleanly: {}", e);
        }

        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| WatchpostError::Navigation(format!("Failed to load {}: {}", url, e)))?;

        self.page.wait_for_navigation().await.map_err(|e| {
            WatchpostError::Navigation(format!("Navigation to {} did not settle: {}", url, e))
        })?;

        Ok(())
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        let probe = async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, probe).await.map_err(|_| {
            WatchpostError::Browser(format!(
                "Timed out after {:?} waiting for element `{}`",
                timeout, selector
            ))
        })
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| WatchpostError::Browser(format!("Element `{}` not found: {}", selector, e)))?;

        element
            .click()
            .await
            .map_err(|e| WatchpostError::Browser(format!("Click on `{}` failed: {}", selector, e)))?;

        Ok(())
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        humanize: &HumanizeConfig,
    ) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| WatchpostError::Browser(format!("Element `{}` not found: {}", selector, e)))?;

        // Focus the field first
        element
            .click()
            .await
            .map_err(|e| WatchpostError::Browser(format!("Focus on `{}` failed: {}", selector, e)))?;

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            element
                .type_str(ch.encode_utf8(&mut buf))
                .await
                .map_err(|e| {
                    WatchpostError::Browser(format!("Typing into `{}` failed: {}", selector, e))
                })?;
            tokio::time::sleep(humanize.key_delay()).await;
        }

        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<()> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| WatchpostError::Browser(format!("Script execution failed: {}", e)))?;

        Ok(())
    }

    async fn page_html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| WatchpostError::Browser(format!("Failed to read page content: {}", e)))
    }

    async fn export_cookies(&self) -> Result<Vec<StoredCookie>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| WatchpostError::Browser(format!("Failed to read cookies: {}", e)))?;

        Ok(cookies.iter().map(cdp_to_stored).collect())
    }

    async fn import_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            params.push(stored_to_cdp(cookie)?);
        }

        self.page
            .set_cookies(params)
            .await
            .map_err(|e| WatchpostError::Browser(format!("Failed to install cookies: {}", e)))?;

        Ok(())
    }
}

fn cdp_to_stored(cookie: &Cookie) -> StoredCookie {
    // CDP reports session cookies with a negative expiry; the stored form
    // uses 0 for "expires with the session".
    let expires = if cookie.session {
        0.0
    } else {
        cookie.expires.max(0.0)
    };

    StoredCookie {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        domain: cookie.domain.clone(),
        path: cookie.path.clone(),
        secure: cookie.secure,
        http_only: cookie.http_only,
        same_site: cookie.same_site.as_ref().map(same_site_name),
        expires,
    }
}

fn stored_to_cdp(cookie: &StoredCookie) -> Result<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.as_str())
        .value(cookie.value.as_str())
        .domain(cookie.domain.as_str())
        .path(cookie.path.as_str())
        .secure(cookie.secure)
        .http_only(cookie.http_only);

    if cookie.expires > 0.0 {
        builder = builder.expires(TimeSinceEpoch::new(cookie.expires));
    }
    if let Some(same_site) = cookie.same_site.as_deref().and_then(parse_same_site) {
        builder = builder.same_site(same_site);
    }

    builder
        .build()
        .map_err(|e| WatchpostError::Browser(format!("Invalid cookie `{}`: {}", cookie.name, e)))
}

fn same_site_name(same_site: &CookieSameSite) -> String {
    match same_site {
        CookieSameSite::Strict => "Strict",
        CookieSameSite::Lax => "Lax",
        CookieSameSite::None => "None",
    }
    .to_string()
}

fn parse_same_site(value: &str) -> Option<CookieSameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}
