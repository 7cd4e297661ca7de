//! Listing extraction.
//!
//! Reads the forum's listing page through an established browser session
//! and reduces it to a [`ListingSnapshot`] of candidate rows. Extraction
//! is read-only with respect to the page; all dedup decisions happen later
//! against the store.

mod parser;

pub use parser::parse_listing;

use std::time::Duration;

use tracing::debug;

use crate::app::Result;
use crate::browser::{simulate_browsing, BrowserDriver, HumanizeConfig};
use crate::config::SiteConfig;
use crate::domain::ListingSnapshot;

/// How long to wait for the client-rendered listing to appear.
const LISTING_RENDER_TIMEOUT: Duration = Duration::from_secs(20);

/// Extracts the current listing through a [`BrowserDriver`].
pub struct ListingExtractor<'a> {
    driver: &'a dyn BrowserDriver,
    site: &'a SiteConfig,
    humanize: &'a HumanizeConfig,
}

impl<'a> ListingExtractor<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        site: &'a SiteConfig,
        humanize: &'a HumanizeConfig,
    ) -> Self {
        Self {
            driver,
            site,
            humanize,
        }
    }

    /// Navigate to the listing and snapshot its rows.
    ///
    /// Assumes the session was established beforehand; the listing renders
    /// client-side, so the extractor waits for actual rows rather than
    /// trusting navigation alone.
    pub async fn extract(&self) -> Result<ListingSnapshot> {
        self.driver.navigate(&self.site.listing_url).await?;

        self.driver
            .wait_for_element("body", LISTING_RENDER_TIMEOUT)
            .await?;
        self.driver
            .wait_for_element(&self.site.selectors.listing_item, LISTING_RENDER_TIMEOUT)
            .await?;

        simulate_browsing(self.driver, self.humanize).await;

        let html = self.driver.page_html().await?;
        let snapshot = parse_listing(&html, &self.site.selectors, self.site.max_items)?;
        debug!("Extracted {} listing rows", snapshot.len());

        Ok(snapshot)
    }
}
