use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::app::{Result, WatchpostError};
use crate::config::Selectors;
use crate::domain::{ListingRow, ListingSnapshot};

/// Configured selectors compiled once per parse.
struct CompiledSelectors {
    listing_item: Selector,
    item_title: Selector,
    pinned_marker: Selector,
    item_author: Selector,
    item_category: Selector,
    item_time: Selector,
}

impl CompiledSelectors {
    fn compile(selectors: &Selectors) -> Result<Self> {
        Ok(Self {
            listing_item: compile_one(&selectors.listing_item)?,
            item_title: compile_one(&selectors.item_title)?,
            pinned_marker: compile_one(&selectors.pinned_marker)?,
            item_author: compile_one(&selectors.item_author)?,
            item_category: compile_one(&selectors.item_category)?,
            item_time: compile_one(&selectors.item_time)?,
        })
    }
}

fn compile_one(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| WatchpostError::Parse(format!("Invalid selector `{}`: {}", selector, e)))
}

/// Reduce listing page HTML to at most `max_items` candidate rows.
///
/// Rows come back in document order, which on this forum is newest first.
/// Pinned rows and rows without a link are skipped without consuming a
/// slot, so the cap always counts real candidates. Missing text fields
/// degrade to empty strings rather than failing the row.
pub fn parse_listing(
    html: &str,
    selectors: &Selectors,
    max_items: usize,
) -> Result<ListingSnapshot> {
    let compiled = CompiledSelectors::compile(selectors)?;
    let document = Html::parse_document(html);

    let mut rows = Vec::new();
    for element in document.select(&compiled.listing_item) {
        if rows.len() >= max_items {
            break;
        }

        // Pinned and official announcements are never "new content"
        if element.select(&compiled.pinned_marker).next().is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            debug!("Skipping listing row without href");
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            debug!("Skipping listing row with empty href");
            continue;
        }

        rows.push(ListingRow {
            title: text_of(&element, &compiled.item_title),
            href: href.to_string(),
            author: text_of(&element, &compiled.item_author),
            category: text_of(&element, &compiled.item_category),
            posted_at: text_of(&element, &compiled.item_time),
        });
    }

    Ok(ListingSnapshot { rows })
}

fn text_of(element: &ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
