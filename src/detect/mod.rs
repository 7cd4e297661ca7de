//! New-content detection.
//!
//! Compares a listing snapshot against the article store. A row whose
//! fully-qualified URL is already on record is old news; everything else
//! is persisted and returned for notification. URLs are the sole identity:
//! edited titles and shifting relative timestamps never resurrect a post.

use tracing::warn;
use url::Url;

use crate::domain::{Article, ListingSnapshot};
use crate::store::Store;

/// Persist and return the snapshot rows not seen before, in snapshot order.
///
/// Relative hrefs are resolved against `origin` before lookup so the keys
/// stay stable across listing markup changes. A row that fails resolution
/// or a storage operation is logged and skipped; one bad row never costs
/// the rest of the snapshot.
pub fn detect_new<S: Store>(store: &S, origin: &Url, snapshot: &ListingSnapshot) -> Vec<Article> {
    let mut fresh = Vec::new();

    for row in &snapshot.rows {
        let url = match origin.join(&row.href) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("Skipping row with unresolvable href `{}`: {}", row.href, e);
                continue;
            }
        };

        match store.article_exists(&url) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                warn!("Skipping row `{}`, existence check failed: {}", url, e);
                continue;
            }
        }

        let mut article = Article::new(
            row.title.clone(),
            url,
            row.author.clone(),
            row.category.clone(),
            row.posted_at.clone(),
        );

        match store.save_article(&article) {
            Ok(id) => {
                article.id = id;
                fresh.push(article);
            }
            Err(e) => warn!("Skipping row `{}`, save failed: {}", article.url, e),
        }
    }

    fresh
}
