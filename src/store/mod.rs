pub mod sqlite;

use crate::app::Result;
use crate::domain::Article;

pub use sqlite::SqliteStore;

/// Durable article history. One record per article, keyed by URL.
pub trait Store {
    /// True if an article with this URL has been seen before.
    fn article_exists(&self, url: &str) -> Result<bool>;

    /// Insert a new article and return its assigned id.
    fn save_article(&self, article: &Article) -> Result<i64>;

    /// Flip the notified flag after a successful delivery.
    fn mark_notified(&self, id: i64) -> Result<()>;

    fn get_article_by_url(&self, url: &str) -> Result<Option<Article>>;
    fn recent_articles(&self, limit: usize) -> Result<Vec<Article>>;
    fn unnotified_articles(&self) -> Result<Vec<Article>>;
    fn count_articles(&self) -> Result<i64>;
}
