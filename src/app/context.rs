use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::notifier::{Notifier, WebhookNotifier};
use crate::store::sqlite::SqliteStore;

/// Long-lived services shared by every pipeline run.
///
/// The article store and the webhook endpoints bind once at startup;
/// everything else travels in the immutable config snapshot handed to
/// each run.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        if let Some(parent) = config.storage.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Arc::new(SqliteStore::new(&config.storage.db_path)?);
        let notifier: Arc<dyn Notifier> = Arc::new(WebhookNotifier::new(config.webhook.clone()));

        Ok(Self { store, notifier })
    }

    pub fn in_memory() -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let notifier: Arc<dyn Notifier> =
            Arc::new(WebhookNotifier::new(crate::config::WebhookConfig::default()));

        Ok(Self { store, notifier })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_new_creates_db_directory() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.storage.db_path = dir.path().join("data/articles.db");

        let ctx = AppContext::new(&config).unwrap();
        assert!(config.storage.db_path.exists());
        assert_eq!(ctx.store.count_articles().unwrap(), 0);
    }

    #[test]
    fn test_in_memory_context() {
        let ctx = AppContext::in_memory().unwrap();
        assert_eq!(ctx.store.count_articles().unwrap(), 0);
    }
}
