use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A forum post tracked by the monitor. Identity is the fully-qualified URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub category: String,
    /// Posted-time exactly as the listing renders it ("3 小时前", "昨天", ...).
    /// Free text, never parsed into a calendar type.
    pub posted_at: String,
    pub notified: bool,
    pub first_seen_at: DateTime<Utc>,
}

impl Article {
    pub fn new(title: String, url: String, author: String, category: String, posted_at: String) -> Self {
        Self {
            id: 0,
            title,
            url,
            author,
            category,
            posted_at,
            notified: false,
            first_seen_at: Utc::now(),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(untitled)"
        } else {
            &self.title
        }
    }
}
