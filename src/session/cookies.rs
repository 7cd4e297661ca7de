use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::debug;

use crate::domain::StoredCookie;

/// Reasons a saved cookie file cannot seed a session.
///
/// Every variant is recoverable: the caller falls back to a credential
/// login and overwrites the file afterwards.
#[derive(Error, Debug)]
pub enum CookieError {
    #[error("Cookie file not found: {0}")]
    NotFound(PathBuf),

    #[error("Cookie file {0} contains no cookies")]
    Empty(PathBuf),

    #[error("All cookies in {0} have expired")]
    AllExpired(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cookie file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// JSON-file persistence for session cookies.
///
/// The file holds every cookie the browser had after a successful login;
/// `load` hands back only the ones still worth replaying.
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved cookies, dropping any that have expired.
    ///
    /// Session cookies (expiry 0) never count as expired here; whether the
    /// server still honors them is decided by the session probe.
    pub fn load(&self) -> Result<Vec<StoredCookie>, CookieError> {
        if !self.path.exists() {
            return Err(CookieError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let cookies: Vec<StoredCookie> = serde_json::from_str(&content)?;

        if cookies.is_empty() {
            return Err(CookieError::Empty(self.path.clone()));
        }

        let now = now_epoch();
        let total = cookies.len();
        let fresh: Vec<StoredCookie> = cookies
            .into_iter()
            .filter(|cookie| !cookie.is_expired(now))
            .collect();

        if fresh.is_empty() {
            return Err(CookieError::AllExpired(self.path.clone()));
        }

        if fresh.len() < total {
            debug!(
                "Dropped {} expired cookies from {}",
                total - fresh.len(),
                self.path.display()
            );
        }

        Ok(fresh)
    }

    /// Overwrite the cookie file with the current browser cookies.
    pub fn save(&self, cookies: &[StoredCookie]) -> Result<(), CookieError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(cookies)?;
        fs::write(&self.path, content)?;

        Ok(())
    }
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
