//! Human-paced interaction policy.
//!
//! Credential logins type character by character and scroll around a little
//! before interacting, with randomized delays drawn from the ranges below.
//! The cached-session path never pays these costs.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use crate::browser::BrowserDriver;

/// Delay and scroll ranges for humanized interaction. All ranges are
/// inclusive; a range with `max <= min` collapses to `min`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HumanizeConfig {
    /// Pause between individual keystrokes, in milliseconds.
    pub key_delay_min_ms: u64,
    pub key_delay_max_ms: u64,
    /// Number of scroll gestures during pre-login browsing.
    pub scroll_count_min: u32,
    pub scroll_count_max: u32,
    /// Pixels per scroll gesture.
    pub scroll_px_min: u32,
    pub scroll_px_max: u32,
    /// Pause between scroll gestures, in milliseconds.
    pub scroll_pause_min_ms: u64,
    pub scroll_pause_max_ms: u64,
}

impl Default for HumanizeConfig {
    fn default() -> Self {
        Self {
            key_delay_min_ms: 50,
            key_delay_max_ms: 150,
            scroll_count_min: 2,
            scroll_count_max: 4,
            scroll_px_min: 200,
            scroll_px_max: 500,
            scroll_pause_min_ms: 300,
            scroll_pause_max_ms: 800,
        }
    }
}

impl HumanizeConfig {
    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(sample_u64(self.key_delay_min_ms, self.key_delay_max_ms))
    }

    pub fn scroll_count(&self) -> u32 {
        sample_u32(self.scroll_count_min, self.scroll_count_max)
    }

    pub fn scroll_px(&self) -> u32 {
        sample_u32(self.scroll_px_min, self.scroll_px_max)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(sample_u64(self.scroll_pause_min_ms, self.scroll_pause_max_ms))
    }
}

fn sample_u64(min: u64, max: u64) -> u64 {
    if max <= min {
        min
    } else {
        rand::rng().random_range(min..=max)
    }
}

fn sample_u32(min: u32, max: u32) -> u32 {
    if max <= min {
        min
    } else {
        rand::rng().random_range(min..=max)
    }
}

/// Sleep for a random duration in `[min_ms, max_ms]` milliseconds.
pub async fn pause(min_ms: u64, max_ms: u64) {
    let delay = sample_u64(min_ms, max_ms);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// Scroll down the page a few times with pauses in between, then back to
/// the top, like a person skimming the listing. Scroll failures are logged
/// and ignored; this is decoration, not a pipeline step that may fail a run.
pub async fn simulate_browsing(driver: &dyn BrowserDriver, humanize: &HumanizeConfig) {
    let count = humanize.scroll_count();
    for _ in 0..count {
        let px = humanize.scroll_px();
        let script = format!("window.scrollBy({{top: {}, behavior: 'smooth'}})", px);
        if let Err(e) = driver.evaluate(&script).await {
            debug!("Scroll gesture failed: {}", e);
            return;
        }
        tokio::time::sleep(humanize.scroll_pause()).await;
    }

    if let Err(e) = driver
        .evaluate("window.scrollTo({top: 0, behavior: 'smooth'})")
        .await
    {
        debug!("Scroll back to top failed: {}", e);
    }
}
