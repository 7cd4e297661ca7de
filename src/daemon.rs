//! Scheduled watch mode.
//!
//! Runs the pipeline on a fixed cadence until interrupted. Every tick gets
//! a fresh immutable config snapshot from the [`ConfigWatcher`], so edits
//! to the config file take effect between runs without a restart; a run in
//! flight always finishes under the snapshot it started with.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::info;

use crate::app::{Result, WatchpostError};
use crate::config::{Config, ConfigWatcher};
use crate::notifier::Notifier;
use crate::pipeline::{run_once, RunOutcome};
use crate::store::SqliteStore;

/// Parse an interval string like "90s", "5m", "1h", "1d" into seconds.
/// A bare number is taken as seconds.
pub fn parse_interval(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        hours
            .parse::<u64>()
            .map(|h| h * 3600)
            .map_err(|_| WatchpostError::Config(format!("Invalid hours: {}", hours)))
    } else if let Some(minutes) = s.strip_suffix('m') {
        minutes
            .parse::<u64>()
            .map(|m| m * 60)
            .map_err(|_| WatchpostError::Config(format!("Invalid minutes: {}", minutes)))
    } else if let Some(days) = s.strip_suffix('d') {
        days.parse::<u64>()
            .map(|d| d * 86400)
            .map_err(|_| WatchpostError::Config(format!("Invalid days: {}", days)))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>()
            .map_err(|_| WatchpostError::Config(format!("Invalid seconds: {}", secs)))
    } else {
        s.parse::<u64>().map_err(|_| {
            WatchpostError::Config(format!(
                "Invalid interval: {}. Use format like '90s', '5m', '1h'",
                s
            ))
        })
    }
}

/// Format an interval in seconds using the largest exact unit.
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Foreground scheduler: one pipeline run per tick until Ctrl-C.
pub struct Watcher {
    config_watcher: ConfigWatcher,
    store: Arc<SqliteStore>,
    notifier: Arc<dyn Notifier>,
    /// CLI override; when unset the config's check interval applies.
    interval_override: Option<Duration>,
}

impl Watcher {
    pub fn new(
        config_watcher: ConfigWatcher,
        store: Arc<SqliteStore>,
        notifier: Arc<dyn Notifier>,
        interval_override: Option<Duration>,
    ) -> Self {
        Self {
            config_watcher,
            store,
            notifier,
            interval_override,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let config = self.config_watcher.current();
        let mut period = self.period_for(&config);
        info!(
            "Watching {} every {}",
            config.site.listing_url,
            format_interval(period.as_secs())
        );

        // First run right away, then on the interval
        self.tick().await;

        let mut timer = new_timer(period);
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let config = self.tick().await;

                    // Config edits can retune the cadence between runs
                    let next = self.period_for(&config);
                    if next != period {
                        info!("Check interval changed to {}", format_interval(next.as_secs()));
                        period = next;
                        timer = new_timer(period);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down");
                    return Ok(());
                }
            }
        }
    }

    fn period_for(&self, config: &Config) -> Duration {
        self.interval_override
            .unwrap_or_else(|| config.schedule.check_interval())
    }

    /// Run the pipeline once under the freshest config snapshot.
    async fn tick(&mut self) -> Arc<Config> {
        let config = self.config_watcher.poll();

        match run_once(config.clone(), self.store.clone(), self.notifier.clone()).await {
            RunOutcome::Completed(stats) => info!(
                "Run complete: {} rows extracted, {} new, {} notified",
                stats.extracted, stats.new_articles, stats.notified
            ),
            RunOutcome::Skipped(reason) => info!("Run skipped: {}", reason),
            // Failures were already logged and reported by the pipeline
            RunOutcome::Failed(_) => {}
        }

        config
    }
}

fn new_timer(period: Duration) -> Interval {
    let mut timer = interval(period);
    // A slow run must not cause a burst of catch-up runs afterwards
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Consume the immediate first tick; the caller already ran once
    timer.reset();
    timer
}
