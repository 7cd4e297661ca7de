use std::sync::Arc;
use std::time::Duration;

use crate::app::{AppContext, Result, WatchpostError};
use crate::config::{Config, ConfigWatcher};
use crate::daemon::{parse_interval, Watcher};
use crate::pipeline::{run_once, RunOutcome};
use crate::store::Store;

/// Run one pipeline pass and exit non-zero if it failed.
pub async fn run(ctx: &AppContext, config: Arc<Config>) -> Result<()> {
    match run_once(config, ctx.store.clone(), ctx.notifier.clone()).await {
        RunOutcome::Completed(stats) => {
            println!(
                "Checked {} listing rows: {} new, {} notified",
                stats.extracted, stats.new_articles, stats.notified
            );
            Ok(())
        }
        RunOutcome::Skipped(reason) => {
            println!("Skipped: {}", reason);
            Ok(())
        }
        RunOutcome::Failed(message) => Err(WatchpostError::Other(message)),
    }
}

/// Run pipeline passes on an interval until interrupted.
pub async fn watch(
    ctx: &AppContext,
    config_watcher: ConfigWatcher,
    interval: Option<String>,
) -> Result<()> {
    let interval_override = match interval {
        Some(ref spec) => Some(Duration::from_secs(parse_interval(spec)?)),
        None => None,
    };

    let mut watcher = Watcher::new(
        config_watcher,
        ctx.store.clone(),
        ctx.notifier.clone(),
        interval_override,
    );

    watcher.run().await
}

/// Print the most recently seen articles, newest first.
pub fn list(ctx: &AppContext, limit: usize) -> Result<()> {
    let articles = ctx.store.recent_articles(limit)?;

    if articles.is_empty() {
        println!("No articles seen yet");
        return Ok(());
    }

    for article in articles {
        let marker = if article.notified { " " } else { "●" };
        println!(
            "{} {}  {}\n     {}",
            marker,
            article.first_seen_at.format("%Y-%m-%d %H:%M"),
            article.display_title(),
            article.url
        );
    }

    Ok(())
}

/// Print articles that were seen but never announced to the webhook.
pub fn pending(ctx: &AppContext) -> Result<()> {
    let articles = ctx.store.unnotified_articles()?;

    if articles.is_empty() {
        println!("Nothing pending");
        return Ok(());
    }

    println!("{} articles awaiting notification:", articles.len());
    for article in articles {
        println!("  {}\n    {}", article.display_title(), article.url);
    }

    Ok(())
}
