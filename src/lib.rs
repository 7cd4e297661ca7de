//! # Watchpost
//!
//! A monitor for a login-walled forum: watches one listing page through a
//! real Chromium session and announces never-before-seen articles to a
//! webhook.
//!
//! ## Architecture
//!
//! ```text
//! Session → Extractor → Detect → Notifier
//!    │          │          │
//!    └─ browser ┘        SQLite
//! ```
//!
//! - [`session`]: cookie-cached login with an interactive fallback
//! - [`extractor`]: listing page → snapshot of candidate rows
//! - [`detect`]: URL-keyed dedup against the article store
//! - [`notifier`]: one webhook message per new article
//!
//! ## Quick Start
//!
//! ```bash
//! # Check once
//! watchpost run
//!
//! # Keep watching every 5 minutes
//! watchpost watch --interval 5m
//!
//! # What has been seen, and what is still unannounced
//! watchpost list
//! watchpost pending
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the long-lived
/// services: article store and webhook notifier.
pub mod app;

/// Browser automation behind the [`BrowserDriver`](browser::BrowserDriver)
/// trait.
///
/// [`ChromeDriver`](browser::ChromeDriver) drives a real Chromium via
/// chromiumoxide; the humanize submodule paces typing and scrolling.
pub mod browser;

/// Command-line interface using clap.
///
/// - `run` - Check the listing once
/// - `watch [--interval 5m]` - Keep checking until interrupted
/// - `list [--limit N]` - Recently seen articles
/// - `pending` - Articles not yet announced
pub mod cli;

/// TOML configuration with per-run immutable snapshots.
///
/// Loads from `config/watchpost.toml` (auto-created with defaults);
/// [`ConfigWatcher`](config::ConfigWatcher) re-reads the file between runs.
pub mod config;

/// Interval scheduler for watch mode.
pub mod daemon;

/// New-content detection: URL-keyed dedup against the article store.
pub mod detect;

/// Core domain models.
///
/// - [`Article`](domain::Article): a tracked forum post
/// - [`StoredCookie`](domain::StoredCookie): serialized session cookie
/// - [`ListingRow`](domain::ListingRow) / [`ListingSnapshot`](domain::ListingSnapshot):
///   what one extraction pass saw
pub mod domain;

/// Listing-page extraction: rendered HTML → candidate rows.
pub mod extractor;

/// Webhook notification delivery.
pub mod notifier;

/// One end-to-end monitoring run, panic-isolated for schedulers.
pub mod pipeline;

/// Session establishment: cached cookies first, interactive login second.
pub mod session;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
