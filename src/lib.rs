//! # Broadsheet
//!
//! A local, always-readable cache of a remote JSON article feed.
//!
//! ## Architecture
//!
//! Broadsheet follows a pipeline architecture:
//!
//! ```text
//! Fetcher → Normalizer → Store → QueryBridge
//!        ╰──── SyncCoordinator ────╯
//! ```
//!
//! - [`fetcher`]: HTTP client returning the raw feed document
//! - [`normalizer`]: Turns the JSON array into article records
//! - [`store`]: SQLite snapshot of the feed
//! - [`sync`]: Single-flight refresh cycles
//! - [`bridge`]: Queries and live subscriptions for presentation code
//!
//! ## Quick Start
//!
//! ```bash
//! # Pull the feed into the local cache
//! broadsheet refresh
//!
//! # Read from the cache, online or not
//! broadsheet list
//! broadsheet show 42
//!
//! # Refresh every 10 minutes and print updates
//! broadsheet watch --interval 10m
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetcher, normalizer, coordinator and bridge.
pub mod app;

/// Read-side access for presentation code.
///
/// - [`QueryBridge`](bridge::QueryBridge): list/point queries, change and refresh subscriptions
/// - [`Subscription`](bridge::Subscription): handle that stops delivery when released
pub mod bridge;

/// Command-line interface using clap.
///
/// - `refresh` - Fetch the feed once
/// - `list` - List cached articles
/// - `show <id>` - Show one article
/// - `status` - Snapshot metadata
/// - `watch` - Refresh on an interval
pub mod cli;

/// Configuration loaded from `~/.config/broadsheet/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`ArticleRecord`](domain::ArticleRecord): one normalized article
/// - [`ArticleList`](domain::ArticleList): immutable snapshot in display order
/// - [`SnapshotInfo`](domain::SnapshotInfo): metadata about the stored snapshot
/// - [`SyncEvent`](domain::SyncEvent): refresh lifecycle notifications
pub mod domain;

/// Feed retrieval.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for fetching the document
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// JSON feed parsing and normalization.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Refresh orchestration.
///
/// [`SyncCoordinator`](sync::SyncCoordinator) runs fetch, parse and replace
/// as one cycle and coalesces concurrent refresh requests onto it.
pub mod sync;
