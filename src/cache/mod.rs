//! Freshness-gated cache for the three external feeds
//!
//! This module provides a cache manager that persists each source's latest
//! payload through the [`Store`](crate::store::Store) and decides, per call,
//! whether to serve it, refetch it, or fall back. Stale entries are still
//! served when a fetch fails or the source is unconfigured, allowing the
//! dashboard to keep working when providers are unavailable.

mod manager;

pub use manager::{CacheEntry, CacheManager, FallbackReason, Outcome, Resolution};
