//! Fetching feed data from providers
//!
//! The cache never talks to a provider directly. It calls a [`Fetcher`],
//! which either performs a live fetch with the configured credentials or, in
//! offline mode, synthesizes a stand-in payload so the dashboard always has
//! something to show.

mod http;
mod simulated;
pub mod synthetic;

pub use http::HttpFetcher;
pub use simulated::SimulatedFetcher;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::Credentials;
use crate::data::Payload;
use crate::error::FetchError;
use crate::source::SourceKind;

/// Capability to obtain a payload for a source
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Performs a live fetch for `source` with `credentials`
    async fn fetch(&self, source: SourceKind, credentials: &Credentials) -> Result<Payload, FetchError>;

    /// Produces an offline stand-in payload; never fails
    fn synthesize(&self, source: SourceKind, now: DateTime<Utc>) -> Payload;
}
