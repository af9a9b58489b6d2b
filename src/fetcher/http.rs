//! Live fetcher backed by the real provider APIs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;

use super::{synthetic, Fetcher};
use crate::config::Credentials;
use crate::data::{EventsClient, Payload, SupplierClient, WeatherClient};
use crate::error::FetchError;
use crate::settings::{Location, Settings};
use crate::source::SourceKind;

/// Fetches each source from its provider over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    weather: WeatherClient,
    events: EventsClient,
    suppliers: SupplierClient,
    location: Location,
}

impl HttpFetcher {
    /// Creates a fetcher sharing one HTTP connection pool across providers
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    /// Creates a fetcher with a custom HTTP client
    pub fn with_client(client: Client, settings: &Settings) -> Self {
        Self {
            weather: WeatherClient::new(client.clone()),
            events: EventsClient::new(client.clone(), settings.events_radius_km),
            suppliers: SupplierClient::new(client),
            location: settings.location,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, source: SourceKind, credentials: &Credentials) -> Result<Payload, FetchError> {
        let Location { latitude, longitude } = self.location;
        debug!(%source, "fetching from provider");

        match (source, credentials) {
            (SourceKind::Weather, Credentials::ApiKey { api_key }) => self
                .weather
                .fetch_report(api_key, latitude, longitude)
                .await
                .map(Payload::Weather),
            (SourceKind::Events, Credentials::ApiKey { api_key }) => self
                .events
                .fetch_digest(api_key, latitude, longitude)
                .await
                .map(Payload::Events),
            (SourceKind::Suppliers, Credentials::Suppliers(suppliers)) => self
                .suppliers
                .fetch_digest(suppliers)
                .await
                .map(Payload::Suppliers),
            (source, _) => Err(FetchError::MissingField(format!(
                "{} credentials of the expected shape",
                source
            ))),
        }
    }

    fn synthesize(&self, source: SourceKind, now: DateTime<Utc>) -> Payload {
        synthetic::payload(source, now, self.location)
    }
}
