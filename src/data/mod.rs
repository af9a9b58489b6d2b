//! Feed payloads for the three integrations
//!
//! Each source has its own explicit schema; [`Payload`] is the tagged union
//! the cache stores and hands to the dashboard. Provider-specific clients
//! live in the submodules and parse provider responses into these types.

pub mod events;
pub mod suppliers;
pub mod weather;

pub use events::EventsClient;
pub use suppliers::SupplierClient;
pub use weather::WeatherClient;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceKind;

/// Data produced by one feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Payload {
    Weather(WeatherReport),
    Events(EventsDigest),
    Suppliers(SupplierDigest),
}

impl Payload {
    /// The source this payload belongs to
    pub fn kind(&self) -> SourceKind {
        match self {
            Payload::Weather(_) => SourceKind::Weather,
            Payload::Events(_) => SourceKind::Events,
            Payload::Suppliers(_) => SourceKind::Suppliers,
        }
    }

    /// When the provider (or generator) produced this payload
    pub fn generated_at(&self) -> DateTime<Utc> {
        match self {
            Payload::Weather(w) => w.generated_at,
            Payload::Events(e) => e.generated_at,
            Payload::Suppliers(s) => s.generated_at,
        }
    }

    /// Whether this payload came from the offline generator
    pub fn is_synthetic(&self) -> bool {
        match self {
            Payload::Weather(w) => w.synthetic,
            Payload::Events(e) => e.synthetic,
            Payload::Suppliers(s) => s.synthetic,
        }
    }

    /// One-line description for logs and the CLI
    pub fn summary(&self) -> String {
        match self {
            Payload::Weather(w) => format!(
                "{:.1}°C {:?}, {} day outlook",
                w.current.temperature,
                w.current.condition,
                w.daily.len()
            ),
            Payload::Events(e) => format!(
                "{} upcoming events ({} high impact)",
                e.events.len(),
                e.events.iter().filter(|ev| ev.impact == EventImpact::High).count()
            ),
            Payload::Suppliers(s) => format!(
                "{} suppliers, {} items",
                s.suppliers.len(),
                s.suppliers.values().map(|c| c.items.len()).sum::<usize>()
            ),
        }
    }
}

/// Weather conditions right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Current temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Current weather condition
    pub condition: WeatherCondition,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in km/h
    pub wind: f64,
    /// UV index
    pub uv: f64,
    /// Sunrise time
    pub sunrise: NaiveTime,
    /// Sunset time
    pub sunset: NaiveTime,
}

/// Forecast for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyOutlook {
    pub date: NaiveDate,
    pub condition: WeatherCondition,
    /// Maximum temperature in Celsius
    pub temp_max: f64,
    /// Minimum temperature in Celsius
    pub temp_min: f64,
    /// Highest hourly precipitation probability (0-100)
    pub precipitation_probability: u8,
}

/// Weather feed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub latitude: f64,
    pub longitude: f64,
    pub current: CurrentConditions,
    pub daily: Vec<DailyOutlook>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub synthetic: bool,
}

/// Types of weather conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Showers,
    Thunderstorm,
    Snow,
    Fog,
}

/// Expected effect of an event on local foot traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventImpact {
    Low,
    Medium,
    High,
}

/// An event near the business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub name: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub venue: Option<String>,
    pub category: Option<String>,
    pub expected_attendance: Option<u32>,
    pub impact: EventImpact,
}

/// Local events feed payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsDigest {
    pub events: Vec<LocalEvent>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub synthetic: bool,
}

/// One catalog line offered by a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyItem {
    pub sku: String,
    pub name: String,
    pub unit_price: f64,
    pub in_stock: bool,
    pub lead_time_days: u32,
}

/// Catalog of a single supplier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierCatalog {
    pub items: Vec<SupplyItem>,
}

/// Supplier feed payload, keyed by supplier name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierDigest {
    pub suppliers: BTreeMap<String, SupplierCatalog>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub synthetic: bool,
}
