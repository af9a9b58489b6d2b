//! Ticketmaster Discovery API client for local events
//!
//! Looks up upcoming events within a radius of the business and rates how
//! much foot traffic each is likely to bring.

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{EventImpact, EventsDigest, LocalEvent};
use crate::error::FetchError;

/// Base URL for the Ticketmaster Discovery API
const DISCOVERY_BASE_URL: &str = "https://app.ticketmaster.com/discovery/v2/events.json";

/// Maximum number of events requested per fetch
const PAGE_SIZE: u16 = 50;

/// Client for fetching local events
#[derive(Debug, Clone)]
pub struct EventsClient {
    client: Client,
    base_url: String,
    radius_km: u32,
}

impl EventsClient {
    /// Creates a client searching within `radius_km` of the location
    pub fn new(client: Client, radius_km: u32) -> Self {
        Self {
            client,
            base_url: DISCOVERY_BASE_URL.to_string(),
            radius_km,
        }
    }

    /// Fetches upcoming events around the given coordinates
    pub async fn fetch_digest(&self, api_key: &str, lat: f64, lon: f64) -> Result<EventsDigest, FetchError> {
        let latlong = format!("{},{}", lat, lon);
        let radius = self.radius_km.to_string();
        let size = PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("apikey", api_key),
                ("latlong", latlong.as_str()),
                ("radius", radius.as_str()),
                ("unit", "km"),
                ("sort", "date,asc"),
                ("size", size.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let api_response: DiscoveryResponse = serde_json::from_str(&text)?;
        parse_response(api_response)
    }
}

/// Convert a Discovery response into an EventsDigest
fn parse_response(response: DiscoveryResponse) -> Result<EventsDigest, FetchError> {
    let raw_events = response.embedded.map(|e| e.events).unwrap_or_default();

    let mut events = Vec::with_capacity(raw_events.len());
    for raw in raw_events {
        let local_date = raw
            .dates
            .start
            .local_date
            .ok_or_else(|| FetchError::MissingField(format!("dates.start.localDate ({})", raw.name)))?;
        let date = NaiveDate::parse_from_str(&local_date, "%Y-%m-%d")
            .map_err(|_| FetchError::InvalidTimeFormat(local_date.clone()))?;
        let start_time = raw
            .dates
            .start
            .local_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M:%S").ok());

        let category = raw
            .classifications
            .first()
            .and_then(|c| c.segment.as_ref())
            .map(|s| s.name.clone());
        let venue = raw
            .embedded
            .and_then(|e| e.venues.into_iter().next())
            .map(|v| v.name);

        events.push(LocalEvent {
            impact: impact_for(category.as_deref(), None),
            name: raw.name,
            date,
            start_time,
            venue,
            category,
            expected_attendance: None,
        });
    }

    events.sort_by_key(|e| (e.date, e.start_time));

    Ok(EventsDigest {
        events,
        generated_at: Utc::now(),
        synthetic: false,
    })
}

/// Rates an event's expected effect on foot traffic
///
/// Attendance, when known, wins over the category heuristic.
pub fn impact_for(category: Option<&str>, attendance: Option<u32>) -> EventImpact {
    if let Some(people) = attendance {
        return match people {
            0..=499 => EventImpact::Low,
            500..=4_999 => EventImpact::Medium,
            _ => EventImpact::High,
        };
    }
    match category.map(str::to_ascii_lowercase).as_deref() {
        Some("sports") | Some("music") => EventImpact::High,
        Some("arts & theatre") | Some("film") => EventImpact::Medium,
        _ => EventImpact::Low,
    }
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedEvents>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedEvents {
    #[serde(default)]
    events: Vec<DiscoveryEvent>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryEvent {
    name: String,
    dates: EventDates,
    #[serde(default)]
    classifications: Vec<Classification>,
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedVenues>,
}

#[derive(Debug, Deserialize)]
struct EventDates {
    start: EventStart,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventStart {
    local_date: Option<String>,
    local_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Classification {
    segment: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedVenues {
    #[serde(default)]
    venues: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_RESPONSE: &str = r#"{
        "_embedded": {
            "events": [
                {
                    "name": "Canucks vs. Oilers",
                    "type": "event",
                    "dates": {"start": {"localDate": "2024-07-20", "localTime": "19:00:00"}},
                    "classifications": [{"segment": {"name": "Sports"}}],
                    "_embedded": {"venues": [{"name": "Rogers Arena"}]}
                },
                {
                    "name": "Poetry Night",
                    "dates": {"start": {"localDate": "2024-07-18"}},
                    "classifications": [{"segment": {"name": "Arts & Theatre"}}]
                },
                {
                    "name": "Farmers Market",
                    "dates": {"start": {"localDate": "2024-07-18", "localTime": "09:00:00"}}
                }
            ]
        },
        "page": {"size": 50, "totalElements": 3, "totalPages": 1, "number": 0}
    }"#;

    fn parse(json: &str) -> Result<EventsDigest, FetchError> {
        let response: DiscoveryResponse = serde_json::from_str(json)?;
        parse_response(response)
    }

    #[test]
    fn test_parse_valid_response() {
        let digest = parse(VALID_RESPONSE).expect("Failed to parse events");

        assert_eq!(digest.events.len(), 3);
        assert!(!digest.synthetic);

        // Sorted by date, then start time (no time sorts first)
        assert_eq!(digest.events[0].name, "Poetry Night");
        assert_eq!(digest.events[1].name, "Farmers Market");
        assert_eq!(digest.events[2].name, "Canucks vs. Oilers");

        let game = &digest.events[2];
        assert_eq!(game.venue.as_deref(), Some("Rogers Arena"));
        assert_eq!(game.category.as_deref(), Some("Sports"));
        assert_eq!(game.start_time, NaiveTime::from_hms_opt(19, 0, 0));
        assert_eq!(game.impact, EventImpact::High);

        assert_eq!(digest.events[0].impact, EventImpact::Medium);
        assert_eq!(digest.events[1].impact, EventImpact::Low);
    }

    #[test]
    fn test_no_events_is_empty_digest() {
        let digest = parse(r#"{"page": {"totalElements": 0}}"#).unwrap();
        assert!(digest.events.is_empty());
    }

    #[test]
    fn test_missing_date_is_an_error() {
        let json = r#"{"_embedded": {"events": [{"name": "TBA", "dates": {"start": {}}}]}}"#;
        match parse(json) {
            Err(FetchError::MissingField(field)) => assert!(field.contains("TBA")),
            other => panic!("Expected MissingField error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_is_an_error() {
        let json = r#"{"_embedded": {"events": [{"name": "X", "dates": {"start": {"localDate": "20/07/2024"}}}]}}"#;
        assert!(matches!(parse(json), Err(FetchError::InvalidTimeFormat(_))));
    }

    #[test]
    fn test_impact_heuristics() {
        assert_eq!(impact_for(Some("Music"), None), EventImpact::High);
        assert_eq!(impact_for(Some("Film"), None), EventImpact::Medium);
        assert_eq!(impact_for(Some("Miscellaneous"), None), EventImpact::Low);
        assert_eq!(impact_for(None, None), EventImpact::Low);

        // Attendance overrides category
        assert_eq!(impact_for(Some("Music"), Some(120)), EventImpact::Low);
        assert_eq!(impact_for(None, Some(2_000)), EventImpact::Medium);
        assert_eq!(impact_for(None, Some(20_000)), EventImpact::High);
    }
}
