//! Deterministic stand-in payloads
//!
//! Used when a source has never produced real data. Values are plausible
//! rather than random: they depend only on the source, the calendar day and
//! the location, so the same inputs always give the same payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};

use crate::data::{
    events::impact_for, CurrentConditions, DailyOutlook, EventsDigest, LocalEvent, Payload,
    SupplierCatalog, SupplierDigest, SupplyItem, WeatherCondition, WeatherReport,
};
use crate::settings::Location;
use crate::source::SourceKind;

/// Small linear congruential generator seeded per day
struct Jitter(u64);

impl Jitter {
    fn new(source: SourceKind, now: DateTime<Utc>) -> Self {
        let day = now.date_naive().num_days_from_ce() as u64;
        Self(day.wrapping_mul(31).wrapping_add(source.index() as u64 + 1))
    }

    /// Next value in [0, 1)
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Next value in [lo, hi)
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next()
    }
}

/// Builds the stand-in payload for `source`
pub fn payload(source: SourceKind, now: DateTime<Utc>, location: Location) -> Payload {
    match source {
        SourceKind::Weather => Payload::Weather(weather(now, location)),
        SourceKind::Events => Payload::Events(events(now)),
        SourceKind::Suppliers => Payload::Suppliers(suppliers(now)),
    }
}

const CONDITIONS: [WeatherCondition; 5] = [
    WeatherCondition::Clear,
    WeatherCondition::PartlyCloudy,
    WeatherCondition::Cloudy,
    WeatherCondition::Rain,
    WeatherCondition::Showers,
];

/// Seasonal mean temperature for a northern-hemisphere day of year
fn seasonal_mean(day_of_year: u32) -> f64 {
    let phase = (day_of_year as f64 - 200.0) / 365.0 * std::f64::consts::TAU;
    11.0 + 8.0 * phase.cos()
}

fn weather(now: DateTime<Utc>, location: Location) -> WeatherReport {
    let mut jitter = Jitter::new(SourceKind::Weather, now);
    let today = now.date_naive();

    let daily: Vec<DailyOutlook> = (0..7)
        .map(|offset| {
            let date = today + Duration::days(offset);
            let mean = seasonal_mean(date.ordinal());
            let condition = CONDITIONS[(jitter.next() * CONDITIONS.len() as f64) as usize % CONDITIONS.len()];
            let wet = matches!(condition, WeatherCondition::Rain | WeatherCondition::Showers);
            DailyOutlook {
                date,
                condition,
                temp_max: (mean + jitter.range(3.0, 6.0)).round(),
                temp_min: (mean - jitter.range(3.0, 6.0)).round(),
                precipitation_probability: if wet {
                    jitter.range(60.0, 95.0) as u8
                } else {
                    jitter.range(0.0, 30.0) as u8
                },
            }
        })
        .collect();

    let first = &daily[0];
    let temperature = ((first.temp_max + first.temp_min) / 2.0 * 10.0).round() / 10.0;

    WeatherReport {
        latitude: location.latitude,
        longitude: location.longitude,
        current: CurrentConditions {
            temperature,
            feels_like: temperature - 1.0,
            condition: first.condition,
            humidity: jitter.range(45.0, 85.0) as u8,
            wind: (jitter.range(3.0, 25.0) * 10.0).round() / 10.0,
            uv: (jitter.range(0.0, 8.0) * 10.0).round() / 10.0,
            sunrise: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
            sunset: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default(),
        },
        daily,
        generated_at: now,
        synthetic: true,
    }
}

fn events(now: DateTime<Utc>) -> EventsDigest {
    let mut jitter = Jitter::new(SourceKind::Events, now);
    let today = now.date_naive();
    let days_to_saturday =
        (Weekday::Sat.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;

    let templates = [
        ("Farmers Market", days_to_saturday as i64, "Community", 1_200.0, 2_500.0),
        ("Neighbourhood Street Festival", 9, "Community", 4_000.0, 12_000.0),
        ("Live Jazz in the Park", 3, "Music", 300.0, 900.0),
        ("Weekend Craft Fair", days_to_saturday as i64 + 7, "Arts & Theatre", 400.0, 1_500.0),
    ];

    let mut events: Vec<LocalEvent> = templates
        .iter()
        .map(|(name, offset, category, lo, hi)| {
            let attendance = jitter.range(*lo, *hi).round() as u32;
            LocalEvent {
                name: name.to_string(),
                date: today + Duration::days(*offset),
                start_time: NaiveTime::from_hms_opt(10, 0, 0),
                venue: None,
                category: Some(category.to_string()),
                expected_attendance: Some(attendance),
                impact: impact_for(Some(*category), Some(attendance)),
            }
        })
        .collect();
    events.sort_by_key(|e| e.date);

    EventsDigest {
        events,
        generated_at: now,
        synthetic: true,
    }
}

fn suppliers(now: DateTime<Utc>) -> SupplierDigest {
    let mut jitter = Jitter::new(SourceKind::Suppliers, now);
    let catalogs = [
        (
            "northwind-wholesale",
            vec![("NW-COF-1KG", "Espresso beans 1kg", 24.0), ("NW-MLK-4L", "Whole milk 4L", 6.5)],
        ),
        (
            "harbor-produce",
            vec![("HP-LEM-CS", "Lemons, case", 32.0), ("HP-MNT-BN", "Mint, bunch", 1.8)],
        ),
    ];

    let mut suppliers = BTreeMap::new();
    for (name, lines) in catalogs {
        let items = lines
            .into_iter()
            .map(|(sku, item, base_price)| SupplyItem {
                sku: sku.to_string(),
                name: item.to_string(),
                unit_price: (base_price * jitter.range(0.95, 1.05) * 100.0).round() / 100.0,
                in_stock: jitter.next() > 0.15,
                lead_time_days: jitter.range(1.0, 6.0) as u32,
            })
            .collect();
        suppliers.insert(name.to_string(), SupplierCatalog { items });
    }

    SupplierDigest {
        suppliers,
        generated_at: now,
        synthetic: true,
    }
}
