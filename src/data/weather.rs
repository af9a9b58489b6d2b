//! Open-Meteo weather API client
//!
//! Fetches current conditions and a daily outlook from the Open-Meteo
//! customer API (keyed access) and parses them into a [`WeatherReport`].

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{CurrentConditions, DailyOutlook, WeatherCondition, WeatherReport};
use crate::error::FetchError;

/// Base URL for the keyed Open-Meteo API
const OPEN_METEO_BASE_URL: &str = "https://customer-api.open-meteo.com/v1/forecast";

/// Number of forecast days requested
const FORECAST_DAYS: u8 = 7;

/// Client for fetching weather data from Open-Meteo API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl WeatherClient {
    /// Create a new WeatherClient sharing the given HTTP client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: OPEN_METEO_BASE_URL.to_string(),
        }
    }

    /// Fetch current conditions and a daily outlook for the given coordinates
    ///
    /// # Arguments
    /// * `api_key` - Open-Meteo customer API key
    /// * `lat` - Latitude coordinate
    /// * `lon` - Longitude coordinate
    ///
    /// # Returns
    /// * `Ok(WeatherReport)` - Weather data for the location
    /// * `Err(FetchError)` - If the request or parsing fails
    pub async fn fetch_report(&self, api_key: &str, lat: f64, lon: f64) -> Result<WeatherReport, FetchError> {
        let url = format!(
            "{}?latitude={}&longitude={}&current=temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m&daily=weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max,sunrise,sunset,uv_index_max&forecast_days={}&timezone=auto",
            self.base_url, lat, lon, FORECAST_DAYS
        );

        let response = self
            .client
            .get(&url)
            .query(&[("apikey", api_key)])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message: provider_reason(&text),
            });
        }

        let api_response: OpenMeteoResponse = serde_json::from_str(&text)?;
        parse_response(api_response, lat, lon)
    }
}

/// Extracts Open-Meteo's `reason` field from an error body
fn provider_reason(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        reason: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.reason)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

/// Parse the Open-Meteo API response into a WeatherReport
fn parse_response(response: OpenMeteoResponse, lat: f64, lon: f64) -> Result<WeatherReport, FetchError> {
    let current = response.current;
    let daily = response.daily;

    // Extract UV index (first day's max)
    let uv = daily
        .uv_index_max
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| FetchError::MissingField("uv_index_max".to_string()))?;

    let sunrise_str = daily
        .sunrise
        .first()
        .ok_or_else(|| FetchError::MissingField("sunrise".to_string()))?;
    let sunrise = parse_time(sunrise_str)?;

    let sunset_str = daily
        .sunset
        .first()
        .ok_or_else(|| FetchError::MissingField("sunset".to_string()))?;
    let sunset = parse_time(sunset_str)?;

    Ok(WeatherReport {
        latitude: lat,
        longitude: lon,
        current: CurrentConditions {
            temperature: current.temperature_2m,
            feels_like: current.apparent_temperature,
            condition: weather_code_to_condition(current.weather_code),
            humidity: current.relative_humidity_2m.clamp(0.0, 100.0) as u8,
            wind: current.wind_speed_10m,
            uv,
            sunrise,
            sunset,
        },
        daily: parse_daily(&daily)?,
        generated_at: Utc::now(),
        synthetic: false,
    })
}

/// Parse daily weather arrays into DailyOutlook entries
fn parse_daily(daily: &DailyWeather) -> Result<Vec<DailyOutlook>, FetchError> {
    let len = daily.time.len();

    // Validate that all arrays have the same length
    if daily.weather_code.len() != len
        || daily.temperature_2m_max.len() != len
        || daily.temperature_2m_min.len() != len
        || daily.precipitation_probability_max.len() != len
    {
        return Err(FetchError::MissingField(
            "daily arrays have inconsistent lengths".to_string(),
        ));
    }

    let mut outlook = Vec::with_capacity(len);
    for i in 0..len {
        let date = NaiveDate::parse_from_str(&daily.time[i], "%Y-%m-%d")
            .map_err(|_| FetchError::InvalidTimeFormat(daily.time[i].clone()))?;
        outlook.push(DailyOutlook {
            date,
            condition: weather_code_to_condition(daily.weather_code[i]),
            temp_max: daily.temperature_2m_max[i],
            temp_min: daily.temperature_2m_min[i],
            precipitation_probability: daily.precipitation_probability_max[i]
                .unwrap_or(0.0)
                .clamp(0.0, 100.0) as u8,
        });
    }

    Ok(outlook)
}

/// Parse a time string in ISO 8601 format (e.g., "2024-07-15T05:30") to NaiveTime
fn parse_time(time_str: &str) -> Result<NaiveTime, FetchError> {
    // Extract the time portion after 'T'
    let time_part = time_str
        .split('T')
        .nth(1)
        .ok_or_else(|| FetchError::InvalidTimeFormat(time_str.to_string()))?;

    NaiveTime::parse_from_str(time_part, "%H:%M")
        .map_err(|_| FetchError::InvalidTimeFormat(time_str.to_string()))
}

/// Map a WMO weather code to a WeatherCondition
pub fn weather_code_to_condition(code: u8) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Clear,
        1..=3 => WeatherCondition::PartlyCloudy,
        45 | 48 => WeatherCondition::Fog,
        51..=55 | 61..=65 | 80..=82 => WeatherCondition::Rain,
        56..=57 | 66..=67 => WeatherCondition::Showers,
        71..=77 | 85..=86 => WeatherCondition::Snow,
        95..=99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Cloudy, // Default for unknown codes
    }
}

/// Open-Meteo API response structure
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: CurrentWeather,
    daily: DailyWeather,
}

/// Current weather data from Open-Meteo
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    weather_code: u8,
    wind_speed_10m: f64,
}

/// Daily weather data from Open-Meteo
#[derive(Debug, Deserialize)]
struct DailyWeather {
    time: Vec<String>,
    weather_code: Vec<u8>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    precipitation_probability_max: Vec<Option<f64>>,
    sunrise: Vec<String>,
    sunset: Vec<String>,
    uv_index_max: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample valid Open-Meteo API response
    const VALID_RESPONSE: &str = r#"{
        "latitude": 49.28,
        "longitude": -123.12,
        "generationtime_ms": 0.123,
        "utc_offset_seconds": -25200,
        "timezone": "America/Vancouver",
        "timezone_abbreviation": "PDT",
        "elevation": 5.0,
        "current": {
            "time": "2024-07-15T14:00",
            "interval": 900,
            "temperature_2m": 22.5,
            "relative_humidity_2m": 65,
            "apparent_temperature": 23.8,
            "weather_code": 2,
            "wind_speed_10m": 12.5
        },
        "daily": {
            "time": ["2024-07-15", "2024-07-16", "2024-07-17"],
            "weather_code": [2, 61, 0],
            "temperature_2m_max": [24.8, 19.0, 26.1],
            "temperature_2m_min": [14.0, 13.2, 15.5],
            "precipitation_probability_max": [10, 85, null],
            "sunrise": ["2024-07-15T05:30", "2024-07-16T05:31", "2024-07-17T05:32"],
            "sunset": ["2024-07-15T21:15", "2024-07-16T21:14", "2024-07-17T21:13"],
            "uv_index_max": [7.5, 3.0, 8.1]
        }
    }"#;

    fn parse(json: &str) -> Result<WeatherReport, FetchError> {
        let response: OpenMeteoResponse = serde_json::from_str(json)?;
        parse_response(response, 49.28, -123.12)
    }

    #[test]
    fn test_parse_valid_response() {
        let report = parse(VALID_RESPONSE).expect("Failed to parse weather");
        let current = &report.current;

        assert!((current.temperature - 22.5).abs() < 0.01);
        assert!((current.feels_like - 23.8).abs() < 0.01);
        assert_eq!(current.condition, WeatherCondition::PartlyCloudy);
        assert_eq!(current.humidity, 65);
        assert!((current.wind - 12.5).abs() < 0.01);
        assert!((current.uv - 7.5).abs() < 0.01);
        assert_eq!(current.sunrise, NaiveTime::from_hms_opt(5, 30, 0).unwrap());
        assert_eq!(current.sunset, NaiveTime::from_hms_opt(21, 15, 0).unwrap());
        assert!(!report.synthetic);
    }

    #[test]
    fn test_parse_daily_outlook() {
        let report = parse(VALID_RESPONSE).expect("Failed to parse weather");

        assert_eq!(report.daily.len(), 3);
        assert_eq!(report.daily[0].date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(report.daily[1].condition, WeatherCondition::Rain);
        assert_eq!(report.daily[1].precipitation_probability, 85);
        // null probability reads as zero
        assert_eq!(report.daily[2].precipitation_probability, 0);
        assert!((report.daily[2].temp_max - 26.1).abs() < 0.01);
    }

    #[test]
    fn test_weather_code_mapping() {
        assert_eq!(weather_code_to_condition(0), WeatherCondition::Clear);
        assert_eq!(weather_code_to_condition(2), WeatherCondition::PartlyCloudy);
        assert_eq!(weather_code_to_condition(45), WeatherCondition::Fog);
        assert_eq!(weather_code_to_condition(63), WeatherCondition::Rain);
        assert_eq!(weather_code_to_condition(81), WeatherCondition::Rain);
        assert_eq!(weather_code_to_condition(66), WeatherCondition::Showers);
        assert_eq!(weather_code_to_condition(75), WeatherCondition::Snow);
        assert_eq!(weather_code_to_condition(86), WeatherCondition::Snow);
        assert_eq!(weather_code_to_condition(95), WeatherCondition::Thunderstorm);

        // Unknown codes default to Cloudy
        assert_eq!(weather_code_to_condition(100), WeatherCondition::Cloudy);
        assert_eq!(weather_code_to_condition(255), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_parse_time() {
        let time = parse_time("2024-07-15T05:30").expect("Failed to parse time");
        assert_eq!(time, NaiveTime::from_hms_opt(5, 30, 0).unwrap());

        // Missing T separator
        assert!(parse_time("2024-07-15 05:30").is_err());
        assert!(parse_time("not a time").is_err());
    }

    #[test]
    fn test_parse_malformed_json() {
        let result = parse("{ invalid json }");
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_parse_empty_daily_arrays() {
        let empty_arrays = r#"{
            "current": {
                "temperature_2m": 22.5,
                "relative_humidity_2m": 65,
                "apparent_temperature": 23.8,
                "weather_code": 2,
                "wind_speed_10m": 12.5
            },
            "daily": {
                "time": [],
                "weather_code": [],
                "temperature_2m_max": [],
                "temperature_2m_min": [],
                "precipitation_probability_max": [],
                "sunrise": [],
                "sunset": [],
                "uv_index_max": []
            }
        }"#;

        match parse(empty_arrays) {
            Err(FetchError::MissingField(field)) => assert_eq!(field, "uv_index_max"),
            other => panic!("Expected MissingField error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inconsistent_daily_lengths() {
        let daily = DailyWeather {
            time: vec!["2024-07-15".to_string(), "2024-07-16".to_string()],
            weather_code: vec![0],
            temperature_2m_max: vec![20.0, 21.0],
            temperature_2m_min: vec![10.0, 11.0],
            precipitation_probability_max: vec![None, None],
            sunrise: vec![],
            sunset: vec![],
            uv_index_max: vec![],
        };

        match parse_daily(&daily) {
            Err(FetchError::MissingField(msg)) => assert!(msg.contains("inconsistent lengths")),
            other => panic!("Expected MissingField error, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_reason_extraction() {
        assert_eq!(
            provider_reason(r#"{"error": true, "reason": "Invalid API key"}"#),
            "Invalid API key"
        );
        assert_eq!(provider_reason("Bad Gateway"), "Bad Gateway");
    }
}
