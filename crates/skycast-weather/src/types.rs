use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WeatherError;

/// Canonical location string handed to the gateway: `"<lat>,<lon>"`, a place
/// name or a postal code. The gateway decides whether it resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationQuery(String);

impl LocationQuery {
    /// Trims the input; empty or whitespace-only input is rejected.
    pub fn new(query: impl Into<String>) -> Result<Self, WeatherError> {
        let query = query.into();
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::Validation("location query is empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn from_coordinates(coordinates: Coordinates) -> Self {
        Self(format!("{},{}", coordinates.latitude, coordinates.longitude))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LocationQuery {
    type Error = WeatherError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocationQuery> for String {
    fn from(query: LocationQuery) -> Self {
        query.0
    }
}

/// A geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One result of a location search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub region: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl LocationCandidate {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.lat,
            longitude: self.lon,
        }
    }

    /// Text written back into the search box after a pick
    pub fn label(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }
}

/// Place a forecast was resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub region: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub icon: String,
    pub code: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    #[serde(rename = "us-epa-index", default, skip_serializing_if = "Option::is_none")]
    pub us_epa_index: Option<i32>,
    #[serde(rename = "gb-defra-index", default, skip_serializing_if = "Option::is_none")]
    pub gb_defra_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub so2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm2_5: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm10: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub feelslike_c: f64,
    pub condition: Condition,
    pub humidity: u8,
    pub wind_kph: f64,
    pub wind_dir: String,
    pub vis_km: f64,
    pub uv: f64,
    pub pressure_mb: f64,
    pub cloud: u8,
    pub is_day: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<AirQuality>,
}

impl CurrentConditions {
    pub fn is_day(&self) -> bool {
        self.is_day == 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub mintemp_c: f64,
    pub daily_chance_of_rain: u8,
    pub maxwind_kph: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
    pub moon_phase: String,
    pub moon_illumination: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourForecast {
    pub time: String,
    pub time_epoch: i64,
    pub temp_c: f64,
    pub condition: Condition,
    pub chance_of_rain: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub day: DaySummary,
    pub astro: Astro,
    #[serde(default)]
    pub hour: Vec<HourForecast>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub headline: String,
    pub event: String,
    pub severity: String,
    pub urgency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub areas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub alert: Vec<Alert>,
}

/// A complete forecast as handed to the rendering layer.
///
/// Immutable once fetched; the gateway client normalizes icon URLs before
/// returning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDocument {
    pub location: ResolvedLocation,
    pub current: CurrentConditions,
    pub forecast: Forecast,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Alerts>,
}

impl ForecastDocument {
    /// Rewrites protocol-relative icon URLs (`//cdn...`) to `https:` ones.
    pub fn with_absolute_icons(mut self) -> Self {
        self.current.condition.absolutize_icon();
        for day in &mut self.forecast.forecastday {
            day.day.condition.absolutize_icon();
            for hour in &mut day.hour {
                hour.condition.absolutize_icon();
            }
        }
        self
    }

    pub fn today(&self) -> Option<&ForecastDay> {
        self.forecast.forecastday.first()
    }
}

/// Response of the current-conditions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReport {
    pub location: ResolvedLocation,
    pub current: CurrentConditions,
}

impl CurrentReport {
    pub fn with_absolute_icons(mut self) -> Self {
        self.current.condition.absolutize_icon();
        self
    }
}

impl Condition {
    fn absolutize_icon(&mut self) {
        if let Some(rest) = self.icon.strip_prefix("//") {
            self.icon = format!("https://{}", rest);
        }
    }
}

/// Last known good forecast for the stored location.
///
/// `weather_data` is always the document that was current as of `last_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub location: LocationQuery,
    pub weather_data: ForecastDocument,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_query_trims_and_rejects_blank() {
        assert_eq!(LocationQuery::new("  London ").unwrap().as_str(), "London");
        assert!(matches!(
            LocationQuery::new("   "),
            Err(WeatherError::Validation(_))
        ));
        assert!(LocationQuery::new("").is_err());
    }

    #[test]
    fn test_query_from_coordinates() {
        let query = LocationQuery::from_coordinates(Coordinates {
            latitude: 12.97,
            longitude: 77.59,
        });
        assert_eq!(query.as_str(), "12.97,77.59");
    }

    #[test]
    fn test_query_deserialization_rejects_empty() {
        assert!(serde_json::from_str::<LocationQuery>("\"\"").is_err());
        let query: LocationQuery = serde_json::from_str("\"SW1\"").unwrap();
        assert_eq!(query.as_str(), "SW1");
    }

    #[test]
    fn test_fixture_parses() {
        let doc = fixtures::forecast();
        assert_eq!(doc.location.name, "London");
        assert_eq!(doc.location.region.as_deref(), Some("City of London, Greater London"));
        assert_eq!(doc.forecast.forecastday.len(), 2);
        assert_eq!(doc.current.air_quality.as_ref().and_then(|a| a.us_epa_index), Some(2));
        assert_eq!(doc.alerts.as_ref().map(|a| a.alert.len()), Some(1));
        assert_eq!(
            doc.today().map(|day| day.date.to_string()).as_deref(),
            Some("2023-11-15")
        );
    }

    #[test]
    fn test_icons_become_absolute() {
        let doc = fixtures::forecast().with_absolute_icons();
        assert_eq!(
            doc.current.condition.icon,
            "https://cdn.weatherapi.com/weather/64x64/day/116.png"
        );
        for day in &doc.forecast.forecastday {
            assert!(day.day.condition.icon.starts_with("https://"));
            assert!(day.hour.iter().all(|h| h.condition.icon.starts_with("https://")));
        }
    }

    #[test]
    fn test_absolute_icons_left_alone() {
        let mut condition = Condition {
            text: "Sunny".into(),
            icon: "https://example.com/sun.png".into(),
            code: 1000,
        };
        condition.absolutize_icon();
        assert_eq!(condition.icon, "https://example.com/sun.png");
    }

    #[test]
    fn test_empty_region_is_none() {
        let candidate: LocationCandidate = serde_json::from_str(
            r#"{"id":1,"name":"Paris","region":"","country":"France","lat":48.87,"lon":2.33,"url":"paris"}"#,
        )
        .unwrap();
        assert!(candidate.region.is_none());
    }

    #[test]
    fn test_snapshot_uses_store_key_names() {
        let snapshot = CacheSnapshot {
            location: fixtures::query("London"),
            weather_data: fixtures::forecast(),
            last_update: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["location"], "London");
        assert_eq!(value["lastUpdate"], 1_700_000_000_000_i64);
        assert!(value["weatherData"]["current"].is_object());
    }
}
