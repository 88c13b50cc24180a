//! Values derived from a forecast for the rendering layer.

use chrono::{DateTime, Datelike, Utc};
use std::collections::HashSet;

use crate::types::{Alert, ForecastDocument, HourForecast, ResolvedLocation};

pub const HOURLY_WINDOW: usize = 24;

/// Backdrop chosen from the current condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    NoData,
    Clear { day: bool },
    Cloudy { day: bool },
    Rain,
    Snow,
    Thunderstorm,
    Default { day: bool },
}

impl Theme {
    pub fn for_forecast(document: Option<&ForecastDocument>) -> Self {
        match document {
            Some(doc) => Self::from_condition(doc.current.condition.code, doc.current.is_day()),
            None => Self::NoData,
        }
    }

    pub fn from_condition(code: u32, day: bool) -> Self {
        match code {
            1000 => Self::Clear { day },
            1003..=1009 => Self::Cloudy { day },
            1063..=1201 | 1240..=1246 => Self::Rain,
            1210..=1237 | 1255..=1264 => Self::Snow,
            1273..=1282 => Self::Thunderstorm,
            _ => Self::Default { day },
        }
    }
}

/// US EPA air quality band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirQualityTier {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    /// Index below 1 or outside the EPA scale.
    Unknown,
}

impl AirQualityTier {
    pub fn from_epa_index(index: i32) -> Self {
        match index {
            1 => Self::Good,
            2 => Self::Moderate,
            3 => Self::UnhealthySensitive,
            4 => Self::Unhealthy,
            5 => Self::VeryUnhealthy,
            6 => Self::Hazardous,
            _ => Self::Unknown,
        }
    }

    /// `None` when the forecast carries no EPA reading at all.
    pub fn for_forecast(document: &ForecastDocument) -> Option<Self> {
        document
            .current
            .air_quality
            .as_ref()
            .and_then(|aq| aq.us_epa_index)
            .map(Self::from_epa_index)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthySensitive => "Unhealthy (Sensitive)",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
            Self::Unknown => "Unknown",
        }
    }

    fn index(&self) -> Option<u8> {
        match self {
            Self::Good => Some(1),
            Self::Moderate => Some(2),
            Self::UnhealthySensitive => Some(3),
            Self::Unhealthy => Some(4),
            Self::VeryUnhealthy => Some(5),
            Self::Hazardous => Some(6),
            Self::Unknown => None,
        }
    }

    /// Position of the indicator along the scale, 0.0 to 100.0
    pub fn indicator_position(&self) -> Option<f64> {
        self.index().map(|index| f64::from(index - 1) / 5.0 * 100.0)
    }
}

pub fn uv_level(uv: f64) -> &'static str {
    if uv <= 2.0 {
        "Low"
    } else if uv <= 5.0 {
        "Moderate"
    } else if uv <= 7.0 {
        "High"
    } else if uv <= 10.0 {
        "Very High"
    } else {
        "Extreme"
    }
}

/// The next [`HOURLY_WINDOW`] hours starting with the current one, spanning
/// the first two forecast days.
pub fn hourly_window(document: &ForecastDocument, now: DateTime<Utc>) -> Vec<&HourForecast> {
    let now_ms = now.timestamp_millis();
    document
        .forecast
        .forecastday
        .iter()
        .take(2)
        .flat_map(|day| day.hour.iter())
        .filter(|hour| hour.time_epoch * 1000 >= now_ms)
        .take(HOURLY_WINDOW)
        .collect()
}

/// "Today" for the first forecast day, the short weekday name otherwise.
pub fn day_label(document: &ForecastDocument, index: usize) -> Option<String> {
    let day = document.forecast.forecastday.get(index)?;
    if index == 0 {
        return Some("Today".to_string());
    }
    Some(day.date.weekday().to_string())
}

pub fn location_subtitle(location: &ResolvedLocation) -> String {
    match location.region.as_deref() {
        Some(region) => format!("{}, {}", region, location.country),
        None => location.country.clone(),
    }
}

pub fn last_updated_label(last_update: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - last_update).num_minutes().max(0);
    let ago = match minutes {
        0 => return "Last updated just now".to_string(),
        1 => "1 minute".to_string(),
        m if m < 60 => format!("{} minutes", m),
        m if m < 120 => "1 hour".to_string(),
        m if m < 60 * 24 => format!("{} hours", m / 60),
        m if m < 60 * 48 => "1 day".to_string(),
        m => format!("{} days", m / (60 * 24)),
    };
    format!("Last updated {} ago", ago)
}

/// Alerts whose headline has not been dismissed.
pub fn visible_alerts<'a>(
    document: &'a ForecastDocument,
    dismissed: &HashSet<String>,
) -> Vec<&'a Alert> {
    document
        .alerts
        .iter()
        .flat_map(|alerts| alerts.alert.iter())
        .filter(|alert| !dismissed.contains(&alert.headline))
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::fixtures;
    use chrono::Duration;

    #[test]
    fn test_theme_ranges() {
        assert_eq!(Theme::from_condition(1000, true), Theme::Clear { day: true });
        assert_eq!(Theme::from_condition(1000, false), Theme::Clear { day: false });
        assert_eq!(Theme::from_condition(1006, true), Theme::Cloudy { day: true });
        assert_eq!(Theme::from_condition(1183, true), Theme::Rain);
        assert_eq!(Theme::from_condition(1243, false), Theme::Rain);
        assert_eq!(Theme::from_condition(1213, true), Theme::Snow);
        assert_eq!(Theme::from_condition(1258, true), Theme::Snow);
        assert_eq!(Theme::from_condition(1276, true), Theme::Thunderstorm);
        assert_eq!(Theme::from_condition(1030, false), Theme::Default { day: false });
        assert_eq!(Theme::for_forecast(None), Theme::NoData);
        assert_eq!(
            Theme::for_forecast(Some(&fixtures::forecast())),
            Theme::Cloudy { day: true }
        );
    }

    #[test]
    fn test_air_quality_labels() {
        let cases = [
            (-1, "Unknown"),
            (0, "Unknown"),
            (1, "Good"),
            (2, "Moderate"),
            (3, "Unhealthy (Sensitive)"),
            (4, "Unhealthy"),
            (5, "Very Unhealthy"),
            (6, "Hazardous"),
            (7, "Unknown"),
        ];
        for (index, expected) in cases {
            assert_eq!(
                AirQualityTier::from_epa_index(index).label(),
                expected,
                "EPA index {}",
                index
            );
        }
    }

    #[test]
    fn test_air_quality_indicator() {
        let tier = AirQualityTier::for_forecast(&fixtures::forecast()).unwrap();
        assert_eq!(tier, AirQualityTier::Moderate);
        assert_eq!(tier.indicator_position(), Some(20.0));
        assert_eq!(AirQualityTier::Good.indicator_position(), Some(0.0));
        assert_eq!(AirQualityTier::Hazardous.indicator_position(), Some(100.0));
        assert_eq!(AirQualityTier::Unknown.indicator_position(), None);

        let mut doc = fixtures::forecast();
        doc.current.air_quality = None;
        assert_eq!(AirQualityTier::for_forecast(&doc), None);
    }

    #[test]
    fn test_uv_levels() {
        let cases = [
            (0.0, "Low"),
            (2.0, "Low"),
            (3.0, "Moderate"),
            (5.0, "Moderate"),
            (6.0, "High"),
            (7.0, "High"),
            (8.0, "Very High"),
            (10.0, "Very High"),
            (11.0, "Extreme"),
        ];
        for (uv, expected) in cases {
            assert_eq!(uv_level(uv), expected, "UV {}", uv);
        }
    }

    #[test]
    fn test_hourly_window_starts_at_now_and_crosses_midnight() {
        let doc = fixtures::forecast();
        let now = DateTime::from_timestamp(1_700_042_400, 0).unwrap();
        let hours: Vec<i64> = hourly_window(&doc, now).iter().map(|h| h.time_epoch).collect();
        assert_eq!(hours, vec![1_700_042_400, 1_700_046_000, 1_700_092_800, 1_700_096_400]);
    }

    #[test]
    fn test_day_labels() {
        let doc = fixtures::forecast();
        assert_eq!(day_label(&doc, 0).as_deref(), Some("Today"));
        assert_eq!(day_label(&doc, 1).as_deref(), Some("Thu"));
        assert_eq!(day_label(&doc, 5), None);
    }

    #[test]
    fn test_location_subtitle() {
        let mut location = fixtures::forecast().location;
        assert_eq!(
            location_subtitle(&location),
            "City of London, Greater London, United Kingdom"
        );
        location.region = None;
        assert_eq!(location_subtitle(&location), "United Kingdom");
    }

    #[test]
    fn test_last_updated_label() {
        let now = Utc::now();
        assert_eq!(last_updated_label(now, now), "Last updated just now");
        assert_eq!(
            last_updated_label(now - Duration::minutes(10), now),
            "Last updated 10 minutes ago"
        );
        assert_eq!(
            last_updated_label(now - Duration::minutes(1), now),
            "Last updated 1 minute ago"
        );
        assert_eq!(
            last_updated_label(now - Duration::minutes(185), now),
            "Last updated 3 hours ago"
        );
        assert_eq!(
            last_updated_label(now - Duration::days(3), now),
            "Last updated 3 days ago"
        );
    }

    #[test]
    fn test_dismissed_alerts_hidden() {
        let doc = fixtures::forecast();
        assert_eq!(visible_alerts(&doc, &HashSet::new()).len(), 1);
        let dismissed = HashSet::from(["Yellow warning of rain".to_string()]);
        assert!(visible_alerts(&doc, &dismissed).is_empty());
    }
}
