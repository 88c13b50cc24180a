//! Classified failures of the weather core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything the core can fail with.
///
/// `Clone` so a single fetch outcome can be handed to every caller that
/// attached to it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("Invalid location query: {0}")]
    Validation(String),

    #[error("Location unavailable: {0}")]
    Permission(String),

    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Rate limited by weather provider")]
    RateLimited,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// `status` is 0 when the failure did not come from an HTTP response.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway misconfigured: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Superseded by a newer location or reset")]
    Superseded,
}

/// Wire-safe tag for a [`WeatherError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Permission,
    NotFound,
    RateLimited,
    Unauthorized,
    Upstream,
    Network,
    Configuration,
    Store,
    Superseded,
}

impl WeatherError {
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::Permission(_) => FailureKind::Permission,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::RateLimited => FailureKind::RateLimited,
            Self::Unauthorized(_) => FailureKind::Unauthorized,
            Self::Upstream { .. } => FailureKind::Upstream,
            Self::Network(_) => FailureKind::Network,
            Self::Configuration(_) => FailureKind::Configuration,
            Self::Store(_) => FailureKind::Store,
            Self::Superseded => FailureKind::Superseded,
        }
    }

    /// Rebuild an error from a [`FailureKind`] and its detail text.
    pub fn from_kind(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            FailureKind::Validation => Self::Validation(message),
            FailureKind::Permission => Self::Permission(message),
            FailureKind::NotFound => Self::NotFound(message),
            FailureKind::RateLimited => Self::RateLimited,
            FailureKind::Unauthorized => Self::Unauthorized(message),
            FailureKind::Upstream => Self::upstream(0, message),
            FailureKind::Network => Self::Network(message),
            FailureKind::Configuration => Self::Configuration(message),
            FailureKind::Store => Self::Store(message),
            FailureKind::Superseded => Self::Superseded,
        }
    }

    /// The detail carried by the variant, without the category prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(m)
            | Self::Permission(m)
            | Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Network(m)
            | Self::Configuration(m)
            | Self::Store(m) => m.clone(),
            Self::Upstream { message, .. } => message.clone(),
            Self::RateLimited | Self::Superseded => self.to_string(),
        }
    }

    /// Message suitable for a banner or error screen.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Please enter a city, postal code or coordinates.".to_string(),
            Self::Permission(hint) => hint.clone(),
            Self::NotFound(_) => "Location not found. Check and try again.".to_string(),
            Self::RateLimited => {
                "Too many weather requests. Please wait a moment and try again.".to_string()
            }
            Self::Unauthorized(_) => {
                "The weather service rejected our credentials. Please try again later.".to_string()
            }
            Self::Upstream { status, .. } if *status >= 500 => {
                "The weather service is having trouble. Please try again later.".to_string()
            }
            Self::Upstream { .. } => "Failed to fetch weather data. Please try again.".to_string(),
            Self::Network(_) => {
                "Unable to reach the weather service. Check your connection.".to_string()
            }
            Self::Configuration(_) => "The weather service is not configured.".to_string(),
            Self::Store(_) => "Saved weather data could not be accessed.".to_string(),
            Self::Superseded => "A newer request replaced this one.".to_string(),
        }
    }

    /// Whether trying the same request again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Network(_) | Self::Upstream { .. } | Self::Store(_)
        )
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::upstream(0, format!("invalid response body: {}", e))
        } else if let Some(status) = e.status() {
            Self::upstream(status.as_u16(), e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_wire_tag() {
        let errors = [
            WeatherError::Validation("empty".into()),
            WeatherError::NotFound("Atlantis".into()),
            WeatherError::RateLimited,
            WeatherError::Network("refused".into()),
            WeatherError::Superseded,
        ];
        for err in errors {
            let json = serde_json::to_string(&err.kind()).unwrap_or_default();
            let kind: Option<FailureKind> = serde_json::from_str(&json).ok();
            assert_eq!(kind, Some(err.kind()), "{json}");
        }
        assert_eq!(
            serde_json::to_string(&FailureKind::NotFound).ok().as_deref(),
            Some("\"not_found\"")
        );
    }

    #[test]
    fn test_from_kind_uses_status_zero_for_upstream() {
        let err = WeatherError::from_kind(FailureKind::Upstream, "bad gateway");
        assert_eq!(err, WeatherError::upstream(0, "bad gateway"));
    }

    #[test]
    fn test_detail_rebuilds_same_error() {
        let err = WeatherError::NotFound("Atlantis".into());
        assert_eq!(WeatherError::from_kind(err.kind(), err.detail()), err);
        let err = WeatherError::RateLimited;
        assert_eq!(WeatherError::from_kind(err.kind(), err.detail()), err);
    }

    #[test]
    fn test_user_messages() {
        assert!(WeatherError::NotFound("x".into()).user_message().contains("not found"));
        assert!(WeatherError::upstream(502, "x").user_message().contains("later"));
        assert_eq!(
            WeatherError::Permission("Please enter a city manually.".into()).user_message(),
            "Please enter a city manually."
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(WeatherError::RateLimited.is_retryable());
        assert!(WeatherError::Network("reset".into()).is_retryable());
        assert!(!WeatherError::NotFound("x".into()).is_retryable());
        assert!(!WeatherError::Configuration("no key".into()).is_retryable());
    }
}
