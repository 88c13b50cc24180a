//! Turning user intent into a [`LocationQuery`].

use async_trait::async_trait;
use std::time::Duration;

use crate::error::WeatherError;
use crate::types::{Coordinates, LocationCandidate, LocationQuery};

pub const PERMISSION_DENIED_HINT: &str =
    "Location permission denied. Please enter a city manually.";
pub const UNAVAILABLE_HINT: &str = "Unable to get your location. Please search for a city instead.";

/// Location service errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    /// Hint shown next to the manual search box.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::PermissionDenied => PERMISSION_DENIED_HINT,
            _ => UNAVAILABLE_HINT,
        }
    }
}

/// Options handed to the platform location service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeolocationOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Accept a cached position up to this old
    pub maximum_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

/// Platform location service
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(
        &self,
        options: GeolocationOptions,
    ) -> Result<Coordinates, LocationError>;
}

/// Geolocator for platforms without a location service.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

#[async_trait]
impl Geolocator for Unsupported {
    async fn current_position(
        &self,
        _options: GeolocationOptions,
    ) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// The ways a user can name a location.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Coordinates(Coordinates),
    Typed(String),
    Picked(LocationCandidate),
    Stored(LocationQuery),
}

impl LocationInput {
    /// Canonical query for this input. Blank typed text is rejected without
    /// touching the network.
    pub fn resolve(self) -> Result<LocationQuery, WeatherError> {
        match self {
            Self::Coordinates(coordinates) => Ok(LocationQuery::from_coordinates(coordinates)),
            Self::Typed(text) => LocationQuery::new(text),
            Self::Picked(candidate) => Ok(LocationQuery::from_coordinates(candidate.coordinates())),
            Self::Stored(query) => Ok(query),
        }
    }
}

/// Ask the platform for the device position.
///
/// Every failure becomes [`WeatherError::Permission`] carrying the hint for
/// the manual search fallback.
pub async fn resolve_geolocation(
    geolocator: &dyn Geolocator,
) -> Result<LocationQuery, WeatherError> {
    match geolocator.current_position(GeolocationOptions::default()).await {
        Ok(coordinates) => Ok(LocationQuery::from_coordinates(coordinates)),
        Err(e) => {
            tracing::warn!("Geolocation failed: {}", e);
            Err(WeatherError::Permission(e.hint().to_string()))
        }
    }
}
