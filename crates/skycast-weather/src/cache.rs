//! Last-known-good forecast snapshot, shared by every embodiment.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use crate::error::WeatherError;
use crate::store::{KeyValueStore, StoreError};
use crate::types::{CacheSnapshot, ForecastDocument, LocationQuery};

pub const LOCATION_KEY: &str = "location";
pub const WEATHER_DATA_KEY: &str = "weatherData";
pub const LAST_UPDATE_KEY: &str = "lastUpdate";

impl From<StoreError> for WeatherError {
    fn from(e: StoreError) -> Self {
        WeatherError::Store(e.to_string())
    }
}

/// Read `key`, treating a value that is not valid JSON as missing.
fn get_lenient(store: &dyn KeyValueStore, key: &str) -> Result<Option<Value>, StoreError> {
    match store.get(key) {
        Err(StoreError::Corrupt { key, source }) => {
            tracing::warn!("Cached {} is corrupt, treating as absent: {}", key, source);
            Ok(None)
        }
        other => other,
    }
}

/// Cache store over a [`KeyValueStore`].
///
/// Reads are public. Writes and clears are reserved for the refresh
/// coordinator so nothing else can overwrite a snapshot.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<Mutex<Box<dyn KeyValueStore>>>,
}

impl CacheStore {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    /// Current snapshot, or `None` when nothing complete is stored.
    ///
    /// A snapshot missing any of its three keys, or one that fails to decode,
    /// is reported as absent.
    pub fn read(&self) -> Result<Option<CacheSnapshot>, WeatherError> {
        let store = self.store.lock();
        let location = get_lenient(&**store, LOCATION_KEY)?;
        let weather_data = get_lenient(&**store, WEATHER_DATA_KEY)?;
        let last_update = get_lenient(&**store, LAST_UPDATE_KEY)?;
        drop(store);

        let (location, weather_data, last_update) = match (location, weather_data, last_update) {
            (Some(l), Some(w), Some(t)) => (l, w, t),
            (None, None, None) => return Ok(None),
            _ => {
                tracing::warn!("Cache holds a partial snapshot, treating as absent");
                return Ok(None);
            }
        };

        match decode_snapshot(location, weather_data, last_update) {
            Some(snapshot) => Ok(Some(snapshot)),
            None => {
                tracing::warn!("Cached snapshot could not be decoded, treating as absent");
                Ok(None)
            }
        }
    }

    /// The stored location on its own, even if no forecast accompanies it.
    pub fn location(&self) -> Result<Option<LocationQuery>, WeatherError> {
        let value = get_lenient(&**self.store.lock(), LOCATION_KEY)?;
        Ok(value.and_then(|v| serde_json::from_value(v).ok()))
    }

    /// Replace the snapshot, stamping it with the current time.
    pub(crate) fn write(
        &self,
        location: &LocationQuery,
        weather_data: &ForecastDocument,
    ) -> Result<CacheSnapshot, WeatherError> {
        self.write_at(location, weather_data, Utc::now())
    }

    pub(crate) fn write_at(
        &self,
        location: &LocationQuery,
        weather_data: &ForecastDocument,
        at: DateTime<Utc>,
    ) -> Result<CacheSnapshot, WeatherError> {
        let encoded = serde_json::to_value(weather_data)
            .map_err(|e| WeatherError::Store(format!("failed to encode forecast: {}", e)))?;
        // Millisecond precision is all the store keeps.
        let at = DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at);

        self.store.lock().set_many(&[
            (LOCATION_KEY, Value::String(location.as_str().to_string())),
            (WEATHER_DATA_KEY, encoded),
            (LAST_UPDATE_KEY, Value::from(at.timestamp_millis())),
        ])?;

        tracing::debug!("Cached forecast for {}", location);
        Ok(CacheSnapshot {
            location: location.clone(),
            weather_data: weather_data.clone(),
            last_update: at,
        })
    }

    /// Remove the location and snapshot entirely.
    pub(crate) fn clear(&self) -> Result<(), WeatherError> {
        self.store
            .lock()
            .remove_many(&[LOCATION_KEY, WEATHER_DATA_KEY, LAST_UPDATE_KEY])?;
        tracing::info!("Weather cache cleared");
        Ok(())
    }
}

fn decode_snapshot(
    location: Value,
    weather_data: Value,
    last_update: Value,
) -> Option<CacheSnapshot> {
    let location: LocationQuery = serde_json::from_value(location).ok()?;
    let weather_data: ForecastDocument = serde_json::from_value(weather_data).ok()?;
    let last_update = DateTime::from_timestamp_millis(last_update.as_i64()?)?;
    Some(CacheSnapshot {
        location,
        weather_data,
        last_update,
    })
}
