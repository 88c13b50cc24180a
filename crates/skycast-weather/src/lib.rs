//! Weather location, fetching, caching and presentation core.

pub mod cache;
pub mod controller;
pub mod display;
pub mod error;
pub mod location;
pub mod presentation;
pub mod provider;
pub mod refresh;
pub mod search;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::CacheStore;
pub use controller::WeatherController;
pub use error::{FailureKind, WeatherError};
pub use location::{
    resolve_geolocation, GeolocationOptions, Geolocator, LocationError, LocationInput,
};
pub use presentation::{Presentation, PresentationEvent, ViewState};
pub use provider::{ForecastSource, LocationLookup, WeatherGateway, DEFAULT_FORECAST_DAYS};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use search::{SearchSuggester, Suggestions};
pub use session::{LocalSession, WeatherSession};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
pub use types::{
    CacheSnapshot, Coordinates, CurrentReport, ForecastDocument, LocationCandidate, LocationQuery,
};
