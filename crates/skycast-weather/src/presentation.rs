//! What the rendering layer should show, as a pure state machine.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::display;
use crate::error::WeatherError;
use crate::types::{CacheSnapshot, ForecastDocument, LocationQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    /// No location yet, awaiting a choice
    #[default]
    Prompt,
    /// Fetch outstanding with nothing to show
    Loading,
    Ready,
    /// Fetch failed and there is no cached data to fall back to
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationEvent {
    /// A cached snapshot was found at cold start.
    Restored(Arc<CacheSnapshot>),
    LocationResolved(LocationQuery),
    FetchSucceeded(Arc<CacheSnapshot>),
    FetchFailed(WeatherError),
    /// Geolocation failed; carries the hint for manual search.
    GeolocationUnavailable(String),
    ManualSearchRequested,
    Reset,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Presentation {
    pub state: ViewState,
    /// The location being shown or fetched
    pub location: Option<LocationQuery>,
    pub snapshot: Option<Arc<CacheSnapshot>>,
    /// Non-blocking error shown over stale data
    pub banner: Option<String>,
    /// Blocking error of the `Error` state
    pub error: Option<WeatherError>,
    pub hint: Option<String>,
    pub manual_search: bool,
}

impl Presentation {
    pub fn apply(&mut self, event: PresentationEvent) {
        let before = self.state;
        match event {
            PresentationEvent::Restored(snapshot) | PresentationEvent::FetchSucceeded(snapshot) => {
                self.state = ViewState::Ready;
                self.location = Some(snapshot.location.clone());
                self.snapshot = Some(snapshot);
                self.banner = None;
                self.error = None;
                self.hint = None;
                self.manual_search = false;
            }
            PresentationEvent::LocationResolved(query) => {
                let showing_same = self.state == ViewState::Ready
                    && self.snapshot.as_ref().is_some_and(|s| s.location == query);
                if !showing_same {
                    self.state = ViewState::Loading;
                    self.snapshot = None;
                }
                self.location = Some(query);
                self.banner = None;
                self.error = None;
                self.hint = None;
            }
            PresentationEvent::FetchFailed(WeatherError::Superseded) => {}
            PresentationEvent::FetchFailed(err) => {
                if self.snapshot.is_some() {
                    self.state = ViewState::Ready;
                    self.banner = Some(err.user_message());
                } else {
                    self.state = ViewState::Error;
                    self.error = Some(err);
                }
            }
            PresentationEvent::GeolocationUnavailable(hint) => {
                self.hint = Some(hint);
                self.manual_search = true;
            }
            PresentationEvent::ManualSearchRequested => {
                self.manual_search = true;
            }
            PresentationEvent::Reset => {
                *self = Self::default();
            }
        }

        if before != self.state {
            tracing::debug!("Presentation {:?} -> {:?}", before, self.state);
        }
    }

    pub fn forecast(&self) -> Option<&ForecastDocument> {
        self.snapshot.as_ref().map(|s| &s.weather_data)
    }

    /// The query a retry should repeat, only offered in the `Error` state.
    pub fn retry_query(&self) -> Option<&LocationQuery> {
        match self.state {
            ViewState::Error => self.location.as_ref(),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(WeatherError::user_message)
    }

    pub fn last_updated(&self, now: DateTime<Utc>) -> Option<String> {
        self.snapshot
            .as_ref()
            .map(|s| display::last_updated_label(s.last_update, now))
    }
}
