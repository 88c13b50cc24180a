//! Single-flight forecast refreshes and the only write path into the cache.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cache::CacheStore;
use crate::error::WeatherError;
use crate::provider::{ForecastSource, DEFAULT_FORECAST_DAYS};
use crate::types::{CacheSnapshot, LocationQuery};

/// What every caller attached to one fetch observes.
pub type RefreshOutcome = Result<Arc<CacheSnapshot>, WeatherError>;

/// Coordinates fetches so that each location has at most one outstanding
/// request, and persists successful results.
///
/// Cloning is cheap; clones share in-flight state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn ForecastSource>,
    cache: CacheStore,
    days: u8,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Location chosen by the last `set_location`, cleared on reset.
    target: Option<LocationQuery>,
    next_id: u64,
    in_flight: HashMap<LocationQuery, InFlight>,
}

struct InFlight {
    id: u64,
    outcome: watch::Receiver<Option<RefreshOutcome>>,
}

impl State {
    /// A finished fetch may persist only while it is still registered and
    /// agrees with the chosen location.
    fn accepts(&self, query: &LocationQuery, id: u64) -> bool {
        let registered = self
            .in_flight
            .get(query)
            .is_some_and(|flight| flight.id == id);
        let on_target = match &self.target {
            Some(target) => target == query,
            None => true,
        };
        registered && on_target
    }
}

impl RefreshCoordinator {
    pub fn new(source: Arc<dyn ForecastSource>, cache: CacheStore) -> Self {
        Self::with_forecast_days(source, cache, DEFAULT_FORECAST_DAYS)
    }

    pub fn with_forecast_days(
        source: Arc<dyn ForecastSource>,
        cache: CacheStore,
        days: u8,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                cache,
                days,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    /// Fetch and persist the forecast for `query`, joining a fetch already in
    /// flight for the same location.
    pub async fn refresh(&self, query: &LocationQuery) -> RefreshOutcome {
        let mut outcome = self.attach(query);
        let settled = match outcome.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| {
            Err(WeatherError::Network(
                "refresh task ended without a result".into(),
            ))
        })
    }

    /// Switch to a new location. Work in flight for other locations will not
    /// be persisted; a fetch already running for `query` is joined.
    pub async fn set_location(&self, query: &LocationQuery) -> RefreshOutcome {
        {
            let mut state = self.inner.state.lock();
            state.in_flight.retain(|pending, _| pending == query);
            state.target = Some(query.clone());
            tracing::info!("Location set to {}", query);
        }
        self.refresh(query).await
    }

    /// Refresh the chosen location, or the stored one when nothing was chosen
    /// since start.
    pub async fn refresh_stored(&self) -> RefreshOutcome {
        match self.current_location()? {
            Some(query) => self.refresh(&query).await,
            None => Err(WeatherError::Validation("no location has been set".into())),
        }
    }

    /// The location the next refresh will target.
    pub fn current_location(&self) -> Result<Option<LocationQuery>, WeatherError> {
        let target = self.inner.state.lock().target.clone();
        match target {
            Some(query) => Ok(Some(query)),
            None => self.inner.cache.location(),
        }
    }

    /// Forget the location and snapshot. Fetches in flight are superseded.
    pub fn reset(&self) -> Result<(), WeatherError> {
        let mut state = self.inner.state.lock();
        state.target = None;
        state.in_flight.clear();
        self.inner.cache.clear()
    }

    pub fn is_fetching(&self, query: &LocationQuery) -> bool {
        self.inner.state.lock().in_flight.contains_key(query)
    }

    fn attach(&self, query: &LocationQuery) -> watch::Receiver<Option<RefreshOutcome>> {
        let mut state = self.inner.state.lock();

        if let Some(flight) = state.in_flight.get(query) {
            tracing::debug!("Joining in-flight refresh for {}", query);
            return flight.outcome.clone();
        }

        let id = state.next_id;
        state.next_id += 1;
        let (tx, rx) = watch::channel(None);
        state.in_flight.insert(
            query.clone(),
            InFlight {
                id,
                outcome: rx.clone(),
            },
        );
        drop(state);

        let inner = self.inner.clone();
        let query = query.clone();
        tokio::spawn(async move {
            let outcome = inner.fetch_and_store(&query, id).await;
            let _ = tx.send(Some(outcome));
        });
        rx
    }
}

impl Inner {
    async fn fetch_and_store(&self, query: &LocationQuery, id: u64) -> RefreshOutcome {
        tracing::debug!("Fetching forecast for {}", query);
        let fetched = self.source.fetch_forecast(query, self.days).await;

        let mut state = self.state.lock();
        let accepted = state.accepts(query, id);
        if state.in_flight.get(query).is_some_and(|flight| flight.id == id) {
            state.in_flight.remove(query);
        }

        let document = match fetched {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Refresh for {} failed: {}", query, e);
                return Err(e);
            }
        };

        if !accepted {
            tracing::debug!("Dropping superseded forecast for {}", query);
            return Err(WeatherError::Superseded);
        }

        let snapshot = self.cache.write(query, &document)?;
        tracing::info!("Refreshed forecast for {}", query);
        Ok(Arc::new(snapshot))
    }
}
