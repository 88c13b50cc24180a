//! Foreground glue: user actions in, [`Presentation`] updates out.

use std::sync::Arc;
use tokio::sync::watch;

use crate::error::WeatherError;
use crate::location::{resolve_geolocation, Geolocator, LocationInput};
use crate::presentation::{Presentation, PresentationEvent, ViewState};
use crate::refresh::RefreshOutcome;
use crate::search::{SearchSuggester, Suggestions};
use crate::session::WeatherSession;
use crate::types::{LocationCandidate, LocationQuery};

/// Owns the presentation state for one foreground surface.
///
/// Every operation ends with the presentation in a defined state; fetch
/// failures are reported through it rather than returned.
pub struct WeatherController<S: WeatherSession + ?Sized> {
    session: Arc<S>,
    suggester: Option<SearchSuggester>,
    view: watch::Sender<Presentation>,
}

impl<S: WeatherSession + ?Sized> WeatherController<S> {
    pub fn new(session: Arc<S>) -> Self {
        let (view, _) = watch::channel(Presentation::default());
        Self {
            session,
            suggester: None,
            view,
        }
    }

    pub fn with_search(mut self, suggester: SearchSuggester) -> Self {
        self.suggester = Some(suggester);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<Presentation> {
        self.view.subscribe()
    }

    pub fn suggestions(&self) -> Option<watch::Receiver<Suggestions>> {
        self.suggester.as_ref().map(SearchSuggester::subscribe)
    }

    pub fn view(&self) -> Presentation {
        self.view.borrow().clone()
    }

    /// Cold start: show a cached snapshot at once and refresh behind it,
    /// fetch for a stored location without data, or wait for a choice.
    pub async fn start(&self) {
        let snapshot = self.session.read_snapshot().unwrap_or_else(|e| {
            tracing::warn!("Could not read cached forecast: {}", e);
            None
        });

        if let Some(snapshot) = snapshot {
            tracing::info!("Showing cached forecast for {}", snapshot.location);
            self.apply(PresentationEvent::Restored(Arc::new(snapshot)));
            let outcome = self.session.refresh().await;
            self.settle(outcome);
            return;
        }

        match self.session.stored_location() {
            Ok(Some(query)) => {
                self.apply(PresentationEvent::LocationResolved(query));
                let outcome = self.session.refresh().await;
                self.settle(outcome);
            }
            Ok(None) => tracing::info!("No location configured"),
            Err(e) => tracing::warn!("Could not read stored location: {}", e),
        }
    }

    /// Use typed text as the location. Blank text is rejected before any
    /// request is made.
    pub async fn submit(&mut self, text: &str) -> Result<(), WeatherError> {
        let query = LocationInput::Typed(text.to_string()).resolve()?;
        self.clear_suggestions();
        self.go(query).await;
        Ok(())
    }

    /// Use a search suggestion. Returns the label to put back in the search box.
    pub async fn pick(&mut self, candidate: LocationCandidate) -> String {
        let label = candidate.label();
        self.clear_suggestions();
        match LocationInput::Picked(candidate).resolve() {
            Ok(query) => self.go(query).await,
            Err(e) => self.apply(PresentationEvent::FetchFailed(e)),
        }
        label
    }

    /// Use the device position. Failure surfaces manual search instead.
    pub async fn locate(&self, geolocator: &dyn Geolocator) {
        match resolve_geolocation(geolocator).await {
            Ok(query) => self.go(query).await,
            Err(WeatherError::Permission(hint)) => {
                self.apply(PresentationEvent::GeolocationUnavailable(hint));
            }
            Err(e) => self.apply(PresentationEvent::GeolocationUnavailable(e.user_message())),
        }
    }

    pub fn request_manual_search(&self) {
        self.apply(PresentationEvent::ManualSearchRequested);
    }

    /// Feed the search box contents to the suggester, if there is one.
    pub fn type_query(&mut self, text: &str) {
        if let Some(suggester) = self.suggester.as_mut() {
            suggester.on_input(text);
        }
    }

    /// Explicit refresh. In the error state this retries the failed location.
    pub async fn refresh(&self) {
        let view = self.view();
        if view.location.is_none() {
            tracing::debug!("Nothing to refresh");
            return;
        }
        if view.state == ViewState::Error {
            self.retry().await;
            return;
        }
        let outcome = self.session.refresh().await;
        self.settle(outcome);
    }

    pub async fn retry(&self) {
        let query = self.view.borrow().retry_query().cloned();
        if let Some(query) = query {
            self.go(query).await;
        }
    }

    pub async fn reset(&mut self) {
        self.clear_suggestions();
        match self.session.reset().await {
            Ok(()) => self.apply(PresentationEvent::Reset),
            Err(e) => {
                tracing::warn!("Reset failed: {}", e);
                self.apply(PresentationEvent::FetchFailed(e));
            }
        }
    }

    async fn go(&self, query: LocationQuery) {
        self.apply(PresentationEvent::LocationResolved(query.clone()));
        let outcome = self.session.resolve_location(&query).await;
        self.settle(outcome);
    }

    fn settle(&self, outcome: RefreshOutcome) {
        match outcome {
            Ok(snapshot) => self.apply(PresentationEvent::FetchSucceeded(snapshot)),
            Err(e) => self.apply(PresentationEvent::FetchFailed(e)),
        }
    }

    fn apply(&self, event: PresentationEvent) {
        self.view.send_modify(|view| view.apply(event));
    }

    fn clear_suggestions(&mut self) {
        if let Some(suggester) = self.suggester.as_mut() {
            suggester.clear();
        }
    }
}
