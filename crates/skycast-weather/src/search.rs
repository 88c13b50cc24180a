//! Debounced, best-effort location suggestions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::provider::LocationLookup;
use crate::types::LocationCandidate;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_QUERY_CHARS: usize = 2;

/// The latest published result set and the input it answers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Suggestions {
    pub query: String,
    pub candidates: Vec<LocationCandidate>,
}

/// Turns keystrokes into at most one lookup per settled input.
///
/// Every input is tagged with a generation; a reply is published only if its
/// generation is still the newest when it arrives. Lookup failures publish an
/// empty result set and are never surfaced.
pub struct SearchSuggester {
    lookup: Arc<dyn LocationLookup>,
    quiet: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<CancellationToken>,
    results: Arc<watch::Sender<Suggestions>>,
}

impl SearchSuggester {
    pub fn new(lookup: Arc<dyn LocationLookup>, quiet: Duration) -> Self {
        let (results, _) = watch::channel(Suggestions::default());
        Self {
            lookup,
            quiet,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            results: Arc::new(results),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Suggestions> {
        self.results.subscribe()
    }

    pub fn current(&self) -> Suggestions {
        self.results.borrow().clone()
    }

    /// Feed the full current contents of the search box.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_input(&mut self, text: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }

        let query = text.trim().to_string();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.results.send_replace(Suggestions {
                query,
                candidates: Vec::new(),
            });
            return;
        }

        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        let lookup = self.lookup.clone();
        let latest = self.generation.clone();
        let results = self.results.clone();
        let quiet = self.quiet;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(quiet) => {}
            }

            let candidates = match lookup.search(&query).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::debug!("Location search for {:?} failed: {}", query, e);
                    Vec::new()
                }
            };

            if latest.load(Ordering::SeqCst) != generation {
                tracing::debug!("Discarding superseded suggestions for {:?}", query);
                return;
            }
            results.send_replace(Suggestions { query, candidates });
        });
    }

    /// Drop any pending lookup and publish an empty result set.
    pub fn clear(&mut self) {
        self.on_input("");
    }
}

impl Drop for SearchSuggester {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::error::WeatherError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeLookup {
        calls: Mutex<Vec<String>>,
        delays: HashMap<String, Duration>,
        fail: bool,
    }

    impl FakeLookup {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LocationLookup for FakeLookup {
        async fn search(&self, query: &str) -> Result<Vec<LocationCandidate>, WeatherError> {
            self.calls.lock().push(query.to_string());
            if let Some(delay) = self.delays.get(query) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail {
                return Err(WeatherError::Network("offline".into()));
            }
            Ok(vec![LocationCandidate {
                name: query.to_string(),
                region: None,
                country: "Testland".into(),
                lat: 1.0,
                lon: 2.0,
            }])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_lookup_per_settled_input() {
        let lookup = Arc::new(FakeLookup::default());
        let mut suggester = SearchSuggester::new(lookup.clone(), DEFAULT_DEBOUNCE);

        for text in ["Lo", "Lon", "Lond", "London"] {
            suggester.on_input(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(lookup.calls(), vec!["London".to_string()]);
        let current = suggester.current();
        assert_eq!(current.query, "London");
        assert_eq!(current.candidates.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_yields_empty_without_lookup() {
        let lookup = Arc::new(FakeLookup::default());
        let mut suggester = SearchSuggester::new(lookup.clone(), DEFAULT_DEBOUNCE);

        suggester.on_input(" L ");
        assert_eq!(suggester.current().candidates.len(), 0);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(lookup.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_clears_previous_results() {
        let lookup = Arc::new(FakeLookup::default());
        let mut suggester = SearchSuggester::new(lookup.clone(), DEFAULT_DEBOUNCE);

        suggester.on_input("Paris");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(suggester.current().candidates.len(), 1);

        suggester.on_input("P");
        assert!(suggester.current().candidates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_for_older_query_is_discarded() {
        let lookup = Arc::new(FakeLookup {
            delays: HashMap::from([("Lo".to_string(), Duration::from_secs(1))]),
            ..Default::default()
        });
        let mut suggester = SearchSuggester::new(lookup.clone(), DEFAULT_DEBOUNCE);
        let mut rx = suggester.subscribe();

        suggester.on_input("Lo");
        tokio::time::sleep(Duration::from_millis(400)).await;
        suggester.on_input("Lon");
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(lookup.calls(), vec!["Lo".to_string(), "Lon".to_string()]);
        assert_eq!(rx.borrow_and_update().query, "Lon");
        assert_eq!(suggester.current().candidates[0].name, "Lon");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_yields_empty() {
        let lookup = Arc::new(FakeLookup {
            fail: true,
            ..Default::default()
        });
        let mut suggester = SearchSuggester::new(lookup.clone(), DEFAULT_DEBOUNCE);

        suggester.on_input("Berlin");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(lookup.calls().len(), 1);
        let current = suggester.current();
        assert_eq!(current.query, "Berlin");
        assert!(current.candidates.is_empty());
    }
}
