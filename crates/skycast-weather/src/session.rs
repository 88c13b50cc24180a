//! The operations a foreground surface needs, independent of where the
//! refresh coordinator runs.

use async_trait::async_trait;

use crate::cache::CacheStore;
use crate::error::WeatherError;
use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::types::{CacheSnapshot, LocationQuery};

#[async_trait]
pub trait WeatherSession: Send + Sync {
    /// Make `query` the current location and fetch its forecast.
    async fn resolve_location(&self, query: &LocationQuery) -> RefreshOutcome;

    /// Refresh the stored location.
    async fn refresh(&self) -> RefreshOutcome;

    /// Forget the location and cached forecast.
    async fn reset(&self) -> Result<(), WeatherError>;

    fn read_snapshot(&self) -> Result<Option<CacheSnapshot>, WeatherError>;

    fn stored_location(&self) -> Result<Option<LocationQuery>, WeatherError>;
}

/// Session that drives a coordinator in the same process.
#[derive(Clone)]
pub struct LocalSession {
    coordinator: RefreshCoordinator,
}

impl LocalSession {
    pub fn new(coordinator: RefreshCoordinator) -> Self {
        Self { coordinator }
    }

    fn cache(&self) -> &CacheStore {
        self.coordinator.cache()
    }
}

#[async_trait]
impl WeatherSession for LocalSession {
    async fn resolve_location(&self, query: &LocationQuery) -> RefreshOutcome {
        self.coordinator.set_location(query).await
    }

    async fn refresh(&self) -> RefreshOutcome {
        self.coordinator.refresh_stored().await
    }

    async fn reset(&self) -> Result<(), WeatherError> {
        self.coordinator.reset()
    }

    fn read_snapshot(&self) -> Result<Option<CacheSnapshot>, WeatherError> {
        self.cache().read()
    }

    fn stored_location(&self) -> Result<Option<LocationQuery>, WeatherError> {
        self.cache().location()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::FakeSource;
    use crate::types::fixtures;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_local_session_round_trip() {
        let source = Arc::new(FakeSource::succeeding());
        let session = LocalSession::new(RefreshCoordinator::new(
            source.clone(),
            CacheStore::new(MemoryStore::new()),
        ));

        assert!(session.read_snapshot().unwrap().is_none());
        assert!(matches!(session.refresh().await, Err(WeatherError::Validation(_))));

        let london = fixtures::query("London");
        session.resolve_location(&london).await.unwrap();
        assert_eq!(session.stored_location().unwrap(), Some(london.clone()));
        assert_eq!(session.read_snapshot().unwrap().unwrap().location, london);

        session.refresh().await.unwrap();
        assert_eq!(source.calls().len(), 2);

        session.reset().await.unwrap();
        assert!(session.read_snapshot().unwrap().is_none());
        assert!(session.stored_location().unwrap().is_none());
    }
}
