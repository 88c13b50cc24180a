//! In-crate test doubles.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::WeatherError;
use crate::provider::ForecastSource;
use crate::types::{fixtures, ForecastDocument, LocationQuery};

#[derive(Default)]
struct Gate {
    open: bool,
    released: Vec<LocationQuery>,
}

impl Gate {
    fn lets_through(&self, query: &LocationQuery) -> bool {
        self.open || self.released.contains(query)
    }
}

/// Forecast source with a scripted result and an optional gate that holds
/// fetches until opened, either entirely or per location.
pub struct FakeSource {
    result: Mutex<Result<ForecastDocument, WeatherError>>,
    calls: Mutex<Vec<(LocationQuery, u8)>>,
    gate: watch::Sender<Gate>,
}

impl FakeSource {
    fn with(result: Result<ForecastDocument, WeatherError>, open: bool) -> Self {
        let (gate, _) = watch::channel(Gate {
            open,
            released: Vec::new(),
        });
        Self {
            result: Mutex::new(result),
            calls: Mutex::new(Vec::new()),
            gate,
        }
    }

    pub fn succeeding() -> Self {
        Self::with(Ok(fixtures::forecast()), true)
    }

    pub fn failing(err: WeatherError) -> Self {
        Self::with(Err(err), true)
    }

    pub fn gated() -> Self {
        Self::with(Ok(fixtures::forecast()), false)
    }

    pub fn set_result(&self, result: Result<ForecastDocument, WeatherError>) {
        *self.result.lock() = result;
    }

    pub fn open(&self) {
        self.gate.send_modify(|gate| gate.open = true);
    }

    /// Let fetches for `query` complete while others stay held.
    pub fn release(&self, query: &LocationQuery) {
        self.gate.send_modify(|gate| gate.released.push(query.clone()));
    }

    pub fn calls(&self) -> Vec<LocationQuery> {
        self.calls.lock().iter().map(|(q, _)| q.clone()).collect()
    }

    pub fn days(&self) -> Vec<u8> {
        self.calls.lock().iter().map(|(_, d)| *d).collect()
    }

    fn record(&self, query: &LocationQuery, days: u8) {
        self.calls.lock().push((query.clone(), days));
    }

    fn current_result(&self) -> Result<ForecastDocument, WeatherError> {
        self.result.lock().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        while self.call_count() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl ForecastSource for FakeSource {
    async fn fetch_forecast(
        &self,
        query: &LocationQuery,
        days: u8,
    ) -> Result<ForecastDocument, WeatherError> {
        self.record(query, days);
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|gate| gate.lets_through(query)).await;
        self.current_result()
    }
}
