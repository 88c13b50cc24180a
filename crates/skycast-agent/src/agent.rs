//! The background agent: sole owner of network access and cache writes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use skycast_core::{AppError, Service};
use skycast_weather::search::MIN_QUERY_CHARS;
use skycast_weather::{
    CacheStore, LocationLookup, LocationQuery, RefreshCoordinator, WeatherError,
};

use crate::client::AgentClient;
use crate::protocol::{AgentReply, AgentRequest, Envelope};

const QUEUE_DEPTH: usize = 32;

/// Serves [`AgentRequest`]s and refreshes the stored location periodically.
#[derive(Clone)]
pub struct BackgroundAgent {
    coordinator: RefreshCoordinator,
    lookup: Arc<dyn LocationLookup>,
    refresh_interval: Option<Duration>,
}

impl BackgroundAgent {
    pub fn new(coordinator: RefreshCoordinator, lookup: Arc<dyn LocationLookup>) -> Self {
        Self {
            coordinator,
            lookup,
            refresh_interval: None,
        }
    }

    /// `None` disables the periodic refresh.
    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn cache(&self) -> CacheStore {
        self.coordinator.cache().clone()
    }

    /// Start the message loop and, if configured, the periodic refresh.
    pub fn spawn(self) -> AgentHandle {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let shutdown = CancellationToken::new();
        let cache = self.cache();

        let mut tasks = Vec::new();
        if let Some(period) = self.refresh_interval {
            tasks.push(tokio::spawn(self.clone().run_ticker(period, shutdown.clone())));
        }
        tasks.push(tokio::spawn(self.run_messages(rx, shutdown.clone())));

        tracing::info!("Background agent started");
        AgentHandle {
            tx,
            cache,
            shutdown,
            tasks,
        }
    }

    /// Serve one request to completion.
    pub async fn handle(&self, request: AgentRequest) -> AgentReply {
        tracing::debug!("Handling {}", request.name());
        match request {
            AgentRequest::SetLocation { location } => {
                let query = match LocationQuery::new(location) {
                    Ok(query) => query,
                    Err(e) => return AgentReply::failed(&e),
                };
                match self.coordinator.set_location(&query).await {
                    Ok(_) => AgentReply::ok(),
                    Err(e) => AgentReply::failed(&e),
                }
            }
            AgentRequest::UpdateWeather => match self.coordinator.refresh_stored().await {
                Ok(_) => AgentReply::ok(),
                Err(e) => AgentReply::failed(&e),
            },
            AgentRequest::Reset => match self.coordinator.reset() {
                Ok(()) => AgentReply::ok(),
                Err(e) => AgentReply::failed(&e),
            },
            AgentRequest::SearchLocations { query } => {
                let query = query.trim();
                if query.chars().count() < MIN_QUERY_CHARS {
                    return AgentReply::with_candidates(Vec::new());
                }
                match self.lookup.search(query).await {
                    Ok(candidates) => AgentReply::with_candidates(candidates),
                    Err(e) => AgentReply::failed(&e),
                }
            }
        }
    }

    /// One periodic refresh. Failures are logged only.
    pub async fn tick(&self) {
        let query = match self.coordinator.current_location() {
            Ok(Some(query)) => query,
            Ok(None) => {
                tracing::debug!("No stored location, skipping periodic refresh");
                return;
            }
            Err(e) => {
                tracing::warn!("Periodic refresh could not read the stored location: {}", e);
                return;
            }
        };

        match self.coordinator.refresh(&query).await {
            Ok(_) | Err(WeatherError::Superseded) => {}
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    "Periodic refresh for {} failed, retrying next tick: {}",
                    query,
                    e
                );
            }
            Err(e) => tracing::error!("Periodic refresh for {} failed: {}", query, e),
        }
    }

    async fn run_messages(self, mut rx: mpsc::Receiver<Envelope>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                envelope = rx.recv() => {
                    let Some(Envelope { request, reply }) = envelope else {
                        break;
                    };
                    let agent = self.clone();
                    tokio::spawn(async move {
                        let response = agent.handle(request).await;
                        let _ = reply.send(response);
                    });
                }
            }
        }
        tracing::debug!("Agent message loop stopped");
    }

    async fn run_ticker(self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => self.tick().await,
            }
        }
        tracing::debug!("Periodic refresh stopped");
    }
}

/// Running agent, stopped by [`Service::shutdown`] or [`AgentHandle::stop`].
pub struct AgentHandle {
    tx: mpsc::Sender<Envelope>,
    cache: CacheStore,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl AgentHandle {
    /// A foreground-side client talking to this agent.
    pub fn client(&self) -> AgentClient {
        AgentClient::new(self.tx.clone(), self.cache.clone())
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Stop background work and wait for it to finish.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Service for AgentHandle {
    fn name(&self) -> &str {
        "weather-agent"
    }

    fn shutdown(&mut self) -> Result<(), AppError> {
        self.shutdown.cancel();
        self.tasks.clear();
        tracing::info!("Background agent stopped");
        Ok(())
    }
}
