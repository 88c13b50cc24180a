//! Foreground side of the agent protocol.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use skycast_weather::{
    CacheSnapshot, CacheStore, LocationCandidate, LocationLookup, LocationQuery, RefreshOutcome,
    WeatherError, WeatherSession,
};

use crate::protocol::{AgentReply, AgentRequest, Envelope};

/// Relays every operation to the background agent and reads results back
/// from the shared cache. Has no network access of its own.
#[derive(Clone)]
pub struct AgentClient {
    tx: mpsc::Sender<Envelope>,
    cache: CacheStore,
}

impl AgentClient {
    pub fn new(tx: mpsc::Sender<Envelope>, cache: CacheStore) -> Self {
        Self { tx, cache }
    }

    /// Send a request and wait for the raw reply.
    pub async fn send(&self, request: AgentRequest) -> Result<AgentReply, WeatherError> {
        let name = request.name();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| WeatherError::Network("background agent is not running".into()))?;

        reply_rx
            .await
            .map_err(|_| WeatherError::Network(format!("background agent dropped {}", name)))
    }

    async fn call(&self, request: AgentRequest) -> Result<AgentReply, WeatherError> {
        let reply = self.send(request).await?;
        match reply.error() {
            Some(e) => Err(e),
            None => Ok(reply),
        }
    }

    fn reread(&self) -> RefreshOutcome {
        match self.cache.read()? {
            Some(snapshot) => Ok(Arc::new(snapshot)),
            // Reset between the agent's reply and this read.
            None => Err(WeatherError::Superseded),
        }
    }
}

#[async_trait]
impl WeatherSession for AgentClient {
    async fn resolve_location(&self, query: &LocationQuery) -> RefreshOutcome {
        self.call(AgentRequest::SetLocation {
            location: query.to_string(),
        })
        .await?;
        self.reread()
    }

    async fn refresh(&self) -> RefreshOutcome {
        self.call(AgentRequest::UpdateWeather).await?;
        self.reread()
    }

    async fn reset(&self) -> Result<(), WeatherError> {
        self.call(AgentRequest::Reset).await.map(|_| ())
    }

    fn read_snapshot(&self) -> Result<Option<CacheSnapshot>, WeatherError> {
        self.cache.read()
    }

    fn stored_location(&self) -> Result<Option<LocationQuery>, WeatherError> {
        self.cache.location()
    }
}

#[async_trait]
impl LocationLookup for AgentClient {
    async fn search(&self, query: &str) -> Result<Vec<LocationCandidate>, WeatherError> {
        let reply = self
            .call(AgentRequest::SearchLocations {
                query: query.to_string(),
            })
            .await?;
        Ok(reply.candidates.unwrap_or_default())
    }
}
