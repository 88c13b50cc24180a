//! Messages exchanged between a foreground surface and the background agent.

use serde::{Deserialize, Serialize};
use skycast_weather::{FailureKind, LocationCandidate, WeatherError};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRequest {
    /// Store a new location and fetch its forecast before replying.
    SetLocation { location: String },
    /// Refresh the stored location.
    UpdateWeather,
    /// Clear the location and cached forecast.
    Reset,
    SearchLocations { query: String },
}

impl AgentRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetLocation { .. } => "SET_LOCATION",
            Self::UpdateWeather => "UPDATE_WEATHER",
            Self::Reset => "RESET",
            Self::SearchLocations { .. } => "SEARCH_LOCATIONS",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<LocationCandidate>>,
}

impl AgentReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn with_candidates(candidates: Vec<LocationCandidate>) -> Self {
        Self {
            success: true,
            candidates: Some(candidates),
            ..Default::default()
        }
    }

    pub fn failed(err: &WeatherError) -> Self {
        Self {
            success: false,
            error: Some(err.detail()),
            kind: Some(err.kind()),
            candidates: None,
        }
    }

    /// The classified error of a failed reply.
    pub fn error(&self) -> Option<WeatherError> {
        if self.success {
            return None;
        }
        let kind = self.kind.unwrap_or(FailureKind::Upstream);
        let message = self
            .error
            .clone()
            .unwrap_or_else(|| "request failed".to_string());
        Some(WeatherError::from_kind(kind, message))
    }
}

/// A request paired with the channel its reply goes back on.
#[derive(Debug)]
pub struct Envelope {
    pub request: AgentRequest,
    pub reply: oneshot::Sender<AgentReply>,
}
