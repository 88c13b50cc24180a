//! Client for the weather gateway (the keyed proxy in front of the provider).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::error::WeatherError;
use crate::types::{CurrentReport, ForecastDocument, LocationCandidate, LocationQuery};

pub const DEFAULT_FORECAST_DAYS: u8 = 3;

const NO_MATCHING_LOCATION: i64 = 1006;
const QUOTA_EXCEEDED: i64 = 2007;
const MISSING_API_KEY: &str = "API key not configured";

/// Source of forecast documents
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch_forecast(
        &self,
        query: &LocationQuery,
        days: u8,
    ) -> Result<ForecastDocument, WeatherError>;
}

/// Free-text place lookup
#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<LocationCandidate>, WeatherError>;
}

/// HTTP client for the gateway's `current`, `forecast` and `search` endpoints.
#[derive(Debug, Clone)]
pub struct WeatherGateway {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| WeatherError::Configuration(format!("invalid gateway url: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WeatherError::Configuration(format!(
                "unsupported gateway scheme: {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Configuration(format!("http client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Current conditions with air quality.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(
        &self,
        query: &LocationQuery,
    ) -> Result<CurrentReport, WeatherError> {
        let url = self.endpoint("current", &[("q", query.as_str()), ("aqi", "yes")])?;
        let report: CurrentReport = self.get(url).await?;
        Ok(report.with_absolute_icons())
    }

    /// Forecast for `days` days including air quality and alerts.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_forecast(
        &self,
        query: &LocationQuery,
        days: u8,
    ) -> Result<ForecastDocument, WeatherError> {
        let days = days.to_string();
        let url = self.endpoint(
            "forecast",
            &[
                ("q", query.as_str()),
                ("days", days.as_str()),
                ("aqi", "yes"),
                ("alerts", "yes"),
            ],
        )?;
        let document: ForecastDocument = self.get(url).await?;
        tracing::info!("Fetched {}-day forecast for {}", days, query);
        Ok(document.with_absolute_icons())
    }

    /// Places matching a partial name.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<Vec<LocationCandidate>, WeatherError> {
        let url = self.endpoint("search", &[("q", query)])?;
        self.get(url).await
    }

    fn endpoint(&self, name: &str, params: &[(&str, &str)]) -> Result<Url, WeatherError> {
        Url::parse_with_params(&format!("{}/{}", self.base_url, name), params)
            .map_err(|e| WeatherError::Configuration(format!("invalid endpoint url: {}", e)))
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, WeatherError> {
        let response = self.client.get(url).send().await?;
        handle_response(response).await
    }
}

#[async_trait]
impl ForecastSource for WeatherGateway {
    async fn fetch_forecast(
        &self,
        query: &LocationQuery,
        days: u8,
    ) -> Result<ForecastDocument, WeatherError> {
        WeatherGateway::fetch_forecast(self, query, days).await
    }
}

#[async_trait]
impl LocationLookup for WeatherGateway {
    async fn search(&self, query: &str) -> Result<Vec<LocationCandidate>, WeatherError> {
        WeatherGateway::search(self, query).await
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Provider { error: ProviderError },
    Gateway { error: String },
}

#[derive(Deserialize)]
struct ProviderError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, WeatherError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| {
                WeatherError::upstream(status.as_u16(), format!("JSON parse error: {}", e))
            });
    }

    let text = response.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), &text))
}

fn classify_failure(status: u16, body: &str) -> WeatherError {
    let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Provider { error }) => (error.code, error.message),
        Ok(ErrorBody::Gateway { error }) => (None, error),
        Err(_) if body.trim().is_empty() => (None, format!("HTTP {}", status)),
        Err(_) => (None, body.trim().to_string()),
    };

    match (status, code) {
        (_, Some(NO_MATCHING_LOCATION)) => WeatherError::NotFound(message),
        (_, Some(QUOTA_EXCEEDED)) | (429, _) => WeatherError::RateLimited,
        (401 | 403, _) => WeatherError::Unauthorized(message),
        (404, _) => WeatherError::NotFound(message),
        (400, _) => WeatherError::Validation(message),
        (500, _) if message.contains(MISSING_API_KEY) => WeatherError::Configuration(message),
        _ => WeatherError::upstream(status, message),
    }
}
