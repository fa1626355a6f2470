use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};

use crate::{
    DashboardError,
    model::{ApiResponse, CityMatch, ForecastPayload, WeatherSnapshot},
    provider::{CURRENT_FALLBACK, FORECAST_FALLBACK, SEARCH_FALLBACK},
    source::{WeatherSource, validate_city, validate_query},
};

pub const NETWORK_ERROR: &str = "Network error. Please check your connection.";

/// Talks to the dashboard proxy's query-string API.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: Client,
    endpoint: String,
}

impl ProxyClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { http: Client::new(), endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self, fallback), level = "debug")]
    async fn call<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
        fallback: &str,
    ) -> Result<T, DashboardError> {
        let res = self.http.get(&self.endpoint).query(params).send().await.map_err(|e| {
            warn!("Proxy request failed: {}", e);
            DashboardError::TransportFailure(NETWORK_ERROR.to_string())
        })?;

        let body = res.text().await.map_err(|e| {
            warn!("Failed to read proxy response body: {}", e);
            DashboardError::TransportFailure(NETWORK_ERROR.to_string())
        })?;

        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| DashboardError::MalformedResponse(format!("proxy returned non-JSON: {e}")))?;

        if !envelope.success {
            let message = envelope
                .error
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());
            return Err(DashboardError::UpstreamFailure(message));
        }

        let data = envelope.data.ok_or_else(|| {
            DashboardError::MalformedResponse("successful response carried no data".to_string())
        })?;

        serde_json::from_value(data).map_err(|e| DashboardError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl WeatherSource for ProxyClient {
    async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, DashboardError> {
        let city = validate_city(city)?;
        self.call(&[("action", "current"), ("city", city)], CURRENT_FALLBACK).await
    }

    async fn fetch_forecast(&self, city: &str) -> Result<ForecastPayload, DashboardError> {
        let city = validate_city(city)?;
        self.call(&[("action", "forecast"), ("city", city)], FORECAST_FALLBACK).await
    }

    async fn search_city(&self, query: &str) -> Result<CityMatch, DashboardError> {
        let query = validate_query(query)?;
        self.call(&[("action", "search"), ("q", query)], SEARCH_FALLBACK).await
    }
}
