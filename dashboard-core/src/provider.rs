use crate::{
    Config, ProviderError,
    model::{CityMatch, ForecastPayload, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, time::Duration};

pub mod openweather;

pub const CURRENT_FALLBACK: &str = "Failed to fetch weather data";
pub const FORECAST_FALLBACK: &str = "Failed to fetch forecast data";
pub const SEARCH_FALLBACK: &str = "City not found";

/// The external weather service as seen by the proxy.
///
/// Implementations normalize the provider's payloads into the stable shapes
/// the proxy serves. Inputs are assumed already validated.
#[async_trait]
pub trait UpstreamProvider: Send + Sync + Debug {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError>;

    async fn forecast(&self, city: &str) -> Result<ForecastPayload, ProviderError>;

    async fn search(&self, query: &str) -> Result<CityMatch, ProviderError>;
}

/// Construct the upstream provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn UpstreamProvider>> {
    let api_key = config.require_api_key()?;

    let provider = OpenWeatherProvider::builder(api_key.to_owned())
        .base_url(&config.provider.base_url)
        .timeout(Duration::from_secs(config.provider.timeout_secs))
        .build()?;

    Ok(Box::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.provider.api_key = Some("KEY".to_string());

        let provider = provider_from_config(&cfg);
        assert!(provider.is_ok());
    }
}
