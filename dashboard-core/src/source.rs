use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    DashboardError,
    model::{CityMatch, ForecastPayload, WeatherSnapshot},
};

pub mod proxy;

pub use proxy::ProxyClient;

pub const EMPTY_CITY: &str = "Please enter a city name";
pub const QUERY_TOO_SHORT: &str = "Query too short";
pub const MIN_QUERY_CHARS: usize = 2;

/// Where the dashboard gets its data from.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, DashboardError>;

    async fn fetch_forecast(&self, city: &str) -> Result<ForecastPayload, DashboardError>;

    async fn search_city(&self, query: &str) -> Result<CityMatch, DashboardError>;
}

/// Trimmed city name, or a validation error when it is blank.
pub fn validate_city(city: &str) -> Result<&str, DashboardError> {
    let city = city.trim();
    if city.is_empty() {
        return Err(DashboardError::InputValidation(EMPTY_CITY.to_string()));
    }
    Ok(city)
}

/// Trimmed search query, or a validation error when it is too short to send.
pub fn validate_query(query: &str) -> Result<&str, DashboardError> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(DashboardError::InputValidation(QUERY_TOO_SHORT.to_string()));
    }
    Ok(query)
}
