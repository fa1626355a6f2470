use std::{collections::HashMap, sync::Arc};

use dashboard_core::{ApiResponse, ProviderError, UpstreamProvider, source::MIN_QUERY_CHARS};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

pub const CITY_REQUIRED: &str = "City parameter is required";
pub const QUERY_REQUIRED: &str = "Query parameter is required";
pub const QUERY_TOO_SHORT: &str = "Query too short";
pub const INVALID_ACTION: &str = "Invalid action. Available actions: current, forecast, search";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Current,
    Forecast,
    Search,
}

impl Action {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "current" => Some(Action::Current),
            "forecast" => Some(Action::Forecast),
            "search" => Some(Action::Search),
            _ => None,
        }
    }
}

/// Query-string driven front of the weather provider.
///
/// Every outcome is a JSON envelope; validation failures never reach the
/// provider.
#[derive(Debug, Clone)]
pub struct ProxyService {
    provider: Arc<dyn UpstreamProvider>,
}

impl ProxyService {
    pub fn new(provider: Arc<dyn UpstreamProvider>) -> Self {
        Self { provider }
    }

    pub async fn handle(&self, params: &HashMap<String, String>) -> Value {
        let action = params.get("action").map(String::as_str).unwrap_or_default();

        let Some(action) = Action::parse(action) else {
            return failure(INVALID_ACTION);
        };

        match action {
            Action::Current => {
                let Some(city) = non_empty(params, "city") else {
                    return failure(CITY_REQUIRED);
                };
                info!(city, "current weather request");
                envelope(self.provider.current(city).await)
            }
            Action::Forecast => {
                let Some(city) = non_empty(params, "city") else {
                    return failure(CITY_REQUIRED);
                };
                info!(city, "forecast request");
                envelope(self.provider.forecast(city).await)
            }
            Action::Search => {
                let Some(query) = non_empty(params, "q") else {
                    return failure(QUERY_REQUIRED);
                };
                if query.chars().count() < MIN_QUERY_CHARS {
                    return failure(QUERY_TOO_SHORT);
                }
                info!(query, "city search request");
                envelope(self.provider.search(query).await)
            }
        }
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn failure(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

fn envelope<T: Serialize>(result: Result<T, ProviderError>) -> Value {
    let response = match result {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => {
            warn!("Provider request failed: {}", e);
            let code = e.http_code();
            ApiResponse::failure(e.to_string()).with_http_code(code)
        }
    };

    serde_json::to_value(&response)
        .unwrap_or_else(|e| json!({ "success": false, "error": format!("Server error: {e}") }))
}
