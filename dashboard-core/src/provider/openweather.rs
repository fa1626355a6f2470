use async_trait::async_trait;
use reqwest::{Client, header::ACCEPT};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{instrument, warn};

use crate::{
    ProviderError,
    config::DEFAULT_PROVIDER_URL,
    model::{CityMatch, Condition, ForecastPayload, ForecastSample, WeatherSnapshot},
    provider::{CURRENT_FALLBACK, FORECAST_FALLBACK, SEARCH_FALLBACK},
};

use super::UpstreamProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

#[derive(Debug)]
pub struct OpenWeatherBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenWeatherBuilder {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenWeatherProvider, reqwest::Error> {
        let http = Client::builder().timeout(self.timeout).build()?;

        Ok(OpenWeatherProvider { api_key: self.api_key, base_url: self.base_url, http })
    }
}

impl OpenWeatherProvider {
    pub fn builder(api_key: String) -> OpenWeatherBuilder {
        OpenWeatherBuilder {
            api_key,
            base_url: DEFAULT_PROVIDER_URL.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// GET `{base_url}/{endpoint}?q=..&appid=..&units=metric` and decode the body.
    ///
    /// Non-2xx statuses carry the provider's `message` field when it has one,
    /// otherwise `fallback`.
    #[instrument(skip(self, fallback), level = "debug")]
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &str,
        fallback: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let res = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&[("q", query), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            // The URL carries the API key; keep it out of messages that reach clients.
            .map_err(|e| ProviderError::Connection(e.without_url().to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::Connection(e.without_url().to_string()))?;

        if !status.is_success() {
            warn!(%status, body = %truncate_body(&body), "OpenWeather {endpoint} request failed");
            let message = provider_message(&body).unwrap_or_else(|| fallback.to_string());
            return Err(ProviderError::Upstream { status: status.as_u16(), message });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(body = %truncate_body(&body), "Unexpected OpenWeather {endpoint} payload");
            ProviderError::Malformed(format!("{endpoint}: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: u16,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    timezone: i32,
    main: OwMain,
    wind: OwWind,
    clouds: OwClouds,
    weather: Vec<Condition>,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwCountry {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwLocationResponse {
    name: String,
    coord: OwCoord,
    sys: OwCountry,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<ForecastSample>,
}

impl TryFrom<OwCurrentResponse> for WeatherSnapshot {
    type Error = ProviderError;

    fn try_from(parsed: OwCurrentResponse) -> Result<Self, Self::Error> {
        let weather = parsed.weather.into_iter().next().ok_or_else(|| {
            ProviderError::Malformed("weather: current response has no condition".to_string())
        })?;

        Ok(WeatherSnapshot {
            city: parsed.name,
            country: parsed.sys.country,
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            temp_min: parsed.main.temp_min,
            temp_max: parsed.main.temp_max,
            humidity: parsed.main.humidity,
            pressure: parsed.main.pressure,
            wind_speed: parsed.wind.speed,
            wind_deg: parsed.wind.deg,
            clouds: parsed.clouds.all,
            weather,
            timestamp: parsed.dt,
            sunrise: parsed.sys.sunrise,
            sunset: parsed.sys.sunset,
            timezone: parsed.timezone,
        })
    }
}

#[async_trait]
impl UpstreamProvider for OpenWeatherProvider {
    async fn current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError> {
        let parsed: OwCurrentResponse = self.get_json("weather", city, CURRENT_FALLBACK).await?;
        WeatherSnapshot::try_from(parsed)
    }

    async fn forecast(&self, city: &str) -> Result<ForecastPayload, ProviderError> {
        let parsed: OwForecastResponse =
            self.get_json("forecast", city, FORECAST_FALLBACK).await?;

        Ok(ForecastPayload {
            city: parsed.city.name,
            country: parsed.city.country,
            list: parsed.list,
            timezone: parsed.city.timezone,
        })
    }

    async fn search(&self, query: &str) -> Result<CityMatch, ProviderError> {
        // Any lookup failure reads as "not found"; malformed bodies stay distinct.
        let parsed: OwLocationResponse =
            self.get_json("weather", query, SEARCH_FALLBACK).await.map_err(|e| match e {
                ProviderError::Malformed(_) => e,
                other => ProviderError::Upstream {
                    status: other.http_code(),
                    message: SEARCH_FALLBACK.to_string(),
                },
            })?;

        Ok(CityMatch {
            name: parsed.name,
            country: parsed.sys.country,
            lat: parsed.coord.lat,
            lon: parsed.coord.lon,
        })
    }
}

fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::builder("test_key".to_string())
            .base_url(&server.uri())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    fn current_body() -> serde_json::Value {
        json!({
            "coord": { "lon": 106.8451, "lat": -6.2146 },
            "weather": [{ "id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d" }],
            "main": {
                "temp": 31.2, "feels_like": 36.4, "temp_min": 30.1, "temp_max": 32.0,
                "pressure": 1009, "humidity": 62
            },
            "wind": { "speed": 3.6, "deg": 320 },
            "clouds": { "all": 40 },
            "dt": 1_700_000_000,
            "sys": { "country": "ID", "sunrise": 1_699_999_000, "sunset": 1_700_043_000 },
            "timezone": 25200,
            "name": "Jakarta"
        })
    }

    #[tokio::test]
    async fn current_normalizes_provider_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Jakarta"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let snapshot = provider(&server).current("Jakarta").await.unwrap();

        assert_eq!(snapshot.city, "Jakarta");
        assert_eq!(snapshot.country, "ID");
        assert_eq!(snapshot.temperature, 31.2);
        assert_eq!(snapshot.pressure, 1009);
        assert_eq!(snapshot.wind_deg, 320);
        assert_eq!(snapshot.clouds, 40);
        assert_eq!(snapshot.weather.icon, "03d");
        assert_eq!(snapshot.timezone, 25200);
    }

    #[tokio::test]
    async fn missing_wind_direction_defaults_to_zero() {
        let server = MockServer::start().await;
        let mut body = current_body();
        body["wind"] = json!({ "speed": 1.0 });

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let snapshot = provider(&server).current("Jakarta").await.unwrap();
        assert_eq!(snapshot.wind_deg, 0);
    }

    #[tokio::test]
    async fn current_passes_provider_message_through() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "cod": "404", "message": "city not found" })),
            )
            .mount(&server)
            .await;

        let err = provider(&server).current("Atlantis").await.unwrap_err();

        assert_eq!(err.to_string(), "city not found");
        assert_eq!(err.http_code(), 404);
    }

    #[tokio::test]
    async fn forecast_uses_fallback_without_provider_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = provider(&server).forecast("Jakarta").await.unwrap_err();
        assert_eq!(err.to_string(), FORECAST_FALLBACK);
    }

    #[tokio::test]
    async fn forecast_keeps_samples_and_city_offset() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cod": "200",
                "list": [
                    {
                        "dt": 1_700_000_000,
                        "main": { "temp": 28.0, "humidity": 70 },
                        "weather": [{ "main": "Rain", "description": "light rain", "icon": "10d" }],
                        "dt_txt": "2023-11-14 22:13:20"
                    },
                    {
                        "dt": 1_700_010_800,
                        "main": { "temp": 26.5, "humidity": 75 },
                        "weather": [{ "main": "Clouds", "description": "overcast clouds", "icon": "04n" }]
                    }
                ],
                "city": { "name": "Jakarta", "country": "ID", "timezone": 25200 }
            })))
            .mount(&server)
            .await;

        let payload = provider(&server).forecast("Jakarta").await.unwrap();

        assert_eq!(payload.city, "Jakarta");
        assert_eq!(payload.timezone, 25200);
        assert_eq!(payload.list.len(), 2);
        assert_eq!(payload.list[1].condition.description, "overcast clouds");
    }

    #[tokio::test]
    async fn missing_fields_are_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "name": "Jakarta", "dt": 1 })),
            )
            .mount(&server)
            .await;

        let err = provider(&server).current("Jakarta").await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn search_failure_reads_as_city_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "city not found" })),
            )
            .mount(&server)
            .await;

        let err = provider(&server).search("Atlantis").await.unwrap_err();

        assert_eq!(err.to_string(), SEARCH_FALLBACK);
        assert_eq!(err.http_code(), 404);
    }

    #[tokio::test]
    async fn search_returns_coordinates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Jak"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
            .mount(&server)
            .await;

        let found = provider(&server).search("Jak").await.unwrap();

        assert_eq!(found.name, "Jakarta");
        assert_eq!(found.country, "ID");
        assert_eq!(found.lat, -6.2146);
        assert_eq!(found.lon, 106.8451);
    }

    #[tokio::test]
    async fn unreachable_provider_is_connection_error() {
        let provider = OpenWeatherProvider::builder("secret_key".to_string())
            .base_url("http://127.0.0.1:9")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = provider.current("Jakarta").await.unwrap_err();

        assert!(matches!(err, ProviderError::Connection(_)));
        assert!(!err.to_string().contains("secret_key"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(300);
        let truncated = truncate_body(&body);

        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }
}
