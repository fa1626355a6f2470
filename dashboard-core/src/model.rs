use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Weather condition descriptor as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Current conditions for a city. Temperatures are Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_deg: u16,
    pub clouds: u8,
    pub weather: Condition,
    pub timestamp: i64,
    pub sunrise: i64,
    pub sunset: i64,
    /// Offset from UTC in seconds.
    pub timezone: i32,
}

impl WeatherSnapshot {
    pub fn offset(&self) -> FixedOffset {
        utc_offset(self.timezone)
    }
}

/// One 3-hour forecast entry.
///
/// On the wire this keeps the provider's nesting
/// (`{dt, main: {temp, humidity}, weather: [..]}`) so the proxy can forward
/// list entries without inventing a new shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireSample", into = "WireSample")]
pub struct ForecastSample {
    pub timestamp: i64,
    pub temperature: f64,
    pub humidity: u8,
    pub condition: Condition,
}

impl ForecastSample {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireSampleMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireSample {
    dt: i64,
    main: WireSampleMain,
    weather: Vec<Condition>,
}

impl TryFrom<WireSample> for ForecastSample {
    type Error = String;

    fn try_from(wire: WireSample) -> Result<Self, Self::Error> {
        let condition = wire
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| format!("forecast entry at {} has no weather condition", wire.dt))?;

        Ok(ForecastSample {
            timestamp: wire.dt,
            temperature: wire.main.temp,
            humidity: wire.main.humidity,
            condition,
        })
    }
}

impl From<ForecastSample> for WireSample {
    fn from(sample: ForecastSample) -> Self {
        WireSample {
            dt: sample.timestamp,
            main: WireSampleMain { temp: sample.temperature, humidity: sample.humidity },
            weather: vec![sample.condition],
        }
    }
}

/// Multi-day forecast for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub city: String,
    pub country: String,
    pub list: Vec<ForecastSample>,
    /// Offset from UTC in seconds.
    pub timezone: i32,
}

impl ForecastPayload {
    pub fn offset(&self) -> FixedOffset {
        utc_offset(self.timezone)
    }
}

/// Result of a city search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMatch {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

/// JSON envelope every proxy response is wrapped in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, http_code: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()), http_code: None }
    }

    pub fn with_http_code(mut self, code: u16) -> Self {
        self.http_code = Some(code);
        self
    }
}

/// Offsets outside +/-24h are not real; those fall back to UTC.
pub fn utc_offset(seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}
