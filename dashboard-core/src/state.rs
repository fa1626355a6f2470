use serde::Serialize;

use crate::{
    forecast::{DailyForecast, aggregate_daily},
    model::{CityMatch, ForecastPayload, WeatherSnapshot},
    units::TemperatureUnit,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "message", rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    Match(CityMatch),
    NoResults,
}

/// Everything the dashboard knows. Mutated only by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub city: String,
    pub unit: TemperatureUnit,
    pub phase: Phase,
    pub weather: Option<WeatherSnapshot>,
    pub forecast: Option<ForecastPayload>,
    /// Derived from `forecast` whenever it is replaced.
    pub daily: Vec<DailyForecast>,
    pub suggestion: Option<Suggestion>,
}

impl DashboardState {
    pub fn new(city: impl Into<String>, unit: TemperatureUnit) -> Self {
        Self {
            city: city.into(),
            unit,
            phase: Phase::Idle,
            weather: None,
            forecast: None,
            daily: Vec::new(),
            suggestion: None,
        }
    }

    pub(crate) fn begin_loading(&mut self, city: &str) {
        self.city = city.to_string();
        self.phase = Phase::Loading;
    }

    pub(crate) fn apply(&mut self, weather: WeatherSnapshot, forecast: ForecastPayload) {
        self.daily = aggregate_daily(&forecast.list, forecast.timezone);
        self.weather = Some(weather);
        self.forecast = Some(forecast);
        self.phase = Phase::Ready;
    }

    /// Previously fetched payloads are kept; the view hides them while failed.
    pub(crate) fn fail(&mut self, message: String) {
        self.phase = Phase::Error(message);
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CITY, TemperatureUnit::default())
    }
}
