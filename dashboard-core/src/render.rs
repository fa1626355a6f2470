//! Pure projection of [`DashboardState`] into display-ready strings.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::{
    forecast::DailyForecast,
    model::{CityMatch, WeatherSnapshot},
    state::{DashboardState, Phase, Suggestion},
    units::TemperatureUnit,
};

pub const NO_RESULTS: &str = "No results found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Status {
    Idle,
    Loading,
    Ready,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentView {
    pub heading: String,
    pub date: String,
    pub temperature: String,
    pub feels_like: String,
    pub temp_min: String,
    pub temp_max: String,
    pub description: String,
    pub icon_url: String,
    pub emoji: &'static str,
    pub humidity: String,
    pub wind: String,
    pub pressure: String,
    pub clouds: String,
    pub sunrise: String,
    pub sunset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastCard {
    pub label: String,
    pub icon_url: String,
    pub emoji: &'static str,
    pub description: String,
    pub temperature: String,
    /// `(min, max)`, absent when the day had no samples to range over.
    pub range: Option<(String, String)>,
    pub humidity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionView {
    Match { name: String, title: String, detail: String },
    NoResults { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub city: String,
    pub unit: TemperatureUnit,
    pub status: Status,
    /// Only present when the last load succeeded.
    pub current: Option<CurrentView>,
    pub forecast: Vec<ForecastCard>,
    pub suggestion: Option<SuggestionView>,
}

impl Default for View {
    fn default() -> Self {
        render(&DashboardState::default())
    }
}

pub fn render(state: &DashboardState) -> View {
    let status = match &state.phase {
        Phase::Idle => Status::Idle,
        Phase::Loading => Status::Loading,
        Phase::Ready => Status::Ready,
        Phase::Error(message) => Status::Error { message: message.clone() },
    };

    let (current, forecast) = match (&state.phase, &state.weather) {
        (Phase::Ready, Some(weather)) => (
            Some(current_view(weather, state.unit)),
            state
                .daily
                .iter()
                .map(|day| forecast_card(day, state.unit))
                .collect(),
        ),
        _ => (None, Vec::new()),
    };

    View {
        city: state.city.clone(),
        unit: state.unit,
        status,
        current,
        forecast,
        suggestion: state.suggestion.as_ref().map(suggestion_view),
    }
}

fn current_view(w: &WeatherSnapshot, unit: TemperatureUnit) -> CurrentView {
    let offset = w.offset();

    CurrentView {
        heading: format!("{}, {}", w.city, w.country),
        date: local_time(w.timestamp, offset, "%A, %B %-d, %Y %H:%M"),
        temperature: unit.format(w.temperature),
        feels_like: unit.format(w.feels_like),
        temp_min: unit.format(w.temp_min),
        temp_max: unit.format(w.temp_max),
        description: w.weather.description.clone(),
        icon_url: icon_url(&w.weather.icon),
        emoji: weather_emoji(&w.weather.icon),
        humidity: format!("{}%", w.humidity),
        wind: format!("{} m/s", w.wind_speed),
        pressure: format!("{} hPa", w.pressure),
        clouds: format!("{}%", w.clouds),
        sunrise: local_time(w.sunrise, offset, "%H:%M"),
        sunset: local_time(w.sunset, offset, "%H:%M"),
    }
}

fn forecast_card(day: &DailyForecast, unit: TemperatureUnit) -> ForecastCard {
    let sample = &day.representative;

    ForecastCard {
        label: day.date.format("%a, %b %-d").to_string(),
        icon_url: icon_url(&sample.condition.icon),
        emoji: weather_emoji(&sample.condition.icon),
        description: sample.condition.description.clone(),
        temperature: unit.format(sample.temperature),
        range: match (day.min, day.max) {
            (Some(min), Some(max)) => Some((unit.format(min), unit.format(max))),
            _ => None,
        },
        humidity: format!("{}%", sample.humidity),
    }
}

fn suggestion_view(suggestion: &Suggestion) -> SuggestionView {
    match suggestion {
        Suggestion::Match(CityMatch { name, country, lat, lon }) => SuggestionView::Match {
            name: name.clone(),
            title: format!("{name}, {country}"),
            detail: format!("Lat: {lat}, Lon: {lon}"),
        },
        Suggestion::NoResults => SuggestionView::NoResults { message: NO_RESULTS.to_string() },
    }
}

fn local_time(timestamp: i64, offset: FixedOffset, fmt: &str) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.with_timezone(&offset).format(fmt).to_string())
        .unwrap_or_default()
}

pub fn icon_url(icon: &str) -> String {
    format!("https://openweathermap.org/img/wn/{icon}@4x.png")
}

pub fn weather_emoji(icon: &str) -> &'static str {
    match icon {
        "01d" => "☀️",
        "01n" => "🌙",
        "02d" => "⛅",
        "02n" | "03d" | "03n" | "04d" | "04n" => "☁️",
        "09d" | "09n" | "10n" => "🌧️",
        "10d" => "🌦️",
        "11d" | "11n" => "⛈️",
        "13d" | "13n" => "❄️",
        "50d" | "50n" => "🌫️",
        _ => "🌤️",
    }
}
