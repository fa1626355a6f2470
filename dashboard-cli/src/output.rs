//! Human-friendly terminal output for dashboard views.

use std::fmt;

use dashboard_core::{
    CityMatch, Theme,
    render::{ForecastCard, Status, SuggestionView, View},
};

/// A [`View`] painted for the terminal.
pub struct Screen<'a> {
    view: &'a View,
    theme: Theme,
}

impl<'a> Screen<'a> {
    pub fn new(view: &'a View, theme: Theme) -> Self {
        Self { view, theme }
    }

    fn accent(&self, text: &str) -> String {
        let color = match self.theme {
            Theme::Dark => "96",
            Theme::Light => "34",
        };
        format!("\x1b[1;{color}m{text}\x1b[0m")
    }
}

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.view;

        match &view.status {
            Status::Idle => writeln!(f, "{} ({})", view.city, view.unit)?,
            Status::Loading => writeln!(f, "Loading weather for {}...", view.city)?,
            Status::Error { message } => writeln!(f, "Error: {message}")?,
            Status::Ready => {}
        }

        if let Some(current) = &view.current {
            writeln!(f, "{} {}", current.emoji, self.accent(&current.heading))?;
            writeln!(f, "{}", current.date)?;
            writeln!(
                f,
                "{} (feels like {})  {}",
                current.temperature, current.feels_like, current.description
            )?;
            writeln!(f, "Low {} / High {}", current.temp_min, current.temp_max)?;
            writeln!(
                f,
                "Humidity {}  Wind {}  Pressure {}  Clouds {}",
                current.humidity, current.wind, current.pressure, current.clouds
            )?;
            writeln!(f, "Sunrise {}  Sunset {}", current.sunrise, current.sunset)?;
        }

        if !view.forecast.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.accent("5-day forecast"))?;
            for card in &view.forecast {
                writeln!(f, "{}", forecast_line(card))?;
            }
        }

        match &view.suggestion {
            Some(SuggestionView::Match { title, detail, .. }) => {
                writeln!(f, "Suggestion: {title} ({detail}), enter ! to open")?
            }
            Some(SuggestionView::NoResults { message }) => writeln!(f, "Suggestion: {message}")?,
            None => {}
        }

        Ok(())
    }
}

fn forecast_line(card: &ForecastCard) -> String {
    let range = match &card.range {
        Some((min, max)) => format!("{min} / {max}"),
        None => String::new(),
    };

    format!(
        "{:<12} {} {:>6}  {:<15} {}  humidity {}",
        card.label, card.emoji, card.temperature, range, card.description, card.humidity
    )
}

pub fn city_line(city: &CityMatch) -> String {
    format!("{}, {} (Lat: {}, Lon: {})", city.name, city.country, city.lat, city.lon)
}
