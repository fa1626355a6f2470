//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration handling
//! - Access to the upstream weather provider (used by the proxy)
//! - The proxy client the dashboard fetches through
//! - Forecast aggregation, unit conversion, favorites and theme preferences
//! - The dashboard state controller and its pure view rendering
//!
//! It is used by `dashboard-proxy` and `dashboard-cli`.

pub mod config;
pub mod controller;
pub mod error;
pub mod favorites;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod render;
pub mod source;
pub mod state;
pub mod store;
pub mod theme;
pub mod units;

pub use config::{Config, DashboardConfig, ProviderConfig, ProxyConfig};
pub use controller::{ControllerSettings, DashboardController, LoadOutcome};
pub use error::{DashboardError, ProviderError, StoreError};
pub use favorites::{AddOutcome, Favorites};
pub use forecast::{DailyForecast, aggregate_daily};
pub use model::{ApiResponse, CityMatch, Condition, ForecastPayload, ForecastSample, WeatherSnapshot};
pub use provider::UpstreamProvider;
pub use render::{View, render};
pub use source::{ProxyClient, WeatherSource};
pub use state::{DashboardState, Phase, Suggestion};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use theme::Theme;
pub use units::TemperatureUnit;
