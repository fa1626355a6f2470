use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use dashboard_core::{
    AddOutcome, Config, ControllerSettings, DashboardController, DashboardError, DashboardState,
    Favorites, FileStore, LoadOutcome, ProxyClient, TemperatureUnit, Theme, WeatherSource,
    render::NO_RESULTS,
};
use inquire::{Password, PasswordDisplayMode, Text};

use crate::{output, watch};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Weather dashboard for the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Edit the config file interactively.
    Configure,

    /// Show current weather and the 5-day forecast for a city.
    Show {
        /// City name; defaults to the configured default city.
        city: Option<String>,

        #[arg(long, short, default_value_t = TemperatureUnit::Celsius)]
        unit: TemperatureUnit,
    },

    /// Look up a city by name.
    Search {
        query: String,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Show or change the color theme.
    Theme {
        mode: Option<ThemeMode>,
    },

    /// Live dashboard with auto-refresh; reads commands from stdin.
    Watch {
        city: Option<String>,

        #[arg(long, short, default_value_t = TemperatureUnit::Celsius)]
        unit: TemperatureUnit,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    List,
    Add { city: String },
    Remove { city: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeMode {
    Dark,
    Light,
    Toggle,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, unit } => show(city, unit).await,
            Command::Search { query } => search(&query).await,
            Command::Favorites { action } => favorites(action),
            Command::Theme { mode } => theme(mode),
            Command::Watch { city, unit } => {
                let config = Config::load()?;
                let city = city.unwrap_or_else(|| config.dashboard.default_city.clone());
                let store = open_store()?;
                let controller = controller(&config, &city, unit);
                watch::run(controller, store, &city).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("OpenWeatherMap API key (leave empty to keep the current one):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    if !key.trim().is_empty() {
        config.provider.api_key = Some(key.trim().to_string());
    }

    config.dashboard.proxy_url = Text::new("Proxy endpoint:")
        .with_default(&config.dashboard.proxy_url)
        .prompt()?;

    config.dashboard.default_city = Text::new("Default city:")
        .with_default(&config.dashboard.default_city)
        .prompt()?;

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

async fn show(city: Option<String>, unit: TemperatureUnit) -> anyhow::Result<()> {
    let config = Config::load()?;
    let city = city.unwrap_or_else(|| config.dashboard.default_city.clone());
    let theme = current_theme(&open_store()?);

    let controller = controller(&config, &city, unit);
    let outcome = controller.load_city(&city).await;
    controller.shutdown();

    match outcome {
        LoadOutcome::Ready => {
            print!("{}", output::Screen::new(&controller.view(), theme));
            Ok(())
        }
        LoadOutcome::Failed(message) => bail!(message),
        LoadOutcome::Superseded => bail!("Load for {city} was interrupted"),
    }
}

async fn search(query: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let client = ProxyClient::new(config.dashboard.proxy_url.clone());

    match client.search_city(query).await {
        Ok(found) => println!("{}", output::city_line(&found)),
        Err(DashboardError::InputValidation(message)) => bail!(message),
        Err(e) => {
            tracing::debug!("search failed: {e}");
            println!("{NO_RESULTS}");
        }
    }

    Ok(())
}

fn favorites(action: FavoritesAction) -> anyhow::Result<()> {
    let mut favorites = Favorites::new(open_store()?);

    match action {
        FavoritesAction::List => {
            let cities = favorites.list();
            if cities.is_empty() {
                println!("No favorite cities yet");
            }
            for city in cities {
                println!("{city}");
            }
        }
        FavoritesAction::Add { city } => match favorites.add(&city)? {
            AddOutcome::Added => println!("Added {} to favorites", city.trim()),
            AddOutcome::AlreadyPresent => println!("{} is already a favorite", city.trim()),
            AddOutcome::Blank => bail!("City name cannot be empty"),
        },
        FavoritesAction::Remove { city } => match favorites.remove(&city)? {
            0 => println!("{city} is not a favorite"),
            _ => println!("Removed {city} from favorites"),
        },
    }

    Ok(())
}

fn theme(mode: Option<ThemeMode>) -> anyhow::Result<()> {
    let mut store = open_store()?;

    let theme = match mode {
        None => current_theme(&store),
        Some(ThemeMode::Toggle) => Theme::toggle(&mut store, system_prefers_dark())?,
        Some(ThemeMode::Dark) => {
            Theme::Dark.save(&mut store)?;
            Theme::Dark
        }
        Some(ThemeMode::Light) => {
            Theme::Light.save(&mut store)?;
            Theme::Light
        }
    };

    println!("Theme: {theme}");
    Ok(())
}

fn controller(config: &Config, city: &str, unit: TemperatureUnit) -> DashboardController {
    let source = Arc::new(ProxyClient::new(config.dashboard.proxy_url.clone()));
    DashboardController::new(
        source,
        ControllerSettings::from(&config.dashboard),
        DashboardState::new(city, unit),
    )
}

pub fn open_store() -> anyhow::Result<FileStore> {
    let path = Config::storage_file_path().context("Failed to locate the storage file")?;
    Ok(FileStore::open(path))
}

pub fn current_theme(store: &FileStore) -> Theme {
    Theme::load(store, system_prefers_dark())
}

/// Terminals that export `COLORFGBG` (e.g. "15;0") tell us their background.
pub fn system_prefers_dark() -> bool {
    prefers_dark(std::env::var("COLORFGBG").ok().as_deref())
}

fn prefers_dark(colorfgbg: Option<&str>) -> bool {
    match colorfgbg.and_then(|v| v.rsplit(';').next()).and_then(|bg| bg.parse::<u8>().ok()) {
        Some(bg) => bg < 7 || bg == 8,
        None => true,
    }
}
