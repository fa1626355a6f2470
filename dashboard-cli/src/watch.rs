//! Interactive dashboard: prints every view the controller publishes and
//! turns stdin lines into controller calls.

use anyhow::Context;
use dashboard_core::{
    AddOutcome, DashboardController, DashboardState, Favorites, FileStore, LoadOutcome, Phase,
    Suggestion, TemperatureUnit, Theme,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::{
    cli::{current_theme, system_prefers_dark},
    output::Screen,
};

const HELP: &str = "\
Commands:
  <city>     load a city
  ?<text>    search for a city, ! opens the suggestion
  c | f      switch to Celsius or Fahrenheit
  r          refresh now
  +          add the current city to favorites
  *          list favorites
  t          toggle the theme
  q          quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Load(String),
    Search(String),
    OpenSuggestion,
    Unit(TemperatureUnit),
    Refresh,
    AddFavorite,
    ListFavorites,
    ToggleTheme,
    Help,
    Quit,
    Nothing,
}

impl WatchCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if let Some(text) = line.strip_prefix('?') {
            return WatchCommand::Search(text.to_string());
        }

        match line {
            "" => WatchCommand::Nothing,
            "!" => WatchCommand::OpenSuggestion,
            "c" | "C" => WatchCommand::Unit(TemperatureUnit::Celsius),
            "f" | "F" => WatchCommand::Unit(TemperatureUnit::Fahrenheit),
            "r" => WatchCommand::Refresh,
            "+" => WatchCommand::AddFavorite,
            "*" => WatchCommand::ListFavorites,
            "t" => WatchCommand::ToggleTheme,
            "h" | "help" => WatchCommand::Help,
            "q" | "quit" | "exit" => WatchCommand::Quit,
            city => WatchCommand::Load(city.to_string()),
        }
    }
}

pub async fn run(
    controller: DashboardController,
    store: FileStore,
    city: &str,
) -> anyhow::Result<()> {
    let mut theme = current_theme(&store);
    let mut favorites = Favorites::new(store);

    let mut views = controller.subscribe();
    let (theme_tx, theme_rx) = tokio::sync::watch::channel(theme);
    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            print!("{}", Screen::new(&view, *theme_rx.borrow()));
        }
    });

    println!("{HELP}");
    open(&controller, city).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match WatchCommand::parse(&line) {
            WatchCommand::Quit => break,
            WatchCommand::Nothing => {}
            WatchCommand::Help => println!("{HELP}"),
            WatchCommand::Load(city) => {
                controller.load_city(&city).await;
            }
            WatchCommand::Search(text) => controller.on_search_input(&text),
            WatchCommand::OpenSuggestion => match controller.state().suggestion {
                Some(Suggestion::Match(found)) => {
                    controller.select_suggestion(&found.name).await;
                }
                _ => println!("No suggestion to open"),
            },
            WatchCommand::Unit(unit) => {
                if !controller.switch_unit(unit) {
                    println!("Already showing {unit}");
                }
            }
            WatchCommand::Refresh => {
                controller.refresh().await;
            }
            WatchCommand::AddFavorite => {
                let state = controller.state();
                let Some(city) = favorite_city(&state) else {
                    println!("Load a city before adding it to favorites");
                    continue;
                };
                match favorites.add(city)? {
                    AddOutcome::Added => println!("Added {city} to favorites"),
                    AddOutcome::AlreadyPresent => println!("{city} is already a favorite"),
                    AddOutcome::Blank => println!("Load a city before adding it to favorites"),
                }
            }
            WatchCommand::ListFavorites => {
                let cities = favorites.list();
                if cities.is_empty() {
                    println!("No favorite cities yet");
                } else {
                    println!("Favorites: {}", cities.join(", "));
                }
            }
            WatchCommand::ToggleTheme => {
                let mut store = favorites.into_store();
                theme = Theme::toggle(&mut store, system_prefers_dark())?;
                favorites = Favorites::new(store);
                theme_tx.send_replace(theme);
                println!("Theme: {theme}");
            }
        }
    }

    debug!("Leaving watch mode");
    controller.shutdown();
    printer.abort();

    Ok(())
}

/// Load the first city. The refresh timer runs whether or not that load
/// succeeds.
pub async fn open(controller: &DashboardController, city: &str) -> LoadOutcome {
    let outcome = controller.load_city(city).await;
    if !controller.auto_refresh_active() {
        controller.start_auto_refresh();
    }
    outcome
}

/// The provider's name for the city on screen, if one is loaded.
fn favorite_city(state: &DashboardState) -> Option<&str> {
    match (&state.phase, &state.weather) {
        (Phase::Ready, Some(weather)) => Some(weather.city.as_str()),
        _ => None,
    }
}
