//! Owns the dashboard state and drives the fetch, transform, render cycle.
//!
//! The controller is a cheap cloneable handle. It must be used inside a Tokio
//! runtime because the auto-refresh and search-debounce timers are spawned
//! tasks. At most one of each timer is live; starting one aborts the previous
//! task first.

use parking_lot::Mutex;
use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::DashboardConfig,
    render::{View, render},
    source::{MIN_QUERY_CHARS, WeatherSource, validate_city},
    state::{DashboardState, Suggestion},
    units::TemperatureUnit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub refresh_interval: Duration,
    pub search_debounce: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

impl From<&DashboardConfig> for ControllerSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            search_debounce: config.search_debounce(),
        }
    }
}

/// How a `load_city` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Failed(String),
    /// A newer load started before this one finished; its results were dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct Timers {
    refresh: Option<JoinHandle<()>>,
    debounce: Option<JoinHandle<()>>,
}

impl Timers {
    fn stop_refresh(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.abort();
        }
    }

    fn stop_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
struct Inner {
    source: Arc<dyn WeatherSource>,
    settings: ControllerSettings,
    state: Mutex<DashboardState>,
    timers: Mutex<Timers>,
    /// Bumped by every load; a load only applies results if it is still the latest.
    load_seq: AtomicU64,
    views: watch::Sender<View>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timers = self.timers.get_mut();
        timers.stop_refresh();
        timers.stop_debounce();
    }
}

#[derive(Debug, Clone)]
pub struct DashboardController {
    inner: Arc<Inner>,
}

impl DashboardController {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        settings: ControllerSettings,
        initial: DashboardState,
    ) -> Self {
        let (views, _) = watch::channel(render(&initial));

        Self {
            inner: Arc::new(Inner {
                source,
                settings,
                state: Mutex::new(initial),
                timers: Mutex::new(Timers::default()),
                load_seq: AtomicU64::new(0),
                views,
            }),
        }
    }

    /// Receives a fresh [`View`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.inner.views.subscribe()
    }

    pub fn state(&self) -> DashboardState {
        self.inner.state.lock().clone()
    }

    pub fn view(&self) -> View {
        render(&self.inner.state.lock())
    }

    pub fn settings(&self) -> ControllerSettings {
        self.inner.settings
    }

    /// Fetch current conditions and forecast for `city` together and apply
    /// both, or neither.
    #[instrument(skip(self))]
    pub async fn load_city(&self, city: &str) -> LoadOutcome {
        let city = match validate_city(city) {
            Ok(city) => city.to_string(),
            Err(e) => {
                let message = e.to_string();
                self.update(|s| s.fail(message.clone()));
                return LoadOutcome::Failed(message);
            }
        };

        // Sequence bump and state change share the lock, so loads enter and
        // leave the state in the same order.
        let seq = self.update(|s| {
            s.begin_loading(&city);
            self.inner.load_seq.fetch_add(1, Ordering::SeqCst) + 1
        });
        info!("Loading weather for {}", city);

        let source = &self.inner.source;
        let (current, forecast) =
            tokio::join!(source.fetch_current(&city), source.fetch_forecast(&city));

        let outcome = {
            let mut state = self.inner.state.lock();
            if self.inner.load_seq.load(Ordering::SeqCst) != seq {
                debug!("Discarding results for {}: a newer load is in flight", city);
                return LoadOutcome::Superseded;
            }

            let outcome = match (current, forecast) {
                (Ok(weather), Ok(forecast)) => {
                    state.apply(weather, forecast);
                    LoadOutcome::Ready
                }
                (Err(e), _) | (_, Err(e)) => {
                    let message = e.to_string();
                    warn!("Failed to load weather for {}: {}", city, message);
                    state.fail(message.clone());
                    LoadOutcome::Failed(message)
                }
            };
            self.inner.views.send_replace(render(&state));
            outcome
        };

        if outcome == LoadOutcome::Ready {
            self.start_auto_refresh();
        }
        outcome
    }

    /// Reload the current city.
    pub async fn refresh(&self) -> LoadOutcome {
        let city = self.inner.state.lock().city.clone();
        self.load_city(&city).await
    }

    /// Change the display unit and re-render stored data. Returns `false`
    /// when the unit was already active.
    pub fn switch_unit(&self, unit: TemperatureUnit) -> bool {
        if self.inner.state.lock().unit == unit {
            return false;
        }
        self.update(|s| s.unit = unit);
        true
    }

    /// (Re)start the repeating refresh timer. The first refresh happens one
    /// full period from now.
    pub fn start_auto_refresh(&self) {
        let period = self.inner.settings.refresh_interval;
        let weak = Arc::downgrade(&self.inner);

        let mut timers = self.inner.timers.lock();
        timers.stop_refresh();
        timers.refresh = Some(tokio::spawn(refresh_loop(weak, period)));

        debug!("Auto-refresh enabled: every {:?}", period);
    }

    pub fn stop_auto_refresh(&self) {
        self.inner.timers.lock().stop_refresh();
    }

    pub fn auto_refresh_active(&self) -> bool {
        self.inner.timers.lock().refresh.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Feed one keystroke's worth of search text.
    ///
    /// The search runs once input has been quiet for the debounce period.
    /// Queries shorter than two characters clear the suggestion instead.
    pub fn on_search_input(&self, text: &str) {
        let query = text.trim().to_string();

        let mut timers = self.inner.timers.lock();
        timers.stop_debounce();

        if query.chars().count() < MIN_QUERY_CHARS {
            drop(timers);
            self.update(|s| s.suggestion = None);
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.settings.search_debounce;
        timers.debounce = Some(tokio::spawn(debounced_search(weak, delay, query)));
    }

    pub fn clear_suggestion(&self) {
        self.inner.timers.lock().stop_debounce();
        self.update(|s| s.suggestion = None);
    }

    /// Pick a suggested city: hide suggestions and load it.
    pub async fn select_suggestion(&self, city: &str) -> LoadOutcome {
        self.clear_suggestion();
        self.load_city(city).await
    }

    /// Stop both timers. In-flight loads still finish.
    pub fn shutdown(&self) {
        let mut timers = self.inner.timers.lock();
        timers.stop_refresh();
        timers.stop_debounce();
        info!("Dashboard controller stopped");
    }

    /// Mutate state and publish the new view while still holding the lock,
    /// so subscribers observe views in mutation order.
    fn update<R>(&self, f: impl FnOnce(&mut DashboardState) -> R) -> R {
        let mut state = self.inner.state.lock();
        let out = f(&mut state);
        self.inner.views.send_replace(render(&state));
        out
    }

    fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }
}

async fn refresh_loop(weak: Weak<Inner>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(inner) = weak.upgrade() else {
            break;
        };
        let controller = DashboardController::from_inner(inner);
        debug!("Auto-refreshing weather data");

        // Detached so a restart of this timer cannot cancel the load it fired.
        tokio::spawn(async move {
            controller.refresh().await;
        });
    }
}

async fn debounced_search(weak: Weak<Inner>, delay: Duration, query: String) {
    tokio::time::sleep(delay).await;

    let Some(inner) = weak.upgrade() else {
        return;
    };
    let controller = DashboardController::from_inner(inner);

    let suggestion = match controller.inner.source.search_city(&query).await {
        Ok(found) => Suggestion::Match(found),
        Err(e) => {
            debug!("Search for {:?} found nothing: {}", query, e);
            Suggestion::NoResults
        }
    };

    controller.update(|s| s.suggestion = Some(suggestion));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DashboardError,
        model::{CityMatch, Condition, ForecastPayload, ForecastSample, WeatherSnapshot},
        render::Status,
        source::validate_query,
        state::Phase,
    };
    use async_trait::async_trait;
    use std::{collections::HashMap, sync::atomic::AtomicUsize};

    const PERIOD: Duration = Duration::from_secs(300);

    #[derive(Debug, Default)]
    struct FakeSource {
        current_calls: AtomicUsize,
        forecast_calls: AtomicUsize,
        searches: Mutex<Vec<String>>,
        current_errors: HashMap<String, String>,
        forecast_errors: HashMap<String, String>,
        delays: HashMap<String, Duration>,
    }

    impl FakeSource {
        fn current_calls(&self) -> usize {
            self.current_calls.load(Ordering::SeqCst)
        }

        async fn pause_for(&self, city: &str) {
            if let Some(delay) = self.delays.get(city) {
                tokio::time::sleep(*delay).await;
            }
        }
    }

    fn condition() -> Condition {
        Condition { main: "Clear".into(), description: "clear sky".into(), icon: "01d".into() }
    }

    #[async_trait]
    impl WeatherSource for FakeSource {
        async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, DashboardError> {
            self.current_calls.fetch_add(1, Ordering::SeqCst);
            self.pause_for(city).await;
            if let Some(msg) = self.current_errors.get(city) {
                return Err(DashboardError::UpstreamFailure(msg.clone()));
            }
            Ok(WeatherSnapshot {
                city: city.to_string(),
                country: "XX".into(),
                temperature: 20.0,
                feels_like: 19.0,
                temp_min: 18.0,
                temp_max: 22.0,
                humidity: 50,
                pressure: 1013,
                wind_speed: 2.0,
                wind_deg: 90,
                clouds: 10,
                weather: condition(),
                timestamp: 1_709_528_400,
                sunrise: 1_709_506_200,
                sunset: 1_709_550_000,
                timezone: 0,
            })
        }

        async fn fetch_forecast(&self, city: &str) -> Result<ForecastPayload, DashboardError> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            self.pause_for(city).await;
            if let Some(msg) = self.forecast_errors.get(city) {
                return Err(DashboardError::UpstreamFailure(msg.clone()));
            }
            let list = (0..16)
                .map(|i| ForecastSample {
                    timestamp: 1_709_510_400 + i * 10_800,
                    temperature: 15.0 + i as f64,
                    humidity: 60,
                    condition: condition(),
                })
                .collect();
            Ok(ForecastPayload { city: city.to_string(), country: "XX".into(), list, timezone: 0 })
        }

        async fn search_city(&self, query: &str) -> Result<CityMatch, DashboardError> {
            let query = validate_query(query)?;
            self.searches.lock().push(query.to_string());
            if query.starts_with("zz") {
                return Err(DashboardError::UpstreamFailure("City not found".into()));
            }
            Ok(CityMatch { name: "Paris".into(), country: "FR".into(), lat: 48.85, lon: 2.35 })
        }
    }

    fn controller(source: FakeSource) -> (DashboardController, Arc<FakeSource>) {
        let source = Arc::new(source);
        let settings =
            ControllerSettings { refresh_interval: PERIOD, search_debounce: Duration::from_millis(500) };
        let controller = DashboardController::new(
            source.clone(),
            settings,
            DashboardState::new("Jakarta", TemperatureUnit::Celsius),
        );
        (controller, source)
    }

    #[tokio::test(start_paused = true)]
    async fn load_city_reaches_ready_with_both_payloads() {
        let (controller, source) = controller(FakeSource::default());

        assert_eq!(controller.load_city("Oslo").await, LoadOutcome::Ready);

        let state = controller.state();
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.city, "Oslo");
        assert_eq!(state.weather.unwrap().city, "Oslo");
        assert_eq!(state.daily.len(), 2);
        assert_eq!(source.forecast_calls.load(Ordering::SeqCst), 1);
        assert!(controller.auto_refresh_active());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_forecast_fails_whole_load() {
        let source = FakeSource {
            forecast_errors: HashMap::from([("Oslo".into(), "forecast down".into())]),
            ..FakeSource::default()
        };
        let (controller, _) = controller(source);

        assert_eq!(controller.load_city("Oslo").await, LoadOutcome::Failed("forecast down".into()));
        assert_eq!(controller.state().phase, Phase::Error("forecast down".into()));
        assert!(controller.view().current.is_none());
        assert!(!controller.auto_refresh_active());
    }

    #[tokio::test(start_paused = true)]
    async fn current_error_wins_when_both_fail() {
        let source = FakeSource {
            current_errors: HashMap::from([("Oslo".into(), "current down".into())]),
            forecast_errors: HashMap::from([("Oslo".into(), "forecast down".into())]),
            ..FakeSource::default()
        };
        let (controller, _) = controller(source);

        assert_eq!(controller.load_city("Oslo").await, LoadOutcome::Failed("current down".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_city_fails_without_fetching() {
        let (controller, source) = controller(FakeSource::default());

        let outcome = controller.load_city("   ").await;

        assert_eq!(outcome, LoadOutcome::Failed("Please enter a city name".into()));
        assert_eq!(source.current_calls(), 0);
        assert_eq!(controller.state().city, "Jakarta");
    }

    #[tokio::test(start_paused = true)]
    async fn error_then_success_recovers() {
        let source = FakeSource {
            current_errors: HashMap::from([("Atlantis".into(), "city not found".into())]),
            ..FakeSource::default()
        };
        let (controller, _) = controller(source);

        controller.load_city("Atlantis").await;
        assert_eq!(controller.view().status, Status::Error { message: "city not found".into() });

        controller.load_city("Lima").await;
        assert_eq!(controller.view().status, Status::Ready);
        assert_eq!(controller.view().current.unwrap().heading, "Lima, XX");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_load_is_discarded() {
        let source = FakeSource {
            delays: HashMap::from([("Slow".into(), Duration::from_secs(2))]),
            ..FakeSource::default()
        };
        let (controller, _) = controller(source);

        let slow = tokio::spawn({
            let controller = controller.clone();
            async move { controller.load_city("Slow").await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(controller.load_city("Fast").await, LoadOutcome::Ready);
        assert_eq!(slow.await.unwrap(), LoadOutcome::Superseded);

        let state = controller.state();
        assert_eq!(state.city, "Fast");
        assert_eq!(state.weather.unwrap().city, "Fast");
    }

    #[tokio::test(start_paused = true)]
    async fn switch_unit_rerenders_without_fetching() {
        let (controller, source) = controller(FakeSource::default());
        controller.load_city("Oslo").await;
        let mut views = controller.subscribe();

        assert!(controller.switch_unit(TemperatureUnit::Fahrenheit));
        assert!(!controller.switch_unit(TemperatureUnit::Fahrenheit));

        assert!(views.has_changed().unwrap());
        let view = views.borrow_and_update().clone();
        assert_eq!(view.current.unwrap().temperature, "68°F");
        assert_eq!(source.current_calls(), 1);
        assert_eq!(controller.state().weather.unwrap().temperature, 20.0);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_leaves_one_timer() {
        let (controller, source) = controller(FakeSource::default());

        controller.start_auto_refresh();
        controller.start_auto_refresh();

        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        assert_eq!(source.current_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_refresh_reloads_current_city() {
        let (controller, source) = controller(FakeSource::default());
        controller.load_city("Oslo").await;

        tokio::time::sleep(PERIOD / 2).await;
        assert_eq!(source.current_calls(), 1);

        tokio::time::sleep(PERIOD / 2 + Duration::from_secs(1)).await;
        assert_eq!(source.current_calls(), 2);
        assert_eq!(controller.state().city, "Oslo");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_refresh() {
        let (controller, source) = controller(FakeSource::default());
        controller.start_auto_refresh();

        controller.shutdown();
        tokio::time::sleep(PERIOD * 3).await;

        assert_eq!(source.current_calls(), 0);
        assert!(!controller.auto_refresh_active());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_ends_timer() {
        let (controller, source) = controller(FakeSource::default());
        controller.start_auto_refresh();

        drop(controller);
        tokio::time::sleep(PERIOD * 2).await;

        assert_eq!(source.current_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn search_is_debounced_to_last_query() {
        let (controller, source) = controller(FakeSource::default());

        for text in ["Pa", "Par", "Pari"] {
            controller.on_search_input(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(source.searches.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(*source.searches.lock(), vec!["Pari".to_string()]);
        assert!(matches!(controller.state().suggestion, Some(Suggestion::Match(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_clears_suggestion_without_searching() {
        let (controller, source) = controller(FakeSource::default());

        controller.on_search_input("Paris");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(controller.state().suggestion.is_some());

        controller.on_search_input(" a ");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(controller.state().suggestion.is_none());
        assert_eq!(source.searches.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_cancels_pending_search() {
        let (controller, source) = controller(FakeSource::default());

        controller.on_search_input("Paris");
        controller.on_search_input("P");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(source.searches.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_shows_no_results() {
        let (controller, _) = controller(FakeSource::default());

        controller.on_search_input("zzzz");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(controller.state().suggestion, Some(Suggestion::NoResults));
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_suggestion_clears_it_and_loads() {
        let (controller, _) = controller(FakeSource::default());
        controller.on_search_input("Paris");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(controller.select_suggestion("Paris").await, LoadOutcome::Ready);

        let state = controller.state();
        assert!(state.suggestion.is_none());
        assert_eq!(state.city, "Paris");
    }

    #[tokio::test(start_paused = true)]
    async fn started_timer_keeps_retrying_after_failed_load() {
        let source = FakeSource {
            current_errors: HashMap::from([("Oslo".into(), "proxy down".into())]),
            ..FakeSource::default()
        };
        let (controller, source) = controller(source);

        assert_eq!(controller.load_city("Oslo").await, LoadOutcome::Failed("proxy down".into()));
        assert!(!controller.auto_refresh_active());

        controller.start_auto_refresh();
        tokio::time::sleep(PERIOD * 3 + Duration::from_secs(1)).await;

        assert_eq!(source.current_calls(), 4);
        assert!(controller.auto_refresh_active());
        assert_eq!(controller.state().phase, Phase::Error("proxy down".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_loads_leave_city_and_data_in_step() {
        let (controller, _) = controller(FakeSource::default());

        let loads: Vec<_> = (0..32)
            .map(|i| {
                let controller = controller.clone();
                tokio::spawn(async move { controller.load_city(&format!("City{i}")).await })
            })
            .collect();
        for load in loads {
            load.await.unwrap();
        }

        let state = controller.state();
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.weather.unwrap().city, state.city);
        controller.shutdown();
    }
}
