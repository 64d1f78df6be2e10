use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::anyhow;

use crate::color::MonthPalette;
use crate::config::AppConfig;
use crate::data::correlate::{CorrelationMode, correlate};
use crate::data::loader::LoadOutcome;
use crate::data::model::{
    DisplaySet, EventRecord, FilterError, FilterState, LocationRecord, PredictionResult, YearRange,
    check_month,
};
use crate::data::store::DatasetStore;
use crate::debounce::Debouncer;
use crate::fit::{FitOptions, ViewSpec, fit_view};
use crate::service::{
    self, DataSource, EventsJob, Job, JobPoll, LocationsJob, PredictionClient, PredictionError,
    PredictionJob, SelectedImage,
};

/// How often to look at in-flight jobs while nothing else is happening.
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handles to the outside world. Absent in tests.
#[derive(Debug, Clone)]
pub struct Services {
    pub http: reqwest::blocking::Client,
    pub predictor: PredictionClient,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let http = service::http_client(config.request_timeout())?;
        Ok(Services {
            predictor: PredictionClient::new(http.clone(), config.predict_url()),
            http,
        })
    }
}

#[derive(Debug, Default)]
struct PendingJobs {
    locations: Option<LocationsJob>,
    events: Option<EventsJob>,
    prediction: Option<PredictionJob>,
}

impl PendingJobs {
    fn any(&self) -> bool {
        self.locations.is_some() || self.events.is_some() || self.prediction.is_some()
    }
}

/// Poll a job slot, clearing it once the job has settled.
fn settle<T: Send + 'static>(slot: &mut Option<Job<T>>) -> Option<JobPoll<T>> {
    let polled = slot.as_ref()?.poll();
    if matches!(polled, JobPoll::Running) {
        return None;
    }
    *slot = None;
    Some(polled)
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
///
/// Filter edits land in `raw_filters` and arm the debouncers; the display
/// set is only ever recomputed from the debounced values, in [`AppState::tick`].
pub struct AppState {
    pub store: DatasetStore,

    /// Years the year slider may select.
    pub year_range: YearRange,

    /// Filter values as currently shown by the widgets.
    pub raw_filters: FilterState,
    year: Debouncer<i32>,
    month: Debouncer<u32>,

    /// Result of the last successful upload; cleared by a new upload or a failure.
    pub prediction: Option<PredictionResult>,
    pub selected_image: Option<SelectedImage>,

    /// Status / error message shown in the UI.
    pub error_message: Option<String>,

    /// Whether a prediction request is in flight.
    pub loading: bool,

    pub display: DisplaySet,
    pub view: ViewSpec,
    /// Bumped whenever `view` is recomputed, so the map knows to re-frame.
    pub view_generation: u64,
    pub fit_options: FitOptions,

    // Layer toggles; rendering only.
    pub show_habitats: bool,
    pub show_events: bool,

    pub palette: MonthPalette,

    services: Option<Services>,
    jobs: PendingJobs,
    dirty: bool,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let (year, month) = config.initial_filter();
        let fit_options = FitOptions::default();
        let mut state = Self {
            store: DatasetStore::default(),
            year_range: config.year_range(),
            raw_filters: FilterState { year, month },
            year: Debouncer::new(year, config.debounce()),
            month: Debouncer::new(month, config.debounce()),
            prediction: None,
            selected_image: None,
            error_message: None,
            loading: false,
            display: DisplaySet::default(),
            view: fit_view(&DisplaySet::default(), &fit_options),
            view_generation: 0,
            fit_options,
            show_habitats: true,
            show_events: true,
            palette: MonthPalette::default(),
            services: None,
            jobs: PendingJobs::default(),
            dirty: false,
        };
        state.recompute();
        state
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    /// Kick off both dataset loads. Each settles independently.
    pub fn start_dataset_loads(&mut self, locations: DataSource, events: DataSource) {
        let Some(services) = &self.services else {
            log::warn!("no HTTP client configured; datasets stay empty");
            return;
        };
        self.jobs.locations = Some(service::spawn_location_load(locations, services.http.clone()));
        self.jobs.events = Some(service::spawn_event_load(events, services.http.clone()));
    }

    // -- Filters --

    /// The filter the display set is computed from.
    pub fn debounced_filters(&self) -> FilterState {
        FilterState {
            year: *self.year.value(),
            month: *self.month.value(),
        }
    }

    /// Whether a filter edit is still waiting out its quiet period.
    pub fn filters_settling(&self) -> bool {
        self.year.is_pending() || self.month.is_pending()
    }

    pub fn set_year(&mut self, year: i32, now: Instant) {
        let year = self.year_range.clamp(year);
        if year != self.raw_filters.year {
            self.raw_filters.year = year;
            self.year.set(year, now);
        }
    }

    pub fn set_month(&mut self, month: u32, now: Instant) -> Result<(), FilterError> {
        let month = check_month(month)?;
        if month != self.raw_filters.month {
            self.raw_filters.month = month;
            self.month.set(month, now);
        }
        Ok(())
    }

    // -- Datasets --

    pub fn apply_locations(&mut self, result: anyhow::Result<LoadOutcome<LocationRecord>>) {
        if self.store.set_locations(result) {
            self.dirty = true;
        }
    }

    pub fn apply_events(&mut self, result: anyhow::Result<LoadOutcome<EventRecord>>) {
        if self.store.set_events(result) {
            self.dirty = true;
        }
    }

    // -- Prediction --

    pub fn select_image(&mut self, path: &Path) {
        match SelectedImage::read(path) {
            Ok(image) => {
                log::info!("Selected {} ({} bytes)", path.display(), image.bytes.len());
                self.selected_image = Some(image);
                self.error_message = None;
            }
            Err(e) => {
                log::error!("Cannot use {}: {e}", path.display());
                self.error_message = Some(format!("{e}"));
            }
        }
    }

    pub fn can_upload(&self) -> bool {
        self.selected_image.is_some() && !self.loading
    }

    /// Enter the loading state of an upload cycle: the previous prediction
    /// and error are cleared. Returns the image to send.
    fn begin_upload(&mut self) -> Option<SelectedImage> {
        if !self.can_upload() {
            return None;
        }
        self.loading = true;
        self.error_message = None;
        if self.prediction.take().is_some() {
            self.dirty = true;
        }
        self.selected_image.clone()
    }

    pub fn start_upload(&mut self) {
        let Some(image) = self.begin_upload() else {
            return;
        };
        let Some(predictor) = self.services.as_ref().map(|s| s.predictor.clone()) else {
            self.finish_upload(Err(PredictionError::Unavailable));
            return;
        };
        self.jobs.prediction = Some(service::spawn_prediction(predictor, image));
    }

    /// Complete an upload cycle with the service's answer.
    pub fn finish_upload(&mut self, result: Result<PredictionResult, PredictionError>) {
        self.loading = false;
        match result {
            Ok(prediction) => {
                log::info!(
                    "Predicted {} ({}), {} matched locations",
                    prediction.label,
                    prediction.confidence,
                    prediction.matched_locations.len()
                );
                self.prediction = Some(prediction);
            }
            Err(e) => {
                log::error!("Prediction failed: {e}");
                self.error_message = Some(format!("Prediction failed: {e}"));
                self.prediction = None;
            }
        }
        self.dirty = true;
    }

    // -- Pipeline --

    pub fn mode(&self) -> CorrelationMode<'_> {
        CorrelationMode::of(self.prediction.as_ref())
    }

    /// Advance the pipeline to `now`: collect finished jobs, let due filter
    /// values through the debouncers, and recompute the display set and view
    /// if any input changed.
    ///
    /// Returns how long the caller may wait before the next tick has work.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        self.drain_jobs();

        if self.year.poll(now).is_some() {
            self.dirty = true;
        }
        if self.month.poll(now).is_some() {
            self.dirty = true;
        }

        if self.dirty {
            self.recompute();
        }

        self.next_wake(now)
    }

    /// Time until a debouncer fires or, while jobs are in flight, until
    /// they should be polled again.
    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        let debounce_wait = [self.year.remaining(now), self.month.remaining(now)]
            .into_iter()
            .flatten()
            .min();
        let job_wait = self.jobs.any().then_some(JOB_POLL_INTERVAL);
        [debounce_wait, job_wait].into_iter().flatten().min()
    }

    fn drain_jobs(&mut self) {
        match settle(&mut self.jobs.locations) {
            Some(JobPoll::Done(result)) => self.apply_locations(result),
            Some(JobPoll::Lost) => self.apply_locations(Err(anyhow!("location loader stopped"))),
            _ => {}
        }
        match settle(&mut self.jobs.events) {
            Some(JobPoll::Done(result)) => self.apply_events(result),
            Some(JobPoll::Lost) => self.apply_events(Err(anyhow!("wildfire loader stopped"))),
            _ => {}
        }
        match settle(&mut self.jobs.prediction) {
            Some(JobPoll::Done(result)) => self.finish_upload(result),
            Some(JobPoll::Lost) => self.finish_upload(Err(PredictionError::WorkerStopped)),
            _ => {}
        }
    }

    fn recompute(&mut self) {
        let filters = self.debounced_filters();
        let display = correlate(
            self.prediction.as_ref(),
            &filters,
            self.store.locations(),
            self.store.events(),
        );
        self.dirty = false;
        // An unchanged display keeps the user's pan and zoom.
        if display == self.display {
            return;
        }
        self.view = fit_view(&display, &self.fit_options);
        self.display = display;
        self.view_generation += 1;

        log::debug!(
            "{} mode, {}/{}: {} locations, {} events",
            self.mode().name(),
            filters.year,
            filters.month,
            self.display.locations.len(),
            self.display.events.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::GeoPoint;

    const DELAY: Duration = Duration::from_millis(250);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn event(year: i32, month: u32, region: &str) -> EventRecord {
        EventRecord {
            year,
            month: Some(month),
            position: GeoPoint { lat: 26.0, lon: -81.0 },
            region: region.into(),
            name: None,
        }
    }

    fn loaded_state() -> AppState {
        let mut state = AppState::new(&AppConfig::default());
        state.apply_locations(Ok(LoadOutcome {
            records: vec![LocationRecord {
                id: "EVER".into(),
                name: "Everglades ".into(),
                region: "FL".into(),
                position: GeoPoint { lat: 25.3, lon: -80.9 },
            }],
            dropped: 0,
        }));
        state.apply_events(Ok(LoadOutcome {
            records: vec![
                event(2015, 3, "FL"),
                event(2015, 4, "CA"),
                event(2010, 3, "FL"),
                event(2010, 4, "FL"),
            ],
            dropped: 0,
        }));
        state
    }

    fn image() -> SelectedImage {
        let png = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        SelectedImage::from_bytes("gator.png".into(), png).unwrap()
    }

    #[test]
    fn initial_state_is_default_view() {
        let state = AppState::new(&AppConfig::default());
        assert!(state.display.is_empty());
        assert!(matches!(state.view, ViewSpec::Center { zoom: 4, .. }));
        assert_eq!(state.debounced_filters(), FilterState { year: 2015, month: 0 });
    }

    #[test]
    fn dataset_arrival_recomputes_on_tick() {
        let mut state = loaded_state();
        state.tick(Instant::now());
        assert_eq!(state.display.events.len(), 2);
        assert!(matches!(state.view, ViewSpec::Fit { .. }));
    }

    #[test]
    fn correlation_only_sees_debounced_filters() {
        let t0 = Instant::now();
        let mut state = loaded_state();
        state.tick(t0);

        state.set_year(2010, t0);
        state.tick(t0 + ms(100));
        assert_eq!(state.raw_filters.year, 2010);
        assert!(state.display.events.iter().all(|e| e.year == 2015));
        assert!(state.filters_settling());

        state.tick(t0 + DELAY);
        assert!(state.display.events.iter().all(|e| e.year == 2010));
        assert_eq!(state.display.events.len(), 2);
    }

    #[test]
    fn slider_drag_recomputes_once() {
        let t0 = Instant::now();
        let mut state = loaded_state();
        state.tick(t0);
        let generation = state.view_generation;

        for (i, year) in (2005..=2012).rev().enumerate() {
            let at = t0 + ms(30 * i as u64);
            state.set_year(year, at);
            state.tick(at + ms(5));
        }
        assert_eq!(state.view_generation, generation);

        let wait = state.tick(t0 + ms(30 * 7 + 10));
        assert!(wait.is_some_and(|w| w <= DELAY));
        state.tick(t0 + ms(30 * 7 + 300));
        assert_eq!(state.view_generation, generation + 1);
        assert_eq!(state.debounced_filters().year, 2005);
    }

    #[test]
    fn habitat_mode_after_prediction() {
        let t0 = Instant::now();
        let mut state = loaded_state();
        state.set_year(2010, t0);
        state.set_month(3, t0).unwrap();
        state.finish_upload(Ok(PredictionResult::new("alligator", 0.9, vec!["Everglades".into()])));
        state.tick(t0 + DELAY);

        assert!(matches!(state.mode(), CorrelationMode::Habitat { .. }));
        assert_eq!(state.display.locations.len(), 1);
        assert_eq!(state.display.events, vec![event(2010, 3, "FL")]);
    }

    #[test]
    fn year_is_clamped_and_month_validated() {
        let t0 = Instant::now();
        let mut state = AppState::new(&AppConfig::default());
        state.set_year(1900, t0);
        assert_eq!(state.raw_filters.year, 1992);
        assert_eq!(state.set_month(13, t0), Err(FilterError::MonthOutOfRange(13)));
        assert_eq!(state.raw_filters.month, 0);
    }

    #[test]
    fn upload_requires_selected_image() {
        let mut state = AppState::new(&AppConfig::default());
        assert!(!state.can_upload());
        state.start_upload();
        assert!(!state.loading);
        assert!(state.error_message.is_none());
    }

    #[test]
    fn new_upload_clears_previous_result() {
        let mut state = loaded_state();
        state.finish_upload(Ok(PredictionResult::new("alligator", 0.9, vec!["Everglades".into()])));
        state.error_message = Some("old".into());
        state.selected_image = Some(image());

        let sent = state.begin_upload();
        assert!(sent.is_some());
        assert!(state.loading);
        assert!(state.prediction.is_none());
        assert!(state.error_message.is_none());
        assert!(!state.can_upload(), "one request at a time");
    }

    #[test]
    fn failed_prediction_clears_result_and_reports() {
        let mut state = loaded_state();
        state.finish_upload(Ok(PredictionResult::new("alligator", 0.9, vec!["Everglades".into()])));
        state.tick(Instant::now());
        assert_eq!(state.display.locations.len(), 1);

        state.loading = true;
        state.finish_upload(Err(PredictionError::Status {
            status: 500,
            body: "boom".into(),
        }));
        state.tick(Instant::now());

        assert!(!state.loading);
        assert!(state.prediction.is_none());
        assert!(state.error_message.as_deref().is_some_and(|m| m.contains("500")));
        assert!(state.display.locations.is_empty(), "no stale habitat data");
    }

    #[test]
    fn upload_without_service_fails_gracefully() {
        let mut state = AppState::new(&AppConfig::default());
        state.selected_image = Some(image());
        state.start_upload();
        assert!(!state.loading);
        assert!(state.error_message.is_some());
    }

    #[test]
    fn finished_jobs_are_drained_on_tick() {
        let mut state = AppState::new(&AppConfig::default());
        state.jobs.events = Some(Job::ready(Ok(LoadOutcome {
            records: vec![event(2015, 6, "OR")],
            dropped: 1,
        })));
        state.jobs.locations = Some(Job::ready(Err(anyhow!("404"))));
        assert!(state.jobs.any());

        state.tick(Instant::now());
        assert!(!state.jobs.any());
        assert_eq!(state.display.events.len(), 1);
        assert!(state.store.locations().is_empty());
        assert_eq!(state.store.failures().len(), 1);
    }

    #[test]
    fn unchanged_display_keeps_the_view() {
        let mut state = AppState::new(&AppConfig::default());
        state.apply_events(Ok(LoadOutcome {
            records: vec![event(2015, 6, "OR")],
            dropped: 0,
        }));
        state.tick(Instant::now());
        let generation = state.view_generation;

        // Locations do not show in exploration mode.
        state.apply_locations(Ok(LoadOutcome {
            records: vec![LocationRecord {
                id: "CRLA".into(),
                name: "Crater Lake".into(),
                region: "OR".into(),
                position: GeoPoint { lat: 42.9, lon: -122.1 },
            }],
            dropped: 0,
        }));
        state.tick(Instant::now());
        assert_eq!(state.display.events.len(), 1);
        assert_eq!(state.view_generation, generation);
    }

    #[test]
    fn pending_job_requests_polling() {
        let mut state = AppState::new(&AppConfig::default());
        state.jobs.prediction = Some(Job::spawn("slow-predict", || {
            std::thread::sleep(Duration::from_millis(200));
            Err(PredictionError::WorkerStopped)
        }));
        assert_eq!(state.tick(Instant::now()), Some(JOB_POLL_INTERVAL));
    }
}
