use std::sync::Arc;

use chrono::Local;
use log::{info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{GeocodingClient, PlaceResolver, PollutionClient, PollutionSource};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::location::{LocationProvider, PermissionStatus};
use crate::models::{LatestReading, Sample};
use crate::store::LogStore;

use super::loop_worker::{collection_loop, run_tick, TickContext};
use super::state::{TrackingState, TrackingStatus};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Notices broadcast to the presentation layer, which renders them as
/// transient messages. Fire-and-forget: no subscriber is not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackerEvent {
    SampleRecorded { sample: Sample, place_name: String },
    PermissionDenied { forever: bool },
    LocationServiceUnavailable,
    LocationFetchFailed { reason: String },
    AppendFailed { reason: String },
}

/// Owns the single repeating collection task.
///
/// At most one loop is active at a time: `start` while running is a no-op,
/// `stop` cancels the schedule and waits for an in-flight tick to finish.
pub struct TrackingController {
    provider: Arc<dyn LocationProvider>,
    pollution: Arc<dyn PollutionSource>,
    places: Arc<dyn PlaceResolver>,
    store: LogStore,
    state: Arc<Mutex<TrackingState>>,
    latest_tx: Arc<watch::Sender<Option<LatestReading>>>,
    events_tx: broadcast::Sender<TrackerEvent>,
    interval: Duration,
    location_timeout: Duration,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl TrackingController {
    /// Builds a controller over the default HTTP clients.
    pub fn new(config: &TrackerConfig, provider: Arc<dyn LocationProvider>) -> Self {
        let pollution = Arc::new(PollutionClient::new(&config.pollution_url, &config.api_key));
        let places = Arc::new(GeocodingClient::new(&config.geocoding_url, &config.api_key));
        Self::with_sources(config, provider, pollution, places)
    }

    /// Builds a controller with explicit pollution and geocoding sources.
    pub fn with_sources(
        config: &TrackerConfig,
        provider: Arc<dyn LocationProvider>,
        pollution: Arc<dyn PollutionSource>,
        places: Arc<dyn PlaceResolver>,
    ) -> Self {
        let (latest_tx, _) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            provider,
            pollution,
            places,
            store: LogStore::new(&config.data_dir),
            state: Arc::new(Mutex::new(TrackingState::default())),
            latest_tx: Arc::new(latest_tx),
            events_tx,
            interval: Duration::from_secs(config.interval_secs),
            location_timeout: Duration::from_secs(config.location_timeout_secs),
            handle: None,
            cancel_token: None,
        }
    }

    /// Enables tracking.
    ///
    /// No-op if already running. Fails with
    /// [`TrackerError::LocationServiceUnavailable`] when the location
    /// service is off, leaving the session Idle. Otherwise performs one tick
    /// inline (its failure becomes an event, not an error) and schedules the
    /// repeating loop, whose first fire is one full interval later.
    pub async fn start(&mut self) -> Result<(), TrackerError> {
        if self.handle.is_some() {
            warn!("tracking already active, ignoring start");
            return Ok(());
        }

        if !self.provider.is_service_enabled().await {
            return Err(TrackerError::LocationServiceUnavailable);
        }

        let session_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            state.begin_session(session_id.clone(), Local::now());
        }
        info!("tracking session {session_id} started");

        let ctx = Arc::new(TickContext {
            session_id,
            provider: self.provider.clone(),
            pollution: self.pollution.clone(),
            places: self.places.clone(),
            store: self.store.clone(),
            state: self.state.clone(),
            latest_tx: self.latest_tx.clone(),
            events_tx: self.events_tx.clone(),
            location_timeout: self.location_timeout,
        });

        // First tick runs inline so a start followed immediately by stop
        // still records exactly one sample.
        run_tick(&ctx).await;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(collection_loop(ctx, self.interval, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Disables tracking: cancels future ticks and waits for an in-flight
    /// tick to finish. Idempotent.
    pub async fn stop(&mut self) -> Result<(), TrackerError> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.map_err(|err| TrackerError::TaskJoin {
                reason: err.to_string(),
            })?;
        }

        let mut state = self.state.lock().await;
        if state.status == TrackingStatus::Running {
            info!(
                "tracking session {} stopped after {} samples",
                state.session_id.as_deref().unwrap_or("?"),
                state.samples_recorded
            );
        }
        state.reset();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn state(&self) -> TrackingState {
        self.state.lock().await.clone()
    }

    /// The most recent reading, if any tick has completed yet.
    pub fn latest(&self) -> Option<LatestReading> {
        self.latest_tx.borrow().clone()
    }

    /// Observable slot holding the most recent reading.
    pub fn subscribe_latest(&self) -> watch::Receiver<Option<LatestReading>> {
        self.latest_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events_tx.subscribe()
    }

    /// One-shot permission probe for application startup. A denied grant
    /// becomes a user-visible notice; it does not block anything else.
    pub async fn report_permissions(&self) -> PermissionStatus {
        let status = self.provider.permission_status().await;
        match status {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                warn!("location permission denied");
                let _ = self
                    .events_tx
                    .send(TrackerEvent::PermissionDenied { forever: false });
            }
            PermissionStatus::DeniedForever => {
                warn!("location permission permanently denied");
                let _ = self
                    .events_tx
                    .send(TrackerEvent::PermissionDenied { forever: true });
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{LocationError, Position};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct FakeProvider {
        service_enabled: AtomicBool,
        fail_position: AtomicBool,
        position_calls: AtomicUsize,
        permission: PermissionStatus,
    }

    impl FakeProvider {
        fn enabled() -> Self {
            Self {
                service_enabled: AtomicBool::new(true),
                fail_position: AtomicBool::new(false),
                position_calls: AtomicUsize::new(0),
                permission: PermissionStatus::Granted,
            }
        }

        fn disabled() -> Self {
            let provider = Self::enabled();
            provider.service_enabled.store(false, Ordering::SeqCst);
            provider
        }
    }

    #[async_trait]
    impl LocationProvider for FakeProvider {
        async fn is_service_enabled(&self) -> bool {
            self.service_enabled.load(Ordering::SeqCst)
        }

        async fn permission_status(&self) -> PermissionStatus {
            self.permission
        }

        async fn current_position(&self) -> Result<Position, LocationError> {
            self.position_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_position.load(Ordering::SeqCst) {
                return Err(LocationError::PositionUnavailable);
            }
            Ok(Position {
                latitude: 52.52,
                longitude: 13.405,
                altitude: 34.0,
                speed: 1.5,
            })
        }
    }

    struct FixedPollution(f64);

    #[async_trait]
    impl PollutionSource for FixedPollution {
        async fn fetch_pm10(&self, _latitude: f64, _longitude: f64) -> f64 {
            self.0
        }
    }

    struct FixedPlaces(&'static str);

    #[async_trait]
    impl PlaceResolver for FixedPlaces {
        async fn resolve_name(&self, _latitude: f64, _longitude: f64) -> String {
            self.0.to_string()
        }
    }

    fn controller(
        data_dir: &Path,
        provider: Arc<FakeProvider>,
        pm10: f64,
        place: &'static str,
    ) -> TrackingController {
        let config = TrackerConfig::new("test-key", data_dir);
        TrackingController::with_sources(
            &config,
            provider,
            Arc::new(FixedPollution(pm10)),
            Arc::new(FixedPlaces(place)),
        )
    }

    fn recorded_samples(data_dir: &Path) -> Vec<crate::models::Sample> {
        let store = LogStore::new(data_dir);
        let mut samples = Vec::new();
        for day in store.list_days().unwrap() {
            samples.extend(store.read_day(&day).unwrap());
        }
        samples
    }

    #[tokio::test]
    async fn start_then_stop_performs_exactly_one_tick() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let mut tracker = controller(dir.path(), provider.clone(), 18.2, "Berlin");

        tracker.start().await.unwrap();
        tracker.stop().await.unwrap();

        assert_eq!(provider.position_calls.load(Ordering::SeqCst), 1);
        let samples = recorded_samples(dir.path());
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].pm10, 18.2);
        assert_eq!(samples[0].latitude, 52.52);
    }

    #[tokio::test]
    async fn double_start_does_not_add_a_second_schedule() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let mut tracker = controller(dir.path(), provider.clone(), 18.2, "Berlin");

        tracker.start().await.unwrap();
        tracker.start().await.unwrap();

        assert!(tracker.is_running());
        assert_eq!(provider.position_calls.load(Ordering::SeqCst), 1);
        tracker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_with_service_disabled_stays_idle() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::disabled());
        let mut tracker = controller(dir.path(), provider.clone(), 18.2, "Berlin");

        let err = tracker.start().await.unwrap_err();
        assert!(matches!(err, TrackerError::LocationServiceUnavailable));
        assert!(!tracker.is_running());
        assert_eq!(tracker.state().await.status, TrackingStatus::Idle);
        assert!(recorded_samples(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let mut tracker = controller(dir.path(), provider, 18.2, "Berlin");
        tracker.stop().await.unwrap();
        assert!(!tracker.is_running());
    }

    #[tokio::test]
    async fn latest_reading_is_published_after_the_inline_tick() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let mut tracker = controller(dir.path(), provider, 21.7, "Berlin");

        assert!(tracker.latest().is_none());
        tracker.start().await.unwrap();

        let latest = tracker.latest().unwrap();
        assert_eq!(latest.sample.pm10, 21.7);
        assert_eq!(latest.place_name, "Berlin");
        tracker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn degraded_values_are_still_recorded() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let mut tracker = controller(dir.path(), provider, 0.0, "Unknown");

        tracker.start().await.unwrap();
        tracker.stop().await.unwrap();

        let samples = recorded_samples(dir.path());
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].pm10, 0.0);
        // The place name rides the latest reading only, never the log line.
        let line = samples[0].to_log_line();
        assert!(!line.contains("Unknown"));
    }

    #[tokio::test]
    async fn failed_position_fetch_keeps_the_session_running() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        provider.fail_position.store(true, Ordering::SeqCst);
        let mut tracker = controller(dir.path(), provider.clone(), 18.2, "Berlin");
        let mut events = tracker.subscribe_events();

        tracker.start().await.unwrap();

        assert!(tracker.is_running());
        assert!(recorded_samples(dir.path()).is_empty());
        assert!(matches!(
            events.try_recv().unwrap(),
            TrackerEvent::LocationFetchFailed { .. }
        ));
        tracker.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_ticks_fire_once_per_interval() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let mut tracker = controller(dir.path(), provider.clone(), 18.2, "Berlin");

        tracker.start().await.unwrap();
        assert_eq!(provider.position_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(provider.position_calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(provider.position_calls.load(Ordering::SeqCst), 3);

        tracker.stop().await.unwrap();
        assert_eq!(recorded_samples(dir.path()).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn service_dropping_mid_session_skips_ticks_without_stopping() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let mut tracker = controller(dir.path(), provider.clone(), 18.2, "Berlin");
        let mut events = tracker.subscribe_events();

        tracker.start().await.unwrap();
        provider.service_enabled.store(false, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert!(tracker.is_running());
        assert_eq!(recorded_samples(dir.path()).len(), 1);

        // Service comes back; the next interval records again.
        provider.service_enabled.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(recorded_samples(dir.path()).len(), 2);

        tracker.stop().await.unwrap();

        let mut saw_unavailable = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TrackerEvent::LocationServiceUnavailable) {
                saw_unavailable = true;
            }
        }
        assert!(saw_unavailable);
    }

    #[tokio::test]
    async fn denied_permission_is_reported_as_an_event() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider {
            permission: PermissionStatus::DeniedForever,
            ..FakeProvider::enabled()
        });
        let tracker = controller(dir.path(), provider, 18.2, "Berlin");
        let mut events = tracker.subscribe_events();

        let status = tracker.report_permissions().await;

        assert_eq!(status, PermissionStatus::DeniedForever);
        assert!(matches!(
            events.try_recv().unwrap(),
            TrackerEvent::PermissionDenied { forever: true }
        ));
    }

    #[tokio::test]
    async fn granted_permission_emits_nothing() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(FakeProvider::enabled());
        let tracker = controller(dir.path(), provider, 18.2, "Berlin");
        let mut events = tracker.subscribe_events();

        assert_eq!(
            tracker.report_permissions().await,
            PermissionStatus::Granted
        );
        assert!(events.try_recv().is_err());
    }
}
