use std::sync::Arc;

use chrono::Local;
use log::{error, info, warn};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::{PlaceResolver, PollutionSource};
use crate::error::TrackerError;
use crate::location::LocationProvider;
use crate::models::{LatestReading, Sample};
use crate::store::LogStore;

use super::controller::TrackerEvent;
use super::state::TrackingState;

/// Everything one tick needs. Shared between the inline start tick and the
/// spawned loop.
pub(crate) struct TickContext {
    pub(crate) session_id: String,
    pub(crate) provider: Arc<dyn LocationProvider>,
    pub(crate) pollution: Arc<dyn PollutionSource>,
    pub(crate) places: Arc<dyn PlaceResolver>,
    pub(crate) store: LogStore,
    pub(crate) state: Arc<Mutex<TrackingState>>,
    pub(crate) latest_tx: Arc<watch::Sender<Option<LatestReading>>>,
    pub(crate) events_tx: broadcast::Sender<TrackerEvent>,
    pub(crate) location_timeout: Duration,
}

pub(crate) async fn collection_loop(
    ctx: Arc<TickContext>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    // The controller already ran the first tick inline, so the schedule
    // starts one full interval later. Ticks are awaited in place: the next
    // fire cannot overlap a tick still in flight.
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_tick(&ctx).await;
            }
            _ = cancel_token.cancelled() => {
                info!("collection loop for session {} shutting down", ctx.session_id);
                break;
            }
        }
    }
}

/// Runs one tick and routes its failure, if any, to the log and the event
/// stream. Tick failures never stop the session; the next interval retries.
pub(crate) async fn run_tick(ctx: &TickContext) {
    match perform_tick(ctx).await {
        Ok(()) => {}
        Err(TrackerError::LocationServiceUnavailable) => {
            warn!(
                "session {}: location service unavailable, tick skipped",
                ctx.session_id
            );
            emit(ctx, TrackerEvent::LocationServiceUnavailable);
        }
        Err(err @ (TrackerError::LocationFetch { .. } | TrackerError::LocationTimeout { .. })) => {
            warn!("session {}: {err}", ctx.session_id);
            emit(
                ctx,
                TrackerEvent::LocationFetchFailed {
                    reason: err.to_string(),
                },
            );
        }
        Err(err) => {
            error!("session {}: {err}", ctx.session_id);
            emit(
                ctx,
                TrackerEvent::AppendFailed {
                    reason: err.to_string(),
                },
            );
        }
    }
}

async fn perform_tick(ctx: &TickContext) -> Result<(), TrackerError> {
    if !ctx.provider.is_service_enabled().await {
        return Err(TrackerError::LocationServiceUnavailable);
    }

    let position =
        match tokio::time::timeout(ctx.location_timeout, ctx.provider.current_position()).await {
            Ok(Ok(position)) => position,
            Ok(Err(err)) => {
                return Err(TrackerError::LocationFetch {
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                return Err(TrackerError::LocationTimeout {
                    secs: ctx.location_timeout.as_secs(),
                })
            }
        };

    // Both queries degrade instead of failing: 0.0 and "Unknown" are the
    // documented stand-ins.
    let pm10 = ctx
        .pollution
        .fetch_pm10(position.latitude, position.longitude)
        .await;
    let place_name = ctx
        .places
        .resolve_name(position.latitude, position.longitude)
        .await;

    let sample = Sample {
        timestamp: Local::now(),
        latitude: position.latitude,
        longitude: position.longitude,
        altitude: position.altitude,
        speed: position.speed,
        pm10,
    };

    let append_result = ctx.store.append(&sample);

    // The display updates even when the append failed; the gap stays
    // visible in the day log.
    let _ = ctx.latest_tx.send(Some(LatestReading {
        sample: sample.clone(),
        place_name: place_name.clone(),
    }));

    if append_result.is_ok() {
        let mut state = ctx.state.lock().await;
        state.samples_recorded += 1;
        emit(ctx, TrackerEvent::SampleRecorded { sample, place_name });
    }

    append_result.map_err(TrackerError::Io)
}

fn emit(ctx: &TickContext, event: TrackerEvent) {
    // No subscriber is not a failure.
    let _ = ctx.events_tx.send(event);
}
