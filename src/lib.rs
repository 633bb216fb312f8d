//! Core pipeline of a location-based air-quality tracker: a toggleable
//! collection loop samples the device position every five minutes, queries
//! an air-quality API for PM10, reverse-geocodes a place name, appends the
//! reading to a per-day text log, and publishes the latest reading for
//! display.

pub mod api;
pub mod config;
pub mod error;
pub mod location;
pub mod models;
pub mod store;
pub mod tracking;

pub use api::{GeocodingClient, PlaceResolver, PollutionClient, PollutionSource, UNKNOWN_PLACE};
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use location::{LocationError, LocationProvider, PermissionStatus, Position};
pub use models::{LatestReading, Sample};
pub use store::{LogStore, ShareRequest};
pub use tracking::{TrackerEvent, TrackingController, TrackingState, TrackingStatus};

/// Initialize logging (reads RUST_LOG env var). Intended for embedding
/// binaries; libraries and tests leave the logger to their host.
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
