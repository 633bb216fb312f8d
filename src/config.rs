use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const DEFAULT_POLLUTION_URL: &str = "https://api.openweathermap.org/data/2.5/air_pollution";
const DEFAULT_GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0/reverse";

/// Interval between samples while tracking is enabled.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 300;

/// Bounded wait for a position fix before a tick is abandoned.
pub const DEFAULT_LOCATION_TIMEOUT_SECS: u64 = 10;

/// Configuration for the tracking core.
///
/// Built by the embedding layer and handed to [`crate::TrackingController`];
/// never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// API key sent as `appid` on both endpoints.
    pub api_key: String,
    /// Air-pollution endpoint URL.
    pub pollution_url: String,
    /// Reverse-geocoding endpoint URL.
    pub geocoding_url: String,
    /// Directory the `AirPollutionData` folder is created under, typically
    /// the application's private document storage.
    pub data_dir: PathBuf,
    pub interval_secs: u64,
    pub location_timeout_secs: u64,
}

impl TrackerConfig {
    pub fn new(api_key: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            pollution_url: DEFAULT_POLLUTION_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            data_dir: data_dir.into(),
            interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            location_timeout_secs: DEFAULT_LOCATION_TIMEOUT_SECS,
        }
    }
}
