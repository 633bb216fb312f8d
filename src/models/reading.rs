use serde::{Deserialize, Serialize};

use super::Sample;

/// The most recent reading, published for display after each tick.
///
/// The place name lives only here; it is never written to the day log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestReading {
    pub sample: Sample,
    pub place_name: String,
}
