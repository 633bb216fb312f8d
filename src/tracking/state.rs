use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackingStatus {
    Idle,
    Running,
}

impl Default for TrackingStatus {
    fn default() -> Self {
        TrackingStatus::Idle
    }
}

/// Snapshot of the current tracking session.
///
/// Process-local only: every restart begins Idle. `samples_recorded` counts
/// durable appends, not attempted ticks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingState {
    pub status: TrackingStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Local>>,
    pub samples_recorded: u64,
}

impl TrackingState {
    pub fn begin_session(&mut self, session_id: String, started_at: DateTime<Local>) {
        *self = Self {
            status: TrackingStatus::Running,
            session_id: Some(session_id),
            started_at: Some(started_at),
            samples_recorded: 0,
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
