pub mod controller;
mod loop_worker;
pub mod state;

pub use controller::{TrackerEvent, TrackingController};
pub use state::{TrackingState, TrackingStatus};
