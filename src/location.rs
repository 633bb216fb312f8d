//! Seam to the platform location service.
//!
//! The collection loop only ever sees [`LocationProvider`]; concrete
//! implementations (platform bindings, simulators) live in the embedding
//! layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A device position as reported by the location service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude: f64,
    /// Meters per second.
    pub speed: f64,
}

/// Location permission grant for this application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Denied and the platform will not ask the user again.
    DeniedForever,
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location services are disabled")]
    ServiceDisabled,

    #[error("no position available")]
    PositionUnavailable,

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// Platform location service.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether the location service itself is switched on.
    async fn is_service_enabled(&self) -> bool;

    /// Current permission grant.
    async fn permission_status(&self) -> PermissionStatus;

    /// Best-effort current position. The collection loop bounds the wait;
    /// implementations need not enforce their own deadline.
    async fn current_position(&self) -> Result<Position, LocationError>;
}
