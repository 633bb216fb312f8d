use thiserror::Error;

/// Failures surfaced by the tracking core.
///
/// Tick-local failures (location, append) never stop a running session;
/// they are logged and broadcast as [`TrackerEvent`](crate::TrackerEvent)
/// notices and the next interval retries.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("location services are disabled")]
    LocationServiceUnavailable,

    #[error("location fetch failed: {reason}")]
    LocationFetch { reason: String },

    #[error("location fetch timed out after {secs}s")]
    LocationTimeout { secs: u64 },

    #[error("log append failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("collection task failed to join: {reason}")]
    TaskJoin { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_unavailable_display() {
        assert_eq!(
            TrackerError::LocationServiceUnavailable.to_string(),
            "location services are disabled"
        );
    }

    #[test]
    fn location_timeout_display() {
        let e = TrackerError::LocationTimeout { secs: 10 };
        assert_eq!(e.to_string(), "location fetch timed out after 10s");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let e: TrackerError = io.into();
        assert_eq!(e.to_string(), "log append failed: read-only fs");
    }
}
