//! Time utilities and timing constants for Kurs.

use chrono::{DateTime, Duration, Local, Utc};

/// Engine timing constants.
pub mod constants {
    use super::Duration;

    /// Per-request transport timeout for the main application (7 seconds).
    pub fn request_timeout() -> Duration {
        Duration::seconds(7)
    }

    /// Hard deadline for a single fetch attempt (8 seconds).
    pub fn attempt_deadline() -> Duration {
        Duration::seconds(8)
    }

    /// Watchdog for a full refresh (15 seconds).
    pub fn refresh_watchdog() -> Duration {
        Duration::seconds(15)
    }

    /// Periodic refresh interval (4.8 hours, about five times a day).
    pub fn refresh_interval() -> Duration {
        Duration::minutes(288)
    }

    /// Age after which the session considers its rates outdated (4 hours).
    pub fn update_threshold() -> Duration {
        Duration::hours(4)
    }

    /// Widget transport timeout (5 seconds).
    pub fn widget_request_timeout() -> Duration {
        Duration::seconds(5)
    }

    /// Widget hard deadline per source (6 seconds).
    pub fn widget_attempt_deadline() -> Duration {
        Duration::seconds(6)
    }

    /// Snapshot freshness window for the widget (60 minutes).
    pub fn snapshot_freshness_window() -> Duration {
        Duration::minutes(60)
    }
}

/// A timestamp (always UTC internally).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Check whether `timestamp` is younger than `window` as of `at`.
pub fn is_fresh_at(timestamp: Timestamp, window: Duration, at: Timestamp) -> bool {
    at.signed_duration_since(timestamp) < window
}

/// Format a timestamp for the "last updated" indicator, in local time.
pub fn format_last_updated(timestamp: Timestamp) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%d.%m.%Y, %H:%M")
        .to_string()
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}
