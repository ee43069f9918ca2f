//! Widget configuration.

use std::path::PathBuf;

use chrono::Duration;
use kurs_common::constants;
use kurs_fx::FetchConfig;

/// Configuration for the widget reader.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Maximum snapshot age that skips the widget's own fetch.
    pub freshness_window: Duration,
    /// Next refresh when the entry came from a fresh snapshot.
    pub fresh_refresh_after: Duration,
    /// Next refresh for any other entry.
    pub fallback_refresh_after: Duration,
    /// Sources and deadlines for the widget's own fetch.
    pub fetch: FetchConfig,
    /// Shared directory for the file snapshot store.
    pub shared_dir: Option<PathBuf>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            freshness_window: constants::snapshot_freshness_window(),
            fresh_refresh_after: Duration::hours(1),
            fallback_refresh_after: Duration::hours(3),
            fetch: FetchConfig::for_widget(),
            shared_dir: None,
        }
    }
}

impl WidgetConfig {
    /// Load configuration from environment variables.
    ///
    /// Source URLs follow the converter's `KURS_CBR_URL` and
    /// `KURS_OPEN_ER_URL`; the widget keeps its shorter deadlines.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let env_fetch = FetchConfig::from_env();
        config.fetch.cbr_url = env_fetch.cbr_url;
        config.fetch.open_er_url = env_fetch.open_er_url;

        if let Ok(minutes) = std::env::var("KURS_WIDGET_FRESHNESS_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                config.freshness_window = Duration::minutes(minutes);
            }
        }

        if let Ok(dir) = std::env::var("KURS_SHARED_DIR") {
            config.shared_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.freshness_window <= Duration::zero() {
            return Err("Freshness window must be positive".to_string());
        }

        if self.fresh_refresh_after <= Duration::zero() || self.fallback_refresh_after <= Duration::zero() {
            return Err("Refresh intervals must be positive".to_string());
        }

        self.fetch.validate()
    }
}
