//! Session configuration.

use std::path::PathBuf;
use std::time::Duration;

use kurs_common::{constants, Currency, DurationExt};
use kurs_fx::FetchConfig;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Rate sources and deadlines.
    pub fetch: FetchConfig,
    /// Period of the foreground refresh timer.
    pub refresh_interval: Duration,
    /// Age after which rates count as outdated.
    pub update_threshold: chrono::Duration,
    /// Directory shared with the widget. In-memory snapshots when unset.
    pub shared_dir: Option<PathBuf>,
    /// Initial source currency.
    pub default_from: String,
    /// Initial target currency.
    pub default_to: String,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            refresh_interval: constants::refresh_interval().as_std(),
            update_threshold: constants::update_threshold(),
            shared_dir: None,
            default_from: "USD".to_string(),
            default_to: "RUB".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            fetch: FetchConfig::from_env(),
            ..Self::default()
        };

        if let Ok(minutes) = std::env::var("KURS_REFRESH_INTERVAL_MINUTES") {
            if let Ok(minutes) = minutes.parse::<u64>() {
                config.refresh_interval = Duration::from_secs(minutes * 60);
            }
        }

        if let Ok(dir) = std::env::var("KURS_SHARED_DIR") {
            config.shared_dir = Some(PathBuf::from(dir));
        }

        if let Ok(code) = std::env::var("KURS_DEFAULT_FROM") {
            config.default_from = code;
        }

        if let Ok(code) = std::env::var("KURS_DEFAULT_TO") {
            config.default_to = code;
        }

        if let Ok(level) = std::env::var("KURS_LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.fetch.validate()?;

        if self.refresh_interval.is_zero() {
            return Err("Refresh interval cannot be zero".to_string());
        }

        if self.update_threshold <= chrono::Duration::zero() {
            return Err("Update threshold must be positive".to_string());
        }

        for code in [&self.default_from, &self.default_to] {
            if !Currency::is_known(code) {
                return Err(format!("Unknown default currency: {code}"));
            }
        }

        Ok(())
    }
}
