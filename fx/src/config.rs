//! Rate fetch configuration.

use std::time::Duration;

use kurs_common::{constants, DurationExt};

/// Default RUB-anchored source (Central Bank of Russia daily rates).
pub const DEFAULT_CBR_URL: &str = "https://www.cbr-xml-daily.ru/daily_json.js";

/// Default USD-anchored source.
pub const DEFAULT_OPEN_ER_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Configuration for the two rate sources and the refresh deadlines.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// URL of the RUB-anchored source.
    pub cbr_url: String,
    /// URL of the USD-anchored source.
    pub open_er_url: String,
    /// Transport timeout handed to the HTTP client.
    pub request_timeout: Duration,
    /// Hard deadline per attempt, enforced independently of the transport.
    pub attempt_deadline: Duration,
    /// Watchdog for a whole refresh.
    pub refresh_watchdog: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cbr_url: DEFAULT_CBR_URL.to_string(),
            open_er_url: DEFAULT_OPEN_ER_URL.to_string(),
            request_timeout: constants::request_timeout().as_std(),
            attempt_deadline: constants::attempt_deadline().as_std(),
            refresh_watchdog: constants::refresh_watchdog().as_std(),
        }
    }
}

impl FetchConfig {
    /// Shorter deadlines used by the widget's own fetch.
    pub fn for_widget() -> Self {
        Self {
            request_timeout: constants::widget_request_timeout().as_std(),
            attempt_deadline: constants::widget_attempt_deadline().as_std(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("KURS_CBR_URL") {
            config.cbr_url = url;
        }

        if let Ok(url) = std::env::var("KURS_OPEN_ER_URL") {
            config.open_er_url = url;
        }

        if let Ok(secs) = std::env::var("KURS_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cbr_url.is_empty() || self.open_er_url.is_empty() {
            return Err("Source URLs cannot be empty".to_string());
        }

        if self.request_timeout.is_zero() || self.attempt_deadline.is_zero() {
            return Err("Timeouts cannot be zero".to_string());
        }

        if self.refresh_watchdog < self.attempt_deadline {
            return Err("Refresh watchdog cannot be shorter than the attempt deadline".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.attempt_deadline, Duration::from_secs(8));
        assert_eq!(config.refresh_watchdog, Duration::from_secs(15));
    }

    #[test]
    fn test_widget_config_is_shorter() {
        let config = FetchConfig::for_widget();
        assert!(config.validate().is_ok());
        assert_eq!(config.attempt_deadline, Duration::from_secs(6));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = FetchConfig::default();
        config.refresh_watchdog = Duration::from_secs(1);
        assert!(config.validate().is_err());

        let mut config = FetchConfig::default();
        config.cbr_url.clear();
        assert!(config.validate().is_err());
    }
}
