//! Tracing setup.

use kurs_common::{KursError, KursResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a JSON subscriber filtered by `RUST_LOG`, or `default_level` when
/// the variable is unset.
///
/// Fails if a global subscriber is already installed.
pub fn init(default_level: &str) -> KursResult<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| KursError::Configuration(format!("failed to install tracing subscriber: {e}")))
}
