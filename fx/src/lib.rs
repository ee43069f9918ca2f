//! Kurs FX Engine
//!
//! Rate acquisition and conversion for the Kurs currency calculator.
//!
//! # Features
//!
//! - Two independently sourced rate tables (RUB-anchored and USD-anchored)
//!   seeded with static backup rates
//! - Per-attempt hard deadlines with a completion guard and a refresh watchdog
//! - Pair-rate derivation and display formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use kurs_common::Currency;
//! use kurs_fx::{shared_store, ConversionEngine, FetchConfig, RateFetcher};
//!
//! let store = shared_store();
//! let fetcher = RateFetcher::new(store.clone(), FetchConfig::default())?;
//! fetcher.refresh_all().await;
//!
//! let rate = ConversionEngine::compute_pair_rate(Currency::usd(), Currency::rub(), &store.read());
//! ```

pub mod attempt;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod source;
pub mod store;

pub use attempt::{run_attempt, AttemptOutcome, AttemptState, FetchAttempt};
pub use config::FetchConfig;
pub use conversion::Conversion;
pub use engine::{ConversionEngine, ERROR_TOKEN};
pub use error::{FxError, FxErrorKind, FxResult};
pub use fetcher::{RateFetcher, RefreshReport};
pub use source::{CbrSource, OpenErSource, RateSource};
pub use store::{shared_store, RateStore, SharedRateStore};

#[cfg(any(test, feature = "test-utils"))]
pub use source::{MockBehavior, MockRateSource};
