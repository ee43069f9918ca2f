//! Kurs Session
//!
//! The interactive side of the Kurs converter: a [`ConverterSession`] owns
//! the rate store, the calculator and the selected currency pair, keeps
//! the converted amount current after every input, refreshes rates on a
//! timer while in the foreground, and publishes snapshots for the widget.
//!
//! # Example
//!
//! ```rust,ignore
//! use kurs_session::{telemetry, ConverterSession, SessionConfig};
//!
//! let config = SessionConfig::from_env();
//! telemetry::init(&config.log_level)?;
//!
//! let mut session = ConverterSession::new(config)?;
//! session.on_foreground();
//! session.append_digit('5');
//!
//! loop {
//!     let event = session.next_event().await;
//!     if let Some(report) = session.handle_event(event) {
//!         println!("{:?}: {}", report.usd, session.converted_value());
//!     }
//! }
//! ```

pub mod config;
pub mod context;
pub mod scheduler;
pub mod session;
pub mod telemetry;

pub use config::SessionConfig;
pub use context::ConversionContext;
pub use scheduler::{RefreshScheduler, RefreshTick};
pub use session::{ConverterSession, SessionEvent};
