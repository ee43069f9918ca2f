//! Kurs Common Types
//!
//! This crate contains the types shared across the Kurs conversion engine:
//! the currency catalog, anchored rate tables with their static backup
//! values, number formatting, time helpers, and the common error type.

pub mod currency;
pub mod rates;
pub mod error;
pub mod time;
pub mod number;

pub use currency::*;
pub use rates::*;
pub use error::*;
pub use time::*;
pub use number::{format_display_value, format_grouped, parse_decimal};
