//! Result of converting the calculator display between two currencies.

use kurs_common::{now, Currency, Timestamp};
use serde::Serialize;

/// A computed conversion, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    /// Source currency.
    pub from: &'static Currency,
    /// Target currency.
    pub to: &'static Currency,
    /// Rate used for conversion.
    pub rate: f64,
    /// Parsed input amount, if the display held a number.
    pub amount: Option<f64>,
    /// Formatted converted amount (`"0"` for non-numeric input).
    pub converted: String,
    /// Summary line such as `1 USD = 91.5000 RUB`.
    pub summary: String,
    /// When the conversion was computed.
    pub computed_at: Timestamp,
}

impl Conversion {
    /// Create a new conversion record.
    pub fn new(
        from: &'static Currency,
        to: &'static Currency,
        rate: f64,
        amount: Option<f64>,
        converted: String,
        summary: String,
    ) -> Self {
        Self {
            from,
            to,
            rate,
            amount,
            converted,
            summary,
            computed_at: now(),
        }
    }
}
