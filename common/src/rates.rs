//! Anchored exchange-rate tables and static backup values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// The pivot currency a rate table is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    /// Each entry is the price of one unit in rubles (`RUB = 1.0`).
    Rub,
    /// Each entry is the amount of the currency per one US dollar (`USD = 1.0`).
    Usd,
}

impl Anchor {
    /// Code of the pivot currency.
    pub fn pivot(&self) -> &'static str {
        match self {
            Anchor::Rub => "RUB",
            Anchor::Usd => "USD",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Rub => write!(f, "RUB-anchored"),
            Anchor::Usd => write!(f, "USD-anchored"),
        }
    }
}

/// Rates from a single source, keyed by currency code.
///
/// Every stored rate is finite and strictly positive. A RUB-anchored table
/// always contains `RUB -> 1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    anchor: Anchor,
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Create an empty table. RUB-anchored tables start with the pivot entry.
    pub fn new(anchor: Anchor) -> Self {
        let mut rates = HashMap::new();
        if anchor == Anchor::Rub {
            rates.insert("RUB".to_string(), 1.0);
        }
        Self { anchor, rates }
    }

    /// Build a table from `(code, rate)` pairs, dropping invalid rates.
    pub fn from_rates<I, S>(anchor: Anchor, rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut table = Self::new(anchor);
        for (code, rate) in rates {
            table.insert(code, rate);
        }
        table
    }

    /// Insert a rate. Returns false (and keeps the table unchanged) when the
    /// rate is not a finite positive number or would move the RUB pivot.
    pub fn insert(&mut self, code: impl Into<String>, rate: f64) -> bool {
        let code = code.into().to_uppercase();

        if !rate.is_finite() || rate <= 0.0 {
            warn!(anchor = %self.anchor, code = %code, rate, "Rejected non-positive rate");
            return false;
        }

        if self.anchor == Anchor::Rub && code == "RUB" && rate != 1.0 {
            warn!(rate, "Rejected RUB pivot override in RUB-anchored table");
            return false;
        }

        self.rates.insert(code, rate);
        true
    }

    /// Get the rate for a code.
    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Check whether a code is present.
    pub fn contains(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    /// Count how many of `required` are present.
    pub fn coverage(&self, required: &[&str]) -> usize {
        required.iter().filter(|code| self.contains(code)).count()
    }

    /// Get the table anchor.
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Check if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Sorted list of codes, for logging.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

/// Static backup rates used until a source answers.
pub mod backup {
    use super::{Anchor, RateTable};

    /// Backup prices per one US dollar.
    pub const USD_RATES: [(&str, f64); 13] = [
        ("USD", 1.0),
        ("EUR", 0.92),
        ("RUB", 85.49),
        ("GBP", 0.78),
        ("JPY", 149.8),
        ("CNY", 7.18),
        ("TRY", 32.5),
        ("KZT", 450.2),
        ("AED", 3.67),
        ("UZS", 12450.0),
        ("BYN", 3.25),
        ("THB", 35.8),
        ("UAH", 39.5),
    ];

    /// Backup rate for a code in the given anchor.
    pub fn rate(anchor: Anchor, code: &str) -> Option<f64> {
        let usd_rate = usd_rate(code)?;
        match anchor {
            Anchor::Usd => Some(usd_rate),
            Anchor::Rub => usd_rate_of_rub().map(|rub| rub / usd_rate),
        }
    }

    /// Backup USD-anchored table.
    pub fn usd_table() -> RateTable {
        RateTable::from_rates(Anchor::Usd, USD_RATES)
    }

    /// Backup RUB-anchored table derived from the USD backup values, so
    /// that both backup tables quote the same prices.
    pub fn rub_table() -> RateTable {
        RateTable::from_rates(
            Anchor::Rub,
            USD_RATES
                .iter()
                .filter_map(|(code, _)| rate(Anchor::Rub, code).map(|r| (*code, r))),
        )
    }

    fn usd_rate(code: &str) -> Option<f64> {
        USD_RATES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, rate)| *rate)
    }

    fn usd_rate_of_rub() -> Option<f64> {
        usd_rate("RUB")
    }
}
