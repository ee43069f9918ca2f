//! Pair-rate derivation and amount conversion.

use kurs_common::{format_grouped, parse_decimal, Anchor, Currency};
use tracing::debug;

use crate::conversion::Conversion;
use crate::store::RateStore;

/// Token shown when a converted amount cannot be formatted.
pub const ERROR_TOKEN: &str = "Error";

/// Fraction digits of a converted amount.
pub const AMOUNT_FRACTION_DIGITS: usize = 2;

/// Fraction digits of the "1 X = Y Z" summary line.
pub const SUMMARY_FRACTION_DIGITS: usize = 4;

/// Derives conversion rates from a [`RateStore`].
///
/// Pairs touching RUB are priced from the RUB-anchored table only; all
/// other pairs from the USD-anchored table.
pub struct ConversionEngine;

impl ConversionEngine {
    /// Rate converting one unit of `from` into `to`. Always positive.
    pub fn compute_pair_rate(from: &Currency, to: &Currency, store: &RateStore) -> f64 {
        if from == to {
            return 1.0;
        }

        let rate = if from.is_rub() {
            1.0 / store.rate_or_backup(Anchor::Rub, to.code())
        } else if to.is_rub() {
            store.rate_or_backup(Anchor::Rub, from.code())
        } else {
            let from_rate = store.rate_or_backup(Anchor::Usd, from.code());
            let to_rate = store.rate_or_backup(Anchor::Usd, to.code());
            to_rate / from_rate
        };

        debug!(from = %from, to = %to, rate, "Computed pair rate");
        rate
    }

    /// Convert an amount.
    pub fn convert(amount: f64, rate: f64) -> f64 {
        amount * rate
    }

    /// Convert a calculator display value and format the result.
    ///
    /// Non-numeric or empty input converts to `"0"`; a result that cannot be
    /// formatted shows [`ERROR_TOKEN`].
    pub fn convert_display(display_value: &str, rate: f64) -> String {
        match parse_decimal(display_value) {
            Some(amount) => format_grouped(Self::convert(amount, rate), AMOUNT_FRACTION_DIGITS, 0)
                .unwrap_or_else(|| ERROR_TOKEN.to_string()),
            None => "0".to_string(),
        }
    }

    /// Summary line such as `1 USD = 91.5000 RUB`.
    pub fn summary_line(from: &Currency, to: &Currency, rate: f64) -> String {
        match format_grouped(rate, SUMMARY_FRACTION_DIGITS, SUMMARY_FRACTION_DIGITS) {
            Some(formatted) => format!("1 {} = {} {}", from.code(), formatted, to.code()),
            None => format!("1 {} = {} {}", from.code(), ERROR_TOKEN, to.code()),
        }
    }

    /// Full conversion of a display value for a pair.
    pub fn quote(from: &'static Currency, to: &'static Currency, display_value: &str, store: &RateStore) -> Conversion {
        let rate = Self::compute_pair_rate(from, to, store);
        Conversion::new(
            from,
            to,
            rate,
            parse_decimal(display_value),
            Self::convert_display(display_value, rate),
            Self::summary_line(from, to, rate),
        )
    }

    /// Picker hint `1 USD = X CODE`, or `N/A` when the store lacks the data.
    ///
    /// The ruble is quoted from the RUB-anchored table; everything else from
    /// the USD-anchored table.
    pub fn rate_against_usd(currency: &Currency, store: &RateStore) -> String {
        let rate = if currency.is_rub() {
            store.rub_table().get("USD")
        } else {
            match (store.usd_table().get(currency.code()), store.usd_table().get("USD")) {
                (Some(rate), Some(usd)) => Some(rate / usd),
                _ => None,
            }
        };

        rate.and_then(|r| format_grouped(r, SUMMARY_FRACTION_DIGITS, 0))
            .map(|formatted| format!("1 USD = {} {}", formatted, currency.code()))
            .unwrap_or_else(|| "N/A".to_string())
    }
}
