//! Currency catalog for the Kurs converter.

use serde::Serialize;
use std::fmt;

use crate::error::{KursError, KursResult};

/// Flag shown for codes outside the catalog.
pub const UNKNOWN_FLAG: &str = "🏳️";

/// A currency known to the converter.
///
/// Instances only exist inside the static catalog, so two currencies are
/// equal exactly when their codes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Currency {
    code: &'static str,
    name: &'static str,
    flag_emoji: &'static str,
}

static CATALOG: [Currency; 13] = [
    Currency::entry("RUB", "Russian Ruble", "🇷🇺"),
    Currency::entry("USD", "US Dollar", "🇺🇸"),
    Currency::entry("EUR", "Euro", "🇪🇺"),
    Currency::entry("TRY", "Turkish Lira", "🇹🇷"),
    Currency::entry("KZT", "Kazakhstani Tenge", "🇰🇿"),
    Currency::entry("CNY", "Chinese Yuan", "🇨🇳"),
    Currency::entry("AED", "UAE Dirham", "🇦🇪"),
    Currency::entry("UZS", "Uzbekistani Som", "🇺🇿"),
    Currency::entry("BYN", "Belarusian Ruble", "🇧🇾"),
    Currency::entry("THB", "Thai Baht", "🇹🇭"),
    Currency::entry("UAH", "Ukrainian Hryvnia", "🇺🇦"),
    Currency::entry("GBP", "British Pound", "🇬🇧"),
    Currency::entry("JPY", "Japanese Yen", "🇯🇵"),
];

impl Currency {
    const fn entry(code: &'static str, name: &'static str, flag_emoji: &'static str) -> Self {
        Self {
            code,
            name,
            flag_emoji,
        }
    }

    /// Look up a currency by code (case-insensitive).
    pub fn find(code: &str) -> KursResult<&'static Currency> {
        let code = code.trim();
        CATALOG
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| KursError::UnknownCurrency(code.to_string()))
    }

    /// Check whether a code is part of the catalog.
    pub fn is_known(code: &str) -> bool {
        Self::find(code).is_ok()
    }

    /// All catalog currencies in picker order.
    pub fn all() -> &'static [Currency] {
        &CATALOG
    }

    /// Get the currency code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the flag glyph.
    pub fn flag_emoji(&self) -> &'static str {
        self.flag_emoji
    }

    /// Whether this is the ruble, the pivot of the RUB-anchored table.
    pub fn is_rub(&self) -> bool {
        self.code == "RUB"
    }

    /// Flag glyph for any code, known or not.
    pub fn flag_for(code: &str) -> &'static str {
        Self::find(code)
            .map(|c| c.flag_emoji)
            .unwrap_or(UNKNOWN_FLAG)
    }

    // Catalog shortcuts. Indices match CATALOG above.

    pub fn rub() -> &'static Currency {
        &CATALOG[0]
    }

    pub fn usd() -> &'static Currency {
        &CATALOG[1]
    }

    pub fn eur() -> &'static Currency {
        &CATALOG[2]
    }

    pub fn try_lira() -> &'static Currency {
        &CATALOG[3]
    }

    pub fn aed() -> &'static Currency {
        &CATALOG[6]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_is_case_insensitive() {
        let usd = Currency::find("usd").unwrap();
        assert_eq!(usd.code(), "USD");
        assert_eq!(usd.flag_emoji(), "🇺🇸");
    }

    #[test]
    fn test_unknown_currency() {
        let result = Currency::find("XYZ");
        assert!(matches!(result, Err(KursError::UnknownCurrency(code)) if code == "XYZ"));
        assert_eq!(Currency::flag_for("XYZ"), UNKNOWN_FLAG);
    }

    #[test]
    fn test_catalog_shortcuts() {
        assert_eq!(Currency::all().len(), 13);
        assert!(Currency::rub().is_rub());
        assert_eq!(Currency::usd().code(), "USD");
        assert_eq!(Currency::eur().code(), "EUR");
        assert_eq!(Currency::try_lira().code(), "TRY");
        assert_eq!(Currency::aed().code(), "AED");
    }

    #[test]
    fn test_catalog_codes_unique() {
        let mut codes: Vec<&str> = Currency::all().iter().map(|c| c.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Currency::all().len());
    }
}
