//! Snapshot data exchanged with the widget.

use chrono::{DateTime, Utc};
use kurs_common::{format_grouped, Currency, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::SnapshotStore;

/// Key holding the serialized rate list.
pub const RATES_KEY: &str = "currencyRates";

/// Key holding the RFC 3339 capture time.
pub const LAST_UPDATED_KEY: &str = "lastUpdated";

/// Currencies shown by the widget, in display order.
pub fn widget_currencies() -> [&'static Currency; 4] {
    [
        Currency::usd(),
        Currency::eur(),
        Currency::try_lira(),
        Currency::aed(),
    ]
}

/// Placeholder ruble price for a widget currency.
pub fn placeholder_rate(code: &str) -> f64 {
    match code {
        "USD" => 85.5,
        "EUR" => 92.7,
        "TRY" => 2.65,
        "AED" => 23.3,
        _ => 1.0,
    }
}

/// Price of one unit of a currency in rubles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRate {
    pub code: String,
    pub name: String,
    pub rate: f64,
    #[serde(rename = "flagEmoji")]
    pub flag_emoji: String,
    pub timestamp: Timestamp,
}

impl SnapshotRate {
    /// Create an entry for a catalog currency.
    pub fn new(currency: &Currency, rate: f64, timestamp: Timestamp) -> Self {
        Self {
            code: currency.code().to_string(),
            name: currency.name().to_string(),
            rate,
            flag_emoji: currency.flag_emoji().to_string(),
            timestamp,
        }
    }

    /// Rate with exactly two fraction digits, e.g. `1,234.50`.
    pub fn formatted_rate(&self) -> String {
        format_grouped(self.rate, 2, 2).unwrap_or_else(|| self.rate.to_string())
    }
}

/// The rate list and capture time as last published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetSnapshot {
    pub rates: Vec<SnapshotRate>,
    pub last_updated: Option<Timestamp>,
}

impl WidgetSnapshot {
    /// Write the rates and capture time to `store`.
    pub fn save(store: &dyn SnapshotStore, rates: &[SnapshotRate], at: Timestamp) -> kurs_common::KursResult<()> {
        let payload = serde_json::to_vec(rates)?;
        store.write(RATES_KEY, &payload)?;
        store.write(LAST_UPDATED_KEY, at.to_rfc3339().as_bytes())?;
        Ok(())
    }

    /// Read the snapshot. Missing or unreadable parts come back empty.
    pub fn load(store: &dyn SnapshotStore) -> Self {
        let rates = match store.read(RATES_KEY) {
            Ok(Some(payload)) => serde_json::from_slice(&payload).unwrap_or_else(|e| {
                warn!(error = %e, "Corrupt rate snapshot, treating as empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read rate snapshot");
                Vec::new()
            }
        };

        let last_updated = match store.read(LAST_UPDATED_KEY) {
            Ok(Some(payload)) => std::str::from_utf8(&payload)
                .ok()
                .and_then(|text| DateTime::parse_from_rfc3339(text.trim()).ok())
                .map(|ts| ts.with_timezone(&Utc)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read snapshot timestamp");
                None
            }
        };

        Self { rates, last_updated }
    }

    /// Check if there are no rates.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySnapshotStore;
    use chrono::TimeZone;

    fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_wire_format() {
        let rate = SnapshotRate::new(Currency::usd(), 91.5, at());
        let json = serde_json::to_value(&rate).unwrap();

        assert_eq!(json["code"], "USD");
        assert_eq!(json["rate"], 91.5);
        assert_eq!(json["flagEmoji"], "🇺🇸");
        assert_eq!(json["timestamp"], "2024-03-01T09:30:00Z");
    }

    #[test]
    fn test_save_and_load() {
        let store = MemorySnapshotStore::new();
        let rates = vec![
            SnapshotRate::new(Currency::usd(), 91.5, at()),
            SnapshotRate::new(Currency::eur(), 99.25, at()),
        ];

        WidgetSnapshot::save(&store, &rates, at()).unwrap();
        let snapshot = WidgetSnapshot::load(&store);

        assert_eq!(snapshot.rates, rates);
        assert_eq!(snapshot.last_updated, Some(at()));
    }

    #[test]
    fn test_corrupt_payload_reads_as_empty() {
        let store = MemorySnapshotStore::new();
        store.write(RATES_KEY, b"{not json").unwrap();
        store.write(LAST_UPDATED_KEY, b"yesterday").unwrap();

        let snapshot = WidgetSnapshot::load(&store);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.last_updated, None);
    }

    #[test]
    fn test_formatted_rate() {
        let rate = SnapshotRate::new(Currency::try_lira(), 2.8, at());
        assert_eq!(rate.formatted_rate(), "2.80");

        let rate = SnapshotRate::new(Currency::usd(), 1234.5, at());
        assert_eq!(rate.formatted_rate(), "1,234.50");
    }
}
