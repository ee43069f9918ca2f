//! Widget-side reader: snapshot first, then its own fetch, then placeholders.

use std::sync::Arc;

use kurs_common::{is_fresh_at, Anchor, KursError, KursResult, RateTable, Timestamp};
use kurs_fx::source::{http_client, CbrSource, OpenErSource, RateSource};
use kurs_fx::{run_attempt, FxError, FxResult};
use tracing::{debug, info, instrument, warn};

use crate::config::WidgetConfig;
use crate::snapshot::{placeholder_rate, widget_currencies, SnapshotRate, WidgetSnapshot};
use crate::store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

/// Minimum number of widget currencies the USD-anchored fallback must price.
pub const MIN_FALLBACK_ENTRIES: usize = 2;

/// Where the rates of an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    Snapshot,
    RubSource,
    UsdSource,
    Placeholder,
}

/// Rates to display, stamped with the time they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetEntry {
    pub date: Timestamp,
    pub rates: Vec<SnapshotRate>,
    pub origin: EntryOrigin,
}

/// A single entry plus the time the host should ask again.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetTimeline {
    pub entry: WidgetEntry,
    pub next_refresh: Timestamp,
}

/// Produces widget entries from the shared snapshot or the network.
pub struct WidgetReader {
    store: Arc<dyn SnapshotStore>,
    rub_source: Arc<dyn RateSource>,
    usd_source: Arc<dyn RateSource>,
    config: WidgetConfig,
}

impl WidgetReader {
    /// Create a reader from `config`: the shared snapshot directory when one
    /// is configured (in-memory otherwise) and the HTTP sources.
    pub fn new(config: WidgetConfig) -> KursResult<Self> {
        config.validate().map_err(KursError::Configuration)?;

        let store: Arc<dyn SnapshotStore> = match &config.shared_dir {
            Some(dir) => Arc::new(FileSnapshotStore::open(dir)?),
            None => Arc::new(MemorySnapshotStore::new()),
        };

        let client =
            http_client(config.fetch.request_timeout).map_err(|e| KursError::Configuration(e.to_string()))?;
        let rub_source = Arc::new(CbrSource::new(client.clone(), config.fetch.cbr_url.clone()));
        let usd_source = Arc::new(OpenErSource::new(client, config.fetch.open_er_url.clone()));

        Ok(Self::with_sources(store, rub_source, usd_source, config))
    }

    /// Create a reader with explicit sources.
    pub fn with_sources(
        store: Arc<dyn SnapshotStore>,
        rub_source: Arc<dyn RateSource>,
        usd_source: Arc<dyn RateSource>,
        config: WidgetConfig,
    ) -> Self {
        Self {
            store,
            rub_source,
            usd_source,
            config,
        }
    }

    /// Fixed placeholder entry.
    pub fn placeholder(now: Timestamp) -> WidgetEntry {
        WidgetEntry {
            date: now,
            rates: widget_currencies()
                .into_iter()
                .map(|currency| SnapshotRate::new(currency, placeholder_rate(currency.code()), now))
                .collect(),
            origin: EntryOrigin::Placeholder,
        }
    }

    /// Shared rates regardless of age, else the placeholder. Never touches
    /// the network.
    pub fn preview(&self, now: Timestamp) -> WidgetEntry {
        let snapshot = WidgetSnapshot::load(self.store.as_ref());
        if snapshot.is_empty() {
            return Self::placeholder(now);
        }

        WidgetEntry {
            date: now,
            rates: snapshot.rates,
            origin: EntryOrigin::Snapshot,
        }
    }

    /// Build the timeline for `now`.
    #[instrument(skip(self))]
    pub async fn timeline(&self, now: Timestamp) -> WidgetTimeline {
        let snapshot = WidgetSnapshot::load(self.store.as_ref());

        if let Some(last_updated) = snapshot.last_updated {
            if !snapshot.is_empty() && is_fresh_at(last_updated, self.config.freshness_window, now) {
                debug!(%last_updated, "Using fresh shared snapshot");
                return WidgetTimeline {
                    entry: WidgetEntry {
                        date: last_updated,
                        rates: snapshot.rates,
                        origin: EntryOrigin::Snapshot,
                    },
                    next_refresh: now + self.config.fresh_refresh_after,
                };
            }
        }

        WidgetTimeline {
            entry: self.fetch_entry(now).await,
            next_refresh: now + self.config.fallback_refresh_after,
        }
    }

    async fn fetch_entry(&self, now: Timestamp) -> WidgetEntry {
        match self.fetch_table(&self.rub_source).await.map(|t| Self::price_from_rub(&t, now)) {
            Ok(rates) => {
                info!(currencies = rates.len(), "Widget rates from RUB-anchored source");
                return WidgetEntry {
                    date: now,
                    rates,
                    origin: EntryOrigin::RubSource,
                };
            }
            Err(e) => warn!(error = %e, "Widget RUB-anchored fetch failed, trying fallback"),
        }

        let usd_source = self.usd_source.name();
        match self
            .fetch_table(&self.usd_source)
            .await
            .and_then(|t| Self::price_from_usd(usd_source, &t, now))
        {
            Ok(rates) => {
                info!(currencies = rates.len(), "Widget rates from USD-anchored source");
                WidgetEntry {
                    date: now,
                    rates,
                    origin: EntryOrigin::UsdSource,
                }
            }
            Err(e) => {
                warn!(error = %e, "Widget fallback fetch failed, showing placeholder");
                Self::placeholder(now)
            }
        }
    }

    async fn fetch_table(&self, source: &Arc<dyn RateSource>) -> FxResult<RateTable> {
        let source = Arc::clone(source);
        run_attempt(source.name(), self.config.fetch.attempt_deadline, async move {
            source.fetch_table().await
        })
        .await
        .result
    }

    /// Every widget currency, missing ones at their placeholder price.
    fn price_from_rub(table: &RateTable, now: Timestamp) -> Vec<SnapshotRate> {
        widget_currencies()
            .into_iter()
            .map(|currency| {
                let rate = table
                    .get(currency.code())
                    .unwrap_or_else(|| placeholder_rate(currency.code()));
                SnapshotRate::new(currency, rate, now)
            })
            .collect()
    }

    /// Ruble prices derived as `rub / rate[X]`; missing currencies are left out.
    fn price_from_usd(source_name: &'static str, table: &RateTable, now: Timestamp) -> FxResult<Vec<SnapshotRate>> {
        let rub = table
            .get("RUB")
            .ok_or_else(|| FxError::parse(source_name, "response has no RUB rate"))?;

        let rates: Vec<SnapshotRate> = widget_currencies()
            .into_iter()
            .filter_map(|currency| {
                let rate = if currency.code() == "USD" {
                    Some(rub)
                } else {
                    table.get(currency.code()).map(|r| rub / r)
                };
                rate.map(|rate| SnapshotRate::new(currency, rate, now))
            })
            .collect();

        if rates.len() < MIN_FALLBACK_ENTRIES {
            return Err(FxError::InsufficientData {
                source_name,
                anchor: Anchor::Usd,
                found: rates.len(),
                required: MIN_FALLBACK_ENTRIES,
            });
        }

        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{LAST_UPDATED_KEY, RATES_KEY};
    use chrono::{Duration, TimeZone, Utc};
    use kurs_common::Currency;
    use kurs_fx::{MockBehavior, MockRateSource};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn rub_source() -> Arc<MockRateSource> {
        Arc::new(MockRateSource::rub(&[("USD", 91.5), ("EUR", 99.0), ("TRY", 2.8)]))
    }

    fn usd_source() -> Arc<MockRateSource> {
        Arc::new(MockRateSource::usd(&[("USD", 1.0), ("RUB", 90.0), ("EUR", 0.9)]))
    }

    fn reader(store: Arc<MemorySnapshotStore>, rub: Arc<MockRateSource>, usd: Arc<MockRateSource>) -> WidgetReader {
        WidgetReader::with_sources(store, rub, usd, WidgetConfig::default())
    }

    fn publish(store: &dyn SnapshotStore, at: Timestamp) {
        let rates = vec![SnapshotRate::new(Currency::usd(), 93.0, at)];
        WidgetSnapshot::save(store, &rates, at).unwrap();
    }

    fn rate_of(entry: &WidgetEntry, code: &str) -> Option<f64> {
        entry.rates.iter().find(|r| r.code == code).map(|r| r.rate)
    }

    #[tokio::test]
    async fn test_fresh_snapshot_skips_network() {
        let store = Arc::new(MemorySnapshotStore::new());
        let taken = now() - Duration::minutes(59);
        publish(store.as_ref(), taken);
        let rub = rub_source();
        let reader = reader(store, rub.clone(), usd_source());

        let timeline = reader.timeline(now()).await;

        assert_eq!(timeline.entry.origin, EntryOrigin::Snapshot);
        assert_eq!(timeline.entry.date, taken);
        assert_eq!(timeline.next_refresh, now() + Duration::hours(1));
        assert_eq!(rub.calls(), 0);
    }

    #[tokio::test]
    async fn test_fresh_stamp_without_rates_fetches() {
        let store = Arc::new(MemorySnapshotStore::new());
        WidgetSnapshot::save(store.as_ref(), &[], now() - Duration::minutes(5)).unwrap();
        let rub = rub_source();
        let reader = reader(store, rub.clone(), usd_source());

        let timeline = reader.timeline(now()).await;

        assert_eq!(timeline.entry.origin, EntryOrigin::RubSource);
        assert_eq!(timeline.next_refresh, now() + Duration::hours(3));
        assert_eq!(rub.calls(), 1);
    }

    #[tokio::test]
    async fn test_fresh_stamp_with_corrupt_rates_fetches() {
        let store = Arc::new(MemorySnapshotStore::new());
        store.write(RATES_KEY, b"[{\"code\": 12").unwrap();
        store
            .write(LAST_UPDATED_KEY, (now() - Duration::minutes(5)).to_rfc3339().as_bytes())
            .unwrap();
        let rub = rub_source();
        let reader = reader(store, rub.clone(), usd_source());

        let timeline = reader.timeline(now()).await;

        assert_eq!(timeline.entry.origin, EntryOrigin::RubSource);
        assert_eq!(timeline.entry.date, now());
        assert_eq!(timeline.next_refresh, now() + Duration::hours(3));
        assert_eq!(rub.calls(), 1);
    }

    #[tokio::test]
    async fn test_new_reads_shared_dir() {
        let dir = tempfile::tempdir().unwrap();
        let published = now() - Duration::minutes(10);
        let app_side = FileSnapshotStore::open(dir.path()).unwrap();
        publish(&app_side, published);

        let config = WidgetConfig {
            shared_dir: Some(dir.path().to_path_buf()),
            ..WidgetConfig::default()
        };
        let reader = WidgetReader::new(config).unwrap();

        let entry = reader.preview(now());
        assert_eq!(entry.origin, EntryOrigin::Snapshot);
        assert_eq!(rate_of(&entry, "USD"), Some(93.0));
    }

    #[test]
    fn test_new_without_shared_dir_starts_empty() {
        let reader = WidgetReader::new(WidgetConfig::default()).unwrap();
        assert_eq!(reader.preview(now()).origin, EntryOrigin::Placeholder);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = WidgetConfig {
            freshness_window: Duration::zero(),
            ..WidgetConfig::default()
        };

        let err = WidgetReader::new(config).err().unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_stale_snapshot_fetches_rub_source() {
        let store = Arc::new(MemorySnapshotStore::new());
        publish(store.as_ref(), now() - Duration::minutes(61));
        let reader = reader(store, rub_source(), usd_source());

        let timeline = reader.timeline(now()).await;

        assert_eq!(timeline.entry.origin, EntryOrigin::RubSource);
        assert_eq!(timeline.entry.date, now());
        assert_eq!(timeline.next_refresh, now() + Duration::hours(3));
        assert_eq!(rate_of(&timeline.entry, "USD"), Some(91.5));
        // AED not in the response: placeholder price.
        assert_eq!(rate_of(&timeline.entry, "AED"), Some(23.3));
        assert_eq!(timeline.entry.rates.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rub_timeout_falls_back_to_usd_source() {
        let rub = rub_source();
        rub.set_behavior(MockBehavior::Hang);
        let reader = reader(Arc::new(MemorySnapshotStore::new()), rub, usd_source());
        let started = tokio::time::Instant::now();

        let timeline = reader.timeline(now()).await;

        assert!(started.elapsed() >= std::time::Duration::from_secs(6));
        assert_eq!(timeline.entry.origin, EntryOrigin::UsdSource);
        assert_eq!(rate_of(&timeline.entry, "USD"), Some(90.0));
        assert!((rate_of(&timeline.entry, "EUR").unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(rate_of(&timeline.entry, "TRY"), None);
    }

    #[tokio::test]
    async fn test_usd_source_without_rub_uses_placeholder() {
        let rub = rub_source();
        rub.set_behavior(MockBehavior::NetworkDown);
        let usd = Arc::new(MockRateSource::usd(&[("USD", 1.0), ("EUR", 0.9)]));
        let reader = reader(Arc::new(MemorySnapshotStore::new()), rub, usd);

        let timeline = reader.timeline(now()).await;

        assert_eq!(timeline.entry, WidgetReader::placeholder(now()));
        assert_eq!(timeline.next_refresh, now() + Duration::hours(3));
    }

    #[tokio::test]
    async fn test_usd_source_needs_two_entries() {
        let rub = rub_source();
        rub.set_behavior(MockBehavior::Garbage);
        let usd = Arc::new(MockRateSource::usd(&[("RUB", 90.0), ("GBP", 0.8)]));
        let reader = reader(Arc::new(MemorySnapshotStore::new()), rub, usd);

        // Only USD can be priced.
        let timeline = reader.timeline(now()).await;
        assert_eq!(timeline.entry.origin, EntryOrigin::Placeholder);
    }

    #[tokio::test]
    async fn test_preview_never_fetches() {
        let store = Arc::new(MemorySnapshotStore::new());
        let rub = rub_source();
        let reader = reader(store.clone(), rub.clone(), usd_source());

        assert_eq!(reader.preview(now()).origin, EntryOrigin::Placeholder);

        publish(store.as_ref(), now() - Duration::days(2));
        let entry = reader.preview(now());
        assert_eq!(entry.origin, EntryOrigin::Snapshot);
        assert_eq!(rate_of(&entry, "USD"), Some(93.0));
        assert_eq!(rub.calls(), 0);
    }
}
