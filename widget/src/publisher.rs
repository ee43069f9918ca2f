//! Builds and publishes the widget snapshot from the rate store.

use std::sync::Arc;

use kurs_common::{Anchor, KursResult, Timestamp};
use kurs_fx::RateStore;
use tracing::{info, instrument};

use crate::snapshot::{widget_currencies, SnapshotRate, WidgetSnapshot};
use crate::store::SnapshotStore;

/// Writes ruble prices of the widget currencies to a [`SnapshotStore`].
#[derive(Clone)]
pub struct SnapshotPublisher {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotPublisher {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Price each widget currency in rubles.
    ///
    /// The RUB-anchored table is preferred. Otherwise the price is derived
    /// from the USD-anchored table as `usd[RUB] / usd[X]`, with backup
    /// values standing in for missing entries.
    pub fn build_snapshot(rates: &RateStore, at: Timestamp) -> Vec<SnapshotRate> {
        let rub_per_usd = rates.rate_or_backup(Anchor::Usd, "RUB");

        widget_currencies()
            .into_iter()
            .map(|currency| {
                let rate = rates.rub_table().get(currency.code()).unwrap_or_else(|| {
                    if currency.code() == "USD" {
                        rub_per_usd
                    } else {
                        rub_per_usd / rates.rate_or_backup(Anchor::Usd, currency.code())
                    }
                });
                SnapshotRate::new(currency, rate, at)
            })
            .collect()
    }

    /// Build the snapshot and write it with capture time `at`.
    #[instrument(skip(self, rates))]
    pub fn publish(&self, rates: &RateStore, at: Timestamp) -> KursResult<Vec<SnapshotRate>> {
        let snapshot = Self::build_snapshot(rates, at);
        WidgetSnapshot::save(self.store.as_ref(), &snapshot, at)?;

        info!(currencies = snapshot.len(), "Published widget snapshot");
        Ok(snapshot)
    }
}
