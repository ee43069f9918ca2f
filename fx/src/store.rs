//! Process-wide rate store holding both anchored tables.

use std::sync::Arc;

use kurs_common::{backup, Anchor, RateTable, Timestamp};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// The two independently sourced rate tables plus refresh bookkeeping.
///
/// Tables start from the backup values and are only ever replaced as a
/// whole, so a reader never sees a half-written table.
#[derive(Debug, Clone)]
pub struct RateStore {
    rub_table: RateTable,
    usd_table: RateTable,
    last_updated: Option<Timestamp>,
    is_refreshing: bool,
    generation: u64,
}

impl RateStore {
    /// Create a store seeded with the backup tables.
    pub fn new() -> Self {
        Self {
            rub_table: backup::rub_table(),
            usd_table: backup::usd_table(),
            last_updated: None,
            is_refreshing: false,
            generation: 0,
        }
    }

    /// Create a store with explicit tables.
    pub fn with_tables(rub_table: RateTable, usd_table: RateTable) -> Self {
        let mut store = Self::new();
        store.replace_table(rub_table);
        store.replace_table(usd_table);
        store
    }

    /// Get the table for an anchor.
    pub fn table(&self, anchor: Anchor) -> &RateTable {
        match anchor {
            Anchor::Rub => &self.rub_table,
            Anchor::Usd => &self.usd_table,
        }
    }

    /// The RUB-anchored table.
    pub fn rub_table(&self) -> &RateTable {
        &self.rub_table
    }

    /// The USD-anchored table.
    pub fn usd_table(&self) -> &RateTable {
        &self.usd_table
    }

    /// Replace the table matching the new table's anchor.
    pub fn replace_table(&mut self, table: RateTable) {
        info!(anchor = %table.anchor(), entries = table.len(), "Replacing rate table");
        match table.anchor() {
            Anchor::Rub => self.rub_table = table,
            Anchor::Usd => self.usd_table = table,
        }
    }

    /// Rate for a code, falling back to the backup value and then to `1.0`.
    pub fn rate_or_backup(&self, anchor: Anchor, code: &str) -> f64 {
        if let Some(rate) = self.table(anchor).get(code) {
            return rate;
        }

        match backup::rate(anchor, code) {
            Some(rate) => {
                debug!(anchor = %anchor, code, "Using backup rate");
                rate
            }
            None => {
                warn!(anchor = %anchor, code, "No rate or backup rate, using 1.0");
                1.0
            }
        }
    }

    /// When the last refresh finished (successfully or not).
    pub fn last_updated(&self) -> Option<Timestamp> {
        self.last_updated
    }

    /// Whether a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.is_refreshing
    }

    /// Current refresh generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark a refresh as started and return its generation.
    ///
    /// A refresh already in flight is superseded rather than waited for: the
    /// older run can no longer clear the flag.
    pub fn begin_refresh(&mut self) -> u64 {
        if self.is_refreshing {
            warn!(
                superseded_generation = self.generation,
                "Refresh already in flight, forcing reset"
            );
        }
        self.generation += 1;
        self.is_refreshing = true;
        self.generation
    }

    /// Finish the refresh of `generation`, stamping the update time.
    ///
    /// Returns false when the generation was superseded (the flag then
    /// belongs to the newer run) or was already finished. Each generation
    /// is stamped at most once.
    pub fn finish_refresh(&mut self, generation: u64, at: Timestamp) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Ignoring finish of superseded refresh");
            return false;
        }
        if !self.is_refreshing {
            debug!(generation, "Refresh already finished");
            return false;
        }
        self.is_refreshing = false;
        self.last_updated = Some(at);
        true
    }
}

impl Default for RateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate store shared between the session and the fetcher.
pub type SharedRateStore = Arc<RwLock<RateStore>>;

/// Create a shared store seeded with backup tables.
pub fn shared_store() -> SharedRateStore {
    Arc::new(RwLock::new(RateStore::new()))
}
