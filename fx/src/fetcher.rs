//! Dual-source refresh of the rate store.

use std::sync::Arc;

use kurs_common::{now, RateTable};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::attempt::{run_attempt, AttemptOutcome, AttemptState};
use crate::config::FetchConfig;
use crate::error::FxResult;
use crate::source::{http_client, CbrSource, OpenErSource, RateSource};
use crate::store::SharedRateStore;

/// What happened during one `refresh_all` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Generation assigned to this refresh.
    pub generation: u64,
    /// Outcome of the RUB-anchored source. `Pending` if the watchdog fired
    /// before the attempt concluded or started.
    pub rub: AttemptState,
    /// Outcome of the USD-anchored source.
    pub usd: AttemptState,
    /// Whether the outer watchdog ended the refresh.
    pub watchdog_fired: bool,
    /// Whether a newer refresh took over the in-flight flag.
    pub superseded: bool,
}

impl RefreshReport {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            rub: AttemptState::Pending,
            usd: AttemptState::Pending,
            watchdog_fired: false,
            superseded: false,
        }
    }

    /// The RUB-anchored table was replaced.
    pub fn rub_updated(&self) -> bool {
        self.rub == AttemptState::Succeeded
    }

    /// The USD-anchored table was replaced.
    pub fn usd_updated(&self) -> bool {
        self.usd == AttemptState::Succeeded
    }

    /// Either table was replaced.
    pub fn any_updated(&self) -> bool {
        self.rub_updated() || self.usd_updated()
    }
}

/// Fetches both anchored tables and writes them into the shared store.
///
/// The fetcher is the only writer of the store's tables.
#[derive(Clone)]
pub struct RateFetcher {
    store: SharedRateStore,
    rub_source: Arc<dyn RateSource>,
    usd_source: Arc<dyn RateSource>,
    config: FetchConfig,
}

impl RateFetcher {
    /// Create a fetcher for the configured HTTP sources.
    pub fn new(store: SharedRateStore, config: FetchConfig) -> FxResult<Self> {
        let client = http_client(config.request_timeout)?;
        let rub_source = Arc::new(CbrSource::new(client.clone(), config.cbr_url.clone()));
        let usd_source = Arc::new(OpenErSource::new(client, config.open_er_url.clone()));

        Ok(Self::with_sources(store, rub_source, usd_source, config))
    }

    /// Create a fetcher with explicit sources.
    pub fn with_sources(
        store: SharedRateStore,
        rub_source: Arc<dyn RateSource>,
        usd_source: Arc<dyn RateSource>,
        config: FetchConfig,
    ) -> Self {
        Self {
            store,
            rub_source,
            usd_source,
            config,
        }
    }

    /// Get the shared store.
    pub fn store(&self) -> &SharedRateStore {
        &self.store
    }

    /// Refresh both tables.
    ///
    /// Source A (RUB-anchored) is tried first, then source B (USD-anchored)
    /// regardless of A's outcome. Failures keep the previous tables.
    ///
    /// The watchdog runs as its own task, so it clears the in-flight flag and
    /// stamps the update time even if the caller stops awaiting this future.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> RefreshReport {
        let generation = self.store.write().begin_refresh();
        let mut report = RefreshReport::new(generation);

        info!(generation, "Starting rate refresh");

        let watchdog = self.config.refresh_watchdog;
        let watchdog_task = self.spawn_watchdog(generation);

        if tokio::time::timeout(watchdog, self.refresh_sources(&mut report))
            .await
            .is_err()
        {
            report.watchdog_fired = true;
        }

        watchdog_task.abort();
        if self.store.write().finish_refresh(generation, now()) && report.watchdog_fired {
            warn!(
                generation,
                watchdog_ms = watchdog.as_millis() as u64,
                "Refresh watchdog fired, forcing completion"
            );
        }
        report.superseded = self.store.read().generation() != generation;

        info!(
            generation,
            rub = ?report.rub,
            usd = ?report.usd,
            watchdog_fired = report.watchdog_fired,
            "Rate refresh finished"
        );

        report
    }

    /// Detached timer that force-finishes `generation` after the watchdog.
    fn spawn_watchdog(&self, generation: u64) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let watchdog = self.config.refresh_watchdog;

        tokio::spawn(async move {
            tokio::time::sleep(watchdog).await;
            if store.write().finish_refresh(generation, now()) {
                warn!(
                    generation,
                    watchdog_ms = watchdog.as_millis() as u64,
                    "Refresh watchdog fired, forcing completion"
                );
            }
        })
    }

    async fn refresh_sources(&self, report: &mut RefreshReport) {
        let rub = self.attempt(&self.rub_source).await;
        report.rub = rub.state;
        self.apply(rub);

        let usd = self.attempt(&self.usd_source).await;
        report.usd = usd.state;
        self.apply(usd);
    }

    async fn attempt(&self, source: &Arc<dyn RateSource>) -> AttemptOutcome<RateTable> {
        let source = Arc::clone(source);
        let source_name = source.name();

        run_attempt(source_name, self.config.attempt_deadline, async move {
            source.fetch_checked().await
        })
        .await
    }

    fn apply(&self, outcome: AttemptOutcome<RateTable>) {
        match outcome.result {
            Ok(table) => {
                info!(
                    source = outcome.source_name,
                    anchor = %table.anchor(),
                    currencies = table.len(),
                    "Rates updated"
                );
                debug!(source = outcome.source_name, codes = ?table.codes(), "Received currencies");
                self.store.write().replace_table(table);
            }
            Err(e) => {
                warn!(
                    source = outcome.source_name,
                    kind = ?e.kind(),
                    error = %e,
                    "Rate source failed, keeping previous rates"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MockBehavior, MockRateSource};
    use crate::store::shared_store;
    use kurs_common::Anchor;
    use std::time::Duration;
    use tokio::time::Instant;

    fn full_rub() -> Arc<MockRateSource> {
        Arc::new(MockRateSource::rub(&[
            ("USD", 91.5),
            ("EUR", 99.0),
            ("GBP", 115.0),
            ("CNY", 12.7),
        ]))
    }

    fn full_usd() -> Arc<MockRateSource> {
        Arc::new(MockRateSource::usd(&[
            ("USD", 1.0),
            ("EUR", 0.93),
            ("RUB", 91.0),
            ("GBP", 0.8),
        ]))
    }

    fn fetcher(rub: Arc<MockRateSource>, usd: Arc<MockRateSource>) -> RateFetcher {
        RateFetcher::with_sources(shared_store(), rub, usd, FetchConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_sources_succeed() {
        let fetcher = fetcher(full_rub(), full_usd());

        let report = fetcher.refresh_all().await;

        assert!(report.rub_updated());
        assert!(report.usd_updated());
        assert!(!report.watchdog_fired);

        let store = fetcher.store().read();
        assert_eq!(store.rub_table().get("USD"), Some(91.5));
        assert_eq!(store.usd_table().get("RUB"), Some(91.0));
        assert!(!store.is_refreshing());
        assert!(store.last_updated().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_rub_data_keeps_table() {
        let rub = Arc::new(MockRateSource::rub(&[("USD", 91.5), ("EUR", 99.0)]));
        let fetcher = fetcher(rub, full_usd());
        let before = fetcher.store().read().rub_table().clone();

        let report = fetcher.refresh_all().await;

        assert_eq!(report.rub, AttemptState::Failed);
        // Source B is still tried.
        assert!(report.usd_updated());
        assert_eq!(fetcher.store().read().rub_table(), &before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_usd_timeout_keeps_usd_table() {
        let usd = full_usd();
        usd.set_behavior(MockBehavior::Hang);
        let fetcher = fetcher(full_rub(), usd);
        let usd_before = fetcher.store().read().usd_table().clone();
        let started = Instant::now();

        let report = fetcher.refresh_all().await;

        assert!(report.rub_updated());
        assert_eq!(report.usd, AttemptState::TimedOut);
        assert!(!report.watchdog_fired);
        assert!(started.elapsed() <= Duration::from_secs(15));

        let store = fetcher.store().read();
        assert_eq!(store.rub_table().get("USD"), Some(91.5));
        assert_eq!(store.usd_table(), &usd_before);
        assert!(!store.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_forces_completion() {
        let rub = full_rub();
        let usd = full_usd();
        rub.set_behavior(MockBehavior::Hang);
        usd.set_behavior(MockBehavior::Hang);
        let fetcher = fetcher(rub, usd);
        let started = Instant::now();

        let report = fetcher.refresh_all().await;

        assert!(report.watchdog_fired);
        assert_eq!(report.rub, AttemptState::TimedOut);
        assert_eq!(report.usd, AttemptState::Pending);
        assert!(started.elapsed() < Duration::from_secs(16));

        let store = fetcher.store().read();
        assert!(!store.is_refreshing());
        assert!(store.last_updated().is_some());
        assert_eq!(store.usd_table().anchor(), Anchor::Usd);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_survives_abandoned_refresh() {
        let rub = full_rub();
        let usd = full_usd();
        rub.set_behavior(MockBehavior::Hang);
        usd.set_behavior(MockBehavior::Hang);
        let fetcher = fetcher(rub, usd);

        // The caller gives up long before the watchdog.
        let abandoned = tokio::time::timeout(Duration::from_secs(1), fetcher.refresh_all()).await;
        assert!(abandoned.is_err());
        assert!(fetcher.store().read().is_refreshing());

        tokio::time::sleep(Duration::from_secs(60)).await;

        let store = fetcher.store().read();
        assert!(!store.is_refreshing());
        assert!(store.last_updated().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_does_not_restamp_finished_refresh() {
        let fetcher = fetcher(full_rub(), full_usd());

        let report = fetcher.refresh_all().await;
        assert!(!report.superseded);
        let stamped = fetcher.store().read().last_updated();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetcher.store().read().last_updated(), stamped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_and_parse_failures_are_non_fatal() {
        let rub = full_rub();
        let usd = full_usd();
        rub.set_behavior(MockBehavior::NetworkDown);
        usd.set_behavior(MockBehavior::Garbage);
        let fetcher = fetcher(rub, usd);

        let report = fetcher.refresh_all().await;

        assert_eq!(report.rub, AttemptState::Failed);
        assert_eq!(report.usd, AttemptState::Failed);
        assert!(!report.any_updated());
        // Backup values survive.
        assert_eq!(fetcher.store().read().usd_table().get("EUR"), Some(0.92));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentrant_refresh_forces_reset() {
        let usd = full_usd();
        usd.set_behavior(MockBehavior::Delayed(
            Duration::from_secs(5),
            RateTable::from_rates(Anchor::Usd, [("USD", 1.0), ("EUR", 0.9), ("RUB", 92.0)]),
        ));
        let fetcher = fetcher(full_rub(), usd.clone());

        let first = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.refresh_all().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(fetcher.store().read().is_refreshing());

        let second = fetcher.refresh_all().await;
        let first = first.await.unwrap();

        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert!(first.superseded);
        assert!(!second.superseded);
        assert_eq!(usd.calls(), 2);
        assert!(!fetcher.store().read().is_refreshing());
    }
}
