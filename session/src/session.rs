//! The interactive converter session.

use std::sync::Arc;

use kurs_calculator::{CalculatorState, Key, Operation};
use kurs_common::{format_last_updated, now, Currency, KursError, KursResult};
use kurs_fx::{shared_store, Conversion, ConversionEngine, RateFetcher, RefreshReport, SharedRateStore};
use kurs_widget::{FileSnapshotStore, MemorySnapshotStore, SnapshotPublisher, SnapshotStore};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::config::SessionConfig;
use crate::context::ConversionContext;
use crate::scheduler::{RefreshScheduler, RefreshTick};

/// Something the session's owner should hand back via
/// [`ConverterSession::handle_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The refresh timer ticked.
    RefreshDue,
    /// A background refresh finished and its result is ready to apply.
    RefreshFinished(RefreshReport),
}

const REPORT_QUEUE: usize = 4;

/// Owns the rate store, the calculator and the derived conversion output.
///
/// Every method runs on the caller's task; refreshes run on spawned tasks
/// and come back as [`SessionEvent::RefreshFinished`].
pub struct ConverterSession {
    config: SessionConfig,
    store: SharedRateStore,
    fetcher: RateFetcher,
    publisher: SnapshotPublisher,
    scheduler: RefreshScheduler,
    ticks: mpsc::Receiver<RefreshTick>,
    reports_tx: mpsc::Sender<RefreshReport>,
    reports_rx: mpsc::Receiver<RefreshReport>,
    context: ConversionContext,
    calculator: CalculatorState,
    conversion: Conversion,
}

impl ConverterSession {
    /// Create a session with HTTP sources and the configured snapshot store.
    pub fn new(config: SessionConfig) -> KursResult<Self> {
        config.validate().map_err(KursError::Configuration)?;

        let store = shared_store();
        let fetcher = RateFetcher::new(store.clone(), config.fetch.clone())
            .map_err(|e| KursError::Configuration(e.to_string()))?;

        let snapshots: Arc<dyn SnapshotStore> = match &config.shared_dir {
            Some(dir) => Arc::new(FileSnapshotStore::open(dir)?),
            None => Arc::new(MemorySnapshotStore::new()),
        };

        Self::with_parts(config, fetcher, SnapshotPublisher::new(snapshots))
    }

    /// Create a session around an existing fetcher and publisher.
    pub fn with_parts(config: SessionConfig, fetcher: RateFetcher, publisher: SnapshotPublisher) -> KursResult<Self> {
        let context = ConversionContext::new(&config.default_from, &config.default_to)?;
        let store = fetcher.store().clone();
        let calculator = CalculatorState::new();
        let conversion =
            ConversionEngine::quote(context.from(), context.to(), calculator.display_value(), &store.read());
        let (scheduler, ticks) = RefreshScheduler::new(config.refresh_interval);
        let (reports_tx, reports_rx) = mpsc::channel(REPORT_QUEUE);

        Ok(Self {
            config,
            store,
            fetcher,
            publisher,
            scheduler,
            ticks,
            reports_tx,
            reports_rx,
            context,
            calculator,
            conversion,
        })
    }

    // Rates

    /// Start a refresh of both rate tables on a background task.
    ///
    /// The session stays usable meanwhile; the report arrives through
    /// [`next_event`](Self::next_event).
    #[instrument(skip(self))]
    pub fn start_refresh(&self) {
        let fetcher = self.fetcher.clone();
        let reports_tx = self.reports_tx.clone();

        tokio::spawn(async move {
            let report = fetcher.refresh_all().await;
            if reports_tx.send(report).await.is_err() {
                debug!("Session dropped before refresh finished");
            }
        });
    }

    /// Bring the derived output up to date after a refresh. A new
    /// USD-anchored table is also published to the widget.
    pub fn apply_refresh(&mut self, report: &RefreshReport) {
        if report.any_updated() {
            self.update_conversion_rate();
        }

        if report.usd_updated() {
            let published = self.publisher.publish(&self.store.read(), now());
            if let Err(e) = published {
                error!(error = %e, code = e.error_code(), "Failed to publish widget snapshot");
            }
        }
    }

    /// Start a refresh and wait until a refresh finishes, handling timer
    /// ticks on the way.
    pub async fn refresh(&mut self) -> RefreshReport {
        self.start_refresh();
        self.next_refresh().await
    }

    /// Recompute the pair rate from the store and reconvert.
    pub fn update_conversion_rate(&mut self) {
        let rate = ConversionEngine::compute_pair_rate(self.context.from(), self.context.to(), &self.store.read());
        debug!(from = %self.context.from(), to = %self.context.to(), rate, "Conversion rate updated");
        self.conversion.rate = rate;
        self.convert();
    }

    /// Reconvert the display value at the current rate.
    pub fn convert(&mut self) {
        let (from, to, rate) = (self.context.from(), self.context.to(), self.conversion.rate);
        let display = self.calculator.display_value();

        self.conversion = Conversion::new(
            from,
            to,
            rate,
            kurs_common::parse_decimal(display),
            ConversionEngine::convert_display(display, rate),
            ConversionEngine::summary_line(from, to, rate),
        );
    }

    /// Select the source currency.
    pub fn select_from(&mut self, code: &str) -> KursResult<()> {
        self.context.select_from(code)?;
        self.update_conversion_rate();
        Ok(())
    }

    /// Select the target currency.
    pub fn select_to(&mut self, code: &str) -> KursResult<()> {
        self.context.select_to(code)?;
        self.update_conversion_rate();
        Ok(())
    }

    /// Exchange source and target currencies.
    pub fn swap_currencies(&mut self) {
        self.context.swap();
        self.update_conversion_rate();
    }

    // Calculator

    pub fn append_digit(&mut self, digit: char) {
        self.calculator.append_digit(digit);
        self.convert();
    }

    pub fn append_decimal(&mut self) {
        self.calculator.append_decimal();
        self.convert();
    }

    pub fn perform_operator(&mut self, operation: Operation) {
        self.calculator.perform_operator(operation);
        self.convert();
    }

    pub fn perform_equals(&mut self) {
        self.calculator.perform_equals();
        self.convert();
    }

    pub fn delete_last_digit(&mut self) {
        self.calculator.delete_last_digit();
        self.convert();
    }

    pub fn clear(&mut self) {
        self.calculator.clear();
        self.convert();
    }

    /// Dispatch a keypad press.
    pub fn press(&mut self, key: Key) {
        self.calculator.press(key);
        self.convert();
    }

    // Lifecycle

    /// Restart the refresh timer and start a refresh if rates are outdated.
    ///
    /// Returns whether a refresh was started.
    pub fn on_foreground(&mut self) -> bool {
        self.scheduler.start();

        if self.should_update() {
            info!("Rates outdated, refreshing on foreground");
            self.start_refresh();
            true
        } else {
            false
        }
    }

    /// Stop the refresh timer.
    pub fn on_background(&mut self) {
        self.scheduler.stop();
    }

    /// Wait for the next timer tick or finished refresh.
    ///
    /// Cancel-safe: dropping the future loses nothing, so owners can
    /// `select!` it against user input. Pends forever while idle with the
    /// scheduler stopped.
    pub async fn next_event(&mut self) -> SessionEvent {
        tokio::select! {
            biased;
            Some(report) = self.reports_rx.recv() => SessionEvent::RefreshFinished(report),
            Some(RefreshTick) = self.ticks.recv() => SessionEvent::RefreshDue,
            else => std::future::pending().await,
        }
    }

    /// React to an event from [`next_event`](Self::next_event). A due tick
    /// starts a refresh; a finished one is applied and returned.
    pub fn handle_event(&mut self, event: SessionEvent) -> Option<RefreshReport> {
        match event {
            SessionEvent::RefreshDue => {
                debug!("Scheduled refresh due");
                self.start_refresh();
                None
            }
            SessionEvent::RefreshFinished(report) => {
                self.apply_refresh(&report);
                Some(report)
            }
        }
    }

    /// Handle events until a refresh finishes.
    ///
    /// Waits indefinitely while the scheduler is stopped and nothing is in
    /// flight.
    pub async fn run_scheduled(&mut self) -> RefreshReport {
        self.next_refresh().await
    }

    async fn next_refresh(&mut self) -> RefreshReport {
        loop {
            let event = self.next_event().await;
            if let Some(report) = self.handle_event(event) {
                return report;
            }
        }
    }

    /// True when no refresh finished within the update threshold.
    pub fn should_update(&self) -> bool {
        match self.store.read().last_updated() {
            Some(last) => now().signed_duration_since(last) > self.config.update_threshold,
            None => true,
        }
    }

    // Outputs

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub fn conversion_rate(&self) -> f64 {
        self.conversion.rate
    }

    /// Formatted converted amount.
    pub fn converted_value(&self) -> &str {
        &self.conversion.converted
    }

    pub fn summary_line(&self) -> &str {
        &self.conversion.summary
    }

    /// Last refresh time as `dd.MM.yyyy, HH:mm`, if any refresh finished.
    pub fn last_updated(&self) -> Option<String> {
        self.store.read().last_updated().map(format_last_updated)
    }

    /// Whether a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.store.read().is_refreshing()
    }

    /// Picker hint for a catalog currency.
    pub fn rate_against_usd(&self, code: &str) -> KursResult<String> {
        let currency = Currency::find(code)?;
        Ok(ConversionEngine::rate_against_usd(currency, &self.store.read()))
    }

    pub fn calculator(&self) -> &CalculatorState {
        &self.calculator
    }

    pub fn context(&self) -> &ConversionContext {
        &self.context
    }

    pub fn store(&self) -> &SharedRateStore {
        &self.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
