//! Periodic refresh timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Signal that a scheduled refresh is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTick;

/// Sends a [`RefreshTick`] every `interval` while started.
///
/// Ticks are not queued: if one is still unread the next is dropped.
pub struct RefreshScheduler {
    interval: Duration,
    tick_tx: mpsc::Sender<RefreshTick>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Create a stopped scheduler and the receiver for its ticks.
    pub fn new(interval: Duration) -> (Self, mpsc::Receiver<RefreshTick>) {
        let (tick_tx, tick_rx) = mpsc::channel(1);
        let scheduler = Self {
            interval,
            tick_tx,
            handle: None,
        };
        (scheduler, tick_rx)
    }

    /// Start ticking. The first tick comes one interval from now; a running
    /// timer is restarted.
    pub fn start(&mut self) {
        self.stop();

        let interval = self.interval;
        let tick_tx = self.tick_tx.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match tick_tx.try_send(RefreshTick) {
                    Ok(()) => debug!("Scheduled refresh due"),
                    Err(mpsc::error::TrySendError::Full(_)) => debug!("Previous tick unread, skipping"),
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        }));

        info!(interval_secs = interval.as_secs(), "Refresh scheduler started");
    }

    /// Stop ticking.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Refresh scheduler stopped");
        }
    }

    /// Check if the timer is running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
