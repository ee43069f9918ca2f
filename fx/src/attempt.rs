//! Single fetch attempt with a hard deadline and a completion guard.
//!
//! The network future runs in its own task and is never cancelled. A timer
//! task races it; whichever concludes first decides the attempt, and any
//! later conclusion is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};

/// Lifecycle of a fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Neither the source nor the timer has concluded.
    Pending,
    /// The source answered with usable data.
    Succeeded,
    /// The source answered with an error.
    Failed,
    /// The hard deadline fired first.
    TimedOut,
}

impl AttemptState {
    fn from_result<T>(result: &FxResult<T>) -> Self {
        match result {
            Ok(_) => AttemptState::Succeeded,
            Err(e) if e.is_timeout() => AttemptState::TimedOut,
            Err(_) => AttemptState::Failed,
        }
    }

    /// Check if the attempt has concluded.
    pub fn is_concluded(&self) -> bool {
        !matches!(self, AttemptState::Pending)
    }
}

struct Inner<T> {
    state: AttemptState,
    outcome_tx: Option<oneshot::Sender<FxResult<T>>>,
}

/// A fetch attempt that accepts exactly one conclusion.
pub struct FetchAttempt<T> {
    source_name: &'static str,
    inner: Mutex<Inner<T>>,
}

impl<T> FetchAttempt<T> {
    /// Create a pending attempt and the receiver for its conclusion.
    pub fn new(source_name: &'static str) -> (Arc<Self>, oneshot::Receiver<FxResult<T>>) {
        let (tx, rx) = oneshot::channel();
        let attempt = Arc::new(Self {
            source_name,
            inner: Mutex::new(Inner {
                state: AttemptState::Pending,
                outcome_tx: Some(tx),
            }),
        });
        (attempt, rx)
    }

    /// Conclude the attempt. Returns false if it had already concluded, in
    /// which case `result` is discarded.
    pub fn conclude(&self, result: FxResult<T>) -> bool {
        let mut inner = self.inner.lock();

        if inner.state.is_concluded() {
            debug!(
                source = self.source_name,
                state = ?inner.state,
                "Ignoring completion of an already concluded attempt"
            );
            return false;
        }

        inner.state = AttemptState::from_result(&result);
        if let Some(tx) = inner.outcome_tx.take() {
            // The receiver may be gone if the refresh watchdog fired.
            let _ = tx.send(result);
        }
        true
    }

    /// Current state.
    pub fn state(&self) -> AttemptState {
        self.inner.lock().state
    }
}

/// Result of [`run_attempt`].
#[derive(Debug)]
pub struct AttemptOutcome<T> {
    /// Source name.
    pub source_name: &'static str,
    /// Final state; never `Pending`.
    pub state: AttemptState,
    /// The winning conclusion.
    pub result: FxResult<T>,
}

/// Run `work` off the caller's task with a hard deadline.
pub async fn run_attempt<T, F>(source_name: &'static str, deadline: Duration, work: F) -> AttemptOutcome<T>
where
    T: Send + 'static,
    F: Future<Output = FxResult<T>> + Send + 'static,
{
    let (attempt, outcome_rx) = FetchAttempt::new(source_name);

    // The worker is detached: a late answer only reaches the guard.
    let worker_attempt = Arc::clone(&attempt);
    tokio::spawn(async move {
        let result = work.await;
        worker_attempt.conclude(result);
    });

    let timer_attempt = Arc::clone(&attempt);
    let timer = tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        if timer_attempt.conclude(Err(FxError::Timeout {
            source_name,
            after_ms: deadline.as_millis() as u64,
        })) {
            warn!(source = source_name, deadline_ms = deadline.as_millis() as u64, "Fetch attempt timed out");
        }
    });

    let result = outcome_rx
        .await
        .unwrap_or_else(|_| Err(FxError::network(source_name, "attempt abandoned")));
    timer.abort();

    AttemptOutcome {
        source_name,
        state: attempt.state(),
        result,
    }
}
