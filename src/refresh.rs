//! Event-driven refresh coordination
//!
//! A single `Idle | Running` token gates the unit of work: a trigger while
//! running is dropped, and the token returns to `Idle` when the run ends by
//! any path (success, error, panic, abort). Signals arrive through
//! [`SignalSource`]s; [`Subscription::unsubscribe`] detaches them all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::prices::CancelToken;

/// The unit of work started by a trigger
#[async_trait]
pub trait RefreshJob: Send + Sync + 'static {
    async fn run(&self, run_id: &str, cancel: CancelToken) -> Result<()>;
}

/// Single-flight state token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Running,
}

/// Page/client visibility as reported by the visibility signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// External signal that may start a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSignal {
    VisibilityChanged(Visibility),
    Manual,
    Scheduled,
}

impl RefreshSignal {
    /// Whether this occurrence maps to a trigger
    pub fn triggers(&self) -> bool {
        match self {
            Self::VisibilityChanged(v) => *v == Visibility::Visible,
            Self::Manual | Self::Scheduled => true,
        }
    }
}

/// Source of refresh signals; `None` means the source is exhausted
#[async_trait]
pub trait SignalSource: Send + 'static {
    async fn next_signal(&mut self) -> Option<RefreshSignal>;
}

#[async_trait]
impl SignalSource for mpsc::UnboundedReceiver<RefreshSignal> {
    async fn next_signal(&mut self) -> Option<RefreshSignal> {
        self.recv().await
    }
}

#[async_trait]
impl SignalSource for mpsc::Receiver<RefreshSignal> {
    async fn next_signal(&mut self) -> Option<RefreshSignal> {
        self.recv().await
    }
}

/// Periodic scheduler emitting [`RefreshSignal::Scheduled`]
pub struct IntervalSource {
    interval: tokio::time::Interval,
}

impl IntervalSource {
    /// The first signal fires one full `period` after creation
    pub fn new(period: Duration) -> Self {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl SignalSource for IntervalSource {
    async fn next_signal(&mut self) -> Option<RefreshSignal> {
        self.interval.tick().await;
        Some(RefreshSignal::Scheduled)
    }
}

/// Result of a trigger call
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A new run was started
    Started(JoinHandle<Result<()>>),
    /// A run was already in flight; the trigger was dropped
    AlreadyRunning,
    /// The coordinator has been torn down
    Detached,
}

struct Inner {
    job: Arc<dyn RefreshJob>,
    state: Mutex<RefreshState>,
    current_cancel: Mutex<Option<CancelToken>>,
    detached: AtomicBool,
    logger: StructuredLogger,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_cancel(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.current_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Restores `Idle` when the run's future is dropped
struct RunGuard {
    inner: Arc<Inner>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.inner.current_cancel().take();
        *self.inner.state() = RefreshState::Idle;
    }
}

/// Starts the unit of work on demand, at most one at a time
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(job: Arc<dyn RefreshJob>) -> Self {
        Self {
            inner: Arc::new(Inner {
                job,
                state: Mutex::new(RefreshState::Idle),
                current_cancel: Mutex::new(None),
                detached: AtomicBool::new(false),
                logger: get_logger("refresh"),
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        *self.inner.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RefreshState::Running
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::SeqCst)
    }

    /// `Idle -> Running` and spawn a run; no-op while `Running` or after teardown.
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self) -> TriggerOutcome {
        if self.is_detached() {
            return TriggerOutcome::Detached;
        }

        {
            let mut state = self.inner.state();
            if *state == RefreshState::Running {
                self.inner
                    .logger
                    .debug("Refresh already in flight; trigger ignored");
                return TriggerOutcome::AlreadyRunning;
            }
            *state = RefreshState::Running;
        }

        let guard = RunGuard {
            inner: Arc::clone(&self.inner),
        };
        let cancel = CancelToken::new();
        *self.inner.current_cancel() = Some(cancel.clone());

        let job = Arc::clone(&self.inner.job);
        let run_id = Uuid::new_v4().to_string();
        let logger = self.inner.logger.for_run(&run_id);

        TriggerOutcome::Started(tokio::spawn(async move {
            let _guard = guard;
            logger.debug("Refresh started");
            let result = job.run(&run_id, cancel).await;
            match &result {
                Ok(()) => logger.debug("Refresh finished"),
                Err(e) if e.is_cancelled() => logger.info("Refresh cancelled"),
                Err(e) => logger.warn(&format!("Refresh failed: {}", e)),
            }
            result
        }))
    }

    /// Cancel the in-flight run, if any. Returns whether a run was signalled.
    pub fn cancel_current(&self) -> bool {
        match self.inner.current_cancel().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Make every later trigger a no-op. A run already past the gate is left
    /// to complete.
    pub fn shutdown(&self) {
        self.inner.detached.store(true, Ordering::SeqCst);
    }

    /// Forward signals from every source to [`trigger`](Self::trigger).
    ///
    /// Dropping the returned [`Subscription`] stops only its own listeners;
    /// [`Subscription::unsubscribe`] also shuts the coordinator down.
    pub fn attach(&self, sources: Vec<Box<dyn SignalSource>>) -> Subscription {
        let listeners = sources
            .into_iter()
            .map(|mut source| {
                let coordinator = self.clone();
                tokio::spawn(async move {
                    while let Some(signal) = source.next_signal().await {
                        if !signal.triggers() {
                            continue;
                        }
                        if let TriggerOutcome::Detached = coordinator.trigger() {
                            break;
                        }
                    }
                })
            })
            .collect();

        Subscription {
            coordinator: self.clone(),
            listeners,
        }
    }
}

/// Handle to the attached signal listeners
#[must_use = "dropping a Subscription stops its listeners"]
pub struct Subscription {
    coordinator: RefreshCoordinator,
    listeners: Vec<JoinHandle<()>>,
}

impl Subscription {
    /// Tear down: stop the listeners and shut the coordinator down. Later
    /// triggers are no-ops; a run already past the gate is left to complete.
    pub fn unsubscribe(mut self) {
        self.stop_listeners();
        self.coordinator.shutdown();
    }

    fn stop_listeners(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop_listeners();
    }
}
