//! The orchestrator: check registry, dispatch and event fan-out.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sensorwatch_types::{Event, Snapshot};

use crate::check::{Check, Emitter};
use crate::error::CheckError;
use crate::notify::Notifier;

#[cfg(feature = "tokio")]
use crate::error::TickError;
#[cfg(feature = "tokio")]
use crate::tick::TickHandle;
#[cfg(feature = "tokio")]
use std::time::Duration;

/// Drives checks and fans their events out to notifiers.
///
/// Checks run in registration order, and so do notifiers for each event.
/// Every dispatch (snapshot push, tick, reset) holds a single lock over both
/// lists, so two dispatches never overlap even when ticks come from a timer
/// task on another thread.
///
/// A check or notifier that fails, by returning an error or by panicking,
/// is logged and skipped. It is not disabled and runs again next cycle.
///
/// # Example
///
/// ```rust
/// use sensorwatch_engine::{LogNotifier, Runner, ZeroCheck};
/// use sensorwatch_types::Snapshot;
///
/// let runner = Runner::new();
/// runner.register(ZeroCheck::new(0.0));
/// runner.set_notifiers(vec![Box::new(LogNotifier::new())]);
///
/// runner.push_snapshot(&Snapshot::builder().latest("7", 0.0).build());
/// assert_eq!(runner.stats().events_emitted, 1);
/// ```
pub struct Runner {
    shared: Arc<Shared>,
    #[cfg(feature = "tokio")]
    ticker: Mutex<Option<TickHandle>>,
}

impl Runner {
    /// Create a runner with no checks and no notifiers.
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    /// Create a builder for configuring the runner.
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    fn from_parts(checks: Vec<Box<dyn Check>>, notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry { checks, notifiers }),
                counters: Counters::default(),
            }),
            #[cfg(feature = "tokio")]
            ticker: Mutex::new(None),
        }
    }

    /// Append a check. Duplicates are allowed.
    pub fn register<C: Check + 'static>(&self, check: C) {
        self.register_boxed(Box::new(check));
    }

    /// Append an already boxed check.
    pub fn register_boxed(&self, check: Box<dyn Check>) {
        tracing::debug!(check = check.name(), "check registered");
        self.shared.registry.lock().checks.push(check);
    }

    /// Replace the notifier list. The new list receives the next emitted event.
    pub fn set_notifiers(&self, notifiers: Vec<Box<dyn Notifier>>) {
        self.shared.registry.lock().notifiers = notifiers;
    }

    /// Append a notifier to the current list.
    pub fn add_notifier<N: Notifier + 'static>(&self, notifier: N) {
        self.shared.registry.lock().notifiers.push(Box::new(notifier));
    }

    /// Names of the registered checks, in order.
    pub fn check_names(&self) -> Vec<String> {
        let registry = self.shared.registry.lock();
        registry.checks.iter().map(|c| c.name().to_string()).collect()
    }

    /// Names of the current notifiers, in order.
    pub fn notifier_names(&self) -> Vec<String> {
        let registry = self.shared.registry.lock();
        registry.notifiers.iter().map(|n| n.name().to_string()).collect()
    }

    /// Hand a snapshot to every check.
    pub fn push_snapshot(&self, snapshot: &Snapshot) {
        self.shared.dispatch_snapshot(snapshot);
    }

    /// Run every check's time-based evaluation at `now`.
    ///
    /// The tick timer calls this with the wall clock; callers can also drive
    /// it directly.
    pub fn tick(&self, now: DateTime<Utc>) {
        self.shared.dispatch_tick(now);
    }

    /// Clear the state of every check, keeping registrations.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Dispatch counters since creation.
    pub fn stats(&self) -> RunnerStats {
        self.shared.counters.load()
    }

    /// Start ticking every `period`, replacing any running timer.
    ///
    /// The first tick fires one period after the call. Must be called from
    /// within a tokio runtime. On error any previous timer keeps running.
    #[cfg(feature = "tokio")]
    pub fn start_tick(&self, period: Duration) -> Result<(), TickError> {
        let handle = TickHandle::spawn(Arc::clone(&self.shared), period)?;
        if let Some(previous) = self.ticker.lock().replace(handle) {
            previous.stop();
        }
        tracing::info!(period_ms = period.as_millis() as u64, "tick timer started");
        Ok(())
    }

    /// Stop the tick timer. Safe to call at any time, any number of times.
    #[cfg(feature = "tokio")]
    pub fn stop_tick(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.stop();
            tracing::info!("tick timer stopped");
        }
    }

    /// True while a tick timer is installed.
    #[cfg(feature = "tokio")]
    pub fn is_ticking(&self) -> bool {
        self.ticker.lock().is_some()
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("checks", &self.check_names())
            .field("notifiers", &self.notifier_names())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Builder for configuring a [`Runner`].
#[derive(Default)]
pub struct RunnerBuilder {
    checks: Vec<Box<dyn Check>>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl RunnerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a check. Checks run in the order they are added.
    pub fn check<C: Check + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn boxed_check(mut self, check: Box<dyn Check>) -> Self {
        self.checks.push(check);
        self
    }

    /// Add a notifier. Events reach notifiers in the order they are added.
    pub fn notifier<N: Notifier + 'static>(mut self, notifier: N) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }

    pub fn boxed_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Build the runner.
    pub fn build(self) -> Runner {
        Runner::from_parts(self.checks, self.notifiers)
    }
}

/// Point-in-time copy of a runner's dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    pub snapshots: u64,
    pub ticks: u64,
    pub events_emitted: u64,
    pub check_faults: u64,
    pub notifier_faults: u64,
}

#[derive(Debug, Default)]
struct Counters {
    snapshots: AtomicU64,
    ticks: AtomicU64,
    events_emitted: AtomicU64,
    check_faults: AtomicU64,
    notifier_faults: AtomicU64,
}

impl Counters {
    fn load(&self) -> RunnerStats {
        RunnerStats {
            snapshots: self.snapshots.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            check_faults: self.check_faults.load(Ordering::Relaxed),
            notifier_faults: self.notifier_faults.load(Ordering::Relaxed),
        }
    }
}

/// State shared between a runner and its tick task.
pub(crate) struct Shared {
    registry: Mutex<Registry>,
    counters: Counters,
}

impl Shared {
    fn dispatch_snapshot(&self, snapshot: &Snapshot) {
        let mut registry = self.registry.lock();
        self.counters.snapshots.fetch_add(1, Ordering::Relaxed);
        registry.run_checks(&self.counters, "snapshot", |check, emit| {
            check.on_snapshot(snapshot, emit)
        });
    }

    pub(crate) fn dispatch_tick(&self, now: DateTime<Utc>) {
        let mut registry = self.registry.lock();
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        registry.run_checks(&self.counters, "tick", |check, emit| check.on_tick(now, emit));
    }

    fn reset(&self) {
        let mut registry = self.registry.lock();
        for check in registry.checks.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| check.reset()));
            report_check(check.name(), "reset", outcome, &self.counters);
        }
    }
}

struct Registry {
    checks: Vec<Box<dyn Check>>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl Registry {
    fn run_checks<F>(&mut self, counters: &Counters, phase: &'static str, mut f: F)
    where
        F: FnMut(&mut dyn Check, &mut Emitter<'_>) -> Result<(), CheckError>,
    {
        let Registry { checks, notifiers } = self;
        for check in checks.iter_mut() {
            let mut fan_out = |event: Event| deliver(notifiers.as_mut_slice(), &event, counters);
            let mut emit = Emitter::new(&mut fan_out);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(check.as_mut(), &mut emit)));
            drop(emit);
            report_check(check.name(), phase, outcome, counters);
        }
    }
}

/// Deliver one event to every notifier, isolating failures.
fn deliver(notifiers: &mut [Box<dyn Notifier>], event: &Event, counters: &Counters) {
    counters.events_emitted.fetch_add(1, Ordering::Relaxed);
    tracing::debug!(
        kind = %event.kind,
        entity = %event.meta.entity,
        reminder = event.meta.reminder,
        "event emitted"
    );

    for notifier in notifiers.iter_mut() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| notifier.handle(event)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                counters.notifier_faults.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(notifier = notifier.name(), kind = %event.kind, error = %err, "notifier failed");
            }
            Err(payload) => {
                counters.notifier_faults.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    notifier = notifier.name(),
                    kind = %event.kind,
                    panic = %panic_message(payload.as_ref()),
                    "notifier panicked"
                );
            }
        }
    }
}

fn report_check(
    name: &str,
    phase: &'static str,
    outcome: std::thread::Result<Result<(), CheckError>>,
    counters: &Counters,
) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            counters.check_faults.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(check = name, phase, error = %err, "check failed");
        }
        Err(payload) => {
            counters.check_faults.fetch_add(1, Ordering::Relaxed);
            tracing::error!(check = name, phase, panic = %panic_message(payload.as_ref()), "check panicked");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
