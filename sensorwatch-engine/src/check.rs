//! The check contract and the emit callback handed to checks.

use chrono::{DateTime, Utc};
use sensorwatch_types::{Event, Snapshot};

use crate::error::CheckError;

/// A pluggable unit of monitoring logic.
///
/// Checks own their tracking state. Every hook has a no-op default, so a
/// check only implements the ones it cares about. Hooks must be synchronous
/// and return promptly; the runner holds its dispatch lock while they run.
///
/// # Example
///
/// ```rust
/// use sensorwatch_engine::{Check, CheckError, Emitter, Event, EventKind, EventMeta, Severity, Snapshot};
///
/// struct EmptySnapshotCheck;
///
/// impl Check for EmptySnapshotCheck {
///     fn name(&self) -> &str {
///         "empty-snapshot"
///     }
///
///     fn on_snapshot(&mut self, snapshot: &Snapshot, emit: &mut Emitter<'_>) -> Result<(), CheckError> {
///         if snapshot.is_empty() {
///             emit.emit(Event::new(
///                 EventKind::from("EMPTY_SNAPSHOT"),
///                 Severity::Info,
///                 "snapshot carried no data",
///                 EventMeta::default(),
///             ));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Check: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Evaluate a freshly pushed snapshot.
    fn on_snapshot(
        &mut self,
        _snapshot: &Snapshot,
        _emit: &mut Emitter<'_>,
    ) -> Result<(), CheckError> {
        Ok(())
    }

    /// Evaluate time-based conditions at `now`, independent of new data.
    fn on_tick(&mut self, _now: DateTime<Utc>, _emit: &mut Emitter<'_>) -> Result<(), CheckError> {
        Ok(())
    }

    /// Forget all accumulated state.
    fn reset(&mut self) -> Result<(), CheckError> {
        Ok(())
    }
}

/// Callback a check uses to publish events.
///
/// Emission is synchronous: by the time [`Emitter::emit`] returns, every
/// notifier behind it has seen the event.
pub struct Emitter<'a> {
    sink: &'a mut dyn FnMut(Event),
    emitted: usize,
}

impl<'a> Emitter<'a> {
    /// Wrap a sink closure.
    pub fn new(sink: &'a mut dyn FnMut(Event)) -> Self {
        Self { sink, emitted: 0 }
    }

    /// Publish an event.
    pub fn emit(&mut self, event: Event) {
        self.emitted += 1;
        (self.sink)(event);
    }

    /// Number of events published through this emitter.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl std::fmt::Debug for Emitter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("emitted", &self.emitted)
            .finish()
    }
}
