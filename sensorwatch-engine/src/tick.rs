//! Periodic tick timer backed by a tokio task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::TickError;
use crate::runner::Shared;

/// Handle to a running tick timer.
///
/// The timer stops when the handle is stopped or dropped.
#[derive(Debug)]
pub struct TickHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    period: Duration,
}

impl TickHandle {
    pub(crate) fn spawn(shared: Arc<Shared>, period: Duration) -> Result<Self, TickError> {
        if period.is_zero() {
            return Err(TickError::ZeroPeriod);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TickError::NoRuntime)?;
        let first = Instant::now()
            .checked_add(period)
            .ok_or(TickError::PeriodTooLarge(period))?;
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = runtime.spawn(async move {
            let mut timer = time::interval_at(first, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = timer.tick() => shared.dispatch_tick(Utc::now()),
                }
            }
        });

        Ok(Self {
            stop_tx,
            task,
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer. A dispatch already in progress runs to completion.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        self.task.abort();
    }
}
