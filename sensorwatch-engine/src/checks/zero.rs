//! Near-zero value detection.

use std::collections::HashSet;

use sensorwatch_types::{Event, EventKind, EventMeta, Severity, Snapshot};

use crate::{Check, CheckError, Emitter};

/// Flags entities whose latest value sits inside `[-epsilon, epsilon]`.
///
/// Edge-triggered only: one `LATEST_ZERO` when an entity enters the band and
/// one `LATEST_ZERO_RESOLVED` when it leaves. Unlike [`StallCheck`](crate::StallCheck)
/// there are no reminders while the value stays at zero.
#[derive(Debug, Clone, Default)]
pub struct ZeroCheck {
    epsilon: f64,
    at_zero: HashSet<String>,
}

impl ZeroCheck {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            at_zero: HashSet::new(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// True if `entity` is currently reported as zero.
    pub fn is_zero(&self, entity: &str) -> bool {
        self.at_zero.contains(entity)
    }
}

impl Check for ZeroCheck {
    fn name(&self) -> &str {
        "latest-zero"
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot, emit: &mut Emitter<'_>) -> Result<(), CheckError> {
        for (entity, &value) in &snapshot.latest_values {
            let is_zero = value.abs() <= self.epsilon;
            let was_zero = self.at_zero.contains(entity);

            let meta = || EventMeta {
                value: Some(value),
                at: Some(snapshot.now),
                ..EventMeta::for_entity(entity.as_str())
            };

            if is_zero && !was_zero {
                self.at_zero.insert(entity.clone());
                tracing::warn!(entity = %entity, value, "latest value is zero");
                emit.emit(Event::new(
                    EventKind::LatestZero,
                    Severity::Warn,
                    format!("Entity {} latest value = 0", entity),
                    meta(),
                ));
            } else if !is_zero && was_zero {
                self.at_zero.remove(entity);
                emit.emit(Event::new(
                    EventKind::LatestZeroResolved,
                    Severity::Info,
                    format!("Zero resolved (entity {})", entity),
                    meta(),
                ));
            }
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), CheckError> {
        self.at_zero.clear();
        Ok(())
    }
}
