//! Sink that writes events to the `tracing` log.

use sensorwatch_types::{Event, Severity};

use super::Notifier;
use crate::error::NotifyError;

/// Logs every event at a level matching its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn handle(&mut self, event: &Event) -> Result<(), NotifyError> {
        let kind = event.kind.as_str();
        let entity = event.meta.entity.as_str();
        let series = event.meta.series.as_deref().unwrap_or("");
        let reminder = event.meta.reminder;
        match event.severity {
            Severity::Info => {
                tracing::info!(kind, entity, series, reminder, "{}", event.message)
            }
            Severity::Warn => {
                tracing::warn!(kind, entity, series, reminder, "{}", event.message)
            }
            Severity::Error => {
                tracing::error!(kind, entity, series, reminder, "{}", event.message)
            }
        }
        Ok(())
    }
}
