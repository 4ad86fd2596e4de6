//! Notification sinks.
//!
//! A [`Notifier`] consumes events emitted by checks. Built-in sinks:
//!
//! - [`BannerNotifier`]: keeps one message per active condition and re-renders
//!   them to a [`BannerTarget`] after every event
//! - [`LogNotifier`]: writes every event to the `tracing` log
//! - [`JsonLinesNotifier`]: appends events as newline-delimited JSON
//! - [`ChannelNotifier`]: forwards events into a tokio channel

mod banner;
#[cfg(feature = "tokio")]
mod channel;
mod jsonl;
mod log;

pub use banner::{BannerNotifier, BannerTarget, MemoryTarget};
#[cfg(feature = "tokio")]
pub use channel::ChannelNotifier;
pub use jsonl::JsonLinesNotifier;
pub use log::LogNotifier;

use sensorwatch_types::Event;

use crate::error::NotifyError;

/// A sink for emitted events.
///
/// `handle` is the only mutation entry point. Errors are logged by the runner
/// and never stop delivery to other notifiers.
pub trait Notifier: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Consume one event.
    fn handle(&mut self, event: &Event) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn handle(&mut self, event: &Event) -> Result<(), NotifyError> {
        (**self).handle(event)
    }
}
