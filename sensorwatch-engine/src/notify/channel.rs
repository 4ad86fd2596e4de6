//! Sink that forwards events into a tokio channel.

use sensorwatch_types::Event;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::Notifier;
use crate::error::NotifyError;

/// Forwards events into a bounded `mpsc` channel without blocking.
///
/// A full or closed channel is reported as a delivery fault.
#[derive(Debug)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Event>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Create a notifier and the receiver its events arrive on.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sensorwatch_engine::ChannelNotifier;
    ///
    /// let (notifier, mut rx) = ChannelNotifier::channel(16);
    /// // while let Some(event) = rx.recv().await { ... }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }
}

impl Notifier for ChannelNotifier {
    fn name(&self) -> &str {
        "channel"
    }

    fn handle(&mut self, event: &Event) -> Result<(), NotifyError> {
        self.tx.try_send(event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => NotifyError::ChannelFull,
            TrySendError::Closed(_) => NotifyError::ChannelClosed,
        })
    }
}
