//! Channel-based data source.
//!
//! Receives snapshots through a tokio watch channel, for embedding the
//! monitor in a process that already produces snapshots.

use tokio::sync::watch;

use sensorwatch_types::Snapshot;

use super::DataSource;

/// A data source fed by a watch channel.
///
/// Only the newest snapshot is kept; intermediate values sent between two
/// polls are skipped.
///
/// # Example
///
/// ```
/// use sensorwatch::{ChannelSource, DataSource};
/// use sensorwatch_types::Snapshot;
///
/// let (tx, mut source) = ChannelSource::create("in-process");
/// tx.send(Snapshot::builder().latest("7", 1.0).build()).unwrap();
/// assert!(source.poll().is_some());
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<Snapshot>,
    description: String,
    initial_checked: bool,
}

impl ChannelSource {
    /// Wrap a receiver. Its current value is returned by the first poll
    /// unless it is empty.
    pub fn new(receiver: watch::Receiver<Snapshot>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            initial_checked: false,
        }
    }

    /// Create a sender and a source connected to it.
    pub fn create(source_description: &str) -> (watch::Sender<Snapshot>, Self) {
        let (tx, rx) = watch::channel(Snapshot::new());
        (tx, Self::new(rx, source_description))
    }
}

impl DataSource for ChannelSource {
    fn poll(&mut self) -> Option<Snapshot> {
        if !self.initial_checked {
            self.initial_checked = true;
            if !self.receiver.borrow().is_empty() {
                self.receiver.mark_changed();
            }
        }

        if self.receiver.has_changed().unwrap_or(false) {
            Some(self.receiver.borrow_and_update().clone())
        } else {
            None
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_source_poll() {
        let (tx, mut source) = ChannelSource::create("test");
        assert_eq!(source.description(), "channel: test");

        // The empty placeholder is never delivered
        assert!(source.poll().is_none());

        tx.send(Snapshot::builder().latest("A", 3.0).build()).unwrap();
        let snapshot = source.poll().unwrap();
        assert_eq!(snapshot.latest("A"), Some(3.0));

        assert!(source.poll().is_none());
    }

    #[test]
    fn test_channel_source_keeps_only_newest() {
        let (tx, mut source) = ChannelSource::create("test");
        tx.send(Snapshot::builder().latest("A", 1.0).build()).unwrap();
        tx.send(Snapshot::builder().latest("A", 2.0).build()).unwrap();

        assert_eq!(source.poll().unwrap().latest("A"), Some(2.0));
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_channel_source_initial_value() {
        let (tx, rx) = watch::channel(Snapshot::builder().latest("B", 0.0).build());
        let mut source = ChannelSource::new(rx, "preloaded");

        assert_eq!(source.poll().unwrap().latest("B"), Some(0.0));
        drop(tx);
        assert!(source.poll().is_none());
    }
}
