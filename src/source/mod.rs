//! Snapshot sources.
//!
//! A [`DataSource`] hands the app each new [`Snapshot`] of the monitored
//! fleet, whether it is polled from a file, read off a network stream or
//! pushed in-process through a channel.

mod channel;
mod file;
mod stream;

pub use channel::ChannelSource;
pub use file::FileSource;
pub use stream::StreamSource;

use std::fmt::Debug;

use sensorwatch_types::Snapshot;

/// Trait for receiving snapshots from various sources.
///
/// # Example
///
/// ```
/// use sensorwatch::{DataSource, FileSource};
///
/// let mut source = FileSource::new("snapshot.json");
/// if let Some(snapshot) = source.poll() {
///     println!("Got {} entities", snapshot.latest_values.len());
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the latest snapshot.
    ///
    /// Returns `Some(snapshot)` if new data is available, `None` otherwise.
    /// Must not block.
    fn poll(&mut self) -> Option<Snapshot>;

    /// Human-readable description of the source.
    fn description(&self) -> &str;

    /// The error from the most recent poll, if any.
    fn error(&self) -> Option<&str>;
}
