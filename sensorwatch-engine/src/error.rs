//! Error types for checks, notifiers and the tick timer.

use thiserror::Error;

/// Errors a check may report while evaluating a snapshot or tick.
///
/// The runner logs these and moves on to the next check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The snapshot could not be evaluated.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Any other evaluation failure.
    #[error("Check failed: {0}")]
    Failed(String),
}

/// Errors a notifier may report while handling an event.
///
/// The runner logs these and continues delivering to the remaining notifiers.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Writing to the sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be encoded.
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    /// A bounded channel had no free capacity.
    #[error("Channel full")]
    ChannelFull,

    /// The receiving side of a channel was dropped.
    #[error("Channel closed")]
    ChannelClosed,

    /// The sink refused the event.
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Errors starting the periodic tick timer.
#[derive(Debug, Error)]
pub enum TickError {
    /// `start_tick` was called outside a tokio runtime.
    #[error("No tokio runtime available to drive the tick timer")]
    NoRuntime,

    /// The tick period must be non-zero.
    #[error("Tick period must be greater than zero")]
    ZeroPeriod,

    /// The first firing would fall outside the representable time range.
    #[error("Tick period {0:?} is too large")]
    PeriodTooLarge(std::time::Duration),
}
