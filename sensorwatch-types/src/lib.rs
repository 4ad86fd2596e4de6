//! # sensorwatch-types
//!
//! Core types for sensor condition monitoring. This crate defines the data
//! that flows through a sensorwatch engine: the [`Snapshot`] pushed in by a
//! data-fetching collaborator, and the [`Event`] a check emits towards
//! notification sinks.
//!
//! ## Features
//!
//! - `serde`: JSON (and other serde formats) serialization for snapshots and events
//!
//! ## Example
//!
//! ```rust
//! use sensorwatch_types::Snapshot;
//!
//! let snapshot = Snapshot::builder()
//!     .latest("1301", 0.0)
//!     .last_seen("1301", "voltage", "2024-05-01T12:00:00Z")
//!     .never_seen("1301", "co2")
//!     .build();
//!
//! assert_eq!(snapshot.latest_values.len(), 1);
//! assert_eq!(snapshot.series_count(), 2);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! snapshots to allow consumers to handle format evolution gracefully.

mod event;
mod snapshot;
mod version;

pub use event::*;
pub use snapshot::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const SCHEMA_VERSION: u32 = 1;
