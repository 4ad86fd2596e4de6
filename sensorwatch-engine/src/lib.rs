//! # sensorwatch-engine
//!
//! Condition monitoring and alert dispatch for sensor snapshot feeds.
//!
//! A [`Runner`] holds an ordered set of [`Check`]s and [`Notifier`]s. Each
//! snapshot pushed into the runner is handed to every check; checks compare it
//! against their own state and emit [`Event`]s, which the runner fans out to
//! every notifier. A periodic tick lets checks react to the passage of time
//! even when no new data arrives.
//!
//! ## Quick Start
//!
//! ```rust
//! use sensorwatch_engine::{BannerNotifier, MemoryTarget, Runner, StallCheck, ZeroCheck};
//! use sensorwatch_types::Snapshot;
//! use std::time::Duration;
//!
//! let banner = MemoryTarget::new();
//! let runner = Runner::builder()
//!     .check(ZeroCheck::new(0.5))
//!     .check(
//!         StallCheck::builder()
//!             .threshold("voltage", Duration::from_secs(600))
//!             .cooldown(Duration::from_secs(1800))
//!             .build(),
//!     )
//!     .notifier(BannerNotifier::new(banner.clone()))
//!     .build();
//!
//! runner.push_snapshot(&Snapshot::builder().latest("1301", 0.0).build());
//! assert_eq!(banner.current(), vec!["Entity 1301 latest value = 0".to_string()]);
//! ```
//!
//! ## Isolation
//!
//! A check or notifier that returns an error or panics is logged and skipped;
//! the remaining checks and notifiers still run.
//!
//! ## Features
//!
//! - `tokio` (default): [`Runner::start_tick`] drives ticks from a tokio timer

mod check;
pub mod checks;
mod error;
pub mod notify;
mod runner;

#[cfg(feature = "tokio")]
mod tick;

pub use check::{Check, Emitter};
pub use checks::{StallCheck, StallCheckBuilder, ZeroCheck};
pub use error::{CheckError, NotifyError, TickError};
pub use notify::{
    BannerNotifier, BannerTarget, JsonLinesNotifier, LogNotifier, MemoryTarget, Notifier,
};
pub use runner::{Runner, RunnerBuilder, RunnerStats};

#[cfg(feature = "tokio")]
pub use notify::ChannelNotifier;
#[cfg(feature = "tokio")]
pub use tick::TickHandle;

// Re-export types for convenience
pub use sensorwatch_types::{Event, EventKind, EventMeta, Severity, Snapshot};
