//! # sensorwatch
//!
//! Watches a feed of sensor snapshots and raises alerts when a series goes
//! quiet for too long or an entity's latest reading sits at zero.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌─────────┐    ┌──────────────────┐    ┌─────────────────┐  │
//! │  │ source  │───▶│      Runner      │───▶│    notifiers    │  │
//! │  │ (input) │    │ stall │ zero │.. │    │ banner│log│jsonl│  │
//! │  └─────────┘    └────────▲─────────┘    └─────────────────┘  │
//! │       ▲                  │ tick                              │
//! │       │           ┌──────┴─────┐                             │
//! │  File | Stream    │ tokio timer│                             │
//! │     | Channel     └────────────┘                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`DataSource`] trait with file, stream and channel
//!   implementations
//! - **[`app`]**: [`App`] ties a source to a [`Runner`](sensorwatch_engine::Runner)
//! - **[`config`]**: [`Settings`] from TOML, environment and defaults
//! - **[`ui`]**: [`TerminalBanner`], the crossterm rendering of active alerts
//!
//! The checks, notifiers and runner live in `sensorwatch-engine`; the
//! snapshot and event types in `sensorwatch-types`.
//!
//! ## Usage
//!
//! ```bash
//! # Watch a snapshot file, re-read whenever it changes
//! sensorwatch --file snapshot.json
//!
//! # Read newline-delimited snapshots from a TCP endpoint
//! sensorwatch --connect localhost:9090 --config sensorwatch.toml
//!
//! # Evaluate one snapshot and print the events as JSON lines
//! sensorwatch --file snapshot.json --once
//! ```
//!
//! ### As a library with a channel source
//!
//! ```
//! use sensorwatch::{App, ChannelSource, Settings};
//! use sensorwatch_types::Snapshot;
//!
//! let mut settings = Settings::default();
//! settings.notify.banner = false;
//!
//! let (tx, source) = ChannelSource::create("in-process");
//! let mut app = App::from_settings(Box::new(source), &settings).unwrap();
//!
//! tx.send(Snapshot::builder().latest("1301", 0.0).build()).unwrap();
//! assert_eq!(app.poll(), 1);
//! assert_eq!(app.runner().stats().events_emitted, 1);
//! ```

pub mod app;
pub mod config;
pub mod source;
pub mod ui;

pub use app::App;
pub use config::{parse_duration, Settings};
pub use source::{ChannelSource, DataSource, FileSource, StreamSource};
pub use ui::TerminalBanner;
