//! Application state: a snapshot source wired into a check runner.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use sensorwatch_engine::{BannerNotifier, JsonLinesNotifier, LogNotifier, Notifier, Runner};

use crate::config::Settings;
use crate::source::DataSource;
use crate::ui::TerminalBanner;

/// Main application state.
pub struct App {
    pub running: bool,

    source: Box<dyn DataSource>,
    runner: Runner,
    pub load_error: Option<String>,

    /// `now` of the most recent snapshot pushed into the runner.
    pub last_snapshot_at: Option<DateTime<Utc>>,
    snapshots_received: u64,
}

impl App {
    pub fn new(source: Box<dyn DataSource>, runner: Runner) -> Self {
        Self {
            running: true,
            source,
            runner,
            load_error: None,
            last_snapshot_at: None,
            snapshots_received: 0,
        }
    }

    /// Create an app whose runner is configured from `settings`.
    pub fn from_settings(source: Box<dyn DataSource>, settings: &Settings) -> Result<Self> {
        Ok(Self::new(source, build_runner(settings)?))
    }

    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn snapshots_received(&self) -> u64 {
        self.snapshots_received
    }

    /// Drain the source, pushing every new snapshot into the runner.
    ///
    /// Returns the number of snapshots pushed.
    pub fn poll(&mut self) -> usize {
        let mut pushed = 0;
        while let Some(snapshot) = self.source.poll() {
            self.runner.push_snapshot(&snapshot);
            self.last_snapshot_at = Some(snapshot.now);
            pushed += 1;
        }
        self.snapshots_received += pushed as u64;

        let error = self.source.error().map(str::to_string);
        if error != self.load_error {
            match &error {
                Some(e) => tracing::warn!(source = self.source.description(), error = %e, "source error"),
                None => tracing::info!(source = self.source.description(), "source recovered"),
            }
            self.load_error = error;
        }

        pushed
    }

    pub fn quit(&mut self) {
        self.running = false;
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("running", &self.running)
            .field("source", &self.source)
            .field("runner", &self.runner)
            .field("load_error", &self.load_error)
            .field("snapshots_received", &self.snapshots_received)
            .finish()
    }
}

/// Notifiers enabled by `settings`, in dispatch order.
pub fn notifiers(settings: &Settings) -> Result<Vec<Box<dyn Notifier>>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if settings.notify.log {
        notifiers.push(Box::new(LogNotifier::new()));
    }
    if settings.notify.banner {
        notifiers.push(Box::new(BannerNotifier::new(TerminalBanner::stdout())));
    }
    if let Some(path) = &settings.notify.jsonl {
        let sink = JsonLinesNotifier::append(path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?
            .skip_reminders(settings.notify.skip_reminders);
        notifiers.push(Box::new(sink));
    }

    Ok(notifiers)
}

/// Build a runner with the stall and zero checks plus configured notifiers.
pub fn build_runner(settings: &Settings) -> Result<Runner> {
    let runner = Runner::builder()
        .check(settings.stall_check())
        .check(settings.zero_check())
        .build();
    runner.set_notifiers(notifiers(settings)?);

    tracing::info!(
        checks = ?runner.check_names(),
        notifiers = ?runner.notifier_names(),
        "runner configured"
    );
    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ChannelSource;
    use sensorwatch_engine::{MemoryTarget, ZeroCheck};
    use sensorwatch_types::Snapshot;

    fn quiet_settings() -> Settings {
        let mut settings = Settings::default();
        settings.notify.banner = false;
        settings.notify.log = false;
        settings
    }

    #[test]
    fn test_poll_pushes_snapshots_into_runner() {
        let banner = MemoryTarget::new();
        let runner = Runner::builder()
            .check(ZeroCheck::new(0.0))
            .notifier(BannerNotifier::new(banner.clone()))
            .build();
        let (tx, source) = ChannelSource::create("test");
        let mut app = App::new(Box::new(source), runner);

        assert_eq!(app.poll(), 0);

        tx.send(Snapshot::builder().latest("1301", 0.0).build()).unwrap();
        assert_eq!(app.poll(), 1);
        assert_eq!(banner.current(), vec!["Entity 1301 latest value = 0".to_string()]);

        tx.send(Snapshot::builder().latest("1301", 4.2).build()).unwrap();
        assert_eq!(app.poll(), 1);
        assert!(banner.current().is_empty());

        assert_eq!(app.snapshots_received(), 2);
        assert_eq!(app.runner().stats().snapshots, 2);
        assert!(app.last_snapshot_at.is_some());
    }

    #[test]
    fn test_poll_records_source_error() {
        let source = crate::source::FileSource::new("/nonexistent/snapshot.json");
        let mut app = App::from_settings(Box::new(source), &quiet_settings()).unwrap();

        assert_eq!(app.poll(), 0);
        assert!(app.load_error.as_deref().unwrap().contains("Read error"));
        assert_eq!(app.source_description(), "file: /nonexistent/snapshot.json");
    }

    #[test]
    fn test_build_runner_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = quiet_settings();
        settings.notify.log = true;
        settings.notify.jsonl = Some(dir.path().join("events.jsonl"));

        let runner = build_runner(&settings).unwrap();
        assert_eq!(runner.check_names(), vec!["series-stall", "latest-zero"]);
        assert_eq!(runner.notifier_names(), vec!["log", "jsonl"]);

        runner.push_snapshot(&Snapshot::builder().latest("9", 0.0).build());
        let written = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        assert!(written.contains("\"type\":\"LATEST_ZERO\""));
    }

    #[test]
    fn test_unwritable_event_log_is_an_error() {
        let mut settings = quiet_settings();
        settings.notify.jsonl = Some("/nonexistent/dir/events.jsonl".into());
        assert!(build_runner(&settings).is_err());
    }
}
