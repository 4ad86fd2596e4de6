//! Per-series staleness detection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use sensorwatch_types::{Event, EventKind, EventMeta, SeriesTimestamps, Severity, Snapshot};

use crate::{Check, CheckError, Emitter};

/// Series monitored by [`StallCheck::default`].
pub const DEFAULT_SERIES: &[&str] = &["co2", "voltage", "water", "temperature", "humidity"];

/// Staleness threshold applied to each default series.
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Spacing between "still stalled" reminders.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    entity: String,
    series: String,
}

#[derive(Debug, Clone, Copy)]
struct Threshold {
    delta: TimeDelta,
    millis: u64,
}

impl Threshold {
    fn new(d: Duration) -> Self {
        Self {
            delta: to_delta(d),
            millis: u64::try_from(d.as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn whole_minutes(&self) -> u64 {
        self.millis / 60_000
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

/// Detects series that have produced no data for at least their threshold.
///
/// Series without a configured threshold are ignored. A series that has never
/// been observed (`None` timestamp) is skipped rather than treated as stalled.
///
/// Transitions per `(entity, series)`:
///
/// - fresh → stalled: `DATA_STALL_SERIES` (warn)
/// - stalled → stalled: a reminder `DATA_STALL_SERIES` with `meta.reminder`
///   once `cooldown` has elapsed since the previous alert, otherwise nothing
/// - stalled → fresh: `DATA_RESUMED_SERIES` (info)
///
/// The `last_by_series` map of the most recent snapshot is remembered, so
/// ticks re-evaluate it against the tick's clock.
#[derive(Debug, Clone)]
pub struct StallCheck {
    thresholds: BTreeMap<String, Threshold>,
    cooldown: TimeDelta,
    tracker: StallTracker,
    observed: BTreeMap<String, SeriesTimestamps>,
}

#[derive(Debug, Clone, Default)]
struct StallTracker {
    stalled: HashSet<SeriesKey>,
    last_alert_at: HashMap<SeriesKey, DateTime<Utc>>,
}

impl StallCheck {
    pub fn builder() -> StallCheckBuilder {
        StallCheckBuilder::new()
    }

    /// True if `(entity, series)` is currently reported as stalled.
    pub fn is_stalled(&self, entity: &str, series: &str) -> bool {
        self.tracker.stalled.contains(&SeriesKey {
            entity: entity.to_string(),
            series: series.to_string(),
        })
    }

    /// Number of `(entity, series)` pairs currently stalled.
    pub fn stalled_count(&self) -> usize {
        self.tracker.stalled.len()
    }

    /// Threshold for a series, if it is monitored.
    pub fn threshold(&self, series: &str) -> Option<Duration> {
        self.thresholds
            .get(series)
            .map(|t| Duration::from_millis(t.millis))
    }

    fn evaluate(&mut self, now: DateTime<Utc>, emit: &mut Emitter<'_>) {
        let Self {
            thresholds,
            cooldown,
            tracker,
            observed,
        } = self;

        for (entity, per_series) in observed.iter() {
            for (series, last) in per_series {
                let Some(threshold) = thresholds.get(series) else {
                    continue;
                };
                // A zero threshold disables the series.
                if threshold.millis == 0 {
                    continue;
                }
                let Some(iso) = last.as_deref() else {
                    continue;
                };
                let Some(last_at) = parse_timestamp(iso) else {
                    tracing::debug!(entity = %entity, series = %series, value = iso, "unparseable timestamp, skipping");
                    continue;
                };

                let key = SeriesKey {
                    entity: entity.clone(),
                    series: series.clone(),
                };
                let age = now - last_at;
                let stall = Stall {
                    key: &key,
                    last: iso,
                    threshold: *threshold,
                    age,
                    now,
                };
                tracker.observe(stall, age >= threshold.delta, *cooldown, emit);
            }
        }
    }
}

struct Stall<'a> {
    key: &'a SeriesKey,
    last: &'a str,
    threshold: Threshold,
    age: TimeDelta,
    now: DateTime<Utc>,
}

impl Stall<'_> {
    fn meta(&self, reminder: bool) -> EventMeta {
        EventMeta {
            series: Some(self.key.series.clone()),
            last: Some(self.last.to_string()),
            threshold_ms: Some(self.threshold.millis),
            age_ms: Some(self.age.num_milliseconds()),
            at: Some(self.now),
            reminder,
            ..EventMeta::for_entity(self.key.entity.as_str())
        }
    }
}

impl StallTracker {
    fn observe(&mut self, s: Stall<'_>, is_stalled: bool, cooldown: TimeDelta, emit: &mut Emitter<'_>) {
        let was_stalled = self.stalled.contains(s.key);
        let SeriesKey { entity, series } = s.key;
        let minutes = s.threshold.whole_minutes();

        match (was_stalled, is_stalled) {
            (false, true) => {
                self.stalled.insert(s.key.clone());
                tracing::warn!(entity = %entity, series = %series, age_ms = s.age.num_milliseconds(), "series stalled");
                emit.emit(Event::new(
                    EventKind::DataStallSeries,
                    Severity::Warn,
                    format!("No {} data for ≥ {} min (entity {})", series, minutes, entity),
                    s.meta(false),
                ));
                self.last_alert_at.insert(s.key.clone(), s.now);
            }
            (true, true) => {
                let due = self
                    .last_alert_at
                    .get(s.key)
                    .map_or(true, |last| s.now - *last >= cooldown);
                if due {
                    emit.emit(Event::new(
                        EventKind::DataStallSeries,
                        Severity::Warn,
                        format!("Still no {} data for ≥ {} min (entity {})", series, minutes, entity),
                        s.meta(true),
                    ));
                    self.last_alert_at.insert(s.key.clone(), s.now);
                }
            }
            (true, false) => {
                self.stalled.remove(s.key);
                self.last_alert_at.remove(s.key);
                tracing::info!(entity = %entity, series = %series, "series resumed");
                let mut meta = s.meta(false);
                meta.age_ms = None;
                emit.emit(Event::new(
                    EventKind::DataResumedSeries,
                    Severity::Info,
                    format!("{} data resumed (entity {})", series, entity),
                    meta,
                ));
            }
            (false, false) => {}
        }
    }

    fn clear(&mut self) {
        self.stalled.clear();
        self.last_alert_at.clear();
    }
}

/// ISO 8601 layouts with an explicit offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Layouts without an offset, read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO 8601 timestamp; one without an offset is taken as UTC and a
/// bare date as midnight UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Some(t) = OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(s, f).ok())
    {
        return Some(t.with_timezone(&Utc));
    }

    let naive = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    if let Some(t) = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(naive, f).ok())
    {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

impl Default for StallCheck {
    fn default() -> Self {
        DEFAULT_SERIES
            .iter()
            .fold(StallCheck::builder(), |b, series| {
                b.threshold(*series, DEFAULT_THRESHOLD)
            })
            .build()
    }
}

impl Check for StallCheck {
    fn name(&self) -> &str {
        "series-stall"
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot, emit: &mut Emitter<'_>) -> Result<(), CheckError> {
        self.observed = snapshot.last_by_series.clone();
        self.evaluate(snapshot.now, emit);
        Ok(())
    }

    fn on_tick(&mut self, now: DateTime<Utc>, emit: &mut Emitter<'_>) -> Result<(), CheckError> {
        self.evaluate(now, emit);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), CheckError> {
        self.tracker.clear();
        self.observed.clear();
        Ok(())
    }
}

/// Builder for [`StallCheck`].
#[derive(Debug, Clone)]
pub struct StallCheckBuilder {
    thresholds: BTreeMap<String, Duration>,
    cooldown: Duration,
}

impl StallCheckBuilder {
    /// A builder with no monitored series and the default 30 minute cooldown.
    pub fn new() -> Self {
        Self {
            thresholds: BTreeMap::new(),
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    /// Monitor `series`, alerting once it has been silent for `after`.
    pub fn threshold(mut self, series: impl Into<String>, after: Duration) -> Self {
        self.thresholds.insert(series.into(), after);
        self
    }

    /// Add several thresholds at once.
    pub fn thresholds<I, S>(mut self, thresholds: I) -> Self
    where
        I: IntoIterator<Item = (S, Duration)>,
        S: Into<String>,
    {
        self.thresholds
            .extend(thresholds.into_iter().map(|(s, d)| (s.into(), d)));
        self
    }

    /// Minimum spacing between reminders for the same stalled series.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn build(self) -> StallCheck {
        StallCheck {
            thresholds: self
                .thresholds
                .into_iter()
                .map(|(series, d)| (series, Threshold::new(d)))
                .collect(),
            cooldown: to_delta(self.cooldown),
            tracker: StallTracker::default(),
            observed: BTreeMap::new(),
        }
    }
}

impl Default for StallCheckBuilder {
    fn default() -> Self {
        Self::new()
    }
}
