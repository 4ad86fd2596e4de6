//! Alert events emitted by checks and consumed by notifiers.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};

/// Severity attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The type of an event.
///
/// Known kinds have dedicated variants; anything else a custom check emits
/// travels as [`EventKind::Other`]. The wire form is the upper-case string
/// returned by [`EventKind::as_str`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A monitored series went silent for longer than its threshold.
    DataStallSeries,
    /// A previously stalled series produced new data.
    DataResumedSeries,
    /// An entity's latest value entered the near-zero band.
    LatestZero,
    /// An entity's latest value left the near-zero band.
    LatestZeroResolved,
    /// Any other event type.
    Other(String),
}

const RESOLUTION_SUFFIXES: &[&str] = &["_RESOLVED", "_RESUMED"];

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::DataStallSeries => "DATA_STALL_SERIES",
            EventKind::DataResumedSeries => "DATA_RESUMED_SERIES",
            EventKind::LatestZero => "LATEST_ZERO",
            EventKind::LatestZeroResolved => "LATEST_ZERO_RESOLVED",
            EventKind::Other(s) => s,
        }
    }

    /// True if this kind retracts an earlier alert.
    ///
    /// Known kinds are matched directly; other kinds count as resolutions
    /// when their type ends in `_RESOLVED` or `_RESUMED`.
    pub fn is_resolution(&self) -> bool {
        match self {
            EventKind::DataResumedSeries | EventKind::LatestZeroResolved => true,
            EventKind::DataStallSeries | EventKind::LatestZero => false,
            EventKind::Other(s) => RESOLUTION_SUFFIXES.iter().any(|suffix| s.ends_with(suffix)),
        }
    }

    /// The alert kind this event belongs to.
    ///
    /// An alert and the resolution that retracts it share a family, so a
    /// `DATA_RESUMED_SERIES` maps to `DATA_STALL_SERIES`.
    pub fn alert_family(&self) -> Cow<'_, str> {
        match self {
            EventKind::DataStallSeries | EventKind::DataResumedSeries => {
                Cow::Borrowed("DATA_STALL_SERIES")
            }
            EventKind::LatestZero | EventKind::LatestZeroResolved => Cow::Borrowed("LATEST_ZERO"),
            EventKind::Other(s) => {
                for suffix in RESOLUTION_SUFFIXES {
                    if let Some(base) = s.strip_suffix(suffix) {
                        return Cow::Borrowed(base);
                    }
                }
                Cow::Borrowed(s.as_str())
            }
        }
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "DATA_STALL_SERIES" => EventKind::DataStallSeries,
            "DATA_RESUMED_SERIES" => EventKind::DataResumedSeries,
            "LATEST_ZERO" => EventKind::LatestZero,
            "LATEST_ZERO_RESOLVED" => EventKind::LatestZeroResolved,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <Cow<'de, str>>::deserialize(deserializer)?;
        Ok(EventKind::from(s.as_ref()))
    }
}

/// Structured context attached to an event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EventMeta {
    /// Entity (sensor cell) the event is about.
    pub entity: String,

    /// Series name, for per-series events.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub series: Option<String>,

    /// Reading that triggered the event.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub value: Option<f64>,

    /// Last observation timestamp as supplied in the snapshot.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub last: Option<String>,

    /// Configured staleness threshold.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub threshold_ms: Option<u64>,

    /// Age of the last observation when evaluated.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub age_ms: Option<i64>,

    /// Evaluation time.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub at: Option<DateTime<Utc>>,

    /// Set on repeat notifications for an already-reported condition.
    /// Outbound sinks may use it to suppress duplicates.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reminder: bool,
}

impl EventMeta {
    /// Metadata about an entity, with every optional field unset.
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }
}

/// A typed, severity-tagged alert record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: EventKind,
    pub severity: Severity,
    pub message: String,
    pub meta: EventMeta,
}

impl Event {
    pub fn new(
        kind: EventKind,
        severity: Severity,
        message: impl Into<String>,
        meta: EventMeta,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            meta,
        }
    }

    /// Key identifying the condition this event reports on.
    ///
    /// Derived from the alert family, entity and series, so an alert and
    /// its resolution map to the same key.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.kind.alert_family(),
            self.meta.entity,
            self.meta.series.as_deref().unwrap_or("")
        )
    }

    /// True for repeat reminders of an ongoing condition.
    pub fn is_reminder(&self) -> bool {
        self.meta.reminder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_event(kind: EventKind, entity: &str, series: &str) -> Event {
        let mut meta = EventMeta::for_entity(entity);
        meta.series = Some(series.to_string());
        Event::new(kind, Severity::Warn, "msg", meta)
    }

    #[test]
    fn test_resolution_kinds() {
        assert!(EventKind::DataResumedSeries.is_resolution());
        assert!(EventKind::LatestZeroResolved.is_resolution());
        assert!(EventKind::from("DATA_RESUMED_SERIES").is_resolution());
        assert!(EventKind::from("DATA_RESUMED").is_resolution());
        assert!(!EventKind::from("DATA_STALL_SERIES").is_resolution());
        assert!(!EventKind::DataStallSeries.is_resolution());
        assert!(!EventKind::LatestZero.is_resolution());
        assert!(!EventKind::from("DISK_FULL").is_resolution());
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            EventKind::DataStallSeries,
            EventKind::DataResumedSeries,
            EventKind::LatestZero,
            EventKind::LatestZeroResolved,
        ] {
            assert_eq!(EventKind::from(kind.as_str()), kind);
        }
        assert_eq!(
            EventKind::from("CUSTOM"),
            EventKind::Other("CUSTOM".to_string())
        );
    }

    #[test]
    fn test_alert_and_resolution_share_dedup_key() {
        let stall = series_event(EventKind::DataStallSeries, "1301", "voltage");
        let resumed = series_event(EventKind::DataResumedSeries, "1301", "voltage");
        assert_eq!(stall.dedup_key(), resumed.dedup_key());
        assert_eq!(stall.dedup_key(), "DATA_STALL_SERIES-1301-voltage");

        let other_series = series_event(EventKind::DataResumedSeries, "1301", "co2");
        assert_ne!(stall.dedup_key(), other_series.dedup_key());

        let zero = Event::new(
            EventKind::LatestZero,
            Severity::Warn,
            "zero",
            EventMeta::for_entity("7"),
        );
        let resolved = Event::new(
            EventKind::LatestZeroResolved,
            Severity::Info,
            "resolved",
            EventMeta::for_entity("7"),
        );
        assert_eq!(zero.dedup_key(), resolved.dedup_key());
    }

    #[test]
    fn test_custom_kinds_strip_resolution_suffix() {
        let down = series_event(EventKind::from("PUMP_DOWN"), "3", "flow");
        let up = series_event(EventKind::from("PUMP_DOWN_RESOLVED"), "3", "flow");
        assert_eq!(down.dedup_key(), up.dedup_key());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_event_uses_wire_names() {
        let mut meta = EventMeta::for_entity("1301");
        meta.series = Some("voltage".to_string());
        meta.reminder = true;
        let event = Event::new(EventKind::DataStallSeries, Severity::Warn, "stalled", meta);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DATA_STALL_SERIES");
        assert_eq!(json["severity"], "warn");
        assert_eq!(json["meta"]["entity"], "1301");
        assert_eq!(json["meta"]["reminder"], true);
        assert!(json["meta"].get("value").is_none());

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
