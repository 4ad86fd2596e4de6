//! Snapshot - a point-in-time view of the latest known sensor state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::SchemaVersion;

/// Per-series observation timestamps for one entity.
///
/// Values are ISO-8601 strings; `None` means the series has never been
/// observed for that entity.
pub type SeriesTimestamps = BTreeMap<String, Option<String>>;

/// A point-in-time snapshot of sensor state.
///
/// Snapshots are produced by whatever fetches sensor data and pushed into a
/// runner. The engine never mutates or retains them. Timestamps are expected
/// to be normalized (RFC 3339 / UTC) by the producer.
///
/// # Example
///
/// ```rust
/// use sensorwatch_types::Snapshot;
///
/// let snapshot = Snapshot::builder()
///     .latest("A", 0.2)
///     .latest("B", 3.0)
///     .build();
///
/// assert_eq!(snapshot.latest("A"), Some(0.2));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Snapshot {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: SchemaVersion,

    /// Wall-clock time this snapshot describes.
    pub now: DateTime<Utc>,

    /// Most recent scalar reading per entity.
    #[cfg_attr(feature = "serde", serde(default))]
    pub latest_values: BTreeMap<String, f64>,

    /// Most recent observation time per entity, per series.
    ///
    /// A `null` entry, for the whole map or for one entity, reads as empty.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "deserialize_last_by_series")
    )]
    pub last_by_series: BTreeMap<String, SeriesTimestamps>,
}

#[cfg(feature = "serde")]
fn deserialize_last_by_series<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, SeriesTimestamps>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let raw = Option::<BTreeMap<String, Option<SeriesTimestamps>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(entity, series)| (entity, series.unwrap_or_default()))
        .collect())
}

impl Snapshot {
    /// Create an empty snapshot taken at the current time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create an empty snapshot taken at `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            version: SchemaVersion::current(),
            now,
            latest_values: BTreeMap::new(),
            last_by_series: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// True if the snapshot carries neither values nor series timestamps.
    pub fn is_empty(&self) -> bool {
        self.latest_values.is_empty() && self.last_by_series.is_empty()
    }

    /// Latest reading for an entity.
    pub fn latest(&self, entity: &str) -> Option<f64> {
        self.latest_values.get(entity).copied()
    }

    /// Number of `(entity, series)` pairs, observed or not.
    pub fn series_count(&self) -> usize {
        self.last_by_series.values().map(|s| s.len()).sum()
    }

    /// Iterate `(entity, series, last_observed)` triples.
    pub fn observations(&self) -> impl Iterator<Item = (&str, &str, Option<&str>)> {
        self.last_by_series.iter().flat_map(|(entity, per_series)| {
            per_series
                .iter()
                .map(move |(series, last)| (entity.as_str(), series.as_str(), last.as_deref()))
        })
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug)]
pub struct SnapshotBuilder {
    now: Option<DateTime<Utc>>,
    latest_values: BTreeMap<String, f64>,
    last_by_series: BTreeMap<String, SeriesTimestamps>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            now: None,
            latest_values: BTreeMap::new(),
            last_by_series: BTreeMap::new(),
        }
    }

    /// Set the snapshot time. Defaults to the time `build()` is called.
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Record the latest reading for an entity.
    pub fn latest(mut self, entity: impl Into<String>, value: f64) -> Self {
        self.latest_values.insert(entity.into(), value);
        self
    }

    /// Record when a series was last observed for an entity.
    pub fn last_seen(
        mut self,
        entity: impl Into<String>,
        series: impl Into<String>,
        at: impl Into<String>,
    ) -> Self {
        self.last_by_series
            .entry(entity.into())
            .or_default()
            .insert(series.into(), Some(at.into()));
        self
    }

    /// Record a series that has never been observed for an entity.
    pub fn never_seen(mut self, entity: impl Into<String>, series: impl Into<String>) -> Self {
        self.last_by_series
            .entry(entity.into())
            .or_default()
            .insert(series.into(), None);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            version: SchemaVersion::current(),
            now: self.now.unwrap_or_else(Utc::now),
            latest_values: self.latest_values,
            last_by_series: self.last_by_series,
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_collects_values_and_series() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::builder()
            .now(now)
            .latest("1301", 4.2)
            .last_seen("1301", "voltage", "2024-05-01T11:55:00Z")
            .never_seen("1301", "co2")
            .last_seen("1302", "water", "2024-05-01T11:00:00Z")
            .build();

        assert_eq!(snapshot.now, now);
        assert_eq!(snapshot.latest("1301"), Some(4.2));
        assert_eq!(snapshot.latest("missing"), None);
        assert_eq!(snapshot.series_count(), 3);

        let observed: Vec<_> = snapshot.observations().collect();
        assert_eq!(
            observed,
            vec![
                ("1301", "co2", None),
                ("1301", "voltage", Some("2024-05-01T11:55:00Z")),
                ("1302", "water", Some("2024-05-01T11:00:00Z")),
            ]
        );
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.version.is_compatible());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_snapshot() {
        let json = r#"{
            "now": "2024-05-01T12:00:00Z",
            "latestValues": { "1301": 0.0, "1302": 12.5 },
            "lastBySeries": {
                "1301": { "voltage": "2024-05-01T11:40:00Z", "co2": null }
            }
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.latest_values.len(), 2);
        assert_eq!(snapshot.series_count(), 2);
        assert_eq!(snapshot.version, SchemaVersion::current());

        let series = snapshot.last_by_series.get("1301").unwrap();
        assert_eq!(series.get("co2"), Some(&None));
        assert_eq!(
            series.get("voltage"),
            Some(&Some("2024-05-01T11:40:00Z".to_string()))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_snapshot_with_missing_collections() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"now":"2024-05-01T12:00:00Z"}"#).unwrap();
        assert!(snapshot.is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_snapshot_with_null_entity() {
        let json = r#"{
            "now": "2024-05-01T12:00:00Z",
            "lastBySeries": {
                "1301": null,
                "1302": { "voltage": "2024-05-01T11:00:00Z" }
            }
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.last_by_series.get("1301"), Some(&SeriesTimestamps::new()));
        assert_eq!(snapshot.series_count(), 1);
        assert_eq!(
            snapshot.observations().collect::<Vec<_>>(),
            vec![("1302", "voltage", Some("2024-05-01T11:00:00Z"))]
        );

        let snapshot: Snapshot =
            serde_json::from_str(r#"{"now":"2024-05-01T12:00:00Z","lastBySeries":null}"#).unwrap();
        assert!(snapshot.last_by_series.is_empty());
    }
}
