//! Runtime settings: TOML file, environment overrides and built-in defaults.
//!
//! Values are layered lowest to highest:
//!
//! 1. built-in defaults
//! 2. the TOML file passed with `--config` (optional)
//! 3. `SENSORWATCH_*` environment variables, with `__` separating nested keys
//!    (`SENSORWATCH_STALL__COOLDOWN=45m`, `SENSORWATCH_ZERO__EPSILON=0.5`)
//!
//! CLI flags are applied on top by the binary.
//!
//! ```toml
//! tick_interval = "60s"
//! poll_interval = "1s"
//!
//! [stall]
//! cooldown = "30m"
//!
//! [stall.thresholds]
//! voltage = "10m"
//! water = "0s"      # disables the built-in water threshold
//!
//! [zero]
//! epsilon = 0.0
//!
//! [notify]
//! banner = true
//! log = true
//! jsonl = "events.jsonl"
//! skip_reminders = false
//! ```

pub mod duration;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use sensorwatch_engine::checks::{DEFAULT_COOLDOWN, DEFAULT_SERIES, DEFAULT_THRESHOLD};
use sensorwatch_engine::{StallCheck, ZeroCheck};

pub use duration::{format_duration, parse_duration};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "SENSORWATCH";

/// Fully resolved settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Period of the stall re-evaluation timer.
    #[serde(deserialize_with = "duration::serde_str::deserialize")]
    pub tick_interval: Duration,

    /// How often the snapshot source is polled.
    #[serde(deserialize_with = "duration::serde_str::deserialize")]
    pub poll_interval: Duration,

    pub stall: StallSettings,
    pub zero: ZeroSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StallSettings {
    #[serde(deserialize_with = "duration::serde_str::deserialize")]
    pub cooldown: Duration,

    /// Per-series stall thresholds. A zero threshold disables the series.
    #[serde(default, deserialize_with = "duration::serde_str::deserialize_map")]
    pub thresholds: BTreeMap<String, Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZeroSettings {
    pub epsilon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifySettings {
    /// Show active alerts in the terminal banner.
    pub banner: bool,
    /// Log every event through tracing.
    pub log: bool,
    /// Append events as JSON lines to this file.
    #[serde(default)]
    pub jsonl: Option<PathBuf>,
    /// Keep cooldown reminders out of the JSON lines file.
    pub skip_reminders: bool,
}

impl Settings {
    /// Load settings from defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("tick_interval", "60s")?
            .set_default("poll_interval", "1s")?
            .set_default("stall.cooldown", format_duration(DEFAULT_COOLDOWN))?
            .set_default("zero.epsilon", 0.0)?
            .set_default("notify.banner", true)?
            .set_default("notify.log", true)?
            .set_default("notify.skip_reminders", false)?;

        for series in DEFAULT_SERIES {
            builder = builder.set_default(
                format!("stall.thresholds.{}", series),
                format_duration(DEFAULT_THRESHOLD),
            )?;
        }

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("Invalid configuration")?;

        tracing::debug!(?settings, "configuration loaded");
        Ok(settings)
    }

    /// Reject settings the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            bail!("tick_interval must be greater than zero");
        }
        if self.poll_interval.is_zero() {
            bail!("poll_interval must be greater than zero");
        }
        if !self.zero.epsilon.is_finite() || self.zero.epsilon < 0.0 {
            bail!("zero.epsilon must be a non-negative number");
        }
        Ok(())
    }

    /// Build the series stall check described by these settings.
    pub fn stall_check(&self) -> StallCheck {
        StallCheck::builder()
            .thresholds(self.stall.thresholds.clone())
            .cooldown(self.stall.cooldown)
            .build()
    }

    /// Build the latest-zero check described by these settings.
    pub fn zero_check(&self) -> ZeroCheck {
        ZeroCheck::new(self.zero.epsilon)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            stall: StallSettings {
                cooldown: DEFAULT_COOLDOWN,
                thresholds: DEFAULT_SERIES
                    .iter()
                    .map(|s| (s.to_string(), DEFAULT_THRESHOLD))
                    .collect(),
            },
            zero: ZeroSettings { epsilon: 0.0 },
            notify: NotifySettings {
                banner: true,
                log: true,
                jsonl: None,
                skip_reminders: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        let defaults = Settings::default();

        assert_eq!(settings.tick_interval, defaults.tick_interval);
        assert_eq!(settings.poll_interval, defaults.poll_interval);
        assert_eq!(settings.stall.cooldown, Duration::from_secs(1800));
        assert_eq!(settings.stall.thresholds, defaults.stall.thresholds);
        assert_eq!(settings.zero.epsilon, 0.0);
        assert!(settings.notify.banner);
        assert!(settings.notify.jsonl.is_none());
    }

    #[test]
    fn test_file_merges_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
tick_interval = "15s"

[stall]
cooldown = "45m"

[stall.thresholds]
voltage = "5m"
water = "0s"
pressure = "2h"

[zero]
epsilon = 0.25

[notify]
banner = false
jsonl = "events.jsonl"
skip_reminders = true
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.tick_interval, Duration::from_secs(15));
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.stall.cooldown, Duration::from_secs(2700));

        let thresholds = &settings.stall.thresholds;
        assert_eq!(thresholds["voltage"], Duration::from_secs(300));
        assert_eq!(thresholds["water"], Duration::ZERO);
        assert_eq!(thresholds["pressure"], Duration::from_secs(7200));
        assert_eq!(thresholds["co2"], Duration::from_secs(600));

        assert_eq!(settings.zero.epsilon, 0.25);
        assert!(!settings.notify.banner);
        assert!(settings.notify.log);
        assert_eq!(settings.notify.jsonl, Some(PathBuf::from("events.jsonl")));
        assert!(settings.notify.skip_reminders);

        let check = settings.stall_check();
        assert_eq!(check.threshold("voltage"), Some(Duration::from_secs(300)));
        assert_eq!(settings.zero_check().epsilon(), 0.25);
    }

    #[test]
    fn test_bad_duration_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "tick_interval = \"soon\"").unwrap();

        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid configuration"));
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.poll_interval = Duration::ZERO;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.zero.epsilon = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/sensorwatch.toml"))).is_err());
    }
}
