//! # Configuration Management
//!
//! Loads the calendar settings from `calendar-config.toml`: the station, the
//! year and sampling choices, and optionally the station's tide table.
//!
//! ```toml
//! [station]
//! name = "Santa Cruz, CA"
//! latitude = 36.9577
//! longitude = -122.0402
//! elevation = 0.0
//! timezone = "America/Los_Angeles"
//!
//! [calendar]
//! year = 2016
//! altitude_step_minutes = 10
//! tide_resolution = 20
//! phase_icon_count = 28
//! moon_sample_hour = 22
//!
//! [[tides.extrema]]
//! time = "2016-01-01T04:35:00"   # station local time, quoted
//! height = 5.1
//! ```
//!
//! Everything under `[calendar]` except `year` has a default, and the
//! `[tides]` table may be left out entirely.

use crate::astro::{AstroSettings, Location};
use crate::lunar::{DEFAULT_PHASE_IDS, DEFAULT_SAMPLE_HOUR};
use crate::tide_data::DEFAULT_TIDE_RESOLUTION;
use crate::year_bounds::parse_timezone;
use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "calendar-config.toml";

/// Application configuration loaded from calendar-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Where the calendar is for
    pub station: StationConfig,
    /// Which year and how densely to sample it
    pub calendar: CalendarConfig,
    /// Tide highs and lows, if any
    #[serde(default)]
    pub tides: TidesConfig,
}

/// Tide station and observing location
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StationConfig {
    /// Human-readable station name
    pub name: String,
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Meters above sea level
    #[serde(default)]
    pub elevation: f64,
    /// IANA timezone of the station (e.g. "America/Los_Angeles")
    pub timezone: String,
}

/// Calendar year and sampling settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CalendarConfig {
    pub year: i32,
    /// Minutes between Sun and Moon altitude samples
    #[serde(default = "default_altitude_step")]
    pub altitude_step_minutes: u32,
    /// Points per tide high/low pair, both ends included
    #[serde(default = "default_tide_resolution")]
    pub tide_resolution: usize,
    /// Number of moon phase icons
    #[serde(default = "default_phase_icon_count")]
    pub phase_icon_count: usize,
    /// Local hour at which the Moon is sampled each day
    #[serde(default = "default_moon_sample_hour")]
    pub moon_sample_hour: u32,
}

/// Tide table, in station local time
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TidesConfig {
    #[serde(default)]
    pub extrema: Vec<ExtremumConfig>,
}

/// One tide high or low
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ExtremumConfig {
    /// Local wall-clock time, "YYYY-MM-DDTHH:MM:SS"
    pub time: NaiveDateTime,
    pub height: f64,
}

fn default_altitude_step() -> u32 {
    10
}

fn default_tide_resolution() -> usize {
    DEFAULT_TIDE_RESOLUTION
}

fn default_phase_icon_count() -> usize {
    DEFAULT_PHASE_IDS
}

fn default_moon_sample_hour() -> u32 {
    DEFAULT_SAMPLE_HOUR
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                name: "Santa Cruz, CA".to_string(),
                latitude: 36.9577,
                longitude: -122.0402,
                elevation: 0.0,
                timezone: "America/Los_Angeles".to_string(),
            },
            calendar: CalendarConfig {
                year: 2016,
                altitude_step_minutes: default_altitude_step(),
                tide_resolution: default_tide_resolution(),
                phase_icon_count: default_phase_icon_count(),
                moon_sample_hour: default_moon_sample_hour(),
            },
            tides: TidesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!(
                        path = %path.display(),
                        station = %config.station.name,
                        "loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "invalid config file format, using default configuration (Santa Cruz, CA)"
                    );
                    Self::default()
                }
            },
            Err(_) => {
                tracing::warn!(
                    path = %path.display(),
                    "no config file found, using default configuration (Santa Cruz, CA)"
                );
                Self::default()
            }
        }
    }

    /// Write this configuration as TOML, replacing whatever is at `path`.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self).context("serializing configuration")?;
        fs::write(path, contents)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        tracing::info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Reject settings the calendar cannot be computed with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let station = &self.station;
        let calendar = &self.calendar;

        if !(-90.0..=90.0).contains(&station.latitude) {
            bail!("latitude {} is outside -90..=90", station.latitude);
        }
        if !(-180.0..=180.0).contains(&station.longitude) {
            bail!("longitude {} is outside -180..=180", station.longitude);
        }
        parse_timezone(&station.timezone)
            .with_context(|| format!("station {:?}", station.name))?;

        if calendar.altitude_step_minutes == 0 {
            bail!("altitude_step_minutes must be at least 1");
        }
        if calendar.tide_resolution <= 2 {
            bail!(
                "tide_resolution must be greater than 2, got {}",
                calendar.tide_resolution
            );
        }
        if calendar.phase_icon_count < 4 {
            bail!(
                "phase_icon_count must be at least 4, got {}",
                calendar.phase_icon_count
            );
        }
        if calendar.moon_sample_hour > 23 {
            bail!(
                "moon_sample_hour must be 0..=23, got {}",
                calendar.moon_sample_hour
            );
        }
        Ok(())
    }

    pub fn location(&self) -> Location {
        Location {
            name: Some(self.station.name.clone()),
            latitude: self.station.latitude,
            longitude: self.station.longitude,
            elevation: self.station.elevation,
            timezone: self.station.timezone.clone(),
        }
    }

    pub fn astro_settings(&self) -> AstroSettings {
        AstroSettings {
            altitude_step_minutes: self.calendar.altitude_step_minutes,
            phase_ids: self.calendar.phase_icon_count,
            moon_sample_hour: self.calendar.moon_sample_hour,
        }
    }

    /// Tide extrema as (local time, height) pairs.
    pub fn local_extrema(&self) -> Vec<(NaiveDateTime, f64)> {
        self.tides
            .extrema
            .iter()
            .map(|e| (e.time, e.height))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.station.name, "Santa Cruz, CA");
        assert_eq!(config.station.timezone, "America/Los_Angeles");
        assert_eq!(config.calendar.year, 2016);
        assert_eq!(config.calendar.altitude_step_minutes, 10);
        assert_eq!(config.calendar.tide_resolution, 20);
        assert_eq!(config.calendar.phase_icon_count, 28);
        assert_eq!(config.calendar.moon_sample_hour, 22);
        assert!(config.tides.extrema.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.tides.extrema.push(ExtremumConfig {
            time: NaiveDateTime::parse_from_str("2016-01-01T04:35:00", "%Y-%m-%dT%H:%M:%S")
                .unwrap(),
            height: 5.1,
        });

        let file = NamedTempFile::new().unwrap();
        config.save_to_path(file.path()).unwrap();
        let loaded = Config::load_from_path(file.path());
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_minimal_file_fills_in_defaults() {
        let file = write_config(
            r#"
[station]
name = "Gulf Shores, AL"
latitude = 30.2788
longitude = -87.5550
timezone = "America/Chicago"

[calendar]
year = 2017

[[tides.extrema]]
time = "2017-01-01T05:12:00"
height = 1.3

[[tides.extrema]]
time = "2017-01-01T17:40:00"
height = -0.2
"#,
        );
        let config = Config::load_from_path(file.path());
        assert_eq!(config.station.name, "Gulf Shores, AL");
        assert_eq!(config.station.elevation, 0.0);
        assert_eq!(config.calendar.year, 2017);
        assert_eq!(config.calendar.tide_resolution, 20);
        assert_eq!(config.local_extrema().len(), 2);
        assert_eq!(config.local_extrema()[1].1, -0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let file = write_config("[station]\nname = 42\n");
        assert_eq!(Config::load_from_path(file.path()), Config::default());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let cases: [fn(&mut Config); 7] = [
            |c| c.station.latitude = 91.0,
            |c| c.station.longitude = -180.5,
            |c| c.station.timezone = "Pacific/Atlantis".to_string(),
            |c| c.calendar.altitude_step_minutes = 0,
            |c| c.calendar.tide_resolution = 2,
            |c| c.calendar.phase_icon_count = 3,
            |c| c.calendar.moon_sample_hour = 24,
        ];
        for (i, break_it) in cases.into_iter().enumerate() {
            let mut config = Config::default();
            break_it(&mut config);
            assert!(config.validate().is_err(), "case {i} should fail validation");
        }
    }

    #[test]
    fn test_settings_carried_over() {
        let config = Config::default();
        let location = config.location();
        assert_eq!(location.name.as_deref(), Some("Santa Cruz, CA"));
        assert_eq!(location.latitude, 36.9577);
        let settings = config.astro_settings();
        assert_eq!(settings.phase_ids, 28);
        assert_eq!(settings.moon_sample_hour, 22);
    }
}
