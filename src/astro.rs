//! # Sun and Moon for One Year
//!
//! [`AstroBody`] gathers everything the calendar draws for one body at one
//! place for one year:
//! - every rise, transit and set ([`AstroBody::rise_noon_set`])
//! - the altitude curve while the body is up ([`AstroBody::heights`])
//! - for the Sun, the equinoxes and solstices
//! - for the Moon, the lit fraction and the phase icon id of every day
//!
//! It is computed once and not changed afterwards. All instants are UTC;
//! the `local_*` methods convert to the location's timezone.

use crate::ephemeris::{Body, Ephemeris, Observer, Season};
use crate::error::{CalendarError, Result};
use crate::lunar::{self, DEFAULT_PHASE_IDS, DEFAULT_SAMPLE_HOUR};
use crate::stitch;
use crate::year_bounds::{parse_timezone, utc_year_bounds, YearBounds};
use crate::{AltitudeSample, DailyValue, EventLabel, EventPoint};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Where the calendar is for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Display name, e.g. "Santa Cruz, CA"
    pub name: Option<String>,
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Meters above sea level
    pub elevation: f64,
    /// IANA timezone name
    pub timezone: String,
}

impl Location {
    /// An observer standing here at `date`.
    pub fn observer(&self, date: DateTime<Utc>) -> Observer {
        Observer::new(self.latitude, self.longitude, self.elevation, date)
    }
}

/// Sampling choices for [`AstroBody::compute`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AstroSettings {
    /// Spacing of altitude samples
    pub altitude_step_minutes: u32,
    /// Number of moon phase icons
    pub phase_ids: usize,
    /// Local hour at which the Moon is sampled each day
    pub moon_sample_hour: u32,
}

impl Default for AstroSettings {
    fn default() -> Self {
        AstroSettings {
            altitude_step_minutes: 10,
            phase_ids: DEFAULT_PHASE_IDS,
            moon_sample_hour: DEFAULT_SAMPLE_HOUR,
        }
    }
}

impl AstroSettings {
    pub fn altitude_step(&self) -> Result<Duration> {
        if self.altitude_step_minutes == 0 {
            return Err(CalendarError::Invariant(
                "altitude step must be at least one minute".to_string(),
            ));
        }
        Ok(Duration::minutes(self.altitude_step_minutes as i64))
    }
}

/// An equinox or solstice.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonEvent {
    pub instant: DateTime<Utc>,
    pub season: Season,
}

/// The part of an [`AstroBody`] that depends on which body it is.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyExtras {
    Sun {
        seasons: Vec<SeasonEvent>,
    },
    Moon {
        /// Lit fraction, 0 to 1, one per local day
        percent_illuminated: Vec<DailyValue<f64>>,
        /// Phase icon id, one per local day
        phase_day_num: Vec<DailyValue<usize>>,
    },
}

/// One body's year at one location.
#[derive(Clone, Debug, Serialize)]
pub struct AstroBody {
    pub body: Body,
    pub location: Location,
    pub year: i32,
    pub bounds: YearBounds,
    pub rise_noon_set: Vec<EventPoint>,
    pub heights: Vec<AltitudeSample>,
    pub extras: BodyExtras,
    #[serde(skip)]
    tz: Tz,
}

impl AstroBody {
    /// Compute the full year for `body` at `location`.
    ///
    /// # Errors
    /// Anything the year resolver, the stitcher or the lunar classifier can
    /// report. Nothing partial is returned.
    pub fn compute<E: Ephemeris + ?Sized>(
        ephemeris: &E,
        location: &Location,
        year: i32,
        body: Body,
        settings: &AstroSettings,
    ) -> Result<Self> {
        let tz = parse_timezone(&location.timezone)?;
        let bounds = utc_year_bounds(&location.timezone, year)?;
        let step = settings.altitude_step()?;
        let observer = location.observer(bounds.start);

        let rise_noon_set = stitch::rise_noon_set(ephemeris, body, &observer, &bounds)?;
        let heights =
            stitch::altitude_curve(ephemeris, body, &observer, &rise_noon_set, &bounds, step)?;

        let extras = match body {
            Body::Sun => BodyExtras::Sun {
                seasons: Season::ALL
                    .iter()
                    .map(|&season| {
                        Ok(SeasonEvent {
                            instant: ephemeris.next_season(season, year)?,
                            season,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            },
            Body::Moon => BodyExtras::Moon {
                percent_illuminated: lunar::daily_illumination(
                    ephemeris,
                    &observer,
                    &tz,
                    year,
                    settings.moon_sample_hour,
                )?,
                phase_day_num: lunar::daily_lunation_days(
                    ephemeris,
                    &tz,
                    year,
                    settings.moon_sample_hour,
                    settings.phase_ids,
                )?,
            },
        };

        tracing::info!(
            %body,
            year,
            timezone = %location.timezone,
            events = rise_noon_set.len(),
            heights = heights.len(),
            "{body} calculations complete"
        );

        Ok(AstroBody {
            body,
            location: location.clone(),
            year,
            bounds,
            rise_noon_set,
            heights,
            extras,
            tz,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Equinoxes and solstices; empty for the Moon.
    pub fn seasons(&self) -> &[SeasonEvent] {
        match &self.extras {
            BodyExtras::Sun { seasons } => seasons,
            BodyExtras::Moon { .. } => &[],
        }
    }

    /// Daily lit fraction; empty for the Sun.
    pub fn percent_illuminated(&self) -> &[DailyValue<f64>] {
        match &self.extras {
            BodyExtras::Moon {
                percent_illuminated,
                ..
            } => percent_illuminated,
            BodyExtras::Sun { .. } => &[],
        }
    }

    /// Daily phase icon id; empty for the Sun.
    pub fn phase_day_num(&self) -> &[DailyValue<usize>] {
        match &self.extras {
            BodyExtras::Moon { phase_day_num, .. } => phase_day_num,
            BodyExtras::Sun { .. } => &[],
        }
    }

    pub fn local_rise_noon_set(&self) -> Vec<(DateTime<Tz>, EventLabel)> {
        self.rise_noon_set
            .iter()
            .map(|e| (e.instant.with_timezone(&self.tz), e.label))
            .collect()
    }

    pub fn local_heights(&self) -> Vec<(DateTime<Tz>, f64)> {
        self.heights
            .iter()
            .map(|s| (s.instant.with_timezone(&self.tz), s.value))
            .collect()
    }

    pub fn local_seasons(&self) -> Vec<(DateTime<Tz>, Season)> {
        self.seasons()
            .iter()
            .map(|s| (s.instant.with_timezone(&self.tz), s.season))
            .collect()
    }
}
