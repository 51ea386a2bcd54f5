//! # Ephemeris Contract
//!
//! The calendar does not do celestial mechanics itself. Everything it needs
//! from an ephemeris is collected in the [`Ephemeris`] trait: rise, transit
//! and set times, altitude, the Moon's illuminated fraction, quarter-phase
//! instants and the equinoxes and solstices.
//!
//! Queries take the observer (or an instant) explicitly and return a value.
//! Searches that can fail to converge return a [`Result`].
//! Nothing is remembered between calls, so a caller that wants to walk through
//! time clones an [`Observer`] and moves the clone's date.
//!
//! [`crate::almanac::Almanac`] is the bundled implementation.

use crate::error::{CalendarError, Result};
use crate::{EventLabel, EventPoint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The bodies a calendar can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
}

impl Body {
    /// Label for this body's daily transit: "noon" for the Sun, "max height"
    /// for anything else.
    pub fn transit_label(self) -> EventLabel {
        match self {
            Body::Sun => EventLabel::Noon,
            Body::Moon => EventLabel::MaxHeight,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Body {
    type Err = CalendarError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sun" => Ok(Body::Sun),
            "moon" => Ok(Body::Moon),
            _ => Err(CalendarError::UnknownBody(s.to_string())),
        }
    }
}

/// A place on Earth at a moment in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    /// Geodetic latitude in degrees, north positive
    pub latitude: f64,
    /// Longitude in degrees, east positive
    pub longitude: f64,
    /// Height above sea level in meters
    pub elevation: f64,
    /// The moment the observer is looking at the sky
    pub date: DateTime<Utc>,
}

impl Observer {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, date: DateTime<Utc>) -> Self {
        Observer {
            latitude,
            longitude,
            elevation,
            date,
        }
    }

    /// A copy of this observer looking at `date` instead.
    pub fn at(&self, date: DateTime<Utc>) -> Observer {
        Observer {
            date,
            ..self.clone()
        }
    }

    /// Move this observer's date forward by `step`.
    pub fn advance(&mut self, step: Duration) {
        self.date += step;
    }
}

/// Rises, transit and sets of a body in one 24-hour window.
///
/// Every horizon crossing in the window is listed. Usually that is one rise
/// and one set, but the Moon skips one of each roughly every month, near the
/// poles a body can stay up or down all day, and a near-circumpolar Moon can
/// rise or set twice inside the same 24 hours.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyEvents {
    pub rises: Vec<DateTime<Utc>>,
    pub transit: Option<DateTime<Utc>>,
    pub sets: Vec<DateTime<Utc>>,
}

impl DailyEvents {
    /// All events as labelled points, in chronological order.
    pub fn into_event_points(self, transit_label: EventLabel) -> Vec<EventPoint> {
        let rises = self.rises.into_iter().map(|instant| EventPoint {
            instant,
            label: EventLabel::Rise,
        });
        let sets = self.sets.into_iter().map(|instant| EventPoint {
            instant,
            label: EventLabel::Set,
        });
        let transit = self.transit.map(|instant| EventPoint {
            instant,
            label: transit_label,
        });

        let mut points: Vec<EventPoint> = rises.chain(transit).chain(sets).collect();
        points.sort_by_key(|p| p.instant);
        points
    }
}

/// The four principal phases of the Moon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LunarPhase {
    New,
    FirstQuarter,
    Full,
    LastQuarter,
}

impl LunarPhase {
    /// Excess of the Moon's apparent longitude over the Sun's at this phase.
    pub fn elongation_degrees(self) -> f64 {
        match self {
            LunarPhase::New => 0.0,
            LunarPhase::FirstQuarter => 90.0,
            LunarPhase::Full => 180.0,
            LunarPhase::LastQuarter => 270.0,
        }
    }
}

/// Equinoxes and solstices, named for the northern hemisphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    SpringEquinox,
    SummerSolstice,
    FallEquinox,
    WinterSolstice,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::SpringEquinox,
        Season::SummerSolstice,
        Season::FallEquinox,
        Season::WinterSolstice,
    ];

    /// Apparent solar longitude at which the season begins.
    pub fn solar_longitude_degrees(self) -> f64 {
        match self {
            Season::SpringEquinox => 0.0,
            Season::SummerSolstice => 90.0,
            Season::FallEquinox => 180.0,
            Season::WinterSolstice => 270.0,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::SpringEquinox => "spring equinox",
            Season::SummerSolstice => "summer solstice",
            Season::FallEquinox => "fall equinox",
            Season::WinterSolstice => "winter solstice",
        };
        f.write_str(name)
    }
}

/// Everything the calendar asks of an ephemeris.
pub trait Ephemeris {
    /// Every rise and set of `body`, and its transit, in the 24 hours
    /// starting at `observer.date`.
    fn daily_events(&self, body: Body, observer: &Observer) -> Result<DailyEvents>;

    /// Apparent altitude of `body` above the horizon at `observer.date`, in
    /// radians.
    fn altitude(&self, body: Body, observer: &Observer) -> f64;

    /// Fraction of the Moon's disk that is lit at `observer.date`, 0 to 1.
    fn moon_phase_fraction(&self, observer: &Observer) -> f64;

    /// First instant of `phase` strictly after `after`.
    fn next_lunar_phase(&self, phase: LunarPhase, after: DateTime<Utc>) -> Result<DateTime<Utc>>;

    /// Last instant of `phase` strictly before `before`.
    fn previous_lunar_phase(&self, phase: LunarPhase, before: DateTime<Utc>)
        -> Result<DateTime<Utc>>;

    /// First instant of `season` on or after Jan 1, 00:00 UTC of `year`.
    fn next_season(&self, season: Season, year: i32) -> Result<DateTime<Utc>>;

    fn next_new_moon(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.next_lunar_phase(LunarPhase::New, after)
    }

    fn previous_new_moon(&self, before: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.previous_lunar_phase(LunarPhase::New, before)
    }

    fn next_first_quarter(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.next_lunar_phase(LunarPhase::FirstQuarter, after)
    }

    fn next_full_moon(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.next_lunar_phase(LunarPhase::Full, after)
    }

    fn next_last_quarter(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.next_lunar_phase(LunarPhase::LastQuarter, after)
    }

    fn next_spring_equinox(&self, year: i32) -> Result<DateTime<Utc>> {
        self.next_season(Season::SpringEquinox, year)
    }

    fn next_summer_solstice(&self, year: i32) -> Result<DateTime<Utc>> {
        self.next_season(Season::SummerSolstice, year)
    }

    fn next_fall_equinox(&self, year: i32) -> Result<DateTime<Utc>> {
        self.next_season(Season::FallEquinox, year)
    }

    fn next_winter_solstice(&self, year: i32) -> Result<DateTime<Utc>> {
        self.next_season(Season::WinterSolstice, year)
    }
}
