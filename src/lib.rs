//! # Tide Calendar Core Library
//!
//! This library turns sparse astronomical and tidal anchor points into dense,
//! timezone-correct time series for an annual Sun * Moon * Tides calendar.
//!
//! ## Design Philosophy
//!
//! ### Sparse In, Dense Out
//! - **Astronomical events**: one rise, transit and set per day become a
//!   year-long altitude curve sampled every 10 minutes while the body is up
//! - **Tide extrema**: roughly four highs/lows per day become a continuous
//!   curve using a half-sine between each consecutive pair
//! - **Lunar phase**: every day gets one of 28 phase icon ids, calibrated to
//!   the quarter-phase instants reported by the ephemeris
//!
//! ### Timezone Correctness
//! All series are stored in UTC. The calendar year is resolved into UTC bounds
//! by localizing Jan 1 and Dec 31 separately, so a year that crosses a
//! daylight-saving or legislative offset change still starts at local
//! midnight and ends at local 23:59:59.
//!
//! ### Explicit State
//! The ephemeris is a trait ([`ephemeris::Ephemeris`]) queried with an explicit
//! [`ephemeris::Observer`]. Components clone the observer before moving its
//! date, so a caller's observer never changes underneath it.
//!
//! ## Data Flow
//! 1. **Resolve**: [`year_bounds::utc_year_bounds`] gives the UTC window
//! 2. **Stitch**: [`stitch`] walks the window day by day collecting events,
//!    then densifies altitude between rise/set pairs
//! 3. **Interpolate**: [`tide_data`] densifies tide extrema with
//!    [`interpolate::sine_interp`]
//! 4. **Classify**: [`lunar`] assigns a phase id to each day
//!
//! ## Core Types
//!
//! The series element types live here so every module shares them:
//! - [`EventPoint`]: a labelled rise, transit or set instant
//! - [`AltitudeSample`]: `sin(altitude)` of a body at an instant
//! - [`TideExtremum`] / [`TideCurveSample`]: tide magnitude at an instant
//! - [`DailyValue`]: one value per local calendar day

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Module declarations
pub mod almanac;
pub mod astro;
pub mod config;
pub mod ephemeris;
pub mod error;
pub mod interpolate;
pub mod lunar;
pub mod report;
pub mod stitch;
pub mod tide_data;
pub mod year_bounds;

pub use error::{CalendarError, Result};

/// What happened at an [`EventPoint`].
///
/// The transit of the Sun is labelled `Noon`; the transit of any other body
/// is labelled `MaxHeight`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLabel {
    Rise,
    Noon,
    MaxHeight,
    Set,
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventLabel::Rise => "rise",
            EventLabel::Noon => "noon",
            EventLabel::MaxHeight => "max height",
            EventLabel::Set => "set",
        };
        f.write_str(label)
    }
}

/// A single rise, transit or set of a body.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_calendar_lib::{EventLabel, EventPoint};
///
/// let sunrise = EventPoint {
///     instant: Utc.with_ymd_and_hms(2016, 6, 20, 12, 48, 0).unwrap(),
///     label: EventLabel::Rise,
/// };
/// assert_eq!(sunrise.label.to_string(), "rise");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventPoint {
    /// When the event happens (UTC)
    pub instant: DateTime<Utc>,
    /// Which event it is
    pub label: EventLabel,
}

/// Height of a body above the horizon, as `sin(altitude)`.
///
/// A `NaN` value is a "no data" marker. Markers are placed just after the end
/// of every above-horizon segment so plotted lines break across the night,
/// and any sample that came out below the horizon is overwritten with one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AltitudeSample {
    /// Sample time (UTC)
    pub instant: DateTime<Utc>,
    /// `sin(altitude)`, or `NaN` for no data
    pub value: f64,
}

impl AltitudeSample {
    /// True for a "no data" marker.
    pub fn is_gap(&self) -> bool {
        self.value.is_nan()
    }
}

/// A tide high or low as delivered by the tide table supplier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideExtremum {
    /// Time of the high or low (UTC)
    pub instant: DateTime<Utc>,
    /// Tide height, in the units of the source table
    pub magnitude: f64,
}

/// One point of a densified tide curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideCurveSample {
    /// Sample time (UTC)
    pub instant: DateTime<Utc>,
    /// Interpolated tide height
    pub magnitude: f64,
}

/// A value attached to one local calendar day.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyValue<T> {
    /// Local calendar date
    pub date: NaiveDate,
    pub value: T,
}
