//! # Calendar Errors
//!
//! Every computation in this crate either produces a complete series or fails
//! with one of these variants. There is no partial output: a renderer that
//! receives a series can assume it covers the whole year.
//!
//! The variants fall into three groups:
//! - **Input errors**: unknown timezone, malformed UTC offset, bad year,
//!   bad resolution, unknown body name, bad sample hour
//! - **Structural violations**: mismatched rise/set counts, a pair whose
//!   first instant is not before the second, an empty input series
//! - **Oracle surprises**: an ephemeris search that ran out of steps, or a
//!   postcondition that the ephemeris or the interpolator should have
//!   guaranteed but did not

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Errors raised while resolving year bounds, interpolating, stitching or
/// classifying calendar series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    /// The IANA timezone name is not in the tz database
    #[error("unrecognized time zone: {0}")]
    InvalidTimezone(String),

    /// A UTC offset string was not exactly `+HHMM` or `-HHMM`
    #[error("malformed UTC offset {0:?}, expected +HHMM or -HHMM")]
    MalformedOffset(String),

    /// The year cannot be represented as a calendar date
    #[error("year {0} is out of range")]
    InvalidYear(i32),

    /// Interpolation needs at least three points per segment
    #[error("interpolation resolution must be greater than 2, got {0}")]
    InvalidResolution(usize),

    /// A body name that is neither the Sun nor the Moon
    #[error("unknown astronomical body: {0}")]
    UnknownBody(String),

    /// Two instants that must be strictly increasing are not
    #[error("{what}: {first} is not before {second}")]
    NonMonotonicPair {
        what: &'static str,
        first: DateTime<Utc>,
        second: DateTime<Utc>,
    },

    /// An interval whose stop precedes its start
    #[error("interval from {start} to {stop} has negative duration")]
    NegativeInterval {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },

    /// Two series that must line up have different lengths
    #[error("mismatched {what}: {left} vs {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// A series that needs at least one element was empty
    #[error("no {0} to work with")]
    EmptySeries(&'static str),

    /// A local wall-clock time skipped by a daylight-saving transition
    #[error("local time {time} does not exist in {timezone}")]
    NonexistentLocalTime {
        time: NaiveDateTime,
        timezone: String,
    },

    /// New-moon bounds or phase icon count that cannot describe a lunation
    #[error("invalid lunation: {0}")]
    InvalidLunation(String),

    /// A local hour of day outside 0..=23
    #[error("sample hour must be 0..=23, got {0}")]
    InvalidSampleHour(u32),

    /// An ephemeris search that found nothing, or an instant chrono cannot hold
    #[error("ephemeris: {0}")]
    Ephemeris(String),

    /// A postcondition that should always hold did not
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, CalendarError>;
