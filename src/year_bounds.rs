//! # Timezone-Year Resolver
//!
//! Converts "the calendar year 2016 in America/Los_Angeles" into the pair of
//! UTC instants that bracket it: local midnight on Jan 1 and local 23:59:59 on
//! Dec 31.
//!
//! The offsets at the two ends are looked up independently. Most zones have
//! the same offset on both days, but a zone can change its standard offset
//! during the year (Moscow in 2011 went from +0300 to a permanent +0400), and
//! southern-hemisphere zones are in daylight time at both ends. Assuming one
//! offset for the whole year would be wrong in both cases.
//!
//! Each offset goes through its textual `±HHMM` form and is parsed back into a
//! fractional day plus an ahead/behind flag, which is then applied to the
//! naive local instant.

use crate::error::{CalendarError, Result};
use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::{OffsetComponents, Tz};
use serde::{Deserialize, Serialize};

/// UTC window of one local calendar year.
///
/// `start` is local midnight Jan 1, `end` is local 23:59:59 Dec 31, both in
/// UTC. `start < end` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl YearBounds {
    /// True if `instant` falls inside the window, both ends included.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A UTC offset split into its magnitude in days and its direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UtcOffset {
    /// Size of the offset as a fraction of a day (`+0530` is 5.5 / 24)
    pub days: f64,
    /// True when local time is behind UTC (a `-` offset)
    pub behind: bool,
}

impl UtcOffset {
    /// Parse a raw offset of the form `+HHMM` or `-HHMM`.
    ///
    /// # Example
    /// ```
    /// use tide_calendar_lib::year_bounds::UtcOffset;
    ///
    /// let offset = UtcOffset::parse("-0800").unwrap();
    /// assert!(offset.behind);
    /// assert!((offset.days - 8.0 / 24.0).abs() < 1e-12);
    /// assert!(UtcOffset::parse("-08:00").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || CalendarError::MalformedOffset(raw.to_string());

        if raw.len() != 5 || !raw.is_ascii() {
            return Err(malformed());
        }
        let behind = match &raw[0..1] {
            "+" => false,
            "-" => true,
            _ => return Err(malformed()),
        };
        let digits = &raw[1..];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let hour: u32 = digits[0..2].parse().map_err(|_| malformed())?;
        let minute: u32 = digits[2..4].parse().map_err(|_| malformed())?;

        Ok(UtcOffset {
            days: (hour as f64 + minute as f64 / 60.0) / 24.0,
            behind,
        })
    }

    /// Shift a naive local instant carrying this offset onto UTC.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let delta = Duration::seconds((self.days * 86_400.0).round() as i64);
        let shifted = if self.behind {
            local + delta
        } else {
            local - delta
        };
        Utc.from_utc_datetime(&shifted)
    }
}

/// Look up an IANA timezone by name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CalendarError::InvalidTimezone(name.to_string()))
}

/// Resolve a local calendar year into its UTC bounds.
///
/// # Errors
/// - [`CalendarError::InvalidTimezone`] for an unknown zone name
/// - [`CalendarError::InvalidYear`] for a year chrono cannot represent
/// - [`CalendarError::MalformedOffset`] if an offset fails to render as `±HHMM`
///
/// # Example
/// ```
/// use tide_calendar_lib::year_bounds::utc_year_bounds;
///
/// let bounds = utc_year_bounds("America/Los_Angeles", 2016).unwrap();
/// assert_eq!(bounds.start.to_rfc3339(), "2016-01-01T08:00:00+00:00");
/// assert_eq!(bounds.end.to_rfc3339(), "2017-01-01T07:59:59+00:00");
/// ```
pub fn utc_year_bounds(time_zone: &str, year: i32) -> Result<YearBounds> {
    let tz = parse_timezone(time_zone)?;

    let begin = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(CalendarError::InvalidYear(year))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .ok_or(CalendarError::InvalidYear(year))?;

    // No assumption that both ends share an offset
    let bounds = YearBounds {
        start: local_to_utc(&tz, begin)?,
        end: local_to_utc(&tz, end)?,
    };
    tracing::debug!(
        time_zone,
        year,
        start = %bounds.start,
        end = %bounds.end,
        "resolved year bounds"
    );
    Ok(bounds)
}

/// The UTC instant of a wall-clock reading in `tz`, using the offset in
/// force at that reading.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use tide_calendar_lib::year_bounds::{local_to_utc, parse_timezone};
///
/// let moscow = parse_timezone("Europe/Moscow").unwrap();
/// let evening = NaiveDate::from_ymd_opt(2011, 6, 1)
///     .unwrap()
///     .and_hms_opt(23, 0, 0)
///     .unwrap();
/// let utc = local_to_utc(&moscow, evening).unwrap();
/// assert_eq!(utc.to_rfc3339(), "2011-06-01T19:00:00+00:00");
/// ```
pub fn local_to_utc(tz: &Tz, local: NaiveDateTime) -> Result<DateTime<Utc>> {
    Ok(UtcOffset::parse(&raw_utc_offset(tz, &local))?.to_utc(local))
}

/// Offset of `tz` at the naive local instant, rendered as `±HHMM`.
///
/// Ambiguous local times (clocks set back) take the standard-time reading.
/// Local times skipped by a transition take the offset in force at the same
/// wall-clock reading taken as UTC.
pub fn raw_utc_offset(tz: &Tz, local: &NaiveDateTime) -> String {
    let offset = match tz.offset_from_local_datetime(local) {
        LocalResult::Single(offset) => offset,
        LocalResult::Ambiguous(earliest, latest) => {
            if earliest.dst_offset().is_zero() {
                earliest
            } else {
                latest
            }
        }
        LocalResult::None => tz.offset_from_utc_datetime(local),
    };
    format_utc_offset(offset.fix())
}

fn format_utc_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_los_angeles_2016() {
        let bounds = utc_year_bounds("America/Los_Angeles", 2016).unwrap();
        assert_eq!(bounds.start, utc(2016, 1, 1, 8, 0, 0));
        assert_eq!(bounds.end, utc(2017, 1, 1, 7, 59, 59));
    }

    #[test]
    fn test_utc_leap_year_length() {
        let bounds = utc_year_bounds("UTC", 2020).unwrap();
        assert_eq!(bounds.start, utc(2020, 1, 1, 0, 0, 0));
        assert_eq!(bounds.duration(), Duration::days(366) - Duration::seconds(1));
    }

    #[test]
    fn test_southern_hemisphere_daylight_time_at_both_ends() {
        // Sydney is on AEDT (+1100) on both Jan 1 and Dec 31
        let bounds = utc_year_bounds("Australia/Sydney", 2016).unwrap();
        assert_eq!(bounds.start, utc(2015, 12, 31, 13, 0, 0));
        assert_eq!(bounds.end, utc(2016, 12, 31, 12, 59, 59));
    }

    #[test]
    fn test_offset_change_within_year() {
        // Moscow moved from +0300 to a permanent +0400 in March 2011
        let bounds = utc_year_bounds("Europe/Moscow", 2011).unwrap();
        assert_eq!(bounds.start, utc(2010, 12, 31, 21, 0, 0));
        assert_eq!(bounds.end, utc(2011, 12, 31, 19, 59, 59));
        assert_eq!(
            bounds.duration(),
            Duration::days(365) - Duration::seconds(1) - Duration::hours(1)
        );
    }

    #[test]
    fn test_half_hour_offset() {
        let bounds = utc_year_bounds("Asia/Kolkata", 2019).unwrap();
        assert_eq!(bounds.start, utc(2018, 12, 31, 18, 30, 0));
        assert!(bounds.start < bounds.end);
    }

    #[test]
    fn test_unknown_timezone() {
        let err = utc_year_bounds("Mars/Olympus_Mons", 2016).unwrap_err();
        assert_eq!(
            err,
            CalendarError::InvalidTimezone("Mars/Olympus_Mons".to_string())
        );
    }

    #[test]
    fn test_parse_offsets() {
        let ahead = UtcOffset::parse("+0530").unwrap();
        assert!(!ahead.behind);
        assert!((ahead.days - 5.5 / 24.0).abs() < 1e-12);

        let zero = UtcOffset::parse("+0000").unwrap();
        assert_eq!(zero.days, 0.0);

        for bad in ["0800", "+08:00", "*0800", "+08a0", "", "+08000"] {
            assert_eq!(
                UtcOffset::parse(bad).unwrap_err(),
                CalendarError::MalformedOffset(bad.to_string()),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_raw_offset_formatting() {
        let tz = parse_timezone("America/St_Johns").unwrap();
        let jan = NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(raw_utc_offset(&tz, &jan), "-0330");
    }

    #[test]
    fn test_local_to_utc_on_both_sides_of_a_change() {
        let tz = parse_timezone("Europe/Moscow").unwrap();
        let at = |mo, d, h| {
            NaiveDate::from_ymd_opt(2014, mo, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        // +0400 until Oct 26 2014, +0300 after
        assert_eq!(local_to_utc(&tz, at(6, 1, 0)).unwrap(), utc(2014, 5, 31, 20, 0, 0));
        assert_eq!(local_to_utc(&tz, at(12, 1, 0)).unwrap(), utc(2014, 11, 30, 21, 0, 0));
    }

    #[test]
    fn test_contains() {
        let bounds = utc_year_bounds("UTC", 2016).unwrap();
        assert!(bounds.contains(bounds.start));
        assert!(bounds.contains(bounds.end));
        assert!(!bounds.contains(bounds.end + Duration::seconds(1)));
    }
}
