//! # Tide Curve Densification
//!
//! A tide table lists only the highs and lows, roughly four a day at
//! irregular times. This module turns that list into a dense curve the
//! calendar can draw as a continuous line.
//!
//! ## Interpolation
//!
//! Between each consecutive pair of extrema:
//! - **Heights** follow a half sine wave ([`sine_interp`]), so the curve is
//!   flat at each turn of the tide and steepest at mid-tide
//! - **Times** are evenly spaced, `resolution - 1` equal sub-intervals,
//!   stepped in whole microseconds
//!
//! Each pair drops its final point, since the next pair starts there, and the
//! last extremum is appended once at the very end. A table of `N` extrema
//! densified at resolution `r` yields `(N - 1) * (r - 1) + 1` samples.
//!
//! ## Timezones
//!
//! Tide tables are published in station local time. [`TideSeries`] keeps
//! everything in UTC and converts back to the station's timezone on demand.

use crate::error::{CalendarError, Result};
use crate::interpolate::sine_interp;
use crate::year_bounds::parse_timezone;
use crate::{TideCurveSample, TideExtremum};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Default number of points per extremum pair, both ends included.
pub const DEFAULT_TIDE_RESOLUTION: usize = 20;

/// Densify tide extrema into a continuous curve.
///
/// `extrema` must be in strictly increasing time order.
///
/// # Errors
/// - [`CalendarError::InvalidResolution`] if `resolution <= 2`
/// - [`CalendarError::EmptySeries`] if `extrema` is empty
/// - [`CalendarError::NonMonotonicPair`] if an extremum is not strictly later
///   than the one before it
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_calendar_lib::tide_data::build_all_tides;
/// use tide_calendar_lib::TideExtremum;
///
/// let low = TideExtremum {
///     instant: Utc.with_ymd_and_hms(2016, 1, 1, 3, 0, 0).unwrap(),
///     magnitude: -0.4,
/// };
/// let high = TideExtremum {
///     instant: Utc.with_ymd_and_hms(2016, 1, 1, 9, 12, 0).unwrap(),
///     magnitude: 5.6,
/// };
/// let curve = build_all_tides(&[low, high], 5).unwrap();
/// assert_eq!(curve.len(), 5);
/// assert_eq!(curve[2].magnitude, 2.6);
/// assert_eq!(curve[4].instant, high.instant);
/// ```
pub fn build_all_tides(extrema: &[TideExtremum], resolution: usize) -> Result<Vec<TideCurveSample>> {
    if resolution <= 2 {
        return Err(CalendarError::InvalidResolution(resolution));
    }
    let last = extrema.last().ok_or(CalendarError::EmptySeries("tide extrema"))?;

    let mut curve = Vec::with_capacity((extrema.len() - 1) * (resolution - 1) + 1);
    for pair in extrema.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let magnitudes = sine_interp(a.magnitude, b.magnitude, resolution, true)?;
        let instants = evenly_spaced_instants(a.instant, b.instant, resolution)?;

        if magnitudes.len() != instants.len() {
            return Err(CalendarError::LengthMismatch {
                what: "tide magnitudes/instants",
                left: magnitudes.len(),
                right: instants.len(),
            });
        }
        curve.extend(
            instants
                .into_iter()
                .zip(magnitudes)
                .map(|(instant, magnitude)| TideCurveSample { instant, magnitude }),
        );
    }

    curve.push(TideCurveSample {
        instant: last.instant,
        magnitude: last.magnitude,
    });
    Ok(curve)
}

/// The first `resolution - 1` of `resolution` evenly spaced instants from `a`
/// to `b`. The step is truncated to whole microseconds.
fn evenly_spaced_instants(
    a: DateTime<Utc>,
    b: DateTime<Utc>,
    resolution: usize,
) -> Result<Vec<DateTime<Utc>>> {
    if a >= b {
        return Err(CalendarError::NonMonotonicPair {
            what: "tide extrema",
            first: a,
            second: b,
        });
    }
    let span = (b - a)
        .num_microseconds()
        .ok_or_else(|| CalendarError::Invariant(format!("tide interval {a} to {b} is too long")))?;
    let step = Duration::microseconds(span / (resolution as i64 - 1));

    Ok((0..resolution as i32 - 1).map(|i| a + step * i).collect())
}

/// Tide highs and lows for one station, with their densified curve.
#[derive(Clone, Debug, Serialize)]
pub struct TideSeries {
    /// IANA name of the station timezone
    pub timezone: String,
    /// The extrema as supplied, UTC
    pub raw_tides: Vec<TideExtremum>,
    /// Densified curve, UTC
    pub all_tides: Vec<TideCurveSample>,
    /// Local calendar year the extrema cover
    pub year: i32,
    /// Highest extremum of the table
    pub annual_max: f64,
    /// Lowest extremum of the table
    pub annual_min: f64,
    #[serde(skip)]
    tz: Tz,
}

impl TideSeries {
    /// Build a series from extrema already in UTC.
    pub fn from_extrema(extrema: Vec<TideExtremum>, timezone: &str, resolution: usize) -> Result<Self> {
        let tz = parse_timezone(timezone)?;
        let all_tides = build_all_tides(&extrema, resolution)?;

        // The table may spill into the neighbouring years at either end
        let middle = extrema[extrema.len() / 2].instant;
        let year = middle.with_timezone(&tz).year();

        let annual_max = extrema
            .iter()
            .map(|e| e.magnitude)
            .fold(f64::NEG_INFINITY, f64::max);
        let annual_min = extrema
            .iter()
            .map(|e| e.magnitude)
            .fold(f64::INFINITY, f64::min);

        tracing::info!(
            timezone,
            year,
            extrema = extrema.len(),
            samples = all_tides.len(),
            "tide series complete"
        );

        Ok(TideSeries {
            timezone: timezone.to_string(),
            raw_tides: extrema,
            all_tides,
            year,
            annual_max,
            annual_min,
            tz,
        })
    }

    /// Build a series from extrema given in station local time.
    ///
    /// A wall-clock time that occurs twice (clocks set back) is read with the
    /// earlier offset. One that never occurs (clocks set forward) is an error.
    ///
    /// # Errors
    /// [`CalendarError::NonexistentLocalTime`] as above, plus everything
    /// [`TideSeries::from_extrema`] can return.
    pub fn from_local_extrema(
        local: &[(NaiveDateTime, f64)],
        timezone: &str,
        resolution: usize,
    ) -> Result<Self> {
        let tz = parse_timezone(timezone)?;
        let extrema = local
            .iter()
            .map(|&(time, magnitude)| {
                let instant = match tz.from_local_datetime(&time) {
                    LocalResult::Single(t) => t,
                    LocalResult::Ambiguous(earliest, _) => earliest,
                    LocalResult::None => {
                        return Err(CalendarError::NonexistentLocalTime {
                            time,
                            timezone: timezone.to_string(),
                        })
                    }
                };
                Ok(TideExtremum {
                    instant: instant.with_timezone(&Utc),
                    magnitude,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_extrema(extrema, timezone, resolution)
    }

    /// Range between the annual high and low.
    pub fn annual_range(&self) -> f64 {
        self.annual_max - self.annual_min
    }

    /// Extrema in station local time.
    pub fn local_raw_tides(&self) -> Vec<(DateTime<Tz>, f64)> {
        self.raw_tides
            .iter()
            .map(|e| (e.instant.with_timezone(&self.tz), e.magnitude))
            .collect()
    }

    /// Densified curve in station local time.
    pub fn local_all_tides(&self) -> Vec<(DateTime<Tz>, f64)> {
        self.all_tides
            .iter()
            .map(|s| (s.instant.with_timezone(&self.tz), s.magnitude))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn extremum(d: u32, h: u32, mi: u32, magnitude: f64) -> TideExtremum {
        TideExtremum {
            instant: Utc.with_ymd_and_hms(2016, 1, d, h, mi, 0).unwrap(),
            magnitude,
        }
    }

    fn local(mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn sample_extrema() -> Vec<TideExtremum> {
        vec![
            extremum(1, 2, 14, 1.1),
            extremum(1, 8, 31, 5.9),
            extremum(1, 15, 2, -0.7),
            extremum(1, 21, 40, 4.2),
            extremum(2, 3, 1, 1.6),
        ]
    }

    #[test]
    fn test_curve_length() {
        let extrema = sample_extrema();
        for resolution in [3, 5, 20] {
            let curve = build_all_tides(&extrema, resolution).unwrap();
            assert_eq!(
                curve.len(),
                (extrema.len() - 1) * (resolution - 1) + 1,
                "resolution {resolution}"
            );
        }
    }

    #[test]
    fn test_curve_passes_through_every_extremum() {
        let extrema = sample_extrema();
        let resolution = 20;
        let curve = build_all_tides(&extrema, resolution).unwrap();

        for (i, e) in extrema.iter().enumerate() {
            let sample = curve[i * (resolution - 1)];
            assert_eq!(sample.instant, e.instant);
            assert!((sample.magnitude - e.magnitude).abs() < 1e-8);
        }
        assert!(curve.windows(2).all(|w| w[0].instant < w[1].instant));
    }

    #[test]
    fn test_time_step_truncated_to_microseconds() {
        // 7 seconds split into 3 sub-intervals
        let a = extremum(1, 0, 0, 0.0);
        let b = TideExtremum {
            instant: a.instant + Duration::seconds(7),
            magnitude: 1.0,
        };
        let curve = build_all_tides(&[a, b], 4).unwrap();
        assert_eq!(curve[1].instant - a.instant, Duration::microseconds(2_333_333));
        assert_eq!(curve[2].instant - a.instant, Duration::microseconds(4_666_666));
        assert_eq!(curve[3].instant, b.instant);
    }

    #[test]
    fn test_single_extremum() {
        let only = extremum(1, 6, 0, 3.3);
        let curve = build_all_tides(&[only], 20).unwrap();
        assert_eq!(curve.len(), 1);
        assert_eq!(curve[0].magnitude, 3.3);
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(
            build_all_tides(&[], 20).unwrap_err(),
            CalendarError::EmptySeries("tide extrema")
        );
        assert_eq!(
            build_all_tides(&sample_extrema(), 2).unwrap_err(),
            CalendarError::InvalidResolution(2)
        );

        let backwards = [extremum(1, 8, 0, 5.0), extremum(1, 2, 0, 1.0)];
        assert!(matches!(
            build_all_tides(&backwards, 20).unwrap_err(),
            CalendarError::NonMonotonicPair { .. }
        ));
        let repeated = [extremum(1, 8, 0, 5.0), extremum(1, 8, 0, 1.0)];
        assert!(build_all_tides(&repeated, 20).is_err());
    }

    #[test]
    fn test_series_summary() {
        let series = TideSeries::from_extrema(sample_extrema(), "UTC", 20).unwrap();
        assert_eq!(series.year, 2016);
        assert_eq!(series.annual_max, 5.9);
        assert_eq!(series.annual_min, -0.7);
        assert!((series.annual_range() - 6.6).abs() < 1e-12);
        assert_eq!(series.all_tides.len(), 4 * 19 + 1);
    }

    #[test]
    fn test_local_extrema_converted_to_utc() {
        let series = TideSeries::from_local_extrema(
            &[(local(1, 1, 4, 30), 0.9), (local(1, 1, 10, 45), 5.1)],
            "America/Los_Angeles",
            20,
        )
        .unwrap();
        assert_eq!(
            series.raw_tides[0].instant,
            Utc.with_ymd_and_hms(2016, 1, 1, 12, 30, 0).unwrap()
        );
        let (first_local, _) = series.local_raw_tides()[0];
        assert_eq!(first_local.naive_local(), local(1, 1, 4, 30));
        assert_eq!(series.local_all_tides().len(), 20);
    }

    #[test]
    fn test_ambiguous_local_time_takes_earlier_offset() {
        // 01:30 happens twice on 2016-11-06 in Los Angeles
        let series = TideSeries::from_local_extrema(
            &[(local(11, 6, 1, 30), 2.0), (local(11, 6, 7, 0), 6.0)],
            "America/Los_Angeles",
            5,
        )
        .unwrap();
        assert_eq!(
            series.raw_tides[0].instant,
            Utc.with_ymd_and_hms(2016, 11, 6, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_nonexistent_local_time_rejected() {
        // 02:30 is skipped on 2016-03-13 in Los Angeles
        let err = TideSeries::from_local_extrema(
            &[(local(3, 13, 2, 30), 2.0), (local(3, 13, 8, 0), 6.0)],
            "America/Los_Angeles",
            5,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CalendarError::NonexistentLocalTime {
                time: local(3, 13, 2, 30),
                timezone: "America/Los_Angeles".to_string(),
            }
        );
    }

    #[test]
    fn test_serializes_without_private_timezone() {
        let series = TideSeries::from_extrema(sample_extrema(), "UTC", 5).unwrap();
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["timezone"], "UTC");
        assert_eq!(json["all_tides"].as_array().unwrap().len(), 17);
        assert!(json.get("tz").is_none());
    }
}
