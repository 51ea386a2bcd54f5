//! Lunar cycle classification: which of `K` phase icons to show on each day.
//!
//! A straight linear map from "time since new moon" to an icon id drifts
//! against the ephemeris, because the quarter phases are not evenly spaced
//! in time (the Moon moves faster near perigee). The classifier starts from
//! the linear guess and then re-interpolates against the actual next quarter
//! instant, so the icons line up with the published first quarter, full and
//! last quarter.
//!
//! Icon 0 is the new moon and `K / 2` (roughly) is full. Halves round to even.

use crate::ephemeris::{Ephemeris, LunarPhase, Observer};
use crate::error::{CalendarError, Result};
use crate::year_bounds::local_to_utc;
use crate::DailyValue;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Icons in a typical moon-phase set.
pub const DEFAULT_PHASE_IDS: usize = 28;

/// Hours after local midnight at which the Moon is sampled each day (10 pm).
pub const DEFAULT_SAMPLE_HOUR: u32 = 22;

/// Quarter phases and the share of the lunation each one closes.
const QUARTERS: [(LunarPhase, f64); 3] = [
    (LunarPhase::FirstQuarter, 0.25),
    (LunarPhase::Full, 0.5),
    (LunarPhase::LastQuarter, 0.75),
];

/// Phase icon id for `today`, in `0..number_of_phase_ids`.
///
/// `last_new` and `next_new` are the new moons around `today`.
///
/// # Errors
/// [`CalendarError::InvalidLunation`] if `next_new <= last_new` or fewer than
/// two ids are requested.
pub fn lunation_day<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    today: DateTime<Utc>,
    last_new: DateTime<Utc>,
    next_new: DateTime<Utc>,
    number_of_phase_ids: usize,
) -> Result<usize> {
    if number_of_phase_ids < 2 {
        return Err(CalendarError::InvalidLunation(format!(
            "need at least 2 phase ids, got {number_of_phase_ids}"
        )));
    }
    if next_new <= last_new {
        return Err(CalendarError::InvalidLunation(format!(
            "next new moon {next_new} is not after last new moon {last_new}"
        )));
    }

    let num = (number_of_phase_ids - 1) as f64;
    let first_approx = (elapsed_fraction(today, last_new, next_new) * num).round_ties_even();

    for (phase, share) in QUARTERS {
        if first_approx < (share * num).ceil() {
            let quarter = ephemeris.next_lunar_phase(phase, last_new)?;
            if today < quarter {
                let id = (elapsed_fraction(today, last_new, quarter) * (share * num)).round_ties_even();
                return Ok(clamp_id(id, num));
            }
        }
    }
    Ok(clamp_id(first_approx, num))
}

fn elapsed_fraction(t: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (t - from).num_milliseconds() as f64 / (to - from).num_milliseconds() as f64
}

fn clamp_id(id: f64, num: f64) -> usize {
    id.clamp(0.0, num) as usize
}

/// The UTC instant of `sample_hour` o'clock local time on every date of
/// `year` in `tz`.
///
/// Each date is localized on its own, so the samples stay at the same wall
/// clock hour when the zone changes its offset mid-year.
///
/// # Errors
/// [`CalendarError::InvalidSampleHour`] unless `sample_hour` is `0..=23`.
pub fn daily_sample_instants(
    tz: &Tz,
    year: i32,
    sample_hour: u32,
) -> Result<Vec<DailyValue<DateTime<Utc>>>> {
    local_dates(year)?
        .into_iter()
        .map(|date| {
            let local = date
                .and_hms_opt(sample_hour, 0, 0)
                .ok_or(CalendarError::InvalidSampleHour(sample_hour))?;
            Ok(DailyValue {
                date,
                value: local_to_utc(tz, local)?,
            })
        })
        .collect()
}

/// Phase icon id for every local day of `year`, sampled at `sample_hour`
/// local time.
///
/// The new moons bracketing the sample are carried along and rolled forward
/// whenever a sample reaches the next one, so this is one sequential pass.
pub fn daily_lunation_days<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    tz: &Tz,
    year: i32,
    sample_hour: u32,
    number_of_phase_ids: usize,
) -> Result<Vec<DailyValue<usize>>> {
    let samples = daily_sample_instants(tz, year, sample_hour)?;
    let Some(first) = samples.first() else {
        return Ok(Vec::new());
    };
    let mut last_new = ephemeris.previous_new_moon(first.value)?;
    let mut next_new = ephemeris.next_new_moon(first.value)?;

    let mut ids = Vec::with_capacity(samples.len());
    for DailyValue { date, value: moon_day } in samples {
        if moon_day >= next_new {
            last_new = next_new;
            next_new = ephemeris.next_new_moon(moon_day)?;
        }
        ids.push(DailyValue {
            date,
            value: lunation_day(ephemeris, moon_day, last_new, next_new, number_of_phase_ids)?,
        });
    }
    tracing::debug!(%tz, year, days = ids.len(), "classified lunation days");
    Ok(ids)
}

/// Illuminated fraction of the Moon on every local day of `year`, sampled the
/// same way as [`daily_lunation_days`].
pub fn daily_illumination<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    observer: &Observer,
    tz: &Tz,
    year: i32,
    sample_hour: u32,
) -> Result<Vec<DailyValue<f64>>> {
    Ok(daily_sample_instants(tz, year, sample_hour)?
        .into_iter()
        .map(|sample| DailyValue {
            date: sample.date,
            value: ephemeris.moon_phase_fraction(&observer.at(sample.value)),
        })
        .collect())
}

/// Every date from Jan 1 through Dec 31 of `year`.
pub fn local_dates(year: i32) -> Result<Vec<NaiveDate>> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(CalendarError::InvalidYear(year))?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(CalendarError::InvalidYear(year))?;
    Ok(first.iter_days().take_while(|d| *d <= last).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{Body, DailyEvents, Season};
    use crate::year_bounds::parse_timezone;
    use chrono::{Duration, TimeZone, Timelike};

    const CYCLE_DAYS: i64 = 28;

    /// Lunations of exactly 28 days with configurable quarter offsets.
    struct SteadyMoon {
        epoch: DateTime<Utc>,
        quarter_days: [f64; 4],
    }

    impl SteadyMoon {
        fn even() -> Self {
            SteadyMoon {
                epoch: Utc.with_ymd_and_hms(2016, 1, 10, 0, 0, 0).unwrap(),
                quarter_days: [0.0, 7.0, 14.0, 21.0],
            }
        }

        fn instant(&self, cycle: i64, phase: LunarPhase) -> DateTime<Utc> {
            let offset = match phase {
                LunarPhase::New => self.quarter_days[0],
                LunarPhase::FirstQuarter => self.quarter_days[1],
                LunarPhase::Full => self.quarter_days[2],
                LunarPhase::LastQuarter => self.quarter_days[3],
            };
            self.epoch
                + Duration::days(CYCLE_DAYS * cycle)
                + Duration::minutes((offset * 1440.0) as i64)
        }

        fn cycle_of(&self, t: DateTime<Utc>) -> i64 {
            (t - self.epoch).num_days().div_euclid(CYCLE_DAYS)
        }
    }

    impl Ephemeris for SteadyMoon {
        fn daily_events(&self, _body: Body, _observer: &Observer) -> Result<DailyEvents> {
            Ok(DailyEvents::default())
        }

        fn altitude(&self, _body: Body, _observer: &Observer) -> f64 {
            0.0
        }

        fn moon_phase_fraction(&self, observer: &Observer) -> f64 {
            let age = (observer.date - self.instant(self.cycle_of(observer.date), LunarPhase::New))
                .num_minutes() as f64
                / (CYCLE_DAYS * 1440) as f64;
            (1.0 - (2.0 * std::f64::consts::PI * age).cos()) / 2.0
        }

        fn next_lunar_phase(
            &self,
            phase: LunarPhase,
            after: DateTime<Utc>,
        ) -> Result<DateTime<Utc>> {
            let mut cycle = self.cycle_of(after) - 1;
            loop {
                let t = self.instant(cycle, phase);
                if t > after {
                    return Ok(t);
                }
                cycle += 1;
            }
        }

        fn previous_lunar_phase(
            &self,
            phase: LunarPhase,
            before: DateTime<Utc>,
        ) -> Result<DateTime<Utc>> {
            let mut cycle = self.cycle_of(before) + 1;
            loop {
                let t = self.instant(cycle, phase);
                if t < before {
                    return Ok(t);
                }
                cycle -= 1;
            }
        }

        fn next_season(&self, _season: Season, _year: i32) -> Result<DateTime<Utc>> {
            Ok(self.epoch)
        }
    }

    fn day(n: i64) -> DateTime<Utc> {
        SteadyMoon::even().epoch + Duration::days(n)
    }

    #[test]
    fn test_new_moon_is_zero() {
        let moon = SteadyMoon::even();
        assert_eq!(lunation_day(&moon, day(0), day(0), day(28), 28).unwrap(), 0);
    }

    #[test]
    fn test_ids_stay_in_range() {
        let moon = SteadyMoon::even();
        for hours in 0..(28 * 24) {
            let today = day(0) + Duration::hours(hours);
            let id = lunation_day(&moon, today, day(0), day(28), 28).unwrap();
            assert!(id <= 27, "{id} out of range at +{hours}h");
        }
    }

    #[test]
    fn test_ids_never_go_backwards_within_a_lunation() {
        let moon = SteadyMoon::even();
        let mut previous = 0;
        for hours in 0..(28 * 24) {
            let today = day(0) + Duration::hours(hours);
            let id = lunation_day(&moon, today, day(0), day(28), 28).unwrap();
            assert!(id >= previous, "id dropped from {previous} to {id} at +{hours}h");
            previous = id;
        }
    }

    #[test]
    fn test_half_rounds_to_even() {
        // Halfway through an even lunation: 0.5 * 27 = 13.5, which rounds to
        // 14, and the last quarter re-anchoring gives 14 / 21 * 20.25 = 13.5
        let moon = SteadyMoon::even();
        assert_eq!(lunation_day(&moon, day(14), day(0), day(28), 28).unwrap(), 14);
    }

    #[test]
    fn test_late_first_quarter_pulls_ids_back() {
        let moon = SteadyMoon {
            quarter_days: [0.0, 8.0, 14.0, 21.0],
            ..SteadyMoon::even()
        };
        // Linear guess is round(6 / 28 * 27) = 6, the first quarter on day 8
        // turns that into round(6 / 8 * 6.75) = 5
        assert_eq!(lunation_day(&moon, day(6), day(0), day(28), 28).unwrap(), 5);
    }

    #[test]
    fn test_past_last_quarter_uses_linear_guess() {
        let moon = SteadyMoon::even();
        // round(25 / 28 * 27) = 24
        assert_eq!(lunation_day(&moon, day(25), day(0), day(28), 28).unwrap(), 24);
    }

    #[test]
    fn test_invalid_lunations() {
        let moon = SteadyMoon::even();
        assert!(matches!(
            lunation_day(&moon, day(3), day(28), day(0), 28),
            Err(CalendarError::InvalidLunation(_))
        ));
        assert!(matches!(
            lunation_day(&moon, day(3), day(0), day(0), 28),
            Err(CalendarError::InvalidLunation(_))
        ));
        assert!(matches!(
            lunation_day(&moon, day(3), day(0), day(28), 1),
            Err(CalendarError::InvalidLunation(_))
        ));
    }

    #[test]
    fn test_daily_lunation_days_roll_over_at_new_moon() {
        let moon = SteadyMoon::even();
        let days = daily_lunation_days(&moon, &chrono_tz::UTC, 2016, DEFAULT_SAMPLE_HOUR, 28).unwrap();

        assert_eq!(days.len(), 366);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(days[365].date, NaiveDate::from_ymd_opt(2016, 12, 31).unwrap());
        assert!(days.iter().all(|d| d.value <= 27));

        // Jan 9 at 22:00 is two hours before the new moon, Jan 10 22 hours after
        assert_eq!(days[8].value, 27);
        assert_eq!(days[9].value, 1);
    }

    #[test]
    fn test_daily_illumination_covers_the_year() {
        let moon = SteadyMoon::even();
        let observer = Observer::new(0.0, 0.0, 0.0, Utc::now());
        let lit =
            daily_illumination(&moon, &observer, &chrono_tz::UTC, 2015, DEFAULT_SAMPLE_HOUR).unwrap();

        assert_eq!(lit.len(), 365);
        assert!(lit.iter().all(|d| (0.0..=1.0).contains(&d.value)));
    }

    #[test]
    fn test_samples_keep_the_local_hour_across_offset_changes() {
        // Moscow: +0300 to +0400 in March 2011, +0400 to +0300 in October 2014
        let tz = parse_timezone("Europe/Moscow").unwrap();
        for (year, hour) in [(2011, 23), (2014, 0), (2011, 0), (2014, 23)] {
            let samples = daily_sample_instants(&tz, year, hour).unwrap();
            assert_eq!(samples.len(), 365, "{year} at {hour}:00");
            for sample in &samples {
                let local = sample.value.with_timezone(&tz);
                assert_eq!(local.date_naive(), sample.date);
                assert_eq!(local.hour(), hour, "{year} {}", sample.date);
            }
        }
    }

    #[test]
    fn test_one_lunation_day_per_date_across_offset_changes() {
        let moon = SteadyMoon::even();
        let tz = parse_timezone("Europe/Moscow").unwrap();
        let days = daily_lunation_days(&moon, &tz, 2011, 23, 28).unwrap();
        assert_eq!(days.len(), 365);
        assert!(days.windows(2).all(|w| w[0].date.succ_opt() == Some(w[1].date)));

        let observer = Observer::new(55.75, 37.62, 0.0, Utc::now());
        let lit = daily_illumination(&moon, &observer, &tz, 2014, 0).unwrap();
        assert_eq!(lit.len(), 365);
    }

    #[test]
    fn test_sample_hour_out_of_range() {
        assert_eq!(
            daily_sample_instants(&chrono_tz::UTC, 2016, 24).unwrap_err(),
            CalendarError::InvalidSampleHour(24)
        );
    }

    #[test]
    fn test_local_dates() {
        assert_eq!(local_dates(2016).unwrap().len(), 366);
        assert_eq!(local_dates(2017).unwrap().len(), 365);
    }
}
