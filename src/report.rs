//! # Plain-Text Calendar Report
//!
//! Terminal rendering of the computed series, for checking a calendar before
//! it goes to the printer:
//! - [`render_summary`]: one line per local day with sun and moon times, the
//!   Moon's lit percentage and phase icon id, followed by the seasons and
//!   the tide range
//! - [`render_tide_chart`]: an ASCII plot of one day's tide curve
//!
//! All times are shown in the station's timezone, to the minute.

use crate::astro::AstroBody;
use crate::error::Result;
use crate::lunar::local_dates;
use crate::tide_data::TideSeries;
use crate::EventLabel;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::collections::BTreeMap;

const MISSING: &str = "--:--";

/// The first of each event kind on one local day.
#[derive(Default)]
struct DayTimes {
    rise: Option<DateTime<Tz>>,
    transit: Option<DateTime<Tz>>,
    set: Option<DateTime<Tz>>,
}

fn times_by_date(body: &AstroBody) -> BTreeMap<NaiveDate, DayTimes> {
    let mut days: BTreeMap<NaiveDate, DayTimes> = BTreeMap::new();
    for (instant, label) in body.local_rise_noon_set() {
        let day = days.entry(instant.date_naive()).or_default();
        let slot = match label {
            EventLabel::Rise => &mut day.rise,
            EventLabel::Noon | EventLabel::MaxHeight => &mut day.transit,
            EventLabel::Set => &mut day.set,
        };
        slot.get_or_insert(instant);
    }
    days
}

fn clock(time: Option<DateTime<Tz>>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Format a tide height with an explicit sign and at most one decimal.
fn format_height(height: f64) -> String {
    if height == 0.0 {
        " 0 ".to_string()
    } else if height.fract() == 0.0 {
        format!("{:+.0}", height)
    } else {
        format!("{:+.1}", height)
    }
}

/// Day-by-day summary of a calendar year.
///
/// `sun` and `moon` must be for the same location and year.
pub fn render_summary(sun: &AstroBody, moon: &AstroBody, tides: Option<&TideSeries>) -> Result<String> {
    let mut out = String::new();
    let place = sun.location.name.as_deref().unwrap_or("Unnamed location");

    out.push_str(&format!(
        "Sun * Moon * Tides {}, {} ({})\n",
        sun.year, place, sun.location.timezone
    ));
    out.push_str(&format!(
        "{:.4}, {:.4}\n\n",
        sun.location.latitude, sun.location.longitude
    ));

    out.push_str(&format!(
        "{:<10}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>4}  {:>5}\n",
        "date", "rise", "noon", "set", "moon↑", "moon↓", "lit", "phase"
    ));

    let sun_days = times_by_date(sun);
    let moon_days = times_by_date(moon);
    let illumination = moon.percent_illuminated();
    let phases = moon.phase_day_num();
    let empty = DayTimes::default();

    for (i, date) in local_dates(sun.year)?.into_iter().enumerate() {
        let s = sun_days.get(&date).unwrap_or(&empty);
        let m = moon_days.get(&date).unwrap_or(&empty);
        let lit = illumination
            .get(i)
            .map(|d| format!("{:.0}%", d.value * 100.0))
            .unwrap_or_default();
        let phase = phases
            .get(i)
            .map(|d| d.value.to_string())
            .unwrap_or_default();

        out.push_str(&format!(
            "{:<10}  {:>5}  {:>5}  {:>5}  {:>5}  {:>5}  {:>4}  {:>5}\n",
            date.format("%Y-%m-%d"),
            clock(s.rise),
            clock(s.transit),
            clock(s.set),
            clock(m.rise),
            clock(m.set),
            lit,
            phase
        ));
    }

    let seasons = sun.local_seasons();
    if !seasons.is_empty() {
        out.push_str("\nSeasons\n");
        for (instant, season) in seasons {
            out.push_str(&format!(
                "  {:<16} {}\n",
                season.to_string(),
                instant.format("%Y-%m-%d %H:%M")
            ));
        }
    }

    if let Some(tides) = tides {
        out.push_str(&format!(
            "\nTides: {} highs and lows, annual max {}, min {}, range {:.1}\n",
            tides.raw_tides.len(),
            format_height(tides.annual_max),
            format_height(tides.annual_min),
            tides.annual_range()
        ));
    }

    Ok(out)
}

/// ASCII plot of the tide curve on one local day, or `None` if the series
/// has no samples that day.
pub fn render_tide_chart(tides: &TideSeries, date: NaiveDate) -> Option<String> {
    const ROWS: usize = 12;
    const Y_AXIS_WIDTH: usize = 6; // Space for Y-axis labels

    let samples: Vec<(DateTime<Tz>, f64)> = tides
        .local_all_tides()
        .into_iter()
        .filter(|(t, _)| t.date_naive() == date)
        .collect();
    if samples.is_empty() {
        return None;
    }

    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &(_, h)| {
            (min.min(h), max.max(h))
        });
    let span = if max > min { max - min } else { 1.0 };
    let height_to_row = |h: f64| {
        let normalized = (h - min) / span;
        ((1.0 - normalized) * (ROWS as f64 - 1.0)).round() as usize
    };

    let width = samples.len() + Y_AXIS_WIDTH;
    let mut grid = vec![vec![' '; width]; ROWS];

    for (label_height, row) in [(max, 0), (min, height_to_row(min))] {
        let label = format!("{:<w$}", format_height(label_height), w = Y_AXIS_WIDTH - 1);
        for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
            grid[row][i] = ch;
        }
    }
    for row in grid.iter_mut() {
        row[Y_AXIS_WIDTH - 1] = '│'; // Vertical axis line
    }

    for (column, &(_, h)) in samples.iter().enumerate() {
        grid[height_to_row(h)][column + Y_AXIS_WIDTH] = '•';
    }

    let mut out = format!("Tides {} ({})\n", date.format("%Y-%m-%d"), tides.timezone);
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    // Time labels under the first and last sample
    let first = samples[0].0.format("%H:%M").to_string();
    let last = samples[samples.len() - 1].0.format("%H:%M").to_string();
    let gap = samples.len().saturating_sub(first.len() + last.len());
    out.push_str(&format!(
        "{}{}{}{}\n",
        " ".repeat(Y_AXIS_WIDTH),
        first,
        " ".repeat(gap),
        last
    ));
    Some(out)
}

/// Local time and `sin(altitude)` of every height sample of `body`, one per
/// line. With a `date`, only that local day is listed. Gap markers print as
/// `-`.
pub fn render_heights(body: &AstroBody, date: Option<NaiveDate>) -> String {
    let mut out = format!("{} heights ({})\n", body.body, body.location.timezone);
    for (instant, value) in body.local_heights() {
        if date.is_some_and(|d| instant.date_naive() != d) {
            continue;
        }
        if value.is_nan() {
            out.push_str(&format!("{}       -\n", instant.format("%Y-%m-%d %H:%M:%S")));
        } else {
            out.push_str(&format!("{}  {:.4}\n", instant.format("%Y-%m-%d %H:%M:%S"), value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TideExtremum;
    use chrono::{TimeZone, Utc};

    fn sample_tides() -> TideSeries {
        let at = |h, mi| Utc.with_ymd_and_hms(2016, 1, 1, h, mi, 0).unwrap();
        let extrema = vec![
            TideExtremum { instant: at(1, 5), magnitude: 1.5 },
            TideExtremum { instant: at(7, 20), magnitude: 6.0 },
            TideExtremum { instant: at(13, 50), magnitude: -1.0 },
            TideExtremum { instant: at(20, 15), magnitude: 4.5 },
        ];
        TideSeries::from_extrema(extrema, "UTC", 10).unwrap()
    }

    #[test]
    fn test_format_height() {
        // Test zero
        assert_eq!(format_height(0.0), " 0 ");

        // Test positive values
        assert_eq!(format_height(1.0), "+1");
        assert_eq!(format_height(1.5), "+1.5");

        // Test negative values
        assert_eq!(format_height(-2.0), "-2");
        assert_eq!(format_height(-1.5), "-1.5");
    }

    #[test]
    fn test_clock_missing() {
        assert_eq!(clock(None), "--:--");
        let t = Utc
            .with_ymd_and_hms(2016, 6, 1, 20, 7, 41)
            .unwrap()
            .with_timezone(&chrono_tz::America::Los_Angeles);
        assert_eq!(clock(Some(t)), "13:07");
    }

    #[test]
    fn test_tide_chart_plots_every_sample() {
        let tides = sample_tides();
        let chart = render_tide_chart(&tides, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap())
            .expect("chart for a day with samples");

        assert_eq!(chart.matches('•').count(), tides.all_tides.len());
        assert!(chart.contains("+6"));
        assert!(chart.contains("-1"));
        assert!(chart.contains("01:05"));
        assert!(chart.contains("20:15"));
    }

    #[test]
    fn test_tide_chart_empty_day() {
        let tides = sample_tides();
        assert!(render_tide_chart(&tides, NaiveDate::from_ymd_opt(2016, 2, 1).unwrap()).is_none());
    }
}
