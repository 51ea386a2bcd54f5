//! # Event and Altitude Stitching
//!
//! Builds the year-long series for one body out of per-day ephemeris queries.
//!
//! ## Daily Events
//! [`rise_noon_set`] walks the year one day at a time. Each day contributes
//! between zero and three labelled points (rise, transit, set) in
//! chronological order. Fewer than three is normal: the Moon skips a rise
//! and a set about once a month, and near the poles the Sun can go days
//! without either.
//!
//! ## Altitude Curve
//! [`altitude_curve`] samples the body's altitude only while it is up. The
//! rise and set instants are split apart and planned into segments:
//!
//! | Segment        | From          | To          | When                              |
//! |----------------|---------------|-------------|-----------------------------------|
//! | `AlreadyRisen` | year start    | first set   | first set comes before first rise |
//! | `RiseToSet`    | rise          | set         | every positional pair             |
//! | `StillRisen`   | last rise     | year end    | one rise left over before the end |
//!
//! Each segment is sampled every `step` by [`fill_in_heights`] and closed with
//! a `NaN` gap marker so a plotted line breaks across the night. Samples that
//! still come out below the horizon (the rise and set instants themselves,
//! mostly) are overwritten with `NaN` afterwards.

use crate::ephemeris::{Body, Ephemeris, Observer};
use crate::error::{CalendarError, Result};
use crate::year_bounds::YearBounds;
use crate::{AltitudeSample, EventLabel, EventPoint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Two instants closer than this are the same sample time.
const SAME_INSTANT_MILLIS: i64 = 100;

/// The labelled events of `body` in the 24 hours starting at `observer.date`.
pub fn day_events<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    body: Body,
    observer: &Observer,
) -> Result<Vec<EventPoint>> {
    Ok(ephemeris
        .daily_events(body, observer)?
        .into_event_points(body.transit_label()))
}

/// Every rise, transit and set of `body` from `bounds.start` through
/// `bounds.end`, in chronological order.
///
/// The caller's observer is only read; the walk happens on a copy.
pub fn rise_noon_set<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    body: Body,
    observer: &Observer,
    bounds: &YearBounds,
) -> Result<Vec<EventPoint>> {
    let mut walker = observer.at(bounds.start);
    let mut events = Vec::with_capacity(3 * 366);

    while walker.date <= bounds.end {
        events.extend(day_events(ephemeris, body, &walker)?);
        walker.advance(Duration::days(1));
    }

    tracing::debug!(%body, count = events.len(), "collected daily events");
    Ok(events)
}

/// `sin(altitude)` samples of `body` from `start` to `stop`.
///
/// Samples every `step` while more than 100 ms remain, then once more at
/// exactly `stop`. With `append_gap` a `NaN` marker follows at
/// `stop + step / 100`.
///
/// # Errors
/// - [`CalendarError::NegativeInterval`] if `stop < start`
/// - [`CalendarError::Invariant`] if `step` is not positive
pub fn fill_in_heights<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    body: Body,
    observer: &Observer,
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    step: Duration,
    append_gap: bool,
) -> Result<Vec<AltitudeSample>> {
    if stop < start {
        return Err(CalendarError::NegativeInterval { start, stop });
    }
    if step <= Duration::zero() {
        return Err(CalendarError::Invariant(format!(
            "altitude step must be positive, got {step}"
        )));
    }

    let sample = |at: &Observer| AltitudeSample {
        instant: at.date,
        value: ephemeris.altitude(body, at).sin(),
    };

    let mut cursor = observer.at(start);
    let mut samples = Vec::new();
    while stop - cursor.date > Duration::milliseconds(SAME_INSTANT_MILLIS) {
        samples.push(sample(&cursor));
        cursor.advance(step);
    }

    cursor.date = stop;
    samples.push(sample(&cursor));

    if append_gap {
        samples.push(AltitudeSample {
            instant: stop + step / 100,
            value: f64::NAN,
        });
    }
    Ok(samples)
}

/// One stretch of time during which the body is above the horizon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    /// Up at the start of the year until its first set.
    AlreadyRisen { set: DateTime<Utc> },
    /// A regular rise followed by its set.
    RiseToSet {
        rise: DateTime<Utc>,
        set: DateTime<Utc>,
    },
    /// Rose for the last time and is still up when the year ends.
    StillRisen { rise: DateTime<Utc> },
}

impl Segment {
    /// The start and stop instants of this segment within `bounds`.
    pub fn span(&self, bounds: &YearBounds) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            Segment::AlreadyRisen { set } => (bounds.start, set),
            Segment::RiseToSet { rise, set } => (rise, set),
            Segment::StillRisen { rise } => (rise, bounds.end),
        }
    }
}

/// Pair up rise and set instants into above-horizon segments.
///
/// Both lists must be in chronological order.
///
/// # Errors
/// - [`CalendarError::NonMonotonicPair`] if a paired rise is not before its set
/// - [`CalendarError::LengthMismatch`] if sets outnumber rises once a leading
///   set is accounted for, or more than one rise is left unpaired
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_calendar_lib::stitch::{plan_segments, Segment};
/// use tide_calendar_lib::year_bounds::utc_year_bounds;
///
/// let bounds = utc_year_bounds("UTC", 2016).unwrap();
/// let t = |d| Utc.with_ymd_and_hms(2016, 1, d, 12, 0, 0).unwrap();
///
/// // Up at midnight Jan 1: the first set has no rise before it
/// let segments = plan_segments(&[t(2)], &[t(1), t(3)], &bounds).unwrap();
/// assert_eq!(
///     segments,
///     vec![
///         Segment::AlreadyRisen { set: t(1) },
///         Segment::RiseToSet { rise: t(2), set: t(3) },
///     ]
/// );
/// ```
pub fn plan_segments(
    rises: &[DateTime<Utc>],
    sets: &[DateTime<Utc>],
    bounds: &YearBounds,
) -> Result<Vec<Segment>> {
    let mut segments = Vec::with_capacity(rises.len() + 1);
    let mut sets = sets;

    if let Some(&first_set) = sets.first() {
        let set_comes_first = rises.first().map_or(true, |&first_rise| first_set < first_rise);
        if set_comes_first {
            segments.push(Segment::AlreadyRisen { set: first_set });
            sets = &sets[1..];
        }
    }

    if sets.len() > rises.len() || rises.len() > sets.len() + 1 {
        return Err(CalendarError::LengthMismatch {
            what: "rise/set",
            left: rises.len(),
            right: sets.len(),
        });
    }

    for (&rise, &set) in rises.iter().zip(sets) {
        if rise >= set {
            return Err(CalendarError::NonMonotonicPair {
                what: "rise/set",
                first: rise,
                second: set,
            });
        }
        segments.push(Segment::RiseToSet { rise, set });
    }

    if rises.len() == sets.len() + 1 {
        let last_rise = rises[rises.len() - 1];
        if last_rise < bounds.end {
            segments.push(Segment::StillRisen { rise: last_rise });
        }
    }

    Ok(segments)
}

/// Year-long altitude curve of `body`, sampled every `step` while it is up.
///
/// `events` is the output of [`rise_noon_set`] for the same body and bounds.
/// Every segment ends with a `NaN` gap marker, and any negative sample is
/// replaced by `NaN`.
pub fn altitude_curve<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    body: Body,
    observer: &Observer,
    events: &[EventPoint],
    bounds: &YearBounds,
    step: Duration,
) -> Result<Vec<AltitudeSample>> {
    let instants_of = |label: EventLabel| -> Vec<DateTime<Utc>> {
        events
            .iter()
            .filter(|e| e.label == label)
            .map(|e| e.instant)
            .collect()
    };
    let rises = instants_of(EventLabel::Rise);
    let sets = instants_of(EventLabel::Set);

    let segments = plan_segments(&rises, &sets, bounds)?;

    let mut heights = Vec::new();
    let mut interior_negatives = 0usize;
    for segment in &segments {
        let (start, stop) = segment.span(bounds);
        let samples = fill_in_heights(ephemeris, body, observer, start, stop, step, true)?;

        // Everything except the first sample, the stop sample and the gap
        if samples.len() > 3 {
            interior_negatives += samples[1..samples.len() - 2]
                .iter()
                .filter(|s| s.value < 0.0)
                .count();
        }
        heights.extend(samples);
    }

    let mut discarded = 0usize;
    for sample in heights.iter_mut() {
        if sample.value < 0.0 {
            sample.value = f64::NAN;
            discarded += 1;
        }
    }

    tracing::debug!(
        %body,
        segments = segments.len(),
        samples = heights.len(),
        discarded,
        interior_negatives,
        "densified altitude curve"
    );
    Ok(heights)
}
