//! Low-precision Sun and Moon almanac.
//!
//! Truncated analytic theories, good to a few hundredths of a degree for the
//! Sun and about a tenth of a degree for the Moon over a few centuries around
//! J2000. That puts rise/set times within a minute or two and phase instants
//! within a few minutes, which is plenty for a printed calendar.
//!
//! Rise and set are found by scanning the 24-hour window every 10 minutes for
//! a change of sign of `altitude - h0` and refining by bisection, with
//! `h0 = -0.8333°` covering refraction plus the apparent semidiameter. The
//! Moon's altitude is topocentric, so the same `h0` serves both bodies.
//! Lunar phases and seasons are angle crossings found the same way.

use crate::ephemeris::{Body, DailyEvents, Ephemeris, LunarPhase, Observer, Season};
use crate::error::{CalendarError, Result};
use chrono::{DateTime, Utc};

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const DAYS_PER_CENTURY: f64 = 36_525.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
const EARTH_RADIUS_KM: f64 = 6_378.14;
const AU_KM: f64 = 149_597_870.7;

/// Altitude of the body's centre at rise and set (refraction + semidiameter).
const HORIZON_DEGREES: f64 = -0.8333;
/// 10-minute scan for horizon and meridian crossings.
const SCAN_STEPS_PER_DAY: usize = 144;
const BISECTION_ITERATIONS: usize = 32;
/// Closer to a pole than this, the meridian and so the transit are undefined.
const POLE_LIMIT_DEGREES: f64 = 89.99;

const PHASE_SEARCH_STEP_DAYS: f64 = 0.25;
const PHASE_SEARCH_MAX_STEPS: usize = 200;
const SEASON_SEARCH_STEP_DAYS: f64 = 1.0;
const SEASON_SEARCH_MAX_STEPS: usize = 400;

/// TT - UT used to move from civil time to dynamical time.
pub const DEFAULT_DELTA_T_SECONDS: f64 = 69.0;

/// Periodic terms for lunar longitude and distance:
/// multiples of D, M, M', F; longitude coefficient (1e-6 deg);
/// distance coefficient (1e-3 km).
#[rustfmt::skip]
const MOON_LONGITUDE_DISTANCE_TERMS: [(i8, i8, i8, i8, f64, f64); 50] = [
    (0, 0, 1, 0, 6_288_774.0, -20_905_355.0),
    (2, 0, -1, 0, 1_274_027.0, -3_699_111.0),
    (2, 0, 0, 0, 658_314.0, -2_955_968.0),
    (0, 0, 2, 0, 213_618.0, -569_925.0),
    (0, 1, 0, 0, -185_116.0, 48_888.0),
    (0, 0, 0, 2, -114_332.0, -3_149.0),
    (2, 0, -2, 0, 58_793.0, 246_158.0),
    (2, -1, -1, 0, 57_066.0, -152_138.0),
    (2, 0, 1, 0, 53_322.0, -170_733.0),
    (2, -1, 0, 0, 45_758.0, -204_586.0),
    (0, 1, -1, 0, -40_923.0, -129_620.0),
    (1, 0, 0, 0, -34_720.0, 108_743.0),
    (0, 1, 1, 0, -30_383.0, 104_755.0),
    (2, 0, 0, -2, 15_327.0, 10_321.0),
    (0, 0, 1, 2, -12_528.0, 0.0),
    (0, 0, 1, -2, 10_980.0, 79_661.0),
    (4, 0, -1, 0, 10_675.0, -34_782.0),
    (0, 0, 3, 0, 10_034.0, -23_210.0),
    (4, 0, -2, 0, 8_548.0, -21_636.0),
    (2, 1, -1, 0, -7_888.0, 24_208.0),
    (2, 1, 0, 0, -6_766.0, 30_824.0),
    (1, 0, -1, 0, -5_163.0, -8_379.0),
    (1, 1, 0, 0, 4_987.0, -16_675.0),
    (2, -1, 1, 0, 4_036.0, -12_831.0),
    (2, 0, 2, 0, 3_994.0, -10_445.0),
    (4, 0, 0, 0, 3_861.0, -11_650.0),
    (2, 0, -3, 0, 3_665.0, 14_403.0),
    (0, 1, -2, 0, -2_689.0, -7_003.0),
    (2, 0, -1, 2, -2_602.0, 0.0),
    (2, -1, -2, 0, 2_390.0, 10_056.0),
    (1, 0, 1, 0, -2_348.0, 6_322.0),
    (2, -2, 0, 0, 2_236.0, -9_884.0),
    (0, 1, 2, 0, -2_120.0, 5_751.0),
    (0, 2, 0, 0, -2_069.0, 0.0),
    (2, -2, -1, 0, 2_048.0, -4_950.0),
    (2, 0, 1, -2, -1_773.0, 4_130.0),
    (2, 0, 0, 2, -1_595.0, 0.0),
    (4, -1, -1, 0, 1_215.0, -3_958.0),
    (0, 0, 2, 2, -1_110.0, 0.0),
    (3, 0, -1, 0, -892.0, 3_258.0),
    (2, 1, 1, 0, -810.0, 2_616.0),
    (4, -1, -2, 0, 759.0, -1_897.0),
    (0, 2, -1, 0, -713.0, -2_117.0),
    (2, 2, -1, 0, -700.0, 2_354.0),
    (2, 1, -2, 0, 691.0, 0.0),
    (2, -1, 0, -2, 596.0, 0.0),
    (4, 0, 1, 0, 549.0, -1_423.0),
    (0, 0, 4, 0, 537.0, -1_117.0),
    (4, -1, 0, 0, 520.0, -1_571.0),
    (1, 0, -2, 0, -487.0, -1_739.0),
];

/// Periodic terms for lunar latitude: multiples of D, M, M', F; coefficient
/// (1e-6 deg).
#[rustfmt::skip]
const MOON_LATITUDE_TERMS: [(i8, i8, i8, i8, f64); 30] = [
    (0, 0, 0, 1, 5_128_122.0),
    (0, 0, 1, 1, 280_602.0),
    (0, 0, 1, -1, 277_693.0),
    (2, 0, 0, -1, 173_237.0),
    (2, 0, -1, 1, 55_413.0),
    (2, 0, -1, -1, 46_271.0),
    (2, 0, 0, 1, 32_573.0),
    (0, 0, 2, 1, 17_198.0),
    (2, 0, 1, -1, 9_266.0),
    (0, 0, 2, -1, 8_822.0),
    (2, -1, 0, -1, 8_216.0),
    (2, 0, -2, -1, 4_324.0),
    (2, 0, 1, 1, 4_200.0),
    (2, 1, 0, -1, -3_359.0),
    (2, -1, -1, 1, 2_463.0),
    (2, -1, 0, 1, 2_211.0),
    (2, -1, -1, -1, 2_065.0),
    (0, 1, -1, -1, -1_870.0),
    (4, 0, -1, -1, 1_828.0),
    (0, 1, 0, 1, -1_794.0),
    (0, 0, 0, 3, -1_749.0),
    (0, 1, -1, 1, -1_565.0),
    (1, 0, 0, 1, -1_491.0),
    (0, 1, 1, 1, -1_475.0),
    (0, 1, 1, -1, -1_410.0),
    (0, 1, 0, -1, -1_344.0),
    (1, 0, 0, -1, -1_335.0),
    (0, 0, 3, 1, 1_107.0),
    (4, 0, 0, -1, 1_021.0),
    (4, 0, -1, 1, 833.0),
];

/// Geocentric apparent ecliptic position.
#[derive(Clone, Copy, Debug)]
struct Ecliptic {
    /// Degrees, 0..360
    longitude: f64,
    /// Degrees
    latitude: f64,
    distance_km: f64,
}

/// Topocentric position relative to the local horizon and meridian.
#[derive(Clone, Copy, Debug)]
struct Horizontal {
    /// Geometric altitude of the centre, degrees, no refraction
    altitude: f64,
    /// Local hour angle, degrees in [-180, 180)
    hour_angle: f64,
}

/// The bundled [`Ephemeris`].
#[derive(Clone, Copy, Debug)]
pub struct Almanac {
    delta_t_seconds: f64,
}

impl Default for Almanac {
    fn default() -> Self {
        Almanac {
            delta_t_seconds: DEFAULT_DELTA_T_SECONDS,
        }
    }
}

impl Almanac {
    pub fn new() -> Self {
        Self::default()
    }

    /// An almanac with a specific TT - UT difference, in seconds.
    pub fn with_delta_t(delta_t_seconds: f64) -> Self {
        Almanac { delta_t_seconds }
    }

    /// Julian centuries of dynamical time since J2000 for a UT Julian day.
    fn centuries(&self, jd_ut: f64) -> f64 {
        (jd_ut + self.delta_t_seconds / 86_400.0 - J2000) / DAYS_PER_CENTURY
    }

    fn ecliptic(&self, body: Body, jd_ut: f64) -> Ecliptic {
        let t = self.centuries(jd_ut);
        match body {
            Body::Sun => sun_ecliptic(t),
            Body::Moon => moon_ecliptic(t),
        }
    }

    fn horizontal(&self, body: Body, observer: &Observer, jd_ut: f64) -> Horizontal {
        let position = self.ecliptic(body, jd_ut);
        let (right_ascension, declination) =
            to_equatorial(&position, obliquity(self.centuries(jd_ut)));

        let hour_angle = normalize_signed_degrees(
            greenwich_sidereal_degrees(jd_ut) + observer.longitude - right_ascension,
        );

        let phi = observer.latitude.to_radians();
        let delta = declination.to_radians();
        let sin_altitude =
            phi.sin() * delta.sin() + phi.cos() * delta.cos() * hour_angle.to_radians().cos();
        let geocentric = sin_altitude.clamp(-1.0, 1.0).asin();

        // Parallax in altitude; only the Moon's is noticeable
        let parallax = (EARTH_RADIUS_KM / position.distance_km).asin();
        let correction = (parallax.sin() * geocentric.cos()).asin();

        Horizontal {
            altitude: (geocentric - correction).to_degrees(),
            hour_angle,
        }
    }

    /// Moon's apparent longitude minus the Sun's, degrees in [0, 360).
    fn elongation(&self, jd_ut: f64) -> f64 {
        let t = self.centuries(jd_ut);
        normalize_degrees(moon_ecliptic(t).longitude - sun_ecliptic(t).longitude)
    }

    fn sun_longitude(&self, jd_ut: f64) -> f64 {
        sun_ecliptic(self.centuries(jd_ut)).longitude
    }

    fn lunar_phase_search(
        &self,
        phase: LunarPhase,
        from: DateTime<Utc>,
        forward: bool,
    ) -> Result<DateTime<Utc>> {
        let start = julian_day(from);
        let found = search_angle_crossing(
            |jd| self.elongation(jd),
            start,
            phase.elongation_degrees(),
            PHASE_SEARCH_STEP_DAYS,
            PHASE_SEARCH_MAX_STEPS,
            forward,
        );
        match found {
            Some(jd) => instant_of(jd),
            None => {
                tracing::warn!(?phase, %from, forward, "lunar phase search exhausted");
                Err(CalendarError::Ephemeris(format!(
                    "no {phase:?} within {} days of {from}",
                    PHASE_SEARCH_STEP_DAYS * PHASE_SEARCH_MAX_STEPS as f64
                )))
            }
        }
    }
}

impl Ephemeris for Almanac {
    fn daily_events(&self, body: Body, observer: &Observer) -> Result<DailyEvents> {
        let start = julian_day(observer.date);
        let step = 1.0 / SCAN_STEPS_PER_DAY as f64;
        let clearance = |jd: f64| self.horizontal(body, observer, jd).altitude - HORIZON_DEGREES;
        let hour_angle = |jd: f64| self.horizontal(body, observer, jd).hour_angle;
        let meridian_defined = observer.latitude.abs() < POLE_LIMIT_DEGREES;

        let mut events = DailyEvents::default();
        let mut prev_jd = start;
        let mut prev = self.horizontal(body, observer, start);

        for i in 1..=SCAN_STEPS_PER_DAY {
            let jd = start + i as f64 * step;
            let here = self.horizontal(body, observer, jd);
            let was = prev.altitude - HORIZON_DEGREES;
            let now = here.altitude - HORIZON_DEGREES;

            // Every crossing counts: a grazing Moon can rise or set twice
            if was < 0.0 && now >= 0.0 {
                events.rises.push(instant_of(bisect(&clearance, prev_jd, jd))?);
            }
            if was >= 0.0 && now < 0.0 {
                events.sets.push(instant_of(bisect(&clearance, prev_jd, jd))?);
            }
            // Upward zero crossing of the hour angle, not the wrap at 180
            if meridian_defined
                && events.transit.is_none()
                && prev.hour_angle < 0.0
                && here.hour_angle >= 0.0
                && here.hour_angle - prev.hour_angle < 180.0
            {
                events.transit = Some(instant_of(bisect(&hour_angle, prev_jd, jd))?);
            }

            prev_jd = jd;
            prev = here;
        }
        Ok(events)
    }

    fn altitude(&self, body: Body, observer: &Observer) -> f64 {
        let geometric = self
            .horizontal(body, observer, julian_day(observer.date))
            .altitude;
        (geometric + refraction_degrees(geometric)).to_radians()
    }

    fn moon_phase_fraction(&self, observer: &Observer) -> f64 {
        let t = self.centuries(julian_day(observer.date));
        let sun = sun_ecliptic(t);
        let moon = moon_ecliptic(t);

        let cos_psi = moon.latitude.to_radians().cos()
            * (moon.longitude - sun.longitude).to_radians().cos();
        let psi = cos_psi.clamp(-1.0, 1.0).acos();
        let phase_angle = (sun.distance_km * psi.sin())
            .atan2(moon.distance_km - sun.distance_km * psi.cos());
        ((1.0 + phase_angle.cos()) / 2.0).clamp(0.0, 1.0)
    }

    fn next_lunar_phase(&self, phase: LunarPhase, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.lunar_phase_search(phase, after, true)
    }

    fn previous_lunar_phase(
        &self,
        phase: LunarPhase,
        before: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.lunar_phase_search(phase, before, false)
    }

    fn next_season(&self, season: Season, year: i32) -> Result<DateTime<Utc>> {
        let start = new_year_julian_day(year);
        let found = search_angle_crossing(
            |jd| self.sun_longitude(jd),
            start,
            season.solar_longitude_degrees(),
            SEASON_SEARCH_STEP_DAYS,
            SEASON_SEARCH_MAX_STEPS,
            true,
        );
        match found {
            Some(jd) => instant_of(jd),
            None => {
                tracing::warn!(?season, year, "season search exhausted");
                Err(CalendarError::Ephemeris(format!("no {season} found in {year}")))
            }
        }
    }
}

/// Julian day (UT) of an instant.
pub fn julian_day(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JD
}

/// Instant of a Julian day (UT), to the millisecond, or `None` outside the
/// range chrono can represent.
pub fn from_julian_day(jd: f64) -> Option<DateTime<Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * MILLIS_PER_DAY).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn instant_of(jd: f64) -> Result<DateTime<Utc>> {
    from_julian_day(jd).ok_or_else(|| {
        CalendarError::Ephemeris(format!("Julian day {jd} is outside the supported range"))
    })
}

/// Julian day of Jan 1, 00:00 UT of a Gregorian year.
fn new_year_julian_day(year: i32) -> f64 {
    // January counts as month 13 of the previous year
    let y = (year - 1) as f64;
    let month: f64 = 13.0;
    let a = (y / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (y + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + 1.0 + b - 1524.5
}

fn normalize_degrees(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

fn normalize_signed_degrees(angle: f64) -> f64 {
    let a = normalize_degrees(angle);
    if a >= 180.0 {
        a - 360.0
    } else {
        a
    }
}

fn sun_ecliptic(t: f64) -> Ecliptic {
    let mean_longitude = 280.46646 + 36_000.76983 * t + 0.000_303_2 * t * t;
    let mean_anomaly = 357.52911 + 35_999.05029 * t - 0.000_153_7 * t * t;
    let eccentricity = 0.016_708_634 - 0.000_042_037 * t - 0.000_000_126_7 * t * t;

    let m = mean_anomaly.to_radians();
    let centre = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * m.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m).sin()
        + 0.000_289 * (3.0 * m).sin();

    let true_anomaly = (mean_anomaly + centre).to_radians();
    let radius_au = 1.000_001_018 * (1.0 - eccentricity * eccentricity)
        / (1.0 + eccentricity * true_anomaly.cos());

    // Nutation and aberration
    let omega = (125.04 - 1_934.136 * t).to_radians();
    let longitude = mean_longitude + centre - 0.005_69 - 0.004_78 * omega.sin();

    Ecliptic {
        longitude: normalize_degrees(longitude),
        latitude: 0.0,
        distance_km: radius_au * AU_KM,
    }
}

fn moon_ecliptic(t: f64) -> Ecliptic {
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;

    let mean_longitude =
        218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t2 + t3 / 538_841.0
            - t4 / 65_194_000.0;
    let elongation = 297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t2 + t3 / 545_868.0
        - t4 / 113_065_000.0;
    let sun_anomaly = 357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t2 + t3 / 24_490_000.0;
    let moon_anomaly = 134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t2 + t3 / 69_699.0
        - t4 / 14_712_000.0;
    let node_distance = 93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t2
        - t3 / 3_526_000.0
        + t4 / 863_310_000.0;

    let a1 = (119.75 + 131.849 * t).to_radians();
    let a2 = (53.09 + 479_264.290 * t).to_radians();
    let a3 = (313.45 + 481_266.484 * t).to_radians();
    let e = 1.0 - 0.002_516 * t - 0.000_007_4 * t2;

    let argument = |d: i8, m: i8, mp: i8, f: i8| {
        (d as f64 * elongation
            + m as f64 * sun_anomaly
            + mp as f64 * moon_anomaly
            + f as f64 * node_distance)
            .to_radians()
    };
    let eccentricity_factor = |m: i8| match m.abs() {
        0 => 1.0,
        1 => e,
        _ => e * e,
    };

    let mut sum_l = 0.0;
    let mut sum_r = 0.0;
    for &(d, m, mp, f, l, r) in MOON_LONGITUDE_DISTANCE_TERMS.iter() {
        let arg = argument(d, m, mp, f);
        let factor = eccentricity_factor(m);
        sum_l += l * factor * arg.sin();
        sum_r += r * factor * arg.cos();
    }

    let mut sum_b = 0.0;
    for &(d, m, mp, f, b) in MOON_LATITUDE_TERMS.iter() {
        sum_b += b * eccentricity_factor(m) * argument(d, m, mp, f).sin();
    }

    let lp = mean_longitude.to_radians();
    let f = node_distance.to_radians();
    let mp = moon_anomaly.to_radians();

    // Venus, Jupiter and Earth-flattening corrections
    sum_l += 3_958.0 * a1.sin() + 1_962.0 * (lp - f).sin() + 318.0 * a2.sin();
    sum_b += -2_235.0 * lp.sin()
        + 382.0 * a3.sin()
        + 175.0 * (a1 - f).sin()
        + 175.0 * (a1 + f).sin()
        + 127.0 * (lp - mp).sin()
        - 115.0 * (lp + mp).sin();

    let omega = (125.04 - 1_934.136 * t).to_radians();
    let nutation = -0.004_78 * omega.sin();

    Ecliptic {
        longitude: normalize_degrees(mean_longitude + sum_l / 1_000_000.0 + nutation),
        latitude: sum_b / 1_000_000.0,
        distance_km: 385_000.56 + sum_r / 1_000.0,
    }
}

/// Apparent obliquity of the ecliptic, degrees.
fn obliquity(t: f64) -> f64 {
    let omega = (125.04 - 1_934.136 * t).to_radians();
    23.439_291 - 0.013_004_2 * t + 0.002_56 * omega.cos()
}

/// Right ascension and declination, degrees.
fn to_equatorial(position: &Ecliptic, obliquity_degrees: f64) -> (f64, f64) {
    let lambda = position.longitude.to_radians();
    let beta = position.latitude.to_radians();
    let epsilon = obliquity_degrees.to_radians();

    let right_ascension = (lambda.sin() * epsilon.cos() - beta.tan() * epsilon.sin())
        .atan2(lambda.cos())
        .to_degrees();
    let declination = (beta.sin() * epsilon.cos() + beta.cos() * epsilon.sin() * lambda.sin())
        .clamp(-1.0, 1.0)
        .asin()
        .to_degrees();
    (normalize_degrees(right_ascension), declination)
}

/// Greenwich mean sidereal time, degrees.
fn greenwich_sidereal_degrees(jd_ut: f64) -> f64 {
    let d = jd_ut - J2000;
    let t = d / DAYS_PER_CENTURY;
    normalize_degrees(
        280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t - t * t * t / 38_710_000.0,
    )
}

/// Atmospheric refraction for a geometric altitude, degrees.
fn refraction_degrees(altitude: f64) -> f64 {
    if altitude < -1.0 {
        return 0.0;
    }
    let arcminutes = 1.02 / (altitude + 10.3 / (altitude + 5.11)).to_radians().tan();
    arcminutes / 60.0
}

/// Root of `f` between two points where its sign differs.
fn bisect(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let lo_negative = f(lo) < 0.0;
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if (f(mid) < 0.0) == lo_negative {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Step from `start` until the angle `f` passes through `target` while
/// increasing, then bisect. Steps backward in time when `forward` is false.
fn search_angle_crossing(
    f: impl Fn(f64) -> f64,
    start: f64,
    target: f64,
    step: f64,
    max_steps: usize,
    forward: bool,
) -> Option<f64> {
    let offset = |jd: f64| normalize_signed_degrees(f(jd) - target);

    let mut a = start;
    let mut offset_a = offset(a);
    for _ in 0..max_steps {
        let b = if forward { a + step } else { a - step };
        let offset_b = offset(b);
        let (lo, offset_lo, hi, offset_hi) = if forward {
            (a, offset_a, b, offset_b)
        } else {
            (b, offset_b, a, offset_a)
        };
        if offset_lo < 0.0 && offset_hi >= 0.0 && offset_hi - offset_lo < 90.0 {
            return Some(bisect(&offset, lo, hi));
        }
        a = b;
        offset_a = offset_b;
    }
    None
}
