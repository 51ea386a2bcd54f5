//! # Half-Sine Interpolation
//!
//! Tide tables only give the time and height of each high and low. Between
//! two extrema the water moves roughly like half a sine wave: slowly near the
//! turn, fastest at mid-tide. [`sine_interp`] reproduces that shape between
//! any two heights, hitting both endpoints exactly.
//!
//! ```text
//!  h1 ●‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//!      ‾‾●.
//!          `●.
//!             `●.
//!                `●.
//!                   `●.__
//!  h2                     ‾‾●___________________
//! ```

use crate::error::{CalendarError, Result};
use std::f64::consts::{FRAC_PI_2, PI};

/// Endpoints must match to this many decimal places.
const ENDPOINT_TOLERANCE: f64 = 0.5e-8;

/// `n` evenly spaced values from `start` to `stop`, both included.
///
/// The last value is exactly `stop`, not `start + (n - 1) * step`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}

/// Interpolate a half sine wave between two heights.
///
/// Returns `resolution` values with `y[0] == height1` and
/// `y[resolution - 1] == height2` (to 8 decimal places). The wave runs
/// trough-to-peak when `height1 < height2`, peak-to-trough when
/// `height1 > height2`, and is flat when they are equal.
///
/// With `remove_end` the final value is dropped, leaving `resolution - 1`
/// values. That is what consecutive segments need when they are concatenated,
/// since the next segment starts at the same height.
///
/// # Errors
/// [`CalendarError::InvalidResolution`] if `resolution <= 2`.
///
/// # Example
/// ```
/// use tide_calendar_lib::interpolate::sine_interp;
///
/// let y = sine_interp(-1.2, -6.2, 5, false).unwrap();
/// let expected = [-1.2, -1.93223305, -3.7, -5.46776695, -6.2];
/// for (got, want) in y.iter().zip(expected) {
///     assert!((got - want).abs() < 1e-8);
/// }
/// ```
pub fn sine_interp(
    height1: f64,
    height2: f64,
    resolution: usize,
    remove_end: bool,
) -> Result<Vec<f64>> {
    if resolution <= 2 {
        return Err(CalendarError::InvalidResolution(resolution));
    }

    let amplitude = (height1.max(height2) - height1.min(height2)) / 2.0;
    let bump = height1.max(height2) - amplitude; // vertical offset

    let phases = if height1 < height2 {
        // -pi/2 to pi/2 => trough-to-peak
        linspace(-FRAC_PI_2, FRAC_PI_2, resolution)
    } else {
        // pi/2 to 3pi/2 => peak-to-trough
        linspace(FRAC_PI_2, 1.5 * PI, resolution)
    };

    let mut y: Vec<f64> = phases.iter().map(|x| amplitude * x.sin() + bump).collect();

    if (y[0] - height1).abs() > ENDPOINT_TOLERANCE
        || (y[resolution - 1] - height2).abs() > ENDPOINT_TOLERANCE
    {
        return Err(CalendarError::Invariant(format!(
            "sine interpolation from {height1} to {height2} produced endpoints {} and {}",
            y[0],
            y[resolution - 1]
        )));
    }

    if remove_end {
        y.truncate(resolution - 1);
    }
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(got: &[f64], want: &[f64]) {
        assert_eq!(got.len(), want.len(), "length differs: {got:?} vs {want:?}");
        for (g, w) in got.iter().zip(want) {
            assert!((g - w).abs() < 1e-8, "{got:?} != {want:?}");
        }
    }

    #[test]
    fn test_falling_negative_heights() {
        let y = sine_interp(-1.2, -6.2, 5, false).unwrap();
        assert_close(&y, &[-1.2, -1.93223305, -3.7, -5.46776695, -6.2]);
    }

    #[test]
    fn test_falling_positive_heights() {
        let y = sine_interp(6.2, 1.2, 5, false).unwrap();
        assert_close(&y, &[6.2, 5.46776695, 3.7, 1.93223305, 1.2]);
    }

    #[test]
    fn test_rising_heights() {
        let y = sine_interp(-6.2, -1.2, 5, false).unwrap();
        assert_close(&y, &[-6.2, -5.46776695, -3.7, -1.93223305, -1.2]);
    }

    #[test]
    fn test_remove_end_drops_only_the_last_value() {
        let full = sine_interp(-6.2, -1.2, 5, false).unwrap();
        let trimmed = sine_interp(-6.2, -1.2, 5, true).unwrap();
        assert_eq!(trimmed.len(), 4);
        assert_eq!(trimmed[..], full[..4]);
    }

    #[test]
    fn test_flat_line() {
        let y = sine_interp(3.3, 3.3, 7, false).unwrap();
        assert!(y.iter().all(|v| (v - 3.3).abs() < 1e-12));
    }

    #[test]
    fn test_monotonic_both_directions() {
        let pairs = [(0.1, 9.7), (-2.0, 4.5), (8.25, -1.5), (5.0, 4.999)];
        for (h1, h2) in pairs {
            let y = sine_interp(h1, h2, 20, false).unwrap();
            assert!((y[0] - h1).abs() < 1e-8);
            assert!((y[19] - h2).abs() < 1e-8);
            for w in y.windows(2) {
                if h1 < h2 {
                    assert!(w[1] >= w[0] - 1e-12, "not rising: {y:?}");
                } else {
                    assert!(w[1] <= w[0] + 1e-12, "not falling: {y:?}");
                }
            }
        }
    }

    #[test]
    fn test_resolution_must_exceed_two() {
        for resolution in [0, 1, 2] {
            assert_eq!(
                sine_interp(1.0, 2.0, resolution, false).unwrap_err(),
                CalendarError::InvalidResolution(resolution)
            );
        }
        assert_eq!(sine_interp(1.0, 2.0, 3, false).unwrap().len(), 3);
    }

    #[test]
    fn test_linspace_endpoints() {
        let x = linspace(0.0, 1.0, 4);
        assert_close(&x, &[0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]);
        assert_eq!(*x.last().unwrap(), 1.0);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }
}
