//! Roll and steer angle compensation

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::geom::{normalize_angle, Position2D};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Roll readings smaller than this are sensor noise.
///
/// Units: degrees
pub const ROLL_DEADBAND_DEG: f64 = 0.01;

/// Steer angles smaller than this are not compensated.
///
/// Units: degrees
pub const STEER_DEADBAND_DEG: f64 = 0.1;

/// Steer compensation is only applied below this speed, above it fix-to-fix is reliable.
///
/// Units: meters/second
pub const STEER_COMPENSATION_MAX_SPEED_MS: f64 = 1.0;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lateral distance between the antenna and the ground track caused by the vehicle rolling.
///
/// A positive (right) roll throws the antenna to the right, so the returned correction is
/// negative: the ground track lies to the left of the antenna.
///
/// Units: meters
pub fn roll_correction_distance(roll_deg: f64, antenna_height_m: f64) -> f64 {
    if antenna_height_m == 0.0 || roll_deg.abs() < ROLL_DEADBAND_DEG {
        return 0.0;
    }

    -antenna_height_m * roll_deg.to_radians().sin()
}

/// Move the antenna position onto the ground track using the roll correction.
pub fn roll_corrected_position(
    antenna: &Position2D,
    heading_rad: f64,
    roll_deg: f64,
    antenna_height_m: f64,
) -> Position2D {
    let correction_m = roll_correction_distance(roll_deg, antenna_height_m);

    if correction_m == 0.0 {
        return *antenna;
    }

    antenna
        .with_heading(heading_rad)
        .offset(0.0, correction_m)
        .position()
}

/// Correct the heading for the antenna swinging around the pivot when steering at low speed.
///
/// At near-zero speed the fix-to-fix heading is unreliable, so the commanded steer angle is used
/// as a proxy for the arc the antenna makes around the pivot. The correction is only applied
/// when the vehicle is below [`STEER_COMPENSATION_MAX_SPEED_MS`], the steer angle is outside the
/// [`STEER_DEADBAND_DEG`], the antenna is not on the pivot and the active factor is non-zero.
/// Otherwise the heading is returned as is.
pub fn apply_steer_angle_compensation(
    heading_rad: f64,
    steer_angle_deg: f64,
    speed_ms: f64,
    is_reversing: bool,
    antenna_pivot_m: f64,
    forward_factor: f64,
    reverse_factor: f64,
) -> f64 {
    let factor = if is_reversing {
        reverse_factor
    } else {
        forward_factor
    };

    let active = speed_ms < STEER_COMPENSATION_MAX_SPEED_MS
        && steer_angle_deg.abs() >= STEER_DEADBAND_DEG
        && antenna_pivot_m != 0.0
        && factor != 0.0;

    if !active {
        return heading_rad;
    }

    let compensation_deg = antenna_pivot_m * steer_angle_deg * factor;

    normalize_angle(heading_rad - compensation_deg.to_radians())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::geom::angular_delta;

    #[test]
    fn test_roll_correction_distance() {
        assert_eq!(roll_correction_distance(5.0, 0.0), 0.0);
        assert_eq!(roll_correction_distance(0.005, 3.0), 0.0);
        assert_eq!(roll_correction_distance(-0.009, 3.0), 0.0);

        let right = roll_correction_distance(5.0, 3.0);
        assert!(right < 0.0);
        assert!((right + 3.0 * 5f64.to_radians().sin()).abs() < 1e-12);

        let left = roll_correction_distance(-5.0, 3.0);
        assert!((left + right).abs() < 1e-12);
    }

    #[test]
    fn test_roll_corrected_position() {
        // Heading north, right roll shifts the ground track west
        let p = roll_corrected_position(&Position2D::new(100.0, 100.0), 0.0, 5.0, 3.0);
        assert!(p.easting < 100.0);
        assert!((p.northing - 100.0).abs() < 1e-9);

        let p = roll_corrected_position(&Position2D::new(100.0, 100.0), 0.0, 0.0, 3.0);
        assert_eq!(p, Position2D::new(100.0, 100.0));
    }

    #[test]
    fn test_steer_compensation_noop() {
        let h = 1.0;

        // Too fast
        assert_eq!(apply_steer_angle_compensation(h, 10.0, 1.0, false, 1.5, 1.0, 1.0), h);
        assert_eq!(apply_steer_angle_compensation(h, 10.0, 4.0, false, 1.5, 1.0, 1.0), h);

        // Steer inside the deadband
        assert_eq!(apply_steer_angle_compensation(h, 0.05, 0.5, false, 1.5, 1.0, 1.0), h);

        // Antenna on the pivot
        assert_eq!(apply_steer_angle_compensation(h, 10.0, 0.5, false, 0.0, 1.0, 1.0), h);

        // Active factor is zero
        assert_eq!(apply_steer_angle_compensation(h, 10.0, 0.5, false, 1.5, 0.0, 1.0), h);
        assert_eq!(apply_steer_angle_compensation(h, 10.0, 0.5, true, 1.5, 1.0, 0.0), h);
    }

    #[test]
    fn test_steer_compensation_active() {
        let h = 1.0;

        let out = apply_steer_angle_compensation(h, 10.0, 0.5, false, 1.5, 0.8, 1.0);
        let expected = (1.5f64 * 10.0 * 0.8).to_radians();
        assert!((angular_delta(out, h) - expected).abs() < 1e-12);

        // Reverse uses its own factor
        let out = apply_steer_angle_compensation(h, 10.0, 0.5, true, 1.5, 0.8, 2.0);
        let expected = (1.5f64 * 10.0 * 2.0).to_radians();
        assert!((angular_delta(out, h) - expected).abs() < 1e-12);

        // Result stays normalised
        let out = apply_steer_angle_compensation(0.0, -10.0, 0.5, false, 1.0, 1.0, 1.0);
        assert!((out - 10f64.to_radians()).abs() < 1e-12);
        let out = apply_steer_angle_compensation(0.0, 10.0, 0.5, false, 1.0, 1.0, 1.0);
        assert!(out > 6.0 && out < std::f64::consts::TAU);
    }
}
