//! Pose of each linked body
//!
//! Every function here is pure. Bodies which trail behind a hitch take their pose from the
//! previous tick explicitly, so that the same inputs always give the same outputs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use util::maths::clamp;

use crate::geom::{angular_delta, distance, normalize_angle, Position2D, Position3D};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum angle between a trailing tool and the body towing it before it is considered
/// jackknifed.
///
/// Units: radians
pub const TRAILING_JACKKNIFE_THRESHOLD_RAD: f64 = 1.9;

/// Maximum angle between a towed tank and the vehicle before it is considered jackknifed.
///
/// Units: radians
pub const TANK_JACKKNIFE_THRESHOLD_RAD: f64 = 2.0;

/// Drawbars shorter than this are treated as rigidly mounted.
///
/// Units: meters
const MIN_DRAWBAR_LENGTH_M: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Result of a single integration step of a trailing body.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct TrailingStep {
    pub pose: Position3D,

    /// The body exceeded its jackknife threshold and was snapped back into line.
    pub snapped: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Position of the vehicle's pivot, `antenna_pivot_m` back from the antenna along the heading.
pub fn pivot_position(gps: &Position2D, heading_rad: f64, antenna_pivot_m: f64) -> Position3D {
    gps.with_heading(heading_rad).offset(-antenna_pivot_m, 0.0)
}

/// Position of the steered axle, `wheelbase_m` ahead of the pivot.
pub fn steer_axle_position(pivot: &Position3D, heading_rad: f64, wheelbase_m: f64) -> Position3D {
    pivot.position().with_heading(heading_rad).offset(wheelbase_m, 0.0)
}

/// Position of the hitch, `hitch_length_m + antenna_pivot_m` behind the antenna.
pub fn hitch_position(
    gps: &Position2D,
    heading_rad: f64,
    hitch_length_m: f64,
    antenna_pivot_m: f64,
) -> Position3D {
    let back_m = hitch_length_m + antenna_pivot_m;

    Position3D::new(
        gps.easting - back_m * heading_rad.sin(),
        gps.northing - back_m * heading_rad.cos(),
        heading_rad,
    )
}

/// A rigidly mounted tool sits on the hitch with the vehicle's heading.
pub fn rigid_tool_position(hitch: &Position3D, heading_rad: f64) -> Position3D {
    hitch.position().with_heading(heading_rad)
}

/// Pose of a tool towed from the hitch on a drawbar of `trailing_hitch_length_m`.
///
/// A stationary vehicle (`distance_moved_m == 0`) leaves the tool where it was. Otherwise the
/// tool heading relaxes toward the vehicle heading in proportion to the distance moved over
/// the drawbar length, and diverges from it when reversing. If the angle between the two
/// exceeds `jackknife_threshold_rad` the tool is snapped back in line with the vehicle.
pub fn trailing_tool_position(
    hitch: &Position3D,
    prev_tool: &Position3D,
    trailing_hitch_length_m: f64,
    distance_moved_m: f64,
    vehicle_heading_rad: f64,
    jackknife_threshold_rad: f64,
) -> Position3D {
    integrate_trailing(
        hitch,
        prev_tool,
        trailing_hitch_length_m,
        distance_moved_m,
        vehicle_heading_rad,
        jackknife_threshold_rad,
    )
    .pose
}

/// Pose of a tank towed from the hitch, see [`trailing_tool_position`].
pub fn tank_position(
    hitch: &Position3D,
    prev_tank: &Position3D,
    tank_hitch_length_m: f64,
    distance_moved_m: f64,
    vehicle_heading_rad: f64,
) -> Position3D {
    integrate_trailing(
        hitch,
        prev_tank,
        tank_hitch_length_m,
        distance_moved_m,
        vehicle_heading_rad,
        TANK_JACKKNIFE_THRESHOLD_RAD,
    )
    .pose
}

/// Pose of a tool towed behind a tank.
///
/// Returns the tool's pivot (its axle) and its working position, `tool_to_pivot_length_m`
/// ahead of the pivot along the tool heading.
pub fn tbt_tool_position(
    tank: &Position3D,
    prev_tool: &Position3D,
    trailing_hitch_length_m: f64,
    tool_to_pivot_length_m: f64,
    distance_moved_m: f64,
    tank_heading_rad: f64,
) -> (Position3D, Position3D) {
    let pivot = trailing_tool_position(
        tank,
        prev_tool,
        trailing_hitch_length_m,
        distance_moved_m,
        tank_heading_rad,
        TRAILING_JACKKNIFE_THRESHOLD_RAD,
    );

    (pivot, pivot.offset(tool_to_pivot_length_m, 0.0))
}

/// Point the steering controller aims for, ahead of the pivot by the larger of half the tool
/// width and the distance covered in `look_ahead_time_s`.
pub fn look_ahead_position(
    pivot: &Position3D,
    heading_rad: f64,
    tool_width_m: f64,
    speed_ms: f64,
    look_ahead_time_s: f64,
) -> Position3D {
    let dist_m = (tool_width_m * 0.5).max(speed_ms * look_ahead_time_s);

    pivot.position().with_heading(heading_rad).offset(dist_m, 0.0)
}

/// True if the angle between the implement and the vehicle is strictly greater than the
/// threshold.
pub fn is_jackknifed(
    implement_heading_rad: f64,
    vehicle_heading_rad: f64,
    threshold_rad: f64,
) -> bool {
    angular_delta(implement_heading_rad, vehicle_heading_rad).abs() > threshold_rad
}

/// Distance between two consecutive positions, negative while reversing.
pub fn signed_distance_moved(prev: &Position2D, curr: &Position2D, is_reversing: bool) -> f64 {
    let dist_m = distance(prev, curr);

    if is_reversing {
        -dist_m
    } else {
        dist_m
    }
}

/// Single step of the trailer model `theta += (d / L) * sin(vehicle - theta)`.
pub(crate) fn integrate_trailing(
    hitch: &Position3D,
    prev: &Position3D,
    drawbar_length_m: f64,
    distance_moved_m: f64,
    vehicle_heading_rad: f64,
    jackknife_threshold_rad: f64,
) -> TrailingStep {
    if distance_moved_m == 0.0 {
        return TrailingStep {
            pose: *prev,
            snapped: false,
        };
    }

    let length_m = drawbar_length_m.abs();
    if length_m < MIN_DRAWBAR_LENGTH_M {
        return TrailingStep {
            pose: rigid_tool_position(hitch, vehicle_heading_rad),
            snapped: false,
        };
    }

    let delta_rad = angular_delta(prev.heading_rad, vehicle_heading_rad);
    let mut step_rad = (distance_moved_m / length_m) * delta_rad.sin();

    // Large forward steps would swing the body past the line of the vehicle
    if distance_moved_m > 0.0 {
        step_rad = clamp(&step_rad, &-delta_rad.abs(), &delta_rad.abs());
    }

    let mut heading_rad = normalize_angle(prev.heading_rad + step_rad);

    let snapped = is_jackknifed(heading_rad, vehicle_heading_rad, jackknife_threshold_rad);
    if snapped {
        trace!(
            "Trailing body at {:.3} rad from vehicle, snapping to {:.3}",
            angular_delta(heading_rad, vehicle_heading_rad),
            vehicle_heading_rad
        );
        heading_rad = normalize_angle(vehicle_heading_rad);
    }

    TrailingStep {
        pose: hitch.position().with_heading(heading_rad).offset(-length_m, 0.0),
        snapped,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: &Position3D, e: f64, n: f64) -> bool {
        (a.easting - e).abs() < 1e-9 && (a.northing - n).abs() < 1e-9
    }

    #[test]
    fn test_vehicle_bodies() {
        let gps = Position2D::new(10.0, 20.0);

        let pivot = pivot_position(&gps, 0.0, 1.0);
        assert!(close(&pivot, 10.0, 19.0));

        let axle = steer_axle_position(&pivot, 0.0, 3.0);
        assert!(close(&axle, 10.0, 22.0));

        let hitch = hitch_position(&gps, 0.0, 2.0, 1.0);
        assert!(close(&hitch, 10.0, 17.0));

        let hitch = hitch_position(&gps, FRAC_PI_2, 2.0, 1.0);
        assert!(close(&hitch, 7.0, 20.0));
        assert_eq!(hitch.heading_rad, FRAC_PI_2);

        let tool = rigid_tool_position(&hitch, FRAC_PI_2);
        assert_eq!(tool, hitch);
    }

    #[test]
    fn test_trailing_stationary() {
        let hitch = Position3D::new(0.0, 0.0, 0.0);
        let prev = Position3D::new(0.5, -3.0, 0.3);

        let tool = trailing_tool_position(&hitch, &prev, 3.0, 0.0, 0.0, 1.9);
        assert_eq!(tool, prev);
    }

    #[test]
    fn test_trailing_zero_drawbar() {
        let hitch = Position3D::new(4.0, 5.0, 1.0);
        let prev = Position3D::new(0.0, 0.0, 0.0);

        let tool = trailing_tool_position(&hitch, &prev, 0.0, 1.0, 1.0, 1.9);
        assert_eq!(tool, rigid_tool_position(&hitch, 1.0));
    }

    #[test]
    fn test_trailing_converges_forward() {
        let mut hitch = Position3D::new(0.0, 0.0, 0.0);
        let mut tool = Position3D::new(0.0, -3.0, 0.4);
        let mut last_delta = angular_delta(tool.heading_rad, 0.0).abs();

        for _ in 0..100 {
            hitch = hitch.offset(0.5, 0.0);
            tool = trailing_tool_position(&hitch, &tool, 3.0, 0.5, 0.0, 1.9);

            // Always on the end of the drawbar
            assert!((distance(&hitch.position(), &tool.position()) - 3.0).abs() < 1e-9);

            // Monotonic approach without overshoot
            let delta = angular_delta(tool.heading_rad, 0.0);
            assert!(delta <= 0.0);
            assert!(delta.abs() <= last_delta + 1e-12);
            last_delta = delta.abs();
        }

        assert!(last_delta < 1e-3);

        // A single huge step is limited to reaching alignment
        let tool = trailing_tool_position(
            &hitch,
            &Position3D::new(0.0, 0.0, 0.4),
            1.0,
            50.0,
            0.0,
            1.9,
        );
        assert!(angular_delta(tool.heading_rad, 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_trailing_diverges_reversing() {
        let hitch = Position3D::new(0.0, 0.0, 0.0);
        let prev = Position3D::new(0.0, -3.0, 0.2);

        let tool = trailing_tool_position(&hitch, &prev, 3.0, -0.5, 0.0, 1.9);
        assert!(angular_delta(tool.heading_rad, 0.0).abs() > 0.2);
    }

    #[test]
    fn test_trailing_snaps_on_jackknife() {
        let hitch = Position3D::new(0.0, 0.0, 0.0);
        let prev = Position3D::new(0.0, -3.0, 2.0);

        // Reversing pushes it further past the threshold
        let step = integrate_trailing(&hitch, &prev, 3.0, -0.5, 0.0, TRAILING_JACKKNIFE_THRESHOLD_RAD);
        assert!(step.snapped);
        assert_eq!(step.pose.heading_rad, 0.0);
        assert!(close(&step.pose, 0.0, -3.0));

        // The tank has a wider limit
        let prev = Position3D::new(0.0, -3.0, 1.95);
        let tank = tank_position(&hitch, &prev, 3.0, 0.01, 0.0);
        assert!(tank.heading_rad > 1.9);
    }

    #[test]
    fn test_tbt() {
        let tank = Position3D::new(0.0, -4.0, 0.0);
        let prev = Position3D::new(0.0, -7.0, 0.0);

        let (pivot, working) = tbt_tool_position(&tank, &prev, 3.0, 1.0, 0.5, 0.0);
        assert!(close(&pivot, 0.0, -7.0));
        assert!(close(&working, 0.0, -6.0));
    }

    #[test]
    fn test_look_ahead() {
        let pivot = Position3D::new(0.0, 0.0, 0.0);

        let la = look_ahead_position(&pivot, 0.0, 6.0, 1.0, 2.0);
        assert!(close(&la, 0.0, 3.0));

        let la = look_ahead_position(&pivot, 0.0, 6.0, 5.0, 2.0);
        assert!(close(&la, 0.0, 10.0));
    }

    #[test]
    fn test_is_jackknifed() {
        assert!(!is_jackknifed(0.0, 1.0, 1.0));
        assert!(is_jackknifed(0.0, 1.0, 0.99));
        assert!(is_jackknifed(4.0, 1.0, 1.9));
        assert!(!is_jackknifed(6.2, 0.1, 1.9));
    }

    #[test]
    fn test_signed_distance_moved() {
        let a = Position2D::new(0.0, 0.0);
        let b = Position2D::new(3.0, 4.0);

        assert_eq!(signed_distance_moved(&a, &b, false), 5.0);
        assert_eq!(signed_distance_moved(&a, &b, true), -5.0);
        assert_eq!(signed_distance_moved(&a, &a, true), 0.0);
    }
}
