//! Boundary clearance checks for sampled paths

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::geom::{distance_to_polygon, point_in_polygon, Position2D, Position3D};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Result of checking a path against the field boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnBoundaryCheck {
    pub is_valid: bool,

    /// Smallest distance from any waypoint to the boundary, `None` if there is no boundary or
    /// the path wasn't checked.
    ///
    /// Units: meters
    pub min_boundary_distance: Option<f64>,

    /// Waypoints which are too close to, or outside, the boundary. Only populated when the
    /// path is invalid.
    pub violations: Vec<Position2D>,

    pub first_violation_index: Option<usize>,

    pub reason: Option<String>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TurnBoundaryCheck {
    /// A check for a path which is valid by the way it was built.
    pub fn valid_by_construction() -> Self {
        Self {
            is_valid: true,
            min_boundary_distance: None,
            violations: Vec::new(),
            first_violation_index: None,
            reason: None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check every waypoint is at least `min_distance_m` from the boundary ring, and inside it when
/// the ring is a polygon. An empty boundary accepts everything.
pub fn validate_waypoints(
    waypoints: &[Position3D],
    boundary: &[Position2D],
    min_distance_m: f64,
) -> TurnBoundaryCheck {
    if boundary.is_empty() {
        return TurnBoundaryCheck::valid_by_construction();
    }

    let mut min_dist: Option<f64> = None;
    let mut violations = Vec::new();
    let mut first_violation_index = None;
    let mut outside = 0usize;

    for (i, wp) in waypoints.iter().enumerate() {
        let pos = wp.position();

        let dist_m = match distance_to_polygon(&pos, boundary) {
            Some((d, _)) => d,
            None => continue,
        };

        min_dist = Some(min_dist.map_or(dist_m, |m| m.min(dist_m)));

        let is_outside = boundary.len() >= 3 && !point_in_polygon(&pos, boundary);
        if is_outside {
            outside += 1;
        }

        if dist_m < min_distance_m || is_outside {
            violations.push(pos);
            first_violation_index.get_or_insert(i);
        }
    }

    let is_valid = violations.is_empty();
    let reason = if is_valid {
        None
    } else if outside > 0 {
        Some(format!("{} waypoints are outside the boundary", outside))
    } else {
        Some(format!(
            "{} waypoints are closer than {:.2} m to the boundary",
            violations.len(),
            min_distance_m
        ))
    };

    TurnBoundaryCheck {
        is_valid,
        min_boundary_distance: min_dist,
        violations,
        first_violation_index,
        reason,
    }
}

/// The waypoint which comes closest to the boundary.
///
/// Returns its index, its distance to the boundary and the nearest boundary point, or `None`
/// for an empty path or boundary. Ties keep the earliest waypoint.
pub fn closest_approach(
    waypoints: &[Position3D],
    boundary: &[Position2D],
) -> Option<(usize, f64, Position2D)> {
    let mut best: Option<(usize, f64, Position2D)> = None;

    for (i, wp) in waypoints.iter().enumerate() {
        if let Some((d, p)) = distance_to_polygon(&wp.position(), boundary) {
            if best.map_or(true, |(_, bd, _)| d < bd) {
                best = Some((i, d, p));
            }
        }
    }

    best
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
