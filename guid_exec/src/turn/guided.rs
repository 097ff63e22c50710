//! Boundary guided Dubins sampling
//!
//! When the shortest Dubins path comes too close to the field boundary, the point of closest
//! approach is used to guide a search for a path with more clearance. Two strategies are
//! available, picked from the direction the boundary pushes the path:
//!
//! - Across the direction of travel (a boundary spike or a narrow headland corner): an
//!   intermediate pose is inserted away from the boundary and the turn is planned through it
//!   as two Dubins legs.
//! - Along the direction of travel (the turn overruns the headland): the vehicle reverses back
//!   down the current track, turns, and reverses back up the next one onto the exit.
//!
//! Each iteration pushes further than the last, up to a hard iteration limit.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::{
    boundary::{closest_approach, validate_waypoints},
    builder::PathBuilder,
    dubins::DubinsPath,
    params::TurnParameters,
    TurnDirection, TurnError,
};
use crate::geom::{
    dot, heading_to_vector, perpendicular_left, point_in_polygon, try_normalize, Position2D,
    Position3D,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Above this alignment between the push direction and the entry heading the boundary is
/// considered to lie ahead of the turn.
const HEADLAND_ALIGNMENT: f64 = 0.7;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundaryGuidedDubinsResult {
    pub succeeded: bool,

    /// Waypoints of the successful path.
    pub result_path: Option<Vec<Position3D>>,

    /// Reverse spans of the successful path, see [`super::BuiltPath::reverse_spans`].
    #[serde(default)]
    pub reverse_spans: Vec<(usize, usize)>,

    /// Length of the successful path.
    ///
    /// Units: meters
    pub total_length: f64,

    /// The poses the last attempted path was guided through.
    pub intermediate_waypoints: Vec<Position3D>,

    /// The leg planned toward the guide pose, one per iteration.
    pub dubins_segments: Vec<DubinsPath>,

    pub iteration_count: usize,

    pub strategy: Option<SamplingStrategy>,

    /// Clearance of the last attempted path.
    ///
    /// Units: meters
    pub min_boundary_distance: Option<f64>,
}

/// A single attempt at a guided path.
struct Attempt {
    waypoints: Vec<Position3D>,
    total_length: f64,
    reverse_spans: Vec<(usize, usize)>,
    guides: Vec<Position3D>,
    segment: DubinsPath,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingStrategy {
    /// Plan through an intermediate pose pushed away from the boundary
    ViaPointOffset,

    /// Start the turn earlier and finish it later
    InwardShift,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Search for a path from `entry` to `exit` which keeps clear of the boundary, using the
/// closest approach of the rejected `standard` path as a guide.
pub fn plan_boundary_guided(
    entry: &Position3D,
    exit: &Position3D,
    standard: &DubinsPath,
    boundary: &[Position2D],
    radius_m: f64,
    params: &TurnParameters,
    preferred: Option<TurnDirection>,
) -> Result<BoundaryGuidedDubinsResult, TurnError> {
    let mut result = BoundaryGuidedDubinsResult::default();

    let (idx, _, nearest) = match closest_approach(&standard.waypoints, boundary) {
        Some(c) => c,
        None => return Ok(result),
    };

    let closest = standard.waypoints[idx];
    let away = push_direction(&closest, &nearest, boundary);

    let strategy = if dot(&away, &heading_to_vector(entry.heading_rad)).abs() > HEADLAND_ALIGNMENT
    {
        SamplingStrategy::InwardShift
    } else {
        SamplingStrategy::ViaPointOffset
    };
    result.strategy = Some(strategy);

    debug!(
        "Guided sampling with {:?} around waypoint {} ({:.2}, {:.2})",
        strategy, idx, closest.easting, closest.northing
    );

    let min_dist_m = params.boundary_min_distance_m;
    let spacing_m = params.waypoint_spacing_m;

    for k in 1..=params.max_sampling_iterations {
        result.iteration_count = k;

        let attempt = match strategy {
            SamplingStrategy::InwardShift => {
                let shift_m = k as f64 * radius_m * 0.5;
                let start = entry.offset(-shift_m, 0.0);
                let end = exit.offset(shift_m, 0.0);

                let path = DubinsPath::shortest(&start, &end, radius_m, spacing_m, preferred)?;

                // Join the shifted turn back onto the entry and exit
                let mut builder = PathBuilder::new(*entry, spacing_m);
                builder
                    .straight(-shift_m)
                    .follow(&path.waypoints, path.total_length)
                    .straight(-shift_m)
                    .snap_end(*exit);
                let built = builder.build();

                Attempt {
                    waypoints: built.waypoints,
                    total_length: built.length_m,
                    reverse_spans: built.reverse_spans,
                    guides: vec![start, end],
                    segment: path,
                }
            }
            SamplingStrategy::ViaPointOffset => {
                let push_m = min_dist_m.max(spacing_m) * (1.0 + 0.5 * k as f64);
                let via_pos = Position2D::from(nearest.to_vector() + away * push_m);
                let via = via_pos.with_heading(closest.heading_rad);

                let leg_in = DubinsPath::shortest(entry, &via, radius_m, spacing_m, preferred)?;
                let leg_out = DubinsPath::shortest(&via, exit, radius_m, spacing_m, preferred)?;

                let mut waypoints = leg_in.waypoints.clone();
                waypoints.extend(leg_out.waypoints.iter().skip(1));

                Attempt {
                    waypoints,
                    total_length: leg_in.total_length + leg_out.total_length,
                    reverse_spans: Vec::new(),
                    guides: vec![via],
                    segment: leg_in,
                }
            }
        };

        let check = validate_waypoints(&attempt.waypoints, boundary, min_dist_m);

        result.min_boundary_distance = check.min_boundary_distance;
        result.intermediate_waypoints = attempt.guides;
        result.dubins_segments.push(attempt.segment);

        if check.is_valid {
            debug!(
                "Guided sampling succeeded after {} iterations with {:?} m clearance",
                k, check.min_boundary_distance
            );

            result.succeeded = true;
            result.total_length = attempt.total_length;
            result.reverse_spans = attempt.reverse_spans;
            result.result_path = Some(attempt.waypoints);
            break;
        }

        trace!("Iteration {} rejected: {:?}", k, check.reason);
    }

    Ok(result)
}

/// Unit vector pointing from the boundary into the field at the closest approach.
fn push_direction(closest: &Position3D, nearest: &Position2D, boundary: &[Position2D]) -> Vector2<f64> {
    let mut away = closest.to_vector() - nearest.to_vector();

    if boundary.len() >= 3 && !point_in_polygon(&closest.position(), boundary) {
        away = -away;
    }

    if let Some(a) = try_normalize(&away) {
        return a;
    }

    // Sitting on the boundary, head for the middle of the field instead
    let centroid = boundary
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.to_vector())
        / boundary.len().max(1) as f64;

    try_normalize(&(centroid - closest.to_vector()))
        .unwrap_or_else(|| perpendicular_left(&heading_to_vector(closest.heading_rad)))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
