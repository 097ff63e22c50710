//! # Turn Path Planner
//!
//! Plans the path which takes the vehicle from the end of the track it is working to the start
//! of the next one. Planning runs as a small state machine:
//!
//! ```text
//! TrackSelection -> Planning -> StandardDubins -> Done
//!                                              -> GuidedSampling -> Done
//!                                                                -> FallbackKTurn -> Done
//!                            -> T / Y / K template -> Done
//!                                                  -> FallbackKTurn -> Done
//! ```
//!
//! Each request is planned from scratch, the planner holds nothing but its parameters between
//! turns.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod boundary;
mod builder;
mod dubins;
mod guided;
mod params;
mod planner;
mod templates;
mod tracks;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use boundary::{closest_approach, validate_waypoints, TurnBoundaryCheck};
pub use builder::{BuiltPath, PathBuilder};
pub use dubins::{DubinsPath, DubinsPathType};
pub use guided::{plan_boundary_guided, BoundaryGuidedDubinsResult, SamplingStrategy};
pub use params::{RowSkipMode, TurnParameters, TurnStyle};
pub use planner::{PlannerStage, TurnPath, TurnPlanResult, TurnPlanner, TurnRequest};
pub use templates::{k_turn, smooth_waypoints, t_turn, y_turn};
pub use tracks::{select_next_track, NextTrack, TrackLayout, TrackRange};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction of a turn, as seen by the driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    /// Heading decreasing
    Left,

    /// Heading increasing
    Right,
}

/// Errors raised by the turn planner.
///
/// These are reserved for invalid input. A turn which simply cannot be planned is reported in
/// the [`TurnPlanResult`] instead.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Invalid turn parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Alternative row skip mode needs a non-zero number of tracks to skip")]
    ZeroTracksToSkip,

    #[error("Pose {0} is not finite")]
    InvalidPose(&'static str),

    #[error("No Dubins path joins the entry and exit poses")]
    NoDubinsPath,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TurnDirection {
    /// Sign of the heading change, +1 for right (clockwise) and -1 for left.
    pub fn sign(&self) -> f64 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }

    /// Direction which takes the vehicle toward a point `lateral_m` to its right.
    pub fn toward(lateral_m: f64) -> Self {
        if lateral_m < 0.0 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }
}
