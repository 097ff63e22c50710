//! Ordered propagation of a single antenna pose through every linked body

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};

use super::bodies::*;
use super::config::{ToolGeometry, ToolMount, VehicleConfiguration};
use crate::geom::{Position2D, Position3D};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Input to one tick of the chain.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainInput {
    /// Roll corrected antenna position.
    pub antenna: Position2D,

    /// Units: radians
    pub heading_rad: f64,

    /// Units: meters/second
    pub speed_ms: f64,

    /// Distance moved since the previous tick, negative when reversing.
    ///
    /// Units: meters
    pub distance_moved_m: f64,
}

/// The pose of every body in the chain for one tick.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPoses {
    pub pivot: Position3D,

    pub steer_axle: Position3D,

    pub hitch: Position3D,

    /// The tool's pivot, its axle for towed tools.
    pub tool: Position3D,

    /// The tool's working line including its lateral offset.
    pub tool_working: Position3D,

    /// Only present for tow-between tools.
    pub tank: Option<Position3D>,

    pub look_ahead: Position3D,

    /// A trailing body exceeded its jackknife threshold this tick and was snapped into line.
    pub jackknifed: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Propagate the antenna pose through the chain
/// pivot -> steer axle -> hitch -> (rigid | trailing | tank -> tool) -> look-ahead.
///
/// `previous` holds the last tick's poses, which trailing bodies integrate from. With no
/// previous poses the trailing bodies are seeded in line behind the hitch.
pub fn propagate(
    vehicle: &VehicleConfiguration,
    tool: &ToolGeometry,
    input: &ChainInput,
    previous: Option<&BodyPoses>,
) -> BodyPoses {
    let heading_rad = input.heading_rad;
    let dist_m = input.distance_moved_m;

    // Antenna offset from the centreline
    let centre = input
        .antenna
        .with_heading(heading_rad)
        .offset(0.0, -vehicle.antenna_offset_m)
        .position();

    let pivot = pivot_position(&centre, heading_rad, vehicle.antenna_pivot_m);
    let steer_axle = steer_axle_position(&pivot, heading_rad, vehicle.wheelbase_m);

    let hitch = match tool.mount {
        // Front linkage is measured forward from the pivot
        ToolMount::FrontFixed => pivot.offset(tool.hitch_length_m, 0.0),
        _ => hitch_position(&centre, heading_rad, tool.hitch_length_m, vehicle.antenna_pivot_m),
    };

    let mut jackknifed = false;
    let mut tank = None;

    let (tool_pose, working) = match tool.mount {
        ToolMount::Rigid | ToolMount::FrontFixed => {
            let t = rigid_tool_position(&hitch, heading_rad);
            (t, t)
        }
        ToolMount::Trailing => {
            let prev = previous
                .map(|p| p.tool)
                .unwrap_or_else(|| seed_behind(&hitch, tool.trailing_hitch_length_m));

            let step = integrate_trailing(
                &hitch,
                &prev,
                tool.trailing_hitch_length_m,
                dist_m,
                heading_rad,
                TRAILING_JACKKNIFE_THRESHOLD_RAD,
            );
            jackknifed = step.snapped;

            (step.pose, step.pose.offset(tool.tool_to_pivot_length_m, 0.0))
        }
        ToolMount::TowBetween => {
            let prev_tank = previous
                .and_then(|p| p.tank)
                .unwrap_or_else(|| seed_behind(&hitch, tool.tank_hitch_length_m));

            let tank_step = integrate_trailing(
                &hitch,
                &prev_tank,
                tool.tank_hitch_length_m,
                dist_m,
                heading_rad,
                TANK_JACKKNIFE_THRESHOLD_RAD,
            );
            let tank_pose = tank_step.pose;
            tank = Some(tank_pose);

            let prev_tool = match previous {
                Some(p) if p.tank.is_some() => p.tool,
                _ => seed_behind(&tank_pose, tool.trailing_hitch_length_m),
            };

            let tool_step = integrate_trailing(
                &tank_pose,
                &prev_tool,
                tool.trailing_hitch_length_m,
                dist_m,
                tank_pose.heading_rad,
                TRAILING_JACKKNIFE_THRESHOLD_RAD,
            );
            jackknifed = tank_step.snapped || tool_step.snapped;

            (
                tool_step.pose,
                tool_step.pose.offset(tool.tool_to_pivot_length_m, 0.0),
            )
        }
    };

    let tool_working = working.offset(0.0, tool.offset_m);

    let look_ahead = look_ahead_position(
        &pivot,
        heading_rad,
        tool.width_m,
        input.speed_ms,
        vehicle.look_ahead_time_s,
    );

    trace!(
        "Chain: pivot ({:.2}, {:.2}) tool ({:.2}, {:.2}, {:.3}) jackknifed {}",
        pivot.easting,
        pivot.northing,
        tool_pose.easting,
        tool_pose.northing,
        tool_pose.heading_rad,
        jackknifed
    );

    BodyPoses {
        pivot,
        steer_axle,
        hitch,
        tool: tool_pose,
        tool_working,
        tank,
        look_ahead,
        jackknifed,
    }
}

/// Initial pose for a towed body, in line behind the body towing it.
fn seed_behind(hitch: &Position3D, drawbar_length_m: f64) -> Position3D {
    hitch.offset(-drawbar_length_m.abs(), 0.0)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
