//! # Vehicle Kinematics
//!
//! Given a single antenna pose and the static geometry of the vehicle and its tool, compute the
//! pose of every mechanically linked body:
//!
//! ```text
//! antenna -> pivot -> steer axle
//!                  -> hitch -> tool                 (rigid, front fixed)
//!                  -> hitch -> tool                 (trailing)
//!                  -> hitch -> tank -> tool         (tow between)
//!         -> look-ahead
//! ```
//!
//! Moving a distance `d` along heading `h` adds `d sin h` to the easting and `d cos h` to the
//! northing. Trailing bodies are integrated from their previous pose, which callers hold and
//! pass back in, so nothing in this module keeps state between ticks.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod bodies;
mod chain;
mod config;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use bodies::{
    hitch_position, is_jackknifed, look_ahead_position, pivot_position, rigid_tool_position,
    signed_distance_moved, steer_axle_position, tank_position, tbt_tool_position,
    trailing_tool_position, TANK_JACKKNIFE_THRESHOLD_RAD, TRAILING_JACKKNIFE_THRESHOLD_RAD,
};
pub use chain::{propagate, BodyPoses, ChainInput};
pub use config::{ToolGeometry, ToolMount, VehicleConfiguration};
