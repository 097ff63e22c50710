//! # Guidance library.
//!
//! The agricultural guidance core: heading estimation, vehicle and tool kinematics and headland
//! turn planning. Used by the `guid_exec` replay executable and the benchmarks.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Geometry - positions, headings and planar vector helpers
pub mod geom;

/// Heading estimator - turns raw positioning samples into a vehicle heading
pub mod heading;

/// Kinematics - poses of the pivot, hitch, tool and tank from the antenna pose
pub mod kinematics;

/// Guidance pipeline - runs heading estimation and kinematics once per sensor tick
pub mod pipeline;

/// Turn planner - paths between adjacent tracks at the headland
pub mod turn;
