//! Static vehicle and tool geometry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Geometry of the towing vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfiguration {

    // ---- GEOMETRY ----

    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Units: meters
    pub track_width_m: f64,

    /// Distance from the antenna back to the pivot (rear axle centre), positive when the antenna
    /// is ahead of the pivot.
    ///
    /// Units: meters
    pub antenna_pivot_m: f64,

    /// Height of the antenna above the ground, used for roll correction.
    ///
    /// Units: meters
    pub antenna_height_m: f64,

    /// Lateral offset of the antenna from the vehicle centreline, positive to the right.
    ///
    /// Units: meters
    pub antenna_offset_m: f64,

    // ---- STEERING ----

    /// Units: degrees
    pub max_steer_angle_deg: f64,

    /// Gain applied to the steer angle compensation while driving forward.
    pub steer_comp_forward_factor: f64,

    /// Gain applied to the steer angle compensation while reversing.
    pub steer_comp_reverse_factor: f64,

    // ---- CONTROLLER ----
    //
    // Consumed by the steering controller, which lives outside this crate.

    pub stanley_gain: f64,

    pub pure_pursuit_gain: f64,

    /// Time ahead of the pivot used to place the look-ahead point.
    ///
    /// Units: seconds
    pub look_ahead_time_s: f64,
}

/// Geometry of the implement and, for tow-between setups, the tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolGeometry {
    /// Distance from the vehicle pivot back to the hitch point.
    ///
    /// Units: meters
    pub hitch_length_m: f64,

    /// Length of the drawbar between the hitch and the tool's axle.
    ///
    /// Units: meters
    pub trailing_hitch_length_m: f64,

    /// Length of the drawbar between the hitch and the tank's axle, only used when the tool is
    /// towed behind a tank.
    ///
    /// Units: meters
    pub tank_hitch_length_m: f64,

    /// Distance from the tool's axle forward to its working line.
    ///
    /// Units: meters
    pub tool_to_pivot_length_m: f64,

    /// Units: meters
    pub width_m: f64,

    /// Lateral offset of the tool, positive to the right.
    ///
    /// Units: meters
    pub offset_m: f64,

    pub mount: ToolMount,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How the tool is attached to the vehicle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolMount {
    /// Three point linkage at the rear, moves with the vehicle.
    Rigid,

    /// Front linkage, moves with the vehicle.
    FrontFixed,

    /// Drawbar towed, follows the hitch.
    Trailing,

    /// Tow between tool: a tank is towed from the hitch and the tool is towed from the tank.
    TowBetween,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for VehicleConfiguration {
    fn default() -> Self {
        Self {
            wheelbase_m: 3.3,
            track_width_m: 1.9,
            antenna_pivot_m: 0.1,
            antenna_height_m: 3.0,
            antenna_offset_m: 0.0,
            max_steer_angle_deg: 35.0,
            steer_comp_forward_factor: 0.0,
            steer_comp_reverse_factor: 0.0,
            stanley_gain: 0.8,
            pure_pursuit_gain: 1.0,
            look_ahead_time_s: 2.0,
        }
    }
}

impl Default for ToolGeometry {
    fn default() -> Self {
        Self {
            hitch_length_m: 1.8,
            trailing_hitch_length_m: 2.5,
            tank_hitch_length_m: 3.0,
            tool_to_pivot_length_m: 0.0,
            width_m: 6.0,
            offset_m: 0.0,
            mount: ToolMount::Rigid,
        }
    }
}

impl ToolMount {
    /// Build the mount from the individual flags stored in tool profiles.
    ///
    /// Tow-between implies trailing, so it takes precedence. A tool with no flag set is rigid.
    pub fn from_flags(is_trailing: bool, is_rigid: bool, is_front_fixed: bool, is_tbt: bool) -> Self {
        match (is_trailing, is_rigid, is_front_fixed, is_tbt) {
            (_, _, _, true) => ToolMount::TowBetween,
            (true, _, _, false) => ToolMount::Trailing,
            (false, _, true, false) => ToolMount::FrontFixed,
            (false, _, false, false) => ToolMount::Rigid,
        }
    }

    /// True if the tool's pose depends on the previous tick.
    pub fn is_trailing(&self) -> bool {
        matches!(self, ToolMount::Trailing | ToolMount::TowBetween)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
