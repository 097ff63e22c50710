//! # Guidance Executable Parameters
//!
//! This module provides parameters for the replay executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use guid_lib::{geom::Position2D, turn::TrackLayout};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidExecParams {
    /// Tracks to be worked.
    pub layout: TrackLayout,

    /// Index of the first track worked.
    pub first_track: i32,

    /// Index of the last track in the field.
    pub last_track: i32,

    /// Length of every pass along a track.
    ///
    /// Units: meters
    pub pass_length_m: f64,

    /// Speed the simulated vehicle drives the passes at.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Period between simulated sensor samples.
    ///
    /// Units: seconds
    pub tick_period_s: f64,

    /// Maximum number of passes to simulate.
    pub max_passes: usize,

    /// Field boundary ring. Empty for an open field.
    #[serde(default)]
    pub boundary: Vec<Position2D>,
}
