//! # Guidance Pipeline
//!
//! Per tick driver which turns one sensor sample into a vehicle heading and the pose of every
//! linked body. The pipeline owns the session state of the heading estimator and the previous
//! tick's body poses, which the trailing bodies are integrated from.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    geom::Position2D,
    heading::{HeadingError, HeadingParams, HeadingUpdate},
    kinematics::{BodyPoses, ToolGeometry, VehicleConfiguration},
};

pub use state::GuidancePipeline;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameter files loaded by the pipeline, relative to the params directory.
#[derive(Debug, Copy, Clone)]
pub struct ParamFiles {
    pub vehicle: &'static str,
    pub tool: &'static str,
    pub heading: &'static str,
}

/// The configuration the pipeline was initialised with, archived into the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub vehicle: VehicleConfiguration,
    pub tool: ToolGeometry,
    pub heading: HeadingParams,
}

/// One tick of sensor data.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSample {
    /// Antenna position fix.
    pub fix: Position2D,

    /// Units: meters/second
    pub speed_ms: f64,

    /// Course over ground, if the receiver reported one.
    ///
    /// Units: degrees
    pub vtg_heading_deg: Option<f64>,

    /// Units: degrees
    pub dual_heading_deg: Option<f64>,

    /// Units: degrees
    pub imu_heading_deg: Option<f64>,

    /// Units: degrees, positive rolling right
    pub imu_roll_deg: Option<f64>,

    /// Units: degrees
    pub steer_angle_deg: f64,

    pub is_reversing: bool,
}

/// Output of one tick.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub heading: HeadingUpdate,

    pub poses: BodyPoses,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// A trailing body was snapped into line this tick.
    pub jackknifed: bool,

    /// The fix moved less than the minimum distance and the previous heading was kept.
    pub heading_held: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Could not load the pipeline parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Heading estimation failed: {0}")]
    HeadingError(#[from] HeadingError),

    #[error("Sample field {0} is not a finite value")]
    InvalidSample(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ParamFiles {
    fn default() -> Self {
        Self {
            vehicle: "vehicle.toml",
            tool: "tool.toml",
            heading: "heading.toml",
        }
    }
}
