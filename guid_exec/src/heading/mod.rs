//! # Heading Estimator
//!
//! Turns raw positioning samples (GPS fixes, VTG course over ground, dual antenna and IMU
//! headings) into a single normalised vehicle heading, attributing each update to the source it
//! came from.
//!
//! The estimator keeps a small amount of session state (the last heading produced and the
//! running IMU to GPS offset). All other operations in this module are pure.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod compensation;
mod estimator;
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use compensation::*;
pub use estimator::*;
pub use params::HeadingParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A heading produced by the estimator, tagged with the source it was computed from.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingUpdate {
    /// Units: radians, `[0, 2pi)`
    pub heading_rad: f64,

    pub source: HeadingSource,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The sensor a heading was derived from.
///
/// This is attribution only, headings from all sources share the same convention.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingSource {
    /// Displacement between two consecutive position fixes
    FixToFix,

    /// Course over ground from the receiver's VTG sentence
    Vtg,

    /// Heading from the baseline between two antennas
    DualAntenna,

    /// IMU heading corrected by GPS
    Fused,
}

/// Errors which can occur while estimating heading.
#[derive(Debug, thiserror::Error)]
pub enum HeadingError {
    #[error("Sample {0} is not a finite value")]
    InvalidSample(&'static str),

    #[error("Invalid argument {name}: {value}")]
    InvalidArgument { name: &'static str, value: f64 },

    #[error("Fusion weight must be in the range [0, 1], got {0}")]
    FusionWeightOutOfRange(f64),

    #[error("The shared estimator lock was poisoned by a panicking writer")]
    LockPoisoned,
}
