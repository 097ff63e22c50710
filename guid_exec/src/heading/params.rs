//! Parameters for the heading estimator

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::HeadingError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingParams {
    /// Fixes closer together than this keep the previous fix-to-fix heading, rejecting jitter
    /// while the vehicle is near stationary.
    ///
    /// Units: meters
    pub min_fix_distance_m: f64,

    /// Weight given to the GPS heading when correcting the IMU. 1 trusts GPS fully, 0 trusts the
    /// IMU fully.
    pub imu_fusion_weight: f64,

    /// Below this speed dual antenna and IMU headings are not trusted and fix-to-fix is used.
    ///
    /// Units: meters/second
    pub min_source_speed_ms: f64,

    /// Initial heading of the estimator before any sample has been seen.
    ///
    /// Units: radians
    #[serde(default)]
    pub initial_heading_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for HeadingParams {
    fn default() -> Self {
        Self {
            min_fix_distance_m: 0.5,
            imu_fusion_weight: 0.1,
            min_source_speed_ms: 0.2,
            initial_heading_rad: 0.0,
        }
    }
}

impl HeadingParams {
    /// Check the parameters are usable by the estimator.
    pub fn validate(&self) -> Result<(), HeadingError> {
        if !self.min_fix_distance_m.is_finite() || self.min_fix_distance_m < 0.0 {
            return Err(HeadingError::InvalidArgument {
                name: "min_fix_distance_m",
                value: self.min_fix_distance_m,
            });
        }

        if !(0.0..=1.0).contains(&self.imu_fusion_weight) {
            return Err(HeadingError::FusionWeightOutOfRange(self.imu_fusion_weight));
        }

        if !self.min_source_speed_ms.is_finite() || self.min_source_speed_ms < 0.0 {
            return Err(HeadingError::InvalidArgument {
                name: "min_source_speed_ms",
                value: self.min_source_speed_ms,
            });
        }

        if !self.initial_heading_rad.is_finite() {
            return Err(HeadingError::InvalidArgument {
                name: "initial_heading_rad",
                value: self.initial_heading_rad,
            });
        }

        Ok(())
    }
}
