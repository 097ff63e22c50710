//! Heading estimator state and fusion

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, RwLock};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::{HeadingError, HeadingParams, HeadingSource, HeadingUpdate};
use crate::geom::{angular_delta, distance, normalize_angle, wrap_pi, Position2D};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The mutable state of the estimator, one per vehicle session.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadingEstimatorState {
    /// The last heading produced by fix-to-fix or fusion.
    ///
    /// Units: radians, `[0, 2pi)`
    pub last_heading_rad: f64,

    /// Running correction applied to the IMU heading to bring it onto the GPS heading.
    ///
    /// Units: radians, `(-pi, pi]`
    pub imu_gps_offset_rad: f64,
}

#[derive(Debug, Clone)]
pub struct HeadingEstimator {
    params: HeadingParams,

    state: HeadingEstimatorState,
}

/// A heading estimator shared between the ingestion thread (the only writer) and any number of
/// readers wanting a snapshot of the state.
#[derive(Debug, Clone)]
pub struct SharedHeadingEstimator {
    inner: Arc<RwLock<HeadingEstimator>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for HeadingEstimator {
    fn default() -> Self {
        Self {
            params: HeadingParams::default(),
            state: HeadingEstimatorState::default(),
        }
    }
}

impl HeadingEstimator {
    pub fn new(params: HeadingParams) -> Result<Self, HeadingError> {
        params.validate()?;

        let state = HeadingEstimatorState {
            last_heading_rad: normalize_angle(params.initial_heading_rad),
            imu_gps_offset_rad: 0.0,
        };

        Ok(Self { params, state })
    }

    pub fn params(&self) -> &HeadingParams {
        &self.params
    }

    /// A copy of the current estimator state.
    pub fn state(&self) -> HeadingEstimatorState {
        self.state
    }

    /// Forget all accumulated state, as at the start of a new session.
    pub fn reset(&mut self) {
        self.state = HeadingEstimatorState {
            last_heading_rad: normalize_angle(self.params.initial_heading_rad),
            imu_gps_offset_rad: 0.0,
        };
    }

    /// Compute the heading from the displacement between the previous and current fix.
    ///
    /// If the fixes are closer than `minimum_distance_m` (or coincident) the previously
    /// established heading is returned unchanged, since at near-zero speed the displacement is
    /// dominated by receiver jitter.
    pub fn fix_to_fix_heading(
        &mut self,
        curr: &Position2D,
        prev: &Position2D,
        minimum_distance_m: f64,
    ) -> Result<f64, HeadingError> {
        if !curr.is_finite() {
            return Err(HeadingError::InvalidSample("current fix"));
        }
        if !prev.is_finite() {
            return Err(HeadingError::InvalidSample("previous fix"));
        }
        if !minimum_distance_m.is_finite() || minimum_distance_m < 0.0 {
            return Err(HeadingError::InvalidArgument {
                name: "minimum_distance_m",
                value: minimum_distance_m,
            });
        }

        // Coincident fixes carry no direction whatever the minimum distance
        let dist_m = distance(curr, prev);
        if dist_m < minimum_distance_m || dist_m <= 0.0 {
            trace!(
                "Fix moved {:.3} m (< {:.3} m), holding heading {:.4}",
                dist_m,
                minimum_distance_m,
                self.state.last_heading_rad
            );
            return Ok(self.state.last_heading_rad);
        }

        let d_east = curr.easting - prev.easting;
        let d_north = curr.northing - prev.northing;

        self.state.last_heading_rad = normalize_angle(d_east.atan2(d_north));

        Ok(self.state.last_heading_rad)
    }

    /// Blend the IMU heading with the GPS heading.
    ///
    /// The offset between the two is tracked as a low pass filtered correction: each call moves
    /// it toward the current IMU to GPS delta by `fusion_weight`, always taking the short way
    /// round the circle. A weight of 1 makes the output follow GPS exactly, a weight of 0 leaves
    /// the correction frozen and follows the IMU.
    pub fn fuse_imu_heading(
        &mut self,
        gps_heading_rad: f64,
        imu_heading_deg: f64,
        fusion_weight: f64,
    ) -> Result<f64, HeadingError> {
        if !(0.0..=1.0).contains(&fusion_weight) {
            return Err(HeadingError::FusionWeightOutOfRange(fusion_weight));
        }
        if !gps_heading_rad.is_finite() {
            return Err(HeadingError::InvalidSample("gps heading"));
        }
        if !imu_heading_deg.is_finite() {
            return Err(HeadingError::InvalidSample("imu heading"));
        }

        let imu_rad = normalize_angle(imu_heading_deg.to_radians());
        let target_offset_rad = angular_delta(imu_rad, normalize_angle(gps_heading_rad));

        let correction_rad = angular_delta(self.state.imu_gps_offset_rad, target_offset_rad);
        self.state.imu_gps_offset_rad =
            wrap_pi(self.state.imu_gps_offset_rad + fusion_weight * correction_rad);

        self.state.last_heading_rad = normalize_angle(imu_rad + self.state.imu_gps_offset_rad);

        debug!(
            "IMU {:.4} GPS {:.4} offset {:.4} -> {:.4}",
            imu_rad, gps_heading_rad, self.state.imu_gps_offset_rad, self.state.last_heading_rad
        );

        Ok(self.state.last_heading_rad)
    }

    /// Pick the most trustworthy heading source for the current conditions.
    ///
    /// Dual antenna is preferred over fused IMU, which is preferred over fix-to-fix. Below
    /// `min_source_speed_ms` fix-to-fix is always used.
    pub fn determine_optimal_source(
        &self,
        speed_ms: f64,
        has_dual_antenna: bool,
        has_imu: bool,
    ) -> HeadingSource {
        determine_optimal_source(
            speed_ms,
            has_dual_antenna,
            has_imu,
            self.params.min_source_speed_ms,
        )
    }
}

impl SharedHeadingEstimator {
    pub fn new(estimator: HeadingEstimator) -> Self {
        Self {
            inner: Arc::new(RwLock::new(estimator)),
        }
    }

    /// Run `f` with exclusive access to the estimator.
    ///
    /// Only the sensor ingestion tick should call this.
    pub fn write<R, F>(&self, f: F) -> Result<R, HeadingError>
    where
        F: FnOnce(&mut HeadingEstimator) -> R,
    {
        let mut guard = self.inner.write().map_err(|_| HeadingError::LockPoisoned)?;
        Ok(f(&mut *guard))
    }

    /// Read-only copy of the estimator's state.
    pub fn snapshot(&self) -> Result<HeadingEstimatorState, HeadingError> {
        self.inner
            .read()
            .map(|e| e.state())
            .map_err(|_| HeadingError::LockPoisoned)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a VTG course over ground into a heading update.
pub fn vtg_heading(heading_deg: f64) -> Result<HeadingUpdate, HeadingError> {
    degrees_to_update(heading_deg, HeadingSource::Vtg)
}

/// Convert a dual antenna heading into a heading update.
pub fn dual_antenna_heading(heading_deg: f64) -> Result<HeadingUpdate, HeadingError> {
    degrees_to_update(heading_deg, HeadingSource::DualAntenna)
}

/// See [`HeadingEstimator::determine_optimal_source`].
pub fn determine_optimal_source(
    speed_ms: f64,
    has_dual_antenna: bool,
    has_imu: bool,
    min_speed_ms: f64,
) -> HeadingSource {
    // Dual and IMU headings are noisiest when the vehicle is nearly stationary
    if speed_ms.abs() < min_speed_ms {
        return HeadingSource::FixToFix;
    }

    match (has_dual_antenna, has_imu) {
        (true, _) => HeadingSource::DualAntenna,
        (false, true) => HeadingSource::Fused,
        (false, false) => HeadingSource::FixToFix,
    }
}

fn degrees_to_update(heading_deg: f64, source: HeadingSource) -> Result<HeadingUpdate, HeadingError> {
    if !heading_deg.is_finite() {
        return Err(HeadingError::InvalidSample("heading degrees"));
    }

    Ok(HeadingUpdate {
        heading_rad: normalize_angle(heading_deg.to_radians()),
        source,
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    const ORIGIN: Position2D = Position2D {
        easting: 500000.0,
        northing: 4500000.0,
    };

    #[test]
    fn test_fix_to_fix_cardinal() {
        let mut est = HeadingEstimator::default();

        let cases = [
            (Position2D::new(500000.0, 4500010.0), 0.0),
            (Position2D::new(500010.0, 4500000.0), FRAC_PI_2),
            (Position2D::new(500000.0, 4499990.0), PI),
            (Position2D::new(499990.0, 4500000.0), 1.5 * PI),
        ];

        for (curr, expected) in cases.iter() {
            let h = est.fix_to_fix_heading(curr, &ORIGIN, 0.5).unwrap();
            assert!((h - expected).abs() < 1e-3, "{:?} -> {}", curr, h);
            assert_eq!(est.state().last_heading_rad, h);
        }
    }

    #[test]
    fn test_fix_to_fix_hysteresis() {
        let mut est = HeadingEstimator::default();

        let east = Position2D::new(500010.0, 4500000.0);
        let h = est.fix_to_fix_heading(&east, &ORIGIN, 0.5).unwrap();
        assert!((h - FRAC_PI_2).abs() < 1e-9);

        // A small wobble northwards must not change the heading
        let jitter = Position2D::new(500010.0, 4500000.2);
        assert_eq!(est.fix_to_fix_heading(&jitter, &east, 0.5).unwrap(), h);
        assert_eq!(est.state().last_heading_rad, h);

        // Identical fixes are the zero distance case
        assert_eq!(est.fix_to_fix_heading(&east, &east, 0.0).unwrap(), h);
    }

    #[test]
    fn test_fix_to_fix_invalid() {
        let mut est = HeadingEstimator::default();

        let bad = Position2D::new(f64::NAN, 0.0);
        assert!(matches!(
            est.fix_to_fix_heading(&bad, &ORIGIN, 0.5),
            Err(HeadingError::InvalidSample(_))
        ));
        assert!(matches!(
            est.fix_to_fix_heading(&ORIGIN, &bad, 0.5),
            Err(HeadingError::InvalidSample(_))
        ));
        assert!(matches!(
            est.fix_to_fix_heading(&ORIGIN, &ORIGIN, -1.0),
            Err(HeadingError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_vtg_and_dual() {
        let u = vtg_heading(-90.0).unwrap();
        assert!((u.heading_rad - 1.5 * PI).abs() < 1e-12);
        assert_eq!(u.source, HeadingSource::Vtg);

        let u = dual_antenna_heading(450.0).unwrap();
        assert!((u.heading_rad - FRAC_PI_2).abs() < 1e-12);
        assert_eq!(u.source, HeadingSource::DualAntenna);

        assert!(vtg_heading(f64::INFINITY).is_err());
    }

    #[test]
    fn test_fuse_weight_range() {
        let mut est = HeadingEstimator::default();

        assert!(matches!(
            est.fuse_imu_heading(0.0, 0.0, 1.5),
            Err(HeadingError::FusionWeightOutOfRange(_))
        ));
        assert!(matches!(
            est.fuse_imu_heading(0.0, 0.0, -0.1),
            Err(HeadingError::FusionWeightOutOfRange(_))
        ));
        assert!(est.fuse_imu_heading(0.0, 0.0, f64::NAN).is_err());

        // Failed calls leave the state untouched
        assert_eq!(est.state(), HeadingEstimatorState::default());
    }

    #[test]
    fn test_fuse_wraparound() {
        let mut est = HeadingEstimator::default();

        let h = est
            .fuse_imu_heading(0.1f64.to_radians(), 359.0, 0.5)
            .unwrap();

        // Result sits either just below 2pi or just above 0, never near pi
        let from_north = h.min(TAU - h);
        assert!(from_north < 1f64.to_radians(), "fused heading {}", h);

        // Offset only moved half way along the short +1.1 deg delta
        let offset = est.state().imu_gps_offset_rad;
        assert!((offset - 0.55f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_fuse_weights_and_convergence() {
        // Full GPS trust reproduces the GPS heading
        let mut est = HeadingEstimator::default();
        let h = est.fuse_imu_heading(1.0, 40.0, 1.0).unwrap();
        assert!((h - 1.0).abs() < 1e-9);

        // Full IMU trust follows the IMU
        let mut est = HeadingEstimator::default();
        let h = est.fuse_imu_heading(1.0, 40.0, 0.0).unwrap();
        assert!((h - 40f64.to_radians()).abs() < 1e-9);

        // Consistent inputs converge monotonically without jumping
        let mut est = HeadingEstimator::default();
        let gps = 10f64.to_radians();
        let mut last_err = f64::MAX;
        for _ in 0..50 {
            let h = est.fuse_imu_heading(gps, 350.0, 0.2).unwrap();
            let err = angular_delta(h, gps).abs();
            assert!(err <= last_err + 1e-12);
            last_err = err;
        }
        assert!(last_err < 1e-3);
    }

    #[test]
    fn test_determine_optimal_source() {
        let est = HeadingEstimator::default();

        assert_eq!(est.determine_optimal_source(3.0, true, true), HeadingSource::DualAntenna);
        assert_eq!(est.determine_optimal_source(3.0, false, true), HeadingSource::Fused);
        assert_eq!(est.determine_optimal_source(3.0, false, false), HeadingSource::FixToFix);

        // Stationary falls back regardless of sensors
        assert_eq!(est.determine_optimal_source(0.05, true, true), HeadingSource::FixToFix);
    }

    #[test]
    fn test_shared_estimator() {
        let shared = SharedHeadingEstimator::new(HeadingEstimator::default());
        let reader = shared.clone();

        let h = shared
            .write(|e| e.fix_to_fix_heading(&Position2D::new(500010.0, 4500000.0), &ORIGIN, 0.5))
            .unwrap()
            .unwrap();

        assert_eq!(reader.snapshot().unwrap().last_heading_rad, h);

        shared.write(|e| e.reset()).unwrap();
        assert_eq!(reader.snapshot().unwrap().last_heading_rad, 0.0);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = HeadingParams::default();
        params.imu_fusion_weight = 2.0;
        assert!(HeadingEstimator::new(params).is_err());
    }
}
