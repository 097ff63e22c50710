//! Implementations for the GuidancePipeline state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::PI;

use log::{debug, info, trace, warn};

use super::{ParamFiles, PipelineConfig, PipelineError, SensorSample, StatusReport, TickOutput};
use crate::{
    geom::{distance, normalize_angle, Position2D},
    heading::{
        apply_steer_angle_compensation, determine_optimal_source, dual_antenna_heading,
        roll_corrected_position, vtg_heading, HeadingEstimator, HeadingParams, HeadingSource,
        HeadingUpdate, SharedHeadingEstimator,
    },
    kinematics::{
        propagate, signed_distance_moved, BodyPoses, ChainInput, ToolGeometry,
        VehicleConfiguration,
    },
};
use util::{module::State, params, session::Session};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Guidance pipeline module state
pub struct GuidancePipeline {
    vehicle: VehicleConfiguration,

    tool: ToolGeometry,

    estimator: SharedHeadingEstimator,

    /// Raw antenna fix of the previous tick, for fix-to-fix heading.
    prev_fix: Option<Position2D>,

    /// Roll corrected antenna position of the previous tick, for the distance moved.
    prev_antenna: Option<Position2D>,

    prev_poses: Option<BodyPoses>,

    report: StatusReport,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for GuidancePipeline {
    fn default() -> Self {
        Self {
            vehicle: VehicleConfiguration::default(),
            tool: ToolGeometry::default(),
            estimator: SharedHeadingEstimator::new(HeadingEstimator::default()),
            prev_fix: None,
            prev_antenna: None,
            prev_poses: None,
            report: StatusReport::default(),
        }
    }
}

impl GuidancePipeline {
    /// Build a pipeline directly from its configuration, without a session.
    pub fn new(
        vehicle: VehicleConfiguration,
        tool: ToolGeometry,
        heading: HeadingParams,
    ) -> Result<Self, PipelineError> {
        let estimator = SharedHeadingEstimator::new(HeadingEstimator::new(heading)?);

        Ok(Self {
            vehicle,
            tool,
            estimator,
            ..Default::default()
        })
    }

    /// A handle to the estimator which readers may snapshot between ticks.
    pub fn estimator(&self) -> SharedHeadingEstimator {
        self.estimator.clone()
    }

    /// Body poses from the last tick.
    pub fn poses(&self) -> Option<&BodyPoses> {
        self.prev_poses.as_ref()
    }

    /// Forget all tick history, as at the start of a new run.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        self.estimator.write(|e| e.reset())?;
        self.prev_fix = None;
        self.prev_antenna = None;
        self.prev_poses = None;

        Ok(())
    }

    /// Heading for this tick before compensation, along with whether it was held.
    ///
    /// Every heading produced here, and stored in the estimator, is the way the vehicle faces.
    /// While reversing the course over ground points the other way, so it is turned round
    /// before use.
    fn estimate_heading(&self, sample: &SensorSample) -> Result<(HeadingUpdate, bool), PipelineError> {
        // Reversing swaps the fixes so the displacement runs from the current fix back to the
        // previous one, which is the facing direction
        let fix = sample.fix;
        let prev_fix = self.prev_fix.unwrap_or(fix);
        let (from, to) = if sample.is_reversing {
            (fix, prev_fix)
        } else {
            (prev_fix, fix)
        };

        self.estimator.write(|est| -> Result<(HeadingUpdate, bool), PipelineError> {
            let min_fix_distance_m = est.params().min_fix_distance_m;
            let fusion_weight = est.params().imu_fusion_weight;

            let source = determine_optimal_source(
                sample.speed_ms,
                sample.dual_heading_deg.is_some(),
                sample.imu_heading_deg.is_some(),
                est.params().min_source_speed_ms,
            );

            trace!("Heading source {:?}", source);

            match (source, sample.dual_heading_deg, sample.imu_heading_deg) {
                (HeadingSource::DualAntenna, Some(dual_deg), _) => {
                    Ok((dual_antenna_heading(dual_deg)?, false))
                }
                (HeadingSource::Fused, _, Some(imu_deg)) => {
                    let gps_rad = match sample.vtg_heading_deg {
                        Some(vtg_deg) if sample.is_reversing => {
                            normalize_angle(vtg_heading(vtg_deg)?.heading_rad + PI)
                        }
                        Some(vtg_deg) => vtg_heading(vtg_deg)?.heading_rad,
                        None => est.fix_to_fix_heading(&to, &from, min_fix_distance_m)?,
                    };

                    let heading_rad = est.fuse_imu_heading(gps_rad, imu_deg, fusion_weight)?;

                    Ok((
                        HeadingUpdate {
                            heading_rad,
                            source: HeadingSource::Fused,
                        },
                        false,
                    ))
                }
                _ => {
                    let held = distance(&fix, &prev_fix) < min_fix_distance_m;
                    let heading_rad = est.fix_to_fix_heading(&to, &from, min_fix_distance_m)?;

                    Ok((
                        HeadingUpdate {
                            heading_rad,
                            source: HeadingSource::FixToFix,
                        },
                        held,
                    ))
                }
            }
        })?
    }
}

impl State for GuidancePipeline {
    type InitData = ParamFiles;
    type InitError = PipelineError;

    type InputData = SensorSample;
    type OutputData = TickOutput;
    type StatusReport = StatusReport;
    type ProcError = PipelineError;

    /// Initialise the pipeline.
    ///
    /// Expected init data is the set of parameter files to load.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let vehicle: VehicleConfiguration =
            params::load(init_data.vehicle).map_err(PipelineError::ParamLoadError)?;
        let tool: ToolGeometry =
            params::load(init_data.tool).map_err(PipelineError::ParamLoadError)?;
        let heading: HeadingParams =
            params::load(init_data.heading).map_err(PipelineError::ParamLoadError)?;

        info!(
            "Pipeline initialised: wheelbase {} m, {:?} tool {} m wide",
            vehicle.wheelbase_m, tool.mount, tool.width_m
        );

        session.save(
            "pipeline/config.json",
            PipelineConfig {
                vehicle: vehicle.clone(),
                tool: tool.clone(),
                heading: heading.clone(),
            },
        );

        *self = Self::new(vehicle, tool, heading)?;

        Ok(())
    }

    /// Process one sensor sample.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport::default();

        let sample = input_data;
        if !sample.fix.is_finite() {
            return Err(PipelineError::InvalidSample("fix"));
        }
        if !sample.speed_ms.is_finite() {
            return Err(PipelineError::InvalidSample("speed_ms"));
        }
        if !sample.steer_angle_deg.is_finite() {
            return Err(PipelineError::InvalidSample("steer_angle_deg"));
        }

        // ---- HEADING ----

        let (raw, held) = self.estimate_heading(sample)?;
        self.report.heading_held = held;

        let heading_rad = apply_steer_angle_compensation(
            raw.heading_rad,
            sample.steer_angle_deg,
            sample.speed_ms,
            sample.is_reversing,
            self.vehicle.antenna_pivot_m,
            self.vehicle.steer_comp_forward_factor,
            self.vehicle.steer_comp_reverse_factor,
        );
        let heading = HeadingUpdate { heading_rad, ..raw };

        // ---- KINEMATICS ----

        let roll_deg = match sample.imu_roll_deg {
            Some(r) if r.is_finite() => r,
            Some(_) => return Err(PipelineError::InvalidSample("imu_roll_deg")),
            None => 0.0,
        };

        let antenna = roll_corrected_position(
            &sample.fix,
            heading_rad,
            roll_deg,
            self.vehicle.antenna_height_m,
        );

        let distance_moved_m = self
            .prev_antenna
            .map(|prev| signed_distance_moved(&prev, &antenna, sample.is_reversing))
            .unwrap_or(0.0);

        let poses = propagate(
            &self.vehicle,
            &self.tool,
            &ChainInput {
                antenna,
                heading_rad,
                speed_ms: sample.speed_ms,
                distance_moved_m,
            },
            self.prev_poses.as_ref(),
        );

        if poses.jackknifed {
            warn!(
                "Tool jackknifed at ({:.2}, {:.2}), snapped to the vehicle heading",
                poses.tool.easting, poses.tool.northing
            );
        }
        self.report.jackknifed = poses.jackknifed;

        debug!(
            "Tick: {:?} heading {:.4} rad, moved {:.3} m",
            heading.source, heading.heading_rad, distance_moved_m
        );

        self.prev_fix = Some(sample.fix);
        self.prev_antenna = Some(antenna);
        self.prev_poses = Some(poses);

        Ok((TickOutput { heading, poses }, self.report))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::ToolMount;
    use std::f64::consts::FRAC_PI_2;

    fn pipeline(mount: ToolMount) -> GuidancePipeline {
        let vehicle = VehicleConfiguration {
            antenna_height_m: 0.0,
            ..Default::default()
        };
        let tool = ToolGeometry {
            mount,
            ..Default::default()
        };

        GuidancePipeline::new(vehicle, tool, HeadingParams::default()).unwrap()
    }

    fn sample(easting: f64, northing: f64, speed_ms: f64) -> SensorSample {
        SensorSample {
            fix: Position2D::new(easting, northing),
            speed_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_stationary_keeps_tool_pose() {
        let mut p = pipeline(ToolMount::Trailing);

        let (first, _) = p.proc(&sample(100.0, 100.0, 0.0)).unwrap();

        for _ in 0..5 {
            let (out, report) = p.proc(&sample(100.0, 100.0, 0.0)).unwrap();
            assert_eq!(out.poses.tool, first.poses.tool);
            assert!(report.heading_held);
            assert!(!report.jackknifed);
        }
    }

    #[test]
    fn test_driving_north() {
        let mut p = pipeline(ToolMount::Trailing);

        let samples: Vec<SensorSample> = (0..20).map(|i| sample(0.0, i as f64, 2.0)).collect();
        let outputs = p.proc_all(&samples).unwrap();
        assert_eq!(outputs.len(), 20);

        let (out, report) = outputs[19];
        assert_eq!(out.heading.source, HeadingSource::FixToFix);
        assert!(out.heading.heading_rad.abs() < 1e-9);
        assert!(!report.heading_held);

        // Tool trails behind the vehicle
        assert!(out.poses.tool.northing < out.poses.pivot.northing);
        assert!(out.poses.tool.easting.abs() < 1e-9);
    }

    #[test]
    fn test_stop_then_reverse_keeps_facing() {
        let mut p = pipeline(ToolMount::Trailing);

        for i in 0..5 {
            p.proc(&sample(0.0, i as f64, 2.0)).unwrap();
        }

        // Select reverse without moving
        let stopped = SensorSample {
            is_reversing: true,
            ..sample(0.0, 4.0, 0.0)
        };
        let (out, report) = p.proc(&stopped).unwrap();
        assert!(report.heading_held);
        assert!(out.heading.heading_rad.abs() < 1e-9);
        assert!(out.poses.pivot.northing < 4.0);

        // Back down the track, still facing north
        for i in 1..4 {
            let s = SensorSample {
                is_reversing: true,
                ..sample(0.0, 4.0 - i as f64, 1.0)
            };
            let (out, report) = p.proc(&s).unwrap();
            assert!(!report.heading_held);
            assert!(out.heading.heading_rad.abs() < 1e-9);
            assert!(out.poses.pivot.northing < s.fix.northing);

            let state = p.estimator().snapshot().unwrap();
            assert!((state.last_heading_rad - out.heading.heading_rad).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fused_vtg_while_reversing() {
        let mut p = pipeline(ToolMount::Rigid);

        // Course over ground points south while the vehicle faces north
        let s = SensorSample {
            vtg_heading_deg: Some(180.0),
            imu_heading_deg: Some(0.0),
            is_reversing: true,
            ..sample(0.0, 0.0, 1.0)
        };
        let (out, _) = p.proc(&s).unwrap();
        assert_eq!(out.heading.source, HeadingSource::Fused);
        assert!(out.heading.heading_rad.abs() < 1e-9 || (out.heading.heading_rad - 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_dual_antenna_at_speed() {
        let mut p = pipeline(ToolMount::Rigid);

        let s = SensorSample {
            dual_heading_deg: Some(90.0),
            ..sample(10.0, 10.0, 3.0)
        };
        let (out, _) = p.proc(&s).unwrap();
        assert_eq!(out.heading.source, HeadingSource::DualAntenna);
        assert!((out.heading.heading_rad - FRAC_PI_2).abs() < 1e-9);

        // Too slow to trust the dual antenna
        let s = SensorSample {
            speed_ms: 0.0,
            ..s
        };
        let (out, _) = p.proc(&s).unwrap();
        assert_eq!(out.heading.source, HeadingSource::FixToFix);
    }

    #[test]
    fn test_fused_with_vtg() {
        let mut p = pipeline(ToolMount::Rigid);

        let s = SensorSample {
            vtg_heading_deg: Some(10.0),
            imu_heading_deg: Some(10.0),
            ..sample(0.0, 0.0, 3.0)
        };
        let (out, _) = p.proc(&s).unwrap();
        assert_eq!(out.heading.source, HeadingSource::Fused);
        assert!((out.heading.heading_rad - 10f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut p = pipeline(ToolMount::Trailing);
        p.proc(&sample(0.0, 0.0, 1.0)).unwrap();
        assert!(p.poses().is_some());

        p.reset().unwrap();
        assert!(p.poses().is_none());
        assert_eq!(p.estimator().snapshot().unwrap().last_heading_rad, 0.0);
    }

    #[test]
    fn test_invalid_sample() {
        let mut p = pipeline(ToolMount::Rigid);

        assert!(matches!(
            p.proc(&sample(f64::NAN, 0.0, 0.0)),
            Err(PipelineError::InvalidSample("fix"))
        ));

        let s = SensorSample {
            imu_heading_deg: Some(f64::INFINITY),
            ..sample(0.0, 0.0, 3.0)
        };
        assert!(matches!(p.proc(&s), Err(PipelineError::HeadingError(_))));
    }
}
