//! The turn planner state machine

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashSet;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{
    boundary::{validate_waypoints, TurnBoundaryCheck},
    builder::BuiltPath,
    dubins::DubinsPath,
    guided::{plan_boundary_guided, BoundaryGuidedDubinsResult},
    params::{TurnParameters, TurnStyle},
    templates::{k_turn, smooth_waypoints, t_turn, y_turn},
    tracks::{select_next_track, NextTrack, TrackLayout, TrackRange},
    TurnDirection, TurnError,
};
use crate::geom::{dot, heading_to_vector, perpendicular_right, Position2D, Position3D};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Plans turns between tracks. Holds nothing but its parameters.
#[derive(Debug, Clone)]
pub struct TurnPlanner {
    params: TurnParameters,
}

/// Everything needed to plan a single turn.
#[derive(Debug, Clone)]
pub struct TurnRequest<'a> {
    /// Pose at the end of the current pass.
    pub entry: Position3D,

    pub current_track: i32,

    /// Work direction across the tracks, +1 or -1.
    pub direction: i32,

    pub layout: TrackLayout,

    pub range: TrackRange,

    /// Field boundary ring. Empty for no boundary.
    pub boundary: &'a [Position2D],

    pub worked: &'a HashSet<i32>,
}

/// A drivable turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnPath {
    pub entry: Position3D,

    pub exit: Position3D,

    pub waypoints: Vec<Position3D>,

    /// Units: meters
    pub total_length: f64,

    /// The Dubins path, for turns planned as a single Dubins path.
    pub dubins: Option<DubinsPath>,

    pub boundary_check: Option<TurnBoundaryCheck>,

    pub requires_reverse: bool,

    /// First and last waypoint index of each part driven in reverse.
    pub reverse_spans: Vec<(usize, usize)>,

    pub next_track_index: i32,

    pub direction_reversed: bool,

    pub tracks_skipped: u32,

    pub style: TurnStyle,
}

/// The outcome of a turn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnPlanResult {
    pub succeeded: bool,

    pub path: Option<TurnPath>,

    /// The stage which produced the path, or the stage planning failed in.
    pub stage: PlannerStage,

    pub guided: Option<BoundaryGuidedDubinsResult>,

    pub reason: Option<String>,
}

/// Common fields of every path the planner produces for one request.
struct Leg<'a> {
    entry: Position3D,
    exit: Position3D,
    next: NextTrack,
    boundary: &'a [Position2D],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerStage {
    TrackSelection,
    Planning,
    StandardDubins,
    GuidedSampling,
    FallbackKTurn,
    Done,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TurnPlanner {
    pub fn new(params: TurnParameters) -> Result<Self, TurnError> {
        params.validate()?;

        Ok(Self { params })
    }

    pub fn params(&self) -> &TurnParameters {
        &self.params
    }

    /// Plan the turn from the end of the current track onto the next one.
    ///
    /// Infeasible turns are reported through the result rather than as an error.
    pub fn plan_turn(&self, request: &TurnRequest) -> TurnPlanResult {
        // ---- TRACK SELECTION ----

        let next = match select_next_track(
            &self.params,
            request.current_track,
            request.direction,
            &request.range,
            request.worked,
        ) {
            Some(n) => n,
            None => {
                info!("No next track after track {}", request.current_track);
                return TurnPlanResult::failed(PlannerStage::TrackSelection, "no next track");
            }
        };

        // ---- PLANNING ----

        let entry = request.entry;
        if !(entry.easting.is_finite() && entry.northing.is_finite() && entry.heading_rad.is_finite())
        {
            return TurnPlanResult::failed(PlannerStage::Planning, "entry pose is not finite");
        }

        let exit = request.layout.exit_pose_for(&entry, next.index);
        let leg = Leg {
            entry,
            exit,
            next,
            boundary: request.boundary,
        };

        debug!(
            "Turning {:?} from track {} onto track {} ({:?})",
            leg.direction(),
            request.current_track,
            next.index,
            self.params.turn_style
        );

        let result = match self.params.turn_style {
            TurnStyle::Omega | TurnStyle::Wide => self.plan_dubins(&leg),
            TurnStyle::T | TurnStyle::Y => self.plan_template(&leg),
            TurnStyle::K => Ok(self.plan_k_turn(&leg, PlannerStage::Done, None)),
        };

        let result = result.unwrap_or_else(|e| {
            warn!("Turn planning failed: {}", e);
            TurnPlanResult::failed(PlannerStage::Planning, &e.to_string())
        });

        if let Some(path) = &result.path {
            info!(
                "Planned {:?} turn onto track {} via {:?}: {:.1} m, {} waypoints{}",
                path.style,
                path.next_track_index,
                result.stage,
                path.total_length,
                path.waypoints.len(),
                if path.requires_reverse { ", with reverse" } else { "" }
            );
        }

        result
    }

    /// The shortest Dubins path between the poses at the effective radius, validated against
    /// the boundary but without falling back.
    pub fn plan_standard_dubins(
        &self,
        entry: &Position3D,
        exit: &Position3D,
        boundary: &[Position2D],
    ) -> Result<(DubinsPath, TurnBoundaryCheck), TurnError> {
        let preferred = Some(TurnDirection::toward(lateral_offset(entry, exit)));

        let path = DubinsPath::shortest(
            entry,
            exit,
            self.params.effective_radius_m(),
            self.params.waypoint_spacing_m,
            preferred,
        )?;

        let waypoints = smooth_waypoints(&path.waypoints, self.params.smoothing_factor, &[]);
        let check = self.validate(&waypoints, boundary);

        Ok((DubinsPath { waypoints, ..path }, check))
    }

    /// Check waypoints against the boundary with the configured clearance.
    pub fn validate(&self, waypoints: &[Position3D], boundary: &[Position2D]) -> TurnBoundaryCheck {
        validate_waypoints(waypoints, boundary, self.params.boundary_min_distance_m)
    }

    fn plan_dubins(&self, leg: &Leg) -> Result<TurnPlanResult, TurnError> {
        // ---- STANDARD DUBINS ----

        let (dubins, check) = self.plan_standard_dubins(&leg.entry, &leg.exit, leg.boundary)?;

        if check.is_valid {
            let path = leg.path(
                self.params.turn_style,
                dubins.waypoints.clone(),
                dubins.total_length,
                Vec::new(),
                Some(check),
                Some(dubins),
            );
            return Ok(TurnPlanResult::succeeded(PlannerStage::StandardDubins, path, None));
        }

        debug!("Standard Dubins rejected: {:?}", check.reason);

        // ---- GUIDED SAMPLING ----

        let mut guided = plan_boundary_guided(
            &leg.entry,
            &leg.exit,
            &dubins,
            leg.boundary,
            self.params.effective_radius_m(),
            &self.params,
            Some(leg.direction()),
        )?;

        let sampled = guided.succeeded;

        if let Some((waypoints, check)) = self.accept_guided(&mut guided, leg.boundary) {
            let path = leg.path(
                self.params.turn_style,
                waypoints,
                guided.total_length,
                guided.reverse_spans.clone(),
                Some(check),
                None,
            );
            return Ok(TurnPlanResult::succeeded(
                PlannerStage::GuidedSampling,
                path,
                Some(guided),
            ));
        }

        // ---- FALLBACK ----

        warn!(
            "Guided sampling failed after {} iterations, falling back to a K-turn",
            guided.iteration_count
        );

        let mut result = self.plan_k_turn(leg, PlannerStage::FallbackKTurn, Some(guided));
        if sampled {
            result.reason = Some("guided path rejected after smoothing".to_string());
        }

        Ok(result)
    }

    /// Smooth a successful guided path and check it against the boundary again.
    ///
    /// A path which no longer fits is cleared from `guided` and marked as failed.
    fn accept_guided(
        &self,
        guided: &mut BoundaryGuidedDubinsResult,
        boundary: &[Position2D],
    ) -> Option<(Vec<Position3D>, TurnBoundaryCheck)> {
        let waypoints = match (guided.succeeded, &guided.result_path) {
            (true, Some(w)) => {
                smooth_waypoints(w, self.params.smoothing_factor, &guided.reverse_spans)
            }
            _ => return None,
        };

        let check = self.validate(&waypoints, boundary);
        if check.is_valid {
            return Some((waypoints, check));
        }

        warn!(
            "Guided path rejected after smoothing ({})",
            check.reason.as_deref().unwrap_or("invalid")
        );

        guided.succeeded = false;
        guided.result_path = None;
        guided.reverse_spans.clear();

        None
    }

    fn plan_template(&self, leg: &Leg) -> Result<TurnPlanResult, TurnError> {
        let radius_m = self.params.turning_radius_m;
        let spacing_m = self.params.waypoint_spacing_m;

        let built = match self.params.turn_style {
            TurnStyle::Y => y_turn(&leg.entry, &leg.exit, radius_m, spacing_m),
            _ => t_turn(&leg.entry, &leg.exit, radius_m, spacing_m),
        };

        let waypoints = smooth_waypoints(
            &built.waypoints,
            self.params.smoothing_factor,
            &built.reverse_spans,
        );
        let check = self.validate(&waypoints, leg.boundary);

        if check.is_valid {
            let path = leg.path(
                self.params.turn_style,
                waypoints,
                built.length_m,
                built.reverse_spans,
                Some(check),
                None,
            );
            return Ok(TurnPlanResult::succeeded(PlannerStage::Done, path, None));
        }

        warn!(
            "{:?} turn rejected ({}), falling back to a K-turn",
            self.params.turn_style,
            check.reason.as_deref().unwrap_or("invalid")
        );

        Ok(self.plan_k_turn(leg, PlannerStage::FallbackKTurn, None))
    }

    fn plan_k_turn(
        &self,
        leg: &Leg,
        stage: PlannerStage,
        guided: Option<BoundaryGuidedDubinsResult>,
    ) -> TurnPlanResult {
        let BuiltPath {
            waypoints,
            length_m,
            reverse_spans,
        } = k_turn(&leg.entry, &leg.exit, self.params.waypoint_spacing_m);

        let path = leg.path(
            TurnStyle::K,
            waypoints,
            length_m,
            reverse_spans,
            Some(TurnBoundaryCheck::valid_by_construction()),
            None,
        );

        TurnPlanResult::succeeded(stage, path, guided)
    }
}

impl<'a> Leg<'a> {
    fn direction(&self) -> TurnDirection {
        TurnDirection::toward(lateral_offset(&self.entry, &self.exit))
    }

    fn path(
        &self,
        style: TurnStyle,
        waypoints: Vec<Position3D>,
        total_length: f64,
        reverse_spans: Vec<(usize, usize)>,
        boundary_check: Option<TurnBoundaryCheck>,
        dubins: Option<DubinsPath>,
    ) -> TurnPath {
        TurnPath {
            entry: self.entry,
            exit: self.exit,
            waypoints,
            total_length,
            dubins,
            boundary_check,
            requires_reverse: !reverse_spans.is_empty(),
            reverse_spans,
            next_track_index: self.next.index,
            direction_reversed: self.next.direction_reversed,
            tracks_skipped: self.next.tracks_skipped,
            style,
        }
    }
}

impl TurnPath {
    /// Whether the step onto waypoint `idx` is driven in reverse.
    pub fn is_reversing_at(&self, idx: usize) -> bool {
        self.reverse_spans.iter().any(|&(a, b)| idx > a && idx <= b)
    }
}

impl TurnPlanResult {
    fn succeeded(
        stage: PlannerStage,
        path: TurnPath,
        guided: Option<BoundaryGuidedDubinsResult>,
    ) -> Self {
        Self {
            succeeded: true,
            path: Some(path),
            stage,
            guided,
            reason: None,
        }
    }

    fn failed(stage: PlannerStage, reason: &str) -> Self {
        Self {
            succeeded: false,
            path: None,
            stage,
            guided: None,
            reason: Some(reason.to_string()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Distance of `exit` to the right of `entry`.
fn lateral_offset(entry: &Position3D, exit: &Position3D) -> f64 {
    let right = perpendicular_right(&heading_to_vector(entry.heading_rad));
    dot(&(exit.to_vector() - entry.to_vector()), &right)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
