//! Incremental construction of sampled paths from straights and arcs

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::TurnDirection;
use crate::geom::{offset, Position3D};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Segments shorter than this are dropped.
///
/// Units: meters
const MIN_SEGMENT_LENGTH_M: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Builds a path by chaining segments onto the current pose, sampling each at no more than the
/// waypoint spacing.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    pose: Position3D,

    spacing_m: f64,

    waypoints: Vec<Position3D>,

    length_m: f64,

    reverse_spans: Vec<(usize, usize)>,
}

/// A path produced by a [`PathBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPath {
    pub waypoints: Vec<Position3D>,

    /// Units: meters
    pub length_m: f64,

    /// First and last waypoint index of each part of the path driven in reverse, in order.
    pub reverse_spans: Vec<(usize, usize)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathBuilder {
    /// Start a path at `start`. `spacing_m` must be positive.
    pub fn new(start: Position3D, spacing_m: f64) -> Self {
        Self {
            pose: start,
            spacing_m,
            waypoints: vec![start],
            length_m: 0.0,
            reverse_spans: Vec::new(),
        }
    }

    /// The pose at the end of the path so far.
    pub fn pose(&self) -> Position3D {
        self.pose
    }

    /// Drive straight along the current heading. A negative length is driven in reverse.
    pub fn straight(&mut self, length_m: f64) -> &mut Self {
        if length_m.abs() < MIN_SEGMENT_LENGTH_M {
            return self;
        }

        let start = self.pose;
        let first_idx = self.waypoints.len() - 1;
        let steps = self.steps(length_m.abs());

        for i in 1..=steps {
            let frac = i as f64 / steps as f64;
            self.push(start.offset(length_m * frac, 0.0));
        }

        self.length_m += length_m.abs();

        if length_m < 0.0 {
            let last_idx = self.waypoints.len() - 1;

            // Back to back reverse straights are one span
            match self.reverse_spans.last_mut() {
                Some(span) if span.1 == first_idx => span.1 = last_idx,
                _ => self.reverse_spans.push((first_idx, last_idx)),
            }
        }

        self
    }

    /// Drive forward around an arc of `radius_m` through `angle_rad` in the given direction.
    pub fn arc(&mut self, radius_m: f64, angle_rad: f64, direction: TurnDirection) -> &mut Self {
        let arc_length_m = radius_m * angle_rad.abs();
        if arc_length_m < MIN_SEGMENT_LENGTH_M {
            return self;
        }

        let sign = direction.sign();
        let start = self.pose;

        // Centre of the turning circle, to the side of the turn
        let centre = start.offset(0.0, sign * radius_m);
        let steps = self.steps(arc_length_m);

        for i in 1..=steps {
            let swept_rad = angle_rad.abs() * i as f64 / steps as f64;
            let heading_rad = start.heading_rad + sign * swept_rad;
            self.push(offset(&centre, heading_rad, 0.0, -sign * radius_m));
        }

        self.length_m += arc_length_m;

        self
    }

    /// Append an already sampled path which starts at the current pose.
    pub fn follow(&mut self, waypoints: &[Position3D], length_m: f64) -> &mut Self {
        for wp in waypoints.iter().skip(1) {
            self.push(*wp);
        }

        self.length_m += length_m;

        self
    }

    /// Turn on the spot to face `heading_rad`, for the cusps of a multi-point turn.
    ///
    /// Adds a waypoint at the current position with the new heading.
    pub fn face(&mut self, heading_rad: f64) -> &mut Self {
        let pose = self.pose.position().with_heading(heading_rad);
        self.push(pose);

        self
    }

    /// Replace the final pose, used to remove the accumulated sampling error at the exit.
    pub fn snap_end(&mut self, end: Position3D) -> &mut Self {
        self.pose = end;

        if let Some(last) = self.waypoints.last_mut() {
            *last = end;
        }

        self
    }

    pub fn build(self) -> BuiltPath {
        BuiltPath {
            waypoints: self.waypoints,
            length_m: self.length_m,
            reverse_spans: self.reverse_spans,
        }
    }

    fn steps(&self, length_m: f64) -> usize {
        ((length_m / self.spacing_m).ceil() as usize).max(1)
    }

    fn push(&mut self, pose: Position3D) {
        self.pose = pose;
        self.waypoints.push(pose);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
