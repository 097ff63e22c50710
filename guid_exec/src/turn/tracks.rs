//! Parallel track layout and next track selection

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashSet;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::params::{RowSkipMode, TurnParameters};
use crate::geom::{dot, heading_to_vector, perpendicular_right, Position2D, Position3D};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A set of parallel tracks. Track `i` runs through `origin` offset `i * spacing_m` to the
/// right of `heading_rad`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLayout {
    pub origin: Position2D,

    /// Units: radians
    pub heading_rad: f64,

    /// Units: meters
    pub spacing_m: f64,
}

/// Inclusive range of track indices inside the field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRange {
    pub first: i32,
    pub last: i32,
}

/// The track chosen for the next pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextTrack {
    pub index: i32,

    /// Work direction across the tracks after this turn, +1 or -1.
    pub direction: i32,

    pub direction_reversed: bool,

    /// Number of tracks between the current and next track.
    pub tracks_skipped: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrackLayout {
    /// Pose at the start of track `index`, level with the origin, driven along the layout
    /// heading.
    pub fn track_pose(&self, index: i32) -> Position3D {
        self.origin
            .with_heading(self.heading_rad)
            .offset(0.0, index as f64 * self.spacing_m)
    }

    /// Where a turn starting at `entry` rejoins track `index`: level with the entry along the
    /// tracks and facing back the way the entry came.
    pub fn exit_pose_for(&self, entry: &Position3D, index: i32) -> Position3D {
        let forward = heading_to_vector(self.heading_rad);
        let along_m = dot(&(entry.to_vector() - self.origin.to_vector()), &forward);

        self.track_pose(index)
            .offset(along_m, 0.0)
            .position()
            .with_heading(entry.heading_rad + PI)
    }

    /// Track index nearest to a position.
    pub fn nearest_track(&self, pos: &Position2D) -> i32 {
        let right = perpendicular_right(&heading_to_vector(self.heading_rad));
        let lateral_m = dot(&(pos.to_vector() - self.origin.to_vector()), &right);

        (lateral_m / self.spacing_m).round() as i32
    }
}

impl TrackRange {
    pub fn contains(&self, index: i32) -> bool {
        index >= self.first && index <= self.last
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Choose the next track to work.
///
/// `Normal` moves one track in the work direction, `Alternative` moves `tracks_to_skip` tracks
/// and `IgnoreWorkedTracks` moves to the nearest unworked track. If nothing is available in the
/// work direction and reversal is allowed the direction flips. `Normal` and `Alternative` then
/// restart from the far end of the field, taking the first unworked track scanning from that
/// end, while `IgnoreWorkedTracks` scans outward from the current track.
pub fn select_next_track(
    params: &TurnParameters,
    current: i32,
    direction: i32,
    range: &TrackRange,
    worked: &HashSet<i32>,
) -> Option<NextTrack> {
    let direction = if direction < 0 { -1 } else { 1 };
    let is_free = |i: i32| range.contains(i) && i != current && !worked.contains(&i);

    let forward = match params.row_skip_mode {
        RowSkipMode::Normal => Some(current + direction).filter(|i| is_free(*i)),
        RowSkipMode::Alternative => {
            Some(current + direction * params.tracks_to_skip as i32).filter(|i| is_free(*i))
        }
        RowSkipMode::IgnoreWorkedTracks => scan(current + direction, direction, range, &is_free),
    };

    if let Some(index) = forward {
        return Some(next(current, index, direction, false));
    }

    if !params.allow_direction_reversal {
        return None;
    }

    let reversed = -direction;
    let index = match params.row_skip_mode {
        RowSkipMode::Normal | RowSkipMode::Alternative => {
            let far_end = if reversed > 0 { range.first } else { range.last };
            scan(far_end, reversed, range, &is_free)
        }
        RowSkipMode::IgnoreWorkedTracks => scan(current + reversed, reversed, range, &is_free),
    }?;

    Some(next(current, index, reversed, true))
}

/// First free track from `start` moving in `step`.
fn scan<F>(start: i32, step: i32, range: &TrackRange, is_free: &F) -> Option<i32>
where
    F: Fn(i32) -> bool,
{
    let mut i = start;

    while range.contains(i) {
        if is_free(i) {
            return Some(i);
        }
        i += step;
    }

    None
}

fn next(current: i32, index: i32, direction: i32, direction_reversed: bool) -> NextTrack {
    NextTrack {
        index,
        direction,
        direction_reversed,
        tracks_skipped: ((index - current).abs() - 1).max(0) as u32,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn params(mode: RowSkipMode, skip: u32, reverse: bool) -> TurnParameters {
        TurnParameters {
            row_skip_mode: mode,
            tracks_to_skip: skip,
            allow_direction_reversal: reverse,
            ..Default::default()
        }
    }

    fn worked(tracks: &[i32]) -> HashSet<i32> {
        tracks.iter().cloned().collect()
    }

    const RANGE: TrackRange = TrackRange { first: 0, last: 9 };

    #[test]
    fn test_layout() {
        let layout = TrackLayout {
            origin: Position2D::new(100.0, 200.0),
            heading_rad: 0.0,
            spacing_m: 6.0,
        };

        let t = layout.track_pose(2);
        assert!((t.easting - 112.0).abs() < 1e-9);
        assert!((t.northing - 200.0).abs() < 1e-9);

        let entry = Position3D::new(100.0, 300.0, 0.0);
        let exit = layout.exit_pose_for(&entry, 1);
        assert!((exit.easting - 106.0).abs() < 1e-9);
        assert!((exit.northing - 300.0).abs() < 1e-9);
        assert!((exit.heading_rad - PI).abs() < 1e-9);

        assert_eq!(layout.nearest_track(&Position2D::new(113.0, 250.0)), 2);
        assert_eq!(layout.nearest_track(&Position2D::new(94.5, 250.0)), -1);

        // Rotated layout
        let layout = TrackLayout {
            heading_rad: FRAC_PI_2,
            ..layout
        };
        let t = layout.track_pose(1);
        assert!((t.northing - 194.0).abs() < 1e-9);
    }

    #[test]
    fn test_normal() {
        let p = params(RowSkipMode::Normal, 1, false);

        let n = select_next_track(&p, 3, 1, &RANGE, &worked(&[0, 1, 2, 3])).unwrap();
        assert_eq!(n.index, 4);
        assert_eq!(n.direction, 1);
        assert!(!n.direction_reversed);
        assert_eq!(n.tracks_skipped, 0);

        let n = select_next_track(&p, 3, -1, &RANGE, &worked(&[3])).unwrap();
        assert_eq!(n.index, 2);

        // Edge of the field
        assert!(select_next_track(&p, 9, 1, &RANGE, &worked(&[9])).is_none());
    }

    #[test]
    fn test_alternative() {
        let p = params(RowSkipMode::Alternative, 2, true);

        let n = select_next_track(&p, 4, 1, &RANGE, &worked(&[0, 2, 4])).unwrap();
        assert_eq!(n.index, 6);
        assert_eq!(n.tracks_skipped, 1);

        // Off the end, restart from the far end going back
        let n = select_next_track(&p, 8, 1, &RANGE, &worked(&[0, 2, 4, 6, 8])).unwrap();
        assert_eq!(n.index, 9);
        assert_eq!(n.direction, -1);
        assert!(n.direction_reversed);

        // Then back down filling the gaps
        let n = select_next_track(&p, 9, -1, &RANGE, &worked(&[0, 2, 4, 6, 8, 9])).unwrap();
        assert_eq!(n.index, 7);
    }

    #[test]
    fn test_ignore_worked() {
        let p = params(RowSkipMode::IgnoreWorkedTracks, 1, true);

        let n = select_next_track(&p, 2, 1, &RANGE, &worked(&[2, 3, 4])).unwrap();
        assert_eq!(n.index, 5);
        assert_eq!(n.tracks_skipped, 2);

        // Nothing left ahead, scan back from the current track
        let n = select_next_track(&p, 7, 1, &RANGE, &worked(&[3, 4, 5, 6, 7, 8, 9])).unwrap();
        assert_eq!(n.index, 2);
        assert_eq!(n.direction, -1);
        assert!(n.direction_reversed);

        // Everything worked
        let all: Vec<i32> = (0..10).collect();
        assert!(select_next_track(&p, 5, 1, &RANGE, &worked(&all)).is_none());
    }

    #[test]
    fn test_no_reversal() {
        let p = params(RowSkipMode::IgnoreWorkedTracks, 1, false);
        assert!(select_next_track(&p, 7, 1, &RANGE, &worked(&[7, 8, 9])).is_none());
    }
}
