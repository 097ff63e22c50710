//! Fixed shape turns and waypoint smoothing
//!
//! T and Y turns are built from arcs at the turning radius joined by straights whose length is
//! set by the track spacing. When the spacing is too narrow for the arcs the straights come out
//! negative and are driven in reverse. The K (three point) turn is built from straight legs only
//! and always fits inside one track spacing, which makes it the fallback for everything else.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, SQRT_2};

use nalgebra::Vector2;

use super::{
    builder::{BuiltPath, PathBuilder},
    TurnDirection,
};
use crate::geom::{bearing, distance, dot, heading_to_vector, perpendicular_right, Position2D, Position3D};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Exit position expressed in the entry pose's frame.
struct EntryFrame {
    forward: Vector2<f64>,

    right: Vector2<f64>,

    /// Distance of the exit ahead of the entry.
    along_m: f64,

    /// Distance of the exit to the right of the entry.
    lateral_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EntryFrame {
    fn new(entry: &Position3D, exit: &Position3D) -> Self {
        let forward = heading_to_vector(entry.heading_rad);
        let right = perpendicular_right(&forward);
        let rel = exit.to_vector() - entry.to_vector();

        Self {
            forward,
            right,
            along_m: dot(&rel, &forward),
            lateral_m: dot(&rel, &right),
        }
    }

    fn direction(&self) -> TurnDirection {
        TurnDirection::toward(self.lateral_m)
    }

    /// Point `forward_m` ahead of and `toward_m` across from the entry, toward the exit side.
    fn point(&self, entry: &Position3D, forward_m: f64, toward_m: f64) -> Position2D {
        let across = self.right * self.direction().sign();
        Position2D::from(entry.to_vector() + self.forward * forward_m + across * toward_m)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Quarter arc, lateral straight, quarter arc.
pub fn t_turn(entry: &Position3D, exit: &Position3D, radius_m: f64, spacing_m: f64) -> BuiltPath {
    let frame = EntryFrame::new(entry, exit);
    let dir = frame.direction();
    let width_m = frame.lateral_m.abs();

    let mut builder = PathBuilder::new(*entry, spacing_m);
    builder
        .arc(radius_m, FRAC_PI_2, dir)
        .straight(width_m - 2.0 * radius_m)
        .arc(radius_m, FRAC_PI_2, dir)
        .straight(-frame.along_m)
        .snap_end(*exit);

    builder.build()
}

/// Eighth arc, diagonal, quarter arc, diagonal, eighth arc.
pub fn y_turn(entry: &Position3D, exit: &Position3D, radius_m: f64, spacing_m: f64) -> BuiltPath {
    let frame = EntryFrame::new(entry, exit);
    let dir = frame.direction();
    let width_m = frame.lateral_m.abs();

    // Arcs alone cover 2r across, the diagonals make up the rest
    let diagonal_m = (width_m - 2.0 * radius_m) / SQRT_2;

    let mut builder = PathBuilder::new(*entry, spacing_m);
    builder
        .arc(radius_m, FRAC_PI_4, dir)
        .straight(diagonal_m)
        .arc(radius_m, FRAC_PI_2, dir)
        .straight(diagonal_m)
        .arc(radius_m, FRAC_PI_4, dir)
        .straight(-frame.along_m)
        .snap_end(*exit);

    builder.build()
}

/// Three point turn: forward across, reverse back, forward onto the next track.
///
/// Stays within a square one track spacing wide ahead of the entry.
pub fn k_turn(entry: &Position3D, exit: &Position3D, spacing_m: f64) -> BuiltPath {
    let frame = EntryFrame::new(entry, exit);
    let width_m = frame.lateral_m.abs();

    let start = entry.position();
    let first = frame.point(entry, width_m * 0.5, width_m * 0.5);
    let second = frame.point(entry, width_m, width_m * 0.25);
    let end = exit.position();

    let mut builder = PathBuilder::new(*entry, spacing_m);
    builder
        .face(bearing(&start, &first))
        .straight(distance(&start, &first))
        .face(bearing(&second, &first))
        .straight(-distance(&first, &second))
        .face(bearing(&second, &end))
        .straight(distance(&second, &end))
        .face(exit.heading_rad)
        .snap_end(*exit);

    builder.build()
}

/// Blend each interior waypoint toward the midpoint of its neighbours by `factor`.
///
/// A single pass over the original positions. The end points and the ends of each reverse span
/// (the cusps) don't move, and headings are left as they were.
pub fn smooth_waypoints(
    waypoints: &[Position3D],
    factor: f64,
    reverse_spans: &[(usize, usize)],
) -> Vec<Position3D> {
    if factor <= 0.0 || waypoints.len() < 3 {
        return waypoints.to_vec();
    }

    let is_cusp = |i: usize| reverse_spans.iter().any(|&(a, b)| i == a || i == b);

    let mut smoothed = waypoints.to_vec();

    for i in 1..waypoints.len() - 1 {
        if is_cusp(i) {
            continue;
        }

        let prev = waypoints[i - 1].to_vector();
        let next = waypoints[i + 1].to_vector();
        let curr = waypoints[i].to_vector();
        let pos = curr + ((prev + next) * 0.5 - curr) * factor;

        smoothed[i] = Position3D {
            easting: pos.x,
            northing: pos.y,
            heading_rad: waypoints[i].heading_rad,
        };
    }

    smoothed
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn ends_on(path: &BuiltPath, exit: &Position3D, spacing_m: f64) {
        let n = path.waypoints.len();
        assert_eq!(path.waypoints[n - 1], *exit);

        // The sample before the snap was already within a spacing of the exit
        let before = path.waypoints[n - 2].position();
        assert!(distance(&before, &exit.position()) <= spacing_m + 1e-6);
    }

    #[test]
    fn test_t_turn() {
        let entry = Position3D::new(0.0, 0.0, 0.0);
        let exit = Position3D::new(20.0, 0.0, PI);

        let path = t_turn(&entry, &exit, 5.0, 0.5);
        ends_on(&path, &exit, 0.5);
        assert!(path.reverse_spans.is_empty());
        assert!((path.length_m - (5.0 * PI + 10.0)).abs() < 1e-9);

        // The exit further back along the next track adds a forward straight
        let exit = Position3D::new(20.0, -3.0, PI);
        let path = t_turn(&entry, &exit, 5.0, 0.5);
        ends_on(&path, &exit, 0.5);
        assert!(path.reverse_spans.is_empty());
    }

    #[test]
    fn test_narrow_t_turn_reverses() {
        let entry = Position3D::new(0.0, 0.0, 0.0);
        let exit = Position3D::new(6.0, 0.0, PI);

        let path = t_turn(&entry, &exit, 5.0, 0.5);
        ends_on(&path, &exit, 0.5);
        assert!(!path.reverse_spans.is_empty());
    }

    #[test]
    fn test_y_turn() {
        let entry = Position3D::new(0.0, 0.0, 0.0);

        let exit = Position3D::new(-20.0, 0.0, PI);
        let path = y_turn(&entry, &exit, 5.0, 0.5);
        ends_on(&path, &exit, 0.5);
        assert!(path.reverse_spans.is_empty());

        // Heading left the whole way
        assert!(path.waypoints.iter().all(|w| w.easting <= 1e-9));

        let exit = Position3D::new(-6.0, 0.0, PI);
        let path = y_turn(&entry, &exit, 5.0, 0.5);
        ends_on(&path, &exit, 0.5);
        assert!(!path.reverse_spans.is_empty());
    }

    #[test]
    fn test_narrow_y_turn_reverse_spans() {
        let entry = Position3D::new(0.0, 0.0, 0.0);
        let exit = Position3D::new(6.0, 0.0, PI);

        let path = y_turn(&entry, &exit, 5.0, 0.5);

        // Both diagonals reverse, with the forward quarter arc between them
        assert_eq!(path.reverse_spans.len(), 2);
        assert!(path.reverse_spans[0].1 < path.reverse_spans[1].0);

        for &(a, b) in path.reverse_spans.iter() {
            for i in a..b {
                let step = path.waypoints[i + 1].to_vector() - path.waypoints[i].to_vector();
                let facing = heading_to_vector(path.waypoints[i].heading_rad);
                assert!(dot(&step, &facing) < 0.0);
            }
        }

        // The arc between the spans is driven forward
        for i in path.reverse_spans[0].1..path.reverse_spans[1].0 {
            let step = path.waypoints[i + 1].to_vector() - path.waypoints[i].to_vector();
            let facing = heading_to_vector(path.waypoints[i].heading_rad);
            assert!(dot(&step, &facing) > 0.0);
        }
    }

    #[test]
    fn test_k_turn() {
        let entry = Position3D::new(0.0, 0.0, 0.0);
        let exit = Position3D::new(8.0, 0.0, PI);

        let path = k_turn(&entry, &exit, 0.5);
        ends_on(&path, &exit, 0.5);

        assert_eq!(path.reverse_spans.len(), 1);
        let (a, b) = path.reverse_spans[0];
        assert!(a < b);

        // Stays in the square ahead of the entry
        for w in path.waypoints.iter() {
            assert!(w.easting >= -1e-9 && w.easting <= 8.0 + 1e-9);
            assert!(w.northing >= -1e-9 && w.northing <= 8.0 + 1e-9);
        }

        assert_eq!(path.waypoints[0], entry);
    }

    #[test]
    fn test_smoothing() {
        let zigzag: Vec<Position3D> = (0..5)
            .map(|i| Position3D::new(if i % 2 == 0 { 0.0 } else { 1.0 }, i as f64, 0.0))
            .collect();

        assert_eq!(smooth_waypoints(&zigzag, 0.0, &[]), zigzag);

        let s = smooth_waypoints(&zigzag, 1.0, &[]);
        assert_eq!(s[0], zigzag[0]);
        assert_eq!(s[4], zigzag[4]);
        assert!(s[1].easting.abs() < 1e-12);
        assert!((s[2].easting - 1.0).abs() < 1e-12);

        let s = smooth_waypoints(&zigzag, 0.5, &[(1, 3)]);
        assert_eq!(s[1], zigzag[1]);
        assert_eq!(s[3], zigzag[3]);
        assert!((s[2].easting - 0.5).abs() < 1e-12);
    }
}
