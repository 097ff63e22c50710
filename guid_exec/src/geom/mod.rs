//! # Geometry
//!
//! Planar geometry used throughout the guidance core. Positions are in a
//! projected local plane (easting/northing, meters) and headings are compass
//! headings in radians (zero north, clockwise, `[0, 2pi)`).
//!
//! Vector algebra is performed on `nalgebra::Vector2<f64>` with `x` holding the
//! easting and `y` the northing component.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub use util::maths::{angular_delta, normalize_angle, wrap_pi};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Denominators smaller than this are treated as parallel lines.
const PARALLEL_EPSILON: f64 = 1e-12;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position in the local plane.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position2D {
    /// Units: meters
    pub easting: f64,

    /// Units: meters
    pub northing: f64,
}

/// A position in the local plane together with a heading.
///
/// Every body in the kinematic chain is described by one of these.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    /// Units: meters
    pub easting: f64,

    /// Units: meters
    pub northing: f64,

    /// Compass heading of the body.
    ///
    /// Units: radians, `[0, 2pi)`
    pub heading_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Position2D {
    pub fn new(easting: f64, northing: f64) -> Self {
        Self { easting, northing }
    }

    /// Vector from the origin of the plane to this position.
    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.easting, self.northing)
    }

    /// Attach a heading to this position, normalising it.
    pub fn with_heading(&self, heading_rad: f64) -> Position3D {
        Position3D::new(self.easting, self.northing, heading_rad)
    }

    pub fn is_finite(&self) -> bool {
        self.easting.is_finite() && self.northing.is_finite()
    }
}

impl From<Vector2<f64>> for Position2D {
    fn from(v: Vector2<f64>) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Position2D> for Vector2<f64> {
    fn from(p: Position2D) -> Self {
        p.to_vector()
    }
}

impl From<Position3D> for Position2D {
    fn from(p: Position3D) -> Self {
        p.position()
    }
}

impl Position3D {
    /// Create a new pose, normalising the heading into `[0, 2pi)`.
    pub fn new(easting: f64, northing: f64, heading_rad: f64) -> Self {
        Self {
            easting,
            northing,
            heading_rad: normalize_angle(heading_rad),
        }
    }

    /// The position part of the pose.
    pub fn position(&self) -> Position2D {
        Position2D::new(self.easting, self.northing)
    }

    /// Vector from the origin of the plane to this pose's position.
    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.easting, self.northing)
    }

    /// Return the pose moved along its own heading by `forward_m` and to its right by
    /// `right_m`.
    pub fn offset(&self, forward_m: f64, right_m: f64) -> Self {
        offset(self, self.heading_rad, forward_m, right_m)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Unit vector pointing along the given compass heading.
pub fn heading_to_vector(heading_rad: f64) -> Vector2<f64> {
    Vector2::new(heading_rad.sin(), heading_rad.cos())
}

/// Compass bearing from one position to another.
///
/// Coincident positions give a bearing of zero.
pub fn bearing(from: &Position2D, to: &Position2D) -> f64 {
    normalize_angle((to.easting - from.easting).atan2(to.northing - from.northing))
}

/// Move `pose`'s position by `forward_m` along `heading_rad` and `right_m` perpendicular to it,
/// returning a pose with the given heading.
pub fn offset(pose: &Position3D, heading_rad: f64, forward_m: f64, right_m: f64) -> Position3D {
    let (sin, cos) = heading_rad.sin_cos();

    Position3D::new(
        pose.easting + forward_m * sin + right_m * cos,
        pose.northing + forward_m * cos - right_m * sin,
        heading_rad,
    )
}

pub fn distance(a: &Position2D, b: &Position2D) -> f64 {
    distance_squared(a, b).sqrt()
}

pub fn distance_squared(a: &Position2D, b: &Position2D) -> f64 {
    (a.easting - b.easting).powi(2) + (a.northing - b.northing).powi(2)
}

/// The z component of the 3D cross product of the two vectors.
///
/// Positive when `b` is counter-clockwise from `a`.
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

pub fn dot(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.dot(b)
}

pub fn magnitude(v: &Vector2<f64>) -> f64 {
    v.norm()
}

/// Normalise the vector, or `None` if it has zero magnitude.
pub fn try_normalize(v: &Vector2<f64>) -> Option<Vector2<f64>> {
    v.try_normalize(0.0)
}

/// Rotate the vector 90 degrees counter-clockwise.
pub fn perpendicular_left(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-v.y, v.x)
}

/// Rotate the vector 90 degrees clockwise.
pub fn perpendicular_right(v: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(v.y, -v.x)
}

/// Project `point` onto the segment `start -> end`.
///
/// Returns the projected point and the parameter `t` along the segment, clamped to `[0, 1]`. A
/// zero length segment projects everything onto `start` with `t = 0`.
pub fn project_on_segment(
    start: &Position2D,
    end: &Position2D,
    point: &Position2D,
) -> (Position2D, f64) {
    let seg = end.to_vector() - start.to_vector();
    let len_sq = seg.norm_squared();

    if len_sq <= 0.0 {
        return (*start, 0.0);
    }

    let t = ((point.to_vector() - start.to_vector()).dot(&seg) / len_sq).clamp(0.0, 1.0);

    (Position2D::from(start.to_vector() + seg * t), t)
}

/// Intersect the ray `origin + s * dir` (`s >= 0`) with the segment `seg_a -> seg_b`.
///
/// Returns `None` for parallel lines, intersections behind the origin or outside the segment.
pub fn ray_segment_intersection(
    origin: &Position2D,
    dir: &Vector2<f64>,
    seg_a: &Position2D,
    seg_b: &Position2D,
) -> Option<Position2D> {
    let seg = seg_b.to_vector() - seg_a.to_vector();
    let denom = cross(dir, &seg);

    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let to_seg = seg_a.to_vector() - origin.to_vector();
    let s = cross(&to_seg, &seg) / denom;
    let t = cross(&to_seg, dir) / denom;

    if s < 0.0 || !(0.0..=1.0).contains(&t) {
        return None;
    }

    Some(Position2D::from(origin.to_vector() + dir * s))
}

/// Cast a ray from the pose along its heading and return the nearest intersection with the
/// polygon, treated as a closed ring.
pub fn raycast_to_polygon(origin: &Position3D, polygon: &[Position2D]) -> Option<Position2D> {
    let start = origin.position();
    let dir = heading_to_vector(origin.heading_rad);

    edges(polygon)
        .filter_map(|(a, b)| ray_segment_intersection(&start, &dir, a, b))
        .min_by(|p, q| {
            distance_squared(&start, p)
                .partial_cmp(&distance_squared(&start, q))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Distance from the point to the nearest edge of the closed polygon, and the nearest point on
/// that edge.
///
/// Returns `None` for an empty polygon. A single vertex polygon is treated as a point.
pub fn distance_to_polygon(point: &Position2D, polygon: &[Position2D]) -> Option<(f64, Position2D)> {
    if polygon.len() == 1 {
        return Some((distance(point, &polygon[0]), polygon[0]));
    }

    edges(polygon)
        .map(|(a, b)| {
            let (proj, _) = project_on_segment(a, b, point);
            (distance(point, &proj), proj)
        })
        .min_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal))
}

/// Even-odd point in polygon test. Polygons with fewer than three vertices contain nothing.
pub fn point_in_polygon(point: &Position2D, polygon: &[Position2D]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;

    for (a, b) in edges(polygon) {
        let crosses = (a.northing > point.northing) != (b.northing > point.northing);
        if crosses {
            let e_at_n = a.easting
                + (point.northing - a.northing) * (b.easting - a.easting)
                    / (b.northing - a.northing);
            if point.easting < e_at_n {
                inside = !inside;
            }
        }
    }

    inside
}

/// Iterate over the edges of a closed ring, including the wrap from the last vertex to the
/// first.
fn edges(polygon: &[Position2D]) -> impl Iterator<Item = (&Position2D, &Position2D)> {
    let n = polygon.len();
    let count = if n < 2 { 0 } else { n };

    (0..count).map(move |i| (&polygon[i], &polygon[(i + 1) % n]))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn square() -> Vec<Position2D> {
        vec![
            Position2D::new(0.0, 0.0),
            Position2D::new(10.0, 0.0),
            Position2D::new(10.0, 10.0),
            Position2D::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_offset_and_bearing() {
        let pose = Position3D::new(100.0, 200.0, FRAC_PI_2);

        // Heading east, forward moves east and right moves south
        let p = pose.offset(2.0, 1.0);
        assert!((p.easting - 102.0).abs() < 1e-9);
        assert!((p.northing - 199.0).abs() < 1e-9);

        let b = bearing(&pose.position(), &p.position());
        assert!(b > FRAC_PI_2 && b < PI);

        assert_eq!(bearing(&Position2D::new(0.0, 0.0), &Position2D::new(0.0, -1.0)), PI);
    }

    #[test]
    fn test_vector_ops() {
        let a = Vector2::new(1.0, 0.0);
        let b = Vector2::new(0.0, 1.0);

        assert_eq!(cross(&a, &b), 1.0);
        assert_eq!(dot(&a, &b), 0.0);
        assert_eq!(magnitude(&Vector2::new(3.0, 4.0)), 5.0);
        assert_eq!(perpendicular_left(&a), b);
        assert_eq!(perpendicular_right(&b), a);

        assert!(try_normalize(&Vector2::new(0.0, 0.0)).is_none());
        let n = try_normalize(&Vector2::new(0.0, 3.0)).unwrap();
        assert!((n - b).norm() < 1e-12);

        let p = Position2D::new(1.0, 1.0);
        let q = Position2D::new(4.0, 5.0);
        assert_eq!(distance(&p, &q), 5.0);
        assert_eq!(distance_squared(&p, &q), 25.0);
    }

    #[test]
    fn test_project_on_segment() {
        let a = Position2D::new(0.0, 0.0);
        let b = Position2D::new(10.0, 0.0);

        let (p, t) = project_on_segment(&a, &b, &Position2D::new(4.0, 3.0));
        assert_eq!(p, Position2D::new(4.0, 0.0));
        assert!((t - 0.4).abs() < 1e-12);

        // Clamped at both ends
        let (p, t) = project_on_segment(&a, &b, &Position2D::new(-4.0, 3.0));
        assert_eq!((p, t), (a, 0.0));
        let (p, t) = project_on_segment(&a, &b, &Position2D::new(14.0, 3.0));
        assert_eq!((p, t), (b, 1.0));

        // Degenerate segment
        let (p, t) = project_on_segment(&a, &a, &Position2D::new(5.0, 5.0));
        assert_eq!((p, t), (a, 0.0));
    }

    #[test]
    fn test_ray_segment_intersection() {
        let origin = Position2D::new(5.0, 5.0);
        let north = heading_to_vector(0.0);
        let a = Position2D::new(0.0, 10.0);
        let b = Position2D::new(10.0, 10.0);

        let hit = ray_segment_intersection(&origin, &north, &a, &b).unwrap();
        assert!((hit.easting - 5.0).abs() < 1e-9);
        assert!((hit.northing - 10.0).abs() < 1e-9);

        // Behind the origin
        let south = heading_to_vector(PI);
        assert!(ray_segment_intersection(&origin, &south, &a, &b).is_none());

        // Parallel
        let east = heading_to_vector(FRAC_PI_2);
        assert!(ray_segment_intersection(&origin, &east, &a, &b).is_none());

        // Misses the segment
        let far = Position2D::new(50.0, 5.0);
        assert!(ray_segment_intersection(&far, &north, &a, &b).is_none());
    }

    #[test]
    fn test_raycast_to_polygon() {
        let poly = square();

        let hit = raycast_to_polygon(&Position3D::new(5.0, 2.0, 0.0), &poly).unwrap();
        assert!((hit.northing - 10.0).abs() < 1e-9);

        // Uses the closing edge from the last vertex back to the first
        let hit = raycast_to_polygon(&Position3D::new(5.0, 2.0, 1.5 * PI), &poly).unwrap();
        assert!(hit.easting.abs() < 1e-9);
        assert!((hit.northing - 2.0).abs() < 1e-9);

        // From outside, the nearest edge wins
        let hit = raycast_to_polygon(&Position3D::new(5.0, -5.0, 0.0), &poly).unwrap();
        assert!(hit.northing.abs() < 1e-9);

        assert!(raycast_to_polygon(&Position3D::new(5.0, 20.0, 0.0), &poly).is_none());
    }

    #[test]
    fn test_polygon_queries() {
        let poly = square();

        let (d, p) = distance_to_polygon(&Position2D::new(3.0, 8.5), &poly).unwrap();
        assert!((d - 1.5).abs() < 1e-12);
        assert!(distance(&p, &Position2D::new(3.0, 10.0)) < 1e-9);

        assert!(distance_to_polygon(&Position2D::new(3.0, 8.5), &[]).is_none());

        assert!(point_in_polygon(&Position2D::new(3.0, 8.5), &poly));
        assert!(!point_in_polygon(&Position2D::new(-3.0, 8.5), &poly));
        assert!(!point_in_polygon(&Position2D::new(3.0, 8.5), &poly[..2]));
    }
}
