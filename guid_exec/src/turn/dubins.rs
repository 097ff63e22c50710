//! Dubins paths
//!
//! Shortest forward-only paths between two poses for a vehicle with a minimum turning radius.
//! The six candidate words are computed in the usual mathematical frame (x east, y north,
//! angles counter-clockwise from x), where a counter-clockwise arc is a left turn for the
//! driver. Poses are converted in and out of that frame here so nothing else needs to care.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use super::{builder::PathBuilder, TurnDirection, TurnError};
use crate::geom::{normalize_angle, Position3D};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Candidates whose lengths differ by less than this are considered tied.
///
/// Units: meters
const TIE_TOLERANCE_M: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DubinsPath {
    pub path_type: DubinsPathType,

    /// Lengths of the three segments.
    ///
    /// Units: meters
    pub segment_lengths: [f64; 3],

    /// Units: meters
    pub total_length: f64,

    pub waypoints: Vec<Position3D>,
}

/// Start pose and radius normalised to a unit turning circle.
struct Normalised {
    d: f64,
    alpha: f64,
    beta: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DubinsPathType {
    LSL,
    LSR,
    RSL,
    RSR,
    RLR,
    LRL,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Segment {
    Left,
    Straight,
    Right,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DubinsPathType {
    pub const ALL: [DubinsPathType; 6] = [
        DubinsPathType::LSL,
        DubinsPathType::LSR,
        DubinsPathType::RSL,
        DubinsPathType::RSR,
        DubinsPathType::RLR,
        DubinsPathType::LRL,
    ];

    fn segments(&self) -> [Segment; 3] {
        use Segment::*;

        match self {
            DubinsPathType::LSL => [Left, Straight, Left],
            DubinsPathType::LSR => [Left, Straight, Right],
            DubinsPathType::RSL => [Right, Straight, Left],
            DubinsPathType::RSR => [Right, Straight, Right],
            DubinsPathType::RLR => [Right, Left, Right],
            DubinsPathType::LRL => [Left, Right, Left],
        }
    }

    /// Direction of the first arc.
    pub fn first_turn(&self) -> TurnDirection {
        match self.segments()[0] {
            Segment::Left => TurnDirection::Left,
            _ => TurnDirection::Right,
        }
    }

    /// Normalised segment parameters `(t, p, q)` for this word, or `None` if it cannot join the
    /// poses. Arcs are in radians, straights in turning radii.
    fn params(&self, n: &Normalised) -> Option<[f64; 3]> {
        let (d, a, b) = (n.d, n.alpha, n.beta);
        let (sa, ca) = a.sin_cos();
        let (sb, cb) = b.sin_cos();
        let c_ab = (a - b).cos();

        match self {
            DubinsPathType::LSL => {
                let p_sq = 2.0 + d * d - 2.0 * c_ab + 2.0 * d * (sa - sb);
                if p_sq < 0.0 {
                    return None;
                }
                let tmp = (cb - ca).atan2(d + sa - sb);
                Some([mod2pi(tmp - a), p_sq.sqrt(), mod2pi(b - tmp)])
            }
            DubinsPathType::RSR => {
                let p_sq = 2.0 + d * d - 2.0 * c_ab + 2.0 * d * (sb - sa);
                if p_sq < 0.0 {
                    return None;
                }
                let tmp = (ca - cb).atan2(d - sa + sb);
                Some([mod2pi(a - tmp), p_sq.sqrt(), mod2pi(tmp - b)])
            }
            DubinsPathType::LSR => {
                let p_sq = -2.0 + d * d + 2.0 * c_ab + 2.0 * d * (sa + sb);
                if p_sq < 0.0 {
                    return None;
                }
                let p = p_sq.sqrt();
                let tmp = (-ca - cb).atan2(d + sa + sb) - (-2.0f64).atan2(p);
                Some([mod2pi(tmp - a), p, mod2pi(tmp - b)])
            }
            DubinsPathType::RSL => {
                let p_sq = -2.0 + d * d + 2.0 * c_ab - 2.0 * d * (sa + sb);
                if p_sq < 0.0 {
                    return None;
                }
                let p = p_sq.sqrt();
                let tmp = (ca + cb).atan2(d - sa - sb) - 2.0f64.atan2(p);
                Some([mod2pi(a - tmp), p, mod2pi(b - tmp)])
            }
            DubinsPathType::RLR => {
                let tmp = (6.0 - d * d + 2.0 * c_ab + 2.0 * d * (sa - sb)) / 8.0;
                if tmp.abs() > 1.0 {
                    return None;
                }
                let p = mod2pi(std::f64::consts::TAU - tmp.acos());
                let t = mod2pi(a - (ca - cb).atan2(d - sa + sb) + p / 2.0);
                Some([t, p, mod2pi(a - b - t + p)])
            }
            DubinsPathType::LRL => {
                let tmp = (6.0 - d * d + 2.0 * c_ab + 2.0 * d * (sb - sa)) / 8.0;
                if tmp.abs() > 1.0 {
                    return None;
                }
                let p = mod2pi(std::f64::consts::TAU - tmp.acos());
                let t = mod2pi(-a - (ca - cb).atan2(d + sa - sb) + p / 2.0);
                Some([t, p, mod2pi(b - a - t + p)])
            }
        }
    }
}

impl DubinsPath {
    /// Segment lengths of every feasible candidate joining the two poses.
    pub fn candidates(
        entry: &Position3D,
        exit: &Position3D,
        radius_m: f64,
    ) -> Result<Vec<(DubinsPathType, [f64; 3])>, TurnError> {
        let n = normalise(entry, exit, radius_m)?;

        Ok(DubinsPathType::ALL
            .iter()
            .filter_map(|t| {
                t.params(&n)
                    .map(|p| (*t, [p[0] * radius_m, p[1] * radius_m, p[2] * radius_m]))
            })
            .collect())
    }

    /// The shortest path joining the poses, sampled every `spacing_m`.
    ///
    /// Candidates tied on length prefer the one whose first turn is `preferred`.
    pub fn shortest(
        entry: &Position3D,
        exit: &Position3D,
        radius_m: f64,
        spacing_m: f64,
        preferred: Option<TurnDirection>,
    ) -> Result<Self, TurnError> {
        let mut candidates: Vec<(NotNan<f64>, DubinsPathType, [f64; 3])> =
            Self::candidates(entry, exit, radius_m)?
                .into_iter()
                .filter_map(|(t, s)| NotNan::new(s.iter().sum::<f64>()).ok().map(|l| (l, t, s)))
                .collect();

        candidates.sort_by_key(|c| c.0);

        let (min_len, _, _) = *candidates
            .first()
            .ok_or(TurnError::NoDubinsPath)?;

        let (_, path_type, segment_lengths) = candidates
            .iter()
            .take_while(|c| c.0.into_inner() - min_len.into_inner() < TIE_TOLERANCE_M)
            .find(|c| Some(c.1.first_turn()) == preferred)
            .unwrap_or(&candidates[0]);

        trace!(
            "Dubins {:?} {:?} from {} candidates",
            path_type,
            segment_lengths,
            candidates.len()
        );

        Ok(Self::sample(entry, exit, *path_type, *segment_lengths, radius_m, spacing_m))
    }

    /// Sample the path of the given type and segment lengths.
    fn sample(
        entry: &Position3D,
        exit: &Position3D,
        path_type: DubinsPathType,
        segment_lengths: [f64; 3],
        radius_m: f64,
        spacing_m: f64,
    ) -> Self {
        let mut builder = PathBuilder::new(*entry, spacing_m);

        for (seg, len) in path_type.segments().iter().zip(segment_lengths.iter()) {
            match seg {
                Segment::Straight => builder.straight(*len),
                Segment::Left => builder.arc(radius_m, len / radius_m, TurnDirection::Left),
                Segment::Right => builder.arc(radius_m, len / radius_m, TurnDirection::Right),
            };
        }

        builder.snap_end(*exit);

        Self {
            path_type,
            segment_lengths,
            total_length: segment_lengths.iter().sum(),
            waypoints: builder.build().waypoints,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn mod2pi(a: f64) -> f64 {
    normalize_angle(a)
}

/// Compass heading to mathematical angle.
fn to_math_angle(heading_rad: f64) -> f64 {
    mod2pi(std::f64::consts::FRAC_PI_2 - heading_rad)
}

fn normalise(entry: &Position3D, exit: &Position3D, radius_m: f64) -> Result<Normalised, TurnError> {
    if !(radius_m.is_finite() && radius_m > 0.0) {
        return Err(TurnError::InvalidParameter {
            name: "turning_radius_m",
            value: radius_m,
        });
    }
    if !(entry.easting.is_finite() && entry.northing.is_finite() && entry.heading_rad.is_finite())
    {
        return Err(TurnError::InvalidPose("entry"));
    }
    if !(exit.easting.is_finite() && exit.northing.is_finite() && exit.heading_rad.is_finite()) {
        return Err(TurnError::InvalidPose("exit"));
    }

    let dx = exit.easting - entry.easting;
    let dy = exit.northing - entry.northing;
    let theta = mod2pi(dy.atan2(dx));

    Ok(Normalised {
        d: (dx * dx + dy * dy).sqrt() / radius_m,
        alpha: mod2pi(to_math_angle(entry.heading_rad) - theta),
        beta: mod2pi(to_math_angle(exit.heading_rad) - theta),
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
