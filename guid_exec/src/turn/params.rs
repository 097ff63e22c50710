//! Turn planner parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::TurnError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnParameters {

    // ---- STYLE ----

    pub turn_style: TurnStyle,

    /// Minimum turning radius of the vehicle.
    ///
    /// Units: meters
    pub turning_radius_m: f64,

    /// Multiplier applied to the turning radius for [`TurnStyle::Wide`] turns.
    #[serde(default = "default_wide_radius_multiplier")]
    pub wide_radius_multiplier: f64,

    /// Blend applied to each interior waypoint toward the midpoint of its neighbours, `[0, 1]`.
    #[serde(default)]
    pub smoothing_factor: f64,

    /// Units: meters
    pub waypoint_spacing_m: f64,

    // ---- TRACK SELECTION ----

    pub row_skip_mode: RowSkipMode,

    /// Width of a skipped row. Informational, the track layout spacing is used for planning.
    ///
    /// Units: meters
    #[serde(default)]
    pub row_skip_width_m: f64,

    /// Tracks moved over per turn in [`RowSkipMode::Alternative`].
    #[serde(default = "default_tracks_to_skip")]
    pub tracks_to_skip: u32,

    /// Flip the work direction when the edge of the field is reached.
    #[serde(default)]
    pub allow_direction_reversal: bool,

    // ---- BOUNDARY ----

    /// Waypoints closer than this to the boundary are violations.
    ///
    /// Units: meters
    pub boundary_min_distance_m: f64,

    /// Cap on the number of boundary guided sampling iterations.
    #[serde(default = "default_max_sampling_iterations")]
    pub max_sampling_iterations: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStyle {
    /// Shortest Dubins path at the turning radius
    Omega,

    /// Dubins path at the turning radius scaled by the wide multiplier
    Wide,

    /// Arc, straight, arc
    T,

    /// Arc, diagonal, arc, diagonal, arc
    Y,

    /// Three point turn
    K,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowSkipMode {
    /// Move to the adjacent track
    Normal,

    /// Move over a fixed number of tracks
    Alternative,

    /// Move to the closest track which hasn't been worked yet
    IgnoreWorkedTracks,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TurnParameters {
    fn default() -> Self {
        Self {
            turn_style: TurnStyle::Omega,
            turning_radius_m: 6.0,
            wide_radius_multiplier: default_wide_radius_multiplier(),
            smoothing_factor: 0.0,
            waypoint_spacing_m: 0.5,
            row_skip_mode: RowSkipMode::Normal,
            row_skip_width_m: 0.0,
            tracks_to_skip: default_tracks_to_skip(),
            allow_direction_reversal: false,
            boundary_min_distance_m: 1.0,
            max_sampling_iterations: default_max_sampling_iterations(),
        }
    }
}

impl TurnParameters {
    /// Check the parameters can be planned with.
    pub fn validate(&self) -> Result<(), TurnError> {
        let positive = [
            ("turning_radius_m", self.turning_radius_m),
            ("waypoint_spacing_m", self.waypoint_spacing_m),
            ("wide_radius_multiplier", self.wide_radius_multiplier),
        ];

        for &(name, value) in positive.iter() {
            if !value.is_finite() || value <= 0.0 {
                return Err(TurnError::InvalidParameter { name, value });
            }
        }

        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(TurnError::InvalidParameter {
                name: "smoothing_factor",
                value: self.smoothing_factor,
            });
        }

        if !self.boundary_min_distance_m.is_finite() || self.boundary_min_distance_m < 0.0 {
            return Err(TurnError::InvalidParameter {
                name: "boundary_min_distance_m",
                value: self.boundary_min_distance_m,
            });
        }

        if self.row_skip_mode == RowSkipMode::Alternative && self.tracks_to_skip == 0 {
            return Err(TurnError::ZeroTracksToSkip);
        }

        Ok(())
    }

    /// Radius the Dubins candidates are computed for.
    pub fn effective_radius_m(&self) -> f64 {
        match self.turn_style {
            TurnStyle::Wide => self.turning_radius_m * self.wide_radius_multiplier,
            _ => self.turning_radius_m,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_wide_radius_multiplier() -> f64 {
    1.5
}

fn default_tracks_to_skip() -> u32 {
    1
}

fn default_max_sampling_iterations() -> usize {
    10
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(TurnParameters::default().validate().is_ok());

        let bad = [
            TurnParameters { turning_radius_m: 0.0, ..Default::default() },
            TurnParameters { waypoint_spacing_m: -1.0, ..Default::default() },
            TurnParameters { smoothing_factor: 1.5, ..Default::default() },
            TurnParameters { boundary_min_distance_m: -0.1, ..Default::default() },
            TurnParameters { wide_radius_multiplier: 0.0, ..Default::default() },
            TurnParameters { turning_radius_m: f64::NAN, ..Default::default() },
        ];
        for p in bad.iter() {
            assert!(
                matches!(p.validate(), Err(TurnError::InvalidParameter { .. })),
                "{:?}",
                p
            );
        }

        let skip = TurnParameters {
            row_skip_mode: RowSkipMode::Alternative,
            tracks_to_skip: 0,
            ..Default::default()
        };
        assert!(matches!(skip.validate(), Err(TurnError::ZeroTracksToSkip)));
    }

    #[test]
    fn test_effective_radius() {
        let p = TurnParameters {
            turn_style: TurnStyle::Wide,
            turning_radius_m: 4.0,
            wide_radius_multiplier: 2.0,
            ..Default::default()
        };
        assert_eq!(p.effective_radius_m(), 8.0);

        let p = TurnParameters { turn_style: TurnStyle::T, ..p };
        assert_eq!(p.effective_radius_m(), 4.0);
    }

    #[test]
    fn test_defaults_from_file() {
        let p: TurnParameters = util::params::from_str(
            r#"
            turn_style = "Omega"
            turning_radius_m = 5.0
            waypoint_spacing_m = 1.0
            row_skip_mode = "Normal"
            boundary_min_distance_m = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(p.max_sampling_iterations, 10);
        assert_eq!(p.tracks_to_skip, 1);
        assert!(p.validate().is_ok());
    }
}
