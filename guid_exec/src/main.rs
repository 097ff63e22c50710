//! Guidance replay executable entry point.
//!
//! # Architecture
//!
//! The executable drives a simulated vehicle over a field of parallel tracks:
//!
//!     - Initialise the session, logger and guidance pipeline
//!     - For each pass:
//!         - Drive the pass, feeding position fixes through the pipeline
//!         - Plan the turn onto the next track
//!         - Archive the turn and drive it through the pipeline
//!     - Stop when no track is left or the pass limit is reached
//!
//! Turn plans and pass summaries are archived as JSON in the session directory.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;

// Internal
use guid_lib::{
    geom::Position3D,
    kinematics::BodyPoses,
    pipeline::{GuidancePipeline, ParamFiles, SensorSample},
    turn::{TrackRange, TurnParameters, TurnPlanner, TurnRequest},
};
use params::GuidExecParams;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::{self, Session},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Summary of one pass, archived at the end of the pass.
#[derive(Serialize)]
struct PassSummary {
    track: i32,
    ticks: usize,
    jackknifed_ticks: usize,
    final_poses: Option<BodyPoses>,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("guid_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(
        LevelFilter::Debug,
        &[("guid_lib::turn::guided", LevelFilter::Info)],
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("Guidance Replay Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: GuidExecParams =
        util::params::load("guid_exec.toml").wrap_err("Could not load exec params")?;
    let turn_params: TurnParameters =
        util::params::load("turn.toml").wrap_err("Could not load turn params")?;

    if exec_params.speed_ms <= 0.0 || exec_params.tick_period_s <= 0.0 {
        return Err(eyre!("Replay speed and tick period must be positive"));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut pipeline = GuidancePipeline::default();
    pipeline
        .init(ParamFiles::default(), &session)
        .wrap_err("Failed to initialise the guidance pipeline")?;

    let planner = TurnPlanner::new(turn_params).wrap_err("Invalid turn parameters")?;

    info!("Modules initialised");

    // ---- MAIN LOOP ----

    let range = TrackRange {
        first: exec_params.first_track,
        last: exec_params.last_track,
    };
    let mut worked = HashSet::new();
    let mut track = exec_params.first_track;
    let mut direction = 1;
    let mut start = exec_params.layout.track_pose(track);

    for pass in 0..exec_params.max_passes {
        info!("Pass {} on track {}", pass, track);

        let step_m = exec_params.speed_ms * exec_params.tick_period_s;
        let num_ticks = (exec_params.pass_length_m / step_m).ceil() as usize;

        let mut summary = PassSummary {
            track,
            ticks: 0,
            jackknifed_ticks: 0,
            final_poses: None,
        };
        let mut entry = start;

        for i in 0..=num_ticks {
            let along_m = (i as f64 * step_m).min(exec_params.pass_length_m);
            let pose = start.offset(along_m, 0.0);

            let (output, report) = pipeline
                .proc(&sample(&pose, exec_params.speed_ms, false))
                .wrap_err("Pipeline processing failed")?;

            summary.ticks += 1;
            if report.jackknifed {
                summary.jackknifed_ticks += 1;
            }
            summary.final_poses = Some(output.poses);

            entry = pose.position().with_heading(output.heading.heading_rad);
        }

        worked.insert(track);
        session.save(format!("passes/pass_{:03}.json", pass), summary);

        // ---- TURN ----

        let result = planner.plan_turn(&TurnRequest {
            entry,
            current_track: track,
            direction,
            layout: exec_params.layout,
            range,
            boundary: &exec_params.boundary,
            worked: &worked,
        });

        let path = match (result.succeeded, result.path.clone()) {
            (true, Some(p)) => p,
            _ => {
                info!(
                    "Field finished after {} passes: {}",
                    pass + 1,
                    result.reason.as_deref().unwrap_or("turn failed")
                );
                session.save(format!("turns/turn_{:03}.json", pass), result);
                break;
            }
        };

        session.save(format!("turns/turn_{:03}.json", pass), result);

        for (i, wp) in path.waypoints.iter().enumerate() {
            let (_, report) = pipeline
                .proc(&sample(wp, exec_params.speed_ms, path.is_reversing_at(i)))
                .wrap_err("Pipeline processing failed during turn")?;

            if report.jackknifed {
                warn!("Jackknife during turn {} at waypoint {}", pass, i);
            }
        }

        if path.direction_reversed {
            direction = -direction;
        }
        track = path.next_track_index;
        start = path.exit;
    }

    let mut worked: Vec<i32> = worked.into_iter().collect();
    worked.sort_unstable();
    info!("Worked tracks: {:?}", worked);
    session::save_with_timestamp("worked_tracks.json", worked);

    session.exit();

    Ok(())
}

/// A sensor sample at the given pose with no auxiliary heading sources.
fn sample(pose: &Position3D, speed_ms: f64, is_reversing: bool) -> SensorSample {
    SensorSample {
        fix: pose.position(),
        speed_ms,
        is_reversing,
        ..Default::default()
    }
}
