//! # Turn Planner Benchmark

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use guid_lib::{
    geom::{Position2D, Position3D},
    kinematics::{propagate, BodyPoses, ChainInput, ToolGeometry, ToolMount, VehicleConfiguration},
    turn::{TrackLayout, TrackRange, TurnParameters, TurnPlanner, TurnRequest, TurnStyle},
};

fn turn_planner_benchmark(c: &mut Criterion) {
    // ---- Build a field of tracks ----

    let layout = TrackLayout {
        origin: Position2D::new(0.0, 0.0),
        heading_rad: 0.0,
        spacing_m: 12.0,
    };
    let range = TrackRange { first: 0, last: 20 };
    let worked: HashSet<i32> = vec![0, 1, 2].into_iter().collect();

    let open_field: Vec<Position2D> = Vec::new();

    // Headland close enough to the track ends that the standard path is rejected
    let tight_field = vec![
        Position2D::new(-20.0, -20.0),
        Position2D::new(260.0, -20.0),
        Position2D::new(260.0, 106.0),
        Position2D::new(-20.0, 106.0),
    ];

    let entry = Position3D::new(24.0, 100.0, 0.0);

    let planner = |style: TurnStyle| {
        TurnPlanner::new(TurnParameters {
            turn_style: style,
            turning_radius_m: 5.0,
            boundary_min_distance_m: 2.0,
            smoothing_factor: 0.2,
            ..Default::default()
        })
        .unwrap()
    };

    let open = TurnRequest {
        entry,
        current_track: 2,
        direction: 1,
        layout,
        range,
        boundary: &open_field,
        worked: &worked,
    };
    let tight = TurnRequest {
        boundary: &tight_field,
        ..open.clone()
    };

    let omega = planner(TurnStyle::Omega);
    c.bench_function("plan_turn omega open field", |b| {
        b.iter(|| omega.plan_turn(black_box(&open)))
    });

    c.bench_function("plan_turn omega guided", |b| {
        b.iter(|| omega.plan_turn(black_box(&tight)))
    });

    let k = planner(TurnStyle::K);
    c.bench_function("plan_turn k-turn", |b| {
        b.iter(|| k.plan_turn(black_box(&open)))
    });
}

fn kinematics_benchmark(c: &mut Criterion) {
    let vehicle = VehicleConfiguration::default();
    let tool = ToolGeometry {
        mount: ToolMount::TowBetween,
        ..Default::default()
    };

    // One lap of a circle, a tick per degree
    let inputs: Vec<ChainInput> = (0..360)
        .map(|i| {
            let a = (i as f64).to_radians();
            ChainInput {
                antenna: Position2D::new(20.0 * a.cos(), -20.0 * a.sin()),
                heading_rad: a,
                speed_ms: 2.0,
                distance_moved_m: 20.0 * 1f64.to_radians(),
            }
        })
        .collect();

    c.bench_function("propagate tow-between lap", |b| {
        b.iter(|| {
            let mut prev: Option<BodyPoses> = None;
            for input in inputs.iter() {
                prev = Some(propagate(&vehicle, &tool, black_box(input), prev.as_ref()));
            }
            prev
        })
    });
}

criterion_group!(benches, turn_planner_benchmark, kinematics_benchmark);
criterion_main!(benches);
