use super::*;
use crate::grid::Direction;
use crate::numeric::{Common, CommonType, Double, Fixed32_16, Fixed64_16, Fixed64_32, Float, Scalar};
use crate::scenario::Scenario;

const SHELF: &str = "3 3\n...\n...\n###\n0.1\n. 1.0\n";

const BASIN: &str = "\
8 10
##########
#        #
#  ..    #
# ....   #
#......  #
#........#
#........#
##########
0.1
  0.01
. 1
";

fn config(threads: usize) -> EngineConfig {
    EngineConfig {
        worker_threads: threads,
        seed: 1337,
    }
}

fn build<P, V, VF>(text: &str, threads: usize) -> FluidEngine<P, V, VF>
where
    P: Scalar,
    V: Scalar + CommonType<VF>,
    VF: Scalar,
{
    FluidEngine::new(Scenario::parse(text).unwrap(), &config(threads)).unwrap()
}

fn quiet(ticks: u64) -> RunOptions {
    RunOptions {
        ticks,
        render: false,
        ..RunOptions::default()
    }
}

#[test]
fn test_gravity_reaches_cells_resting_on_fluid() {
    let mut engine: FluidEngine<f64, f64, f64> = build(SHELF, 2);
    engine.apply_gravity();

    for y in 0..3 {
        assert_eq!(engine.velocity(0, y, Direction::Down), 0.1);
        // row 1 rests on the wall row
        assert_eq!(engine.velocity(1, y, Direction::Down), 0.0);
        assert_eq!(engine.velocity(0, y, Direction::Up), 0.0);
    }
}

#[test]
fn test_gravity_in_fixed_point() {
    let mut engine: FluidEngine<Fixed32_16, Fixed32_16, Fixed32_16> = build(SHELF, 1);
    engine.apply_gravity();
    engine.apply_gravity();
    let g = Fixed32_16::from_f64(0.1);
    assert_eq!(engine.velocity(0, 1, Direction::Down), g + g);
}

#[test]
fn test_neighbor_counts_treat_walls_and_edges_alike() {
    let engine: FluidEngine<f64, f64, f64> = build(SHELF, 3);
    assert_eq!(engine.neighbor_count(0, 0), 2);
    assert_eq!(engine.neighbor_count(0, 1), 3);
    assert_eq!(engine.neighbor_count(1, 1), 3);
    assert_eq!(engine.neighbor_count(1, 0), 2);
    assert_eq!(engine.neighbor_count(2, 1), 0);
}

#[test]
fn test_pressure_difference_becomes_velocity() {
    let mut engine: FluidEngine<f64, f64, f64> = build("1 2\n..\n0\n. 2\n", 1);
    engine.set_pressure(0, 0, 4.0);

    let delta = engine.apply_pressure_forces();

    assert_eq!(delta, -4.0);
    assert_eq!(engine.velocity(0, 0, Direction::Right), 2.0);
    assert_eq!(engine.pressure(0, 0), 0.0);
    assert_eq!(engine.pressure(0, 1), 0.0);
}

#[test]
fn test_opposing_velocity_absorbs_pressure_force() {
    let mut engine: FluidEngine<f64, f64, f64> = build("1 2\n..\n0\n. 2\n", 1);
    engine.set_pressure(0, 0, 4.0);
    engine.set_velocity(0, 1, Direction::Left, 10.0);

    let delta = engine.apply_pressure_forces();

    assert_eq!(delta, 0.0);
    assert_eq!(engine.velocity(0, 1, Direction::Left), 8.0);
    assert_eq!(engine.velocity(0, 0, Direction::Right), 0.0);
    assert_eq!(engine.pressure(0, 0), 4.0);
}

#[test]
fn test_lost_kinetic_energy_turns_into_pressure() {
    let mut engine: FluidEngine<f64, f64, f64> = build("1 3\no.#\n0\no 2\n. 1\n", 2);
    engine.set_velocity(0, 0, Direction::Right, 4.0);
    engine.set_velocity(0, 1, Direction::Right, 2.0);

    assert_eq!(engine.recalc_flow(), 1);
    let delta = engine.recalc_pressure();

    // 'o' pushes into (0, 1): 4 * 2 over one neighbor
    // '.' pushes into the wall, damped and kept: 2 * 1 * 0.8
    assert_eq!(engine.pressure(0, 1), 8.0 + 1.6);
    assert_eq!(engine.pressure(0, 0), 0.0);
    assert!((delta - 9.6).abs() < 1e-12);
    assert_eq!(engine.velocity(0, 0, Direction::Right), 0.0);
    assert_eq!(engine.velocity(0, 1, Direction::Right), 0.0);
}

#[test]
fn test_flow_stays_within_velocity_after_relaxation() {
    let mut engine: FluidEngine<f64, f64, f64> = build(BASIN, 2);
    engine.run_with_output(&quiet(15), &mut std::io::sink()).unwrap();

    engine.apply_gravity();
    engine.apply_pressure_forces();
    engine.recalc_flow();

    for x in 0..engine.rows() {
        for y in 0..engine.cols() {
            for direction in Direction::ALL {
                let v = engine.velocity(x, y, direction);
                if v > 0.0 {
                    assert!(engine.flow(x, y, direction) <= v, "({x}, {y}) {direction:?}");
                }
            }
        }
    }
}

/// Runs the tick phases by hand and checks after every flow relaxation that
/// no edge carries more flow than its velocity.
fn assert_flow_bounded<P, V, VF>(ticks: usize)
where
    P: Scalar,
    V: Scalar + CommonType<VF>,
    VF: Scalar,
{
    let mut engine: FluidEngine<P, V, VF> = build(BASIN, 2);

    for tick in 0..ticks {
        engine.apply_gravity();
        engine.apply_pressure_forces();
        engine.recalc_flow();

        for x in 0..engine.rows() {
            for y in 0..engine.cols() {
                for direction in Direction::ALL {
                    let velocity: Common<V, VF> = engine.velocity(x, y, direction).cast();
                    let flow: Common<V, VF> = engine.flow(x, y, direction).cast();
                    if velocity > Common::<V, VF>::zero() {
                        assert!(
                            flow <= velocity,
                            "tick {tick}: flow {flow} over velocity {velocity} at ({x}, {y}) {direction:?}"
                        );
                    }
                }
            }
        }

        engine.recalc_pressure();
        engine.maybe_propagate();
    }
}

#[test]
fn test_flow_bounded_in_floats() {
    assert_flow_bounded::<Float, Float, Float>(80);
    assert_flow_bounded::<Double, Double, Double>(80);
}

#[test]
fn test_flow_bounded_in_fixed_point() {
    assert_flow_bounded::<Fixed32_16, Fixed32_16, Fixed32_16>(80);
    assert_flow_bounded::<Fixed64_16, Fixed64_16, Fixed64_16>(80);
    assert_flow_bounded::<Fixed64_32, Fixed64_32, Fixed64_32>(80);
}

#[test]
fn test_flow_bounded_with_mixed_types() {
    // fixed-point flow under double velocity must round down
    assert_flow_bounded::<Fixed32_16, Double, Fixed32_16>(80);
    assert_flow_bounded::<Fixed32_16, Fixed32_16, Double>(80);
    assert_flow_bounded::<Double, Fixed32_16, Fixed64_32>(80);
    assert_flow_bounded::<Fixed64_32, Fixed32_16, Fixed64_16>(80);
    assert_flow_bounded::<Float, Fixed32_16, Double>(80);
}

#[test]
fn test_construction_copies_layout() {
    let engine: FluidEngine<f64, f64, f64> = build(BASIN, 1);
    let expected: String = BASIN.lines().skip(1).take(8).map(|row| format!("{row}\n")).collect();
    assert_eq!(engine.render_field(), expected);
    assert_eq!(engine.medium(3, 2), b'.');
    assert_eq!(engine.medium(0, 0), b'#');
}

#[test]
fn test_media_are_conserved() {
    let mut engine: FluidEngine<f64, f64, f64> = build(BASIN, 3);
    let before = engine.medium_counts();
    for _ in 0..40 {
        engine.tick();
        assert_eq!(engine.medium_counts(), before);
    }
}

#[test]
fn test_zero_ticks_leave_engine_untouched() {
    let mut engine: FluidEngine<f64, f64, f64> = build(BASIN, 2);
    let initial = engine.snapshot();
    let mut out = Vec::new();

    let summary = engine.run_with_output(&quiet(0), &mut out).unwrap();

    assert_eq!(summary.ticks, 0);
    assert!(out.is_empty());
    assert_eq!(engine.snapshot(), initial);
    assert_eq!(engine.epoch(), 0);
    assert_eq!(engine.ticks_done(), 0);
}

#[test]
fn test_walled_grid_never_propagates() {
    let mut engine: FluidEngine<f64, f64, f64> = build("3 3\n###\n###\n###\n0.1\n", 2);
    let mut out = Vec::new();
    let options = RunOptions {
        ticks: 25,
        ..RunOptions::default()
    };

    let summary = engine.run_with_output(&options, &mut out).unwrap();

    assert_eq!(summary.propagating_ticks, 0);
    assert!(out.is_empty());
}

#[test]
fn test_same_seed_replays_identically_across_thread_counts() {
    let mut single: FluidEngine<Fixed32_16, Fixed32_16, Fixed32_16> = build(BASIN, 1);
    let mut pooled: FluidEngine<Fixed32_16, Fixed32_16, Fixed32_16> = build(BASIN, 4);

    for _ in 0..30 {
        assert_eq!(single.tick(), pooled.tick());
        assert_eq!(single.render_field(), pooled.render_field());
        for x in 0..single.rows() {
            for y in 0..single.cols() {
                assert_eq!(single.pressure(x, y), pooled.pressure(x, y));
                for direction in Direction::ALL {
                    assert_eq!(single.velocity(x, y, direction), pooled.velocity(x, y, direction));
                }
            }
        }
    }
}

#[test]
fn test_rendered_ticks_follow_output_format() {
    let mut engine: FluidEngine<f64, f64, f64> = build(BASIN, 2);
    let mut out = Vec::new();
    let options = RunOptions {
        ticks: 30,
        ..RunOptions::default()
    };

    let summary = engine.run_with_output(&options, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let blocks: Vec<&str> = text.split_terminator("\n\n").collect();
    assert_eq!(blocks.len() as u64, summary.propagating_ticks);
    for block in blocks {
        let mut lines = block.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Tick ") && header.ends_with(':'), "{header}");
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|row| row.len() == 10));
    }
}

#[test]
fn test_snapshots_written_at_interval() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine: FluidEngine<f64, f64, f64> = build(BASIN, 2);
    let options = RunOptions {
        ticks: 5,
        render: false,
        snapshot_interval: Some(2),
        snapshot_dir: dir.path().to_path_buf(),
    };

    let summary = engine.run_with_output(&options, &mut std::io::sink()).unwrap();

    assert_eq!(summary.snapshots_written, 2);
    assert!(dir.path().join("tick_1.txt").exists());
    assert!(dir.path().join("tick_3.txt").exists());
    assert!(!dir.path().join("tick_4.txt").exists());
}

#[test]
fn test_mixed_numeric_types_run() {
    let mut engine: FluidEngine<Fixed32_16, Double, Fixed32_16> = build(BASIN, 2);
    let before = engine.medium_counts();
    engine.run_with_output(&quiet(10), &mut std::io::sink()).unwrap();
    assert_eq!(engine.medium_counts(), before);
    assert_eq!(engine.ticks_done(), 10);
}

#[test]
fn test_construction_rejects_inconsistent_scenarios() {
    let missing = Scenario::<f64, f64> {
        rows: 1,
        cols: 2,
        field: vec![b".o".to_vec()],
        gravity: 0.1,
        densities: vec![(b'.', 1.0)],
    };
    assert!(FluidEngine::<f64, f64, f64>::new(missing, &config(1)).is_err());

    let ragged = Scenario::<f64, f64> {
        rows: 2,
        cols: 2,
        field: vec![b"..".to_vec(), b".".to_vec()],
        gravity: 0.1,
        densities: vec![(b'.', 1.0)],
    };
    assert!(FluidEngine::<f64, f64, f64>::new(ragged, &config(1)).is_err());
}
