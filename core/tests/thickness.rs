//! Thickness update tests: hand-computed steps, clamping, boundaries.

use flowline_core::{
    boundary::BoundaryCondition,
    config::{Configuration, ModelParams},
    flux::FluxCalculator,
    mass_balance::{ConstantMassBalance, MassBalanceModel, ZeroMassBalance},
    state::GridState,
    thickness::ThicknessUpdater,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

fn config(params: ModelParams) -> Configuration {
    Configuration::from_params(&params).expect("valid config")
}

fn step(state: &mut GridState, config: &Configuration, mb: &dyn MassBalanceModel) {
    let flux = FluxCalculator::compute(state, config);
    ThicknessUpdater::apply(state, &flux, config, mb);
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}

/// Flat, ice-free grid with no forcing stays exactly where it is.
#[test]
fn flat_empty_grid_without_forcing_is_unchanged() {
    let config = config(ModelParams { grid_points: 10, ..ModelParams::default() });
    let mut state = GridState::flat(&config);
    let before = state.clone();

    step(&mut state, &config, &ZeroMassBalance);

    assert_eq!(state, before);
}

/// N=5, no ice, constant accumulation c: every point gains exactly c * dt.
#[test]
fn constant_accumulation_on_empty_grid() {
    let config = config(ModelParams { grid_points: 5, ..ModelParams::default() });
    let mut state = GridState::flat(&config);
    let c = 3.0;

    let flux = FluxCalculator::compute(&state, &config);
    assert!(flux.flux().iter().all(|&q| q == 0.0));

    let report = ThicknessUpdater::apply(&mut state, &flux, &config, &ConstantMassBalance(c));

    for (i, &z) in state.ice_elevation().iter().enumerate() {
        assert_eq!(z, c * config.dt(), "point {i}");
    }
    assert_eq!(report.clamped_points, 0);
}

/// N=3, ice [10, 5, 0] on a flat bed, no forcing: divergence-only update.
#[test]
fn divergence_only_update_matches_hand_computation() {
    // dx = 100 m keeps the change well above rounding at these elevations.
    let config = config(ModelParams {
        grid_points:     3,
        model_length_km: 0.2,
        ..ModelParams::default()
    });
    let mut state =
        GridState::from_profiles(&config, vec![10.0, 5.0, 0.0], vec![0.0; 3]).unwrap();

    let dx = config.dx();
    let dt = config.dt();
    let afl = config.afl();
    let edge = |up: f64, down: f64| {
        let h = (up + down) / 2.0;
        let slope = (down - up) / dx;
        afl * h.powf(5.0) * slope.abs().powf(2.0) * slope
    };
    let q0 = edge(10.0, 5.0);
    let q1 = edge(5.0, 0.0);

    let expected = [
        10.0 + (0.0 + q0) / dx * dt,
        5.0 + (-q0 + q1) / dx * dt,
        0.0,
    ];

    let flux = FluxCalculator::compute(&state, &config);
    let report = ThicknessUpdater::apply(&mut state, &flux, &config, &ZeroMassBalance);

    for i in 0..3 {
        assert!(
            close(state.ice_elevation()[i], expected[i]),
            "point {i}: got {}, expected {}",
            state.ice_elevation()[i],
            expected[i]
        );
    }
    assert!(state.ice_elevation()[0] < 10.0, "head should thin");
    assert!(state.ice_elevation()[1] > 5.0, "middle should thicken");
    assert_eq!(report.clamped_points, 0);
}

/// A steep, short grid where the head would lose more ice than it has.
#[test]
fn flux_deficit_is_clamped_to_bed() {
    // dx = 1 m, dt = 1 yr: the first edge drains the head below its bed.
    let config = config(ModelParams {
        grid_points:     3,
        model_length_km: 0.002,
        time_step:       1.0,
        ..ModelParams::default()
    });
    let mut state =
        GridState::from_profiles(&config, vec![10.0, 5.0, 0.0], vec![0.0; 3]).unwrap();

    let flux = FluxCalculator::compute(&state, &config);
    let q0 = flux.flux()[0];
    let q1 = flux.flux()[1];
    let unclamped_head = 10.0 + q0 / config.dx() * config.dt();
    assert!(unclamped_head < 0.0, "scenario must force a deficit, got {unclamped_head}");

    let report = ThicknessUpdater::apply(&mut state, &flux, &config, &ZeroMassBalance);

    assert_eq!(state.ice_elevation()[0], 0.0);
    assert_eq!(report.clamped_points, 1);
    assert!(close(report.discarded_deficit, -unclamped_head));
    assert!(close(state.ice_elevation()[1], 5.0 + (-q0 + q1) / config.dx() * config.dt()));
    assert_eq!(state.ice_elevation()[2], 0.0);
    assert!(close(report.delta_h[0], -10.0));
}

#[test]
fn ablation_never_digs_below_a_raised_bed() {
    let config = config(ModelParams { grid_points: 4, ..ModelParams::default() });
    let bed = vec![100.0, 80.0, 60.0, 40.0];
    let mut state = GridState::from_profiles(&config, bed.clone(), bed.clone()).unwrap();

    step(&mut state, &config, &ConstantMassBalance(-50.0));

    assert_eq!(state.ice_elevation(), bed.as_slice());
}

#[test]
fn ice_stays_above_bed_for_random_profiles() {
    let mut rng = Pcg64Mcg::seed_from_u64(0x5EED);

    for trial in 0..20 {
        // Kept inside the explicit stability range so elevations stay finite.
        let n = rng.gen_range(2..30);
        let config = config(ModelParams {
            grid_points:     n,
            model_length_km: rng.gen_range(20.0..50.0),
            time_step:       rng.gen_range(0.001..0.01),
            ..ModelParams::default()
        });
        let bed: Vec<f64> = (0..n).map(|_| rng.gen_range(-100.0..200.0)).collect();
        let ice: Vec<f64> = bed.iter().map(|b| b + rng.gen_range(0.0..100.0)).collect();
        let mut state = GridState::from_profiles(&config, ice, bed).unwrap();
        let forcing = ConstantMassBalance(rng.gen_range(-500.0..5.0));

        for _ in 0..50 {
            step(&mut state, &config, &forcing);
            for i in 0..n {
                assert!(
                    state.ice_elevation()[i] >= state.bed_elevation()[i],
                    "trial {trial}, point {i}: ice below bed"
                );
            }
        }
    }
}

/// With closed ends, no forcing, and ice away from the last edge, the
/// sweep only moves ice around.
#[test]
fn closed_ends_conserve_ice_volume() {
    let config = config(ModelParams {
        grid_points:     41,
        model_length_km: 40.0,
        ..ModelParams::default()
    });
    let ice: Vec<f64> = (0..41)
        .map(|i| {
            let d = (i as f64 - 20.0) / 5.0;
            if d.abs() < 1.0 { 200.0 * (1.0 - d * d) } else { 0.0 }
        })
        .collect();
    let mut state = GridState::from_profiles(&config, ice, vec![0.0; 41]).unwrap();
    let before = state.ice_volume(&config);

    for _ in 0..10 {
        let flux = FluxCalculator::compute(&state, &config);
        let report = ThicknessUpdater::apply(&mut state, &flux, &config, &ZeroMassBalance);
        assert_eq!(report.clamped_points, 0);
    }

    let after = state.ice_volume(&config);
    assert!(
        (after - before).abs() <= before * 1e-12,
        "volume drifted from {before} to {after}"
    );
}

#[test]
fn fixed_flux_left_boundary_feeds_the_head() {
    let config = config(ModelParams {
        grid_points:   5,
        left_boundary: BoundaryCondition::FixedFlux { flux: -10.0 },
        ..ModelParams::default()
    });
    let mut state = GridState::flat(&config);

    step(&mut state, &config, &ZeroMassBalance);

    let expected_head = 10.0 / config.dx() * config.dt();
    assert!(close(state.ice_elevation()[0], expected_head));
    assert!(state.ice_elevation()[1..].iter().all(|&z| z == 0.0));
}

#[test]
fn fixed_flux_right_boundary_drains_the_terminus() {
    let config = config(ModelParams {
        grid_points:    5,
        right_boundary: BoundaryCondition::FixedFlux { flux: -1.0e6 },
        ..ModelParams::default()
    });
    let mut state =
        GridState::from_profiles(&config, vec![1.0; 5], vec![0.0; 5]).unwrap();

    let flux = FluxCalculator::compute(&state, &config);
    let report = ThicknessUpdater::apply(&mut state, &flux, &config, &ZeroMassBalance);

    assert_eq!(state.ice_elevation()[4], 0.0);
    assert_eq!(report.clamped_points, 1);
    assert_eq!(&state.ice_elevation()[..4], &[1.0; 4]);
}

#[test]
fn nan_elevations_propagate_without_error() {
    let config = config(ModelParams { grid_points: 4, ..ModelParams::default() });
    let mut state =
        GridState::from_profiles(&config, vec![10.0, f64::NAN, 5.0, 0.0], vec![0.0; 4]).unwrap();

    step(&mut state, &config, &ZeroMassBalance);

    assert!(state.ice_elevation()[1].is_nan());
    assert!(state.ice_elevation()[0].is_nan(), "NaN flux should reach the neighbour");
}
