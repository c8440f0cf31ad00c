//! End-to-end solver scenarios on realistic grids.

use ab_core::config::PlayerSpec;
use ab_core::solver::{solve_constrained_gain, solve_matrix, solve_vector};
use ab_core::spending::{SpendingDist, SpendingRule};
use ab_core::utility::{Criterion, MatrixPayoff, MatrixUtility, VectorUtility};
use ab_core::wealth::DualWealthGrid;

fn geometric_grid(omega: f64, psi: f64, n_rounds: usize) -> DualWealthGrid {
    let rule = SpendingRule::geometric(psi).unwrap();
    DualWealthGrid::new(5.0, omega, omega, rule, n_rounds).unwrap()
}

/// Risk payoffs are non-positive each round, so adding rounds to the horizon
/// can only lower the value at the initial wealth state.
#[test]
fn risk_objective_non_increasing_in_rounds() {
    let grid = geometric_grid(0.5, 0.5, 5);
    let mut previous = f64::INFINITY;
    for n in 1..=5 {
        let mut utility = VectorUtility::risk(45.0, 0.05);
        let solution = solve_vector(n, &mut utility, &grid, false);
        assert!(
            solution.objective <= previous + 1e-9,
            "objective rose from {previous} to {} at {n} rounds",
            solution.objective
        );
        previous = solution.objective;
    }
}

/// Reject payoffs count rejections, so a longer horizon is worth at least as
/// much as a shorter one.
#[test]
fn reject_objective_non_decreasing_in_rounds() {
    let grid = geometric_grid(0.5, 0.5, 5);
    let mut previous = f64::NEG_INFINITY;
    for n in 1..=5 {
        let mut utility = VectorUtility::reject(45.0, 0.05);
        let solution = solve_vector(n, &mut utility, &grid, false);
        assert!(
            solution.objective >= previous - 1e-9,
            "objective fell from {previous} to {} at {n} rounds",
            solution.objective
        );
        previous = solution.objective;
    }
}

/// With the angle criterion the combined objective is a fixed linear blend of
/// the two side recursions, so the identity survives the full backward pass.
#[test]
fn matrix_objective_is_linear_blend_of_sides() {
    let degrees = 30.0f64;
    let row_grid = geometric_grid(0.5, 0.1, 4);
    let col_grid = DualWealthGrid::new(5.0, 0.5, 0.5, SpendingRule::Universal, 4).unwrap();
    let mut utility = MatrixUtility::new(MatrixPayoff::Reject, Criterion::angle(degrees));
    let solution = solve_matrix(4, &mut utility, &row_grid, &col_grid, false);
    let (sin, cos) = degrees.to_radians().sin_cos();
    let blend = cos * solution.row + sin * solution.col;
    assert!(
        (solution.objective - blend).abs() < 1e-8,
        "objective {} vs blend {blend}",
        solution.objective
    );
    assert!(solution.diagnostics.searches > 0);
}

/// The player conventions route an unconstrained oracle through the vector
/// solver and a pair of constrained players through the matrix solver; both
/// paths must produce finite values on the grids the conventions build.
#[test]
fn player_specs_build_solvable_grids() {
    let n_rounds = 3;

    let oracle = PlayerSpec::new(None, 0.05, 1.0);
    assert!(oracle.is_unconstrained());
    let bidder = PlayerSpec::new(None, 0.0, 0.5);
    let bidder_grid = bidder.build_grid(n_rounds).unwrap();
    let mut utility = VectorUtility::risk(0.0, 0.05);
    let solution = solve_vector(n_rounds, &mut utility, &bidder_grid, false);
    assert!(solution.objective.is_finite());
    assert!(solution.oracle.is_finite() && solution.bidder.is_finite());

    let oracle = PlayerSpec::new(None, 0.05, 0.75);
    assert!(!oracle.is_unconstrained());
    let oracle_grid = oracle.build_grid(n_rounds).unwrap();
    let mut utility = MatrixUtility::new(MatrixPayoff::Risk, Criterion::angle(45.0));
    let solution = solve_matrix(n_rounds, &mut utility, &oracle_grid, &bidder_grid, false);
    assert!(solution.objective.is_finite());
    assert!(solution.row.is_finite() && solution.col.is_finite());
}

/// The gain recursion searches every interior cell once per round.
#[test]
fn constrained_gain_scenario_is_finite() {
    let oracle = SpendingDist::geometric(0.2).unwrap();
    let bidder = SpendingDist::universal(1).unwrap();
    let solution = solve_constrained_gain(1.0, 0.5, 4, 0.5, oracle, bidder);
    assert!(solution.gain.is_finite());
    assert!(solution.oracle.is_finite() && solution.bidder.is_finite());
    assert_eq!(solution.diagnostics.searches, 1 + 4 + 9 + 16);
}
