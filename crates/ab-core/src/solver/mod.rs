//! Backward-induction solvers for the competitive testing game.
//!
//! Every solver walks rounds from the horizon back to the start, reading
//! continuation values from the previous round's table and writing the
//! current round's. Within a cell the adversary's mean is chosen by golden-
//! section search over a fixed bracket, then checked against µ = 0, which
//! the bracket excludes.

mod gain;
mod matrix;
mod table;
mod vector;

pub use gain::{
    solve_constrained_gain, solve_unconstrained_gain, ConstrainedGain, GainSolution,
    UnconstrainedGain,
};
pub use matrix::{solve_matrix, MatrixSolution, MatrixTables};
pub use table::ValueTable;
pub use vector::{
    find_process_risk, find_process_risk_single, solve_vector, VectorSolution, VectorTables,
};

use ab_math::{GoldenSection, SearchResult};
use serde::Serialize;

/// Search engine shared by all solvers: tolerance 1e-4 over µ ∈ [0.05, 10]
/// with a 0.5 coarse grid and at most 200 iterations.
pub(crate) fn make_search() -> GoldenSection {
    GoldenSection::new(0.0001, (0.05, 10.0), 0.5, 200)
}

/// Counters accumulated across every inner optimization of a solve. The
/// mean interval tracks the range of optimal means the adversary picked,
/// which shows when the search bracket binds.
#[derive(Debug, Clone, Serialize)]
pub struct SolveDiagnostics {
    pub searches: u64,
    pub non_converged: u64,
    pub mean_low: f64,
    pub mean_high: f64,
}

impl Default for SolveDiagnostics {
    fn default() -> Self {
        Self {
            searches: 0,
            non_converged: 0,
            mean_low: 10.0,
            mean_high: 0.0,
        }
    }
}

impl SolveDiagnostics {
    pub(crate) fn note(&mut self, result: &SearchResult) {
        self.searches += 1;
        if !result.converged {
            self.non_converged += 1;
        }
        if result.x < self.mean_low {
            self.mean_low = result.x;
        }
        if result.x > self.mean_high {
            self.mean_high = result.x;
        }
    }

    pub(crate) fn log(&self, label: &str) {
        if self.non_converged > 0 {
            tracing::warn!(
                label,
                non_converged = self.non_converged,
                searches = self.searches,
                "some inner searches hit the iteration limit"
            );
        }
        tracing::info!(
            label,
            mean_low = self.mean_low,
            mean_high = self.mean_high,
            "optimal mean interval"
        );
    }
}

/// Snap rule shared by the solvers: the search bracket starts at 0.05, so
/// the boundary mean µ = 0 is scored separately and wins ties its way.
pub(crate) fn snap_to_zero(result: SearchResult, at_zero: f64) -> (f64, f64) {
    if result.value < at_zero {
        (0.0, at_zero)
    } else {
        (result.x, result.value)
    }
}
