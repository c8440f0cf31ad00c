//! Single-wealth recursion: a constrained bidder against an unconstrained
//! oracle, state = (round, bidder wealth row).

use super::{make_search, snap_to_zero, SolveDiagnostics, ValueTable};
use crate::utility::{reject_prob, VectorUtility};
use crate::wealth::{DualWealthGrid, WealthGrid};
use serde::Serialize;

/// Full per-round tables, kept only when the caller wants to write them out.
#[derive(Debug, Serialize)]
pub struct VectorTables {
    pub objective: ValueTable,
    pub oracle: ValueTable,
    pub bidder: ValueTable,
    pub mean: ValueTable,
    pub reject_prob: ValueTable,
}

#[derive(Debug, Serialize)]
pub struct VectorSolution {
    pub objective: f64,
    pub oracle: f64,
    pub bidder: f64,
    pub diagnostics: SolveDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<VectorTables>,
}

/// Solve the single-wealth game over `n_rounds`. Row r of each table holds
/// the value with r rounds already played; the recursion fills bottom-up
/// from the zero boundary row.
pub fn solve_vector(
    n_rounds: usize,
    utility: &mut VectorUtility,
    wealth: &DualWealthGrid,
    keep_tables: bool,
) -> VectorSolution {
    let n_cols = wealth.len();
    let search = make_search();
    let mut diagnostics = SolveDiagnostics::default();
    // one padding row for the boundary, one padding column for transitions
    let mut objective = ValueTable::zeros(n_rounds + 1, n_cols + 1);
    let mut oracle = ValueTable::zeros(n_rounds + 1, n_cols + 1);
    let mut bidder = ValueTable::zeros(n_rounds + 1, n_cols + 1);
    let mut mean = ValueTable::zeros(n_rounds, n_cols);
    let mut prob = ValueTable::zeros(n_rounds, n_cols);

    for row in (0..n_rounds).rev() {
        for k in 0..n_cols {
            let bid = wealth.bid(k);
            let reject_pos = wealth.reject_transition(k);
            let bid_pos = wealth.bid_transition(k);
            let objective_if_reject = objective.row_interp(row + 1, reject_pos);
            let objective_if_bid = objective.row_interp(row + 1, bid_pos);
            let oracle_if_reject = oracle.row_interp(row + 1, reject_pos);
            let oracle_if_bid = oracle.row_interp(row + 1, bid_pos);
            let bidder_if_reject = bidder.row_interp(row + 1, reject_pos);
            let bidder_if_bid = bidder.row_interp(row + 1, bid_pos);

            utility.set_constants(bid, objective_if_reject, objective_if_bid);
            let found = search.find_maximum(|mu| utility.evaluate(mu));
            diagnostics.note(&found);
            let (mu, value) = snap_to_zero(found, utility.evaluate(0.0));

            mean.set(row, k, mu);
            prob.set(row, k, reject_prob(mu, bid.min(0.99)));
            objective.set(row, k, value);
            bidder.set(row, k, utility.bidder_value(mu, bidder_if_reject, bidder_if_bid));
            oracle.set(row, k, utility.oracle_value(mu, oracle_if_reject, oracle_if_bid));
        }
    }

    diagnostics.log("vector");
    let z = wealth.zero_index();
    let solution = VectorSolution {
        objective: objective.at(0, z),
        oracle: oracle.at(0, z),
        bidder: bidder.at(0, z),
        diagnostics,
        tables: keep_tables.then_some(VectorTables {
            objective,
            oracle,
            bidder,
            mean,
            reject_prob: prob,
        }),
    };
    tracing::info!(
        objective = solution.objective,
        oracle = solution.oracle,
        bidder = solution.bidder,
        rounds = n_rounds,
        "vector solve complete"
    );
    solution
}

/// Risk of the bidder's process under a Bayesian spike mixture: the mean is
/// 0 with probability `p_zero` and `mu` otherwise, drawn fresh each round.
/// No inner optimization; the recursion just mixes the two payoffs.
pub fn find_process_risk(
    n_rounds: usize,
    p_zero: f64,
    mu: f64,
    utility: &mut VectorUtility,
    wealth: &DualWealthGrid,
) -> (f64, f64) {
    let n_cols = wealth.len();
    let mut oracle = ValueTable::zeros(n_rounds + 1, n_cols + 1);
    let mut bidder = ValueTable::zeros(n_rounds + 1, n_cols + 1);

    for row in (0..n_rounds).rev() {
        for k in 0..n_cols {
            let bid = wealth.bid(k);
            let reject_pos = wealth.reject_transition(k);
            let bid_pos = wealth.bid_transition(k);
            let bidder_if_reject = bidder.row_interp(row + 1, reject_pos);
            let bidder_if_bid = bidder.row_interp(row + 1, bid_pos);
            let oracle_if_reject = oracle.row_interp(row + 1, reject_pos);
            let oracle_if_bid = oracle.row_interp(row + 1, bid_pos);

            utility.set_constants(bid, 0.0, 0.0);
            bidder.set(
                row,
                k,
                p_zero * utility.bidder_value(0.0, bidder_if_reject, bidder_if_bid)
                    + (1.0 - p_zero) * utility.bidder_value(mu, bidder_if_reject, bidder_if_bid),
            );
            oracle.set(
                row,
                k,
                p_zero * utility.oracle_value(0.0, oracle_if_reject, oracle_if_bid)
                    + (1.0 - p_zero) * utility.oracle_value(mu, oracle_if_reject, oracle_if_bid),
            );
        }
    }

    let z = wealth.zero_index();
    (oracle.at(0, z), bidder.at(0, z))
}

/// Spike-mixture process risk on a single-outcome grid. Here a failed bid
/// simply advances one grid row, so the live region shrinks by one column
/// per round and the recursion fills a trapezoid.
pub fn find_process_risk_single(
    n_rounds: usize,
    p_zero: f64,
    mu: f64,
    utility: &mut VectorUtility,
    wealth: &WealthGrid,
) -> (f64, f64) {
    let n_cols = wealth.number_of_bids();
    debug_assert!(n_rounds <= n_cols);
    let mut oracle = ValueTable::zeros(n_rounds + 1, n_cols + 1);
    let mut bidder = ValueTable::zeros(n_rounds + 1, n_cols + 1);

    for row in (0..n_rounds).rev() {
        let done = n_rounds - 1 - row;
        for k in 0..n_cols - done {
            let bid = wealth.bid(k);
            let reject_pos = wealth.transition_after_reject(k);
            let bidder_if_reject = bidder.row_interp(row + 1, reject_pos);
            let oracle_if_reject = oracle.row_interp(row + 1, reject_pos);

            utility.set_constants(bid, 0.0, 0.0);
            bidder.set(
                row,
                k,
                p_zero * utility.bidder_value(0.0, bidder_if_reject, bidder.at(row + 1, k + 1))
                    + (1.0 - p_zero)
                        * utility.bidder_value(mu, bidder_if_reject, bidder.at(row + 1, k + 1)),
            );
            oracle.set(
                row,
                k,
                p_zero * utility.oracle_value(0.0, oracle_if_reject, oracle.at(row + 1, k + 1))
                    + (1.0 - p_zero)
                        * utility.oracle_value(mu, oracle_if_reject, oracle.at(row + 1, k + 1)),
            );
        }
    }

    let z = n_cols - n_rounds;
    (oracle.at(0, z), bidder.at(0, z))
}
