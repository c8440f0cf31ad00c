//! Two-wealth recursion: both players carry a wealth grid, state = (row
//! wealth, column wealth). Rounds reuse two table buffers, swapped each
//! pass, so memory stays flat in the horizon.

use super::{make_search, snap_to_zero, SolveDiagnostics, ValueTable};
use crate::utility::MatrixUtility;
use crate::wealth::DualWealthGrid;
use serde::Serialize;
use std::mem;

#[derive(Debug, Serialize)]
pub struct MatrixSolution {
    pub objective: f64,
    pub row: f64,
    pub col: f64,
    pub diagnostics: SolveDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<MatrixTables>,
}

/// Final-round tables, kept only on request.
#[derive(Debug, Serialize)]
pub struct MatrixTables {
    pub objective: ValueTable,
    pub row: ValueTable,
    pub col: ValueTable,
}

struct Buffers {
    previous: ValueTable,
    current: ValueTable,
}

impl Buffers {
    fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            previous: ValueTable::zeros(rows, cols),
            current: ValueTable::zeros(rows, cols),
        }
    }

    fn flip(&mut self) {
        mem::swap(&mut self.previous, &mut self.current);
    }
}

/// Solve the two-wealth game over `n_rounds`, reporting the value triple at
/// the pair of zero-index states.
pub fn solve_matrix(
    n_rounds: usize,
    utility: &mut MatrixUtility,
    row_wealth: &DualWealthGrid,
    col_wealth: &DualWealthGrid,
    keep_tables: bool,
) -> MatrixSolution {
    let n_rows = row_wealth.len() + 1;
    let n_cols = col_wealth.len() + 1;
    tracing::debug!(
        rows = n_rows,
        cols = n_cols,
        zero_row = row_wealth.zero_index(),
        zero_col = col_wealth.zero_index(),
        "matrix solve"
    );
    let search = make_search();
    let mut diagnostics = SolveDiagnostics::default();
    let mut objective = Buffers::zeros(n_rows, n_cols);
    let mut row_value = Buffers::zeros(n_rows, n_cols);
    let mut col_value = Buffers::zeros(n_rows, n_cols);

    for _round in 0..n_rounds {
        objective.flip();
        row_value.flip();
        col_value.flip();
        for r in 0..n_rows - 1 {
            let row_bid = row_wealth.bid(r);
            let row_bid_pos = row_wealth.bid_transition(r);
            let row_reject_pos = row_wealth.reject_transition(r);
            for c in 0..n_cols - 1 {
                let col_bid = col_wealth.bid(c);
                let col_bid_pos = col_wealth.bid_transition(c);
                let col_reject_pos = col_wealth.reject_transition(c);
                // branch continuations: 0 = keep bidding, 1 = rejected
                utility.set_constants(
                    row_bid,
                    col_bid,
                    objective.previous.bilinear(row_bid_pos, col_bid_pos),
                    objective.previous.bilinear(row_bid_pos, col_reject_pos),
                    objective.previous.bilinear(row_reject_pos, col_bid_pos),
                    objective.previous.bilinear(row_reject_pos, col_reject_pos),
                );
                let found = search.find_maximum(|mu| utility.evaluate(mu));
                diagnostics.note(&found);
                let (mu, value) = snap_to_zero(found, utility.evaluate(0.0));
                objective.current.set(r, c, value);
                row_value.current.set(
                    r,
                    c,
                    utility.row_value(
                        mu,
                        row_value.previous.bilinear(row_bid_pos, col_bid_pos),
                        row_value.previous.bilinear(row_bid_pos, col_reject_pos),
                        row_value.previous.bilinear(row_reject_pos, col_bid_pos),
                        row_value.previous.bilinear(row_reject_pos, col_reject_pos),
                    ),
                );
                col_value.current.set(
                    r,
                    c,
                    utility.col_value(
                        mu,
                        col_value.previous.bilinear(row_bid_pos, col_bid_pos),
                        col_value.previous.bilinear(row_bid_pos, col_reject_pos),
                        col_value.previous.bilinear(row_reject_pos, col_bid_pos),
                        col_value.previous.bilinear(row_reject_pos, col_reject_pos),
                    ),
                );
            }
        }
        objective.current.mirror_padding();
        row_value.current.mirror_padding();
        col_value.current.mirror_padding();
    }

    diagnostics.log("matrix");
    let (zr, zc) = (row_wealth.zero_index(), col_wealth.zero_index());
    let solution = MatrixSolution {
        objective: objective.current.at(zr, zc),
        row: row_value.current.at(zr, zc),
        col: col_value.current.at(zr, zc),
        diagnostics,
        tables: keep_tables.then_some(MatrixTables {
            objective: objective.current,
            row: row_value.current,
            col: col_value.current,
        }),
    };
    tracing::info!(
        objective = solution.objective,
        row = solution.row,
        col = solution.col,
        rounds = n_rounds,
        "matrix solve complete"
    );
    solution
}
