//! Alpha-wealth gain recursions. State is the number of rounds each side
//! has gone since its last rejection; wealth enters through the spending
//! distribution's mass at that delay, so no wealth grid is needed.
//!
//! The objective is the oracle's expected payout handicapped by γ times
//! the bidder's, minimized over the adversary's mean.

use super::{make_search, snap_to_zero, SolveDiagnostics, ValueTable};
use crate::spending::SpendingDist;
use crate::utility::{optimal_alpha, reject_prob};
use ab_math::GoldenSection;
use serde::Serialize;
use std::mem;

/// Means below this play the exact null expressions.
const MU_ZERO: f64 = 1e-5;

#[derive(Debug, Serialize)]
pub struct GainSolution {
    pub gain: f64,
    pub oracle: f64,
    pub bidder: f64,
    pub diagnostics: SolveDiagnostics,
}

// ── ConstrainedGain ──────────────────────────────────────────────────────

/// Both sides spend by a distribution over the delay since their last
/// rejection; levels are the distribution mass at the current delay.
#[derive(Debug)]
pub struct ConstrainedGain {
    gamma: f64,
    omega: f64,
    spend_pct: f64,
    oracle_dist: SpendingDist,
    bidder_dist: SpendingDist,
    alpha: f64,
    beta: f64,
    v00: f64,
    vi0: f64,
    v0j: f64,
    vij: f64,
}

impl ConstrainedGain {
    pub fn new(
        gamma: f64,
        omega: f64,
        spend_pct: f64,
        oracle_dist: SpendingDist,
        bidder_dist: SpendingDist,
    ) -> Self {
        Self {
            gamma,
            omega,
            spend_pct,
            oracle_dist,
            bidder_dist,
            alpha: 0.0,
            beta: 0.0,
            v00: 0.0,
            vi0: 0.0,
            v0j: 0.0,
            vij: 0.0,
        }
    }

    /// Load the delays and the four continuation values: `v00` both just
    /// rejected, `vi0`/`v0j` one side did, `vij` neither did.
    pub fn set_state(&mut self, i: usize, j: usize, v00: f64, vi0: f64, v0j: f64, vij: f64) {
        self.alpha = self.omega * self.oracle_dist.mass(i);
        self.beta = self.omega * self.spend_pct * self.bidder_dist.mass(j);
        self.v00 = v00;
        self.vi0 = vi0;
        self.v0j = v0j;
        self.vij = vij;
    }

    pub fn evaluate(&self, mu: f64) -> f64 {
        let ra = reject_prob(mu, self.alpha);
        let rb = reject_prob(mu, self.beta);
        (self.omega * ra - self.alpha) - self.gamma * (self.omega * rb - self.beta)
            + ra * rb * self.v00
            + (1.0 - ra) * (1.0 - rb) * self.vij
            + ra * (1.0 - rb) * self.v0j
            + (1.0 - ra) * rb * self.vi0
    }

    pub fn value_to_oracle(&self, mu: f64, v00: f64, vi0: f64, v0j: f64, vij: f64) -> f64 {
        let (ra, rb, value) = if mu < MU_ZERO {
            (self.alpha, self.beta, self.alpha * (self.omega - 1.0))
        } else {
            let ra = reject_prob(mu, self.alpha);
            (ra, reject_prob(mu, self.beta), self.omega * ra - self.alpha)
        };
        value + ra * rb * v00 + (1.0 - ra) * rb * vi0 + ra * (1.0 - rb) * v0j
            + (1.0 - ra) * (1.0 - rb) * vij
    }

    pub fn value_to_bidder(&self, mu: f64, v00: f64, vi0: f64, v0j: f64, vij: f64) -> f64 {
        let (ra, rb) = if mu < MU_ZERO {
            (self.alpha, self.beta)
        } else {
            (reject_prob(mu, self.alpha), reject_prob(mu, self.beta))
        };
        (self.omega * rb - self.beta) + ra * rb * v00 + (1.0 - ra) * rb * vi0
            + ra * (1.0 - rb) * v0j
            + (1.0 - ra) * (1.0 - rb) * vij
    }
}

/// Solve the constrained-vs-constrained gain game. Boundary: a final-round
/// gain of `ω − γω` and side values of ω everywhere.
pub fn solve_constrained_gain(
    gamma: f64,
    omega: f64,
    n_rounds: usize,
    spend_pct: f64,
    oracle_dist: SpendingDist,
    bidder_dist: SpendingDist,
) -> GainSolution {
    let search = make_search();
    let mut model = ConstrainedGain::new(gamma, omega, spend_pct, oracle_dist, bidder_dist);
    let mut diagnostics = SolveDiagnostics::default();
    let n = n_rounds + 1;
    let mut gain = Swap::new(ValueTable::constant(n, n, omega - gamma * omega), n);
    let mut oracle = Swap::new(ValueTable::constant(n, n, omega), n);
    let mut bidder = Swap::new(ValueTable::constant(n, n, omega), n);

    for round in (1..=n_rounds).rev() {
        gain.flip();
        oracle.flip();
        bidder.flip();
        for i in 0..round {
            for j in 0..round {
                model.set_state(
                    i,
                    j,
                    gain.previous.at(0, 0),
                    gain.previous.at(i + 1, 0),
                    gain.previous.at(0, j + 1),
                    gain.previous.at(i + 1, j + 1),
                );
                let found = search.find_minimum(|mu| model.evaluate(mu));
                diagnostics.note(&found);
                let (mu, value) = snap_to_zero(found, model.evaluate(0.0));
                gain.current.set(i, j, value);
                oracle.current.set(
                    i,
                    j,
                    model.value_to_oracle(
                        mu,
                        oracle.previous.at(0, 0),
                        oracle.previous.at(i + 1, 0),
                        oracle.previous.at(0, j + 1),
                        oracle.previous.at(i + 1, j + 1),
                    ),
                );
                bidder.current.set(
                    i,
                    j,
                    model.value_to_bidder(
                        mu,
                        bidder.previous.at(0, 0),
                        bidder.previous.at(i + 1, 0),
                        bidder.previous.at(0, j + 1),
                        bidder.previous.at(i + 1, j + 1),
                    ),
                );
            }
        }
    }

    diagnostics.log("constrained gain");
    GainSolution {
        gain: gain.current.at(0, 0),
        oracle: oracle.current.at(0, 0),
        bidder: bidder.current.at(0, 0),
        diagnostics,
    }
}

struct Swap {
    previous: ValueTable,
    current: ValueTable,
}

impl Swap {
    fn new(boundary: ValueTable, n: usize) -> Self {
        Self {
            previous: ValueTable::zeros(n, n),
            current: boundary,
        }
    }

    fn flip(&mut self) {
        mem::swap(&mut self.previous, &mut self.current);
    }
}

// ── UnconstrainedGain ────────────────────────────────────────────────────

/// Oracle plays the one-shot optimal level each round; only the bidder is
/// wealth-constrained, so the state collapses to the bidder's delay.
#[derive(Debug)]
pub struct UnconstrainedGain {
    gamma: f64,
    omega: f64,
    spend_pct: f64,
    dist: SpendingDist,
    beta_k: f64,
    v0: f64,
    v_next: f64,
}

impl UnconstrainedGain {
    pub fn new(gamma: f64, omega: f64, spend_pct: f64, dist: SpendingDist) -> Self {
        Self {
            gamma,
            omega,
            spend_pct,
            dist,
            beta_k: 0.0,
            v0: 0.0,
            v_next: 0.0,
        }
    }

    /// Load the bidder's delay and the two continuations: `v0` after a
    /// rejection resets the delay, `v_next` after another miss.
    pub fn set_state(&mut self, k: usize, v0: f64, v_next: f64) {
        self.beta_k = self.omega * self.spend_pct * self.dist.mass(k);
        self.v0 = v0;
        self.v_next = v_next;
    }

    pub fn evaluate(&self, mu: f64) -> f64 {
        if mu < MU_ZERO {
            return self.gamma * self.beta_k * (1.0 - self.omega)
                + self.beta_k * self.v0
                + (1.0 - self.beta_k) * self.v_next;
        }
        let rb = reject_prob(mu, self.beta_k);
        let a = optimal_alpha(mu, self.omega);
        let ra = reject_prob(mu, a);
        (self.omega * ra - a) - self.gamma * (self.omega * rb - self.beta_k)
            + rb * self.v0
            + (1.0 - rb) * self.v_next
    }

    pub fn value_to_oracle(&self, mu: f64, o0: f64, o_next: f64) -> f64 {
        let (value, rb) = if mu < MU_ZERO {
            (0.0, self.beta_k)
        } else {
            let a = optimal_alpha(mu, self.omega);
            let ra = reject_prob(mu, a);
            (self.omega * ra - a, reject_prob(mu, self.beta_k))
        };
        value + rb * o0 + (1.0 - rb) * o_next
    }

    pub fn value_to_bidder(&self, mu: f64, b0: f64, b_next: f64) -> f64 {
        let rb = if mu < MU_ZERO {
            self.beta_k
        } else {
            reject_prob(mu, self.beta_k)
        };
        self.omega * rb - self.beta_k + rb * b0 + (1.0 - rb) * b_next
    }
}

/// Solve the one-constrained-side gain game. The inner search runs over a
/// narrower bracket than the wealth-grid solvers; the recursion fills a
/// triangular array in place.
pub fn solve_unconstrained_gain(
    gamma: f64,
    omega: f64,
    n_rounds: usize,
    spend_pct: f64,
    dist: SpendingDist,
) -> GainSolution {
    let search = GoldenSection::new(0.0001, (1.5, 6.5), 0.5, 100);
    let mut model = UnconstrainedGain::new(gamma, omega, spend_pct, dist);
    let mut diagnostics = SolveDiagnostics::default();
    let n = n_rounds + 1;
    let mut gain = ValueTable::zeros(n, n);
    let mut oracle = ValueTable::zeros(n, n);
    let mut bidder = ValueTable::zeros(n, n);
    for j in 0..n {
        gain.set(n_rounds, j, omega - gamma * omega);
        oracle.set(n_rounds, j, omega);
        bidder.set(n_rounds, j, omega);
    }

    for row in (0..n_rounds).rev() {
        let v0 = gain.at(row + 1, 0);
        let o0 = oracle.at(row + 1, 0);
        let b0 = bidder.at(row + 1, 0);
        for col in 0..=row {
            model.set_state(col, v0, gain.at(row + 1, col + 1));
            let found = search.find_minimum(|mu| model.evaluate(mu));
            diagnostics.note(&found);
            let (mu, value) = snap_to_zero(found, model.evaluate(0.0));
            gain.set(row, col, value);
            oracle.set(
                row,
                col,
                model.value_to_oracle(mu, o0, oracle.at(row + 1, col + 1)),
            );
            bidder.set(
                row,
                col,
                model.value_to_bidder(mu, b0, bidder.at(row + 1, col + 1)),
            );
        }
    }

    diagnostics.log("unconstrained gain");
    GainSolution {
        gain: gain.at(0, 0),
        oracle: oracle.at(0, 0),
        bidder: bidder.at(0, 0),
        diagnostics,
    }
}
