//! Per-round payoff models scored inside the recursion.
//!
//! A period plays out as: both sides commit a test level, the outcome is a
//! normal draw with mean µ, and each level either rejects (probability
//! `reject_prob(µ, level)`) or does not. Payoffs combine the immediate
//! reward with the continuation values passed in from the next round's
//! table.

use crate::logging::WarnLimiter;
use ab_math::{normal_cdf, normal_density, normal_quantile};

/// Levels below this cannot reject anything.
const LEVEL_EPS: f64 = 1e-15;

/// Critical value used when the level underflows.
const MAX_Z: f64 = 8.0;

// ── Free functions ───────────────────────────────────────────────────────

/// Two-sided critical value for a test at `level`.
pub fn z_alpha(level: f64) -> f64 {
    if level < LEVEL_EPS {
        MAX_Z
    } else {
        normal_quantile(1.0 - level)
    }
}

/// Probability a two-sided level-`level` test rejects when the mean is `mu`.
pub fn reject_prob(mu: f64, level: f64) -> f64 {
    if level < LEVEL_EPS {
        return 0.0;
    }
    let z = z_alpha(level / 2.0);
    normal_cdf(mu - z) + normal_cdf(-mu - z)
}

/// Risk of the hard-threshold estimator at `level` when the mean is `mu`:
/// squared error from missing the signal plus the tail contributions of the
/// two-sided cut.
pub fn risk(mu: f64, level: f64) -> f64 {
    let mut r = if level == 0.0 {
        0.0
    } else {
        (1.0 - reject_prob(mu, level)) * mu * mu
    };
    let z = z_alpha(level / 2.0);
    let dev = z - mu;
    let sum = z + mu;
    r += dev * normal_density(dev) + normal_cdf(-dev);
    r += sum * normal_density(sum) + normal_cdf(-sum);
    r
}

/// Level that maximizes the one-shot expected payout `ω·r_µ(α) − α`.
pub fn optimal_alpha(mu: f64, omega: f64) -> f64 {
    if mu < 0.001 {
        0.0
    } else {
        let z = (mu * mu + 2.0 * (1.0 / omega).ln()) / (2.0 * mu);
        1.0 - normal_cdf(z)
    }
}

// ── Criterion ────────────────────────────────────────────────────────────

/// How the two sides' per-round terms fold into the scalar objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    /// cos θ on the row term, sin θ on the column term.
    Angle { degrees: f64, sin: f64, cos: f64 },
    /// Row term handicapped by `b1` times the column term.
    RiskInflation { b1: f64 },
}

impl Criterion {
    pub fn angle(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::Angle { degrees, sin, cos }
    }

    pub fn risk_inflation(b1: f64) -> Self {
        Self::RiskInflation { b1 }
    }

    pub fn combine(&self, x: f64, y: f64) -> f64 {
        match *self {
            Self::Angle { sin, cos, .. } => cos * x + sin * y,
            Self::RiskInflation { b1 } => x - b1 * y,
        }
    }

    pub fn identifier(&self) -> String {
        match *self {
            Self::Angle { degrees, .. } => format!("{degrees}"),
            Self::RiskInflation { b1 } => format!("{}", b1.round() as i64),
        }
    }
}

// ── VectorUtility ────────────────────────────────────────────────────────

/// Oracle-side payoff in the single-wealth game, determined by the oracle's
/// nominal level: a pure tester at 0, the risk-inflation benchmark at 1, a
/// fixed-level testimator anywhere between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OracleRisk {
    Testing,
    RiskInflation,
    Testimator { alpha: f64 },
}

impl OracleRisk {
    pub fn from_alpha(alpha: f64) -> Self {
        if alpha == 0.0 {
            Self::Testing
        } else if alpha == 1.0 {
            Self::RiskInflation
        } else {
            Self::Testimator { alpha }
        }
    }

    pub fn value(&self, mu: f64) -> f64 {
        match *self {
            Self::Testing => {
                if mu == 0.0 {
                    0.0
                } else {
                    -1.0
                }
            }
            Self::RiskInflation => {
                if mu < 1.0 {
                    -(mu * mu)
                } else {
                    -1.0
                }
            }
            Self::Testimator { alpha } => -risk(mu, alpha),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VectorPayoff {
    /// Count rejections on both sides.
    Reject,
    /// Score estimation risk against an oracle benchmark.
    Risk { oracle: OracleRisk },
}

/// Single-wealth payoff model: one constrained bidder playing against an
/// unconstrained oracle at a fixed level α. The angle mixes the two sides'
/// immediate terms into the maximized objective.
#[derive(Debug)]
pub struct VectorUtility {
    payoff: VectorPayoff,
    angle: f64,
    sin: f64,
    cos: f64,
    alpha: f64,
    beta: f64,
    reject_value: f64,
    no_reject_value: f64,
    warns: WarnLimiter,
}

impl VectorUtility {
    pub fn reject(angle: f64, alpha: f64) -> Self {
        Self::new(VectorPayoff::Reject, angle, alpha)
    }

    pub fn risk(angle: f64, alpha: f64) -> Self {
        let oracle = OracleRisk::from_alpha(alpha);
        tracing::info!(?oracle, alpha, "risk payoff oracle");
        Self::new(VectorPayoff::Risk { oracle }, angle, alpha)
    }

    fn new(payoff: VectorPayoff, angle: f64, alpha: f64) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        Self {
            payoff,
            angle,
            sin,
            cos,
            alpha,
            beta: 0.0,
            reject_value: 0.0,
            no_reject_value: 0.0,
            warns: WarnLimiter::default(),
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn warn_count(&self) -> u64 {
        self.warns.count()
    }

    /// Load the state-dependent constants before optimizing over µ: the
    /// bidder's current level β and the two continuation values.
    pub fn set_constants(&mut self, beta: f64, reject_value: f64, no_reject_value: f64) {
        debug_assert!(beta >= 0.0);
        let beta = if beta >= 1.0 {
            self.warns
                .warn(&format!("bid {beta:.4} too large; reduced to 0.99"));
            0.99
        } else {
            beta
        };
        self.beta = beta;
        self.reject_value = reject_value;
        self.no_reject_value = no_reject_value;
    }

    fn r_mu_beta(&self, mu: f64) -> f64 {
        if mu == 0.0 {
            self.beta
        } else {
            reject_prob(mu, self.beta)
        }
    }

    /// Rejection probabilities at the oracle's and bidder's levels. At µ = 0
    /// these are the levels themselves, exactly.
    pub fn reject_probabilities(&self, mu: f64) -> (f64, f64) {
        if mu == 0.0 {
            (self.alpha, self.beta)
        } else {
            (reject_prob(mu, self.alpha), reject_prob(mu, self.beta))
        }
    }

    /// Objective the mean is chosen to maximize.
    pub fn evaluate(&self, mu: f64) -> f64 {
        match self.payoff {
            VectorPayoff::Reject => {
                let (ra, rb) = self.reject_probabilities(mu);
                self.sin * ra + self.cos * rb
                    + rb * self.reject_value
                    + (1.0 - rb) * self.no_reject_value
            }
            VectorPayoff::Risk { oracle } => {
                let rb = self.r_mu_beta(mu);
                self.sin * oracle.value(mu) + self.cos * (-risk(mu, self.beta))
                    + rb * self.reject_value
                    + (1.0 - rb) * self.no_reject_value
            }
        }
    }

    /// Oracle's share of the value at the maximizing mean.
    pub fn oracle_value(&self, mu: f64, reject_value: f64, no_reject_value: f64) -> f64 {
        match self.payoff {
            VectorPayoff::Reject => {
                let (ra, rb) = self.reject_probabilities(mu);
                ra + rb * reject_value + (1.0 - rb) * no_reject_value
            }
            VectorPayoff::Risk { oracle } => {
                let rb = self.r_mu_beta(mu);
                oracle.value(mu) + rb * reject_value + (1.0 - rb) * no_reject_value
            }
        }
    }

    /// Bidder's share of the value at the maximizing mean.
    pub fn bidder_value(&self, mu: f64, reject_value: f64, no_reject_value: f64) -> f64 {
        let rb = self.r_mu_beta(mu);
        match self.payoff {
            VectorPayoff::Reject => rb + rb * reject_value + (1.0 - rb) * no_reject_value,
            VectorPayoff::Risk { .. } => {
                -risk(mu, self.beta) + rb * reject_value + (1.0 - rb) * no_reject_value
            }
        }
    }
}

// ── MatrixUtility ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatrixPayoff {
    Reject,
    Risk,
}

/// Two-wealth payoff model over the four outcome branches of a round. The
/// row side plays α, the column side β; `v00..v11` are the continuation
/// values for (no-reject, reject) pairs.
#[derive(Debug)]
pub struct MatrixUtility {
    payoff: MatrixPayoff,
    criterion: Criterion,
    alpha: f64,
    beta: f64,
    v00: f64,
    v01: f64,
    v10: f64,
    v11: f64,
}

impl MatrixUtility {
    pub fn new(payoff: MatrixPayoff, criterion: Criterion) -> Self {
        Self {
            payoff,
            criterion,
            alpha: 0.0,
            beta: 0.0,
            v00: 0.0,
            v01: 0.0,
            v10: 0.0,
            v11: 0.0,
        }
    }

    pub fn identifier(&self) -> String {
        self.criterion.identifier()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Load the two levels and four continuation branch values for a cell.
    #[allow(clippy::too_many_arguments)]
    pub fn set_constants(
        &mut self,
        alpha: f64,
        beta: f64,
        v00: f64,
        v01: f64,
        v10: f64,
        v11: f64,
    ) {
        self.alpha = alpha;
        self.beta = beta;
        self.v00 = v00;
        self.v01 = v01;
        self.v10 = v10;
        self.v11 = v11;
    }

    fn r_mu(mu: f64, level: f64) -> f64 {
        if mu == 0.0 {
            level
        } else if level == 0.0 {
            0.0
        } else {
            reject_prob(mu, level)
        }
    }

    pub fn reject_probabilities(&self, mu: f64) -> (f64, f64) {
        (Self::r_mu(mu, self.alpha), Self::r_mu(mu, self.beta))
    }

    // The two rejection events are maximally coupled: the smaller level's
    // rejection region nests inside the larger's, so only three of the four
    // branches carry weight.
    fn weighted(ra: f64, rb: f64, util: f64, v00: f64, v01: f64, v10: f64, v11: f64) -> f64 {
        if ra > rb {
            util + v00 * (1.0 - ra) + v10 * (ra - rb) + v11 * rb
        } else {
            util + v00 * (1.0 - rb) + v01 * (rb - ra) + v11 * ra
        }
    }

    /// Objective the mean is chosen to optimize for this cell.
    pub fn evaluate(&self, mu: f64) -> f64 {
        let (ra, rb) = self.reject_probabilities(mu);
        let util = match self.payoff {
            MatrixPayoff::Reject => self.criterion.combine(ra, rb),
            MatrixPayoff::Risk => self
                .criterion
                .combine(risk(mu, self.alpha), risk(mu, self.beta)),
        };
        Self::weighted(ra, rb, util, self.v00, self.v01, self.v10, self.v11)
    }

    /// Row player's value at mean `mu` over explicit branch continuations.
    pub fn row_value(&self, mu: f64, v00: f64, v01: f64, v10: f64, v11: f64) -> f64 {
        let (ra, rb) = self.reject_probabilities(mu);
        let util = match self.payoff {
            MatrixPayoff::Reject => ra,
            MatrixPayoff::Risk => risk(mu, self.alpha),
        };
        Self::weighted(ra, rb, util, v00, v01, v10, v11)
    }

    /// Column player's value at mean `mu` over explicit branch continuations.
    pub fn col_value(&self, mu: f64, v00: f64, v01: f64, v10: f64, v11: f64) -> f64 {
        let (ra, rb) = self.reject_probabilities(mu);
        let util = match self.payoff {
            MatrixPayoff::Reject => rb,
            MatrixPayoff::Risk => risk(mu, self.beta),
        };
        Self::weighted(ra, rb, util, v00, v01, v10, v11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    #[test]
    fn reject_prob_at_null_is_the_level() {
        for level in [0.01, 0.05, 0.25, 0.5] {
            assert!(
                (reject_prob(0.0, level) - level).abs() < 1e-5,
                "level {level}: {}",
                reject_prob(0.0, level)
            );
        }
    }

    #[test]
    fn reject_prob_increases_with_mean() {
        let mut last = reject_prob(0.0, 0.05);
        for mu in [0.5, 1.0, 2.0, 3.0] {
            let r = reject_prob(mu, 0.05);
            assert!(r > last, "not increasing at mu={mu}");
            last = r;
        }
    }

    #[test]
    fn reject_prob_monotone_in_level_and_symmetric_in_mean() {
        for mu in [0.0, 1.0, 2.5] {
            let mut last = 0.0;
            for level in [0.001, 0.01, 0.05, 0.2, 0.5, 0.9] {
                let r = reject_prob(mu, level);
                assert!(r >= last, "level {level} at mu={mu}: {r} < {last}");
                last = r;
            }
        }
        for mu in [0.3, 1.7, 4.0] {
            assert!((reject_prob(mu, 0.05) - reject_prob(-mu, 0.05)).abs() < 1e-12);
        }
    }

    #[test]
    fn underflowing_level_cannot_reject() {
        assert_eq!(reject_prob(2.0, 1e-16), 0.0);
        assert_eq!(z_alpha(1e-16), 8.0);
    }

    #[test]
    fn risk_at_null_matches_closed_form() {
        // risk(0, 0.5) = 2(zφ(z) + 1 - Φ(z)) with z = Φ⁻¹(0.75)
        let z = normal_quantile(0.75);
        let expected = 2.0 * (z * normal_density(z) + 1.0 - normal_cdf(z));
        assert!((risk(0.0, 0.5) - expected).abs() < TOL);
    }

    #[test]
    fn risk_at_level_zero_is_tail_mass_only() {
        // level 0 drops the squared-error term; only the z = 8 tails remain
        assert!(risk(0.0, 0.0) < 1e-10);
        assert!(risk(2.0, 0.0) < 1e-6);
    }

    #[test]
    fn optimal_alpha_behaves() {
        assert_eq!(optimal_alpha(0.0, 0.5), 0.0);
        let a1 = optimal_alpha(1.0, 0.5);
        let a2 = optimal_alpha(2.0, 0.5);
        assert!(a1 > 0.0 && a1 < 1.0);
        assert!(a2 > a1, "larger mean should spend a larger level");
    }

    #[test]
    fn criterion_angle_extremes() {
        let flat = Criterion::angle(0.0);
        assert!((flat.combine(3.0, 7.0) - 3.0).abs() < 1e-12);
        let steep = Criterion::angle(90.0);
        assert!((steep.combine(3.0, 7.0) - 7.0).abs() < 1e-12);
        let ri = Criterion::risk_inflation(2.0);
        assert_eq!(ri.combine(5.0, 2.0), 1.0);
        assert_eq!(ri.identifier(), "2");
    }

    #[test]
    fn oracle_risk_selection_from_alpha() {
        assert_eq!(OracleRisk::from_alpha(0.0), OracleRisk::Testing);
        assert_eq!(OracleRisk::from_alpha(1.0), OracleRisk::RiskInflation);
        assert_eq!(
            OracleRisk::from_alpha(0.05),
            OracleRisk::Testimator { alpha: 0.05 }
        );
        assert_eq!(OracleRisk::Testing.value(0.0), 0.0);
        assert_eq!(OracleRisk::Testing.value(1.5), -1.0);
        assert_eq!(OracleRisk::RiskInflation.value(0.5), -0.25);
        assert_eq!(OracleRisk::RiskInflation.value(2.0), -1.0);
    }

    #[test]
    fn set_constants_clamps_runaway_bid() {
        let mut u = VectorUtility::reject(45.0, 0.05);
        u.set_constants(1.5, 0.0, 0.0);
        assert_eq!(u.beta(), 0.99);
        assert_eq!(u.warn_count(), 1);
    }

    #[test]
    fn reject_probabilities_exact_at_null() {
        let mut u = VectorUtility::reject(45.0, 0.05);
        u.set_constants(0.02, 0.0, 0.0);
        assert_eq!(u.reject_probabilities(0.0), (0.05, 0.02));
    }

    #[test]
    fn vector_evaluate_combines_terms() {
        let mut u = VectorUtility::reject(0.0, 0.05);
        u.set_constants(0.02, 1.0, 0.5);
        let mu = 1.0;
        let rb = reject_prob(mu, 0.02);
        // angle 0: sin = 0, cos = 1; objective is the bidder term alone
        let expected = rb + rb * 1.0 + (1.0 - rb) * 0.5;
        assert!((u.evaluate(mu) - expected).abs() < 1e-12);
        assert!((u.bidder_value(mu, 1.0, 0.5) - expected).abs() < 1e-12);
    }

    #[test]
    fn matrix_branch_weights_nest_rejections() {
        let mut u = MatrixUtility::new(MatrixPayoff::Reject, Criterion::angle(0.0));
        u.set_constants(0.2, 0.05, 1.0, 2.0, 3.0, 4.0);
        let mu = 1.0;
        let ra = reject_prob(mu, 0.2);
        let rb = reject_prob(mu, 0.05);
        assert!(ra > rb);
        let expected = ra + 1.0 * (1.0 - ra) + 3.0 * (ra - rb) + 4.0 * rb;
        assert!((u.evaluate(mu) - expected).abs() < 1e-12);
    }

    #[test]
    fn matrix_branch_weights_swap_when_column_dominates() {
        let mut u = MatrixUtility::new(MatrixPayoff::Reject, Criterion::angle(90.0));
        u.set_constants(0.05, 0.2, 1.0, 2.0, 3.0, 4.0);
        let mu = 1.0;
        let ra = reject_prob(mu, 0.05);
        let rb = reject_prob(mu, 0.2);
        assert!(rb > ra);
        let expected = rb + 1.0 * (1.0 - rb) + 2.0 * (rb - ra) + 4.0 * ra;
        assert!((u.evaluate(mu) - expected).abs() < 1e-12);
    }

    #[test]
    fn matrix_zero_level_never_rejects() {
        let u = {
            let mut u = MatrixUtility::new(MatrixPayoff::Reject, Criterion::angle(45.0));
            u.set_constants(0.0, 0.1, 0.0, 0.0, 0.0, 0.0);
            u
        };
        let (ra, rb) = u.reject_probabilities(2.0);
        assert_eq!(ra, 0.0);
        assert!(rb > 0.0);
        // at the null the levels come back exactly
        assert_eq!(u.reject_probabilities(0.0), (0.0, 0.1));
    }
}
