//! Spending rules: how much alpha-wealth to commit per step.
//!
//! Two callable shapes feed the wealth grids:
//! - [`SpendingRule`] maps current wealth to the next bid (closed-form rate),
//!   used when spending down a running wealth total.
//! - [`SpendingDist`] maps a step index to a probability mass with
//!   `Σ_k p(k) = 1`; the grid spends `ω · p(k)` at step k.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LN2: f64 = std::f64::consts::LN_2;

/// Tail sum Σ 1/(k ln²(k+1)) used to scale the universal code.
const SUM_OF_RECIP_LOG: f64 = 3.387_735_532;

/// Normalizing constants for the universal distribution by starting index.
#[allow(clippy::excessive_precision)]
const UNIVERSAL_NORMALIZERS: [f64; 21] = [
    0.0, 3.3877355, 1.3063666, 0.8920988, 0.7186514, 0.6221371, 0.5598396, 0.51582439, 0.48278679,
    0.45689505, 0.4359382, 0.4185466, 0.40382391, 0.39115728, 0.38011245, 0.37037246, 0.36170009,
    0.35391396, 0.34687281, 0.34046481, 0.33460018,
];

#[derive(Debug, Error)]
pub enum SpendingError {
    #[error("spending rate must lie in (0, 1), got {0}")]
    RateOutOfRange(f64),

    #[error("universal start index must lie in 1..=20, got {0}")]
    StartOutOfRange(usize),

    #[error("scaled universal tail needs more than {limit} positions to reach wealth {wealth}")]
    TailTooLong { wealth: f64, limit: usize },
}

/// Wealth-to-bid spending rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum SpendingRule {
    /// Spend a fixed fraction ψ of current wealth.
    Geometric { psi: f64 },
    /// Universal-code rate: spend `w - ln2 / ln(1 + exp(ln2 / w))`.
    Universal,
}

impl SpendingRule {
    pub fn geometric(psi: f64) -> Result<Self, SpendingError> {
        if !(0.0..1.0).contains(&psi) || psi == 0.0 {
            return Err(SpendingError::RateOutOfRange(psi));
        }
        Ok(Self::Geometric { psi })
    }

    /// Bid to commit from wealth `w`.
    pub fn bid(&self, w: f64) -> f64 {
        match self {
            Self::Geometric { psi } => w * psi,
            Self::Universal => w - LN2 / (1.0 + (LN2 / w).exp()).ln(),
        }
    }

    pub fn identifier(&self) -> String {
        match self {
            Self::Geometric { psi } => format!("geom({psi})"),
            Self::Universal => "univ".to_string(),
        }
    }
}

/// Step-indexed spending distribution; masses sum to one over k = 0, 1, …
///
/// Deserialization routes through the validating constructors, so a config
/// file cannot smuggle in a rate or start index the constructors reject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "dist", try_from = "SpendingDistWire")]
pub enum SpendingDist {
    Geometric { psi: f64 },
    Uniform { n: usize },
    Universal { start: usize },
    /// `g(k) = scale / ((k+1) ln²(k+2))`; not normalized, anchors wealth at
    /// the tail sum instead.
    ScaledUniversal { scale: f64 },
}

/// Unvalidated mirror of [`SpendingDist`] used as the serde intermediate.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case", tag = "dist")]
enum SpendingDistWire {
    Geometric { psi: f64 },
    Uniform { n: usize },
    Universal { start: usize },
    ScaledUniversal { scale: f64 },
}

impl TryFrom<SpendingDistWire> for SpendingDist {
    type Error = SpendingError;

    fn try_from(wire: SpendingDistWire) -> Result<Self, SpendingError> {
        match wire {
            SpendingDistWire::Geometric { psi } => Self::geometric(psi),
            SpendingDistWire::Uniform { n } => Ok(Self::Uniform { n }),
            SpendingDistWire::Universal { start } => Self::universal(start),
            SpendingDistWire::ScaledUniversal { scale } => Ok(Self::ScaledUniversal { scale }),
        }
    }
}

impl SpendingDist {
    pub fn geometric(psi: f64) -> Result<Self, SpendingError> {
        if !(0.0..1.0).contains(&psi) || psi == 0.0 {
            return Err(SpendingError::RateOutOfRange(psi));
        }
        Ok(Self::Geometric { psi })
    }

    pub fn universal(start: usize) -> Result<Self, SpendingError> {
        if !(1..=20).contains(&start) {
            return Err(SpendingError::StartOutOfRange(start));
        }
        Ok(Self::Universal { start })
    }

    /// Probability mass (or unnormalized bid fraction) at step `k`.
    pub fn mass(&self, k: usize) -> f64 {
        match *self {
            Self::Geometric { psi } => psi * (1.0 - psi).powi(k as i32),
            Self::Uniform { n } => {
                if k < n {
                    1.0 / n as f64
                } else {
                    0.0
                }
            }
            Self::Universal { start } => {
                let ll = ((k + 1 + start) as f64).ln();
                1.0 / ((k + start) as f64 * ll * ll * UNIVERSAL_NORMALIZERS[start])
            }
            Self::ScaledUniversal { scale } => {
                let k = k + 1;
                let ll = ((k + 1) as f64).ln();
                scale / (k as f64 * ll * ll)
            }
        }
    }

    /// Total wealth anchored by the scaled universal tail; zero for the
    /// normalized distributions.
    pub fn max_wealth(&self) -> f64 {
        match self {
            Self::ScaledUniversal { scale } => scale * SUM_OF_RECIP_LOG,
            _ => 0.0,
        }
    }

    /// Index at which the scaled universal tail sum first drops to `w0`.
    pub fn w0_index(&self, w0: f64) -> Result<usize, SpendingError> {
        const SIZE_LIMIT: usize = 100_000;
        let mut w = self.max_wealth();
        let mut j = 0;
        while w0 < w && j < SIZE_LIMIT {
            w -= self.mass(j);
            j += 1;
        }
        if j == SIZE_LIMIT {
            return Err(SpendingError::TailTooLong {
                wealth: w0,
                limit: SIZE_LIMIT,
            });
        }
        Ok(j)
    }

    pub fn identifier(&self) -> String {
        match self {
            Self::Geometric { psi } => format!("g{psi}"),
            Self::Uniform { n } => format!("uniform({n})"),
            Self::Universal { start } => format!("univ({start})"),
            Self::ScaledUniversal { scale } => format!("scaled_univ({scale})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_dist_sums_to_one() {
        let d = SpendingDist::geometric(0.1).unwrap();
        let sum: f64 = (0..2000).map(|k| d.mass(k)).sum();
        assert!((sum - 1.0).abs() < 1e-10, "sum {sum}");
    }

    #[test]
    fn uniform_dist_flat_with_bounded_support() {
        let d = SpendingDist::Uniform { n: 40 };
        assert!((d.mass(0) - 0.025).abs() < 1e-15);
        assert!((d.mass(39) - 0.025).abs() < 1e-15);
        assert_eq!(d.mass(40), 0.0);
    }

    #[test]
    fn universal_dist_nearly_sums_to_one() {
        let d = SpendingDist::universal(1).unwrap();
        let sum: f64 = (0..200_000).map(|k| d.mass(k)).sum();
        // slowly converging series; the tolerance reflects the truncation
        assert!((sum - 1.0).abs() < 0.05, "sum {sum}");
    }

    #[test]
    fn universal_start_validated() {
        assert!(SpendingDist::universal(0).is_err());
        assert!(SpendingDist::universal(21).is_err());
        assert!(SpendingDist::universal(20).is_ok());
    }

    #[test]
    fn deserialized_dist_passes_through_validation() {
        let err = serde_json::from_str::<SpendingDist>(r#"{"dist":"universal","start":25}"#)
            .unwrap_err();
        assert!(err.to_string().contains("start index"), "error: {err}");
        assert!(serde_json::from_str::<SpendingDist>(r#"{"dist":"geometric","psi":1.5}"#).is_err());
        let ok: SpendingDist =
            serde_json::from_str(r#"{"dist":"universal","start":3}"#).unwrap();
        assert_eq!(ok, SpendingDist::universal(3).unwrap());
        assert!(ok.mass(0).is_finite());
    }

    #[test]
    fn scaled_universal_w0_index() {
        let d = SpendingDist::ScaledUniversal { scale: 2.0 };
        let idx = d.w0_index(0.5).unwrap();
        assert!(idx > 0);
        // tail sum from idx onward should straddle 0.5
        let spent: f64 = (0..idx).map(|k| d.mass(k)).sum();
        let remaining = d.max_wealth() - spent;
        assert!(remaining <= 0.5 + 1e-9, "remaining {remaining}");
        assert!(remaining + d.mass(idx - 1) > 0.5);
    }

    #[test]
    fn geometric_rule_spends_fraction() {
        let r = SpendingRule::geometric(0.25).unwrap();
        assert!((r.bid(2.0) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn universal_rule_bid_positive_and_small() {
        let r = SpendingRule::Universal;
        for w in [0.05, 0.5, 1.0, 5.0] {
            let b = r.bid(w);
            assert!(b > 0.0, "bid {b} at wealth {w}");
            assert!(b < w, "bid {b} should not exceed wealth {w}");
        }
    }

    #[test]
    fn rate_validation() {
        assert!(SpendingRule::geometric(0.0).is_err());
        assert!(SpendingRule::geometric(1.0).is_err());
        assert!(SpendingDist::geometric(-0.1).is_err());
    }
}
