//! Run configuration and validation.
//!
//! Player conventions: `omega = 1` marks an unconstrained player holding a
//! fixed level forever; `prob = 0` selects the universal spending rule;
//! any other rate spends geometrically. `w0` defaults to `omega` when not
//! given.

use crate::spending::{SpendingError, SpendingRule};
use crate::wealth::{DualWealthGrid, WealthError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top of every constrained wealth grid.
pub const MAX_WEALTH: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must lie in [0, 1], got {value}")]
    LevelOutOfRange { name: String, value: f64 },

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: String, value: f64 },

    #[error(transparent)]
    Wealth(#[from] WealthError),

    #[error(transparent)]
    Spending(#[from] SpendingError),
}

fn check_level(name: impl Into<String>, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::LevelOutOfRange {
            name: name.into(),
            value,
        });
    }
    Ok(())
}

fn check_positive(name: impl Into<String>, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0) {
        return Err(ConfigError::NotPositive {
            name: name.into(),
            value,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoffKind {
    Reject,
    Risk,
}

/// One side of the game: starting wealth, spending rate, and payout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub w0: f64,
    pub prob: f64,
    pub omega: f64,
}

impl PlayerSpec {
    /// `w0` falls back to ω when not supplied.
    pub fn new(w0: Option<f64>, prob: f64, omega: f64) -> Self {
        Self {
            w0: w0.unwrap_or(omega),
            prob,
            omega,
        }
    }

    /// Unconstrained players never run out of wealth and play a single
    /// fixed level, so their grid degenerates to one row.
    pub fn is_unconstrained(&self) -> bool {
        self.omega == 1.0
    }

    pub fn validate(&self, side: &str) -> Result<(), ConfigError> {
        check_level(format!("{side} prob"), self.prob)?;
        check_level(format!("{side} omega"), self.omega)?;
        check_positive(format!("{side} omega"), self.omega)?;
        check_positive(format!("{side} w0"), self.w0)?;
        Ok(())
    }

    pub fn build_grid(&self, n_rounds: usize) -> Result<DualWealthGrid, ConfigError> {
        if self.is_unconstrained() {
            tracing::info!(w0 = self.w0, "fixed-wealth player");
            return Ok(DualWealthGrid::fixed(self.w0));
        }
        let rule = if self.prob == 0.0 {
            SpendingRule::Universal
        } else {
            SpendingRule::geometric(self.prob)?
        };
        tracing::info!(
            rule = %rule.identifier(),
            w0 = self.w0,
            omega = self.omega,
            "building wealth grid"
        );
        Ok(DualWealthGrid::new(
            MAX_WEALTH, self.w0, self.omega, rule, n_rounds,
        )?)
    }
}

/// Configuration for a full game solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub payoff: PayoffKind,
    pub angle: f64,
    pub n_rounds: usize,
    pub write_details: bool,
    pub oracle: PlayerSpec,
    pub bidder: PlayerSpec,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.angle.is_finite() {
            return Err(ConfigError::NotPositive {
                name: "angle".into(),
                value: self.angle,
            });
        }
        self.oracle.validate("oracle")?;
        self.bidder.validate("bidder")?;
        Ok(())
    }

    /// Tag used in detail file names and the summary line.
    pub fn identifier(&self) -> String {
        format!(
            "n_{}_angle_{}_oracle_{}_{}_bidder_{}_{}",
            self.n_rounds,
            self.angle,
            self.oracle.prob,
            self.oracle.omega,
            self.bidder.prob,
            self.bidder.omega
        )
    }
}

/// Configuration for the spike-mixture process-risk sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub n_rounds: usize,
    pub alpha: f64,
    pub scale: f64,
    pub omega: f64,
    pub signal: f64,
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_level("alpha", self.alpha)?;
        check_level("omega", self.omega)?;
        check_positive("omega", self.omega)?;
        check_positive("scale", self.scale)?;
        if self.signal < 0.0 {
            return Err(ConfigError::NotPositive {
                name: "signal".into(),
                value: self.signal,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w0_defaults_to_omega() {
        let p = PlayerSpec::new(None, 0.1, 0.5);
        assert_eq!(p.w0, 0.5);
        let q = PlayerSpec::new(Some(0.7), 0.1, 0.5);
        assert_eq!(q.w0, 0.7);
    }

    #[test]
    fn level_outside_unit_interval_is_rejected() {
        let p = PlayerSpec::new(None, 1.5, 0.5);
        match p.validate("bidder") {
            Err(ConfigError::LevelOutOfRange { name, value }) => {
                assert_eq!(name, "bidder prob");
                assert_eq!(value, 1.5);
            }
            other => panic!("expected level error, got {other:?}"),
        }
        let q = PlayerSpec::new(None, 0.1, -0.5);
        assert!(q.validate("bidder").is_err());
    }

    #[test]
    fn unconstrained_player_gets_fixed_grid() {
        let p = PlayerSpec::new(Some(0.05), 0.05, 1.0);
        assert!(p.is_unconstrained());
        let grid = p.build_grid(10).unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.bid(0), 0.05);
    }

    #[test]
    fn zero_prob_selects_the_universal_rule() {
        let p = PlayerSpec::new(None, 0.0, 0.5);
        let grid = p.build_grid(10).unwrap();
        assert_eq!(grid.name(), "univ");
    }

    #[test]
    fn geometric_prob_selects_the_geometric_rule() {
        let p = PlayerSpec::new(None, 0.1, 0.5);
        let grid = p.build_grid(10).unwrap();
        assert!(grid.name().starts_with("geom"));
    }

    #[test]
    fn run_config_identifier_is_stable() {
        let cfg = RunConfig {
            payoff: PayoffKind::Reject,
            angle: 45.0,
            n_rounds: 20,
            write_details: false,
            oracle: PlayerSpec::new(None, 0.1, 0.5),
            bidder: PlayerSpec::new(None, 0.2, 0.5),
        };
        assert_eq!(cfg.identifier(), "n_20_angle_45_oracle_0.1_0.5_bidder_0.2_0.5");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn risk_config_validates_ranges() {
        let ok = RiskConfig {
            n_rounds: 100,
            alpha: 0.05,
            scale: 2.0,
            omega: 0.5,
            signal: 2.5,
        };
        assert!(ok.validate().is_ok());
        let bad = RiskConfig { alpha: 1.2, ..ok };
        assert!(bad.validate().is_err());
    }
}
