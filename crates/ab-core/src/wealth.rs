//! Discretized wealth grids with cached interpolated transitions.
//!
//! Wealth is monotone *decreasing* in the grid index: positions past the
//! zero-index are states reached by spending through consecutive
//! non-rejections, positions before it are head-room so that the `+ω` payout
//! on a rejection never walks off the grid.
//!
//! Transition positions are baked once at construction (binary search per
//! row) and only looked up during the recursion.

use crate::logging::WarnLimiter;
use crate::spending::{SpendingDist, SpendingError, SpendingRule};
use ab_math::{invert_monotone, Bisection};
use serde::Serialize;
use thiserror::Error;

/// Rows the dual-grid resampler may emit before giving up.
const DUAL_GRID_CAPACITY: usize = 1000;

/// Wealth within this distance of the anchor counts as the zero-index row.
const ZERO_INDEX_EPS: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum WealthError {
    #[error("zero index {zero_index} outside wealth grid of {len} rows")]
    ZeroIndexOutOfRange { zero_index: usize, len: usize },

    #[error("starting wealth {w0} resolves to the last grid row ({index}); transitions cannot anchor there")]
    ZeroIndexAtBoundary { w0: f64, index: usize },

    #[error("wealth grid capacity of {limit} rows exhausted at wealth {reached}")]
    CapacityExhausted { limit: usize, reached: f64 },

    #[error(transparent)]
    Spending(#[from] SpendingError),
}

/// Interpolated grid position: mix `grid[index]` and `grid[index + 1]` with
/// `weight` on the former. Weight stays in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionPosition {
    pub index: usize,
    pub weight: f64,
}

impl TransitionPosition {
    /// Interpolate a value slice at this position. The slice must extend one
    /// element past `index` (tables carry a padding column for this).
    pub fn interpolate(&self, values: &[f64]) -> f64 {
        values[self.index] * self.weight + values[self.index + 1] * (1.0 - self.weight)
    }
}

// ── WealthGrid ───────────────────────────────────────────────────────────

/// Single-outcome wealth grid: one cached transition per row (the post-
/// rejection jump); the no-rejection move is simply the next index.
#[derive(Debug)]
pub struct WealthGrid {
    name: String,
    zero_index: usize,
    omega: f64,
    wealth: Vec<f64>,
    reject_positions: Vec<TransitionPosition>,
    warns: WarnLimiter,
}

impl WealthGrid {
    /// Grid driven by a per-step probability mass: step k spends `ω·p(k)`.
    pub fn from_dist(
        omega: f64,
        zero_index: usize,
        steps: usize,
        dist: SpendingDist,
    ) -> Result<Self, WealthError> {
        let mut grid = Self::empty(dist.identifier(), zero_index, omega, zero_index + steps + 1)?;
        grid.wealth[zero_index] = omega;
        for i in zero_index + 1..grid.len() {
            let bid = omega * dist.mass(i - zero_index - 1);
            grid.wealth[i] = grid.wealth[i - 1] - bid;
        }
        grid.fill_top();
        grid.init_positions();
        Ok(grid)
    }

    /// Grid spending a geometric fraction ψ of current wealth per step.
    pub fn geometric(
        omega: f64,
        zero_index: usize,
        steps: usize,
        psi: f64,
    ) -> Result<Self, WealthError> {
        SpendingRule::geometric(psi)?;
        let mut grid = Self::empty(format!("g{psi}"), zero_index, omega, zero_index + steps + 1)?;
        grid.wealth[zero_index] = omega;
        for i in zero_index + 1..grid.len() {
            grid.wealth[i] = grid.wealth[i - 1] * (1.0 - psi);
        }
        grid.fill_top();
        grid.init_positions();
        Ok(grid)
    }

    /// Grid from the scaled universal code: the zero-index falls where the
    /// tail sum of `g(k)` first drops to the starting wealth `w0`.
    pub fn scaled_universal(
        w0: f64,
        omega: f64,
        steps: usize,
        scale: f64,
    ) -> Result<Self, WealthError> {
        let dist = SpendingDist::ScaledUniversal { scale };
        let zero_index = dist.w0_index(w0)?;
        let mut grid = Self::empty(dist.identifier(), zero_index, omega, zero_index + steps + 1)?;
        grid.wealth[0] = dist.max_wealth();
        for i in 1..grid.len() {
            grid.wealth[i] = grid.wealth[i - 1] - dist.mass(i - 1);
        }
        grid.init_positions();
        Ok(grid)
    }

    fn empty(name: String, zero_index: usize, omega: f64, len: usize) -> Result<Self, WealthError> {
        if zero_index == 0 || zero_index >= len {
            return Err(WealthError::ZeroIndexOutOfRange { zero_index, len });
        }
        tracing::info!(
            grid = %name,
            rows = len,
            steps = len - zero_index,
            omega,
            "initializing wealth grid"
        );
        Ok(Self {
            name,
            zero_index,
            omega,
            wealth: vec![0.0; len],
            reject_positions: Vec::new(),
            warns: WarnLimiter::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zero_index(&self) -> usize {
        self.zero_index
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    fn len(&self) -> usize {
        self.wealth.len()
    }

    /// Rows carrying a usable bid; the last row has no successor.
    pub fn number_of_bids(&self) -> usize {
        self.wealth.len() - 1
    }

    pub fn wealth(&self, k: usize) -> f64 {
        self.wealth[k]
    }

    /// Bid at row k, the wealth step down to the next row. Bids are test
    /// levels, so anything above 1 clamps to 1.
    pub fn bid(&self, k: usize) -> f64 {
        let b = self.wealth[k] - self.wealth[k + 1];
        if b > 1.0 {
            self.warns
                .warn(&format!("wealth grid bid at k={k} is {b:.4} > 1; reduced to 1"));
            return 1.0;
        }
        b
    }

    /// Cached position reached from row k when a rejection pays `ω - bid(k)`.
    pub fn transition_after_reject(&self, k: usize) -> TransitionPosition {
        self.reject_positions[k]
    }

    /// Clamped-bid and negative-weight occurrences observed so far.
    pub fn warn_count(&self) -> u64 {
        self.warns.count()
    }

    // Extend the grid above the zero-index with geometrically growing bids so
    // the head-room spans a rejection payout. The growth multiplier solves
    // b0·Σ_{j=1..k} m^j = 0.5 over m ∈ [1.000001, 3] by bisection.
    fn fill_top(&mut self) {
        let headroom = 0.5;
        let k = self.zero_index;
        let mut b = self.wealth[k] - self.wealth[k + 1];
        if b <= 0.0 {
            // degenerate spending rule; leave flat head-room of ω per row
            for i in (0..k).rev() {
                self.wealth[i] = self.wealth[i + 1] + self.omega;
            }
            return;
        }
        let ratio = headroom / b;
        let m = Bisection::new(1e-5, (1.000001, 3.0)).find_root(|x| {
            let mut xk = x;
            for _ in 1..k {
                xk *= x;
            }
            x * (1.0 - xk) / (1.0 - x) - ratio
        });
        tracing::debug!(b0 = b, growth = m, "filling wealth grid top");
        for i in (0..k).rev() {
            b *= m;
            self.wealth[i] = self.wealth[i + 1] + b;
        }
        // the top bid must cover the rejection payout
        if self.wealth[0] - self.wealth[1] < self.omega {
            tracing::debug!("moving top bid up to omega");
            self.wealth[0] = self.wealth[1] + self.omega;
        }
    }

    fn init_positions(&mut self) {
        // the payout increment is fixed, so every landing spot can be baked
        for k in 0..self.len() - 1 {
            let increase = self.omega - self.bid(k);
            if increase < 0.0 {
                self.warns.warn(&format!(
                    "bid {:.4} at k={k} exceeds payout {}; rejection still loses wealth",
                    self.bid(k),
                    self.omega
                ));
            }
            let pos = self.find_position(k, increase);
            self.reject_positions.push(pos);
        }
    }

    // Locate wealth[k] + increase by bisection over the decreasing array.
    fn find_position(&self, k: usize, increase: f64) -> TransitionPosition {
        let target = self.wealth[k] + increase;
        let mut k1 = k;
        // a net loss moves down-grid; walk forward until bracketed
        while self.wealth[k1] > target && k1 + 1 < self.len() {
            k1 += 1;
        }
        let mut k0 = 0;
        while k0 + 1 < k1 {
            let mid = (k0 + k1) / 2;
            if self.wealth[mid] < target {
                k1 = mid;
            } else {
                k0 = mid;
            }
        }
        if k0 < k1 {
            let span = self.wealth[k0] - self.wealth[k1];
            let p = (self.wealth[k0] - target) / span;
            if p < 0.0 {
                self.warns.warn(&format!(
                    "negative interpolation share {p:.4} at k={k} for increment {increase:.4}"
                ));
            }
            TransitionPosition {
                index: k0,
                weight: (1.0 - p).clamp(0.0, 1.0),
            }
        } else {
            TransitionPosition {
                index: k0,
                weight: 1.0,
            }
        }
    }
}

// ── DualWealthGrid ───────────────────────────────────────────────────────

/// Two-outcome wealth grid: each row carries (wealth, bid) and caches the
/// landing position both for a rejection (wealth rises toward ω, clamped at
/// the top) and for a spent bid (wealth falls).
#[derive(Debug)]
pub struct DualWealthGrid {
    name: String,
    zero_index: usize,
    omega: f64,
    rows: Vec<(f64, f64)>,
    reject_positions: Vec<TransitionPosition>,
    bid_positions: Vec<TransitionPosition>,
    warns: WarnLimiter,
}

impl DualWealthGrid {
    /// Unconstrained player: a single row with a constant bid. The recursion
    /// needs no special-casing; both transitions point back at the row.
    pub fn fixed(w0: f64) -> Self {
        let stay = TransitionPosition {
            index: 0,
            weight: 1.0,
        };
        Self {
            name: format!("fixed({w0})"),
            zero_index: 0,
            omega: w0,
            rows: vec![(w0, w0)],
            reject_positions: vec![stay],
            bid_positions: vec![stay],
            warns: WarnLimiter::default(),
        }
    }

    /// Build by spending `max_wealth` down with `rule`, then resampling the
    /// (wealth, bid) trail onto a fixed grid that is coarse at high wealth
    /// and fine near zero.
    pub fn new(
        max_wealth: f64,
        w0: f64,
        omega: f64,
        rule: SpendingRule,
        n_rounds: usize,
    ) -> Result<Self, WealthError> {
        let (wealths, bids) = Self::spend_down_trail(max_wealth, omega, rule, n_rounds);
        let min_w = *wealths.last().expect("trail is never empty");

        // resample the trail onto the fixed decreasing grid
        let mut rows: Vec<(f64, f64)> = Vec::new();
        let mut delta = grid_delta(max_wealth);
        let mut wealth = 0.01 * (100.0 * max_wealth).floor(); // land ω on a grid point
        let mut i_start = 0usize;
        while min_w < wealth {
            if rows.len() == DUAL_GRID_CAPACITY {
                return Err(WealthError::CapacityExhausted {
                    limit: DUAL_GRID_CAPACITY,
                    reached: wealth,
                });
            }
            let idx = invert_monotone(wealth, i_start, &wealths);
            i_start = idx.floor() as usize;
            let share = idx - i_start as f64;
            let bid = if i_start + 1 < bids.len() {
                bids[i_start] * (1.0 - share) + bids[i_start + 1] * share
            } else {
                bids[i_start]
            };
            rows.push((wealth, bid));
            wealth -= delta;
            delta = grid_delta(wealth);
        }
        tracing::info!(
            rule = %rule.identifier(),
            rows = rows.len(),
            min_wealth = min_w,
            "resampled dual wealth grid"
        );

        // anchor the zero-index at the starting wealth
        let mut zero_index = 0;
        while zero_index < rows.len() && rows[zero_index].0 - w0 > ZERO_INDEX_EPS {
            zero_index += 1;
        }
        if zero_index + 1 >= rows.len() {
            return Err(WealthError::ZeroIndexAtBoundary {
                w0,
                index: zero_index,
            });
        }

        let mut grid = Self {
            name: rule.identifier(),
            zero_index,
            omega,
            rows,
            reject_positions: Vec::new(),
            bid_positions: Vec::new(),
            warns: WarnLimiter::default(),
        };
        grid.clamp_bids();
        grid.init_reject_positions();
        grid.init_bid_positions();
        Ok(grid)
    }

    // Spend the running total down past ω, then n_rounds + 1 further steps as
    // if every round is lost, then keep going until safely below ω so the
    // resampler never runs off the tabulated trail.
    fn spend_down_trail(
        max_wealth: f64,
        omega: f64,
        rule: SpendingRule,
        n_rounds: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut wealths = Vec::new();
        let mut bids = Vec::new();
        let mut min_w = max_wealth;
        let mut check_pt = 10_000usize;
        while omega <= min_w {
            let b = rule.bid(min_w);
            wealths.push(min_w);
            bids.push(b);
            min_w -= b;
            if wealths.len() == check_pt {
                tracing::warn!(
                    steps = wealths.len(),
                    wealth = min_w,
                    "spending down slowly; wealth still above omega"
                );
                check_pt += 50_000;
            }
        }
        for _ in 0..=n_rounds {
            let b = rule.bid(min_w);
            wealths.push(min_w);
            bids.push(b);
            min_w -= b;
        }
        while min_w > omega - grid_delta(omega) && min_w > 0.0 {
            let b = rule.bid(min_w);
            wealths.push(min_w);
            bids.push(b);
            min_w -= b;
        }
        wealths.push(min_w);
        bids.push(rule.bid(min_w.max(0.0)));
        (wealths, bids)
    }

    fn clamp_bids(&mut self) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            if row.1 > 1.0 {
                self.warns.warn(&format!(
                    "dual wealth bid {:.4} at row {i} larger than 1; reduced to 1",
                    row.1
                ));
                row.1 = 1.0;
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zero_index(&self) -> usize {
        self.zero_index
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Number of wealth rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn wealth(&self, k: usize) -> f64 {
        self.rows[k].0
    }

    pub fn bid(&self, k: usize) -> f64 {
        self.rows[k].1
    }

    /// Cached landing position after a rejection at row k.
    pub fn reject_transition(&self, k: usize) -> TransitionPosition {
        self.reject_positions[k]
    }

    /// Cached landing position after the bid at row k is spent.
    pub fn bid_transition(&self, k: usize) -> TransitionPosition {
        self.bid_positions[k]
    }

    pub fn warn_count(&self) -> u64 {
        self.warns.count()
    }

    fn init_reject_positions(&mut self) {
        let max_wealth = self.rows[0].0;
        // a rejection from the top row stays at the top
        self.reject_positions.push(TransitionPosition {
            index: 0,
            weight: 1.0,
        });
        for k in 1..self.rows.len() {
            let change = self.omega - self.bid(k);
            let after = self.wealth(k) + change;
            let pos = if after > max_wealth {
                TransitionPosition {
                    index: 0,
                    weight: 1.0,
                }
            } else {
                // W[k1] <= new wealth <= W[k0]
                let (k0, k1) = if change > 0.0 {
                    (0, k)
                } else {
                    (k, self.rows.len() - 1)
                };
                self.find_position(k0, k1, after)
            };
            self.reject_positions.push(pos);
        }
    }

    fn init_bid_positions(&mut self) {
        for k in 0..self.rows.len() - 1 {
            let after = self.wealth(k) - self.bid(k);
            let pos = self.find_position(k, self.rows.len() - 1, after);
            self.bid_positions.push(pos);
        }
        // the last row has nowhere further down to go
        self.bid_positions.push(TransitionPosition {
            index: self.rows.len() - 1,
            weight: 1.0,
        });
    }

    // Bisect [k0, k1] for target wealth w; rows are decreasing in index.
    fn find_position(&self, mut k0: usize, mut k1: usize, w: f64) -> TransitionPosition {
        while k0 + 1 < k1 {
            let mid = (k0 + k1) / 2;
            if self.wealth(mid) < w {
                k1 = mid;
            } else {
                k0 = mid;
            }
        }
        if k0 < k1 {
            let span = self.wealth(k0) - self.wealth(k1);
            let p = if span > 0.0 {
                (self.wealth(k0) - w) / span
            } else {
                0.0
            };
            if p < 0.0 {
                self.warns
                    .warn(&format!("negative interpolation share {p:.4} for wealth {w:.4}"));
            }
            TransitionPosition {
                index: k0,
                weight: (1.0 - p).clamp(0.0, 1.0),
            }
        } else {
            TransitionPosition {
                index: k0,
                weight: 1.0,
            }
        }
    }
}

/// Grid spacing by wealth level: coarse far above the action, fine near the
/// zero boundary that drives rejection dynamics.
pub fn grid_delta(wealth: f64) -> f64 {
    if wealth > 2.0 {
        0.2
    } else if wealth > 1.0 {
        0.1
    } else if wealth > 0.5 {
        0.05
    } else if wealth > 0.1 {
        0.01
    } else if wealth > 0.02 {
        0.005
    } else {
        0.001
    }
}
