//! Competitive alpha-investing Bellman solver.
//!
//! Computes, by backward induction, the value function of a finite-horizon
//! game of sequential hypothesis testing: a wealth-constrained bidder commits
//! a two-sided test level each round out of a depletable alpha-wealth budget,
//! a rejection pays the budget back, and an oracle (possibly unconstrained)
//! plays the same game as a benchmark.
//!
//! - Wealth states live on discretized grids with cached interpolated
//!   transitions ([`wealth`]).
//! - Per-state optimal signal levels come from a bracketed golden-section
//!   search over the value models in [`utility`].
//! - The round-by-round recursion, single- and two-player, is in [`solver`].
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod logging;
pub mod output;
pub mod solver;
pub mod spending;
pub mod utility;
pub mod wealth;
