//! Alpha-bellman math utilities.

pub mod math;

pub use math::normal::*;
pub use math::search::*;
