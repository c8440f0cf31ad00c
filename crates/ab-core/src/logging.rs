//! Logging setup and rate-limited warnings.
//!
//! stdout is reserved for result payloads; all log output goes to stderr.
//! Verbosity defaults to `info` and can be overridden with the `AB_LOG`
//! environment filter or the CLI `-v` flags.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Safe to call once per process.
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("AB_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Rate-limited warning counter.
///
/// Numerical clamps inside the recursion (bid above 1, negative
/// interpolation weight) can fire once per state cell; this logs the first
/// few, announces the cutoff, and counts silently from then on. The total is
/// always available for diagnostics.
#[derive(Debug)]
pub struct WarnLimiter {
    limit: u64,
    count: AtomicU64,
}

impl WarnLimiter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            count: AtomicU64::new(0),
        }
    }

    /// Record one occurrence; log it if still under the limit.
    pub fn warn(&self, message: &str) {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        if n < self.limit {
            tracing::warn!("{message}");
        } else if n == self.limit {
            tracing::warn!("{message} (warning limit reached; further occurrences counted only)");
        }
    }

    /// Total occurrences recorded, logged or not.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for WarnLimiter {
    fn default() -> Self {
        Self::new(5)
    }
}
