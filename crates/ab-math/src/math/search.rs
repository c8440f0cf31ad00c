//! Derivative-free scalar searches.
//!
//! `GoldenSection` locates the extremum of a unimodal function on a fixed
//! bracket: a coarse grid scan first picks the most promising subinterval,
//! then golden-ratio narrowing pins it down. `Bisection` finds the root of a
//! monotone function. `invert_monotone` inverts a tabulated decreasing
//! sequence to a fractional index.
//!
//! None of these treat hitting the iteration cap as an error; the best
//! bracket found so far is returned, with `converged` reporting whether the
//! tolerance was actually met.

use serde::Serialize;

/// (3 - sqrt(5)) / 2, the golden-section interior fraction.
const GOLDEN: f64 = 0.381_966_011_250_105_2;

/// Outcome of a scalar search: the argmax/argmin, its function value, and
/// whether the bracket shrank below tolerance before the iteration cap.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SearchResult {
    pub x: f64,
    pub value: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Golden-section extremum search over a fixed bracket.
#[derive(Debug, Clone)]
pub struct GoldenSection {
    tolerance: f64,
    bracket: (f64, f64),
    initial_grid: f64,
    max_iterations: usize,
}

impl GoldenSection {
    pub fn new(tolerance: f64, bracket: (f64, f64), initial_grid: f64, max_iterations: usize) -> Self {
        debug_assert!(tolerance > 0.0 && bracket.0 < bracket.1 && initial_grid > 0.0);
        Self {
            tolerance,
            bracket,
            initial_grid,
            max_iterations,
        }
    }

    /// Maximize `f` over the bracket. Returns (argmax, f(argmax)).
    pub fn find_maximum<F: Fn(f64) -> f64>(&self, f: F) -> SearchResult {
        self.search(|x| -f(x), true)
    }

    /// Minimize `f` over the bracket. Returns (argmin, f(argmin)).
    pub fn find_minimum<F: Fn(f64) -> f64>(&self, f: F) -> SearchResult {
        self.search(f, false)
    }

    // Internally always minimizes; `negate` flips the reported value back.
    fn search<F: Fn(f64) -> f64>(&self, f: F, negate: bool) -> SearchResult {
        let (mut lo, mut hi) = self.coarse_bracket(&f);

        // interior points at the golden fractions
        let mut x1 = lo + GOLDEN * (hi - lo);
        let mut x2 = hi - GOLDEN * (hi - lo);
        let mut f1 = f(x1);
        let mut f2 = f(x2);

        let mut iterations = 0;
        while hi - lo > self.tolerance && iterations < self.max_iterations {
            if f1 < f2 {
                hi = x2;
                x2 = x1;
                f2 = f1;
                x1 = lo + GOLDEN * (hi - lo);
                f1 = f(x1);
            } else {
                lo = x1;
                x1 = x2;
                f1 = f2;
                x2 = hi - GOLDEN * (hi - lo);
                f2 = f(x2);
            }
            iterations += 1;
        }

        let (x, fx) = if f1 < f2 { (x1, f1) } else { (x2, f2) };
        SearchResult {
            x,
            value: if negate { -fx } else { fx },
            converged: hi - lo <= self.tolerance,
            iterations,
        }
    }

    // Scan the bracket at `initial_grid` spacing and return the subinterval
    // surrounding the smallest sample. Guards against a unimodal function
    // whose extremum the golden bracketing would otherwise skip.
    fn coarse_bracket<F: Fn(f64) -> f64>(&self, f: &F) -> (f64, f64) {
        let (lo, hi) = self.bracket;
        let mut best_x = lo;
        let mut best_f = f(lo);
        let mut x = lo + self.initial_grid;
        while x < hi {
            let fx = f(x);
            if fx < best_f {
                best_f = fx;
                best_x = x;
            }
            x += self.initial_grid;
        }
        let fx = f(hi);
        if fx < best_f {
            best_x = hi;
        }
        (
            (best_x - self.initial_grid).max(lo),
            (best_x + self.initial_grid).min(hi),
        )
    }
}

/// Bisection root finder for a monotone function.
#[derive(Debug, Clone)]
pub struct Bisection {
    tolerance: f64,
    bracket: (f64, f64),
}

impl Bisection {
    pub fn new(tolerance: f64, bracket: (f64, f64)) -> Self {
        debug_assert!(tolerance > 0.0 && bracket.0 < bracket.1);
        Self { tolerance, bracket }
    }

    /// Root of `f` within the bracket.
    ///
    /// If `f` does not change sign over the bracket there is no interior
    /// root; the endpoint closer to zero is returned so callers can clamp.
    pub fn find_root<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        let (mut lo, mut hi) = self.bracket;
        let f_lo = f(lo);
        let f_hi = f(hi);
        if f_lo == 0.0 {
            return lo;
        }
        if f_hi == 0.0 {
            return hi;
        }
        if f_lo.signum() == f_hi.signum() {
            return if f_lo.abs() <= f_hi.abs() { lo } else { hi };
        }
        while hi - lo > self.tolerance {
            let mid = 0.5 * (lo + hi);
            let f_mid = f(mid);
            if f_mid == 0.0 {
                return mid;
            }
            if f_mid.signum() == f_lo.signum() {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

/// Invert a tabulated strictly decreasing sequence at `target`.
///
/// Returns the fractional index `i + s` such that
/// `xs[i]*(1-s) + xs[i+1]*s == target`, starting the walk at `start_hint`
/// (callers sweeping decreasing targets pass the previous integer part).
/// Targets outside the tabulated range clamp to the nearest end.
pub fn invert_monotone(target: f64, start_hint: usize, xs: &[f64]) -> f64 {
    debug_assert!(xs.len() >= 2);
    if target >= xs[0] {
        return 0.0;
    }
    let last = xs.len() - 1;
    if target <= xs[last] {
        return last as f64;
    }
    let mut i = start_hint.min(last - 1);
    // back up if the hint overshot
    while i > 0 && xs[i] < target {
        i -= 1;
    }
    while i + 1 < last && xs[i + 1] > target {
        i += 1;
    }
    let span = xs[i] - xs[i + 1];
    if span <= 0.0 {
        return i as f64;
    }
    i as f64 + (xs[i] - target) / span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximum_of_concave_quadratic() {
        let gs = GoldenSection::new(1e-6, (0.0, 10.0), 0.5, 200);
        let r = gs.find_maximum(|x| -(x - 3.0) * (x - 3.0) + 2.0);
        assert!(r.converged);
        assert!((r.x - 3.0).abs() < 1e-4, "argmax {}", r.x);
        assert!((r.value - 2.0).abs() < 1e-6);
    }

    #[test]
    fn minimum_of_convex_quadratic() {
        let gs = GoldenSection::new(1e-6, (0.05, 10.0), 0.5, 200);
        let r = gs.find_minimum(|x| (x - 7.25) * (x - 7.25));
        assert!((r.x - 7.25).abs() < 1e-4);
        assert!(r.value < 1e-6);
    }

    #[test]
    fn extremum_on_boundary() {
        let gs = GoldenSection::new(1e-6, (0.05, 10.0), 0.5, 200);
        // increasing function: maximum sits at the right edge
        let r = gs.find_maximum(|x| x);
        assert!((r.x - 10.0).abs() < 1e-3, "argmax {}", r.x);
    }

    #[test]
    fn iteration_cap_is_soft() {
        let gs = GoldenSection::new(1e-12, (0.0, 1.0), 0.5, 3);
        let r = gs.find_maximum(|x| -(x - 0.4) * (x - 0.4));
        assert!(!r.converged);
        assert_eq!(r.iterations, 3);
        // still a sensible answer
        assert!((r.x - 0.4).abs() < 0.5);
    }

    #[test]
    fn bisection_finds_root() {
        let bi = Bisection::new(1e-8, (0.0, 4.0));
        let root = bi.find_root(|x| x * x - 2.0);
        assert!((root - std::f64::consts::SQRT_2).abs() < 1e-7);
    }

    #[test]
    fn bisection_no_sign_change_returns_nearest_endpoint() {
        let bi = Bisection::new(1e-8, (1.0, 3.0));
        // positive over the whole bracket; lower endpoint is closest to zero
        let root = bi.find_root(|x| x + 10.0);
        assert_eq!(root, 1.0);
    }

    #[test]
    fn bisection_growth_factor_shape() {
        // same shape the wealth grid top-fill solves: sum of x^j minus w/b
        let k = 10;
        let ratio = 25.0;
        let bi = Bisection::new(1e-5, (1.000001, 3.0));
        let m = bi.find_root(|x| {
            let mut xk = x;
            for _ in 1..k {
                xk *= x;
            }
            x * (1.0 - xk) / (1.0 - x) - ratio
        });
        // check the geometric sum really hits the ratio
        let mut sum = 0.0;
        let mut term = m;
        for _ in 0..k {
            sum += term;
            term *= m;
        }
        assert!((sum - ratio).abs() < 1e-2, "sum {sum} for m {m}");
    }

    #[test]
    fn invert_monotone_interpolates() {
        let xs = [10.0, 8.0, 5.0, 1.0];
        assert_eq!(invert_monotone(10.0, 0, &xs), 0.0);
        assert!((invert_monotone(9.0, 0, &xs) - 0.5).abs() < 1e-12);
        assert!((invert_monotone(3.0, 0, &xs) - 2.5).abs() < 1e-12);
        assert_eq!(invert_monotone(0.5, 0, &xs), 3.0);
    }

    #[test]
    fn invert_monotone_bad_hint_recovers() {
        let xs = [10.0, 8.0, 5.0, 1.0];
        assert!((invert_monotone(9.0, 2, &xs) - 0.5).abs() < 1e-12);
    }
}
