//! Shared numerical primitives for weight handling.
//!
//! Log-weights are kept unnormalized throughout the filter; every reduction
//! over them goes through the max-shifted forms below so that a single large
//! weight cannot overflow and a cloud of tiny ones cannot underflow to zero.
//!
//! Conventions:
//! - A log-weight of `-inf` marks a dead particle; it contributes nothing to
//!   any reduction here.
//! - NaN inputs are propagated, not masked. Callers that must fail on NaN do
//!   so themselves.

use ndarray::ArrayView1;
use rand::{rngs::StdRng, Rng};

/// Numerically stable `log Σ exp(lws[i])`.
///
/// Uses the max-shift form `m + log Σ exp(lws[i] − m)` with `m = max(lws)`.
///
/// Returns `-inf` when every entry is `-inf` (the degenerate-weight case the
/// filter driver checks for) and `NaN` when any entry is `NaN`.
pub fn logsumexp(lws: ArrayView1<f64>) -> f64 {
    let mx = lws.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if !mx.is_finite() {
        // All -inf, or a +inf entry dominates; the shifted sum below would
        // produce NaN from inf - inf.
        if lws.iter().any(|v| v.is_nan()) {
            return f64::NAN;
        }
        return mx;
    }
    let sum: f64 = lws.iter().map(|&v| (v - mx).exp()).sum();
    mx + sum.ln()
}

/// Effective sample size of a vector of unnormalized log-weights.
///
/// ESS = `(Σ w)² / Σ w²` with `w[i] = exp(lws[i])`, evaluated max-shifted in
/// a single pass so it is exact under any common additive offset.
///
/// Ranges over `[1, P]` for proper weights: `P` when all weights are equal,
/// `1` when a single particle carries all the mass. Degenerate input (all
/// `-inf`) yields `NaN`.
pub fn ess(lws: ArrayView1<f64>) -> f64 {
    let mx = lws.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let mut s1 = 0.0;
    let mut s2 = 0.0;
    for &lw in lws.iter() {
        let w = (lw - mx).exp();
        s1 += w;
        s2 += w * w;
    }
    s1 * s1 / s2
}

/// Draw one index from the categorical distribution with probabilities
/// proportional to `exp(lws[i])`.
///
/// The draw is a single uniform against the running cumulative sum of the
/// max-shifted weights. Dead particles (`-inf`) can never be selected as
/// long as at least one finite weight exists.
///
/// # Panics
/// Panics if `lws` is empty.
pub fn multinomial(rng: &mut StdRng, lws: ArrayView1<f64>) -> usize {
    assert!(!lws.is_empty(), "multinomial draw over an empty weight vector");

    let mx = lws.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let total: f64 = lws.iter().map(|&v| (v - mx).exp()).sum();
    let u = rng.gen::<f64>() * total;

    let mut acc = 0.0;
    let mut last = 0;
    for (i, &lw) in lws.iter().enumerate() {
        let w = (lw - mx).exp();
        if w > 0.0 {
            last = i;
            acc += w;
            if u < acc {
                return i;
            }
        }
    }
    // Rounding pushed u past the final cumulative value; return the last
    // live particle.
    last
}
