//! Resampling interface and the shared ancestry machinery.
//!
//! Purpose
//! -------
//! Define the resampler contract the filter driver drives, plus the
//! bookkeeping every implementation shares: weight normalization, identity
//! ancestries, the self-slot ancestry permutation, and the in-place row
//! gather over the state matrix.
//!
//! Key behaviors
//! -------------
//! - [`normalise`] rescales log-weights so their exponentials sum to the
//!   particle count. Under that convention the "log mean weight" written
//!   after a resample is exactly 0, and the driver's incremental
//!   log-likelihood telescopes without correction terms.
//! - [`ancestors_from_offspring`] places every surviving parent at its own
//!   slot and spreads extra copies over the slots of extinct particles.
//!   After that permutation, `gather_rows` can copy rows in place in a
//!   single forward pass: a source row is never a destination.
//! - Conditional resampling pins `ancestors[a_out] = a_in` before the
//!   remaining ancestors are drawn; only ancestor 0 is supported.
//!
//! Ordering
//! --------
//! Ancestry indices produced here refer to particle identities immediately
//! before the resample; the filter records them alongside the permuted
//! state so trajectories can be walked backwards.

use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;

use crate::filter::errors::FilterResult;
use crate::filter::state::State;
use crate::utils::logsumexp;

/// Resampler contract driven by the filter.
///
/// Implementations own any scratch they need; the driver owns the weight
/// and ancestry vectors and the state matrix.
pub trait Resampler {
    /// Should the driver resample given the current log-weights?
    fn is_triggered(&self, lws: ArrayView1<f64>) -> bool;

    /// Does this resampler need the model's maximum observation
    /// log-density before resampling (rejection-style samplers)?
    fn needs_max(&self) -> bool {
        false
    }

    /// Receive the maximum observation log-density. Only called when
    /// [`needs_max`](Resampler::needs_max) returns true.
    fn set_max_log_weight(&mut self, _max_lw: f64) {}

    /// Draw ancestors from the weights, permute the particle rows of `s`
    /// accordingly, and reset `lws` to the common post-resample constant.
    fn resample(
        &mut self, rng: &mut StdRng, lws: &mut Array1<f64>, ancestors: &mut Array1<usize>,
        s: &mut State,
    ) -> FilterResult<()>;

    /// As [`resample`](Resampler::resample), but with the outcome for slot
    /// `a_out` fixed to ancestor `a_in` before the rest are drawn.
    ///
    /// # Errors
    /// [`FilterError::ConditionalAncestorMismatch`] when a pinned ancestor
    /// other than 0 is requested, or the drawn ancestry contradicts the
    /// pin.
    ///
    /// [`FilterError::ConditionalAncestorMismatch`]:
    /// crate::filter::FilterError::ConditionalAncestorMismatch
    fn cond_resample(
        &mut self, rng: &mut StdRng, a_in: usize, a_out: usize, lws: &mut Array1<f64>,
        ancestors: &mut Array1<usize>, s: &mut State,
    ) -> FilterResult<()>;
}

/// Shift log-weights by a common constant so that `Σ exp(lws) = P`.
///
/// The relative weights (the filtering distribution) are unchanged.
/// Applying `normalise` twice is the same as applying it once.
pub fn normalise(lws: &mut Array1<f64>) {
    let shift = (lws.len() as f64).ln() - logsumexp(lws.view());
    lws.mapv_inplace(|v| v + shift);
}

/// Reset the ancestry to the identity map, the state after `init` and
/// after any non-resampling step.
pub fn fill_identity(ancestors: &mut Array1<usize>) {
    for (i, a) in ancestors.iter_mut().enumerate() {
        *a = i;
    }
}

/// Rewrite `ancestors` from per-parent offspring counts so that every
/// parent with offspring occupies its own slot.
///
/// Extra copies of a parent go to the slots of extinct particles, in slot
/// order. The multiset of ancestors is exactly the one described by
/// `offspring`.
///
/// # Panics
/// Debug-asserts that `offspring` sums to the particle count.
pub fn ancestors_from_offspring(offspring: &[usize], ancestors: &mut Array1<usize>) {
    let p = offspring.len();
    debug_assert_eq!(offspring.iter().sum::<usize>(), p, "offspring must sum to P");
    debug_assert_eq!(ancestors.len(), p);

    let free: Vec<usize> = (0..p).filter(|&i| offspring[i] == 0).collect();
    let mut fi = 0;
    for (j, &count) in offspring.iter().enumerate() {
        if count > 0 {
            ancestors[j] = j;
            for _ in 1..count {
                ancestors[free[fi]] = j;
                fi += 1;
            }
        }
    }
}

/// Copy particle rows so that `s[i, :] = s[ancestors[i], :]`.
///
/// Requires the self-slot property established by
/// [`ancestors_from_offspring`]: every row used as a source maps to itself
/// and is therefore never overwritten first.
pub fn gather_rows(s: &mut State, ancestors: ArrayView1<usize>) {
    let mut x = s.dyn_view_mut();
    let n = x.ncols();
    for i in 0..ancestors.len() {
        let a = ancestors[i];
        if a != i {
            for j in 0..n {
                x[[i, j]] = x[[a, j]];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn normalise_makes_exponentials_sum_to_the_particle_count() {
        let mut lws = array![-310.0, -309.0, -312.5, -309.7];
        normalise(&mut lws);
        let total: f64 = lws.iter().map(|&v| v.exp()).sum();
        assert_relative_eq!(total, 4.0, max_relative = 1e-12);
    }

    #[test]
    fn normalise_is_idempotent() {
        let mut once = array![0.3, -1.2, 2.0];
        normalise(&mut once);
        let mut twice = once.clone();
        normalise(&mut twice);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-14);
        }
    }

    #[test]
    fn identity_ancestry_maps_each_particle_to_itself() {
        let mut ancestors = Array1::zeros(5);
        fill_identity(&mut ancestors);
        assert_eq!(ancestors, array![0, 1, 2, 3, 4]);
    }

    #[test]
    fn surviving_parents_keep_their_slots() {
        // Parents 1 and 3 survive with 3 and 2 offspring over P = 5.
        let offspring = [0usize, 3, 0, 2, 0];
        let mut ancestors = Array1::zeros(5);
        ancestors_from_offspring(&offspring, &mut ancestors);
        assert_eq!(ancestors[1], 1);
        assert_eq!(ancestors[3], 3);
        // Descendant counts match the offspring vector.
        for (j, &count) in offspring.iter().enumerate() {
            let got = ancestors.iter().filter(|&&a| a == j).count();
            assert_eq!(got, count, "parent {j}");
        }
    }

    #[test]
    fn gather_preserves_source_rows_and_copies_the_rest() {
        let mut s = State::new(4, 2, 0);
        for i in 0..4 {
            s.dyn_matrix_mut().set(i, 0, i as f64);
            s.dyn_matrix_mut().set(i, 1, 10.0 + i as f64);
        }
        let offspring = [2usize, 0, 2, 0];
        let mut ancestors = Array1::zeros(4);
        ancestors_from_offspring(&offspring, &mut ancestors);
        gather_rows(&mut s, ancestors.view());
        for i in 0..4 {
            let a = ancestors[i];
            assert_eq!(s.dyn_matrix().get(i, 0), a as f64);
            assert_eq!(s.dyn_matrix().get(i, 1), 10.0 + a as f64);
        }
    }
}
