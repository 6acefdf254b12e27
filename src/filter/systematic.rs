//! Systematic resampler with an ESS trigger.
//!
//! One uniform draw per resample: ancestor counts come from sweeping the
//! evenly spaced positions `(k + u) / P` through the normalized cumulative
//! weights. Low variance, O(P), and the single RNG consumption point keeps
//! conditional and unconditional runs on the same stream shape.
//!
//! The trigger is relative ESS: resample when `ess(lws) < ess_rel · P`.
//! `ess_rel = 0` never triggers and `ess_rel = 1` triggers at every
//! observation whose corrected weights are not exactly uniform.

use ndarray::{Array1, ArrayView1};
use rand::{rngs::StdRng, Rng};

use crate::filter::errors::{FilterError, FilterResult};
use crate::filter::resample::{ancestors_from_offspring, gather_rows, Resampler};
use crate::filter::state::State;
use crate::utils::ess;

/// ESS-triggered systematic resampler.
#[derive(Debug, Clone)]
pub struct SystematicResampler {
    ess_rel: f64,
}

impl SystematicResampler {
    /// Build a resampler triggering below the given relative ESS.
    ///
    /// The filter options validate the range; out-of-range values here are
    /// a programmer error.
    pub fn new(ess_rel: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&ess_rel));
        SystematicResampler { ess_rel }
    }

    /// Relative ESS threshold.
    pub fn ess_rel(&self) -> f64 {
        self.ess_rel
    }
}

impl Resampler for SystematicResampler {
    fn is_triggered(&self, lws: ArrayView1<f64>) -> bool {
        ess(lws) < self.ess_rel * lws.len() as f64
    }

    fn resample(
        &mut self, rng: &mut StdRng, lws: &mut Array1<f64>, ancestors: &mut Array1<usize>,
        s: &mut State,
    ) -> FilterResult<()> {
        let p = lws.len();
        let mut offspring = vec![0usize; p];
        systematic_offspring(rng, lws.view(), p, &mut offspring);
        ancestors_from_offspring(&offspring, ancestors);
        gather_rows(s, ancestors.view());
        // All particles now carry the common weight: log of the mean
        // weight, which is 0 under the sum-to-P normalization.
        lws.fill(0.0);
        Ok(())
    }

    fn cond_resample(
        &mut self, rng: &mut StdRng, a_in: usize, a_out: usize, lws: &mut Array1<f64>,
        ancestors: &mut Array1<usize>, s: &mut State,
    ) -> FilterResult<()> {
        if a_in != 0 || a_out != 0 {
            return Err(FilterError::ConditionalAncestorMismatch {
                expected: 0,
                actual: a_in.max(a_out),
            });
        }
        let p = lws.len();
        let mut offspring = vec![0usize; p];
        // One slot is pinned; the remaining P - 1 ancestors are drawn from
        // the full weight vector.
        systematic_offspring(rng, lws.view(), p - 1, &mut offspring);
        offspring[a_in] += 1;
        ancestors_from_offspring(&offspring, ancestors);
        if ancestors[a_out] != a_in {
            return Err(FilterError::ConditionalAncestorMismatch {
                expected: a_in,
                actual: ancestors[a_out],
            });
        }
        gather_rows(s, ancestors.view());
        lws.fill(0.0);
        Ok(())
    }
}

/// Systematic offspring counts: `n_draws` ancestors distributed over the
/// weights `exp(lws)` with a single uniform.
///
/// Dead particles (`-inf`) receive no offspring. Rounding shortfalls at the
/// top of the cumulative sweep are assigned to the last live particle so
/// the counts always sum to `n_draws`.
fn systematic_offspring(
    rng: &mut StdRng, lws: ArrayView1<f64>, n_draws: usize, offspring: &mut [usize],
) {
    offspring.fill(0);
    if n_draws == 0 {
        return;
    }

    let mx = lws.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let total: f64 = lws.iter().map(|&v| (v - mx).exp()).sum();
    let u = rng.gen::<f64>();

    let mut cum = 0.0;
    let mut assigned = 0usize;
    let mut last_live = None;
    for (j, &lw) in lws.iter().enumerate() {
        let w = (lw - mx).exp();
        if w <= 0.0 {
            continue;
        }
        last_live = Some(j);
        cum += w;
        // Positions k + u with k in 0..n_draws that fall below the scaled
        // cumulative weight.
        let bound = cum / total * n_draws as f64;
        let below = ((bound - u).ceil().max(0.0) as usize).min(n_draws);
        offspring[j] = below - assigned;
        assigned = below;
    }
    if assigned < n_draws {
        if let Some(j) = last_live {
            offspring[j] += n_draws - assigned;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::resample::normalise;
    use ndarray::array;
    use rand::SeedableRng;

    // ------------------------------------------------------------------
    // Scope
    // -----
    // - Trigger edges (0 never fires, 1 fires on any non-uniform weights).
    // - Offspring counts: sum, weight proportionality, exclusion of dead
    //   particles.
    // - Post-resample invariants: zero weight variance, descendant counts,
    //   conditional pin and its restriction to ancestor 0.
    // ------------------------------------------------------------------

    fn counting_state(p: usize) -> State {
        let mut s = State::new(p, 1, 0);
        for i in 0..p {
            s.dyn_matrix_mut().set(i, 0, i as f64);
        }
        s
    }

    #[test]
    fn zero_threshold_never_triggers() {
        let r = SystematicResampler::new(0.0);
        let lws = array![0.0, -50.0, -100.0];
        assert!(!r.is_triggered(lws.view()));
    }

    #[test]
    fn unit_threshold_triggers_on_any_non_uniform_weights() {
        let r = SystematicResampler::new(1.0);
        assert!(r.is_triggered(array![0.0, -0.1, 0.0].view()));
        assert!(!r.is_triggered(array![-1.0, -1.0, -1.0].view()));
    }

    #[test]
    fn offspring_counts_sum_to_the_number_of_draws() {
        let lws = array![0.0, 1.0, -2.0, 0.5, -0.5];
        let mut rng = StdRng::seed_from_u64(3);
        let mut offspring = vec![0usize; 5];
        systematic_offspring(&mut rng, lws.view(), 5, &mut offspring);
        assert_eq!(offspring.iter().sum::<usize>(), 5);
    }

    #[test]
    fn dominant_weight_takes_almost_all_offspring() {
        let mut lws = Array1::from_elem(8, -30.0);
        lws[5] = 0.0;
        let mut rng = StdRng::seed_from_u64(17);
        let mut offspring = vec![0usize; 8];
        systematic_offspring(&mut rng, lws.view(), 8, &mut offspring);
        assert_eq!(offspring[5], 8);
    }

    #[test]
    fn dead_particles_receive_no_offspring() {
        let lws = array![f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY, 0.0];
        let mut rng = StdRng::seed_from_u64(23);
        let mut offspring = vec![0usize; 4];
        systematic_offspring(&mut rng, lws.view(), 4, &mut offspring);
        assert_eq!(offspring[0], 0);
        assert_eq!(offspring[2], 0);
        assert_eq!(offspring[1] + offspring[3], 4);
    }

    #[test]
    fn resample_zeroes_weight_variance_and_permutes_rows_consistently() {
        let p = 16;
        let mut s = counting_state(p);
        let mut lws = Array1::from_shape_fn(p, |i| -0.25 * i as f64);
        normalise(&mut lws);
        let mut ancestors = Array1::zeros(p);
        let mut r = SystematicResampler::new(1.0);
        let mut rng = StdRng::seed_from_u64(7);
        r.resample(&mut rng, &mut lws, &mut ancestors, &mut s).unwrap();

        assert!(lws.iter().all(|&v| v == 0.0), "weights must be the common constant");
        for i in 0..p {
            assert_eq!(s.dyn_matrix().get(i, 0), ancestors[i] as f64);
        }
        assert_eq!(ancestors.iter().filter(|&&a| a >= p).count(), 0);
    }

    #[test]
    fn conditional_resample_pins_particle_zero_to_itself() {
        let p = 8;
        let mut s = counting_state(p);
        // Particle 0 is nearly dead; the pin must survive anyway.
        let mut lws = Array1::from_elem(p, 0.0);
        lws[0] = -40.0;
        let mut ancestors = Array1::zeros(p);
        let mut r = SystematicResampler::new(1.0);
        let mut rng = StdRng::seed_from_u64(13);
        r.cond_resample(&mut rng, 0, 0, &mut lws, &mut ancestors, &mut s).unwrap();
        assert_eq!(ancestors[0], 0);
        assert_eq!(s.dyn_matrix().get(0, 0), 0.0);
    }

    #[test]
    fn conditional_resample_rejects_nonzero_ancestors() {
        let mut s = counting_state(4);
        let mut lws = Array1::zeros(4);
        let mut ancestors = Array1::zeros(4);
        let mut r = SystematicResampler::new(1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let err = r.cond_resample(&mut rng, 2, 2, &mut lws, &mut ancestors, &mut s).unwrap_err();
        assert!(matches!(err, FilterError::ConditionalAncestorMismatch { actual: 2, .. }));
    }
}
