//! Reference linear-Gaussian state-space model.
//!
//! Scalar latent state with autoregressive dynamics and direct Gaussian
//! observation:
//!
//! - initial state: `x₀ ~ N(prior_mean, prior_sd²)`
//! - transition:    `x' = a·x + q·w`, `w ~ N(0, 1)`, applied once per
//!   advancement interval (the model is written for unit-spaced schedules;
//!   the ODE drift is zero and all dynamics live in the transition hook)
//! - observation:   `y = x + v`, `v ~ N(0, r²)`
//!
//! The parameter vector is `theta = [a, q, r]`. Setting `q = 0` makes the
//! dynamics deterministic, which the test-suite uses to reduce the filter
//! to single-trajectory importance sampling.
//!
//! This model doubles as the implementation template for user models: it
//! shows where each hook runs and which one is allowed to consume the RNG.
//! Because it admits an exact Kalman recursion, it also anchors the
//! end-to-end likelihood tests.

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1};
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use statrs::distribution::{Continuous, Normal, NormalError};

use crate::model::{Model, ObsMask};

/// Scalar AR(1) dynamics with Gaussian observations; see the module docs
/// for the `theta = [a, q, r]` layout.
#[derive(Debug, Clone)]
pub struct LinearGaussianModel {
    prior: Normal,
    std_normal: Normal,
}

impl LinearGaussianModel {
    /// Build the model with the given initial-state prior.
    ///
    /// # Errors
    /// Returns the underlying distribution error when `prior_sd` is not a
    /// valid standard deviation.
    pub fn new(prior_mean: f64, prior_sd: f64) -> Result<Self, NormalError> {
        Ok(LinearGaussianModel {
            prior: Normal::new(prior_mean, prior_sd)?,
            std_normal: Normal::new(0.0, 1.0)?,
        })
    }

    /// Log-density of one scalar observation `y` given latent `x`, with
    /// observation standard deviation `r`.
    ///
    /// An invalid `r` yields `-inf`: the observation is impossible rather
    /// than an error, matching the engine's soft-signal convention.
    fn obs_ln_pdf(&self, y: f64, x: f64, r: f64) -> f64 {
        if !(r.is_finite() && r > 0.0) {
            return f64::NEG_INFINITY;
        }
        self.std_normal.ln_pdf((y - x) / r) - r.ln()
    }
}

impl Model for LinearGaussianModel {
    fn num_vars(&self) -> usize {
        1
    }

    fn num_params(&self) -> usize {
        3
    }

    fn init(&self, rng: &mut StdRng, _t: f64, _theta: ArrayView1<f64>, mut x: ArrayViewMut1<f64>) {
        for v in x.iter_mut() {
            *v = self.prior.sample(rng);
        }
    }

    fn derivatives(
        &self, _t: f64, _p: usize, _theta: ArrayView1<f64>, _x: ArrayView1<f64>,
        mut dxdt: ArrayViewMut1<f64>,
    ) {
        // Purely discrete-time dynamics; the integrator sees a constant
        // state between schedule points.
        dxdt.fill(0.0);
    }

    fn transition(
        &self, rng: &mut StdRng, _t1: f64, _t2: f64, _p: usize, theta: ArrayView1<f64>,
        mut x: ArrayViewMut1<f64>,
    ) {
        let a = theta[0];
        let q = theta[1];
        let mut next = a * x[0];
        if q > 0.0 {
            next += q * self.std_normal.sample(rng);
        }
        x[0] = next;
    }

    fn observation_log_densities(
        &self, theta: ArrayView1<f64>, x: ArrayView2<f64>, mask: &ObsMask,
        mut lws: ArrayViewMut1<f64>,
    ) {
        let r = theta[2];
        for p in 0..x.nrows() {
            let mut acc = 0.0;
            for k in 0..mask.len() {
                acc += self.obs_ln_pdf(mask.value(k), x[[p, mask.component(k)]], r);
            }
            lws[p] += acc;
        }
    }

    fn observation_max_log_density(
        &self, theta: ArrayView1<f64>, _x: ArrayView2<f64>, mask: &ObsMask,
    ) -> f64 {
        let r = theta[2];
        if !(r.is_finite() && r > 0.0) {
            return f64::NEG_INFINITY;
        }
        // Each component's density peaks at x = y.
        mask.len() as f64 * (self.std_normal.ln_pdf(0.0) - r.ln())
    }
}
