//! RK4(3)5\[2R+\]C low-storage Runge–Kutta integrator.
//!
//! Purpose
//! -------
//! Advance every particle's dynamic state over a time interval `[t1, t2]`
//! with the five-stage, order-4(3) embedded pair of Kennedy, Carpenter &
//! Lewis (2000) in its 2R+ low-storage form: two register vectors `r1`/`r2`
//! carry the running solution and the in-progress stage value, one `err`
//! vector accumulates the embedded error, and `old` holds the last accepted
//! state for rejection rollback.
//!
//! Key behaviors
//! -------------
//! - Per-particle adaptive stepping: weighted-RMS error test, PI step-size
//!   controller with Lund stabilization, growth clamped to
//!   `[facl, facr]`, final-interval clamp so the last step lands exactly on
//!   `t2`.
//! - Fork–join parallelism across the particle axis; particles share no
//!   mutable state, so the model's `derivatives` callback must be `Sync`
//!   and is invoked concurrently.
//! - Failure is silent per particle: a NaN stage contaminates the error
//!   norm, the step is rejected, and the step budget eventually runs out
//!   with the particle left at its last accepted state. `integrate` always
//!   returns normally.
//!
//! Invariants
//! ----------
//! - `h > 0` while `t < t2`; rejection never advances `t`.
//! - `old` equals the last accepted state at all times; the row written
//!   back to the state matrix is the last accepted state when the budget is
//!   exhausted and the `t2` state otherwise.
//! - The RNG is never consumed here; stochastic model behavior belongs in
//!   the simulator's transition hook.

use ndarray::parallel::prelude::*;
use ndarray::{Array1, ArrayView1, ArrayViewMut1, ArrayViewMut2, Axis};

use crate::model::Model;
use crate::ode::tuning::IntegratorTuning;

// Butcher coefficients for RK4(3)5[2R+]C, Kennedy, Carpenter & Lewis
// (2000). The A matrix of a 2R scheme is (b1 .. b_{i-2}, a_{i,i-1}) per
// row, which is what lets two registers carry the whole update.
const A21: f64 = 970286171893.0 / 4311952581923.0;
const A32: f64 = 6584761158862.0 / 12103376702013.0;
const A43: f64 = 2251764453980.0 / 15575788980749.0;
const A54: f64 = 26877169314380.0 / 34165994151039.0;

const B1: f64 = 1153189308089.0 / 22510343858157.0;
const B2: f64 = 1772645290293.0 / 4653164025191.0;
const B3: f64 = -1672844663538.0 / 4480602732383.0;
const B4: f64 = 2114624349019.0 / 3568978502595.0;
const B5: f64 = 5198255086312.0 / 14908931495163.0;

// Embedded third-order weights; the error accumulator carries b - bhat.
const BHAT1: f64 = 1016888040809.0 / 7410784769900.0;
const BHAT2: f64 = 11231460423587.0 / 58533540763752.0;
const BHAT3: f64 = -1563879915014.0 / 6823010717585.0;
const BHAT4: f64 = 606302364029.0 / 971179775848.0;
const BHAT5: f64 = 1097981568119.0 / 3980877426909.0;

const E1: f64 = B1 - BHAT1;
const E2: f64 = B2 - BHAT2;
const E3: f64 = B3 - BHAT3;
const E4: f64 = B4 - BHAT4;
const E5: f64 = B5 - BHAT5;

// Nodes are the A-matrix row sums.
const C2: f64 = A21;
const C3: f64 = B1 + A32;
const C4: f64 = B1 + B2 + A43;
const C5: f64 = B1 + B2 + B3 + A54;

/// Adaptive RK4(3)5\[2R+\]C integrator over a particle state matrix.
#[derive(Debug, Clone)]
pub struct Rk43 {
    tuning: IntegratorTuning,
}

impl Rk43 {
    /// Build an integrator around a fixed set of tuning constants.
    pub fn new(tuning: IntegratorTuning) -> Self {
        Rk43 { tuning }
    }

    /// The tuning constants this integrator runs with.
    pub fn tuning(&self) -> &IntegratorTuning {
        &self.tuning
    }

    /// Advance every row of `x` (one particle per row) from `t1` to `t2`,
    /// mutating `x` in place.
    ///
    /// `theta` is the read-only parameter vector shared by all particles.
    /// Particles are mutually independent for the duration of the call and
    /// are scheduled fork–join across threads; the join at the end of this
    /// function is the only synchronization point.
    ///
    /// Integration failure is silent per particle: the affected row is left
    /// at its last accepted state once `nsteps` attempts have been spent.
    ///
    /// # Panics
    /// Panics unless `t1 < t2`.
    pub fn integrate<M: Model>(
        &self, model: &M, theta: ArrayView1<f64>, t1: f64, t2: f64, mut x: ArrayViewMut2<f64>,
    ) {
        assert!(t1 < t2, "integration interval must satisfy t1 < t2");

        let tuning = &self.tuning;
        x.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(p, row)| advance_particle(model, tuning, theta, t1, t2, p, row));
    }
}

/// Integrate a single particle row over `[t1, t2]`.
///
/// Scratch is five length-N vectors allocated once per particle per
/// interval: the two 2R registers, the error accumulator, the rollback
/// state, and the derivative buffer the model callback fills. Nothing is
/// allocated inside the step loop.
fn advance_particle<M: Model>(
    model: &M, tuning: &IntegratorTuning, theta: ArrayView1<f64>, t1: f64, t2: f64, p: usize,
    mut x: ArrayViewMut1<f64>,
) {
    let n = x.len();
    let mut r1: Array1<f64> = x.to_owned();
    let mut r2: Array1<f64> = Array1::zeros(n);
    let mut err: Array1<f64> = Array1::zeros(n);
    let mut dx: Array1<f64> = Array1::zeros(n);
    let mut old: Array1<f64> = r1.clone();

    let mut t = t1;
    let mut h = tuning.h0();
    let mut logfacold = 1.0e-4_f64.ln();
    let mut steps = 0usize;

    while t < t2 && steps < tuning.nsteps() {
        if 0.1 * h.abs() <= t.abs() * tuning.uround() {
            // Step size has fallen below the round-off floor for this t.
            // There is no recovery path; the step proceeds as clamped below
            // and the caller accepts whatever divergence follows.
        }
        if t + 1.01 * h - t2 > 0.0 {
            h = t2 - t;
            if h <= 0.0 {
                t = t2;
                break;
            }
        }

        // Five stages. Each evaluates the derivative at the stage value
        // committed by the previous one and rewrites both registers from
        // the running b-weighted sum, alternating which register carries
        // the next stage value.
        model.derivatives(t, p, theta, r1.view(), dx.view_mut());
        for i in 0..n {
            let f = dx[i];
            err[i] = E1 * f;
            r2[i] = r1[i] + h * (B1 * f);
            r1[i] += h * (A21 * f);
        }

        model.derivatives(t + C2 * h, p, theta, r1.view(), dx.view_mut());
        for i in 0..n {
            let f = dx[i];
            err[i] += E2 * f;
            let s = r2[i];
            r1[i] = s + h * (B2 * f);
            r2[i] = s + h * (A32 * f);
        }

        model.derivatives(t + C3 * h, p, theta, r2.view(), dx.view_mut());
        for i in 0..n {
            let f = dx[i];
            err[i] += E3 * f;
            let s = r1[i];
            r2[i] = s + h * (B3 * f);
            r1[i] = s + h * (A43 * f);
        }

        model.derivatives(t + C4 * h, p, theta, r1.view(), dx.view_mut());
        for i in 0..n {
            let f = dx[i];
            err[i] += E4 * f;
            let s = r2[i];
            r1[i] = s + h * (B4 * f);
            r2[i] = s + h * (A54 * f);
        }

        model.derivatives(t + C5 * h, p, theta, r2.view(), dx.view_mut());
        for i in 0..n {
            let f = dx[i];
            err[i] += E5 * f;
            r1[i] += h * (B5 * f);
        }

        // Weighted RMS error of the embedded pair. NaN anywhere makes e2
        // NaN, which fails the acceptance test below.
        let mut e2 = 0.0;
        for i in 0..n {
            let sk = tuning.atoler() + tuning.rtoler() * old[i].abs().max(r1[i].abs());
            let e = err[i] * h / sk;
            e2 += e * e;
        }
        e2 /= n as f64;

        let accepted = e2 <= 1.0;
        if accepted {
            t += h;
            if t < t2 {
                old.assign(&r1);
            }
        } else {
            r1.assign(&old);
        }

        if t < t2 {
            let logfac11 = tuning.expo() * e2.ln();
            if !accepted {
                h *= tuning.facl().max((tuning.logsafe() - logfac11).exp());
            } else {
                // Lund stabilization: blend in the previous error before
                // bounding the growth factor.
                let fac = (tuning.beta() * logfacold + tuning.logsafe() - logfac11).exp();
                h *= tuning.facr().min(tuning.facl().max(fac));
                logfacold = 0.5 * e2.max(1.0e-8).ln();
            }
        }

        steps += 1;
    }

    x.assign(&r1);
}
