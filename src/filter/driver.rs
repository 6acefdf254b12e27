//! Particle filter driver.
//!
//! Purpose
//! -------
//! Run the sequential Monte Carlo state machine over a schedule:
//!
//! ```text
//! init -> correct -> output -> { resample -> predict+ -> correct -> output }*
//! ```
//!
//! maintaining log-weights and ancestries, accumulating the marginal
//! log-likelihood estimate, and recording every output step through the
//! output buffer. The conditional (Andrieu–Doucet–Holenstein) variant pins
//! particle 0 to a reference trajectory and is the Gibbs kernel used inside
//! particle MCMC.
//!
//! Key behaviors
//! -------------
//! - Within one step the observable order is fixed: resample, then one or
//!   more predicts (skipping schedule elements without output), then
//!   correct, then output. Across steps, schedule order is strict.
//! - The incremental log-likelihood at an observation is
//!   `logsumexp(lws) − log P`; summed over observations it is the standard
//!   unbiased estimator `Π_t mean_p w_{t,p}` because non-resampling steps
//!   renormalize the weights to sum to `P` and resampling steps reset them
//!   to the common constant.
//! - The driver owns the weight and ancestry vectors and the
//!   log-likelihood accumulator; the caller owns the state and passes it
//!   by mutable reference.
//! - The RNG is consumed by the simulator and resampler through the
//!   driver's calls only; the integrator underneath never sees it.
//!
//! Errors
//! ------
//! A correction step whose weights collapse entirely to `-inf` aborts the
//! run with [`FilterError::Degenerate`]; the output recorded so far is
//! preserved. Everything the integrator cannot do is a soft signal and
//! shows up only as a degraded estimate.

use log::{debug, warn};
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;

use crate::filter::errors::{FilterError, FilterResult};
use crate::filter::output::OutputBuffer;
use crate::model::Model;
use crate::filter::resample::{fill_identity, normalise, Resampler};
use crate::filter::schedule::{Schedule, ScheduleElement};
use crate::filter::state::State;
use crate::matrix::HostMatrix;
use crate::sim::Simulator;
use crate::utils::{logsumexp, multinomial};

/// Sequential Monte Carlo driver over a simulator, a resampler, and an
/// output buffer.
#[derive(Debug)]
pub struct ParticleFilter<S, R, O>
where
    S: Simulator,
    R: Resampler,
    O: OutputBuffer,
{
    sim: S,
    resam: R,
    out: O,
}

impl<S, R, O> ParticleFilter<S, R, O>
where
    S: Simulator,
    R: Resampler,
    O: OutputBuffer,
{
    /// Assemble a filter from its collaborators.
    pub fn new(sim: S, resam: R, out: O) -> Self {
        ParticleFilter { sim, resam, out }
    }

    /// The simulator.
    pub fn simulator(&self) -> &S {
        &self.sim
    }

    /// The resampler.
    pub fn resampler(&self) -> &R {
        &self.resam
    }

    /// The output buffer.
    pub fn output_buffer(&self) -> &O {
        &self.out
    }

    /// Tear down into the output buffer, for consumers that want to keep
    /// the recorded run.
    pub fn into_output(self) -> O {
        self.out
    }

    // ---- High-level interface ---------------------------------------------

    /// Filter forward over the whole schedule, drawing initial states from
    /// the model prior or from `in_init`.
    ///
    /// Returns the marginal log-likelihood estimate.
    pub fn filter(
        &mut self, rng: &mut StdRng, schedule: &Schedule, s: &mut State,
        in_init: Option<&HostMatrix>,
    ) -> FilterResult<f64> {
        debug!("filter: {} particles over {} schedule points", s.size(), schedule.len());
        let mut lws = Array1::<f64>::zeros(s.size());
        let mut ancestors = Array1::<usize>::zeros(s.size());
        let mut iter = 0usize;

        let first = *schedule.element(0);
        self.init(rng, first, s, &mut lws, &mut ancestors, in_init);
        self.output0(s);
        let mut ll = self.correct(first, s, &mut lws)?;
        self.output(first, s, false, &lws, &ancestors);
        while iter + 1 < schedule.len() {
            ll += self.step(rng, &mut iter, schedule, s, &mut lws, &mut ancestors)?;
        }
        self.term();
        self.output_t(ll);

        Ok(ll)
    }

    /// Filter forward with fixed parameters.
    ///
    /// Identical to [`filter`](ParticleFilter::filter) apart from the
    /// `init_with` call that installs `theta` before the prior draw.
    pub fn filter_with_params(
        &mut self, rng: &mut StdRng, schedule: &Schedule, theta: ArrayView1<f64>, s: &mut State,
    ) -> FilterResult<f64> {
        debug!(
            "filter (fixed parameters): {} particles over {} schedule points",
            s.size(),
            schedule.len()
        );
        let mut lws = Array1::<f64>::zeros(s.size());
        let mut ancestors = Array1::<usize>::zeros(s.size());
        let mut iter = 0usize;

        let first = *schedule.element(0);
        self.init_with(rng, theta, first, s, &mut lws, &mut ancestors);
        self.output0(s);
        let mut ll = self.correct(first, s, &mut lws)?;
        self.output(first, s, false, &lws, &ancestors);
        while iter + 1 < schedule.len() {
            ll += self.step(rng, &mut iter, schedule, s, &mut lws, &mut ancestors)?;
        }
        self.term();
        self.output_t(ll);

        Ok(ll)
    }

    /// Filter forward conditioned on a reference trajectory.
    ///
    /// `x_ref` has one column per output index (variables × output steps);
    /// particle 0's dynamic state is overwritten with the matching column
    /// after initialization and after every predict, and resampling pins
    /// its ancestor to 0. This is the conditional particle filter of
    /// Andrieu, Doucet & Holenstein (2010).
    pub fn filter_conditioned(
        &mut self, rng: &mut StdRng, schedule: &Schedule, theta: ArrayView1<f64>, s: &mut State,
        x_ref: &HostMatrix,
    ) -> FilterResult<f64> {
        debug!(
            "conditional filter: {} particles over {} schedule points",
            s.size(),
            schedule.len()
        );
        let mut lws = Array1::<f64>::zeros(s.size());
        let mut ancestors = Array1::<usize>::zeros(s.size());
        let mut iter = 0usize;

        let first = *schedule.element(0);
        self.init_with(rng, theta, first, s, &mut lws, &mut ancestors);
        pin_reference(s, x_ref, first);
        self.output0(s);
        let mut ll = self.correct(first, s, &mut lws)?;
        self.output(first, s, false, &lws, &ancestors);
        while iter + 1 < schedule.len() {
            ll += self.step_conditioned(rng, &mut iter, schedule, s, x_ref, &mut lws, &mut ancestors)?;
        }
        self.term();
        self.output_t(ll);

        Ok(ll)
    }

    /// Sample one trajectory from the recorded filtering run: a multinomial
    /// draw over the final log-weights followed by a backward ancestry
    /// walk. `x` is resized to variables × output steps.
    ///
    /// # Errors
    /// [`FilterError::NoRecordedOutput`] when no run has been recorded.
    pub fn sample_trajectory(&mut self, rng: &mut StdRng, x: &mut HostMatrix) -> FilterResult<()> {
        let p = {
            let lws = self.out.final_log_weights().ok_or(FilterError::NoRecordedOutput)?;
            multinomial(rng, lws)
        };
        self.out.read_trajectory(p, x)
    }

    // ---- Low-level interface ----------------------------------------------

    /// Initialise a run: delegate the state draw to the simulator, zero the
    /// log-weights, reset the ancestry to identity, and clear the output.
    pub fn init(
        &mut self, rng: &mut StdRng, now: ScheduleElement, s: &mut State, lws: &mut Array1<f64>,
        ancestors: &mut Array1<usize>, in_init: Option<&HostMatrix>,
    ) {
        self.sim.init(rng, &now, s, in_init);
        lws.fill(0.0);
        fill_identity(ancestors);
        self.out.clear();
    }

    /// Initialise a run with fixed parameters.
    pub fn init_with(
        &mut self, rng: &mut StdRng, theta: ArrayView1<f64>, now: ScheduleElement, s: &mut State,
        lws: &mut Array1<f64>, ancestors: &mut Array1<usize>,
    ) {
        self.sim.init_with(rng, theta, &now, s);
        lws.fill(0.0);
        fill_identity(ancestors);
        self.out.clear();
    }

    /// Resample, predict to the next output point, correct, and write
    /// output. Advances `iter` past every intermediate schedule element.
    ///
    /// Returns the incremental log-likelihood of the correction.
    pub fn step(
        &mut self, rng: &mut StdRng, iter: &mut usize, schedule: &Schedule, s: &mut State,
        lws: &mut Array1<f64>, ancestors: &mut Array1<usize>,
    ) -> FilterResult<f64> {
        let r = self.resample(rng, *schedule.element(*iter), s, lws, ancestors)?;
        loop {
            *iter += 1;
            self.predict(rng, *schedule.element(*iter), s);
            if *iter + 1 == schedule.len() || schedule.element(*iter).has_output {
                break;
            }
        }
        let now = *schedule.element(*iter);
        let ll = self.correct(now, s, lws)?;
        debug!("step to t = {}: ll increment {ll}", now.time);
        self.output(now, s, r, lws, ancestors);

        Ok(ll)
    }

    /// As [`step`](ParticleFilter::step), with particle 0 re-pinned to the
    /// reference trajectory after prediction and the resample conditioned
    /// on ancestor 0.
    pub fn step_conditioned(
        &mut self, rng: &mut StdRng, iter: &mut usize, schedule: &Schedule, s: &mut State,
        x_ref: &HostMatrix, lws: &mut Array1<f64>, ancestors: &mut Array1<usize>,
    ) -> FilterResult<f64> {
        let r = self.resample_conditioned(rng, *schedule.element(*iter), s, lws, ancestors)?;
        loop {
            *iter += 1;
            self.predict(rng, *schedule.element(*iter), s);
            if *iter + 1 == schedule.len() || schedule.element(*iter).has_output {
                break;
            }
        }
        let now = *schedule.element(*iter);
        pin_reference(s, x_ref, now);
        let ll = self.correct(now, s, lws)?;
        self.output(now, s, r, lws, ancestors);

        Ok(ll)
    }

    /// Advance the state to `next.time` through the simulator.
    pub fn predict(&mut self, rng: &mut StdRng, next: ScheduleElement, s: &mut State) {
        self.sim.advance(rng, &next, s);
    }

    /// Update the log-weights with the observation at `now`, if any.
    ///
    /// Returns the incremental log-likelihood `logsumexp(lws) − log P`, or
    /// 0 when `now` carries no observation (the weights are untouched).
    ///
    /// # Errors
    /// [`FilterError::Degenerate`] when every weight is `-inf` afterwards.
    pub fn correct(
        &mut self, now: ScheduleElement, s: &State, lws: &mut Array1<f64>,
    ) -> FilterResult<f64> {
        if !now.has_obs {
            return Ok(0.0);
        }
        let mask = self.sim.obs().mask(now.index_obs);
        self.sim.model().observation_log_densities(s.params(), s.dyn_view(), mask, lws.view_mut());
        let lse = logsumexp(lws.view());
        if lse == f64::NEG_INFINITY {
            warn!("all log-weights collapsed at observation {}", now.index_obs);
            return Err(FilterError::Degenerate { index_obs: now.index_obs });
        }
        Ok(lse - (s.size() as f64).ln())
    }

    /// Resample if `now` carries an observation and the trigger fires;
    /// otherwise reset the ancestry to identity and renormalize the
    /// weights.
    ///
    /// Returns whether resampling was performed.
    pub fn resample(
        &mut self, rng: &mut StdRng, now: ScheduleElement, s: &mut State, lws: &mut Array1<f64>,
        ancestors: &mut Array1<usize>,
    ) -> FilterResult<bool> {
        let triggered = now.has_obs && self.resam.is_triggered(lws.view());
        if triggered {
            if self.resam.needs_max() {
                let max_lw = {
                    let mask = self.sim.obs().mask(now.index_obs);
                    self.sim.model().observation_max_log_density(s.params(), s.dyn_view(), mask)
                };
                self.resam.set_max_log_weight(max_lw);
            }
            debug!("resampling at t = {} (observation {})", now.time, now.index_obs);
            self.resam.resample(rng, lws, ancestors, s)?;
        } else {
            fill_identity(ancestors);
            normalise(lws);
        }
        Ok(triggered)
    }

    /// As [`resample`](ParticleFilter::resample), with the first
    /// particle's ancestor pinned to 0.
    pub fn resample_conditioned(
        &mut self, rng: &mut StdRng, now: ScheduleElement, s: &mut State, lws: &mut Array1<f64>,
        ancestors: &mut Array1<usize>,
    ) -> FilterResult<bool> {
        let triggered = now.has_obs && self.resam.is_triggered(lws.view());
        if triggered {
            if self.resam.needs_max() {
                let max_lw = {
                    let mask = self.sim.obs().mask(now.index_obs);
                    self.sim.model().observation_max_log_density(s.params(), s.dyn_view(), mask)
                };
                self.resam.set_max_log_weight(max_lw);
            }
            debug!("conditional resampling at t = {} (observation {})", now.time, now.index_obs);
            self.resam.cond_resample(rng, 0, 0, lws, ancestors, s)?;
        } else {
            fill_identity(ancestors);
            normalise(lws);
        }
        Ok(triggered)
    }

    /// Record the shared parameter vector.
    pub fn output0(&mut self, s: &State) {
        self.out.write_parameters(s.params());
    }

    /// Record one output step when `now` carries an output index.
    pub fn output(
        &mut self, now: ScheduleElement, s: &State, r: bool, lws: &Array1<f64>,
        ancestors: &Array1<usize>,
    ) {
        if now.has_output {
            let k = now.index_output;
            self.out.write_time(k, now.time);
            self.out.write_state(k, s.dyn_view(), ancestors.view(), r);
            self.out.write_log_weights(k, lws.view());
        }
    }

    /// Record the marginal log-likelihood estimate.
    pub fn output_t(&mut self, ll: f64) {
        self.out.write_ll(ll);
    }

    /// End the run.
    pub fn term(&mut self) {
        self.sim.term();
    }
}

/// Overwrite particle 0's dynamic state with the reference column for this
/// output index.
fn pin_reference(s: &mut State, x_ref: &HostMatrix, now: ScheduleElement) {
    if now.has_output {
        s.dyn_view_mut().row_mut(0).assign(&x_ref.column(now.index_output));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::output::FilterCache;
    use crate::filter::systematic::SystematicResampler;
    use crate::model::{LinearGaussianModel, ObsStore};
    use crate::ode::{IntegratorTuning, Rk43};
    use crate::sim::OdeSimulator;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1, Array2};
    use rand::SeedableRng;
    use statrs::distribution::{Continuous, Normal};

    // ------------------------------------------------------------------
    // Scope
    // -----
    // - State-machine behavior: no-obs schedules, identity ancestries,
    //   resampling at the ESS edges, output recording.
    // - Log-likelihood identities: importance-sampling reduction at P = 1,
    //   degeneracy detection.
    // - Conditional variant: particle 0 records the reference trajectory.
    // - The needs-max hook reaching the model's density bound.
    //
    // Distributional accuracy against an exact Kalman recursion lives in
    // the integration tests.
    // ------------------------------------------------------------------

    type LgFilter =
        ParticleFilter<OdeSimulator<LinearGaussianModel>, SystematicResampler, FilterCache>;

    fn lg_filter(obs: ObsStore, ess_rel: f64) -> LgFilter {
        let model = LinearGaussianModel::new(0.0, 1.0).unwrap();
        let rk = Rk43::new(IntegratorTuning::new(1e-9, 1e-6, 0.1, 1000).unwrap());
        ParticleFilter::new(
            OdeSimulator::new(model, obs, rk),
            SystematicResampler::new(ess_rel),
            FilterCache::new(),
        )
    }

    fn fixed_init(particles: usize, value: f64) -> HostMatrix {
        let mut x0 = HostMatrix::zeros(particles, 1);
        for i in 0..particles {
            x0.set(i, 0, value);
        }
        x0
    }

    #[test]
    fn correct_without_observation_returns_zero_and_leaves_weights() {
        let mut f = lg_filter(ObsStore::default(), 0.5);
        let schedule = Schedule::from_points(&[], &[0.0, 1.0]).unwrap();
        let mut s = State::new(4, 1, 3);
        s.set_params(array![0.9, 0.0, 1.0].view());
        let mut lws = array![0.1, -0.2, 0.3, 0.0];
        let before = lws.clone();
        let inc = f.correct(*schedule.element(1), &s, &mut lws).unwrap();
        assert_eq!(inc, 0.0);
        assert_eq!(lws, before);
    }

    #[test]
    fn all_missing_observations_give_zero_ll_and_identity_ancestry() {
        let mut f = lg_filter(ObsStore::default(), 1.0);
        let schedule = Schedule::from_points(&[], &[0.0, 1.0, 2.0, 3.0]).unwrap();
        let mut s = State::new(8, 1, 3);
        s.set_params(array![0.9, 0.2, 1.0].view());
        let mut rng = StdRng::seed_from_u64(4);
        let ll = f.filter(&mut rng, &schedule, &mut s, None).unwrap();
        assert_eq!(ll, 0.0);

        let cache = f.output_buffer();
        assert_eq!(cache.num_steps(), 4);
        for k in 0..4 {
            assert!(!cache.was_resampled(k));
            let ancestry = cache.ancestry(k);
            for (i, &a) in ancestry.iter().enumerate() {
                assert_eq!(a, i);
            }
        }
        assert_eq!(cache.ll(), Some(0.0));
    }

    #[test]
    // Purpose
    // -------
    // A correction step where every particle is impossible must abort the
    // run with the observation index, keeping whatever was recorded.
    //
    // Given
    // -----
    // - An observation scale of -1, which makes every density -inf.
    //
    // Expect
    // ------
    // - FilterError::Degenerate { index_obs: 0 } and one preserved output
    //   step.
    fn degenerate_observation_aborts_with_the_observation_index() {
        let obs = ObsStore::from_dense(Array2::from_elem((1, 1), 0.0).view());
        let mut f = lg_filter(obs, 0.5);
        let schedule = Schedule::from_points(&[1.0], &[0.0, 1.0]).unwrap();
        let mut s = State::new(16, 1, 3);
        s.set_params(array![0.9, 0.1, -1.0].view());
        let mut rng = StdRng::seed_from_u64(8);
        let err = f.filter(&mut rng, &schedule, &mut s, None).unwrap_err();
        assert_eq!(err, FilterError::Degenerate { index_obs: 0 });
        // Output written before the failure is preserved.
        assert_eq!(f.output_buffer().num_steps(), 1);
    }

    #[test]
    fn zero_threshold_never_resamples_but_the_estimate_still_accumulates() {
        let obs = ObsStore::from_dense(Array2::from_elem((3, 1), 0.25).view());
        let mut f = lg_filter(obs, 0.0);
        let schedule = Schedule::from_points(&[1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 3.0]).unwrap();
        let mut s = State::new(32, 1, 3);
        s.set_params(array![0.9, 0.3, 1.0].view());
        let mut rng = StdRng::seed_from_u64(21);
        let ll = f.filter(&mut rng, &schedule, &mut s, None).unwrap();
        assert!(ll.is_finite() && ll < 0.0);
        let cache = f.output_buffer();
        for k in 0..cache.num_steps() {
            assert!(!cache.was_resampled(k));
        }
    }

    #[test]
    fn unit_threshold_resamples_at_every_observation() {
        let obs = ObsStore::from_dense(Array2::from_elem((3, 1), 0.25).view());
        let mut f = lg_filter(obs, 1.0);
        let schedule = Schedule::from_points(&[1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 3.0]).unwrap();
        let mut s = State::new(32, 1, 3);
        s.set_params(array![0.9, 0.3, 1.0].view());
        let mut rng = StdRng::seed_from_u64(22);
        f.filter(&mut rng, &schedule, &mut s, None).unwrap();
        let cache = f.output_buffer();
        // The resample recorded at output k reflects the weights corrected
        // at output k - 1; the first step has uniform weights and cannot
        // trigger.
        for k in 2..cache.num_steps() {
            assert!(cache.was_resampled(k), "step {k} should have resampled");
        }
    }

    #[test]
    // Purpose
    // -------
    // With one particle the filter is plain importance sampling: the
    // estimate must equal the observation log-densities along the single
    // propagated trajectory, exactly.
    //
    // Given
    // -----
    // - Deterministic dynamics (q = 0) and a fixed initial state, so the
    //   trajectory is known in closed form: x_t = a^t x_0.
    //
    // Expect
    // ------
    // - ll == sum_t log N(y_t; x_t, r) to floating-point accuracy.
    fn single_particle_filter_reduces_to_importance_sampling() {
        // Arrange
        let y = [0.6, 0.1, -0.4, 0.3];
        let obs = ObsStore::from_dense(
            Array2::from_shape_fn((4, 1), |(t, _)| y[t]).view(),
        );
        let mut f = lg_filter(obs, 1.0);
        let schedule =
            Schedule::from_points(&[1.0, 2.0, 3.0, 4.0], &[0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        let (a, r, x0) = (0.9, 0.7, 0.5);
        let mut s = State::new(1, 1, 3);
        s.set_params(array![a, 0.0, r].view());
        let mut rng = StdRng::seed_from_u64(3);

        // Act
        let ll = f.filter(&mut rng, &schedule, &mut s, Some(&fixed_init(1, x0))).unwrap();

        // Assert
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut expect = 0.0;
        let mut x = x0;
        for &yt in &y {
            x *= a;
            expect += noise.ln_pdf((yt - x) / r) - r.ln();
        }
        assert_relative_eq!(ll, expect, max_relative = 1e-12);
    }

    #[test]
    fn conditional_filter_records_the_reference_as_particle_zero() {
        let steps = 6;
        let obs = ObsStore::from_dense(Array2::from_elem((steps, 1), 0.1).view());
        let mut f = lg_filter(obs, 1.0);
        let obs_times: Vec<f64> = (1..=steps).map(|k| k as f64).collect();
        let output_times: Vec<f64> = (0..=steps).map(|k| k as f64).collect();
        let schedule = Schedule::from_points(&obs_times, &output_times).unwrap();

        let mut x_ref = HostMatrix::zeros(1, steps + 1);
        for k in 0..=steps {
            x_ref.set(0, k, (k as f64 * 0.71).sin());
        }

        let mut s = State::new(128, 1, 3);
        let mut rng = StdRng::seed_from_u64(77);
        f.filter_conditioned(&mut rng, &schedule, array![0.9, 0.4, 1.0].view(), &mut s, &x_ref)
            .unwrap();

        let cache = f.output_buffer();
        assert_eq!(cache.num_steps(), steps + 1);
        for k in 0..=steps {
            assert_eq!(cache.state(k)[[0, 0]], x_ref.get(0, k), "output {k}");
        }
        // The pinned ancestry makes particle 0's trajectory the reference.
        let mut traj = HostMatrix::zeros(0, 0);
        cache.read_trajectory(0, &mut traj).unwrap();
        for k in 0..=steps {
            assert_eq!(traj.get(0, k), x_ref.get(0, k));
        }
    }

    #[test]
    fn sampled_trajectories_come_from_the_recorded_run() {
        let obs = ObsStore::from_dense(Array2::from_elem((3, 1), 0.0).view());
        let mut f = lg_filter(obs, 0.5);
        let schedule = Schedule::from_points(&[1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 3.0]).unwrap();
        let mut s = State::new(64, 1, 3);
        s.set_params(array![0.9, 0.3, 1.0].view());
        let mut rng = StdRng::seed_from_u64(5);
        f.filter(&mut rng, &schedule, &mut s, None).unwrap();

        let mut traj = HostMatrix::zeros(0, 0);
        f.sample_trajectory(&mut rng, &mut traj).unwrap();
        assert_eq!((traj.rows(), traj.cols()), (1, 4));
        assert!(traj.as_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn sampling_before_any_run_is_an_error() {
        let mut f = lg_filter(ObsStore::default(), 0.5);
        let mut rng = StdRng::seed_from_u64(6);
        let mut traj = HostMatrix::zeros(0, 0);
        assert_eq!(
            f.sample_trajectory(&mut rng, &mut traj).unwrap_err(),
            FilterError::NoRecordedOutput
        );
    }

    /// Wrapper that asks for the model's density bound and records what it
    /// was handed, to pin the driver's needs-max plumbing.
    struct MaxProbe {
        inner: SystematicResampler,
        got: Option<f64>,
    }

    impl Resampler for MaxProbe {
        fn is_triggered(&self, lws: ndarray::ArrayView1<f64>) -> bool {
            self.inner.is_triggered(lws)
        }
        fn needs_max(&self) -> bool {
            true
        }
        fn set_max_log_weight(&mut self, max_lw: f64) {
            self.got = Some(max_lw);
        }
        fn resample(
            &mut self, rng: &mut StdRng, lws: &mut Array1<f64>, ancestors: &mut Array1<usize>,
            s: &mut State,
        ) -> FilterResult<()> {
            self.inner.resample(rng, lws, ancestors, s)
        }
        fn cond_resample(
            &mut self, rng: &mut StdRng, a_in: usize, a_out: usize, lws: &mut Array1<f64>,
            ancestors: &mut Array1<usize>, s: &mut State,
        ) -> FilterResult<()> {
            self.inner.cond_resample(rng, a_in, a_out, lws, ancestors, s)
        }
    }

    #[test]
    fn rejection_style_resamplers_receive_the_density_bound() {
        let model = LinearGaussianModel::new(0.0, 1.0).unwrap();
        let rk = Rk43::new(IntegratorTuning::new(1e-9, 1e-6, 0.1, 1000).unwrap());
        let obs = ObsStore::from_dense(Array2::from_elem((2, 1), 0.3).view());
        let mut f = ParticleFilter::new(
            OdeSimulator::new(model, obs, rk),
            MaxProbe { inner: SystematicResampler::new(1.0), got: None },
            FilterCache::new(),
        );
        let schedule = Schedule::from_points(&[1.0, 2.0], &[0.0, 1.0, 2.0]).unwrap();
        let mut s = State::new(16, 1, 3);
        let r = 0.8;
        s.set_params(array![0.9, 0.2, r].view());
        let mut rng = StdRng::seed_from_u64(31);
        f.filter(&mut rng, &schedule, &mut s, None).unwrap();

        let bound = f.resampler().got.expect("the bound must have been requested");
        let noise = Normal::new(0.0, 1.0).unwrap();
        assert_relative_eq!(bound, noise.ln_pdf(0.0) - r.ln(), max_relative = 1e-12);
    }
}
