//! Filter output recording and trajectory reconstruction.
//!
//! The driver writes one record per output step — time, dynamic states,
//! ancestry, log-weights, resample flag — plus a parameter record at the
//! start and the marginal log-likelihood at the end. [`OutputBuffer`] is
//! the writer/reader contract; [`FilterCache`] is the in-memory
//! implementation the crate ships. Persistent encodings (files, NetCDF,
//! databases) are a consumer concern: implement the trait over the schema
//! recorded here.
//!
//! Trajectory reads walk the recorded ancestries backwards: the ancestry
//! stored at output step `k` maps each particle at `k` to its parent at
//! `k − 1`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::filter::errors::{FilterError, FilterResult};
use crate::matrix::HostMatrix;

/// Writer/reader contract for filter output.
///
/// Writes arrive strictly in schedule order with a dense output index `k`;
/// implementations may therefore append.
pub trait OutputBuffer {
    /// Drop all recorded output. Called by the driver during `init`.
    fn clear(&mut self);

    /// Record the shared parameter vector, once per filter run.
    fn write_parameters(&mut self, theta: ArrayView1<f64>);

    /// Record the time of output step `k`.
    fn write_time(&mut self, k: usize, t: f64);

    /// Record dynamic states, ancestry and the resample flag for output
    /// step `k`.
    fn write_state(
        &mut self, k: usize, x: ArrayView2<f64>, ancestors: ArrayView1<usize>, resampled: bool,
    );

    /// Record the log-weights of output step `k`.
    fn write_log_weights(&mut self, k: usize, lws: ArrayView1<f64>);

    /// Record the marginal log-likelihood estimate at termination.
    fn write_ll(&mut self, ll: f64);

    /// Log-weights of the last recorded output step, if any.
    fn final_log_weights(&self) -> Option<ArrayView1<f64>>;

    /// Number of recorded output steps.
    fn num_steps(&self) -> usize;

    /// Reconstruct the trajectory of final-step particle `p` into `x`
    /// (variables × output steps), walking ancestries backwards.
    ///
    /// # Errors
    /// [`FilterError::NoRecordedOutput`] when nothing has been recorded.
    fn read_trajectory(&self, p: usize, x: &mut HostMatrix) -> FilterResult<()>;
}

/// In-memory output buffer.
///
/// Keeps the full per-step schema: `{k, t, dyn: P×N, ancestors: P,
/// lws: P, resampled}` plus the parameter and terminal records.
#[derive(Debug, Clone, Default)]
pub struct FilterCache {
    times: Vec<f64>,
    states: Vec<Array2<f64>>,
    ancestries: Vec<Array1<usize>>,
    log_weights: Vec<Array1<f64>>,
    resampled: Vec<bool>,
    parameters: Option<Array1<f64>>,
    ll: Option<f64>,
}

impl FilterCache {
    /// Empty cache.
    pub fn new() -> Self {
        FilterCache::default()
    }

    /// Recorded time of output step `k`.
    pub fn time(&self, k: usize) -> f64 {
        self.times[k]
    }

    /// Recorded states of output step `k` (particles × variables).
    pub fn state(&self, k: usize) -> ArrayView2<f64> {
        self.states[k].view()
    }

    /// Recorded ancestry of output step `k`.
    pub fn ancestry(&self, k: usize) -> ArrayView1<usize> {
        self.ancestries[k].view()
    }

    /// Recorded log-weights of output step `k`.
    pub fn log_weights(&self, k: usize) -> ArrayView1<f64> {
        self.log_weights[k].view()
    }

    /// Whether output step `k` followed a resample.
    pub fn was_resampled(&self, k: usize) -> bool {
        self.resampled[k]
    }

    /// Recorded parameter vector, if any.
    pub fn parameters(&self) -> Option<ArrayView1<f64>> {
        self.parameters.as_ref().map(|p| p.view())
    }

    /// Recorded marginal log-likelihood, if the run terminated.
    pub fn ll(&self) -> Option<f64> {
        self.ll
    }
}

impl OutputBuffer for FilterCache {
    fn clear(&mut self) {
        self.times.clear();
        self.states.clear();
        self.ancestries.clear();
        self.log_weights.clear();
        self.resampled.clear();
        self.parameters = None;
        self.ll = None;
    }

    fn write_parameters(&mut self, theta: ArrayView1<f64>) {
        self.parameters = Some(theta.to_owned());
    }

    fn write_time(&mut self, k: usize, t: f64) {
        debug_assert_eq!(k, self.times.len(), "output steps must arrive in order");
        self.times.push(t);
    }

    fn write_state(
        &mut self, k: usize, x: ArrayView2<f64>, ancestors: ArrayView1<usize>, resampled: bool,
    ) {
        debug_assert_eq!(k, self.states.len(), "output steps must arrive in order");
        self.states.push(x.to_owned());
        self.ancestries.push(ancestors.to_owned());
        self.resampled.push(resampled);
    }

    fn write_log_weights(&mut self, k: usize, lws: ArrayView1<f64>) {
        debug_assert_eq!(k, self.log_weights.len(), "output steps must arrive in order");
        self.log_weights.push(lws.to_owned());
    }

    fn write_ll(&mut self, ll: f64) {
        self.ll = Some(ll);
    }

    fn final_log_weights(&self) -> Option<ArrayView1<f64>> {
        self.log_weights.last().map(|lws| lws.view())
    }

    fn num_steps(&self) -> usize {
        self.states.len()
    }

    fn read_trajectory(&self, p: usize, x: &mut HostMatrix) -> FilterResult<()> {
        let steps = self.states.len();
        if steps == 0 {
            return Err(FilterError::NoRecordedOutput);
        }
        let num_vars = self.states[0].ncols();
        x.resize(num_vars, steps, false);

        let mut particle = p;
        for k in (0..steps).rev() {
            x.column_mut(k).assign(&self.states[k].row(particle));
            particle = self.ancestries[k][particle];
        }
        Ok(())
    }
}
