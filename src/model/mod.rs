//! Model interface consumed by the filter core.
//!
//! Purpose
//! -------
//! Define the boundary between the engine and a user's state-space model.
//! The core needs exactly four things from a model: a prior draw for each
//! particle, a per-particle derivative for the integrator, an optional
//! discrete-time transition-noise hook applied by the simulator, and the
//! observation log-density (plus its maximum, for rejection-based
//! resamplers). Everything else about the model — parameter meaning, state
//! layout, observation space — stays on the model's side of the line.
//!
//! Key behaviors
//! -------------
//! - [`Model`] is consumed through generics only; the per-element callbacks
//!   (`derivatives` above all) sit on the integrator's hot path and must be
//!   inlineable at monomorphization time. No trait objects anywhere in the
//!   core.
//! - Models must be `Sync`: `derivatives` is invoked concurrently across
//!   particles during `integrate`.
//! - Observations reach the model through an [`ObsMask`]: the set of
//!   observed components and their values at one observation index, looked
//!   up from an [`ObsStore`] by the simulator.
//!
//! Conventions
//! -----------
//! - `theta` is the shared, read-only parameter vector owned by the filter
//!   state; models are plain values and hold structural constants only.
//! - Log-densities are *added* into the log-weight vector, never assigned.
//! - A model signalling an impossible observation adds `-inf`; the filter
//!   treats a fully dead weight vector as fatal and anything else as a
//!   soft signal.

pub mod linear_gaussian;

pub use self::linear_gaussian::LinearGaussianModel;

use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut1};
use rand::rngs::StdRng;

/// A continuous-time state-space model as seen by the engine.
///
/// `P` particles each carry `num_vars()` dynamic state variables; the shared
/// parameter vector has `num_params()` entries. The engine guarantees that
/// `derivatives` is called with `x` holding the in-progress stage value of
/// exactly one particle, and that the RNG-consuming hooks (`init`,
/// `transition`) are never called from the integrator.
pub trait Model: Sync {
    /// Number of dynamic state variables per particle.
    fn num_vars(&self) -> usize;

    /// Number of shared parameters.
    fn num_params(&self) -> usize;

    /// Draw one particle's initial state from the prior at time `t`.
    fn init(&self, rng: &mut StdRng, t: f64, theta: ArrayView1<f64>, x: ArrayViewMut1<f64>);

    /// Evaluate the ODE right-hand side for particle `p` at time `t`,
    /// writing into `dxdt`.
    ///
    /// Called from the integrator's stage loop, concurrently across
    /// particles. Must not allocate, block, or touch shared mutable state.
    fn derivatives(
        &self, t: f64, p: usize, theta: ArrayView1<f64>, x: ArrayView1<f64>,
        dxdt: ArrayViewMut1<f64>,
    );

    /// Apply discrete-time transition noise to particle `p` after its
    /// deterministic advancement over `[t1, t2]`.
    ///
    /// The default is a no-op, which gives purely deterministic dynamics.
    fn transition(
        &self, _rng: &mut StdRng, _t1: f64, _t2: f64, _p: usize, _theta: ArrayView1<f64>,
        _x: ArrayViewMut1<f64>,
    ) {
    }

    /// Add `log p(y | x_p)` into `lws[p]` for every particle.
    ///
    /// `x` is the full P×N dynamic state matrix; `mask` carries the observed
    /// components and values for the current observation index.
    fn observation_log_densities(
        &self, theta: ArrayView1<f64>, x: ArrayView2<f64>, mask: &ObsMask,
        lws: ArrayViewMut1<f64>,
    );

    /// Upper bound of `log p(y | x)` over all states, for rejection-based
    /// resamplers. Only consulted when the resampler reports
    /// `needs_max() == true`.
    fn observation_max_log_density(
        &self, theta: ArrayView1<f64>, x: ArrayView2<f64>, mask: &ObsMask,
    ) -> f64;
}

/// Observed components and values at a single observation index.
#[derive(Debug, Clone, PartialEq)]
pub struct ObsMask {
    components: Vec<usize>,
    values: Array1<f64>,
}

impl ObsMask {
    /// Mask over an explicit set of observed components.
    ///
    /// # Panics
    /// Panics if `components` and `values` differ in length.
    pub fn new(components: Vec<usize>, values: Array1<f64>) -> Self {
        assert_eq!(
            components.len(),
            values.len(),
            "observation mask components and values must align"
        );
        ObsMask { components, values }
    }

    /// Dense mask: components `0..values.len()` all observed.
    pub fn dense(values: Array1<f64>) -> Self {
        let components = (0..values.len()).collect();
        ObsMask { components, values }
    }

    /// Number of observed components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True when nothing is observed at this index.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component index of the `k`-th observed entry.
    pub fn component(&self, k: usize) -> usize {
        self.components[k]
    }

    /// Observed value of the `k`-th entry.
    pub fn value(&self, k: usize) -> f64 {
        self.values[k]
    }

    /// All observed component indices.
    pub fn components(&self) -> &[usize] {
        &self.components
    }

    /// All observed values.
    pub fn values(&self) -> ArrayView1<f64> {
        self.values.view()
    }
}

/// Ordered collection of observation masks, indexed by `index_obs`.
#[derive(Debug, Clone, Default)]
pub struct ObsStore {
    masks: Vec<ObsMask>,
}

impl ObsStore {
    /// Store an explicit sequence of masks.
    pub fn new(masks: Vec<ObsMask>) -> Self {
        ObsStore { masks }
    }

    /// Build dense masks from a matrix with one row per observation time.
    pub fn from_dense(values: ArrayView2<f64>) -> Self {
        let masks = values.rows().into_iter().map(|row| ObsMask::dense(row.to_owned())).collect();
        ObsStore { masks }
    }

    /// Mask for observation index `index_obs`.
    ///
    /// # Panics
    /// Panics if `index_obs` is out of range; the schedule construction
    /// guarantees indices stay within the store when the two are built from
    /// the same observation list.
    pub fn mask(&self, index_obs: usize) -> &ObsMask {
        &self.masks[index_obs]
    }

    /// Number of observation indices.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// True when the store holds no observations.
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}
