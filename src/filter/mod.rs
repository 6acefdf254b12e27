//! filter — the sequential Monte Carlo stack.
//!
//! Purpose
//! -------
//! Bundle everything the particle filter needs around the driver: the time
//! schedule, the particle state container, validated configuration, the
//! resampling layer, the output recording layer, and the shared error
//! types. [`ParticleFilter`] at the center runs the state machine; the
//! other modules are its collaborators.
//!
//! Key behaviors
//! -------------
//! - [`schedule`] merges observation and output time points into one
//!   monotone sequence with running indices.
//! - [`state`] owns the P×N dynamic matrix plus the shared parameters and
//!   hands split borrows to per-particle sweeps.
//! - [`resample`] / [`systematic`] implement the trigger predicate, weight
//!   normalization, ancestry permutation, and the in-place systematic
//!   resampler, including the conditional variant pinning ancestor 0.
//! - [`output`] records the per-step tuple schema and reconstructs
//!   trajectories by walking ancestries backwards.
//! - [`driver`] interleaves resample, predict, correct, and output over
//!   the schedule and accumulates the marginal log-likelihood.
//!
//! Invariants & assumptions
//! ------------------------
//! - Log-weights are finite on every live particle after a correction; a
//!   fully collapsed weight vector is fatal ([`FilterError::Degenerate`]).
//! - Ancestries are the identity after `init` and after every
//!   non-resampling step.
//! - Non-resampling steps renormalize log-weights so their exponentials
//!   sum to the particle count, which keeps the incremental
//!   log-likelihoods telescoping exactly.
//!
//! Downstream usage
//! ----------------
//! Build a [`Schedule`] and [`FilterOptions`], assemble a
//! [`ParticleFilter`] from a simulator, a [`SystematicResampler`] and a
//! [`FilterCache`], then call `filter` / `filter_with_params` /
//! `filter_conditioned` and read the cache (or `sample_trajectory`).

pub mod driver;
pub mod errors;
pub mod options;
pub mod output;
pub mod resample;
pub mod schedule;
pub mod state;
pub mod systematic;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::driver::ParticleFilter;
pub use self::errors::{
    FilterError, FilterResult, OptionsError, OptionsResult, ScheduleError, ScheduleResult,
};
pub use self::options::FilterOptions;
pub use self::output::{FilterCache, OutputBuffer};
pub use self::resample::{ancestors_from_offspring, fill_identity, gather_rows, normalise, Resampler};
pub use self::schedule::{Schedule, ScheduleElement};
pub use self::state::State;
pub use self::systematic::SystematicResampler;
