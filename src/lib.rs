//! rust_smc — sequential Monte Carlo for continuous-time state-space models.
//!
//! Purpose
//! -------
//! Estimate the marginal likelihood of a sequence of timestamped
//! observations and the filtering distribution over latent trajectories,
//! given a user-specified state-space model: deterministic or stochastic
//! dynamics plus an observation likelihood. Two tightly coupled subsystems
//! carry the work:
//!
//! - a particle filter driver ([`filter::ParticleFilter`]) that interleaves
//!   time advancement, observation correction and resampling, maintains
//!   log-weights and ancestries, and accumulates the marginal
//!   log-likelihood estimate, including the conditional
//!   (Andrieu–Doucet–Holenstein) variant that pins one particle to a
//!   reference trajectory; and
//! - an adaptive embedded Runge–Kutta integrator ([`ode::Rk43`], the
//!   RK4(3)5[2R+]C low-storage pair) that advances every particle's ODE
//!   state between observation times with per-particle PI step-size
//!   control.
//!
//! Key behaviors
//! -------------
//! - Models plug in through [`model::Model`]: per-particle derivatives for
//!   the integrator, an optional transition-noise hook for stochastic
//!   dynamics, and observation log-densities for the correction step.
//! - Time advancement is delegated to a [`sim::Simulator`]
//!   ([`sim::OdeSimulator`] binds a model to the integrator); the driver
//!   never touches the integrator directly.
//! - Filter output (parameters, per-step states, ancestries, log-weights,
//!   marginal log-likelihood) is recorded through
//!   [`filter::OutputBuffer`]; [`filter::FilterCache`] keeps it in memory
//!   and supports backward trajectory reconstruction.
//! - Particle state lives in column-major [`matrix::HostMatrix`] storage;
//!   the particle axis is partitioned across threads inside `integrate`
//!   with no cross-particle dependencies.
//!
//! Invariants & assumptions
//! ------------------------
//! - Schedules are monotone in time; observation and output indices are
//!   assigned at construction and never revisited.
//! - Log-weights are unnormalized; every reduction over them is
//!   max-shifted ([`utils::logsumexp`]).
//! - The RNG ([`rand::rngs::StdRng`], always explicitly seeded) is consumed
//!   by the driver, simulator and resampler only, never by the integrator.
//! - Fatal conditions surface as [`filter::FilterError`]; integrator step
//!   budget exhaustion is a soft signal that leaves the affected particle
//!   at its last accepted state.
//!
//! Downstream usage
//! ----------------
//! 1. Implement [`model::Model`] (or start from
//!    [`model::LinearGaussianModel`]).
//! 2. Build a [`filter::Schedule`] from observation and output time points
//!    and a validated [`filter::FilterOptions`].
//! 3. Assemble an [`sim::OdeSimulator`], a
//!    [`filter::SystematicResampler`] and a [`filter::FilterCache`] into a
//!    [`filter::ParticleFilter`], then call `filter` /
//!    `filter_with_params` / `filter_conditioned`.
//! 4. Draw latent trajectories with `sample_trajectory`.

pub mod filter;
pub mod matrix;
pub mod model;
pub mod ode;
pub mod sim;
pub mod utils;

// ---- Re-exports (primary public surface) ----------------------------------

pub use crate::filter::{
    FilterCache, FilterError, FilterOptions, FilterResult, OutputBuffer, ParticleFilter,
    Resampler, Schedule, ScheduleElement, State, SystematicResampler,
};
pub use crate::matrix::{HostMatrix, MatrixError, MatrixMut, MatrixRef};
pub use crate::model::{LinearGaussianModel, Model, ObsMask, ObsStore};
pub use crate::ode::{IntegratorTuning, Rk43};
pub use crate::sim::{OdeSimulator, Simulator};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_smc::prelude::*;
//
// to import the main filtering surface in a single line.

pub mod prelude {
    pub use crate::filter::{
        FilterCache, FilterError, FilterOptions, FilterResult, OutputBuffer, ParticleFilter,
        Resampler, Schedule, ScheduleElement, State, SystematicResampler,
    };
    pub use crate::matrix::{HostMatrix, MatrixMut, MatrixRef};
    pub use crate::model::{LinearGaussianModel, Model, ObsMask, ObsStore};
    pub use crate::ode::{IntegratorTuning, Rk43};
    pub use crate::sim::{OdeSimulator, Simulator};
}
