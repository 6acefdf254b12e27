//! Filter configuration.
//!
//! One struct bundles every user-facing knob of the engine: particle count,
//! integrator tolerances and budget, ESS trigger level, and the RNG seed.
//! Validation happens once, in the constructor; the factory methods then
//! hand out the derived collaborators (tuning, integrator, resampler, RNG)
//! so call sites never re-validate.

use rand::{rngs::StdRng, SeedableRng};

use crate::filter::errors::{OptionsError, OptionsResult};
use crate::filter::systematic::SystematicResampler;
use crate::ode::{IntegratorTuning, Rk43};

/// Validated engine configuration.
///
/// `ess_threshold` is relative to the particle count: resampling triggers
/// when `ESS < ess_threshold · P`. `0` disables resampling entirely; `1`
/// triggers at every observation with non-uniform weights.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    particles: usize,
    ess_threshold: f64,
    seed: u64,
    tuning: IntegratorTuning,
}

impl FilterOptions {
    /// Validate and bundle the configuration.
    ///
    /// # Errors
    /// - [`OptionsError::ZeroParticles`] when `particles == 0`.
    /// - [`OptionsError::InvalidEssThreshold`] when `ess_threshold` is
    ///   outside `[0, 1]` or not finite.
    /// - [`OptionsError::InvalidTuning`] when the integrator knobs fail
    ///   validation.
    pub fn new(
        particles: usize, atoler: f64, rtoler: f64, h0: f64, nsteps: usize, ess_threshold: f64,
        seed: u64,
    ) -> OptionsResult<FilterOptions> {
        if particles == 0 {
            return Err(OptionsError::ZeroParticles);
        }
        if !(ess_threshold.is_finite() && (0.0..=1.0).contains(&ess_threshold)) {
            return Err(OptionsError::InvalidEssThreshold { value: ess_threshold });
        }
        let tuning = IntegratorTuning::new(atoler, rtoler, h0, nsteps)?;
        Ok(FilterOptions { particles, ess_threshold, seed, tuning })
    }

    /// Number of particles.
    pub fn particles(&self) -> usize {
        self.particles
    }

    /// Relative ESS threshold.
    pub fn ess_threshold(&self) -> f64 {
        self.ess_threshold
    }

    /// RNG seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The validated integrator tuning.
    pub fn tuning(&self) -> &IntegratorTuning {
        &self.tuning
    }

    /// Freshly seeded generator for one filter run.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }

    /// Integrator built on this configuration's tuning.
    pub fn integrator(&self) -> Rk43 {
        Rk43::new(self.tuning.clone())
    }

    /// Systematic resampler at this configuration's ESS threshold.
    pub fn resampler(&self) -> SystematicResampler {
        SystematicResampler::new(self.ess_threshold)
    }
}
