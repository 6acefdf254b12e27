//! Adaptive ODE integration for particle propagation.
//!
//! The simulator advances particles between schedule points by calling
//! [`Rk43::integrate`], which sweeps the particle axis in parallel and runs
//! an independent adaptive step loop per particle. Tuning lives in
//! [`IntegratorTuning`], derived once from the user's tolerances and frozen
//! thereafter.
//!
//! Integration failure is deliberately soft: a particle that exhausts its
//! step budget keeps its last accepted state and the filter carries on. The
//! only hard errors in this module are construction-time validation
//! failures ([`TuningError`]).

pub mod rk43;
pub mod tuning;

pub use self::rk43::Rk43;
pub use self::tuning::{IntegratorTuning, TuningError, TuningResult};
