//! Step-size control constants for the adaptive integrator.
//!
//! The user supplies four knobs: the tolerances, the initial step, and the
//! per-particle step budget. Everything else the controller needs is derived
//! here once, at construction, and is read-only thereafter; the integrator
//! never mutates tuning and there is no setter surface.
//!
//! Derived values:
//! - `uround`: machine epsilon, used by the vanishing-step guard.
//! - `expo`: `1 / (order + 1) = 0.2` for the embedded 4(3) pair.
//! - `facl`, `facr`: step-growth clamp `[0.2, 10.0]`.
//! - `logsafe`: `ln 0.9`, the controller's safety factor in log space.
//! - `beta`: `0.04`, the Lund-stabilization coefficient weighting the
//!   previous step's error.

/// Result alias for tuning construction.
pub type TuningResult<T> = Result<T, TuningError>;

/// Validation errors for [`IntegratorTuning::new`].
#[derive(Debug, Clone, PartialEq)]
pub enum TuningError {
    /// `atoler` must be finite and strictly positive.
    InvalidAbsoluteTolerance { value: f64 },

    /// `rtoler` must be finite and strictly positive.
    InvalidRelativeTolerance { value: f64 },

    /// `h0` must be finite and strictly positive.
    InvalidInitialStep { value: f64 },

    /// `nsteps` must be at least 1.
    ZeroStepBudget,
}

impl std::error::Error for TuningError {}

impl std::fmt::Display for TuningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuningError::InvalidAbsoluteTolerance { value } => {
                write!(f, "absolute tolerance must be finite and > 0, got {value}")
            }
            TuningError::InvalidRelativeTolerance { value } => {
                write!(f, "relative tolerance must be finite and > 0, got {value}")
            }
            TuningError::InvalidInitialStep { value } => {
                write!(f, "initial step size must be finite and > 0, got {value}")
            }
            TuningError::ZeroStepBudget => {
                write!(f, "per-particle step budget must be at least 1")
            }
        }
    }
}

/// Immutable tuning constants for the RK4(3)5\[2R+\]C step-size controller.
///
/// Constructed once before any `filter` call; all fields are private and
/// exposed through read-only accessors so the constants cannot drift while
/// an integration is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorTuning {
    atoler: f64,
    rtoler: f64,
    h0: f64,
    nsteps: usize,
    uround: f64,
    expo: f64,
    facl: f64,
    facr: f64,
    logsafe: f64,
    beta: f64,
}

impl IntegratorTuning {
    /// Validate the user-supplied knobs and derive the controller constants.
    ///
    /// # Errors
    /// - [`TuningError::InvalidAbsoluteTolerance`] if `atoler` is not
    ///   finite and positive.
    /// - [`TuningError::InvalidRelativeTolerance`] if `rtoler` is not
    ///   finite and positive.
    /// - [`TuningError::InvalidInitialStep`] if `h0` is not finite and
    ///   positive.
    /// - [`TuningError::ZeroStepBudget`] if `nsteps == 0`.
    pub fn new(atoler: f64, rtoler: f64, h0: f64, nsteps: usize) -> TuningResult<Self> {
        if !(atoler.is_finite() && atoler > 0.0) {
            return Err(TuningError::InvalidAbsoluteTolerance { value: atoler });
        }
        if !(rtoler.is_finite() && rtoler > 0.0) {
            return Err(TuningError::InvalidRelativeTolerance { value: rtoler });
        }
        if !(h0.is_finite() && h0 > 0.0) {
            return Err(TuningError::InvalidInitialStep { value: h0 });
        }
        if nsteps == 0 {
            return Err(TuningError::ZeroStepBudget);
        }
        Ok(IntegratorTuning {
            atoler,
            rtoler,
            h0,
            nsteps,
            uround: f64::EPSILON,
            expo: 0.2,
            facl: 0.2,
            facr: 10.0,
            logsafe: 0.9_f64.ln(),
            beta: 0.04,
        })
    }

    /// Absolute error tolerance.
    pub fn atoler(&self) -> f64 {
        self.atoler
    }

    /// Relative error tolerance.
    pub fn rtoler(&self) -> f64 {
        self.rtoler
    }

    /// Initial step size for every particle and interval.
    pub fn h0(&self) -> f64 {
        self.h0
    }

    /// Hard cap on accepted-plus-rejected step attempts per particle per
    /// interval.
    pub fn nsteps(&self) -> usize {
        self.nsteps
    }

    /// Unit round-off.
    pub fn uround(&self) -> f64 {
        self.uround
    }

    /// Error exponent `1 / (order + 1)`.
    pub fn expo(&self) -> f64 {
        self.expo
    }

    /// Lower bound on the per-step growth factor.
    pub fn facl(&self) -> f64 {
        self.facl
    }

    /// Upper bound on the per-step growth factor.
    pub fn facr(&self) -> f64 {
        self.facr
    }

    /// Log of the controller safety factor.
    pub fn logsafe(&self) -> f64 {
        self.logsafe
    }

    /// Lund-stabilization coefficient.
    pub fn beta(&self) -> f64 {
        self.beta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derived_constants_match_the_controller_definition() {
        let tuning = IntegratorTuning::new(1e-9, 1e-6, 0.01, 100).unwrap();
        assert_eq!(tuning.uround(), f64::EPSILON);
        assert_relative_eq!(tuning.expo(), 0.2);
        assert_relative_eq!(tuning.facl(), 0.2);
        assert_relative_eq!(tuning.facr(), 10.0);
        assert_relative_eq!(tuning.logsafe(), 0.9_f64.ln());
        assert_relative_eq!(tuning.beta(), 0.04);
        assert_eq!(tuning.nsteps(), 100);
    }

    #[test]
    fn non_positive_or_non_finite_knobs_are_rejected() {
        assert!(matches!(
            IntegratorTuning::new(0.0, 1e-6, 0.01, 100),
            Err(TuningError::InvalidAbsoluteTolerance { .. })
        ));
        assert!(matches!(
            IntegratorTuning::new(1e-9, -1e-6, 0.01, 100),
            Err(TuningError::InvalidRelativeTolerance { .. })
        ));
        assert!(matches!(
            IntegratorTuning::new(1e-9, 1e-6, f64::NAN, 100),
            Err(TuningError::InvalidInitialStep { .. })
        ));
        assert!(matches!(
            IntegratorTuning::new(1e-9, 1e-6, 0.01, 0),
            Err(TuningError::ZeroStepBudget)
        ));
    }
}
