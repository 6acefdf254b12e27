//! Errors for the particle filter stack (schedule construction, options
//! validation, and filter invocations).
//!
//! The split mirrors how the errors are produced: [`ScheduleError`] and
//! [`OptionsError`] are construction-time validation failures, while
//! [`FilterError`] is the single fatal-error channel out of a running
//! `filter` call. Soft conditions (integrator step-budget exhaustion,
//! isolated non-finite log-densities) never appear here; they degrade the
//! returned log-likelihood instead.

use crate::matrix::MatrixError;

/// Result alias for filter invocations that may produce [`FilterError`].
pub type FilterResult<T> = Result<T, FilterError>;

/// Result alias for schedule construction.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Result alias for options validation.
pub type OptionsResult<T> = Result<T, OptionsError>;

/// Fatal errors aborting a `filter` invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A matrix decomposition in the resampler or model was not positive
    /// definite; `info` is the failing pivot reported by the factorization.
    CholeskyFailure { info: i32 },

    /// Every log-weight collapsed to `-inf` after a correction step. The
    /// caller may retry with a different seed.
    Degenerate {
        /// Observation index at which the weights died.
        index_obs: usize,
    },

    /// The conditional filter's pinned ancestor disagrees with the drawn
    /// resample, or a pinned ancestor other than 0 was requested (only
    /// ancestor 0 is supported).
    ConditionalAncestorMismatch { expected: usize, actual: usize },

    /// A resize was attempted on a matrix that does not own its storage.
    ResizeForbidden { rows: usize, cols: usize },

    /// A trajectory was requested before any filter output was recorded.
    NoRecordedOutput,
}

impl std::error::Error for FilterError {}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::CholeskyFailure { info } => {
                write!(f, "Cholesky decomposition failed (info = {info})")
            }
            FilterError::Degenerate { index_obs } => write!(
                f,
                "particle filter degenerated: all log-weights are -inf \
                 at observation index {index_obs}"
            ),
            FilterError::ConditionalAncestorMismatch { expected, actual } => write!(
                f,
                "conditional particle filter failed: pinned ancestor {expected} \
                 but resample produced {actual}"
            ),
            FilterError::ResizeForbidden { rows, cols } => write!(
                f,
                "cannot resize a borrowed matrix view to {rows}x{cols}: \
                 views do not own their storage"
            ),
            FilterError::NoRecordedOutput => {
                write!(f, "no recorded filter output to sample a trajectory from")
            }
        }
    }
}

impl From<MatrixError> for FilterError {
    fn from(e: MatrixError) -> Self {
        match e {
            MatrixError::ResizeForbidden { rows, cols } => {
                FilterError::ResizeForbidden { rows, cols }
            }
        }
    }
}

/// Validation errors for schedule construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Neither observation nor output points were supplied.
    Empty,

    /// A schedule point is NaN or infinite.
    NonFiniteTime { time: f64 },

    /// Observation times must be strictly increasing.
    UnorderedObservationTimes { index: usize, prev: f64, next: f64 },

    /// Output times must be strictly increasing.
    UnorderedOutputTimes { index: usize, prev: f64, next: f64 },
}

impl std::error::Error for ScheduleError {}

impl std::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleError::Empty => write!(f, "schedule needs at least one time point"),
            ScheduleError::NonFiniteTime { time } => {
                write!(f, "schedule time points must be finite, got {time}")
            }
            ScheduleError::UnorderedObservationTimes { index, prev, next } => write!(
                f,
                "observation times must be strictly increasing: \
                 t[{index}] = {next} after {prev}"
            ),
            ScheduleError::UnorderedOutputTimes { index, prev, next } => write!(
                f,
                "output times must be strictly increasing: \
                 t[{index}] = {next} after {prev}"
            ),
        }
    }
}

/// Validation errors for [`FilterOptions`].
///
/// [`FilterOptions`]: crate::filter::FilterOptions
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsError {
    /// At least one particle is required.
    ZeroParticles,

    /// `ess_threshold` must lie in `[0, 1]` (0 disables resampling).
    InvalidEssThreshold { value: f64 },

    /// Integrator tuning rejected a knob; the inner error says which.
    InvalidTuning(crate::ode::TuningError),
}

impl std::error::Error for OptionsError {}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::ZeroParticles => write!(f, "particle count must be at least 1"),
            OptionsError::InvalidEssThreshold { value } => {
                write!(f, "ESS threshold must lie in [0, 1], got {value}")
            }
            OptionsError::InvalidTuning(e) => write!(f, "invalid integrator tuning: {e}"),
        }
    }
}

impl From<crate::ode::TuningError> for OptionsError {
    fn from(e: crate::ode::TuningError) -> Self {
        OptionsError::InvalidTuning(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_resize_errors_convert_into_the_filter_taxonomy() {
        let e: FilterError = MatrixError::ResizeForbidden { rows: 2, cols: 3 }.into();
        assert_eq!(e, FilterError::ResizeForbidden { rows: 2, cols: 3 });
    }

    #[test]
    fn display_messages_carry_their_context() {
        let msg = FilterError::Degenerate { index_obs: 7 }.to_string();
        assert!(msg.contains("observation index 7"));
        let msg = ScheduleError::UnorderedOutputTimes { index: 3, prev: 2.0, next: 1.0 }
            .to_string();
        assert!(msg.contains("t[3]"));
    }
}
