//! Time schedule driving the filter's outer loop.
//!
//! A schedule is the merged, time-ordered union of two point sets: the
//! observation times (where `correct` fires and resampling may trigger) and
//! the output times (where the sink records a step). Each element carries
//! running indices into both sequences so the driver can look up the right
//! observation mask and output slot without counting.
//!
//! Construction validates both point sets once; after that the driver
//! iterates by position and never re-checks.

use crate::filter::errors::{ScheduleError, ScheduleResult};

/// One point of the filter's time schedule.
///
/// `index_obs` is meaningful only when `has_obs` is set, and `index_output`
/// only when `has_output` is set; both default to 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleElement {
    /// Time of this schedule point.
    pub time: f64,
    /// An observation arrives at this point.
    pub has_obs: bool,
    /// The output sink records a step at this point.
    pub has_output: bool,
    /// Position within the observation sequence.
    pub index_obs: usize,
    /// Position within the output sequence.
    pub index_output: usize,
}

/// Monotone sequence of [`ScheduleElement`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    elements: Vec<ScheduleElement>,
    num_obs: usize,
    num_outputs: usize,
}

impl Schedule {
    /// Merge sorted observation and output time points into a schedule.
    ///
    /// Points that coincide (exact float equality) collapse into a single
    /// element carrying both flags. Each list must be strictly increasing;
    /// the merged sequence is therefore monotone, and every element gets the
    /// running `index_obs` / `index_output` of its source list(s).
    ///
    /// # Errors
    /// - [`ScheduleError::Empty`] if both lists are empty.
    /// - [`ScheduleError::NonFiniteTime`] on NaN or infinite points.
    /// - [`ScheduleError::UnorderedObservationTimes`] /
    ///   [`ScheduleError::UnorderedOutputTimes`] when a list is not
    ///   strictly increasing.
    pub fn from_points(obs_times: &[f64], output_times: &[f64]) -> ScheduleResult<Schedule> {
        if obs_times.is_empty() && output_times.is_empty() {
            return Err(ScheduleError::Empty);
        }
        validate_points(obs_times, true)?;
        validate_points(output_times, false)?;

        let mut elements = Vec::with_capacity(obs_times.len() + output_times.len());
        let (mut io, mut iy) = (0usize, 0usize);
        while io < obs_times.len() || iy < output_times.len() {
            let next_obs = obs_times.get(io).copied();
            let next_out = output_times.get(iy).copied();
            let (time, has_obs, has_output) = match (next_obs, next_out) {
                (Some(to), Some(ty)) if to == ty => (to, true, true),
                (Some(to), Some(ty)) if to < ty => (to, true, false),
                (Some(_), Some(ty)) => (ty, false, true),
                (Some(to), None) => (to, true, false),
                (None, Some(ty)) => (ty, false, true),
                (None, None) => unreachable!(),
            };
            elements.push(ScheduleElement {
                time,
                has_obs,
                has_output,
                index_obs: if has_obs { io } else { 0 },
                index_output: if has_output { iy } else { 0 },
            });
            if has_obs {
                io += 1;
            }
            if has_output {
                iy += 1;
            }
        }

        Ok(Schedule { elements, num_obs: obs_times.len(), num_outputs: output_times.len() })
    }

    /// Regular schedule over `[t0, t0 + k·dt]` observing and outputting at
    /// every point, including the initial one (which carries output index 0
    /// and, when `observe_first` is set, observation index 0).
    pub fn regular(t0: f64, dt: f64, k: usize, observe_first: bool) -> ScheduleResult<Schedule> {
        let output_times: Vec<f64> = (0..=k).map(|i| t0 + dt * i as f64).collect();
        let obs_times: Vec<f64> =
            if observe_first { output_times.clone() } else { output_times[1..].to_vec() };
        Schedule::from_points(&obs_times, &output_times)
    }

    /// Number of schedule elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the schedule has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at position `k`.
    pub fn element(&self, k: usize) -> &ScheduleElement {
        &self.elements[k]
    }

    /// All elements in order.
    pub fn elements(&self) -> &[ScheduleElement] {
        &self.elements
    }

    /// Number of observation points.
    pub fn num_obs(&self) -> usize {
        self.num_obs
    }

    /// Number of output points.
    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }
}

fn validate_points(points: &[f64], is_obs: bool) -> ScheduleResult<()> {
    for (i, &t) in points.iter().enumerate() {
        if !t.is_finite() {
            return Err(ScheduleError::NonFiniteTime { time: t });
        }
        if i > 0 && points[i - 1] >= t {
            let (prev, next) = (points[i - 1], t);
            return Err(if is_obs {
                ScheduleError::UnorderedObservationTimes { index: i, prev, next }
            } else {
                ScheduleError::UnorderedOutputTimes { index: i, prev, next }
            });
        }
    }
    Ok(())
}
