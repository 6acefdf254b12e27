//! Simulator: time advancement between schedule points.
//!
//! Purpose
//! -------
//! The filter driver never advances particles itself; it hands the state to
//! a [`Simulator`] and says "be at `next.time`". The simulator owns the
//! model binding, the observation store, and whatever machinery advancement
//! needs. [`OdeSimulator`] is the crate's implementation: deterministic
//! advancement through the adaptive RK4(3)5\[2R+\]C integrator, followed by
//! the model's discrete-time transition hook for stochastic dynamics.
//!
//! Key behaviors
//! -------------
//! - `init` places the simulator clock at the first schedule point and
//!   draws every particle's initial state from the model prior, or copies
//!   the caller-supplied initial states instead.
//! - `advance` integrates `[t, next.time]` only when the interval is
//!   non-empty, then applies the transition hook once per particle. The
//!   RNG is consumed here and never inside the integrator.
//! - `term` ends a run; the ODE simulator holds no per-run resources, so it
//!   is a no-op hook kept for simulators that do.

use ndarray::{ArrayView1, Axis};
use rand::rngs::StdRng;

use crate::filter::{ScheduleElement, State};
use crate::matrix::HostMatrix;
use crate::model::{Model, ObsStore};
use crate::ode::Rk43;

/// Time-advancement collaborator driven by the filter.
pub trait Simulator {
    /// The bound model type.
    type M: Model;

    /// The bound model.
    fn model(&self) -> &Self::M;

    /// The observation store consulted by the correction step.
    fn obs(&self) -> &ObsStore;

    /// Start a run at `now`, drawing initial states from the model prior
    /// or copying them from `in_init` (particles × variables) when given.
    ///
    /// Parameters in `s` are left as the caller set them.
    fn init(
        &mut self, rng: &mut StdRng, now: &ScheduleElement, s: &mut State,
        in_init: Option<&HostMatrix>,
    );

    /// Start a run at `now` with fixed parameters `theta`, drawing initial
    /// states from the model prior.
    fn init_with(
        &mut self, rng: &mut StdRng, theta: ArrayView1<f64>, now: &ScheduleElement, s: &mut State,
    );

    /// Advance every particle to `next.time`.
    fn advance(&mut self, rng: &mut StdRng, next: &ScheduleElement, s: &mut State);

    /// End a run.
    fn term(&mut self);
}

/// Simulator binding a model to the adaptive ODE integrator.
#[derive(Debug, Clone)]
pub struct OdeSimulator<M: Model> {
    model: M,
    obs: ObsStore,
    integrator: Rk43,
    t: f64,
}

impl<M: Model> OdeSimulator<M> {
    /// Bind `model` and its observations to an integrator.
    pub fn new(model: M, obs: ObsStore, integrator: Rk43) -> Self {
        OdeSimulator { model, obs, integrator, t: 0.0 }
    }

    /// Current simulator time.
    pub fn time(&self) -> f64 {
        self.t
    }

    fn draw_initial_states(&self, rng: &mut StdRng, t: f64, s: &mut State) {
        let (mut x, theta) = s.parts_mut();
        for row in x.axis_iter_mut(Axis(0)) {
            self.model.init(rng, t, theta.view(), row);
        }
    }
}

impl<M: Model> Simulator for OdeSimulator<M> {
    type M = M;

    fn model(&self) -> &M {
        &self.model
    }

    fn obs(&self) -> &ObsStore {
        &self.obs
    }

    fn init(
        &mut self, rng: &mut StdRng, now: &ScheduleElement, s: &mut State,
        in_init: Option<&HostMatrix>,
    ) {
        self.t = now.time;
        match in_init {
            Some(x0) => s.dyn_matrix_mut().assign(x0.view()),
            None => self.draw_initial_states(rng, now.time, s),
        }
    }

    fn init_with(
        &mut self, rng: &mut StdRng, theta: ArrayView1<f64>, now: &ScheduleElement, s: &mut State,
    ) {
        self.t = now.time;
        s.set_params(theta);
        self.draw_initial_states(rng, now.time, s);
    }

    fn advance(&mut self, rng: &mut StdRng, next: &ScheduleElement, s: &mut State) {
        let (t1, t2) = (self.t, next.time);
        if t2 > t1 {
            {
                let (x, theta) = s.parts_mut();
                self.integrator.integrate(&self.model, theta, t1, t2, x);
            }
            let (mut x, theta) = s.parts_mut();
            for (p, row) in x.axis_iter_mut(Axis(0)).enumerate() {
                self.model.transition(rng, t1, t2, p, theta.view(), row);
            }
        }
        self.t = t2;
    }

    fn term(&mut self) {}
}
