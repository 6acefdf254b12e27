//! Particle state: the P×N dynamic matrix plus the shared parameter vector.
//!
//! The dynamic matrix is owned [`HostMatrix`] storage (column-major, one
//! particle per row); the caller hands the whole `State` to the filter by
//! mutable reference and keeps ownership. Parameter entries are read-only
//! during a filter step; only `init` writes them.

use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

use crate::matrix::HostMatrix;
use crate::model::Model;

/// Mutable particle state handed to the filter.
#[derive(Debug, Clone)]
pub struct State {
    x: HostMatrix,
    theta: Array1<f64>,
}

impl State {
    /// Zero-initialized state for `particles` particles with `num_vars`
    /// dynamic variables and `num_params` shared parameters.
    pub fn new(particles: usize, num_vars: usize, num_params: usize) -> State {
        State { x: HostMatrix::zeros(particles, num_vars), theta: Array1::zeros(num_params) }
    }

    /// Zero-initialized state sized for `model`.
    pub fn for_model<M: Model>(model: &M, particles: usize) -> State {
        State::new(particles, model.num_vars(), model.num_params())
    }

    /// Number of particles.
    pub fn size(&self) -> usize {
        self.x.rows()
    }

    /// Number of dynamic state variables.
    pub fn num_vars(&self) -> usize {
        self.x.cols()
    }

    /// The dynamic state matrix.
    pub fn dyn_matrix(&self) -> &HostMatrix {
        &self.x
    }

    /// The dynamic state matrix, mutably.
    pub fn dyn_matrix_mut(&mut self) -> &mut HostMatrix {
        &mut self.x
    }

    /// Read-only view of the dynamic state.
    pub fn dyn_view(&self) -> ArrayView2<f64> {
        self.x.as_array()
    }

    /// Mutable view of the dynamic state.
    pub fn dyn_view_mut(&mut self) -> ArrayViewMut2<f64> {
        self.x.as_array_mut()
    }

    /// Shared parameter vector.
    pub fn params(&self) -> ArrayView1<f64> {
        self.theta.view()
    }

    /// Mutable shared parameter vector.
    pub fn params_mut(&mut self) -> ArrayViewMut1<f64> {
        self.theta.view_mut()
    }

    /// Split borrow: mutable dynamic state together with the read-only
    /// parameters. Used where a per-particle sweep needs both.
    pub fn parts_mut(&mut self) -> (ArrayViewMut2<'_, f64>, ArrayView1<'_, f64>) {
        (self.x.as_array_mut(), self.theta.view())
    }

    /// Overwrite the shared parameters.
    ///
    /// # Panics
    /// Panics unless `theta` has the state's parameter length.
    pub fn set_params(&mut self, theta: ArrayView1<f64>) {
        assert_eq!(theta.len(), self.theta.len(), "parameter vector length mismatch");
        self.theta.assign(&theta);
    }
}
