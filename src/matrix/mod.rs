//! Column-major dense matrix storage for particle state.
//!
//! Purpose
//! -------
//! Hold the P×N particle state matrix (P particles as rows, N state
//! variables as columns) in column-major order with an explicit leading
//! dimension, and give the rest of the crate three flavours of access that
//! share one contract:
//!
//! - [`HostMatrix`]: owning storage. Clones are deep; `resize` is available
//!   and infallible.
//! - [`MatrixRef`]: shallow read-only handle. Copies are cheap and never
//!   free anything.
//! - [`MatrixMut`]: shallow mutable handle with deep-assignment semantics.
//!   `resize` fails with [`MatrixError::ResizeForbidden`].
//!
//! Key behaviors
//! -------------
//! - Element access is `(row, col)` over a column-major layout, so
//!   `column(j)` is always a stride-1 view and `lead()` reports the column
//!   stride (the leading dimension of the backing buffer, `ld ≥ rows` for
//!   views carved out of a taller parent).
//! - `same` compares identity (buffer pointer, shape, leading dimension),
//!   not contents; deep assignment between distinct buffers therefore leaves
//!   `same == false` while making the elements equal.
//! - `resize(rows, cols, preserve)` reallocates and, when `preserve` is set,
//!   copies the overlapping min-rectangle of the old contents.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lead() >= max(1, rows())` always holds.
//! - Handles never outlive the storage they borrow (enforced by lifetimes)
//!   and never free it.
//! - Deep assignment requires exact shape equality; mismatches panic, they
//!   are not recoverable errors.
//!
//! Conventions
//! -----------
//! - Rows index particles, columns index state variables, throughout the
//!   crate.
//! - Kernels that want `ndarray` machinery (slicing, `Zip`, parallel axis
//!   iteration) use `as_array` / `as_array_mut` rather than growing this
//!   contract.

pub mod errors;

pub use self::errors::{MatrixError, MatrixResult};

use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, ShapeBuilder};

/// Owning column-major matrix.
///
/// The backing buffer is always allocated in F-order (column-major), so
/// `lead() == rows()` for owned storage and every column is contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMatrix {
    buf: Array2<f64>,
}

impl HostMatrix {
    /// Allocate a zero-filled `rows × cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        HostMatrix { buf: Array2::zeros((rows, cols).f()) }
    }

    /// Deep-copy an arbitrary `ndarray` matrix into owned column-major
    /// storage.
    pub fn from_array(a: ArrayView2<f64>) -> Self {
        let mut m = HostMatrix::zeros(a.nrows(), a.ncols());
        m.buf.assign(&a);
        m
    }

    /// Number of rows (particles).
    pub fn rows(&self) -> usize {
        self.buf.nrows()
    }

    /// Number of columns (state variables).
    pub fn cols(&self) -> usize {
        self.buf.ncols()
    }

    /// Leading dimension of the backing buffer.
    pub fn lead(&self) -> usize {
        lead_of(self.buf.strides(), self.buf.nrows())
    }

    /// Element at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.buf[[i, j]]
    }

    /// Overwrite the element at `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        self.buf[[i, j]] = v;
    }

    /// Stride-1 view of column `j`.
    pub fn column(&self, j: usize) -> ArrayView1<f64> {
        self.buf.column(j)
    }

    /// Mutable stride-1 view of column `j`.
    pub fn column_mut(&mut self, j: usize) -> ArrayViewMut1<f64> {
        self.buf.column_mut(j)
    }

    /// Zero every element.
    ///
    /// Owned storage is tight (`lead == rows`), so this is a single
    /// contiguous fill.
    pub fn clear(&mut self) {
        self.buf.fill(0.0);
    }

    /// True iff `other` is backed by the same buffer with the same shape and
    /// leading dimension.
    pub fn same(&self, other: &HostMatrix) -> bool {
        self.buf.as_ptr() == other.buf.as_ptr()
            && self.buf.dim() == other.buf.dim()
            && self.lead() == other.lead()
    }

    /// Exchange contents with `other` by swapping the owned buffers; no
    /// element copies.
    pub fn swap(&mut self, other: &mut HostMatrix) {
        std::mem::swap(&mut self.buf, &mut other.buf);
    }

    /// Deep-copy `other` into this matrix.
    ///
    /// # Panics
    /// Panics unless `other` has exactly this matrix's shape.
    pub fn assign(&mut self, other: MatrixRef<'_>) {
        assert_eq!(
            (self.rows(), self.cols()),
            (other.rows(), other.cols()),
            "deep matrix assignment requires equal shapes"
        );
        self.buf.assign(&other.view);
    }

    /// Reallocate to `rows × cols`.
    ///
    /// When `preserve` is set, the overlapping `min(rows) × min(cols)`
    /// rectangle of the old contents is copied into the new buffer; all
    /// other elements are zero. Infallible: only owning matrices expose
    /// this operation.
    pub fn resize(&mut self, rows: usize, cols: usize, preserve: bool) {
        if rows == self.rows() && cols == self.cols() {
            if !preserve {
                self.clear();
            }
            return;
        }
        let mut next: Array2<f64> = Array2::zeros((rows, cols).f());
        if preserve {
            let r = rows.min(self.rows());
            let c = cols.min(self.cols());
            next.slice_mut(s![..r, ..c]).assign(&self.buf.slice(s![..r, ..c]));
        }
        self.buf = next;
    }

    /// Shallow read-only handle over the whole matrix.
    pub fn view(&self) -> MatrixRef<'_> {
        MatrixRef { view: self.buf.view() }
    }

    /// Shallow mutable handle over the whole matrix.
    pub fn view_mut(&mut self) -> MatrixMut<'_> {
        MatrixMut { view: self.buf.view_mut() }
    }

    /// Borrow the backing `ndarray` view for kernel code.
    pub fn as_array(&self) -> ArrayView2<f64> {
        self.buf.view()
    }

    /// Mutably borrow the backing `ndarray` view for kernel code.
    pub fn as_array_mut(&mut self) -> ArrayViewMut2<f64> {
        self.buf.view_mut()
    }
}

/// Shallow read-only matrix handle: `(ptr, rows, cols, ld)` with no
/// ownership.
#[derive(Debug, Clone)]
pub struct MatrixRef<'a> {
    view: ArrayView2<'a, f64>,
}

impl<'a> MatrixRef<'a> {
    /// Wrap caller-owned column-major storage.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn from_slice(data: &'a [f64], rows: usize, cols: usize) -> Self {
        let view = ArrayView2::from_shape((rows, cols).f(), data)
            .expect("slice length must equal rows * cols");
        MatrixRef { view }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.view.nrows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.view.ncols()
    }

    /// Leading dimension of the viewed buffer.
    pub fn lead(&self) -> usize {
        lead_of(self.view.strides(), self.view.nrows())
    }

    /// Element at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.view[[i, j]]
    }

    /// Stride-1 view of column `j`.
    pub fn column(&self, j: usize) -> ArrayView1<'_, f64> {
        self.view.column(j)
    }

    /// True iff `other` views the same buffer with the same shape and
    /// leading dimension.
    pub fn same(&self, other: &MatrixRef<'_>) -> bool {
        self.view.as_ptr() == other.view.as_ptr()
            && self.view.dim() == other.view.dim()
            && self.lead() == other.lead()
    }

    /// The underlying `ndarray` view.
    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.view.view()
    }
}

/// Shallow mutable matrix handle with deep-assignment semantics.
#[derive(Debug)]
pub struct MatrixMut<'a> {
    view: ArrayViewMut2<'a, f64>,
}

impl<'a> MatrixMut<'a> {
    /// Wrap caller-owned column-major storage mutably.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn from_slice(data: &'a mut [f64], rows: usize, cols: usize) -> Self {
        let view = ArrayViewMut2::from_shape((rows, cols).f(), data)
            .expect("slice length must equal rows * cols");
        MatrixMut { view }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.view.nrows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.view.ncols()
    }

    /// Leading dimension of the viewed buffer.
    pub fn lead(&self) -> usize {
        lead_of(self.view.strides(), self.view.nrows())
    }

    /// Element at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.view[[i, j]]
    }

    /// Overwrite the element at `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        self.view[[i, j]] = v;
    }

    /// Mutable stride-1 view of column `j`.
    pub fn column_mut(&mut self, j: usize) -> ArrayViewMut1<'_, f64> {
        self.view.column_mut(j)
    }

    /// Zero every element of the viewed region.
    pub fn clear(&mut self) {
        self.view.fill(0.0);
    }

    /// Deep-copy `other`'s elements into the viewed storage.
    ///
    /// # Panics
    /// Panics unless `other` has exactly this view's shape.
    pub fn assign(&mut self, other: MatrixRef<'_>) {
        assert_eq!(
            (self.rows(), self.cols()),
            (other.rows(), other.cols()),
            "deep matrix assignment requires equal shapes"
        );
        self.view.assign(&other.view);
    }

    /// Views borrow external storage and may never reallocate it.
    ///
    /// # Errors
    /// Always returns [`MatrixError::ResizeForbidden`].
    pub fn resize(&mut self, rows: usize, cols: usize, _preserve: bool) -> MatrixResult<()> {
        Err(MatrixError::ResizeForbidden { rows, cols })
    }

    /// Reborrow as a read-only handle.
    pub fn as_ref(&self) -> MatrixRef<'_> {
        MatrixRef { view: self.view.view() }
    }

    /// The underlying mutable `ndarray` view.
    pub fn as_array_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.view.view_mut()
    }
}

/// Column stride in elements, with the `ld >= max(1, rows)` floor applied.
fn lead_of(strides: &[isize], rows: usize) -> usize {
    (strides[1].unsigned_abs()).max(rows).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    // ------------------------------------------------------------------
    // Scope
    // -----
    // - Identity (`same`) vs contents (deep assignment) semantics.
    // - Column-major layout: contiguous columns, leading dimension of
    //   row-sliced views.
    // - resize on owners (preserve / discard) and ResizeForbidden on
    //   borrowing handles over external storage.
    // ------------------------------------------------------------------

    fn counting_matrix(rows: usize, cols: usize) -> HostMatrix {
        let mut m = HostMatrix::zeros(rows, cols);
        for j in 0..cols {
            for i in 0..rows {
                m.set(i, j, (j * rows + i) as f64);
            }
        }
        m
    }

    #[test]
    fn same_is_reflexive_and_rejects_distinct_buffers() {
        let a = counting_matrix(4, 3);
        let b = a.clone();
        assert!(a.same(&a));
        assert!(!a.same(&b), "a deep clone must not share identity");
    }

    #[test]
    fn deep_assignment_copies_elements_without_sharing_identity() {
        let a = counting_matrix(5, 2);
        let mut b = HostMatrix::zeros(5, 2);
        b.assign(a.view());
        assert!(!a.same(&b));
        for j in 0..2 {
            for i in 0..5 {
                assert_abs_diff_eq!(a.get(i, j), b.get(i, j));
            }
        }
    }

    #[test]
    #[should_panic(expected = "equal shapes")]
    fn deep_assignment_panics_on_shape_mismatch() {
        let a = counting_matrix(4, 3);
        let mut b = HostMatrix::zeros(3, 4);
        b.assign(a.view());
    }

    #[test]
    fn columns_are_contiguous_in_memory() {
        let m = counting_matrix(6, 4);
        let col = m.column(2);
        assert!(col.as_slice().is_some(), "column of an F-order matrix must be stride-1");
        assert_abs_diff_eq!(col[0], 12.0);
        assert_abs_diff_eq!(col[5], 17.0);
    }

    #[test]
    fn owned_storage_is_tight_and_lead_tracks_rows() {
        let m = counting_matrix(7, 3);
        assert_eq!(m.lead(), 7);
        assert_eq!(m.rows(), 7);
    }

    #[test]
    fn swap_exchanges_buffers_without_copying() {
        let mut a = counting_matrix(3, 2);
        let mut b = HostMatrix::zeros(3, 2);
        let a_ptr = a.as_array().as_ptr();
        a.swap(&mut b);
        assert_eq!(b.as_array().as_ptr(), a_ptr);
        assert_abs_diff_eq!(a.get(2, 1), 0.0);
        assert_abs_diff_eq!(b.get(2, 1), 5.0);
    }

    #[test]
    fn clear_zeroes_every_element() {
        let mut m = counting_matrix(4, 4);
        m.clear();
        assert!(m.as_array().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn resize_with_preserve_keeps_the_overlapping_rectangle() {
        let mut m = counting_matrix(3, 3);
        m.resize(5, 2, true);
        assert_eq!((m.rows(), m.cols()), (5, 2));
        // Old (i, j) for i < 3, j < 2 survives; the grown rows are zero.
        assert_abs_diff_eq!(m.get(2, 1), 5.0);
        assert_abs_diff_eq!(m.get(4, 1), 0.0);
    }

    #[test]
    fn resize_without_preserve_discards_contents() {
        let mut m = counting_matrix(3, 3);
        m.resize(3, 3, false);
        assert!(m.as_array().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn resize_on_a_view_over_external_storage_is_forbidden() {
        let mut backing = vec![1.0; 12];
        let mut view = MatrixMut::from_slice(&mut backing, 4, 3);
        let err = view.resize(8, 3, true).unwrap_err();
        assert_eq!(err, MatrixError::ResizeForbidden { rows: 8, cols: 3 });
        // The storage is untouched by the failed call.
        assert!(backing.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn from_array_deep_copies_into_tight_column_major_storage() {
        let a = ndarray::array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let m = HostMatrix::from_array(a.view());
        assert_eq!((m.rows(), m.cols(), m.lead()), (3, 2, 3));
        assert_abs_diff_eq!(m.get(2, 1), 6.0);
        assert!(m.column(0).as_slice().is_some());
    }

    #[test]
    fn external_column_major_storage_reads_back_by_column() {
        let backing: Vec<f64> = (0..6).map(f64::from).collect();
        let view = MatrixRef::from_slice(&backing, 3, 2);
        // Column-major: element (i, j) sits at i + j * ld.
        assert_abs_diff_eq!(view.get(0, 1), 3.0);
        assert_abs_diff_eq!(view.get(2, 0), 2.0);
        assert_eq!(view.lead(), 3);
    }
}
