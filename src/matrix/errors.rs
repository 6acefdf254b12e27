//! Errors for the dense-matrix layer.
//!
//! Kept deliberately small: shape mismatches on deep assignment are
//! programming errors and panic (matching `ndarray`'s own convention), so
//! the only recoverable condition is an attempt to reallocate storage that
//! the matrix does not own.

/// Result alias for matrix operations that may produce [`MatrixError`].
pub type MatrixResult<T> = Result<T, MatrixError>;

/// Error type for dense-matrix storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// `resize` was called on a borrowing handle. Views never own their
    /// buffer and may not reallocate it; only [`HostMatrix`] can resize.
    ///
    /// [`HostMatrix`]: crate::matrix::HostMatrix
    ResizeForbidden {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
    },
}

impl std::error::Error for MatrixError {}

impl std::fmt::Display for MatrixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatrixError::ResizeForbidden { rows, cols } => write!(
                f,
                "cannot resize a borrowed matrix view to {rows}x{cols}: \
                 views do not own their storage"
            ),
        }
    }
}
