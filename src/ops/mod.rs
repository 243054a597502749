//! Matrix operations
//!
//! Operations are defined as traits implemented by each backend's client, which
//! gives them access to the device for allocating outputs.
//!
//! ```text
//! RuntimeClient<R>
//!   ├── implements MatrixOps<R>
//!   │     ├── matmul, transpose         (BLAS level 3)
//!   │     ├── rank_one_update           (BLAS level 2, ger)
//!   │     ├── dot, norm, scale, axpy    (BLAS level 1)
//!   │     └── scale_columns, cast
//!   └── implements SymmetricEigen<R>
//!         └── eigh                      (dense symmetric eigensolver)
//! ```
//!
//! Scalars cross this boundary as `f64` regardless of the matrix dtype. Vector
//! arguments may be either `n × 1` or `1 × n`; only their element count matters.

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::runtime::Runtime;

/// Whether an operand of [`MatrixOps::matmul`] is used transposed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transpose {
    /// Use the operand as stored
    No,
    /// Use the transpose of the operand
    Yes,
}

impl Transpose {
    /// Shape of `op(a)` for an operand of shape `[rows, cols]`
    #[inline]
    pub fn apply(self, shape: [usize; 2]) -> [usize; 2] {
        match self {
            Transpose::No => shape,
            Transpose::Yes => [shape[1], shape[0]],
        }
    }
}

/// Dense matrix operations on device-resident data
pub trait MatrixOps<R: Runtime> {
    /// Matrix multiplication: `op(a) @ op(b)`
    ///
    /// Returns a new `[rows(op(a)), cols(op(b))]` matrix. Fails with
    /// `ShapeMismatch` if the inner dimensions differ.
    fn matmul(
        &self,
        a: &DeviceMatrix<R>,
        trans_a: Transpose,
        b: &DeviceMatrix<R>,
        trans_b: Transpose,
    ) -> Result<DeviceMatrix<R>>;

    /// Materialized transpose
    fn transpose(&self, a: &DeviceMatrix<R>) -> Result<DeviceMatrix<R>>;

    /// Inner product of two vectors with the same element count
    fn dot(&self, a: &DeviceMatrix<R>, b: &DeviceMatrix<R>) -> Result<f64>;

    /// Euclidean norm (Frobenius norm for matrices)
    fn norm(&self, a: &DeviceMatrix<R>) -> Result<f64>;

    /// In-place scaling: `a ← alpha · a`
    fn scale(&self, a: &mut DeviceMatrix<R>, alpha: f64) -> Result<()>;

    /// In-place `y ← alpha · x + y`
    fn axpy(&self, alpha: f64, x: &DeviceMatrix<R>, y: &mut DeviceMatrix<R>) -> Result<()>;

    /// In-place rank-1 update: `a ← a + alpha · x yᵗ`
    ///
    /// `x` must have `rows(a)` elements and `y` must have `cols(a)` elements.
    fn rank_one_update(
        &self,
        a: &mut DeviceMatrix<R>,
        alpha: f64,
        x: &DeviceMatrix<R>,
        y: &DeviceMatrix<R>,
    ) -> Result<()>;

    /// In-place column scaling: column `j` of `a` is multiplied by `factors[j]`
    fn scale_columns(&self, a: &mut DeviceMatrix<R>, factors: &[f64]) -> Result<()>;

    /// Convert to another dtype (always a new allocation)
    fn cast(&self, a: &DeviceMatrix<R>, dtype: DType) -> Result<DeviceMatrix<R>>;
}

/// Full eigendecomposition of a symmetric matrix
#[derive(Debug)]
pub struct SymmetricEigenDecomposition<R: Runtime> {
    /// Eigenvalues sorted in descending order
    pub values: Vec<f64>,
    /// Eigenvectors as rows: row `i` belongs to `values[i]`
    pub vectors: DeviceMatrix<R>,
}

/// Dense symmetric eigensolver
pub trait SymmetricEigen<R: Runtime> {
    /// Eigendecomposition of a symmetric `[n, n]` matrix
    ///
    /// Only the lower triangle of `a` is referenced.
    fn eigh(&self, a: &DeviceMatrix<R>) -> Result<SymmetricEigenDecomposition<R>>;
}

/// Output shape of `op(a) @ op(b)`, or `None` if inner dimensions differ
pub fn matmul_output_shape(
    a: [usize; 2],
    trans_a: Transpose,
    b: [usize; 2],
    trans_b: Transpose,
) -> Option<[usize; 2]> {
    let [m, k] = trans_a.apply(a);
    let [k2, n] = trans_b.apply(b);
    (k == k2).then_some([m, n])
}

/// Validate operand dtypes agree
pub fn validate_same_dtype(lhs: DType, rhs: DType) -> Result<()> {
    if lhs != rhs {
        return Err(Error::DTypeMismatch { lhs, rhs });
    }
    Ok(())
}

/// Validate two vectors have the same element count and dtype
pub fn validate_vector_pair<R: Runtime>(a: &DeviceMatrix<R>, b: &DeviceMatrix<R>) -> Result<()> {
    validate_same_dtype(a.dtype(), b.dtype())?;
    if a.numel() != b.numel() {
        return Err(Error::shape_mismatch(&a.shape(), &b.shape()));
    }
    Ok(())
}

/// Validate a square matrix and return its order
pub fn validate_square<R: Runtime>(a: &DeviceMatrix<R>) -> Result<usize> {
    if a.rows() != a.cols() {
        return Err(Error::shape_mismatch(&[a.rows(), a.rows()], &a.shape()));
    }
    Ok(a.rows())
}

/// Validate the operands of [`MatrixOps::rank_one_update`]
pub fn validate_rank_one<R: Runtime>(
    a: &DeviceMatrix<R>,
    x: &DeviceMatrix<R>,
    y: &DeviceMatrix<R>,
) -> Result<()> {
    validate_same_dtype(a.dtype(), x.dtype())?;
    validate_same_dtype(a.dtype(), y.dtype())?;
    if !x.is_vector() || x.numel() != a.rows() {
        return Err(Error::shape_mismatch(&[a.rows(), 1], &x.shape()));
    }
    if !y.is_vector() || y.numel() != a.cols() {
        return Err(Error::shape_mismatch(&[1, a.cols()], &y.shape()));
    }
    Ok(())
}
