//! Direct-solver path: full symmetric eigendecomposition of the Gram matrix
//!
//! Delegates to the backend's [`SymmetricEigen`] (CPU: cyclic Jacobi, CUDA:
//! cuSOLVER `syevd`) and keeps the leading `k` eigenpairs.

use super::tsvd::{SingularTriplets, singular_triplets};
use super::types::{ComponentStats, GramEigen, rank_rtol};
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::ops::{MatrixOps, SymmetricEigen, Transpose, validate_square};
use crate::runtime::Runtime;

/// Leading `k` eigenpairs of the symmetric Gram matrix `gram`
///
/// Eigenvalues at or below `λ₀ · rtol` (and every one after them) are treated as
/// degenerate: zero value, zero vector.
pub fn gram_eigen<R, C>(
    client: &C,
    gram: &DeviceMatrix<R>,
    k: usize,
    rtol: f64,
) -> Result<GramEigen<R>>
where
    R: Runtime,
    C: SymmetricEigen<R>,
{
    let m = validate_square(gram)?;
    if k > m {
        return Err(Error::shape_mismatch(&[m], &[k]));
    }

    let full = client.eigh(gram)?;
    let mut vectors = full.vectors.leading_rows(k)?;
    let mut values: Vec<f64> = full.values.into_iter().take(k).collect();

    let lambda0 = values.first().copied().unwrap_or(0.0);
    let rank = values
        .iter()
        .enumerate()
        .take_while(|&(i, &v)| v.is_finite() && v > 0.0 && (i == 0 || v > lambda0 * rtol))
        .count();
    if rank < k {
        values[rank..].iter_mut().for_each(|v| *v = 0.0);
        vectors.zero_rows_from(rank)?;
    }

    Ok(GramEigen {
        values,
        vectors,
        stats: vec![ComponentStats::exact(); k],
    })
}

/// Every singular triplet of `x`, from a full Gram eigendecomposition
#[derive(Debug)]
pub struct FullDecomposition<R: Runtime> {
    /// Right singular vectors `[m, m]`, column `i` is `qᵢ`
    pub q: DeviceMatrix<R>,
    /// Singular values, descending
    pub singular_values: Vec<f64>,
    /// Left singular vectors `[n, m]`, column `i` is `uᵢ` (zero where `wᵢ = 0`)
    pub u: DeviceMatrix<R>,
}

/// Full decomposition of an `[n, m]` matrix via `eigh(XᵗX)`
///
/// Produces all `m` components; callers truncate. Components below the
/// rounding floor of the Gram product come back with zero singular value and
/// zero vectors.
pub fn solve_full<R, C>(client: &C, x: &DeviceMatrix<R>) -> Result<FullDecomposition<R>>
where
    R: Runtime,
    C: MatrixOps<R> + SymmetricEigen<R>,
{
    let m = x.cols();
    let gram = client.matmul(x, Transpose::Yes, x, Transpose::No)?;
    let rtol = rank_rtol(x.dtype(), x.rows(), m, 0.0);
    let eig = gram_eigen(client, &gram, m, rtol)?;

    let SingularTriplets {
        q,
        singular_values,
        u,
    } = singular_triplets(client, x, &eig)?;

    Ok(FullDecomposition {
        q,
        singular_values,
        u,
    })
}
