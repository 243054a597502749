//! Power-iteration engine with explicit deflation
//!
//! Extracts the leading eigenpairs of a symmetric positive semi-definite Gram
//! matrix one at a time.
//!
//! # Algorithm
//!
//! ```text
//! FOR i = 0..k:
//!   v ← N(0, 1)^m from StdRng(random_state + i), normalized
//!   REPEAT up to n_iter times:
//!     v' ← G v / ‖G v‖
//!     δ  ← ‖v' − v‖
//!     v  ← v'
//!     stop if δ < tol
//!   λᵢ ← vᵗ G v
//!   stop if λᵢ is degenerate (remaining components are zero)
//!   G  ← G − λᵢ v vᵗ
//! sort the extracted components by descending λ
//! ```
//!
//! Every step runs on the device through [`MatrixOps`]; the host only draws the
//! start vectors and reads back scalars.

use super::outer::{OuterSign, outer_product};
use super::types::{ComponentStats, GramEigen, rank_rtol};
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::ops::{MatrixOps, Transpose, validate_square};
use crate::params::Params;
use crate::runtime::{Runtime, RuntimeClient};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::{debug, info, trace};

/// Configuration for [`power_eigen`]
#[derive(Debug, Clone, PartialEq)]
pub struct PowerOptions {
    /// Maximum iterations per component (default: 100)
    pub n_iter: usize,
    /// Early-stop threshold on `‖v' − v‖`; `≤ 0` disables it (default: 1e-5)
    pub tol: f64,
    /// Seed of the first component's start vector (default: 0)
    pub random_state: u64,
    /// Log component summaries at `info` (default: false)
    pub verbose: bool,
    /// Relative eigenvalue floor for degeneracy; `None` derives it from the
    /// Gram matrix's dtype and order (see [`rank_rtol`])
    pub rank_rtol: Option<f64>,
}

impl Default for PowerOptions {
    fn default() -> Self {
        Self {
            n_iter: 100,
            tol: 1e-5,
            random_state: 0,
            verbose: false,
            rank_rtol: None,
        }
    }
}

impl From<&Params> for PowerOptions {
    fn from(params: &Params) -> Self {
        Self {
            n_iter: params.n_iter,
            tol: params.tol,
            random_state: params.random_state,
            verbose: params.verbose,
            rank_rtol: None,
        }
    }
}

/// Unit-norm standard normal start vector for one component
pub fn start_vector(m: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = StandardNormal;
    let mut v: Vec<f64> = (0..m).map(|_| normal.sample(&mut rng)).collect();

    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    } else if let Some(first) = v.first_mut() {
        *first = 1.0;
    }
    v
}

/// Outcome of iterating one component
struct Iterate<R: Runtime> {
    v: DeviceMatrix<R>,
    stats: ComponentStats,
    /// `G v` vanished or overflowed; `v` is not meaningful
    collapsed: bool,
}

fn iterate<R, C>(
    client: &C,
    gram: &DeviceMatrix<R>,
    mut v: DeviceMatrix<R>,
    opts: &PowerOptions,
    component: usize,
) -> Result<Iterate<R>>
where
    R: Runtime,
    C: MatrixOps<R>,
{
    let mut stats = ComponentStats::skipped();

    for step in 0..opts.n_iter {
        let mut next = client.matmul(gram, Transpose::No, &v, Transpose::No)?;
        let norm = client.norm(&next)?;
        if norm == 0.0 || !norm.is_finite() {
            return Ok(Iterate {
                v,
                stats,
                collapsed: true,
            });
        }
        client.scale(&mut next, 1.0 / norm)?;

        // v ← v − v' leaves the difference in the old buffer.
        client.axpy(-1.0, &next, &mut v)?;
        let delta = client.norm(&v)?;
        v = next;

        stats.iterations = step + 1;
        stats.delta = delta;
        trace!("component {} step {}: delta={:e}", component, step + 1, delta);

        if opts.tol > 0.0 && delta < opts.tol {
            stats.converged = true;
            break;
        }
    }

    Ok(Iterate {
        v,
        stats,
        collapsed: false,
    })
}

/// Leading `k` eigenpairs of the symmetric Gram matrix `gram` by power iteration
///
/// `gram` is deflated in place and holds the residual `G − Σ λᵢ qᵢ qᵢᵗ` on
/// return. Components whose eigenvalue falls below the degeneracy floor
/// (relative to the largest eigenvalue found so far), and all components after
/// them, are returned as zero values with zero vectors. The remaining
/// components are sorted by descending eigenvalue.
/// Running out of iterations is not an error; see [`ComponentStats`].
///
/// Returns `ShapeMismatch` if `gram` is not square or `k` exceeds its order.
pub fn power_eigen<R, C>(
    client: &C,
    gram: &mut DeviceMatrix<R>,
    k: usize,
    opts: &PowerOptions,
) -> Result<GramEigen<R>>
where
    R: Runtime,
    C: MatrixOps<R> + RuntimeClient<R>,
{
    let m = validate_square(gram)?;
    if k > m {
        return Err(Error::shape_mismatch(&[m], &[k]));
    }
    let dtype = gram.dtype();
    let rtol = opts
        .rank_rtol
        .unwrap_or_else(|| rank_rtol(dtype, m, m, opts.tol));

    let mut vectors = DeviceMatrix::zeros(k, m, dtype, client.device())?;
    let mut values = vec![0.0f64; k];
    let mut stats = vec![ComponentStats::skipped(); k];
    let mut lambda_max = 0.0f64;
    let mut rank = 0;

    for i in 0..k {
        let seed = opts.random_state.wrapping_add(i as u64);
        let start = DeviceMatrix::from_f64(&start_vector(m, seed), m, 1, dtype, client.device())?;
        let it = iterate(client, gram, start, opts, i)?;
        stats[i] = it.stats;

        let lambda = if it.collapsed {
            0.0
        } else {
            let gv = client.matmul(gram, Transpose::No, &it.v, Transpose::No)?;
            client.dot(&it.v, &gv)?
        };

        let floor = lambda_max * rtol;
        if it.collapsed || !lambda.is_finite() || lambda <= floor {
            debug!(
                "component {}: degenerate (lambda={:e}, floor={:e}), zeroing {} remaining",
                i,
                lambda,
                floor,
                k - i
            );
            break;
        }
        lambda_max = lambda_max.max(lambda);

        let vt = it.v.transposed_vector()?;
        outer_product(client, gram, lambda, &it.v, &vt, OuterSign::Subtract)?;
        vectors.copy_row_from(i, &it.v)?;
        values[i] = lambda;
        rank = i + 1;

        let s = &stats[i];
        if opts.verbose {
            info!(
                "component {}: lambda={:e} iterations={} converged={} delta={:e}",
                i, lambda, s.iterations, s.converged, s.delta
            );
        } else {
            debug!(
                "component {}: lambda={:e} iterations={} converged={} delta={:e}",
                i, lambda, s.iterations, s.converged, s.delta
            );
        }
    }

    let vectors = sort_descending(&mut values[..rank], &mut stats[..rank], vectors)?;

    Ok(GramEigen {
        values,
        vectors,
        stats,
    })
}

/// Reorder the extracted components by descending eigenvalue
///
/// Extraction order is not value order when an earlier component stopped
/// before converging or two eigenvalues are close. The sort is stable, so
/// ties keep extraction order. Rows past `values.len()` are left in place.
fn sort_descending<R: Runtime>(
    values: &mut [f64],
    stats: &mut [ComponentStats],
    vectors: DeviceMatrix<R>,
) -> Result<DeviceMatrix<R>> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    if order.iter().enumerate().all(|(i, &j)| i == j) {
        return Ok(vectors);
    }
    debug!("reordering components by eigenvalue: {:?}", order);

    let mut sorted = vectors.try_clone()?;
    for (dst, &src) in order.iter().enumerate() {
        sorted.copy_row_from(dst, &vectors.row(src)?)?;
    }

    let old_values = values.to_vec();
    let old_stats = stats.to_vec();
    for (dst, &src) in order.iter().enumerate() {
        values[dst] = old_values[src];
        stats[dst] = old_stats[src];
    }
    Ok(sorted)
}
