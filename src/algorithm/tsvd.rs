//! Truncated SVD dispatcher
//!
//! Validates parameters, forms the Gram matrix `G = XᵗX`, obtains its leading
//! eigenpairs from the selected strategy, and turns them into singular
//! triplets:
//!
//! ```text
//! wᵢ = √max(λᵢ, 0)
//! Q  = [q₀ … q_{k-1}]            [m, k]
//! U  = X Q diag(1/w)             [n, k]   (column i zero where wᵢ = 0)
//! ```

use super::power::{PowerOptions, power_eigen};
use super::solver::gram_eigen;
use super::types::{ComponentStats, GramEigen, rank_rtol};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::ops::{MatrixOps, SymmetricEigen, Transpose};
use crate::params::{Algorithm, Params};
use crate::runtime::cpu::{CpuDevice, CpuRuntime};
use crate::runtime::{Device, DeviceContext, Runtime, RuntimeClient};
use tracing::debug;

/// Result of a truncated SVD, resident on the device that computed it
///
/// Matrices are in the working precision of the call.
#[derive(Debug)]
pub struct TruncatedSvd<R: Runtime> {
    /// Right singular vectors `[m, k]`; column `i` is `qᵢ`
    pub q: DeviceMatrix<R>,
    /// Singular values, descending, `≥ 0`
    pub singular_values: Vec<f64>,
    /// Left singular vectors `[n, k]`; column `i` is `uᵢ`
    pub u: DeviceMatrix<R>,
    /// Convergence record per component
    pub stats: Vec<ComponentStats>,
    /// Variance of the data projected on each `qᵢ`
    pub explained_variance: Vec<f64>,
    /// `explained_variance` divided by the total variance of X
    pub explained_variance_ratio: Vec<f64>,
    /// Strategy that produced the eigenpairs
    pub algorithm: Algorithm,
}

impl<R: Runtime> TruncatedSvd<R> {
    /// Number of components
    pub fn k(&self) -> usize {
        self.singular_values.len()
    }

    /// Number of leading components with a non-zero singular value
    pub fn rank(&self) -> usize {
        self.singular_values.iter().take_while(|&&w| w > 0.0).count()
    }

    /// Rank-k approximation `U diag(w) Qᵗ`
    pub fn reconstruct<C: MatrixOps<R>>(&self, client: &C) -> Result<DeviceMatrix<R>> {
        let mut scaled = self.u.try_clone()?;
        client.scale_columns(&mut scaled, &self.singular_values)?;
        client.matmul(&scaled, Transpose::No, &self.q, Transpose::Yes)
    }
}

pub(crate) struct SingularTriplets<R: Runtime> {
    pub(crate) q: DeviceMatrix<R>,
    pub(crate) singular_values: Vec<f64>,
    pub(crate) u: DeviceMatrix<R>,
}

/// Adapt Gram eigenpairs of `x` into `(Q, w, U)`
pub(crate) fn singular_triplets<R, C>(
    client: &C,
    x: &DeviceMatrix<R>,
    eig: &GramEigen<R>,
) -> Result<SingularTriplets<R>>
where
    R: Runtime,
    C: MatrixOps<R>,
{
    let singular_values: Vec<f64> = eig.values.iter().map(|&l| l.max(0.0).sqrt()).collect();
    let inverse: Vec<f64> = singular_values
        .iter()
        .map(|&w| if w > 0.0 { 1.0 / w } else { 0.0 })
        .collect();

    let mut u = client.matmul(x, Transpose::No, &eig.vectors, Transpose::Yes)?;
    client.scale_columns(&mut u, &inverse)?;
    let q = client.transpose(&eig.vectors)?;

    Ok(SingularTriplets {
        q,
        singular_values,
        u,
    })
}

/// Per-component explained variance and its ratio to the total variance
///
/// With `X qᵢ = wᵢ uᵢ`, the variance of the projection is
/// `wᵢ² (‖uᵢ‖²/n − mean(uᵢ)²)`; the total is `(‖X‖²_F − n ‖mean(X)‖²) / n`.
/// A total lost in rounding counts as zero and yields zero ratios.
fn explained_variance<R, C>(
    client: &C,
    x: &DeviceMatrix<R>,
    u: &DeviceMatrix<R>,
    singular_values: &[f64],
) -> Result<(Vec<f64>, Vec<f64>)>
where
    R: Runtime,
    C: MatrixOps<R> + RuntimeClient<R>,
{
    let n = x.rows();
    let k = singular_values.len();
    let nf = n as f64;

    let ones = DeviceMatrix::from_f64(&vec![1.0; n], 1, n, x.dtype(), client.device())?;
    let col_sums = client.matmul(&ones, Transpose::No, x, Transpose::No)?;
    let frobenius = client.norm(x)?;
    let sums_norm = client.norm(&col_sums)?;
    let raw_total = (frobenius * frobenius - sums_norm * sums_norm / nf) / nf;
    // Below the cancellation error of the difference, X is constant per column.
    let floor = rank_rtol(x.dtype(), n, x.cols(), 0.0) * frobenius * frobenius / nf;
    let total = if raw_total > floor { raw_total } else { 0.0 };

    let u_sums = client
        .matmul(&ones, Transpose::No, u, Transpose::No)?
        .to_f64_vec()?;
    let u_gram = client.matmul(u, Transpose::Yes, u, Transpose::No)?.to_f64_vec()?;

    let variance: Vec<f64> = (0..k)
        .map(|i| {
            let mean = u_sums[i] / nf;
            let w = singular_values[i];
            (w * w * (u_gram[i * k + i] / nf - mean * mean)).max(0.0)
        })
        .collect();
    let ratio = variance
        .iter()
        .map(|&v| if total > 0.0 { v / total } else { 0.0 })
        .collect();

    Ok((variance, ratio))
}

/// Truncated SVD of a device-resident matrix
///
/// `x` must live on `ctx`'s device and match `params.rows × params.cols`.
/// Parameters are validated before any device work.
pub fn truncated_svd_matrix<R>(
    ctx: &DeviceContext<R>,
    x: &DeviceMatrix<R>,
    params: &Params,
) -> Result<TruncatedSvd<R>>
where
    R: Runtime,
    R::Client: MatrixOps<R> + SymmetricEigen<R>,
{
    params.validate_matrix(x.rows(), x.cols())?;
    if !x.device().is_same(ctx.device()) {
        return Err(Error::InvalidDevice {
            id: x.device().id(),
            reason: format!(
                "input lives on {}, call bound to {}",
                x.device().name(),
                ctx.device().name()
            ),
        });
    }

    let client = ctx.client();
    let dtype = params.precision.resolve(x.dtype());
    let converted;
    let xw = if dtype == x.dtype() {
        x
    } else {
        converted = client.cast(x, dtype)?;
        &converted
    };

    debug!(
        "truncated_svd: {}x{} k={} algorithm={} dtype={} runtime={}",
        params.rows,
        params.cols,
        params.k,
        params.algorithm,
        dtype,
        R::name()
    );

    let mut gram = client.matmul(xw, Transpose::Yes, xw, Transpose::No)?;
    let eig = match params.algorithm {
        Algorithm::Power => {
            let opts = PowerOptions {
                rank_rtol: Some(rank_rtol(dtype, params.rows, params.cols, params.tol)),
                ..PowerOptions::from(params)
            };
            power_eigen(client, &mut gram, params.k, &opts)?
        }
        Algorithm::Solver => {
            let rtol = rank_rtol(dtype, params.rows, params.cols, 0.0);
            gram_eigen(client, &gram, params.k, rtol)?
        }
    };
    drop(gram);

    let SingularTriplets {
        q,
        singular_values,
        u,
    } = singular_triplets(client, xw, &eig)?;
    let (explained_variance, explained_variance_ratio) =
        explained_variance(client, xw, &u, &singular_values)?;

    debug!(
        "truncated_svd: rank={} leading singular value={:e}",
        eig.rank(),
        singular_values.first().copied().unwrap_or(0.0)
    );

    Ok(TruncatedSvd {
        q,
        singular_values,
        u,
        stats: eig.stats,
        explained_variance,
        explained_variance_ratio,
        algorithm: params.algorithm,
    })
}

fn check_len(field: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::invalid_config(
            field,
            format!("buffer holds {} elements, expected {}", got, expected),
        ));
    }
    Ok(())
}

/// Truncated SVD of a row-major host matrix into caller-provided buffers
///
/// - `x`: `rows × cols`, row-major
/// - `q`: `cols × k`, receives `Q[j*k + i]` = entry `j` of `qᵢ`
/// - `w`: `k`, receives the singular values in descending order
/// - `u`: `rows × k`, receives `U[r*k + i]` = entry `r` of `uᵢ`
///
/// Runs on the host CPU when `params.gpu_id` is `None`, otherwise on that CUDA
/// device. Outputs are written only after the whole decomposition succeeded.
pub fn truncated_svd<T: Element>(
    x: &[T],
    q: &mut [T],
    w: &mut [T],
    u: &mut [T],
    params: &Params,
) -> Result<()> {
    params.validate()?;
    check_len("x", x.len(), params.rows * params.cols)?;
    check_len("q", q.len(), params.cols * params.k)?;
    check_len("w", w.len(), params.k)?;
    check_len("u", u.len(), params.rows * params.k)?;

    match params.gpu_id {
        None => {
            let ctx = DeviceContext::<CpuRuntime>::new(&CpuDevice::new())?;
            run_on(&ctx, x, q, w, u, params)
        }
        Some(id) => run_on_gpu(id, x, q, w, u, params),
    }
}

#[cfg(feature = "cuda")]
fn run_on_gpu<T: Element>(
    id: usize,
    x: &[T],
    q: &mut [T],
    w: &mut [T],
    u: &mut [T],
    params: &Params,
) -> Result<()> {
    use crate::runtime::cuda::{CudaDevice, CudaRuntime, device_count};

    let count = device_count().map_err(|e| Error::InvalidDevice {
        id,
        reason: format!("CUDA unavailable: {}", e),
    })?;
    if id >= count {
        return Err(Error::InvalidDevice {
            id,
            reason: format!("{} CUDA device(s) available", count),
        });
    }
    let ctx = DeviceContext::<CudaRuntime>::new(&CudaDevice::new(id))?;
    run_on(&ctx, x, q, w, u, params)
}

#[cfg(not(feature = "cuda"))]
fn run_on_gpu<T: Element>(
    id: usize,
    _x: &[T],
    _q: &mut [T],
    _w: &mut [T],
    _u: &mut [T],
    _params: &Params,
) -> Result<()> {
    Err(Error::InvalidDevice {
        id,
        reason: "built without the `cuda` feature".to_string(),
    })
}

fn run_on<R, T>(
    ctx: &DeviceContext<R>,
    x: &[T],
    q: &mut [T],
    w: &mut [T],
    u: &mut [T],
    params: &Params,
) -> Result<()>
where
    R: Runtime,
    R::Client: MatrixOps<R> + SymmetricEigen<R>,
    T: Element,
{
    let xm = DeviceMatrix::<R>::from_slice(x, params.rows, params.cols, ctx.device())?;
    let svd = truncated_svd_matrix(ctx, &xm, params)?;

    let q_host = svd.q.to_f64_vec()?;
    let u_host = svd.u.to_f64_vec()?;
    ctx.client().synchronize()?;

    for (dst, &src) in q.iter_mut().zip(&q_host) {
        *dst = T::from_f64(src);
    }
    for (dst, &src) in u.iter_mut().zip(&u_host) {
        *dst = T::from_f64(src);
    }
    for (dst, &src) in w.iter_mut().zip(&svd.singular_values) {
        *dst = T::from_f64(src);
    }
    Ok(())
}
