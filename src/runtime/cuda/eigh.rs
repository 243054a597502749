//! Symmetric eigendecomposition via cuSOLVER `syevd`

use super::client::check_cusolver;
use super::ops::dim;
use super::{CudaClient, CudaRuntime};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::ops::{SymmetricEigenDecomposition, validate_square};
use crate::runtime::{Runtime, RuntimeClient};
use cudarc::cusolver::sys as cusolver_sys;
use tracing::trace;

/// Full eigendecomposition of a symmetric matrix, eigenvalues descending
///
/// The row-major lower triangle is the column-major upper triangle, so the
/// solver is asked for `UPPER`. Eigenvectors come back as columns of the
/// column-major result, which are rows of the row-major buffer, in ascending
/// order; they are reversed on the device.
pub(super) fn syevd(
    client: &CudaClient,
    a: &DeviceMatrix<CudaRuntime>,
) -> Result<SymmetricEigenDecomposition<CudaRuntime>> {
    let n = validate_square(a)?;
    let dtype = a.dtype();
    let device = client.device();
    if n == 0 {
        return Ok(SymmetricEigenDecomposition {
            values: Vec::new(),
            vectors: DeviceMatrix::zeros(0, 0, dtype, device)?,
        });
    }

    client.bind()?;
    let handle = client.cusolver.raw();
    let order = dim(n)?;
    let jobz = cusolver_sys::cusolverEigMode_t::CUSOLVER_EIG_MODE_VECTOR;
    let uplo = cusolver_sys::cublasFillMode_t::CUBLAS_FILL_MODE_UPPER;

    // syevd overwrites its input with the eigenvectors.
    let work_matrix = a.try_clone()?;
    let values_dev = DeviceMatrix::zeros(n, 1, dtype, device)?;
    // 4-byte cell for the i32 status word
    let info = DeviceMatrix::zeros(1, 1, DType::F32, device)?;

    let mut lwork: i32 = 0;
    unsafe {
        let status = match dtype {
            DType::F32 => cusolver_sys::cusolverDnSsyevd_bufferSize(
                handle,
                jobz,
                uplo,
                order,
                work_matrix.ptr() as *const f32,
                order,
                values_dev.ptr() as *const f32,
                &mut lwork,
            ),
            DType::F64 => cusolver_sys::cusolverDnDsyevd_bufferSize(
                handle,
                jobz,
                uplo,
                order,
                work_matrix.ptr() as *const f64,
                order,
                values_dev.ptr() as *const f64,
                &mut lwork,
            ),
        };
        check_cusolver(status, "syevd_bufferSize")?;
    }

    let workspace = DeviceMatrix::zeros(lwork.max(1) as usize, 1, dtype, device)?;
    trace!("syevd: n={} dtype={} lwork={}", n, dtype, lwork);

    unsafe {
        let status = match dtype {
            DType::F32 => cusolver_sys::cusolverDnSsyevd(
                handle,
                jobz,
                uplo,
                order,
                work_matrix.ptr() as *mut f32,
                order,
                values_dev.ptr() as *mut f32,
                workspace.ptr() as *mut f32,
                lwork,
                info.ptr() as *mut i32,
            ),
            DType::F64 => cusolver_sys::cusolverDnDsyevd(
                handle,
                jobz,
                uplo,
                order,
                work_matrix.ptr() as *mut f64,
                order,
                values_dev.ptr() as *mut f64,
                workspace.ptr() as *mut f64,
                lwork,
                info.ptr() as *mut i32,
            ),
        };
        check_cusolver(status, "syevd")?;
    }
    client.synchronize()?;

    let info_word = info
        .to_vec::<f32>()?
        .first()
        .map(|v| i32::from_ne_bytes(v.to_ne_bytes()))
        .ok_or_else(|| Error::Backend("syevd returned no status".to_string()))?;
    if info_word != 0 {
        return Err(Error::Backend(format!("syevd failed with info={}", info_word)));
    }

    let mut values = values_dev.to_f64_vec()?;
    values.reverse();

    let vectors = DeviceMatrix::zeros(n, n, dtype, device)?;
    let row_bytes = n * dtype.size_in_bytes();
    for i in 0..n {
        CudaRuntime::copy_within_device(
            work_matrix.ptr() + ((n - 1 - i) * row_bytes) as u64,
            vectors.ptr() + (i * row_bytes) as u64,
            row_bytes,
            device,
        )?;
    }

    Ok(SymmetricEigenDecomposition { values, vectors })
}
