//! MatrixOps and SymmetricEigen implementations for CUDA runtime
//!
//! Every operation maps onto a single cuBLAS routine (or one per column for
//! `scale_columns`). Scalars are passed and returned through host pointers.
//! `cast` goes through the host; it runs once per call at most.

use super::eigh::syevd;
use super::{CudaClient, CudaRuntime};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::ops::{
    MatrixOps, SymmetricEigen, SymmetricEigenDecomposition, Transpose, matmul_output_shape,
    validate_rank_one, validate_same_dtype, validate_vector_pair,
};
use cudarc::cublas::sys::{self as cublas_sys, cublasOperation_t, cublasStatus_t};

// ============================================================================
// Helper Functions
// ============================================================================

/// Map a cuBLAS status to `Error::Backend`
#[inline]
fn check_cublas(status: cublasStatus_t, op: &str) -> Result<()> {
    if status != cublasStatus_t::CUBLAS_STATUS_SUCCESS {
        return Err(Error::Backend(format!("cuBLAS {} failed: {:?}", op, status)));
    }
    Ok(())
}

/// Dimension as the `int` cuBLAS expects
#[inline]
pub(super) fn dim(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| Error::Backend(format!("dimension {} exceeds i32 range", n)))
}

#[inline]
fn op(trans: Transpose) -> cublasOperation_t {
    match trans {
        Transpose::No => cublasOperation_t::CUBLAS_OP_N,
        Transpose::Yes => cublasOperation_t::CUBLAS_OP_T,
    }
}

/// Bind the client's context and return the cuBLAS handle in host pointer mode
fn blas_handle(client: &CudaClient) -> Result<cublas_sys::cublasHandle_t> {
    client.bind()?;
    let handle = *client.cublas.handle();
    unsafe {
        check_cublas(
            cublas_sys::cublasSetPointerMode_v2(
                handle,
                cublas_sys::cublasPointerMode_t::CUBLAS_POINTER_MODE_HOST,
            ),
            "set pointer mode",
        )?;
    }
    Ok(handle)
}

// ============================================================================
// cuBLAS GEMM Implementation
// ============================================================================

/// `C = op(A) @ op(B)` for row-major operands
///
/// cuBLAS sees each row-major buffer as its column-major transpose, so it is
/// asked for `Cᵗ = op(B)ᵗ op(A)ᵗ`: operands swapped, flags unchanged.
fn gemm(
    client: &CudaClient,
    a: &DeviceMatrix<CudaRuntime>,
    trans_a: Transpose,
    b: &DeviceMatrix<CudaRuntime>,
    trans_b: Transpose,
    out: &mut DeviceMatrix<CudaRuntime>,
    k: usize,
) -> Result<()> {
    let [m, n] = out.shape();
    let handle = blas_handle(client)?;
    let (cm, cn, ck) = (dim(n)?, dim(m)?, dim(k)?);
    let (ldb, lda, ldc) = (dim(b.cols())?, dim(a.cols())?, dim(n)?);

    let status = unsafe {
        match out.dtype() {
            DType::F32 => {
                let (alpha, beta) = (1.0f32, 0.0f32);
                cublas_sys::cublasSgemm_v2(
                    handle,
                    op(trans_b),
                    op(trans_a),
                    cm,
                    cn,
                    ck,
                    &alpha,
                    b.ptr() as *const f32, // B becomes first matrix
                    ldb,
                    a.ptr() as *const f32, // A becomes second matrix
                    lda,
                    &beta,
                    out.ptr() as *mut f32,
                    ldc,
                )
            }
            DType::F64 => {
                let (alpha, beta) = (1.0f64, 0.0f64);
                cublas_sys::cublasDgemm_v2(
                    handle,
                    op(trans_b),
                    op(trans_a),
                    cm,
                    cn,
                    ck,
                    &alpha,
                    b.ptr() as *const f64,
                    ldb,
                    a.ptr() as *const f64,
                    lda,
                    &beta,
                    out.ptr() as *mut f64,
                    ldc,
                )
            }
        }
    };
    check_cublas(status, "gemm")
}

// ============================================================================
// MatrixOps Implementation
// ============================================================================

impl MatrixOps<CudaRuntime> for CudaClient {
    fn matmul(
        &self,
        a: &DeviceMatrix<CudaRuntime>,
        trans_a: Transpose,
        b: &DeviceMatrix<CudaRuntime>,
        trans_b: Transpose,
    ) -> Result<DeviceMatrix<CudaRuntime>> {
        validate_same_dtype(a.dtype(), b.dtype())?;
        let [m, n] = matmul_output_shape(a.shape(), trans_a, b.shape(), trans_b)
            .ok_or_else(|| Error::shape_mismatch(&a.shape(), &b.shape()))?;
        let k = trans_a.apply(a.shape())[1];

        let mut out = DeviceMatrix::zeros(m, n, a.dtype(), &self.device)?;
        if m == 0 || n == 0 || k == 0 {
            return Ok(out);
        }
        gemm(self, a, trans_a, b, trans_b, &mut out, k)?;
        Ok(out)
    }

    fn transpose(&self, a: &DeviceMatrix<CudaRuntime>) -> Result<DeviceMatrix<CudaRuntime>> {
        let [rows, cols] = a.shape();
        let out = DeviceMatrix::zeros(cols, rows, a.dtype(), &self.device)?;
        if a.is_empty() {
            return Ok(out);
        }
        let handle = blas_handle(self)?;
        let (m, n, lda, ldc) = (dim(rows)?, dim(cols)?, dim(cols)?, dim(rows)?);
        let (op_t, op_n) = (cublasOperation_t::CUBLAS_OP_T, cublasOperation_t::CUBLAS_OP_N);

        // beta = 0 with B aliased to C is the documented in-place form of geam.
        let status = unsafe {
            match a.dtype() {
                DType::F32 => {
                    let (alpha, beta) = (1.0f32, 0.0f32);
                    cublas_sys::cublasSgeam(
                        handle,
                        op_t,
                        op_n,
                        m,
                        n,
                        &alpha,
                        a.ptr() as *const f32,
                        lda,
                        &beta,
                        out.ptr() as *const f32,
                        ldc,
                        out.ptr() as *mut f32,
                        ldc,
                    )
                }
                DType::F64 => {
                    let (alpha, beta) = (1.0f64, 0.0f64);
                    cublas_sys::cublasDgeam(
                        handle,
                        op_t,
                        op_n,
                        m,
                        n,
                        &alpha,
                        a.ptr() as *const f64,
                        lda,
                        &beta,
                        out.ptr() as *const f64,
                        ldc,
                        out.ptr() as *mut f64,
                        ldc,
                    )
                }
            }
        };
        check_cublas(status, "geam")?;
        Ok(out)
    }

    fn dot(&self, a: &DeviceMatrix<CudaRuntime>, b: &DeviceMatrix<CudaRuntime>) -> Result<f64> {
        validate_vector_pair(a, b)?;
        if a.is_empty() {
            return Ok(0.0);
        }
        let handle = blas_handle(self)?;
        let n = dim(a.numel())?;

        unsafe {
            match a.dtype() {
                DType::F32 => {
                    let mut result = 0.0f32;
                    check_cublas(
                        cublas_sys::cublasSdot_v2(
                            handle,
                            n,
                            a.ptr() as *const f32,
                            1,
                            b.ptr() as *const f32,
                            1,
                            &mut result,
                        ),
                        "dot",
                    )?;
                    Ok(result as f64)
                }
                DType::F64 => {
                    let mut result = 0.0f64;
                    check_cublas(
                        cublas_sys::cublasDdot_v2(
                            handle,
                            n,
                            a.ptr() as *const f64,
                            1,
                            b.ptr() as *const f64,
                            1,
                            &mut result,
                        ),
                        "dot",
                    )?;
                    Ok(result)
                }
            }
        }
    }

    fn norm(&self, a: &DeviceMatrix<CudaRuntime>) -> Result<f64> {
        if a.is_empty() {
            return Ok(0.0);
        }
        let handle = blas_handle(self)?;
        let n = dim(a.numel())?;

        unsafe {
            match a.dtype() {
                DType::F32 => {
                    let mut result = 0.0f32;
                    check_cublas(
                        cublas_sys::cublasSnrm2_v2(handle, n, a.ptr() as *const f32, 1, &mut result),
                        "nrm2",
                    )?;
                    Ok(result as f64)
                }
                DType::F64 => {
                    let mut result = 0.0f64;
                    check_cublas(
                        cublas_sys::cublasDnrm2_v2(handle, n, a.ptr() as *const f64, 1, &mut result),
                        "nrm2",
                    )?;
                    Ok(result)
                }
            }
        }
    }

    fn scale(&self, a: &mut DeviceMatrix<CudaRuntime>, alpha: f64) -> Result<()> {
        if a.is_empty() {
            return Ok(());
        }
        let handle = blas_handle(self)?;
        scal(handle, a.dtype(), dim(a.numel())?, alpha, a.ptr(), 1)
    }

    fn axpy(
        &self,
        alpha: f64,
        x: &DeviceMatrix<CudaRuntime>,
        y: &mut DeviceMatrix<CudaRuntime>,
    ) -> Result<()> {
        validate_vector_pair(x, y)?;
        if y.is_empty() {
            return Ok(());
        }
        let handle = blas_handle(self)?;
        let n = dim(y.numel())?;

        let status = unsafe {
            match y.dtype() {
                DType::F32 => {
                    let alpha = alpha as f32;
                    cublas_sys::cublasSaxpy_v2(
                        handle,
                        n,
                        &alpha,
                        x.ptr() as *const f32,
                        1,
                        y.ptr() as *mut f32,
                        1,
                    )
                }
                DType::F64 => cublas_sys::cublasDaxpy_v2(
                    handle,
                    n,
                    &alpha,
                    x.ptr() as *const f64,
                    1,
                    y.ptr() as *mut f64,
                    1,
                ),
            }
        };
        check_cublas(status, "axpy")
    }

    fn rank_one_update(
        &self,
        a: &mut DeviceMatrix<CudaRuntime>,
        alpha: f64,
        x: &DeviceMatrix<CudaRuntime>,
        y: &DeviceMatrix<CudaRuntime>,
    ) -> Result<()> {
        validate_rank_one(a, x, y)?;
        if a.is_empty() {
            return Ok(());
        }
        let handle = blas_handle(self)?;
        // Column-major view: Aᵗ ← Aᵗ + alpha · y xᵗ
        let (m, n, lda) = (dim(a.cols())?, dim(a.rows())?, dim(a.cols())?);

        let status = unsafe {
            match a.dtype() {
                DType::F32 => {
                    let alpha = alpha as f32;
                    cublas_sys::cublasSger_v2(
                        handle,
                        m,
                        n,
                        &alpha,
                        y.ptr() as *const f32,
                        1,
                        x.ptr() as *const f32,
                        1,
                        a.ptr() as *mut f32,
                        lda,
                    )
                }
                DType::F64 => cublas_sys::cublasDger_v2(
                    handle,
                    m,
                    n,
                    &alpha,
                    y.ptr() as *const f64,
                    1,
                    x.ptr() as *const f64,
                    1,
                    a.ptr() as *mut f64,
                    lda,
                ),
            }
        };
        check_cublas(status, "ger")
    }

    fn scale_columns(&self, a: &mut DeviceMatrix<CudaRuntime>, factors: &[f64]) -> Result<()> {
        if factors.len() != a.cols() {
            return Err(Error::shape_mismatch(&[a.cols()], &[factors.len()]));
        }
        if a.is_empty() {
            return Ok(());
        }
        let handle = blas_handle(self)?;
        let (rows, stride) = (dim(a.rows())?, dim(a.cols())?);
        let elem = a.dtype().size_in_bytes() as u64;

        for (j, &factor) in factors.iter().enumerate() {
            if factor == 1.0 {
                continue;
            }
            scal(handle, a.dtype(), rows, factor, a.ptr() + j as u64 * elem, stride)?;
        }
        Ok(())
    }

    fn cast(&self, a: &DeviceMatrix<CudaRuntime>, dtype: DType) -> Result<DeviceMatrix<CudaRuntime>> {
        if a.dtype() == dtype {
            return a.try_clone();
        }
        let host = a.to_f64_vec()?;
        DeviceMatrix::from_f64(&host, a.rows(), a.cols(), dtype, &self.device)
    }
}

/// `x ← alpha · x` over `n` elements spaced `incx` apart
fn scal(
    handle: cublas_sys::cublasHandle_t,
    dtype: DType,
    n: i32,
    alpha: f64,
    ptr: u64,
    incx: i32,
) -> Result<()> {
    let status = unsafe {
        match dtype {
            DType::F32 => {
                let alpha = alpha as f32;
                cublas_sys::cublasSscal_v2(handle, n, &alpha, ptr as *mut f32, incx)
            }
            DType::F64 => cublas_sys::cublasDscal_v2(handle, n, &alpha, ptr as *mut f64, incx),
        }
    };
    check_cublas(status, "scal")
}

// ============================================================================
// SymmetricEigen Implementation
// ============================================================================

impl SymmetricEigen<CudaRuntime> for CudaClient {
    fn eigh(
        &self,
        a: &DeviceMatrix<CudaRuntime>,
    ) -> Result<SymmetricEigenDecomposition<CudaRuntime>> {
        syevd(self, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
    use crate::runtime::cuda::{CudaDevice, is_cuda_available};
    use crate::runtime::{Runtime, RuntimeClient};

    fn cuda_client() -> Option<CudaClient> {
        if !is_cuda_available() {
            return None;
        }
        CudaRuntime::default_client(&CudaDevice::new(0)).ok()
    }

    fn upload(client: &CudaClient, data: &[f64], rows: usize, cols: usize) -> DeviceMatrix<CudaRuntime> {
        DeviceMatrix::from_slice(data, rows, cols, client.device()).unwrap()
    }

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < tol, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_cuda_matmul_matches_cpu() {
        let Some(client) = cuda_client() else { return };
        let cpu = CpuClient::new(CpuDevice::new());
        let a_data: Vec<f64> = (0..12).map(|i| i as f64 * 0.5 - 2.0).collect();
        let b_data: Vec<f64> = (0..12).map(|i| (i as f64).sin()).collect();

        for (ta, tb, a_shape, b_shape) in [
            (Transpose::No, Transpose::No, [3, 4], [4, 3]),
            (Transpose::Yes, Transpose::No, [4, 3], [4, 3]),
            (Transpose::No, Transpose::Yes, [3, 4], [3, 4]),
        ] {
            let a = upload(&client, &a_data, a_shape[0], a_shape[1]);
            let b = upload(&client, &b_data, b_shape[0], b_shape[1]);
            let gpu = client.matmul(&a, ta, &b, tb).unwrap();

            let ca = DeviceMatrix::<CpuRuntime>::from_slice(&a_data, a_shape[0], a_shape[1], cpu.device()).unwrap();
            let cb = DeviceMatrix::<CpuRuntime>::from_slice(&b_data, b_shape[0], b_shape[1], cpu.device()).unwrap();
            let expected = cpu.matmul(&ca, ta, &cb, tb).unwrap();

            assert_eq!(gpu.shape(), expected.shape());
            assert_close(&gpu.to_vec::<f64>().unwrap(), &expected.to_vec::<f64>().unwrap(), 1e-12);
        }
    }

    #[test]
    fn test_cuda_transpose_and_rank_one() {
        let Some(client) = cuda_client() else { return };
        let a = upload(&client, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
        let t = client.transpose(&a).unwrap();
        assert_eq!(t.shape(), [3, 2]);
        assert_eq!(t.to_vec::<f64>().unwrap(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);

        let mut m = upload(&client, &[0.0; 6], 2, 3);
        let x = upload(&client, &[1.0, 2.0], 2, 1);
        let y = upload(&client, &[1.0, 10.0, 100.0], 1, 3);
        client.rank_one_update(&mut m, 2.0, &x, &y).unwrap();
        assert_eq!(
            m.to_vec::<f64>().unwrap(),
            vec![2.0, 20.0, 200.0, 4.0, 40.0, 400.0]
        );
    }

    #[test]
    fn test_cuda_level_one() {
        let Some(client) = cuda_client() else { return };
        let mut a = upload(&client, &[3.0, 4.0], 2, 1);
        let b = upload(&client, &[1.0, 1.0], 2, 1);
        assert!((client.norm(&a).unwrap() - 5.0).abs() < 1e-12);
        assert!((client.dot(&a, &b).unwrap() - 7.0).abs() < 1e-12);

        client.axpy(-1.0, &b, &mut a).unwrap();
        client.scale(&mut a, 2.0).unwrap();
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![4.0, 6.0]);

        let mut m = upload(&client, &[1.0, 1.0, 1.0, 1.0], 2, 2);
        client.scale_columns(&mut m, &[2.0, 0.0]).unwrap();
        assert_eq!(m.to_vec::<f64>().unwrap(), vec![2.0, 0.0, 2.0, 0.0]);
        client.synchronize().unwrap();
    }
}
