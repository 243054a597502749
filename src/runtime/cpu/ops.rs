//! MatrixOps and SymmetricEigen implementations for the CPU runtime.

use super::helpers::{dispatch_dtype, dot_f64, for_each_row, host_slice, host_slice_mut};
use super::jacobi::jacobi_eigh;
use super::{CpuClient, CpuRuntime};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::ops::{
    MatrixOps, SymmetricEigen, SymmetricEigenDecomposition, Transpose, matmul_output_shape,
    validate_rank_one, validate_same_dtype, validate_square, validate_vector_pair,
};

/// Row-major copy of `op(a)`
fn materialize<T: Element>(data: &[T], rows: usize, cols: usize, trans: Transpose) -> Vec<T> {
    match trans {
        Transpose::No => data.to_vec(),
        Transpose::Yes => transpose_into(data, rows, cols),
    }
}

fn transpose_into<T: Element>(data: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut out = vec![T::zero(); rows * cols];
    for_each_row(&mut out, rows, |j, row| {
        for (i, slot) in row.iter_mut().enumerate() {
            *slot = data[i * cols + j];
        }
    });
    out
}

impl MatrixOps<CpuRuntime> for CpuClient {
    fn matmul(
        &self,
        a: &DeviceMatrix<CpuRuntime>,
        trans_a: Transpose,
        b: &DeviceMatrix<CpuRuntime>,
        trans_b: Transpose,
    ) -> Result<DeviceMatrix<CpuRuntime>> {
        validate_same_dtype(a.dtype(), b.dtype())?;
        let [m, n] = matmul_output_shape(a.shape(), trans_a, b.shape(), trans_b)
            .ok_or_else(|| Error::shape_mismatch(&a.shape(), &b.shape()))?;
        let k = trans_a.apply(a.shape())[1];

        let mut out = DeviceMatrix::zeros(m, n, a.dtype(), &self.device)?;

        dispatch_dtype!(a.dtype(), T => {
            // Both operands are laid out with the contraction index contiguous:
            // lhs as [m, k] and rhs as [n, k].
            let lhs = materialize(host_slice::<T>(a)?, a.rows(), a.cols(), trans_a);
            let rhs_trans = match trans_b {
                Transpose::No => Transpose::Yes,
                Transpose::Yes => Transpose::No,
            };
            let rhs = materialize(host_slice::<T>(b)?, b.rows(), b.cols(), rhs_trans);

            if k > 0 {
                let c = host_slice_mut::<T>(&mut out)?;
                for_each_row(c, n, |i, row| {
                    let a_row = &lhs[i * k..(i + 1) * k];
                    for (j, slot) in row.iter_mut().enumerate() {
                        *slot = T::from_f64(dot_f64(a_row, &rhs[j * k..(j + 1) * k]));
                    }
                });
            }
        });

        Ok(out)
    }

    fn transpose(&self, a: &DeviceMatrix<CpuRuntime>) -> Result<DeviceMatrix<CpuRuntime>> {
        dispatch_dtype!(a.dtype(), T => {
            let data = transpose_into(host_slice::<T>(a)?, a.rows(), a.cols());
            DeviceMatrix::from_slice(&data, a.cols(), a.rows(), &self.device)
        })
    }

    fn dot(&self, a: &DeviceMatrix<CpuRuntime>, b: &DeviceMatrix<CpuRuntime>) -> Result<f64> {
        validate_vector_pair(a, b)?;
        dispatch_dtype!(a.dtype(), T => {
            Ok(dot_f64(host_slice::<T>(a)?, host_slice::<T>(b)?))
        })
    }

    fn norm(&self, a: &DeviceMatrix<CpuRuntime>) -> Result<f64> {
        dispatch_dtype!(a.dtype(), T => {
            let data = host_slice::<T>(a)?;
            // Scale by the largest magnitude so squares cannot overflow.
            let max = data.iter().fold(0.0f64, |m, &v| m.max(v.to_f64().abs()));
            if max == 0.0 || !max.is_finite() {
                return Ok(max);
            }
            let sum: f64 = data
                .iter()
                .map(|&v| {
                    let s = v.to_f64() / max;
                    s * s
                })
                .sum();
            Ok(max * sum.sqrt())
        })
    }

    fn scale(&self, a: &mut DeviceMatrix<CpuRuntime>, alpha: f64) -> Result<()> {
        let cols = a.cols();
        dispatch_dtype!(a.dtype(), T => {
            let alpha = T::from_f64(alpha);
            for_each_row(host_slice_mut::<T>(a)?, cols, |_, row| {
                for v in row.iter_mut() {
                    *v = *v * alpha;
                }
            });
        });
        Ok(())
    }

    fn axpy(
        &self,
        alpha: f64,
        x: &DeviceMatrix<CpuRuntime>,
        y: &mut DeviceMatrix<CpuRuntime>,
    ) -> Result<()> {
        validate_vector_pair(x, y)?;
        dispatch_dtype!(x.dtype(), T => {
            // x may be a view of y's buffer.
            let xs = host_slice::<T>(x)?.to_vec();
            let alpha = T::from_f64(alpha);
            for (dst, &src) in host_slice_mut::<T>(y)?.iter_mut().zip(&xs) {
                *dst = *dst + alpha * src;
            }
        });
        Ok(())
    }

    fn rank_one_update(
        &self,
        a: &mut DeviceMatrix<CpuRuntime>,
        alpha: f64,
        x: &DeviceMatrix<CpuRuntime>,
        y: &DeviceMatrix<CpuRuntime>,
    ) -> Result<()> {
        validate_rank_one(a, x, y)?;
        let cols = a.cols();
        dispatch_dtype!(a.dtype(), T => {
            let xs = host_slice::<T>(x)?.to_vec();
            let ys = host_slice::<T>(y)?.to_vec();
            let alpha = T::from_f64(alpha);
            for_each_row(host_slice_mut::<T>(a)?, cols, |i, row| {
                let ax = alpha * xs[i];
                for (dst, &yj) in row.iter_mut().zip(&ys) {
                    *dst = *dst + ax * yj;
                }
            });
        });
        Ok(())
    }

    fn scale_columns(&self, a: &mut DeviceMatrix<CpuRuntime>, factors: &[f64]) -> Result<()> {
        if factors.len() != a.cols() {
            return Err(Error::shape_mismatch(&[a.cols()], &[factors.len()]));
        }
        let cols = a.cols();
        dispatch_dtype!(a.dtype(), T => {
            let factors: Vec<T> = factors.iter().map(|&f| T::from_f64(f)).collect();
            for_each_row(host_slice_mut::<T>(a)?, cols, |_, row| {
                for (v, &f) in row.iter_mut().zip(&factors) {
                    *v = *v * f;
                }
            });
        });
        Ok(())
    }

    fn cast(&self, a: &DeviceMatrix<CpuRuntime>, dtype: DType) -> Result<DeviceMatrix<CpuRuntime>> {
        if a.dtype() == dtype {
            return a.try_clone();
        }
        DeviceMatrix::from_f64(&a.to_f64_vec()?, a.rows(), a.cols(), dtype, &self.device)
    }
}

impl SymmetricEigen<CpuRuntime> for CpuClient {
    fn eigh(&self, a: &DeviceMatrix<CpuRuntime>) -> Result<SymmetricEigenDecomposition<CpuRuntime>> {
        let n = validate_square(a)?;
        let (values, vectors) = jacobi_eigh(&a.to_f64_vec()?, n);
        let vectors = DeviceMatrix::from_f64(&vectors, n, n, a.dtype(), &self.device)?;
        Ok(SymmetricEigenDecomposition { values, vectors })
    }
}
