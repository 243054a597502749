//! Helper functions for CPU matrix operations
//!
//! Typed host views over CPU storage and the row-partitioned loop shared by the
//! kernels in `ops.rs` and `jacobi.rs`.

use super::CpuRuntime;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

// ============================================================================
// DType Dispatch Macro
// ============================================================================

/// Macro for dtype dispatch to typed kernel calls
///
/// This macro matches on dtype and executes the code block with the appropriate type.
/// Usage: `dispatch_dtype!(dtype, T => { code using T })`
macro_rules! dispatch_dtype {
    ($dtype:expr, $T:ident => $body:block) => {
        match $dtype {
            $crate::dtype::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::dtype::DType::F32 => {
                type $T = f32;
                $body
            }
        }
    };
}

pub(super) use dispatch_dtype;

// ============================================================================
// Host Views
// ============================================================================

fn check_dtype<T: Element>(m: &DeviceMatrix<CpuRuntime>) -> Result<()> {
    if m.dtype() != T::DTYPE {
        return Err(Error::DTypeMismatch {
            lhs: m.dtype(),
            rhs: T::DTYPE,
        });
    }
    Ok(())
}

/// Borrow CPU matrix data as a typed slice
pub(crate) fn host_slice<T: Element>(m: &DeviceMatrix<CpuRuntime>) -> Result<&[T]> {
    check_dtype::<T>(m)?;
    if m.is_empty() {
        return Ok(&[]);
    }
    // CPU storage pointers are 64-byte aligned host allocations of `numel` elements.
    Ok(unsafe { std::slice::from_raw_parts(m.ptr() as *const T, m.numel()) })
}

/// Borrow CPU matrix data as a mutable typed slice
pub(crate) fn host_slice_mut<T: Element>(m: &mut DeviceMatrix<CpuRuntime>) -> Result<&mut [T]> {
    check_dtype::<T>(m)?;
    if m.is_empty() {
        return Ok(&mut []);
    }
    Ok(unsafe { std::slice::from_raw_parts_mut(m.ptr() as *mut T, m.numel()) })
}

// ============================================================================
// Row-Partitioned Loops
// ============================================================================

/// Run `f(row_index, row)` over every `width`-element row of `out`
///
/// Rows are distributed across the rayon pool when the `rayon` feature is on.
pub(crate) fn for_each_row<T, F>(out: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if width == 0 || out.is_empty() {
        return;
    }

    #[cfg(feature = "rayon")]
    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(i, row)| f(i, row));

    #[cfg(not(feature = "rayon"))]
    out.chunks_mut(width)
        .enumerate()
        .for_each(|(i, row)| f(i, row));
}

/// Dot product with f64 accumulation
#[inline]
pub(crate) fn dot_f64<T: Element>(a: &[T], b: &[T]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| x.to_f64() * y.to_f64())
        .sum()
}
