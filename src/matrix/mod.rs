//! Dense row-major matrices in device memory
//!
//! [`DeviceMatrix`] pairs a [`Storage`] buffer with a 2-D shape. Element `(i, j)`
//! lives at offset `i * cols + j`. Column vectors are `n × 1` matrices and row
//! vectors `1 × n`; both have the same contiguous layout, which is what lets
//! [`DeviceMatrix::transposed_vector`] be a zero-copy view.
//!
//! Arithmetic lives in [`crate::ops::MatrixOps`], implemented per backend client.
//! This type only handles allocation, transfer, and row-granular copies, which
//! every backend can express with the raw `Runtime` memory primitives.

mod storage;

pub use storage::Storage;

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// A dense row-major matrix resident on a runtime device
pub struct DeviceMatrix<R: Runtime> {
    storage: Storage<R>,
    rows: usize,
    cols: usize,
}

impl<R: Runtime> DeviceMatrix<R> {
    /// Allocate a zero-filled `rows × cols` matrix
    pub fn zeros(rows: usize, cols: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        let storage = Storage::zeros(rows * cols, dtype, device)?;
        Ok(Self {
            storage,
            rows,
            cols,
        })
    }

    /// Upload row-major host data
    ///
    /// Returns `ShapeMismatch` if `data.len() != rows * cols`.
    pub fn from_slice<T: Element>(
        data: &[T],
        rows: usize,
        cols: usize,
        device: &R::Device,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::shape_mismatch(&[rows * cols], &[data.len()]));
        }
        let storage = Storage::from_slice(data, device)?;
        Ok(Self {
            storage,
            rows,
            cols,
        })
    }

    /// Upload f64 host data, converting to `dtype` on the way
    pub fn from_f64(
        data: &[f64],
        rows: usize,
        cols: usize,
        dtype: DType,
        device: &R::Device,
    ) -> Result<Self> {
        match dtype {
            DType::F64 => Self::from_slice(data, rows, cols, device),
            DType::F32 => {
                let narrowed: Vec<f32> = data.iter().map(|&v| v as f32).collect();
                Self::from_slice(&narrowed, rows, cols, device)
            }
        }
    }

    /// Number of rows
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as `[rows, cols]`
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// True if the matrix has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    /// True for `n × 1` and `1 × n` shapes
    #[inline]
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Device holding the buffer
    #[inline]
    pub fn device(&self) -> &R::Device {
        self.storage.device()
    }

    /// Underlying storage
    #[inline]
    pub fn storage(&self) -> &Storage<R> {
        &self.storage
    }

    /// Raw device pointer of element `(0, 0)`
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.storage.ptr()
    }

    /// Download to the host as `T`
    ///
    /// Returns `DTypeMismatch` if `T` is not the matrix's element type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.storage.to_vec()
    }

    /// Download to the host, widening to f64
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match self.dtype() {
            DType::F64 => self.to_vec::<f64>(),
            DType::F32 => Ok(self
                .to_vec::<f32>()?
                .into_iter()
                .map(|v| v as f64)
                .collect()),
        }
    }

    /// Deep copy into a new device allocation
    pub fn try_clone(&self) -> Result<Self> {
        let copy = Self::zeros(self.rows, self.cols, self.dtype(), self.device())?;
        R::copy_within_device(
            self.ptr(),
            copy.ptr(),
            self.storage.size_in_bytes(),
            self.device(),
        )?;
        Ok(copy)
    }

    /// Zero-copy transpose of a vector (`n × 1` ↔ `1 × n`)
    ///
    /// The view shares the buffer with `self`. Returns `ShapeMismatch` for
    /// matrices that are not vectors.
    pub fn transposed_vector(&self) -> Result<Self> {
        if !self.is_vector() {
            return Err(Error::shape_mismatch(
                &[self.numel(), 1],
                &[self.rows, self.cols],
            ));
        }
        Ok(Self {
            storage: self.storage.clone(),
            rows: self.cols,
            cols: self.rows,
        })
    }

    /// Copy the contents of vector `src` into row `row`
    ///
    /// `src` must hold exactly `cols` elements of the same dtype.
    pub fn copy_row_from(&mut self, row: usize, src: &DeviceMatrix<R>) -> Result<()> {
        if row >= self.rows {
            return Err(Error::shape_mismatch(&[self.rows], &[row]));
        }
        if src.numel() != self.cols {
            return Err(Error::shape_mismatch(&[self.cols], &[src.numel()]));
        }
        if src.dtype() != self.dtype() {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype(),
                rhs: src.dtype(),
            });
        }
        let elem = self.dtype().size_in_bytes();
        R::copy_within_device(
            src.ptr(),
            self.ptr() + (row * self.cols * elem) as u64,
            self.cols * elem,
            self.device(),
        )
    }

    /// Copy row `row` out as a `cols × 1` column vector
    pub fn row(&self, row: usize) -> Result<Self> {
        if row >= self.rows {
            return Err(Error::shape_mismatch(&[self.rows], &[row]));
        }
        let out = Self::zeros(self.cols, 1, self.dtype(), self.device())?;
        let elem = self.dtype().size_in_bytes();
        R::copy_within_device(
            self.ptr() + (row * self.cols * elem) as u64,
            out.ptr(),
            self.cols * elem,
            self.device(),
        )?;
        Ok(out)
    }

    /// Copy the first `count` rows into a new `count × cols` matrix
    pub fn leading_rows(&self, count: usize) -> Result<Self> {
        if count > self.rows {
            return Err(Error::shape_mismatch(&[self.rows, self.cols], &[count, self.cols]));
        }
        let out = Self::zeros(count, self.cols, self.dtype(), self.device())?;
        R::copy_within_device(
            self.ptr(),
            out.ptr(),
            count * self.cols * self.dtype().size_in_bytes(),
            self.device(),
        )?;
        Ok(out)
    }

    /// Zero every row from `start` to the end
    pub fn zero_rows_from(&mut self, start: usize) -> Result<()> {
        if start >= self.rows {
            return Ok(());
        }
        let elem = self.dtype().size_in_bytes();
        R::zero_fill(
            self.ptr() + (start * self.cols * elem) as u64,
            (self.rows - start) * self.cols * elem,
            self.device(),
        )
    }
}

impl<R: Runtime> std::fmt::Debug for DeviceMatrix<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("dtype", &self.dtype())
            .field("runtime", &R::name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{CpuDevice, CpuRuntime};

    #[test]
    fn test_from_slice_shape_check() {
        let device = CpuDevice::new();
        let err = DeviceMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], 2, 2, &device)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_rows_copy() {
        let device = CpuDevice::new();
        let mut m = DeviceMatrix::<CpuRuntime>::zeros(3, 2, DType::F64, &device).unwrap();
        let v = DeviceMatrix::<CpuRuntime>::from_slice(&[7.0f64, 8.0], 2, 1, &device).unwrap();
        m.copy_row_from(1, &v).unwrap();
        assert_eq!(m.to_vec::<f64>().unwrap(), vec![0.0, 0.0, 7.0, 8.0, 0.0, 0.0]);

        let r = m.row(1).unwrap();
        assert_eq!(r.shape(), [2, 1]);
        assert_eq!(r.to_vec::<f64>().unwrap(), vec![7.0, 8.0]);

        let head = m.leading_rows(2).unwrap();
        assert_eq!(head.to_vec::<f64>().unwrap(), vec![0.0, 0.0, 7.0, 8.0]);

        m.zero_rows_from(1).unwrap();
        assert!(m.to_vec::<f64>().unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_transposed_vector_shares_storage() {
        let device = CpuDevice::new();
        let v = DeviceMatrix::<CpuRuntime>::from_slice(&[1.0f32, 2.0, 3.0], 3, 1, &device).unwrap();
        let vt = v.transposed_vector().unwrap();
        assert_eq!(vt.shape(), [1, 3]);
        assert_eq!(vt.ptr(), v.ptr());
        assert_eq!(v.storage().ref_count(), 2);

        let m = DeviceMatrix::<CpuRuntime>::zeros(2, 2, DType::F32, &device).unwrap();
        assert!(m.transposed_vector().is_err());
    }

    #[test]
    fn test_try_clone_is_deep() {
        let device = CpuDevice::new();
        let a = DeviceMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0], 1, 2, &device).unwrap();
        let b = a.try_clone().unwrap();
        assert_ne!(a.ptr(), b.ptr());
        assert_eq!(b.to_vec::<f64>().unwrap(), vec![1.0, 2.0]);
        assert!(b.to_vec::<f32>().is_err());
        assert_eq!(b.to_f64_vec().unwrap(), vec![1.0, 2.0]);
    }
}
