//! Storage: device memory management with Arc-based sharing

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use std::sync::Arc;

/// Device buffer with reference counting
///
/// Storage wraps one device allocation. Clones share the buffer; memory is
/// deallocated when the last reference is dropped.
pub struct Storage<R: Runtime> {
    inner: Arc<StorageInner<R>>,
}

struct StorageInner<R: Runtime> {
    /// Raw device pointer (GPU address or CPU ptr cast to u64)
    ptr: u64,
    /// Number of elements (not bytes)
    len: usize,
    dtype: DType,
    device: R::Device,
}

impl<R: Runtime> Storage<R> {
    /// Allocate zero-initialized storage for `len` elements of `dtype`
    pub fn zeros(len: usize, dtype: DType, device: &R::Device) -> Result<Self> {
        let size_bytes = len * dtype.size_in_bytes();
        let ptr = R::allocate(size_bytes, device)?;
        let storage = Self::wrap(ptr, len, dtype, device);
        R::zero_fill(ptr, size_bytes, device)?;
        Ok(storage)
    }

    /// Upload `data` into a fresh allocation
    pub fn from_slice<T: Element>(data: &[T], device: &R::Device) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let ptr = R::allocate(bytes.len(), device)?;
        let storage = Self::wrap(ptr, data.len(), T::DTYPE, device);
        R::copy_to_device(bytes, ptr, device)?;
        Ok(storage)
    }

    // Takes ownership right after allocation so a failed upload still frees the buffer.
    fn wrap(ptr: u64, len: usize, dtype: DType, device: &R::Device) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                ptr,
                len,
                dtype,
                device: device.clone(),
            }),
        }
    }

    /// Get the raw device pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.inner.ptr
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if storage is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.inner.device
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len * self.inner.dtype.size_in_bytes()
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Copy the whole buffer to the host
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.inner.dtype {
            return Err(Error::DTypeMismatch {
                lhs: self.inner.dtype,
                rhs: T::DTYPE,
            });
        }
        // Allocate as T (not u8) so the destination is aligned for f64.
        let mut result = vec![T::zero(); self.inner.len];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut result);
        R::copy_from_device(self.inner.ptr, bytes, &self.inner.device)?;
        Ok(result)
    }
}

impl<R: Runtime> Clone for Storage<R> {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Runtime> Drop for StorageInner<R> {
    fn drop(&mut self) {
        if self.ptr != 0 {
            R::deallocate(
                self.ptr,
                self.len * self.dtype.size_in_bytes(),
                &self.device,
            );
        }
    }
}

impl<R: Runtime> std::fmt::Debug for Storage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("ptr", &format!("0x{:x}", self.inner.ptr))
            .field("len", &self.inner.len)
            .field("dtype", &self.inner.dtype)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
