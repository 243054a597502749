//! CPU runtime implementation

use super::client::CpuClient;
use super::device::CpuDevice;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};

// AVX-512 alignment
const ALIGN: usize = 64;

/// CPU compute runtime
///
/// This is the default runtime that works on any platform.
/// Memory is allocated on the heap using the system allocator.
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Client = CpuClient;

    fn name() -> &'static str {
        "cpu"
    }

    fn allocate(size_bytes: usize, _device: &Self::Device) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }

        let layout = AllocLayout::from_size_align(size_bytes, ALIGN)
            .map_err(|_| Error::OutOfMemory { size: size_bytes })?;

        let ptr = unsafe { alloc_zeroed(layout) };

        if ptr.is_null() {
            return Err(Error::OutOfMemory { size: size_bytes });
        }

        Ok(ptr as u64)
    }

    fn deallocate(ptr: u64, size_bytes: usize, _device: &Self::Device) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }

        // The layout was valid when the block was allocated.
        if let Ok(layout) = AllocLayout::from_size_align(size_bytes, ALIGN) {
            unsafe {
                dealloc(ptr as *mut u8, layout);
            }
        }
    }

    fn copy_to_device(src: &[u8], dst: u64, _device: &Self::Device) -> Result<()> {
        if src.is_empty() || dst == 0 {
            return Ok(());
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        Ok(())
    }

    fn copy_from_device(src: u64, dst: &mut [u8], _device: &Self::Device) -> Result<()> {
        if dst.is_empty() || src == 0 {
            return Ok(());
        }

        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        _device: &Self::Device,
    ) -> Result<()> {
        if size_bytes == 0 || src == 0 || dst == 0 {
            return Ok(());
        }

        unsafe {
            // Use copy (not copy_nonoverlapping) in case src and dst overlap
            std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
        }
        Ok(())
    }

    fn zero_fill(ptr: u64, size_bytes: usize, _device: &Self::Device) -> Result<()> {
        if ptr == 0 || size_bytes == 0 {
            return Ok(());
        }

        unsafe {
            std::ptr::write_bytes(ptr as *mut u8, 0, size_bytes);
        }
        Ok(())
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn default_client(device: &Self::Device) -> Result<Self::Client> {
        Ok(CpuClient::new(device.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_zero_bytes_is_null() {
        let device = CpuDevice::new();
        assert_eq!(CpuRuntime::allocate(0, &device).unwrap(), 0);
        CpuRuntime::deallocate(0, 0, &device);
    }

    #[test]
    fn test_roundtrip_and_zero_fill() {
        let device = CpuDevice::new();
        let ptr = CpuRuntime::allocate(16, &device).unwrap();
        assert_eq!(ptr % ALIGN as u64, 0);

        let src: Vec<u8> = (0..16).collect();
        CpuRuntime::copy_to_device(&src, ptr, &device).unwrap();
        let mut dst = vec![0u8; 16];
        CpuRuntime::copy_from_device(ptr, &mut dst, &device).unwrap();
        assert_eq!(dst, src);

        CpuRuntime::zero_fill(ptr + 4, 8, &device).unwrap();
        CpuRuntime::copy_from_device(ptr, &mut dst, &device).unwrap();
        assert_eq!(&dst[..4], &[0, 1, 2, 3]);
        assert!(dst[4..12].iter().all(|&b| b == 0));
        assert_eq!(&dst[12..], &[12, 13, 14, 15]);

        CpuRuntime::deallocate(ptr, 16, &device);
    }
}
