//! CUDA runtime implementation

use super::cache::{
    get_or_create_client, is_cuda_context_valid, log_cuda_memory_error, try_get_cached_stream,
};
use super::client::CudaClient;
use super::device::CudaDevice;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use cudarc::driver::sys::{self, CUresult};

/// CUDA Runtime adapter
///
/// Implements the generic Runtime trait for CUDA backend.
/// Uses cudarc for direct GPU control; all memory operations are
/// stream-ordered on the device's cached client stream.
#[derive(Clone, Debug, Default)]
pub struct CudaRuntime;

impl Runtime for CudaRuntime {
    type Device = CudaDevice;
    type Client = CudaClient;

    fn name() -> &'static str {
        "cuda"
    }

    /// Allocate GPU memory.
    ///
    /// Returns `Err(OutOfMemory)` if CUDA memory allocation fails.
    fn allocate(size_bytes: usize, device: &Self::Device) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }

        let client = get_or_create_client(device)?;

        unsafe {
            let mut ptr: u64 = 0;
            let result = sys::cuMemAllocAsync(&mut ptr, size_bytes, client.stream.cu_stream());
            if result == CUresult::CUDA_SUCCESS {
                return Ok(ptr);
            }

            // First attempt failed - try syncing the stream to flush pending frees
            let _ = client.stream.synchronize();

            let result = sys::cuMemAllocAsync(&mut ptr, size_bytes, client.stream.cu_stream());
            if result == CUresult::CUDA_SUCCESS {
                return Ok(ptr);
            }
        }

        Err(Error::OutOfMemory { size: size_bytes })
    }

    fn deallocate(ptr: u64, _size_bytes: usize, device: &Self::Device) {
        if ptr == 0 {
            return;
        }

        unsafe {
            // Check if CUDA context is still valid before attempting free
            if !is_cuda_context_valid() {
                // Context is gone - memory will be reclaimed by driver on context destruction
                return;
            }

            // Try to use stream-ordered async free if client is available
            let result = if let Some(stream) = try_get_cached_stream(device.index) {
                sys::cuMemFreeAsync(ptr, stream)
            } else {
                sys::cuMemFree_v2(ptr)
            };

            if result != CUresult::CUDA_SUCCESS && result != CUresult::CUDA_ERROR_ILLEGAL_ADDRESS {
                log_cuda_memory_error("cuMemFree", ptr, result);
            }
        }
    }

    fn copy_to_device(src: &[u8], dst: u64, device: &Self::Device) -> Result<()> {
        if src.is_empty() || dst == 0 {
            return Ok(());
        }

        let client = get_or_create_client(device)?;

        unsafe {
            let result = sys::cuMemcpyHtoDAsync_v2(
                dst,
                src.as_ptr() as *const std::ffi::c_void,
                src.len(),
                client.stream.cu_stream(),
            );

            if result != CUresult::CUDA_SUCCESS {
                return Err(Error::Backend(format!(
                    "CUDA host-to-device copy failed: {} bytes ({:?})",
                    src.len(),
                    result
                )));
            }
        }

        // `src` may be freed by the caller as soon as we return.
        client.stream.synchronize()?;
        Ok(())
    }

    fn copy_from_device(src: u64, dst: &mut [u8], device: &Self::Device) -> Result<()> {
        if dst.is_empty() || src == 0 {
            return Ok(());
        }

        let client = get_or_create_client(device)?;

        unsafe {
            let result = sys::cuMemcpyDtoHAsync_v2(
                dst.as_mut_ptr() as *mut std::ffi::c_void,
                src,
                dst.len(),
                client.stream.cu_stream(),
            );

            if result != CUresult::CUDA_SUCCESS {
                return Err(Error::Backend(format!(
                    "CUDA device-to-host copy failed: {} bytes ({:?})",
                    dst.len(),
                    result
                )));
            }
        }

        client.stream.synchronize()?;
        Ok(())
    }

    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        device: &Self::Device,
    ) -> Result<()> {
        if size_bytes == 0 || src == 0 || dst == 0 {
            return Ok(());
        }

        let client = get_or_create_client(device)?;

        unsafe {
            let result =
                sys::cuMemcpyDtoDAsync_v2(dst, src, size_bytes, client.stream.cu_stream());

            if result != CUresult::CUDA_SUCCESS {
                return Err(Error::Backend(format!(
                    "CUDA device-to-device copy failed: {} bytes ({:?})",
                    size_bytes, result
                )));
            }
        }
        Ok(())
    }

    fn zero_fill(ptr: u64, size_bytes: usize, device: &Self::Device) -> Result<()> {
        if ptr == 0 || size_bytes == 0 {
            return Ok(());
        }

        let client = get_or_create_client(device)?;

        unsafe {
            let result = sys::cuMemsetD8Async(ptr, 0, size_bytes, client.stream.cu_stream());
            if result != CUresult::CUDA_SUCCESS {
                return Err(Error::Backend(format!(
                    "CUDA memset failed: {} bytes ({:?})",
                    size_bytes, result
                )));
            }
        }
        Ok(())
    }

    fn default_device() -> Self::Device {
        CudaDevice::new(0)
    }

    fn default_client(device: &Self::Device) -> Result<Self::Client> {
        get_or_create_client(device)
    }
}
