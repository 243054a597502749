//! CUDA Client implementation
//!
//! CudaClient owns stream and context for direct cudarc access.
//!
//! # Thread Safety
//!
//! `CudaClient` is `Clone` and can be shared across threads. The underlying
//! CUDA context, stream and library handles are reference-counted via `Arc`.
//! Clients obtained through the runtime have their context bound to the
//! calling thread.

use cudarc::cublas::CudaBlas;
use cudarc::cusolver::sys as cusolver_sys;
use cudarc::driver::safe::{CudaContext, CudaStream};
use std::sync::Arc;
use tracing::debug;

use super::CudaRuntime;
use super::device::CudaDevice;
use crate::error::{Error, Result};
use crate::runtime::RuntimeClient;

// ============================================================================
// cuSOLVER handle
// ============================================================================

/// Owned cuSOLVER dense handle bound to the client's stream
pub(crate) struct CusolverHandle {
    handle: cusolver_sys::cusolverDnHandle_t,
}

// The handle is only used through the client's stream, which serializes access.
unsafe impl Send for CusolverHandle {}
unsafe impl Sync for CusolverHandle {}

impl CusolverHandle {
    fn new(stream: &CudaStream) -> Result<Self> {
        let mut handle: cusolver_sys::cusolverDnHandle_t = std::ptr::null_mut();
        unsafe {
            check_cusolver(cusolver_sys::cusolverDnCreate(&mut handle), "cusolverDnCreate")?;
            let this = Self { handle };
            check_cusolver(
                cusolver_sys::cusolverDnSetStream(this.handle, stream.cu_stream() as _),
                "cusolverDnSetStream",
            )?;
            Ok(this)
        }
    }

    /// Raw handle for cuSOLVER calls
    #[inline]
    pub(crate) fn raw(&self) -> cusolver_sys::cusolverDnHandle_t {
        self.handle
    }
}

impl Drop for CusolverHandle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                let _ = cusolver_sys::cusolverDnDestroy(self.handle);
            }
        }
    }
}

/// Map a cuSOLVER status to `Error::Backend`
pub(crate) fn check_cusolver(status: cusolver_sys::cusolverStatus_t, op: &str) -> Result<()> {
    if status != cusolver_sys::cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
        return Err(Error::Backend(format!("{} failed: {:?}", op, status)));
    }
    Ok(())
}

// ============================================================================
// CudaClient
// ============================================================================

/// CUDA Runtime Client
///
/// Owns CUDA context and stream. cuBLAS and cuSOLVER are bound to the same
/// stream, so every operation issued through one client executes in order.
#[derive(Clone)]
pub struct CudaClient {
    /// GPU device index
    pub(crate) device: CudaDevice,

    /// CUDA context for this device (owns GPU context)
    pub(crate) context: Arc<CudaContext>,

    /// Stream on which all work is issued
    pub(crate) stream: Arc<CudaStream>,

    /// cuBLAS handle for BLAS level 1-3 operations
    pub(crate) cublas: Arc<CudaBlas>,

    /// cuSOLVER dense handle for the symmetric eigensolver
    pub(crate) cusolver: Arc<CusolverHandle>,
}

impl std::fmt::Debug for CudaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaClient")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl CudaClient {
    /// Create a new CUDA client for a device.
    ///
    /// This initializes the CUDA context, creates a stream, and sets up the
    /// cuBLAS and cuSOLVER handles on it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - CUDA context creation fails (e.g., invalid device ID)
    /// - Stream creation fails
    /// - cuBLAS or cuSOLVER initialization fails
    pub fn new(device: CudaDevice) -> Result<Self> {
        let context = CudaContext::new(device.index)?;

        // Bind context to current thread for proper cuBLAS operation
        context.bind_to_thread()?;

        let stream = context.new_stream()?;

        let cublas = CudaBlas::new(stream.clone())
            .map_err(|e| Error::Backend(format!("Failed to initialize cuBLAS: {:?}", e)))?;
        let cusolver = CusolverHandle::new(&stream)?;

        if let Ok((major, minor)) = device.compute_capability() {
            debug!("created CUDA client for cuda:{} (sm_{}{})", device.index, major, minor);
        }

        Ok(Self {
            device,
            context,
            stream,
            cublas: Arc::new(cublas),
            cusolver: Arc::new(cusolver),
        })
    }

    /// Get reference to the CUDA stream.
    #[inline]
    pub fn stream(&self) -> &CudaStream {
        &self.stream
    }

    /// Get reference to the CUDA context.
    #[inline]
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.context
    }

    /// Make this client's context current on the calling thread
    #[inline]
    pub(crate) fn bind(&self) -> Result<()> {
        self.context.bind_to_thread()?;
        Ok(())
    }
}

impl RuntimeClient<CudaRuntime> for CudaClient {
    fn device(&self) -> &CudaDevice {
        &self.device
    }

    fn synchronize(&self) -> Result<()> {
        self.stream.synchronize()?;
        Ok(())
    }
}
