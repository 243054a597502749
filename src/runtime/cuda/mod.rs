//! CUDA runtime implementation
//!
//! GPU backend built on cudarc. Dense algebra goes through cuBLAS and the
//! symmetric eigensolver through cuSOLVER; no custom kernels are compiled.
//!
//! # Features
//!
//! - `CudaDevice` - Represents a CUDA GPU device
//! - `CudaClient` - Owns context, stream, cuBLAS and cuSOLVER handles
//! - `CudaRuntime` - Implements the generic Runtime trait
//!
//! # Row-major convention
//!
//! Matrices are row-major while cuBLAS and cuSOLVER are column-major. A
//! row-major `[r, c]` buffer is read by the vendor libraries as its `[c, r]`
//! transpose, so every call swaps operands or dimensions accordingly.

mod cache;
mod client;
mod device;
mod eigh;
mod ops;
mod runtime;

pub use client::CudaClient;
pub use device::CudaDevice;
pub use runtime::CudaRuntime;

use crate::error::Result;

/// Number of CUDA devices visible to the driver
pub fn device_count() -> Result<usize> {
    cudarc::driver::result::init()?;
    let count = cudarc::driver::result::device::get_count()?;
    Ok(count.max(0) as usize)
}

/// True if at least one CUDA device is usable
pub fn is_cuda_available() -> bool {
    device_count().map(|n| n > 0).unwrap_or(false)
}
