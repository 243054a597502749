//! Runtime backends for device-resident matrices
//!
//! This module defines the `Runtime` trait and provides implementations
//! for the supported compute backends (CPU, CUDA).
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies a specific GPU/CPU)
//! └── Client (dispatches operations, owns stream and vendor handles)
//! ```
//!
//! A [`DeviceContext`] binds one device and its client together and is passed
//! explicitly into every decomposition call, so concurrent calls targeting
//! different devices never share mutable state.

use crate::error::Result;

pub mod cpu;

#[cfg(feature = "cuda")]
pub mod cuda;

/// Core trait for compute backends
///
/// `Runtime` abstracts over different compute devices (CPU, GPU).
/// It uses static dispatch via generics for zero-cost abstraction.
///
/// Device memory is addressed by raw `u64` handles: a host pointer for the CPU
/// backend, a `CUdeviceptr` for CUDA. Handles are owned by [`crate::matrix::Storage`],
/// which frees them on drop.
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Client for dispatching operations
    type Client: RuntimeClient<Self>;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Allocate device memory
    ///
    /// Returns `Err(OutOfMemory)` if allocation fails. Zero-sized requests
    /// return the null handle `0`.
    fn allocate(size_bytes: usize, device: &Self::Device) -> Result<u64>;

    /// Deallocate device memory
    fn deallocate(ptr: u64, size_bytes: usize, device: &Self::Device);

    /// Copy data from host to device
    fn copy_to_device(src: &[u8], dst: u64, device: &Self::Device) -> Result<()>;

    /// Copy data from device to host
    fn copy_from_device(src: u64, dst: &mut [u8], device: &Self::Device) -> Result<()>;

    /// Copy data within device (device to device)
    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        device: &Self::Device,
    ) -> Result<()>;

    /// Set `size_bytes` bytes starting at `ptr` to zero
    fn zero_fill(ptr: u64, size_bytes: usize, device: &Self::Device) -> Result<()>;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Get the client for a device, creating it on first use
    fn default_client(device: &Self::Device) -> Result<Self::Client>;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Check if two devices are the same
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Human-readable name
    fn name(&self) -> String {
        format!("Device({})", self.id())
    }
}

/// Trait for runtime clients that handle operation dispatch
pub trait RuntimeClient<R: Runtime>: Clone + Send + Sync {
    /// Get the device this client operates on
    fn device(&self) -> &R::Device;

    /// Wait for all pending operations to complete
    fn synchronize(&self) -> Result<()>;
}

/// Explicit device binding for one decomposition call
///
/// Replaces ambient, process-wide device selection: the context carries the
/// device and its client, and every operation of a call goes through it.
#[derive(Clone)]
pub struct DeviceContext<R: Runtime> {
    device: R::Device,
    client: R::Client,
}

impl<R: Runtime> DeviceContext<R> {
    /// Bind to `device`, creating (or reusing) its client
    pub fn new(device: &R::Device) -> Result<Self> {
        let client = R::default_client(device)?;
        Ok(Self {
            device: device.clone(),
            client,
        })
    }

    /// Bind to the runtime's default device
    pub fn default_device() -> Result<Self> {
        Self::new(&R::default_device())
    }

    /// The bound device
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.device
    }

    /// The client used to dispatch operations
    #[inline]
    pub fn client(&self) -> &R::Client {
        &self.client
    }
}

impl<R: Runtime> std::fmt::Debug for DeviceContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("runtime", &R::name())
            .field("device", &self.device.name())
            .finish()
    }
}
