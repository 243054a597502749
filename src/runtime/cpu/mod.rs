//! CPU runtime implementation
//!
//! The CPU runtime uses aligned heap allocations and provides the reference
//! implementation of every matrix operation. With the `rayon` feature, kernels
//! split work by output row; each row is computed by exactly one thread, so
//! results do not depend on the thread count.

mod client;
mod device;
pub(crate) mod helpers;
pub mod jacobi;
mod ops;
mod runtime;

pub use client::CpuClient;
pub use device::CpuDevice;
pub use runtime::CpuRuntime;
