//! # tsvd
//!
//! **Truncated singular value decomposition on device-resident dense matrices.**
//!
//! For an `n × m` matrix X and a target rank k, tsvd computes the top-k right
//! singular vectors Q (`m × k`), singular values w, and left singular vectors
//! U (`n × k`) so that `U · diag(w) · Qᵗ` is the best rank-k approximation of X.
//!
//! Two strategies produce the leading eigenpairs of the Gram matrix `XᵗX`:
//!
//! - **Power iteration** with explicit rank-1 deflation ([`algorithm::power`])
//! - **Direct solver**: full symmetric eigendecomposition, truncated to k
//!   ([`algorithm::solver`])
//!
//! Everything runs on a [`runtime::Runtime`] backend: the host CPU, or an
//! NVIDIA GPU through cuBLAS and cuSOLVER.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tsvd::prelude::*;
//!
//! let x: Vec<f64> = load_rows(); // 100 × 20, row-major
//! let params = Params::new(100, 20, 5).with_algorithm(Algorithm::Power);
//!
//! let (mut q, mut w, mut u) = (vec![0.0; 20 * 5], vec![0.0; 5], vec![0.0; 100 * 5]);
//! truncated_svd(&x, &mut q, &mut w, &mut u, &params)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded CPU kernels
//! - `cuda`: NVIDIA CUDA backend (cuBLAS + cuSOLVER)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithm;
pub mod dtype;
pub mod error;
pub mod matrix;
pub mod ops;
pub mod params;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithm::{
        ComponentStats, OuterSign, PowerOptions, TruncatedSvd, outer_product, power_eigen,
        solve_full, truncated_svd, truncated_svd_matrix,
    };
    pub use crate::dtype::{ComputePrecision, DType, Element};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::matrix::DeviceMatrix;
    pub use crate::ops::{MatrixOps, SymmetricEigen, Transpose};
    pub use crate::params::{Algorithm, Params};
    pub use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
    pub use crate::runtime::{Device, DeviceContext, Runtime, RuntimeClient};

    #[cfg(feature = "cuda")]
    pub use crate::runtime::cuda::{CudaClient, CudaDevice, CudaRuntime};
}
