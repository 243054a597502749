//! Error types for tsvd

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using tsvd's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Configuration errors are raised before any device work starts; shape errors
/// come from operand mismatches inside matrix operations; device errors come from
/// allocation, transfer, or vendor library failures on the accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid parameters or device selection
    Config,
    /// Dimension or dtype mismatch between operands
    Shape,
    /// Allocation, transfer, or backend library failure
    Device,
}

/// Errors that can occur in tsvd operations
#[derive(Error, Debug)]
pub enum Error {
    /// A parameter failed validation
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidConfig {
        /// The parameter name
        field: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Algorithm selector did not name a known strategy
    #[error("Unknown algorithm '{0}': expected \"power\" or \"solver\"")]
    UnknownAlgorithm(String),

    /// Requested accelerator does not exist or cannot be used
    #[error("Invalid device {id}: {reason}")]
    InvalidDevice {
        /// Requested device index
        id: usize,
        /// Reason the device was rejected
        reason: String,
    },

    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// DType mismatch between operands
    #[error("DType mismatch: {lhs} vs {rhs}")]
    DTypeMismatch {
        /// Left-hand side dtype
        lhs: DType,
        /// Right-hand side dtype
        rhs: DType,
    },

    /// Out of device memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Backend-specific failure (transfer, cuBLAS, cuSOLVER)
    #[error("Backend error: {0}")]
    Backend(String),

    /// CUDA driver error
    #[cfg(feature = "cuda")]
    #[error("CUDA error: {0}")]
    Cuda(#[from] cudarc::driver::DriverError),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. } | Self::UnknownAlgorithm(_) | Self::InvalidDevice { .. } => {
                ErrorKind::Config
            }
            Self::ShapeMismatch { .. } | Self::DTypeMismatch { .. } => ErrorKind::Shape,
            Self::OutOfMemory { .. } | Self::Backend(_) => ErrorKind::Device,
            #[cfg(feature = "cuda")]
            Self::Cuda(_) => ErrorKind::Device,
        }
    }

    /// Returns true for parameter and device-selection errors
    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }
}
