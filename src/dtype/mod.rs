//! Data type system for device matrices
//!
//! Only the two IEEE floating-point widths are supported. `DType` is the
//! runtime tag stored alongside device buffers; [`Element`] maps Rust types to it.

mod element;

pub use element::Element;

use std::fmt;

/// Working precision for a decomposition.
///
/// Inputs are converted to the resolved precision before the Gram matrix is
/// formed and results are converted back to the input type afterwards.
///
/// # Resolution
///
/// | Setting   | f32 input | f64 input |
/// |-----------|-----------|-----------|
/// | `Input`   | f32       | f64       |
/// | `F32`     | f32       | f32       |
/// | `F64`     | f64       | f64       |
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ComputePrecision {
    /// Compute in the input's own precision
    #[default]
    Input,
    /// Compute in single precision
    F32,
    /// Compute in double precision
    F64,
}

impl ComputePrecision {
    /// Resolve the working dtype for an input of the given dtype
    #[inline]
    pub fn resolve(self, input: DType) -> DType {
        match self {
            ComputePrecision::Input => input,
            ComputePrecision::F32 => DType::F32,
            ComputePrecision::F64 => DType::F64,
        }
    }
}

/// Element type of a device buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 64-bit IEEE float
    F64,
    /// 32-bit IEEE float
    F32,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DType::F64 => 8,
            DType::F32 => 4,
        }
    }

    /// Machine epsilon for this dtype
    #[inline]
    pub const fn epsilon(self) -> f64 {
        match self {
            DType::F64 => f64::EPSILON,
            DType::F32 => f32::EPSILON as f64,
        }
    }

    /// Short name used in logs and error messages
    pub const fn name(self) -> &'static str {
        match self {
            DType::F64 => "f64",
            DType::F32 => "f32",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
