//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};

/// Trait for types that can be stored in a device matrix
///
/// Implemented for `f32` and `f64`. The arithmetic bounds let CPU kernels work
/// natively in the element type; `to_f64`/`from_f64` are used for scalars that
/// cross the API boundary (norms, eigenvalues, scale factors).
///
/// # Bounds
/// - `Pod + Zeroable` - byte-level host↔device copies (bytemuck)
/// - `Add + Sub + Mul + Div` - kernel arithmetic (Output = Self)
pub trait Element:
    Copy
    + Clone
    + Send
    + Sync
    + Pod
    + Zeroable
    + Debug
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64
    fn to_f64(self) -> f64;

    /// Convert from f64 (rounding for f32)
    fn from_f64(v: f64) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// Square root
    fn sqrt_val(self) -> Self;

    /// Absolute value
    fn abs_val(self) -> Self;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn sqrt_val(self) -> Self {
        self.sqrt()
    }

    #[inline]
    fn abs_val(self) -> Self {
        self.abs()
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn one() -> Self {
        1.0
    }

    #[inline]
    fn sqrt_val(self) -> Self {
        self.sqrt()
    }

    #[inline]
    fn abs_val(self) -> Self {
        self.abs()
    }
}
