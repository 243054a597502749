//! Outer-product updater: `A ← A ∓ scale · v vᵗ`
//!
//! The deflation primitive of the power-iteration engine. Executed as one
//! rank-1 update on the device (`ger` on CUDA, a row-parallel loop on CPU).

use crate::error::{Error, Result};
use crate::matrix::DeviceMatrix;
use crate::ops::MatrixOps;
use crate::runtime::Runtime;

/// Direction of the rank-1 update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OuterSign {
    /// `A ← A − scale · v vᵗ`
    #[default]
    Subtract,
    /// `A ← A + scale · v vᵗ`
    Add,
}

impl OuterSign {
    #[inline]
    fn apply(self, scale: f64) -> f64 {
        match self {
            OuterSign::Subtract => -scale,
            OuterSign::Add => scale,
        }
    }
}

/// Apply `A ← A ∓ scale · v vᵗ` in place
///
/// `a` must be square `[m, m]`, `v` an `[m, 1]` column and `vt` its `[1, m]`
/// row view (see [`DeviceMatrix::transposed_vector`]). Any other shapes fail
/// with `ShapeMismatch` and leave `a` untouched.
pub fn outer_product<R, C>(
    client: &C,
    a: &mut DeviceMatrix<R>,
    scale: f64,
    v: &DeviceMatrix<R>,
    vt: &DeviceMatrix<R>,
    sign: OuterSign,
) -> Result<()>
where
    R: Runtime,
    C: MatrixOps<R>,
{
    let m = a.rows();
    if a.cols() != m {
        return Err(Error::shape_mismatch(&[m, m], &a.shape()));
    }
    if v.shape() != [m, 1] {
        return Err(Error::shape_mismatch(&[m, 1], &v.shape()));
    }
    if vt.shape() != [1, m] {
        return Err(Error::shape_mismatch(&[1, m], &vt.shape()));
    }
    client.rank_one_update(a, sign.apply(scale), v, vt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    #[test]
    fn test_outer_product_subtract_and_add() {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        let mut a =
            DeviceMatrix::<CpuRuntime>::from_slice(&[4.0f64, 2.0, 2.0, 1.0], 2, 2, &device)
                .unwrap();
        let v = DeviceMatrix::<CpuRuntime>::from_slice(&[2.0f64, 1.0], 2, 1, &device).unwrap();
        let vt = v.transposed_vector().unwrap();

        outer_product(&client, &mut a, 1.0, &v, &vt, OuterSign::Subtract).unwrap();
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![0.0; 4]);

        outer_product(&client, &mut a, 0.5, &v, &vt, OuterSign::Add).unwrap();
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![2.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn test_outer_product_shape_mismatch() {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        let mut a = DeviceMatrix::<CpuRuntime>::zeros(3, 3, crate::dtype::DType::F64, &device)
            .unwrap();
        let v = DeviceMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0], 2, 1, &device).unwrap();
        let vt = v.transposed_vector().unwrap();

        let err = outer_product(&client, &mut a, 1.0, &v, &vt, OuterSign::Subtract).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        // vt passed in column orientation
        let v3 = DeviceMatrix::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], 3, 1, &device)
            .unwrap();
        let err = outer_product(&client, &mut a, 1.0, &v3, &v3, OuterSign::Subtract).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![0.0; 9]);
    }
}
