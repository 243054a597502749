//! Common test utilities
#![allow(dead_code)]

use tsvd::matrix::DeviceMatrix;
use tsvd::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use tsvd::runtime::{DeviceContext, Runtime};
#[cfg(feature = "cuda")]
use tsvd::runtime::cuda::{CudaClient, CudaDevice, CudaRuntime};

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a CPU client and device for testing
pub fn create_cpu_client() -> (CpuClient, CpuDevice) {
    let device = CpuDevice::new();
    let client = CpuRuntime::default_client(&device).unwrap();
    (client, device)
}

/// Create a CPU context for the dispatcher
pub fn create_cpu_context() -> DeviceContext<CpuRuntime> {
    DeviceContext::new(&CpuDevice::new()).unwrap()
}

/// Create a CUDA client and device, returning None if CUDA is unavailable
#[cfg(feature = "cuda")]
pub fn create_cuda_client() -> Option<(CudaClient, CudaDevice)> {
    if !tsvd::runtime::cuda::is_cuda_available() {
        return None;
    }
    let device = CudaDevice::new(0);
    let client = CudaRuntime::default_client(&device).ok()?;
    Some((client, device))
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Sum of `Σ σᵢ aᵢ bᵢᵗ` as a row-major `[a.len(), b.len()]` buffer
pub fn sum_of_outer(terms: &[(f64, Vec<f64>, Vec<f64>)]) -> Vec<f64> {
    let rows = terms[0].1.len();
    let cols = terms[0].2.len();
    let mut x = vec![0.0; rows * cols];
    for (sigma, a, b) in terms {
        for r in 0..rows {
            for c in 0..cols {
                x[r * cols + c] += sigma * a[r] * b[c];
            }
        }
    }
    x
}

/// `4 × 3` matrix `5·u vᵗ + 0.01·u₂ v₂ᵗ`: singular values exactly 5, 0.01, 0
pub fn rank_two_4x3() -> Vec<f64> {
    sum_of_outer(&[
        (5.0, vec![0.5, 0.5, 0.5, 0.5], vec![1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0]),
        (0.01, vec![0.5, -0.5, 0.5, -0.5], vec![2.0 / 3.0, 1.0 / 3.0, -2.0 / 3.0]),
    ])
}

/// `4 × 3` rank-one matrix `5·u vᵗ`
pub fn rank_one_4x3() -> Vec<f64> {
    sum_of_outer(&[(5.0, vec![0.5, 0.5, 0.5, 0.5], vec![1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0])])
}

/// Right singular vectors of [`separated_6x4`], one per row
pub fn separated_6x4_right() -> Vec<Vec<f64>> {
    vec![
        vec![0.5, 0.5, 0.5, 0.5],
        vec![0.5, -0.5, 0.5, -0.5],
        vec![0.5, 0.5, -0.5, -0.5],
        vec![0.5, -0.5, -0.5, 0.5],
    ]
}

/// Singular values of [`separated_6x4`]
pub const SEPARATED_6X4_SIGMA: [f64; 4] = [10.0, 5.0, 2.0, 1.0];

/// `6 × 4` full-rank matrix with well separated singular values 10, 5, 2, 1
pub fn separated_6x4() -> Vec<f64> {
    spectrum_6x4(&SEPARATED_6X4_SIGMA)
}

/// `6 × 4` matrix with the given singular values and fixed singular vectors
pub fn spectrum_6x4(sigma: &[f64; 4]) -> Vec<f64> {
    let s6 = 1.0 / 6.0f64.sqrt();
    let left = [
        vec![s6, s6, s6, s6, s6, s6],
        vec![s6, -s6, s6, -s6, s6, -s6],
        vec![0.5, 0.5, -0.5, -0.5, 0.0, 0.0],
        vec![0.5, -0.5, -0.5, 0.5, 0.0, 0.0],
    ];
    let right = separated_6x4_right();
    let terms: Vec<_> = sigma
        .iter()
        .zip(left)
        .zip(right)
        .map(|((&s, a), b)| (s, a, b))
        .collect();
    sum_of_outer(&terms)
}

/// Upload a row-major f64 buffer to the CPU runtime
pub fn cpu_matrix(data: &[f64], rows: usize, cols: usize) -> DeviceMatrix<CpuRuntime> {
    DeviceMatrix::from_slice(data, rows, cols, &CpuDevice::new()).unwrap()
}

/// Column `i` of a row-major `[rows, cols]` buffer
pub fn column(data: &[f64], cols: usize, i: usize) -> Vec<f64> {
    data.iter().skip(i).step_by(cols).copied().collect()
}

/// `|a · b|`, equal to 1 for parallel unit vectors of either sign
pub fn abs_cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    (dot / (na * nb)).abs()
}

/// Frobenius norm of `a - b`
pub fn frobenius_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// Assert a slice is sorted in non-increasing order
pub fn assert_descending(values: &[f64], msg: &str) {
    assert!(
        values.windows(2).all(|w| w[0] >= w[1]),
        "{}: not descending: {:?}",
        msg,
        values
    );
}
