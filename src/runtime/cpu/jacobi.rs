//! Cyclic two-sided Jacobi eigensolver for symmetric matrices
//!
//! Works in f64 on a host copy. Rotation parameters use the numerically stable
//! LAPACK formula to avoid catastrophic cancellation.

/// Maximum number of full sweeps over the off-diagonal
const MAX_SWEEPS: usize = 60;

/// Jacobi rotation parameters (cosine and sine of rotation angle).
///
/// These parameters define a Givens rotation matrix:
/// ```text
/// J = [ c  -s ]
///     [ s   c ]
/// ```
#[derive(Debug, Clone, Copy)]
pub struct JacobiRotation {
    /// Cosine of rotation angle
    pub c: f64,
    /// Sine of rotation angle
    pub s: f64,
}

impl JacobiRotation {
    /// Compute the rotation that zeroes `a_pq` of a symmetric 2x2 block.
    ///
    /// # Algorithm
    /// ```text
    /// τ = (a_qq - a_pp) / (2 * a_pq)
    /// t = sign(τ) / (|τ| + sqrt(1 + τ²))
    /// c = 1 / sqrt(1 + t²)
    /// s = t * c
    /// ```
    #[inline]
    pub fn compute(a_pp: f64, a_qq: f64, a_pq: f64) -> Self {
        let tau_den = 2.0 * a_pq;

        if tau_den.abs() < 1e-300 {
            return Self { c: 1.0, s: 0.0 };
        }

        let tau = (a_qq - a_pp) / tau_den;
        let t = if tau >= 0.0 {
            1.0 / (tau + (1.0 + tau * tau).sqrt())
        } else {
            -1.0 / (-tau + (1.0 + tau * tau).sqrt())
        };

        let c = 1.0 / (1.0 + t * t).sqrt();
        Self { c, s: t * c }
    }
}

/// Apply `A' = Jᵗ A J` in place, zeroing `A[p,q]` and `A[q,p]`.
fn apply_two_sided_rotation(work: &mut [f64], n: usize, p: usize, q: usize, rot: &JacobiRotation) {
    let JacobiRotation { c, s } = *rot;
    let a_pp = work[p * n + p];
    let a_qq = work[q * n + q];
    let a_pq = work[p * n + q];

    for k in 0..n {
        if k != p && k != q {
            let a_kp = work[k * n + p];
            let a_kq = work[k * n + q];

            let new_kp = c * a_kp - s * a_kq;
            let new_kq = s * a_kp + c * a_kq;

            work[k * n + p] = new_kp;
            work[p * n + k] = new_kp;
            work[k * n + q] = new_kq;
            work[q * n + k] = new_kq;
        }
    }

    work[p * n + p] = c * c * a_pp - 2.0 * c * s * a_pq + s * s * a_qq;
    work[q * n + q] = s * s * a_pp + 2.0 * c * s * a_pq + c * c * a_qq;
    work[p * n + q] = 0.0;
    work[q * n + p] = 0.0;
}

/// Rotate rows `p` and `q` of the eigenvector accumulator (`W = Jᵗ W`).
fn apply_rotation_to_rows(w: &mut [f64], n: usize, p: usize, q: usize, rot: &JacobiRotation) {
    let JacobiRotation { c, s } = *rot;
    for k in 0..n {
        let wp = w[p * n + k];
        let wq = w[q * n + k];
        w[p * n + k] = c * wp - s * wq;
        w[q * n + k] = s * wp + c * wq;
    }
}

/// Sort indices by value (descending).
#[inline]
pub fn argsort_desc(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&i, &j| {
        values[j]
            .partial_cmp(&values[i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices
}

/// Eigendecomposition of a symmetric `n × n` row-major matrix
///
/// Only the lower triangle of `a` is read. Returns `(values, vectors)` with
/// values in descending order and `vectors` row-major `n × n`, row `i` being
/// the unit eigenvector for `values[i]`.
///
/// Algorithm: cyclic Jacobi
/// 1. W = I_n
/// 2. REPEAT (max `MAX_SWEEPS`):
///    - stop once every |A[p,q]| ≤ eps · ‖A‖_F
///    - FOR each pair p < q with |A[p,q]| above the threshold:
///      rotate A ← Jᵗ A J and W ← Jᵗ W
/// 3. eigenvalues = diag(A), sorted descending with the rows of W
pub fn jacobi_eigh(a: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut work = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..=i {
            let val = a[i * n + j];
            work[i * n + j] = val;
            work[j * n + i] = val;
        }
    }

    let mut w = vec![0.0f64; n * n];
    for i in 0..n {
        w[i * n + i] = 1.0;
    }

    let frobenius = work.iter().map(|v| v * v).sum::<f64>().sqrt();
    let tol = f64::EPSILON * frobenius;

    for _sweep in 0..MAX_SWEEPS {
        let mut max_off_diag = 0.0f64;
        for i in 0..n {
            for j in (i + 1)..n {
                max_off_diag = max_off_diag.max(work[i * n + j].abs());
            }
        }
        if max_off_diag <= tol {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let a_pq = work[p * n + q];
                if a_pq.abs() <= tol {
                    continue;
                }
                let rot = JacobiRotation::compute(work[p * n + p], work[q * n + q], a_pq);
                apply_two_sided_rotation(&mut work, n, p, q, &rot);
                apply_rotation_to_rows(&mut w, n, p, q, &rot);
            }
        }
    }

    let diag: Vec<f64> = (0..n).map(|i| work[i * n + i]).collect();
    let order = argsort_desc(&diag);

    let values = order.iter().map(|&i| diag[i]).collect();
    let mut vectors = vec![0.0f64; n * n];
    for (dst, &src) in order.iter().enumerate() {
        vectors[dst * n..(dst + 1) * n].copy_from_slice(&w[src * n..(src + 1) * n]);
    }

    (values, vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jacobi_rotation_zero_offdiag() {
        let rot = JacobiRotation::compute(1.0, 2.0, 0.0);
        assert!((rot.c - 1.0).abs() < 1e-10);
        assert!(rot.s.abs() < 1e-10);
    }

    #[test]
    fn test_jacobi_rotation_equal_diag() {
        let rot = JacobiRotation::compute(1.0, 1.0, 0.5);
        let expected = 1.0 / 2.0f64.sqrt();
        assert!((rot.c - expected).abs() < 1e-10);
        assert!((rot.s.abs() - expected).abs() < 1e-10);
    }

    #[test]
    fn test_argsort_desc_keeps_sign() {
        let indices = argsort_desc(&[1.0, -3.0, 2.0, -0.5]);
        assert_eq!(indices, vec![2, 0, 3, 1]);
    }

    #[test]
    fn test_jacobi_eigh_reconstructs() {
        let n = 4;
        let a = vec![
            4.0, 1.0, -2.0, 2.0, //
            1.0, 2.0, 0.0, 1.0, //
            -2.0, 0.0, 3.0, -2.0, //
            2.0, 1.0, -2.0, -1.0,
        ];
        let (values, vectors) = jacobi_eigh(&a, n);

        for pair in values.windows(2) {
            assert!(pair[0] >= pair[1]);
        }

        // A = Σ λ_i w_i w_iᵗ
        for r in 0..n {
            for c in 0..n {
                let rebuilt: f64 = (0..n)
                    .map(|i| values[i] * vectors[i * n + r] * vectors[i * n + c])
                    .sum();
                assert!((rebuilt - a[r * n + c]).abs() < 1e-10);
            }
        }

        // Rows are orthonormal
        for i in 0..n {
            for j in 0..n {
                let d: f64 = (0..n).map(|k| vectors[i * n + k] * vectors[j * n + k]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((d - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_jacobi_eigh_zero_matrix() {
        let (values, vectors) = jacobi_eigh(&[0.0; 9], 3);
        assert_eq!(values, vec![0.0; 3]);
        assert_eq!(vectors, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }
}
