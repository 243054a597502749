//! Types shared by the eigenpair strategies

use crate::dtype::DType;
use crate::matrix::DeviceMatrix;
use crate::runtime::Runtime;

/// Convergence record for one extracted component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentStats {
    /// Power-iteration steps performed (0 for the direct solver)
    pub iterations: usize,
    /// Whether the change between iterates fell below `tol`
    pub converged: bool,
    /// Final change between iterates (`∞` if no step ran)
    pub delta: f64,
}

impl ComponentStats {
    /// Stats for a component produced by a direct solver
    pub fn exact() -> Self {
        Self {
            iterations: 0,
            converged: true,
            delta: 0.0,
        }
    }

    /// Stats for a component that was never iterated
    pub fn skipped() -> Self {
        Self {
            iterations: 0,
            converged: false,
            delta: f64::INFINITY,
        }
    }
}

/// Leading eigenpairs of a Gram matrix
#[derive(Debug)]
pub struct GramEigen<R: Runtime> {
    /// Eigenvalues, descending; 0 for degenerate components
    pub values: Vec<f64>,
    /// `[k, m]` matrix whose row `i` is the unit eigenvector for `values[i]`
    /// (all zeros for degenerate components)
    pub vectors: DeviceMatrix<R>,
    /// One entry per component
    pub stats: Vec<ComponentStats>,
}

impl<R: Runtime> GramEigen<R> {
    /// Number of components
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no components were requested
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of leading non-degenerate components
    pub fn rank(&self) -> usize {
        self.values.iter().take_while(|&&v| v > 0.0).count()
    }
}

/// Relative eigenvalue floor below which a component counts as degenerate
///
/// A component with eigenvalue `λ ≤ λ₀ · rank_rtol` carries no signal beyond the
/// rounding noise of forming and deflating `XᵗX`: roughly `eps · max(n, m)`
/// for the Gram product, plus `tol²` leaked by inexact earlier eigenvectors.
pub fn rank_rtol(dtype: DType, rows: usize, cols: usize, tol: f64) -> f64 {
    let rounding = dtype.epsilon() * rows.max(cols) as f64;
    let leakage = if tol > 0.0 { tol * tol } else { 0.0 };
    16.0 * rounding.max(leakage)
}
