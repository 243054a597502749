//! Decomposition parameters
//!
//! [`Params`] is validated once at the entry of a call and is immutable for its
//! duration. Validation never touches a device, so bad configurations fail
//! before any allocation.

use crate::dtype::ComputePrecision;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Strategy used to obtain the leading eigenpairs of the Gram matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Power iteration with explicit rank-1 deflation
    Power,
    /// Full dense symmetric eigendecomposition, truncated to k
    #[default]
    Solver,
}

impl FromStr for Algorithm {
    type Err = Error;

    /// Accepts `"power"`, `"solver"`, `"cusolver"`, or an empty string
    /// (the default solver). Matching is case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "power" => Ok(Algorithm::Power),
            "" | "solver" | "cusolver" => Ok(Algorithm::Solver),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Power => write!(f, "power"),
            Algorithm::Solver => write!(f, "solver"),
        }
    }
}

/// Configuration for one truncated SVD call
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    /// Number of rows of X
    pub rows: usize,
    /// Number of columns of X
    pub cols: usize,
    /// Number of components; `1 ≤ k ≤ min(rows, cols)`
    pub k: usize,
    /// Eigenpair strategy (default: Solver)
    pub algorithm: Algorithm,
    /// Maximum power-iteration steps per component (default: 100)
    pub n_iter: usize,
    /// Seed for the initial candidate vectors (default: 0)
    pub random_state: u64,
    /// Convergence threshold on the change between iterates; `≤ 0` disables
    /// early stopping (default: 1e-5)
    pub tol: f64,
    /// Log per-component progress at `info` instead of `debug`
    pub verbose: bool,
    /// Accelerator index; `None` runs on the host CPU
    pub gpu_id: Option<usize>,
    /// Working precision (default: the input's own)
    pub precision: ComputePrecision,
}

impl Params {
    /// Parameters for an `rows × cols` input and `k` components, other fields default
    pub fn new(rows: usize, cols: usize, k: usize) -> Self {
        Self {
            rows,
            cols,
            k,
            algorithm: Algorithm::default(),
            n_iter: 100,
            random_state: 0,
            tol: 1e-5,
            verbose: false,
            gpu_id: None,
            precision: ComputePrecision::default(),
        }
    }

    /// Set the eigenpair strategy
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the per-component iteration budget
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Set the seed for initial vectors
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Enable verbose progress logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Select an accelerator (`None` for the host CPU)
    pub fn with_gpu_id(mut self, gpu_id: Option<usize>) -> Self {
        self.gpu_id = gpu_id;
        self
    }

    /// Set the working precision
    pub fn with_precision(mut self, precision: ComputePrecision) -> Self {
        self.precision = precision;
        self
    }

    /// Check internal consistency of the parameters
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return Err(Error::invalid_config("rows", "must be at least 1"));
        }
        if self.cols == 0 {
            return Err(Error::invalid_config("cols", "must be at least 1"));
        }
        if self.k == 0 {
            return Err(Error::invalid_config("k", "must be at least 1"));
        }
        let max_k = self.rows.min(self.cols);
        if self.k > max_k {
            return Err(Error::invalid_config(
                "k",
                format!("k={} exceeds min(rows, cols)={}", self.k, max_k),
            ));
        }
        if self.tol.is_nan() {
            return Err(Error::invalid_config("tol", "must not be NaN"));
        }
        Ok(())
    }

    /// Check the parameters against the actual shape of X
    pub fn validate_matrix(&self, rows: usize, cols: usize) -> Result<()> {
        self.validate()?;
        if rows != self.rows || cols != self.cols {
            return Err(Error::invalid_config(
                "rows",
                format!(
                    "declared shape {}x{} does not match input {}x{}",
                    self.rows, self.cols, rows, cols
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("power".parse::<Algorithm>().unwrap(), Algorithm::Power);
        assert_eq!("Solver".parse::<Algorithm>().unwrap(), Algorithm::Solver);
        assert_eq!("cusolver".parse::<Algorithm>().unwrap(), Algorithm::Solver);
        assert_eq!("".parse::<Algorithm>().unwrap(), Algorithm::Solver);

        let err = "qr".parse::<Algorithm>().unwrap_err();
        assert!(err.is_config());
        assert_eq!(Algorithm::Power.to_string(), "power");
    }

    #[test]
    fn test_defaults() {
        let p = Params::new(10, 4, 2);
        assert_eq!(p.algorithm, Algorithm::Solver);
        assert_eq!(p.n_iter, 100);
        assert_eq!(p.tol, 1e-5);
        assert_eq!(p.gpu_id, None);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_k() {
        assert!(Params::new(4, 3, 0).validate().is_err());
        let err = Params::new(4, 3, 4).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { field: "k", .. }));
        assert!(Params::new(4, 3, 3).validate().is_ok());
    }

    #[test]
    fn test_validate_matrix_shape() {
        let p = Params::new(4, 3, 1);
        assert!(p.validate_matrix(4, 3).is_ok());
        assert!(p.validate_matrix(3, 4).unwrap_err().is_config());
    }

    #[test]
    fn test_validate_tol_nan() {
        let p = Params::new(4, 3, 1).with_tol(f64::NAN);
        assert!(p.validate().is_err());
        assert!(Params::new(4, 3, 1).with_tol(-1.0).validate().is_ok());
    }
}
