//! Truncated SVD algorithms
//!
//! Both strategies reduce the problem to the leading eigenpairs of the Gram
//! matrix `G = XᵗX`; the dispatcher in [`tsvd`] turns those into singular
//! triplets.
//!
//! ```text
//! tsvd (dispatcher)
//! ├── power   power iteration + deflation   ──┐
//! │     └── outer   rank-1 Gram update        ├── GramEigen
//! └── solver  dense symmetric eigensolver   ──┘
//! ```

pub mod outer;
pub mod power;
pub mod solver;
pub mod tsvd;
mod types;

pub use outer::{OuterSign, outer_product};
pub use power::{PowerOptions, power_eigen};
pub use solver::{FullDecomposition, gram_eigen, solve_full};
pub use tsvd::{TruncatedSvd, truncated_svd, truncated_svd_matrix};
pub use types::{ComponentStats, GramEigen, rank_rtol};
