//! Ordinary least squares solver.
//!
//! Every regime fit solves a small problem of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! where `x_i = [1, njs, njs², …]`. We solve it with an SVD so tall systems
//! (many more observations than parameters) are handled directly.
//! (Nalgebra's `QR::solve` is intended for square systems.)
//!
//! Unlike a pseudo-inverse, a rank-deficient design is reported as a failure:
//! a degree whose columns are linearly dependent on the data (e.g. every
//! observation at the same NJS) has no meaningful coefficients, and the caller
//! must skip it rather than accept a minimum-norm answer.

use std::fmt;

use nalgebra::{DMatrix, DVector};

/// Why a least-squares system could not be solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveFailure {
    /// Fewer rows than unknowns.
    Underdetermined { rows: usize, cols: usize },
    /// Numerical rank below the number of unknowns.
    RankDeficient { rank: usize, cols: usize },
    /// The SVD produced NaN/inf coefficients.
    NonFinite,
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveFailure::Underdetermined { rows, cols } => {
                write!(f, "underdetermined ({rows} rows for {cols} unknowns)")
            }
            SolveFailure::RankDeficient { rank, cols } => {
                write!(f, "singular design (rank {rank} of {cols})")
            }
            SolveFailure::NonFinite => write!(f, "non-finite solution"),
        }
    }
}

/// Singular values below `σ_max · RANK_RTOL` count as zero.
///
/// Raw NJS powers up to `njs⁴` are badly scaled but still far above this
/// threshold on realistic NJS spreads; exactly repeated NJS values fall well
/// below it.
const RANK_RTOL: f64 = 1e-12;

/// Solve a least squares problem using SVD.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, SolveFailure> {
    let (rows, cols) = x.shape();
    if cols == 0 || rows < cols {
        return Err(SolveFailure::Underdetermined { rows, cols });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(SolveFailure::NonFinite);
    }

    let svd = x.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    let tol = sigma_max * RANK_RTOL;

    let rank = svd.rank(tol);
    if rank < cols {
        return Err(SolveFailure::RankDeficient { rank, cols });
    }

    let beta = svd.solve(y, tol).map_err(|_| SolveFailure::NonFinite)?;
    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(SolveFailure::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn duplicate_columns_are_rank_deficient() {
        // Every row has x = 4, so [1, x] is collinear.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 4.0, 1.0, 4.0, 1.0, 4.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);

        let err = solve_least_squares(&x, &y).unwrap_err();
        assert_eq!(err, SolveFailure::RankDeficient { rank: 1, cols: 2 });
    }

    #[test]
    fn wide_system_is_underdetermined() {
        let x = DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 1.0, 1.0, 2.0, 4.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);

        let err = solve_least_squares(&x, &y).unwrap_err();
        assert_eq!(err, SolveFailure::Underdetermined { rows: 2, cols: 3 });
    }
}
