//! Polynomial NJS → JD model.
//!
//! A model of degree `d` predicts
//!
//! ```text
//! jd(x) = intercept + c1·x + c2·x² + … + cd·xᵈ
//! ```
//!
//! and remembers the R² it achieved on the observations it was fit on.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::math::eval_power_series;

/// Lowest and highest polynomial degree the fitter will try.
pub const MIN_DEGREE: usize = 1;
pub const MAX_DEGREE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialModel {
    pub degree: usize,
    pub intercept: f64,
    /// `coefficients[i]` multiplies `x^(i+1)`.
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    /// Number of observations the model was fit on.
    pub n: usize,
}

impl PolynomialModel {
    /// Build a model from a solved parameter vector `[intercept, c1, …, cd]`.
    pub fn from_beta(beta: &[f64], r_squared: f64, n: usize) -> Self {
        let (intercept, coefficients) = match beta.split_first() {
            Some((first, rest)) => (*first, rest.to_vec()),
            None => (0.0, Vec::new()),
        };
        Self {
            degree: coefficients.len(),
            intercept,
            coefficients,
            r_squared,
            n,
        }
    }

    /// Predict JD at `njs` using the model's own degree.
    pub fn predict(&self, njs: f64) -> Result<f64, PipelineError> {
        self.predict_with_degree(self.degree, njs)
    }

    /// Predict JD at `njs`, checking that the caller expects `degree` terms.
    ///
    /// Asking for a different degree than the model was fit with, or holding
    /// a coefficient list that disagrees with the stored degree (e.g. a
    /// hand-edited export), is an evaluation error.
    pub fn predict_with_degree(&self, degree: usize, njs: f64) -> Result<f64, PipelineError> {
        if degree != self.degree {
            return Err(PipelineError::Evaluation {
                expected: self.degree,
                actual: degree,
            });
        }
        if self.coefficients.len() != self.degree {
            return Err(PipelineError::Evaluation {
                expected: self.degree,
                actual: self.coefficients.len(),
            });
        }
        Ok(eval_power_series(njs, self.intercept, &self.coefficients))
    }

    /// Human-readable formula, e.g. `jd = 30.1 - 0.75·njs`.
    pub fn formula(&self) -> String {
        let mut out = format!("jd = {:.4}", self.intercept);
        for (i, &c) in self.coefficients.iter().enumerate() {
            let sign = if c < 0.0 { '-' } else { '+' };
            let term = match i + 1 {
                1 => "njs".to_string(),
                p => format!("njs^{p}"),
            };
            out.push_str(&format!(" {sign} {:.6}·{term}", c.abs()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> PolynomialModel {
        PolynomialModel::from_beta(&[1.0, 2.0], 1.0, 5)
    }

    #[test]
    fn from_beta_splits_intercept() {
        let m = PolynomialModel::from_beta(&[3.0, -0.5, 0.01], 0.9, 10);
        assert_eq!(m.degree, 2);
        assert_eq!(m.intercept, 3.0);
        assert_eq!(m.coefficients, vec![-0.5, 0.01]);
    }

    #[test]
    fn predict_evaluates_polynomial() {
        assert_eq!(linear().predict(16.0).unwrap(), 33.0);
    }

    #[test]
    fn predict_with_wrong_degree_is_an_error() {
        let err = linear().predict_with_degree(3, 16.0).unwrap_err();
        assert!(matches!(err, PipelineError::Evaluation { expected: 1, actual: 3 }));
    }

    #[test]
    fn inconsistent_coefficient_count_is_an_error() {
        let mut m = linear();
        m.coefficients.push(0.5);
        assert!(matches!(
            m.predict(16.0),
            Err(PipelineError::Evaluation { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn formula_lists_every_term() {
        let m = PolynomialModel::from_beta(&[30.0, -0.75, 0.002], 0.95, 12);
        let f = m.formula();
        assert!(f.starts_with("jd = 30.0000"), "{f}");
        assert!(f.contains("- 0.750000·njs"), "{f}");
        assert!(f.contains("+ 0.002000·njs^2"), "{f}");
    }
}
