//! Per-regime polynomial fitting with automatic degree selection.
//!
//! Given one regime's observations we, for each degree `d = 1..=max_degree`:
//! - build the design matrix `[1, njs, njs², …, njsᵈ]`
//! - solve the least-squares problem for `[intercept, c1, …, cd]`
//! - score the fit with `R² = 1 - SS_res / SS_tot`
//! - compute `BIC = n·ln(SS_res/n) + (d + 1)·ln(n)`
//!
//! Each degree yields its own `Result`. Failed degrees are kept as
//! diagnostics. Among the successful ones the lowest BIC wins, except that a
//! lower degree within `bic_margin` of it is preferred. Higher degrees always
//! reach an R² at least as high on the same data, so comparing R² alone would
//! pick the highest degree whenever the data carries any noise. If no degree
//! succeeds the regime is reported as unfittable; there is no fallback model.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::Observation;
use crate::error::PipelineError;
use crate::math::{SolveFailure, eval_power_series, fill_power_row, goodness_of_fit, solve_least_squares};
use crate::models::{MAX_DEGREE, MIN_DEGREE, PolynomialModel};

/// Fitting options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Highest degree to try (`1..=4`).
    pub max_degree: usize,
    /// Regimes smaller than this are never fit (at least 3).
    pub min_observations: usize,
    /// A lower degree whose BIC is within this many points of the best BIC
    /// is chosen instead.
    pub bic_margin: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_degree: MAX_DEGREE,
            min_observations: 3,
            bic_margin: 2.0,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&self.max_degree) {
            return Err(PipelineError::InvalidConfig(format!(
                "max_degree must be in [{MIN_DEGREE}, {MAX_DEGREE}] (got {})",
                self.max_degree
            )));
        }
        if self.min_observations < 3 {
            return Err(PipelineError::InvalidConfig(format!(
                "min_observations must be >= 3 (got {})",
                self.min_observations
            )));
        }
        if !(self.bic_margin.is_finite() && self.bic_margin >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "bic_margin must be finite and >= 0 (got {})",
                self.bic_margin
            )));
        }
        Ok(())
    }
}

/// Why a single degree could not be fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegreeFailureReason {
    /// Fewer observations than coefficients.
    TooFewObservations { observations: usize, required: usize },
    /// The design matrix is rank deficient (e.g. too few distinct NJS values).
    Singular { rank: usize },
    /// The solve or the score produced NaN/inf.
    NonFinite,
}

/// A degree that was attempted and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeFailure {
    pub degree: usize,
    pub reason: DegreeFailureReason,
}

impl fmt::Display for DegreeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            DegreeFailureReason::TooFewObservations {
                observations,
                required,
            } => write!(
                f,
                "degree {}: {observations} observation(s), {required} needed",
                self.degree
            ),
            DegreeFailureReason::Singular { rank } => write!(
                f,
                "degree {}: singular design (rank {rank} of {})",
                self.degree,
                self.degree + 1
            ),
            DegreeFailureReason::NonFinite => write!(f, "degree {}: non-finite fit", self.degree),
        }
    }
}

/// Regime-level fit failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("{members} observation(s), at least {required} are needed")]
    InsufficientData { members: usize, required: usize },

    #[error("every degree failed for {members} observations")]
    NoDegreeFit {
        members: usize,
        attempts: Vec<DegreeFailure>,
    },
}

impl FitError {
    /// Attach the regime index this failure belongs to.
    pub fn into_pipeline_error(self, regime: usize) -> PipelineError {
        match self {
            FitError::InsufficientData { members, required } => PipelineError::InsufficientData {
                regime,
                members,
                required,
            },
            FitError::NoDegreeFit { members, attempts } => PipelineError::FitFailure {
                regime,
                members,
                attempts,
            },
        }
    }
}

/// One successfully fit degree with its residual score.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeFit {
    pub model: PolynomialModel,
    /// Residual sum of squares.
    pub sse: f64,
    pub bic: f64,
}

/// Outcome of the degree search for one regime.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    pub best: PolynomialModel,
    /// Every successful degree, lowest first.
    pub candidates: Vec<PolynomialModel>,
    /// BIC of each entry in `candidates`.
    pub bic: Vec<f64>,
    pub failures: Vec<DegreeFailure>,
}

/// Fit degrees `1..=opts.max_degree` and keep the best by BIC.
pub fn fit_best_polynomial(
    observations: &[Observation],
    opts: &FitOptions,
) -> Result<PolynomialFit, FitError> {
    let n = observations.len();
    if n < opts.min_observations {
        return Err(FitError::InsufficientData {
            members: n,
            required: opts.min_observations,
        });
    }

    let mut fits: Vec<DegreeFit> = Vec::new();
    let mut failures = Vec::new();
    for degree in MIN_DEGREE..=opts.max_degree {
        match fit_degree(observations, degree) {
            Ok(fit) => {
                debug!(degree, r_squared = fit.model.r_squared, bic = fit.bic, "degree fit");
                fits.push(fit);
            }
            Err(failure) => {
                debug!(%failure, "degree skipped");
                failures.push(failure);
            }
        }
    }

    let best_bic = fits.iter().map(|f| f.bic).fold(f64::INFINITY, f64::min);

    // Fits are in ascending degree order, so the first one within the margin
    // is the simplest model that is about as good as the best.
    let Some(best) = fits.iter().find(|f| f.bic <= best_bic + opts.bic_margin) else {
        return Err(FitError::NoDegreeFit {
            members: n,
            attempts: failures,
        });
    };
    let best = best.model.clone();

    let bic = fits.iter().map(|f| f.bic).collect();
    let candidates = fits.into_iter().map(|f| f.model).collect();
    Ok(PolynomialFit {
        best,
        candidates,
        bic,
        failures,
    })
}

/// `BIC = n·ln(SSE/n) + k·ln(n)`, with `SSE/n` floored so exact fits tie.
fn bic(n: usize, sse: f64, k: usize) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(1e-12);
    n_f * sse_per.ln() + (k as f64) * n_f.ln()
}

/// Fit a single polynomial degree by ordinary least squares.
///
/// Fewer observations than coefficients, or a rank-deficient design, fail the
/// degree. An exactly determined system is solved like any other.
pub fn fit_degree(observations: &[Observation], degree: usize) -> Result<DegreeFit, DegreeFailure> {
    let n = observations.len();
    let cols = degree + 1;

    let mut x = DMatrix::<f64>::zeros(n, cols);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; cols];
    for (i, obs) in observations.iter().enumerate() {
        fill_power_row(obs.njs, &mut row);
        for (j, &v) in row.iter().enumerate() {
            x[(i, j)] = v;
        }
        y[i] = obs.jd;
    }

    let beta = solve_least_squares(&x, &y).map_err(|e| DegreeFailure {
        degree,
        reason: match e {
            SolveFailure::Underdetermined { rows, cols } => DegreeFailureReason::TooFewObservations {
                observations: rows,
                required: cols,
            },
            SolveFailure::RankDeficient { rank, .. } => DegreeFailureReason::Singular { rank },
            SolveFailure::NonFinite => DegreeFailureReason::NonFinite,
        },
    })?;
    let beta: Vec<f64> = beta.iter().copied().collect();

    // Predictions use the same evaluation path as curve sampling.
    let observed: Vec<f64> = observations.iter().map(|o| o.jd).collect();
    let predicted: Vec<f64> = observations
        .iter()
        .map(|o| eval_power_series(o.njs, beta[0], &beta[1..]))
        .collect();

    let non_finite = DegreeFailure {
        degree,
        reason: DegreeFailureReason::NonFinite,
    };
    let gof = goodness_of_fit(&observed, &predicted).ok_or(non_finite)?;
    if !gof.r_squared.is_finite() {
        return Err(non_finite);
    }

    Ok(DegreeFit {
        model: PolynomialModel::from_beta(&beta, gof.r_squared, n),
        sse: gof.ss_res,
        bic: bic(n, gof.ss_res, cols),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(njs: &[f64], slope: f64, intercept: f64) -> Vec<Observation> {
        njs.iter()
            .map(|&x| Observation::new(x, slope * x + intercept))
            .collect()
    }

    #[test]
    fn perfectly_linear_data_selects_degree_one() {
        let data = line(&[12.0, 14.0, 15.5, 16.0, 18.0, 19.5, 21.0, 23.0], 2.0, 1.0);

        let fit = fit_best_polynomial(&data, &FitOptions::default()).unwrap();
        assert_eq!(fit.best.degree, 1);
        assert!((fit.best.r_squared - 1.0).abs() < 1e-6);
        assert!((fit.best.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((fit.best.intercept - 1.0).abs() < 1e-6);
    }

    #[test]
    fn quadratic_data_selects_degree_two() {
        let data: Vec<Observation> = (0..12)
            .map(|i| {
                let x = 10.0 + i as f64;
                Observation::new(x, 0.05 * x * x - 2.0 * x + 35.0)
            })
            .collect();

        let fit = fit_best_polynomial(&data, &FitOptions::default()).unwrap();
        assert_eq!(fit.best.degree, 2);
        assert!(fit.best.r_squared > 1.0 - 1e-9);
        assert!(fit.candidates[0].r_squared < fit.best.r_squared);
    }

    #[test]
    fn three_observations_are_interpolated_by_a_parabola() {
        let data = vec![
            Observation::new(15.0, 19.0),
            Observation::new(16.0, 18.2),
            Observation::new(17.0, 17.9),
        ];

        let fit = fit_best_polynomial(&data, &FitOptions::default()).unwrap();
        assert_eq!(fit.best.degree, 2);
        assert!((fit.best.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(fit.candidates.len(), 2);
        assert!(fit.candidates[0].r_squared < 0.95);
        assert_eq!(
            fit.failures,
            vec![
                DegreeFailure {
                    degree: 3,
                    reason: DegreeFailureReason::TooFewObservations {
                        observations: 3,
                        required: 4
                    },
                },
                DegreeFailure {
                    degree: 4,
                    reason: DegreeFailureReason::TooFewObservations {
                        observations: 3,
                        required: 5
                    },
                },
            ]
        );
    }

    #[test]
    fn exactly_determined_degree_is_solved() {
        let data = line(&[14.0, 15.0, 17.0, 20.0], -0.5, 26.0);
        let fit = fit_degree(&data, 3).unwrap();
        assert_eq!(fit.model.degree, 3);
        assert!((fit.model.r_squared - 1.0).abs() < 1e-9);
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn noisy_line_keeps_degree_one() {
        // Alternating ±0.3 noise: higher degrees raise R² slightly but not
        // enough to pay for their extra coefficients.
        let data: Vec<Observation> = (0..30)
            .map(|i| {
                let njs = 14.0 + i as f64 * (4.0 / 29.0);
                let noise = if i % 2 == 0 { 0.3 } else { -0.3 };
                Observation::new(njs, 18.5 - 2.0 * (njs - 16.0) + noise)
            })
            .collect();

        let fit = fit_best_polynomial(&data, &FitOptions::default()).unwrap();
        assert!(fit.candidates.len() >= 2);
        assert_eq!(fit.best.degree, 1);
        assert!(fit.best.r_squared > 0.9);
        // A higher degree scores at least as high an R² but is not selected.
        let last = fit.candidates.last().unwrap();
        assert!(last.degree > 1);
        assert!(last.r_squared >= fit.best.r_squared - 1e-12);
        assert_eq!(fit.bic.len(), fit.candidates.len());
    }

    #[test]
    fn bic_margin_prefers_the_simpler_degree() {
        let data: Vec<Observation> = (0..20)
            .map(|i| {
                let x = 12.0 + i as f64 * 0.5;
                let noise = if i % 3 == 0 { 0.2 } else { -0.1 };
                Observation::new(x, 0.01 * x * x - 1.0 * x + 30.0 + noise)
            })
            .collect();

        let strict = FitOptions {
            bic_margin: 0.0,
            ..FitOptions::default()
        };
        let strict_fit = fit_best_polynomial(&data, &strict).unwrap();
        let min_bic = strict_fit.bic.iter().copied().fold(f64::INFINITY, f64::min);
        let idx = strict_fit
            .candidates
            .iter()
            .position(|m| m.degree == strict_fit.best.degree)
            .unwrap();
        assert_eq!(strict_fit.bic[idx], min_bic);

        let loose = FitOptions {
            bic_margin: 1e6,
            ..FitOptions::default()
        };
        assert_eq!(fit_best_polynomial(&data, &loose).unwrap().best.degree, 1);
    }

    #[test]
    fn two_observations_are_insufficient() {
        let data = line(&[15.0, 17.0], -1.0, 30.0);
        let err = fit_best_polynomial(&data, &FitOptions::default()).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientData {
                members: 2,
                required: 3
            }
        );
    }

    #[test]
    fn single_njs_value_fails_every_degree() {
        let data = vec![
            Observation::new(16.0, 18.0),
            Observation::new(16.0, 18.5),
            Observation::new(16.0, 19.0),
            Observation::new(16.0, 17.5),
            Observation::new(16.0, 18.2),
            Observation::new(16.0, 18.9),
        ];

        let err = fit_best_polynomial(&data, &FitOptions::default()).unwrap_err();
        let FitError::NoDegreeFit { members, attempts } = err else {
            panic!("expected NoDegreeFit");
        };
        assert_eq!(members, 6);
        assert_eq!(attempts.len(), MAX_DEGREE);
        assert!(attempts[0].reason == DegreeFailureReason::Singular { rank: 1 });

        let pipeline = FitError::NoDegreeFit { members, attempts }.into_pipeline_error(4);
        assert!(matches!(pipeline, PipelineError::FitFailure { regime: 4, .. }));
    }

    #[test]
    fn max_degree_limits_the_search() {
        let data: Vec<Observation> = (0..10)
            .map(|i| {
                let x = 12.0 + i as f64;
                Observation::new(x, 0.1 * x * x - 3.0 * x + 40.0)
            })
            .collect();
        let opts = FitOptions {
            max_degree: 1,
            ..FitOptions::default()
        };

        let fit = fit_best_polynomial(&data, &opts).unwrap();
        assert_eq!(fit.best.degree, 1);
        assert_eq!(fit.candidates.len(), 1);
        assert!(fit.best.r_squared < 1.0);
    }

    #[test]
    fn options_validation_bounds_degree() {
        let mut opts = FitOptions::default();
        opts.max_degree = 5;
        assert!(opts.validate().is_err());
        opts.max_degree = 0;
        assert!(opts.validate().is_err());
        opts.max_degree = 2;
        opts.min_observations = 2;
        assert!(opts.validate().is_err());
        opts.min_observations = 3;
        opts.bic_margin = f64::NAN;
        assert!(opts.validate().is_err());
    }
}
