//! Error types.
//!
//! - [`PipelineError`]: typed failures of the clustering/fitting pipeline.
//! - [`AppError`]: what the `jd` binary reports (exit code + message).

use thiserror::Error;

use crate::fit::DegreeFailure;

/// Failures raised by the regression-and-clustering pipeline.
///
/// `InsufficientData` and `FitFailure` are regime-local: the pipeline records
/// them in [`crate::app::pipeline::PipelineOutput::skipped`] and keeps going.
/// The remaining variants abort the run.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("regime {regime}: {members} observation(s), at least {required} are needed for a fit")]
    InsufficientData {
        regime: usize,
        members: usize,
        required: usize,
    },

    #[error(
        "regime {regime}: no polynomial degree could be fit to {members} observations ({})",
        format_attempts(.attempts)
    )]
    FitFailure {
        regime: usize,
        members: usize,
        attempts: Vec<DegreeFailure>,
    },

    #[error(
        "clustering produced {found} usable regimes but at most {bound} were expected; \
         the fixed cluster count does not match this data"
    )]
    AnomalousClusterCount { found: usize, bound: usize },

    #[error(
        "no usable regime left: {observations} observation(s) in {clusters} cluster(s), \
         {skipped} cluster(s) dropped"
    )]
    NoUsableRegimes {
        clusters: usize,
        observations: usize,
        skipped: usize,
    },

    #[error("model evaluation asked for degree {actual} but the model was fit with degree {expected}")]
    Evaluation { expected: usize, actual: usize },

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

fn format_attempts(attempts: &[DegreeFailure]) -> String {
    if attempts.is_empty() {
        return "no degree attempted".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let exit_code = match err {
            PipelineError::InvalidConfig(_) => 2,
            PipelineError::Evaluation { .. } => 4,
            _ => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
