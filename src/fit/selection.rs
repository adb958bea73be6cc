//! Regime ranking and selection.
//!
//! Selection rules:
//! 1. More usable regimes than `max_regimes` means the fixed cluster count
//!    did not fit the data; that is an error, not something to paper over.
//! 2. Order regimes by descending R² (stable: ties keep cluster order).
//! 3. Keep the first `keep` regimes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Regime;
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    /// Upper bound on usable regimes before the run is considered anomalous.
    pub max_regimes: usize,
    /// How many regimes produce output tables.
    pub keep: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            max_regimes: 3,
            keep: 2,
        }
    }
}

impl SelectionOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.keep == 0 {
            return Err(PipelineError::InvalidConfig(
                "keep must be >= 1".to_string(),
            ));
        }
        if self.max_regimes == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_regimes must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rank fitted regimes by R² and keep the best `opts.keep`.
///
/// An empty input yields an empty output; the caller decides whether that is
/// fatal.
pub fn rank_regimes(mut regimes: Vec<Regime>, opts: &SelectionOptions) -> Result<Vec<Regime>, PipelineError> {
    if regimes.len() > opts.max_regimes {
        return Err(PipelineError::AnomalousClusterCount {
            found: regimes.len(),
            bound: opts.max_regimes,
        });
    }

    regimes.sort_by(|a, b| b.model.r_squared.total_cmp(&a.model.r_squared));
    for (rank, r) in regimes.iter().enumerate() {
        debug!(
            rank = rank + 1,
            cluster = r.cluster,
            r_squared = r.model.r_squared,
            kept = rank < opts.keep,
            "regime ranked"
        );
    }
    regimes.truncate(opts.keep);
    Ok(regimes)
}
