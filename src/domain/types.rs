//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during clustering and fitting
//! - exported to JSON (jump-distance tables, plot data)
//! - reloaded as run configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cluster::KMeansOptions;
use crate::error::{AppError, PipelineError};
use crate::fit::{FitOptions, SelectionOptions};
use crate::models::PolynomialModel;

/// Below this many observations the fitted regimes are flagged as unreliable.
pub const MIN_RECOMMENDED_OBSERVATIONS: usize = 50;

/// One replay's recorded jump distance joined with the map's note jump speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub njs: f64,
    pub jd: f64,
}

impl Observation {
    pub fn new(njs: f64, jd: f64) -> Self {
        Self { njs, jd }
    }

    pub fn is_finite(&self) -> bool {
        self.njs.is_finite() && self.jd.is_finite()
    }
}

/// A point in (njs, jd) space that anchors a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub njs: f64,
    pub jd: f64,
}

impl Centroid {
    pub fn new(njs: f64, jd: f64) -> Self {
        Self { njs, jd }
    }

    /// Euclidean distance to an observation.
    pub fn distance_to(&self, obs: &Observation) -> f64 {
        let dx = obs.njs - self.njs;
        let dy = obs.jd - self.jd;
        (dx * dx + dy * dy).sqrt()
    }

    /// Euclidean distance to another centroid.
    pub fn shift_from(&self, other: &Centroid) -> f64 {
        let dx = other.njs - self.njs;
        let dy = other.jd - self.jd;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One sample of a fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub njs: f64,
    pub jd: f64,
}

/// One row of a jump-distance table, in the JSON shape game mods read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JdPair {
    pub njs: f64,
    #[serde(rename = "jumpDistance")]
    pub jump_distance: f64,
}

/// A cluster of observations together with the model fit on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regime {
    /// Index of the cluster this regime came from.
    pub cluster: usize,
    pub centroid: Centroid,
    pub observations: Vec<Observation>,
    pub model: PolynomialModel,
    /// Every degree that fit successfully, lowest first (diagnostics).
    pub candidates: Vec<PolynomialModel>,
}

/// NJS domain of the persisted jump-distance table: `[low, high)` by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDomain {
    pub low: f64,
    pub high: f64,
    pub step: f64,
}

impl Default for TableDomain {
    fn default() -> Self {
        Self {
            low: 8.0,
            high: 26.0,
            step: 0.5,
        }
    }
}

impl TableDomain {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.low.is_finite() && self.high.is_finite() && self.high > self.low) {
            return Err(PipelineError::InvalidConfig(format!(
                "table domain [{}, {}) is empty or not finite",
                self.low, self.high
            )));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "table step must be finite and > 0 (got {})",
                self.step
            )));
        }
        Ok(())
    }

    /// NJS values covered by the table.
    ///
    /// Values are computed as `low + i * step` rather than by accumulation so
    /// that long tables don't drift.
    pub fn njs_values(&self) -> Vec<f64> {
        let mut out = Vec::new();
        let mut i = 0usize;
        loop {
            let njs = self.low + i as f64 * self.step;
            if njs >= self.high {
                break;
            }
            out.push(njs);
            i += 1;
        }
        out
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from defaults, an optional JSON file, and CLI flags (in that order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// IQR multiplier for the jump-distance outlier fences.
    pub outlier_k: f64,
    pub kmeans: KMeansOptions,
    pub fit: FitOptions,
    pub selection: SelectionOptions,
    /// Number of samples per plotted regime curve.
    pub curve_points: usize,
    pub table: TableDomain,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            outlier_k: 1.5,
            kmeans: KMeansOptions::default(),
            fit: FitOptions::default(),
            selection: SelectionOptions::default(),
            curve_points: 100,
            table: TableDomain::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.outlier_k.is_nan() || self.outlier_k < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "outlier multiplier must be >= 0 (got {})",
                self.outlier_k
            )));
        }
        if self.curve_points < 2 {
            return Err(PipelineError::InvalidConfig(
                "curve_points must be >= 2".to_string(),
            ));
        }
        self.kmeans.validate()?;
        self.fit.validate()?;
        self.selection.validate()?;
        self.table.validate()
    }

    /// Read a configuration file. Missing fields fall back to defaults.
    pub fn load_json(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(2, format!("Failed to read config '{}': {e}", path.display()))
        })?;
        let config: PipelineConfig = serde_json::from_str(&text).map_err(|e| {
            AppError::new(2, format!("Invalid config '{}': {e}", path.display()))
        })?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_domain_has_36_rows() {
        let njs = TableDomain::default().njs_values();
        assert_eq!(njs.len(), 36);
        assert_eq!(njs[0], 8.0);
        assert_eq!(njs[35], 25.5);
    }

    #[test]
    fn table_domain_rejects_inverted_range() {
        let domain = TableDomain {
            low: 26.0,
            high: 8.0,
            step: 0.5,
        };
        assert!(domain.validate().is_err());
        let domain = TableDomain {
            step: 0.0,
            ..TableDomain::default()
        };
        assert!(domain.validate().is_err());
    }

    #[test]
    fn jd_pair_serializes_with_game_field_names() {
        let pair = JdPair {
            njs: 16.0,
            jump_distance: 18.5,
        };
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"njs":16.0,"jumpDistance":18.5}"#);
    }

    #[test]
    fn partial_config_json_keeps_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{ "outlier_k": 3.0 }"#).unwrap();
        assert_eq!(config.outlier_k, 3.0);
        assert_eq!(config.kmeans, KMeansOptions::default());
        assert_eq!(config.table, TableDomain::default());
        config.validate().unwrap();
    }

    #[test]
    fn negative_outlier_multiplier_is_rejected() {
        let config = PipelineConfig {
            outlier_k: -1.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }
}
