//! Read/write regime JSON files.
//!
//! A regime file is the portable record of a run:
//! - run metadata (tool, timestamp, observation source, player label)
//! - the configuration the run used
//! - every kept regime: model, member observations, plot curve and table
//! - the clusters that were skipped and why
//!
//! `jd plot` re-renders a saved file without refitting.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::PipelineOutput;
use crate::domain::{Centroid, CurvePoint, JdPair, Observation, PipelineConfig};
use crate::error::AppError;
use crate::models::PolynomialModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimesFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub player: String,
    pub config: PipelineConfig,
    pub counts: RunCounts,
    pub regimes: Vec<RegimeRecord>,
    #[serde(default)]
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub input: usize,
    pub non_finite: usize,
    pub outliers_removed: usize,
    pub clusters: usize,
    pub kmeans_iterations: usize,
    pub kmeans_converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRecord {
    pub rank: usize,
    pub cluster: usize,
    pub centroid: Centroid,
    pub model: PolynomialModel,
    pub observations: Vec<Observation>,
    pub curve: Vec<CurvePoint>,
    pub table: Vec<JdPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub cluster: usize,
    pub members: usize,
    pub reason: String,
}

impl RegimesFile {
    pub fn from_output(source: &str, player: &str, config: &PipelineConfig, output: &PipelineOutput) -> Self {
        Self {
            tool: "jd".to_string(),
            generated_at: Utc::now(),
            source: source.to_string(),
            player: player.to_string(),
            config: config.clone(),
            counts: RunCounts {
                input: output.input_count,
                non_finite: output.non_finite,
                outliers_removed: output.removed_outliers(),
                clusters: output.clustering.clusters.len(),
                kmeans_iterations: output.clustering.iterations,
                kmeans_converged: output.clustering.converged,
            },
            regimes: output
                .selected
                .iter()
                .map(|s| RegimeRecord {
                    rank: s.rank,
                    cluster: s.regime.cluster,
                    centroid: s.regime.centroid,
                    model: s.regime.model.clone(),
                    observations: s.regime.observations.clone(),
                    curve: s.curve.clone(),
                    table: s.table.clone(),
                })
                .collect(),
            skipped: output
                .skipped
                .iter()
                .map(|s| SkippedRecord {
                    cluster: s.cluster,
                    members: s.members,
                    reason: s.error.to_string(),
                })
                .collect(),
        }
    }
}

pub fn write_regimes_json(path: &Path, file: &RegimesFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create regimes JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(2, format!("Failed to write regimes JSON: {e}")))?;
    Ok(())
}

pub fn read_regimes_json(path: &Path) -> Result<RegimesFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open regimes JSON '{}': {e}", path.display())))?;
    let regimes: RegimesFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid regimes JSON: {e}")))?;
    Ok(regimes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_pipeline;
    use crate::data::{SampleSpec, generate_sample};

    #[test]
    fn regimes_file_survives_a_write_read_cycle() {
        let config = PipelineConfig::default();
        let obs = generate_sample(&SampleSpec::default()).unwrap();
        let output = run_pipeline(&obs, &config).unwrap();
        let file = RegimesFile::from_output("sample", "p1", &config, &output);

        assert_eq!(file.regimes.len(), output.selected.len());
        assert_eq!(file.counts.input, obs.len());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regimes.json");
        write_regimes_json(&path, &file).unwrap();
        let back = read_regimes_json(&path).unwrap();
        assert_eq!(back.counts, file.counts);
        assert_eq!(back.generated_at, file.generated_at);
        assert_eq!(back.regimes.len(), file.regimes.len());
        for (a, b) in back.regimes.iter().zip(&file.regimes) {
            assert_eq!(a.rank, b.rank);
            assert_eq!(a.model.degree, b.model.degree);
            assert_eq!(a.table.len(), b.table.len());
            assert!((a.model.r_squared - b.model.r_squared).abs() < 1e-12);
        }
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regimes.json");
        std::fs::write(&path, "[]").unwrap();
        assert_eq!(read_regimes_json(&path).unwrap_err().exit_code(), 2);
    }
}
