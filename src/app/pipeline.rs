//! Shared pipeline logic used by both CLI and TUI front-ends.
//!
//! observations -> outlier filter -> k-means -> per-regime fit -> ranking
//! -> curve samples + jump-distance tables
//!
//! `run_pipeline` is pure (no I/O); `run_fit` adds loading the observations
//! from whichever source the user picked. The front-ends only do
//! presentation and persistence.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::cluster::{Clustering, kmeans, njs_range};
use crate::curve::{build_output_table, sample_curve};
use crate::data::{
    JoinPolicy, LeaderboardCache, SampleSpec, generate_sample, join_observations, read_replay_summaries,
};
use crate::domain::{
    CurvePoint, JdPair, MIN_RECOMMENDED_OBSERVATIONS, Observation, PipelineConfig, Regime,
};
use crate::error::{AppError, PipelineError};
use crate::fit::{fit_best_polynomial, rank_regimes};
use crate::io::read_observations_csv;
use crate::math::{OutlierFences, outlier_fences, remove_outliers};

/// A regime that made the cut, with everything needed to plot and persist it.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRegime {
    /// 1-based position after ranking by R².
    pub rank: usize,
    pub regime: Regime,
    /// Samples over the regime's own NJS range.
    pub curve: Vec<CurvePoint>,
    /// Samples over the configured table domain.
    pub table: Vec<JdPair>,
}

/// A cluster that produced no model.
#[derive(Debug, Clone)]
pub struct SkippedRegime {
    pub cluster: usize,
    pub members: usize,
    pub error: PipelineError,
}

/// Everything a pipeline run computed.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub input_count: usize,
    /// Observations dropped before filtering because a coordinate was NaN/inf.
    pub non_finite: usize,
    pub fences: Option<OutlierFences>,
    /// Observations that survived the outlier filter.
    pub filtered: Vec<Observation>,
    pub clustering: Clustering,
    /// Number of clusters that produced a model (before ranking).
    pub fitted: usize,
    pub selected: Vec<SelectedRegime>,
    pub skipped: Vec<SkippedRegime>,
}

impl PipelineOutput {
    pub fn removed_outliers(&self) -> usize {
        self.input_count - self.non_finite - self.filtered.len()
    }

    pub fn low_data(&self) -> bool {
        self.input_count < MIN_RECOMMENDED_OBSERVATIONS
    }
}

/// Run the clustering/fitting pipeline on in-memory observations.
pub fn run_pipeline(observations: &[Observation], config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;

    let input_count = observations.len();
    if input_count < MIN_RECOMMENDED_OBSERVATIONS {
        warn!(
            observations = input_count,
            recommended = MIN_RECOMMENDED_OBSERVATIONS,
            "few observations, regimes may be unreliable"
        );
    }

    let finite: Vec<Observation> = observations.iter().copied().filter(Observation::is_finite).collect();
    let non_finite = input_count - finite.len();
    if non_finite > 0 {
        warn!(dropped = non_finite, "non-finite observations dropped");
    }

    let jds: Vec<f64> = finite.iter().map(|o| o.jd).collect();
    let fences = outlier_fences(&jds, config.outlier_k);
    let filtered = remove_outliers(&finite, config.outlier_k);
    info!(
        input = input_count,
        kept = filtered.len(),
        removed = finite.len() - filtered.len(),
        "outliers filtered"
    );

    let clustering = kmeans(&filtered, &config.kmeans)?;
    info!(
        iterations = clustering.iterations,
        converged = clustering.converged,
        "k-means finished"
    );
    if !clustering.converged {
        warn!(
            iterations = clustering.iterations,
            "k-means hit the iteration cap before converging"
        );
    }

    let mut regimes = Vec::new();
    let mut skipped = Vec::new();
    for cluster in &clustering.clusters {
        match fit_best_polynomial(&cluster.members, &config.fit) {
            Ok(fit) => {
                debug!(
                    cluster = cluster.index,
                    members = cluster.len(),
                    degree = fit.best.degree,
                    r_squared = fit.best.r_squared,
                    "regime fit"
                );
                regimes.push(Regime {
                    cluster: cluster.index,
                    centroid: cluster.centroid,
                    observations: cluster.members.clone(),
                    model: fit.best,
                    candidates: fit.candidates,
                });
            }
            Err(e) => {
                let error = e.into_pipeline_error(cluster.index);
                warn!(%error, "regime skipped");
                skipped.push(SkippedRegime {
                    cluster: cluster.index,
                    members: cluster.len(),
                    error,
                });
            }
        }
    }

    let fitted = regimes.len();
    let ranked = rank_regimes(regimes, &config.selection)?;
    if ranked.is_empty() {
        return Err(PipelineError::NoUsableRegimes {
            clusters: clustering.clusters.len(),
            observations: filtered.len(),
            skipped: skipped.len(),
        });
    }

    let mut selected = Vec::with_capacity(ranked.len());
    for (idx, regime) in ranked.into_iter().enumerate() {
        let (lo, hi) = njs_range(&regime.observations).ok_or(PipelineError::InsufficientData {
            regime: regime.cluster,
            members: 0,
            required: config.fit.min_observations,
        })?;
        let curve = sample_curve(&regime.model, lo, hi, config.curve_points)?;
        let table = build_output_table(&regime.model, &config.table)?;
        selected.push(SelectedRegime {
            rank: idx + 1,
            regime,
            curve,
            table,
        });
    }

    Ok(PipelineOutput {
        input_count,
        non_finite,
        fences,
        filtered,
        clustering,
        fitted,
        selected,
        skipped,
    })
}

/// Where observations come from.
#[derive(Debug, Clone)]
pub enum ObservationSource {
    /// `njs,jd` CSV file.
    Csv(PathBuf),
    /// Replay summaries joined against a leaderboard cache directory.
    Replays {
        replays: PathBuf,
        leaderboards: PathBuf,
        policy: JoinPolicy,
    },
    /// Seeded synthetic data.
    Sample(SampleSpec),
}

/// Observations plus human-readable notes about how they were obtained.
#[derive(Debug, Clone)]
pub struct LoadedObservations {
    pub label: String,
    pub observations: Vec<Observation>,
    pub notes: Vec<String>,
}

pub fn load_observations(source: &ObservationSource) -> Result<LoadedObservations, AppError> {
    match source {
        ObservationSource::Csv(path) => {
            let data = read_observations_csv(path)?;
            for e in &data.row_errors {
                warn!(line = e.line, "{}", e.message);
            }
            let mut notes = Vec::new();
            if !data.row_errors.is_empty() {
                notes.push(format!(
                    "{} of {} CSV row(s) skipped",
                    data.row_errors.len(),
                    data.rows_read
                ));
            }
            Ok(LoadedObservations {
                label: path.display().to_string(),
                observations: data.observations,
                notes,
            })
        }
        ObservationSource::Replays {
            replays,
            leaderboards,
            policy,
        } => {
            let summaries = read_replay_summaries(replays)?;
            let cache = LeaderboardCache::load_dir(leaderboards)?;
            let joined = join_observations(&summaries, &cache, *policy)?;
            let mut notes = Vec::new();
            if !joined.missing.is_empty() {
                notes.push(format!(
                    "{} replay(s) without a cached leaderboard skipped",
                    joined.missing.len()
                ));
            }
            if joined.invalid > 0 {
                notes.push(format!("{} replay(s) with non-finite values skipped", joined.invalid));
            }
            if joined.observations.is_empty() {
                return Err(AppError::new(3, "No replay could be joined with a leaderboard."));
            }
            Ok(LoadedObservations {
                label: replays.display().to_string(),
                observations: joined.observations,
                notes,
            })
        }
        ObservationSource::Sample(spec) => Ok(LoadedObservations {
            label: format!("synthetic sample (seed {}, n={})", spec.seed, spec.count),
            observations: generate_sample(spec)?,
            notes: Vec::new(),
        }),
    }
}

/// All computed outputs of a single `jd fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub source: LoadedObservations,
    pub output: PipelineOutput,
}

/// Load observations and run the pipeline on them.
pub fn run_fit(source: &ObservationSource, config: &PipelineConfig) -> Result<RunOutput, AppError> {
    let loaded = load_observations(source)?;
    let output = run_pipeline(&loaded.observations, config)?;
    Ok(RunOutput {
        source: loaded,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::KMeansOptions;
    use crate::domain::Centroid;

    /// Two linear regimes seeded right where the default centroids are.
    fn two_regimes() -> Vec<Observation> {
        let mut out = Vec::new();
        for i in 0..30 {
            let njs = 14.0 + i as f64 * (4.0 / 29.0);
            out.push(Observation::new(njs, 18.5 - 0.5 * (njs - 16.0)));
        }
        for i in 0..30 {
            let njs = 16.0 + i as f64 * (4.0 / 29.0);
            let wobble = if i % 2 == 0 { 0.05 } else { -0.05 };
            out.push(Observation::new(njs, 14.0 - 0.3 * (njs - 18.0) + wobble));
        }
        out
    }

    #[test]
    fn two_regimes_end_to_end() {
        let out = run_pipeline(&two_regimes(), &PipelineConfig::default()).unwrap();

        assert_eq!(out.input_count, 60);
        assert_eq!(out.removed_outliers(), 0);
        assert!(!out.low_data());
        assert!(out.skipped.is_empty());
        assert_eq!(out.selected.len(), 2);

        // The exact line ranks first.
        let first = &out.selected[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.regime.cluster, 0);
        assert_eq!(first.regime.observations.len(), 30);
        assert_eq!(first.regime.model.degree, 1);
        assert!((first.regime.model.coefficients[0] + 0.5).abs() < 1e-8);

        let second = &out.selected[1];
        assert_eq!(second.regime.cluster, 1);
        assert!(second.regime.model.r_squared > 0.9);
        assert!(first.regime.model.r_squared >= second.regime.model.r_squared);

        for sel in &out.selected {
            assert_eq!(sel.curve.len(), 100);
            assert_eq!(sel.table.len(), 36);
            assert_eq!(sel.table[0].njs, 8.0);
            assert_eq!(sel.table[35].njs, 25.5);
        }
        assert!((first.table[0].jump_distance - 22.5).abs() < 1e-6);
        assert!((first.curve[0].njs - 14.0).abs() < 1e-12);
        assert!((first.curve[99].njs - 18.0).abs() < 1e-12);
    }

    /// Two noisy linear regimes around the default seed centroids, ±0.3 JD
    /// noise on every observation.
    fn noisy_regimes() -> Vec<Observation> {
        let mut out = Vec::new();
        for (center_njs, center_jd) in [(16.0, 18.5), (18.0, 14.0)] {
            for i in 0..30 {
                let t = -0.9 + i as f64 * (1.8 / 29.0);
                let noise = if i % 2 == 0 { 0.3 } else { -0.3 };
                out.push(Observation::new(center_njs + t, center_jd - 2.0 * t + noise));
            }
        }
        out
    }

    #[test]
    fn noisy_regimes_select_straight_lines() {
        let out = run_pipeline(&noisy_regimes(), &PipelineConfig::default()).unwrap();

        assert_eq!(out.input_count, 60);
        assert_eq!(out.removed_outliers(), 0);
        assert!(out.skipped.is_empty());
        assert_eq!(out.selected.len(), 2);

        let mut clusters: Vec<usize> = out.selected.iter().map(|s| s.regime.cluster).collect();
        clusters.sort_unstable();
        assert_eq!(clusters, vec![0, 1]);

        for sel in &out.selected {
            assert_eq!(sel.regime.observations.len(), 30);
            assert_eq!(sel.regime.model.degree, 1);
            assert!(sel.regime.model.r_squared > 0.9, "{}", sel.regime.model.r_squared);
            assert!((sel.regime.model.coefficients[0] + 2.0).abs() < 0.2);
            // Higher degrees were fit too but lost on BIC.
            assert!(sel.regime.candidates.len() >= 2);

            assert_eq!(sel.table.len(), 36);
            assert_eq!(sel.table[0].njs, 8.0);
            assert_eq!(sel.table[35].njs, 25.5);
        }
    }

    #[test]
    fn runs_are_bit_identical() {
        let data = two_regimes();
        let a = run_pipeline(&data, &PipelineConfig::default()).unwrap();
        let b = run_pipeline(&data, &PipelineConfig::default()).unwrap();
        for (x, y) in a.selected.iter().zip(&b.selected) {
            let xs: Vec<u64> = x.table.iter().map(|p| p.jump_distance.to_bits()).collect();
            let ys: Vec<u64> = y.table.iter().map(|p| p.jump_distance.to_bits()).collect();
            assert_eq!(xs, ys);
        }
    }

    #[test]
    fn tiny_cluster_is_skipped_not_fatal() {
        let mut data: Vec<Observation> = two_regimes().into_iter().take(30).collect();
        data.push(Observation::new(18.0, 14.0));
        data.push(Observation::new(18.5, 13.8));

        let config = PipelineConfig {
            outlier_k: f64::INFINITY,
            ..PipelineConfig::default()
        };
        let out = run_pipeline(&data, &config).unwrap();

        assert!(out.low_data());
        assert_eq!(out.fitted, 1);
        assert_eq!(out.selected.len(), 1);
        assert_eq!(out.selected[0].regime.cluster, 0);
        assert_eq!(out.skipped.len(), 1);
        assert!(matches!(
            out.skipped[0].error,
            PipelineError::InsufficientData {
                regime: 1,
                members: 2,
                required: 3
            }
        ));
    }

    #[test]
    fn too_many_regimes_aborts() {
        let centers = [(10.0, 20.0), (14.0, 18.0), (18.0, 16.0), (22.0, 14.0)];
        let mut data = Vec::new();
        for &(njs, jd) in &centers {
            for dx in [-1.0, -0.5, 0.0, 0.5, 1.0] {
                data.push(Observation::new(njs + dx, jd - 0.2 * dx));
            }
        }
        let config = PipelineConfig {
            kmeans: KMeansOptions::with_seeds(centers.iter().map(|&(n, j)| Centroid::new(n, j)).collect()),
            ..PipelineConfig::default()
        };

        let err = run_pipeline(&data, &config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AnomalousClusterCount { found: 4, bound: 3 }
        ));
    }

    #[test]
    fn single_njs_value_leaves_nothing_usable() {
        let data: Vec<Observation> = (0..10)
            .map(|i| Observation::new(16.0, 14.0 + i as f64 * 0.5))
            .collect();

        let err = run_pipeline(&data, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NoUsableRegimes { clusters: 2, .. }));
    }

    #[test]
    fn invalid_config_is_rejected_before_any_work() {
        let config = PipelineConfig {
            curve_points: 1,
            ..PipelineConfig::default()
        };
        let err = run_pipeline(&two_regimes(), &config).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn sample_source_runs_end_to_end() {
        let run = run_fit(
            &ObservationSource::Sample(SampleSpec::default()),
            &PipelineConfig::default(),
        )
        .unwrap();
        assert_eq!(run.source.observations.len(), SampleSpec::default().count);
        assert!(!run.output.selected.is_empty());
        assert!(run.output.selected.len() <= 2);
    }
}
