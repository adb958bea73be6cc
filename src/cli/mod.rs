//! Command-line parsing for the `jd` regime fitter.
//!
//! Argument parsing and command dispatch stay separate from the
//! clustering/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Centroid;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "jd",
    version,
    about = "Fit NJS → jump-distance regimes from replay data and export JD tables"
)]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit regimes from a CSV or from replays + cached leaderboards, print
    /// diagnostics, and write one JD table per kept regime.
    Fit(FitArgs),
    /// Run the same pipeline on a seeded synthetic sample.
    Demo(DemoArgs),
    /// Plot a previously exported regimes JSON.
    Plot(PlotArgs),
    /// Launch the interactive TUI.
    ///
    /// Uses the same pipeline as `jd fit`; without an input it starts on a
    /// synthetic sample.
    Tui(TuiArgs),
}

/// Where observations come from.
#[derive(Debug, Args, Clone, Default)]
pub struct InputArgs {
    /// CSV with `njs` and `jd` (or `jump_distance`) columns.
    #[arg(short = 'f', long, value_name = "CSV", conflicts_with = "replays")]
    pub input: Option<PathBuf>,

    /// JSON array of replay summaries `{hash, difficulty, jumpDistance}`.
    #[arg(long, value_name = "JSON")]
    pub replays: Option<PathBuf>,

    /// Directory of cached leaderboard JSON files.
    #[arg(long, value_name = "DIR", default_value = "_cache/leaderboards")]
    pub leaderboards: PathBuf,

    /// Skip replays whose leaderboard is not cached instead of failing.
    #[arg(long)]
    pub skip_missing: bool,
}

/// Pipeline overrides, applied on top of `--config` (or the defaults).
#[derive(Debug, Args, Clone, Default)]
pub struct PipelineArgs {
    /// JSON file with pipeline settings; missing fields keep their defaults.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// IQR multiplier for the JD outlier fences (`inf` disables filtering).
    #[arg(long, value_name = "K")]
    pub outlier_k: Option<f64>,

    /// Highest polynomial degree to try (1-4).
    #[arg(long)]
    pub max_degree: Option<usize>,

    /// Number of regimes to keep.
    #[arg(long)]
    pub keep: Option<usize>,

    /// Initial k-means centroid; repeat to set the cluster count.
    #[arg(long = "seed-centroid", value_name = "NJS,JD", value_parser = parse_centroid)]
    pub seed_centroids: Vec<Centroid>,

    /// K-means iteration cap.
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

/// What to print and write.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Player label used in table file names.
    #[arg(long, env = "JD_PLAYER", default_value = "player")]
    pub player: String,

    /// Directory for the JD tables.
    #[arg(long, env = "JD_OUT_DIR", default_value = "jd_configs")]
    pub out_dir: PathBuf,

    /// Print results only; write no table files.
    #[arg(long)]
    pub no_write: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Save the regime chart as SVG.
    #[arg(long = "export-plot", value_name = "SVG")]
    pub export_plot: Option<PathBuf>,

    /// Save models, curves, tables and member observations as JSON.
    #[arg(long = "export-regimes", value_name = "JSON")]
    pub export_regimes: Option<PathBuf>,
}

/// Synthetic sample settings.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Number of synthetic observations.
    #[arg(short = 'n', long, default_value_t = 120)]
    pub count: usize,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of observations replaced by gross outliers.
    #[arg(long, default_value_t = 0.03)]
    pub outlier_rate: f64,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Player label used in table file names.
    #[arg(long, env = "JD_PLAYER", default_value = "player")]
    pub player: String,

    /// Directory for the JD tables written with `w`.
    #[arg(long, env = "JD_OUT_DIR", default_value = "jd_configs")]
    pub out_dir: PathBuf,
}

/// Options for plotting a saved regimes file.
#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Regimes JSON produced by `jd fit --export-regimes`.
    #[arg(long, value_name = "JSON")]
    pub regimes: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Also write the chart as SVG.
    #[arg(long = "export-plot", value_name = "SVG")]
    pub export_plot: Option<PathBuf>,
}

/// Parse `NJS,JD` into a centroid.
fn parse_centroid(s: &str) -> Result<Centroid, String> {
    let (njs, jd) = s
        .split_once(',')
        .ok_or_else(|| format!("expected NJS,JD (got '{s}')"))?;
    let njs: f64 = njs
        .trim()
        .parse()
        .map_err(|e| format!("invalid NJS '{njs}': {e}"))?;
    let jd: f64 = jd
        .trim()
        .parse()
        .map_err(|e| format!("invalid JD '{jd}': {e}"))?;
    if !(njs.is_finite() && jd.is_finite()) {
        return Err(format!("centroid must be finite (got '{s}')"));
    }
    Ok(Centroid::new(njs, jd))
}
