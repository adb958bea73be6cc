//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging; this module is the "real main" that:
//! - turns CLI arguments into a pipeline configuration
//! - loads observations and runs the pipeline
//! - prints reports/plots
//! - writes JD tables and optional exports

use clap::Parser;

use crate::app::pipeline::ObservationSource;
use crate::cli::{Cli, Command, DemoArgs, FitArgs, InputArgs, OutputArgs, PipelineArgs, PlotArgs, SampleArgs};
use crate::data::{JoinPolicy, SampleSpec};
use crate::domain::PipelineConfig;
use crate::error::AppError;
use crate::io::{RegimesFile, read_regimes_json, write_regimes_json, write_tables};
use crate::plot::{RegimeSeries, render_regime_plot, write_regime_svg};

pub mod pipeline;

/// Size of exported SVG charts, in pixels.
const SVG_SIZE: (u32, u32) = (800, 800);

/// Parse argv, applying the `jd` shorthand rewrite first.
pub fn parse_cli() -> Cli {
    let argv = rewrite_args(std::env::args().collect());
    Cli::parse_from(argv)
}

/// Entry point for the `jd` binary.
pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => crate::tui::run(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let source = source_from_args(&args.input).ok_or_else(|| {
        AppError::new(
            2,
            "No input given. Use `--input <csv>` or `--replays <json>` (or try `jd demo`).",
        )
    })?;
    let config = pipeline_config_from_args(&args.pipeline)?;
    execute(&source, &config, &args.output)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let source = ObservationSource::Sample(sample_spec_from_args(&args.sample));
    let config = pipeline_config_from_args(&args.pipeline)?;
    execute(&source, &config, &args.output)
}

fn execute(source: &ObservationSource, config: &PipelineConfig, output: &OutputArgs) -> Result<(), AppError> {
    let run = pipeline::run_fit(source, config)?;

    println!("{}", crate::report::format_run_summary(&run, config));
    println!("{}", crate::report::format_tables(&run.output.selected));

    let series: Vec<RegimeSeries> = run.output.selected.iter().map(RegimeSeries::from).collect();
    if output.plot && !output.no_plot {
        println!("{}", render_regime_plot(&series, output.width, output.height));
    }

    if !output.no_write {
        let paths = write_tables(&output.out_dir, &output.player, &run.output.selected)?;
        for path in paths {
            println!("Check \"{}\" for generated jd config", path.display());
        }
    }

    // Optional exports.
    if let Some(path) = &output.export_plot {
        write_regime_svg(path, &series, SVG_SIZE.0, SVG_SIZE.1)?;
        println!("Plot written to \"{}\"", path.display());
    }
    if let Some(path) = &output.export_regimes {
        let file = RegimesFile::from_output(&run.source.label, &output.player, config, &run.output);
        write_regimes_json(path, &file)?;
        println!("Regimes written to \"{}\"", path.display());
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = read_regimes_json(&args.regimes)?;
    let series: Vec<RegimeSeries> = file.regimes.iter().map(RegimeSeries::from).collect();

    println!(
        "Regimes of {} ({}), generated {}",
        file.player,
        file.source,
        file.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!("{}", render_regime_plot(&series, args.width, args.height));

    if let Some(path) = &args.export_plot {
        write_regime_svg(path, &series, SVG_SIZE.0, SVG_SIZE.1)?;
        println!("Plot written to \"{}\"", path.display());
    }
    Ok(())
}

/// Defaults, then `--config`, then individual flags.
pub fn pipeline_config_from_args(args: &PipelineArgs) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(k) = args.outlier_k {
        config.outlier_k = k;
    }
    if let Some(d) = args.max_degree {
        config.fit.max_degree = d;
    }
    if let Some(keep) = args.keep {
        config.selection.keep = keep;
    }
    if !args.seed_centroids.is_empty() {
        config.kmeans.k = args.seed_centroids.len();
        config.kmeans.initial_centroids = args.seed_centroids.clone();
    }
    if let Some(n) = args.max_iterations {
        config.kmeans.max_iterations = n;
    }

    config.validate()?;
    Ok(config)
}

/// The observation source named on the command line, if any.
pub fn source_from_args(input: &InputArgs) -> Option<ObservationSource> {
    if let Some(path) = &input.input {
        return Some(ObservationSource::Csv(path.clone()));
    }
    let replays = input.replays.as_ref()?;
    Some(ObservationSource::Replays {
        replays: replays.clone(),
        leaderboards: input.leaderboards.clone(),
        policy: if input.skip_missing {
            JoinPolicy::SkipMissing
        } else {
            JoinPolicy::Strict
        },
    })
}

pub fn sample_spec_from_args(args: &SampleArgs) -> SampleSpec {
    SampleSpec {
        count: args.count,
        seed: args.seed,
        outlier_rate: args.outlier_rate,
        ..SampleSpec::default()
    }
}

/// Rewrite argv so the binary has convenient shorthands.
///
/// Rules:
/// - `jd`                      -> `jd tui`
/// - `jd -f obs.csv ...`       -> `jd fit -f obs.csv ...`
/// - `jd --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fit" | "demo" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    // A leading flag means "fit with these flags".
    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
        return argv;
    }

    argv
}
