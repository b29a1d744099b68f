//! lanewise-bench: CLI tool for planning toolpath segments and collecting
//! diagnostics.
//!
//! Reads a JSON array of segments, plans their traversal with configurable
//! margin parameters, and prints per-stage diagnostics. Useful for:
//!
//! - Comparing margin orderings (trim before vs. after sequencing)
//! - Tuning the margin offset and cut tolerance
//! - Measuring how much travel the sequencer saves over input order
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin lanewise-bench -- [OPTIONS] <SEGMENTS_JSON>
//! ```
//!
//! Set `RUST_LOG=debug` to see stage-level logging from the pipeline.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use lanewise_pipeline::diagnostics::{Clock, PlanDiagnostics, StageMetrics, travel_distance};
use lanewise_pipeline::{MarginOrder, PlanResult, PlannerConfig, Segment};
use log::{info, warn};

/// Toolpath planning and diagnostics for lanewise.
///
/// Orders raster segments into lanes, picks a direction for each, trims
/// end margins, and prints per-stage timing and metrics.
#[derive(Parser)]
#[command(name = "lanewise-bench", version)]
struct Cli {
    /// Path to the input segments (JSON array of pose arrays).
    segments_path: PathBuf,

    /// Arc length trimmed from each end of every segment.
    #[arg(long, default_value_t = PlannerConfig::DEFAULT_MARGIN_OFFSET)]
    margin: f64,

    /// Disable margin trimming.
    #[arg(long)]
    no_margins: bool,

    /// Whether margins are trimmed before or after sequencing.
    #[arg(long, value_enum, default_value_t = Order::Before)]
    margin_order: Order,

    /// Snap margin cuts to a sample within this distance.
    #[arg(long, default_value_t = PlannerConfig::DEFAULT_CUT_TOLERANCE)]
    cut_tolerance: f64,

    /// Full planner config as a JSON string.
    ///
    /// When provided, all other planner parameter flags are ignored.
    /// The JSON must be a valid `PlannerConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Compare travel distance across input order and both margin orders.
    #[arg(long)]
    travel: bool,

    /// Write the planned segments as JSON to file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the full plan (segments, reference rotation, placements) as
    /// JSON to file.
    #[arg(long)]
    plan_output: Option<PathBuf>,

    /// Write an SVG preview of the plan to file.
    #[arg(long)]
    svg: Option<PathBuf>,
}

/// Margin order selection.
#[derive(Clone, Copy, ValueEnum)]
enum Order {
    /// Trim, then sequence the trimmed segments.
    Before,
    /// Sequence, then trim the ordered segments.
    After,
}

/// Build a [`PlannerConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Either way the result is
/// validated before any planning runs.
fn config_from_cli(cli: &Cli) -> Result<PlannerConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        PlannerConfig {
            margin_offset: cli.margin,
            apply_margins: !cli.no_margins,
            margin_order: match cli.margin_order {
                Order::Before => MarginOrder::BeforeSequencing,
                Order::After => MarginOrder::AfterSequencing,
            },
            cut_tolerance: cli.cut_tolerance,
            ..PlannerConfig::default()
        }
    };
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {e}"))?;
    Ok(config)
}

/// Read and parse the input segments.
fn read_segments(path: &Path) -> Result<Vec<Segment>, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    lanewise_export::segments_from_json(&json)
        .map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let segments = match read_segments(&cli.segments_path) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if segments.is_empty() {
        warn!("{} contains no segments", cli.segments_path.display());
    }

    info!(
        "input: {} ({} segments, {} poses)",
        cli.segments_path.display(),
        segments.len(),
        segments.iter().map(Segment::len).sum::<usize>(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match lanewise_pipeline::plan_with_diagnostics(&segments, &config, &StdClock) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write outputs on the first run only.
                if run == 0 {
                    if let Some(ref output_path) = cli.output {
                        write_segments(output_path, &result.segments);
                    }
                    if let Some(ref plan_path) = cli.plan_output {
                        write_plan(plan_path, &result);
                    }
                    if let Some(ref svg_path) = cli.svg {
                        write_svg(svg_path, &cli.segments_path, &config, &result.segments);
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Planning error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    if cli.travel {
        print_travel_comparison(&segments, &config);
    }

    ExitCode::SUCCESS
}

/// Write planned segments as JSON, reporting failures without aborting.
fn write_segments(path: &Path, segments: &[Segment]) {
    let json = match lanewise_export::segments_to_json(segments) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing segments: {e}");
            return;
        }
    };
    match std::fs::write(path, &json) {
        Ok(()) => eprintln!("Segments written to {} ({} bytes)", path.display(), json.len()),
        Err(e) => eprintln!("Error writing segments to {}: {e}", path.display()),
    }
}

/// Write the full plan as JSON, reporting failures without aborting.
fn write_plan(path: &Path, result: &PlanResult) {
    let json = match lanewise_export::plan_to_json(result) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing plan: {e}");
            return;
        }
    };
    match std::fs::write(path, &json) {
        Ok(()) => eprintln!("Plan written to {} ({} bytes)", path.display(), json.len()),
        Err(e) => eprintln!("Error writing plan to {}: {e}", path.display()),
    }
}

/// Write an SVG preview, reporting failures without aborting.
fn write_svg(path: &Path, input_path: &Path, config: &PlannerConfig, segments: &[Segment]) {
    let title = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("lanewise");
    let desc = format!(
        "margin={} order={:?} margins={}",
        config.margin_offset, config.margin_order, config.apply_margins,
    );
    let config_json = serde_json::to_string(config).ok();
    let metadata = lanewise_export::SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: config_json.as_deref(),
    };
    let svg = lanewise_export::to_svg(
        segments,
        &lanewise_export::SvgOptions::default(),
        &metadata,
    );
    match std::fs::write(path, &svg) {
        Ok(()) => eprintln!("SVG written to {} ({} bytes)", path.display(), svg.len()),
        Err(e) => eprintln!("Error writing SVG to {}: {e}", path.display()),
    }
}

/// Print travel distance for the input order and for each margin order.
fn print_travel_comparison(segments: &[Segment], config: &PlannerConfig) {
    println!();
    println!("Travel comparison\n{}", "=".repeat(60));
    println!("{:<24} {:>12}", "Input order", format!("{:.4}", travel_distance(segments)));

    for (name, order) in [
        ("Trim before sequencing", MarginOrder::BeforeSequencing),
        ("Trim after sequencing", MarginOrder::AfterSequencing),
    ] {
        let variant = PlannerConfig {
            margin_order: order,
            ..config.clone()
        };
        match lanewise_pipeline::plan(segments, &variant) {
            Ok(result) => println!(
                "{name:<24} {:>12}",
                format!("{:.4}", travel_distance(&result.segments)),
            ),
            Err(e) => println!("{name:<24} error: {e}"),
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PlanDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PlanDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Margins", |d| d.margins.as_ref().map(|s| s.duration)),
        ("Sequencing", |d| Some(d.sequencing.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }

    // Travel is deterministic across runs; report it once.
    if let StageMetrics::Sequencing {
        travel_before,
        travel_after,
        ..
    } = all_diagnostics[0].sequencing.metrics
    {
        println!();
        println!("Travel: {travel_before:.4} (input order) -> {travel_after:.4} (planned)");
    }
}
