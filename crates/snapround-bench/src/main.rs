//! snapround-bench: CLI tool for noding experiments and diagnostics.
//!
//! Runs the snap-rounding noder on a set of polylines read from a JSON file,
//! printing detailed per-phase diagnostics. Useful for:
//!
//! - Comparing grid scales on the same input
//! - Measuring per-phase durations to identify bottlenecks
//! - Checking that a data set nodes cleanly (on unless `--no-validate`)
//! - Rendering the noded result for inspection (`--svg`)
//!
//! # Input format
//!
//! Either a bare array of polylines or an object with a `lines` field:
//!
//! ```text
//! [[[0, 0], [10, 10]], [[0, 10], [10, 0]]]
//! {"lines": [[[0, 0], [10, 10]], [[0, 10], [10, 0]]]}
//! ```
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin snapround-bench -- [OPTIONS] <INPUT_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::{Deserialize, Serialize};
use snapround::diagnostics::{NodingDiagnostics, WebClock};
use snapround::{Coord, Noder, NoderConfig, SegmentString, SnapRoundingNoder};
use tracing_subscriber::EnvFilter;

/// Noding experimentation and diagnostics for snapround.
///
/// Snap-rounds the polylines in a JSON file and prints detailed per-phase
/// timing and count diagnostics.
#[derive(Parser)]
#[command(name = "snapround-bench", version)]
struct Cli {
    /// Path to the input JSON file.
    input_path: PathBuf,

    /// Grid cells per unit (1 = integer grid, 1000 = three decimals).
    #[arg(long, default_value_t = NoderConfig::DEFAULT_SCALE)]
    scale: f64,

    /// Skip checking the output for residual crossings.
    #[arg(long)]
    no_validate: bool,

    /// Write SVG rendering of the noded output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write noded fragments as JSON to file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full noder config as a JSON string.
    ///
    /// When provided, `--scale` and `--no-validate` are ignored.
    /// The JSON must be a valid `NoderConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Accepted input layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    Wrapped { lines: Vec<Vec<[f64; 2]>> },
    Bare(Vec<Vec<[f64; 2]>>),
}

impl InputFile {
    fn into_segment_strings(self) -> Vec<SegmentString<usize>> {
        let lines = match self {
            Self::Wrapped { lines } | Self::Bare(lines) => lines,
        };
        lines
            .into_iter()
            .enumerate()
            .map(|(i, pts)| {
                let coords = pts.into_iter().map(|[x, y]| Coord { x, y }).collect();
                SegmentString::new(coords, i)
            })
            .collect()
    }
}

/// Noded output file: one entry per fragment.
#[derive(Serialize)]
struct OutputFile {
    lines: Vec<Vec<[f64; 2]>>,
    /// Index of the input line each fragment came from.
    sources: Vec<usize>,
}

impl OutputFile {
    fn from_fragments(fragments: &[SegmentString<usize>]) -> Self {
        Self {
            lines: fragments
                .iter()
                .map(|f| f.coords().iter().map(|c| [c.x, c.y]).collect())
                .collect(),
            sources: fragments.iter().map(|f| *f.data()).collect(),
        }
    }
}

/// Build a [`NoderConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<NoderConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(NoderConfig {
        scale: cli.scale,
        validate: !cli.no_validate,
    })
}

fn read_input(path: &Path) -> Result<Vec<SegmentString<usize>>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let input: InputFile = serde_json::from_str(&text)
        .map_err(|e| format!("Error parsing {}: {e}", path.display()))?;
    Ok(input.into_segment_strings())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snapround=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let strings = match read_input(&cli.input_path) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let mut noder = match SnapRoundingNoder::with_scale(config.scale) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Input: {} ({} lines)",
        cli.input_path.display(),
        strings.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    let mut valid = true;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let mut diagnostics = match noder.compute_nodes_with_diagnostics(&strings, &WebClock) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Noding error: {e}");
                return ExitCode::FAILURE;
            }
        };
        let fragments = noder.noded_substrings();
        tracing::info!(
            "run {}: {} fragments in {:.3}ms",
            run + 1,
            fragments.len(),
            diagnostics.total_duration.as_secs_f64() * 1000.0
        );

        if config.validate
            && let Err(e) = diagnostics.record_validation(&fragments, &WebClock)
        {
            eprintln!("Validation failed: {e}");
            valid = false;
        }

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
            if let Some(ref svg_path) = cli.svg {
                write_svg(&cli, &config, &fragments, svg_path);
            }
            if let Some(ref output_path) = cli.output {
                write_output(&fragments, output_path);
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn write_svg(cli: &Cli, config: &NoderConfig, fragments: &[SegmentString<usize>], path: &Path) {
    let title = cli
        .input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bench");
    let desc = format!("scale={} validate={}", config.scale, config.validate);
    let config_json = serde_json::to_string(config).ok();
    let metadata = snapround_export::SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: config_json.as_deref(),
    };
    let svg = snapround_export::to_svg(fragments, &metadata);
    match std::fs::write(path, &svg) {
        Ok(()) => {
            eprintln!("SVG written to {} ({} bytes)", path.display(), svg.len());
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", path.display());
        }
    }
}

fn write_output(fragments: &[SegmentString<usize>], path: &Path) {
    let json = match serde_json::to_string(&OutputFile::from_fragments(fragments)) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing fragments: {e}");
            return;
        }
    };
    match std::fs::write(path, &json) {
        Ok(()) => {
            eprintln!(
                "{} fragments written to {}",
                fragments.len(),
                path.display()
            );
        }
        Err(e) => {
            eprintln!("Error writing fragments to {}: {e}", path.display());
        }
    }
}

/// Function pointer type for extracting a phase duration from diagnostics.
type StageExtractor = fn(&NodingDiagnostics) -> Option<std::time::Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[NodingDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

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

    println!();
    println!("{:<24} {:>12}", "Phase", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Intersections", |d| Some(d.intersections.duration)),
        ("Vertex Pixels", |d| Some(d.vertex_pixels.duration)),
        ("Segment Snapping", |d| Some(d.segment_snapping.duration)),
        ("Vertex Snapping", |d| Some(d.vertex_snapping.duration)),
        ("Splitting", |d| Some(d.splitting.duration)),
        ("Re-snapping", |d| Some(d.resnapping.duration)),
        ("Validation", |d| d.validation.as_ref().map(|s| s.duration)),
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
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("snapround-bench").chain(args.iter().copied()))
    }

    #[test]
    fn flags_build_config() {
        let config = config_from_cli(&cli(&["in.json", "--scale", "1000", "--no-validate"])).unwrap();
        assert!((config.scale - 1000.0).abs() < f64::EPSILON);
        assert!(!config.validate);
    }

    #[test]
    fn config_json_overrides_flags() {
        let config = config_from_cli(&cli(&[
            "in.json",
            "--scale",
            "5",
            "--config-json",
            r#"{"scale": 100.0}"#,
        ]))
        .unwrap();
        assert!((config.scale - 100.0).abs() < f64::EPSILON);
        assert!(config.validate);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let err = config_from_cli(&cli(&["in.json", "--config-json", "{"])).unwrap_err();
        assert!(err.starts_with("Error parsing --config-json"));
    }

    #[test]
    fn both_input_layouts_parse() {
        let bare: InputFile = serde_json::from_str("[[[0, 0], [1, 1]]]").unwrap();
        let wrapped: InputFile =
            serde_json::from_str(r#"{"lines": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]]}"#).unwrap();
        assert_eq!(bare.into_segment_strings().len(), 1);
        let strings = wrapped.into_segment_strings();
        assert_eq!(strings.len(), 2);
        assert_eq!(*strings[1].data(), 1);
        assert_eq!(strings[1].coords()[0], Coord { x: 2.0, y: 2.0 });
    }

    #[test]
    fn output_keeps_sources() {
        let fragments = vec![
            SegmentString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }], 3),
        ];
        let json = serde_json::to_string(&OutputFile::from_fragments(&fragments)).unwrap();
        assert_eq!(json, r#"{"lines":[[[0.0,0.0],[1.0,0.0]]],"sources":[3]}"#);
    }
}
