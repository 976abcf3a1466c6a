//! Command-line interface: argument parsing and the batch subcommands.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::config::Settings;
use crate::entities::{export_dataset, DatasetBuilder, LaneKind, ResultsLoader, VideoContext};
use crate::error::QueryFormatError;

const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Video interval annotation toolkit
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable logging to file (default: segmark.log in the data directory)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List malformed queries, skipped windows and broken intervals
    Check {
        #[arg(value_name = "RESULTS")]
        results: PathBuf,
    },

    /// Export a results file as a structured dataset
    Export {
        #[arg(value_name = "RESULTS")]
        results: PathBuf,

        /// Video duration in seconds
        #[arg(long, value_name = "SECONDS")]
        duration: f64,

        /// Video frame rate
        #[arg(long, value_name = "FPS")]
        fps: f64,

        /// Dataset key for the video (default: the results' video id)
        #[arg(long, value_name = "NAME")]
        video_name: Option<String>,

        /// Dataset subset (default from settings, usually "train")
        #[arg(long, value_name = "SUBSET")]
        subset: Option<String>,

        /// Leave out intervals below this confidence
        #[arg(long, value_name = "SCORE")]
        threshold: Option<f64>,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: PathBuf,
    },

    /// Load and write back a results file in canonical form
    Resave {
        #[arg(value_name = "RESULTS")]
        results: PathBuf,

        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: PathBuf,
    },
}

/// Outcome of `check`.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub groups: usize,
    pub intervals: usize,
    pub lanes: Vec<(LaneKind, usize)>,
    pub problems: Vec<String>,
}

/// Export options beyond the input and output paths.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub duration: f64,
    pub fps: f64,
    pub video_name: Option<String>,
    pub subset: String,
    pub threshold: f64,
}

pub fn check(path: &Path) -> Result<CheckReport> {
    let report = ResultsLoader::load(path)?;
    let project = &report.project;

    let mut problems: Vec<String> = report.issues.iter().map(|e| e.to_string()).collect();
    problems.extend(project.invariant_violations());

    Ok(CheckReport {
        groups: project.groups.len(),
        intervals: project.groups.values().map(|g| g.relevant_windows.len()).sum(),
        lanes: project
            .groups_by_lane()
            .into_iter()
            .map(|(lane, groups)| (lane, groups.len()))
            .collect(),
        problems,
    })
}

/// Write the dataset. Returns the malformed queries that were skipped.
pub fn export(path: &Path, options: &ExportOptions, output: &Path) -> Result<Vec<QueryFormatError>> {
    let mut project = ResultsLoader::load(path)?.project;
    let video = VideoContext::new(options.duration, options.fps).context("Invalid --duration/--fps")?;
    project.set_video(video);
    if let Some(name) = &options.video_name {
        project.video_name = name.clone();
    }

    let mut builder = DatasetBuilder::new();
    let skipped = builder.add_project(&project, &options.subset, options.threshold)?;
    export_dataset(&builder.finish(), output)?;
    Ok(skipped)
}

/// Returns the number of queries written.
pub fn resave(path: &Path, output: &Path) -> Result<usize> {
    let project = ResultsLoader::load(path)?.project;
    ResultsLoader::save(&project, output)?;
    Ok(project.groups.len())
}

/// Run the parsed subcommand. Problems found by `check` or skipped queries
/// during `export` give exit code 1.
pub fn run(args: &Args, settings: &Settings) -> Result<ExitCode> {
    match &args.command {
        Command::Check { results } => {
            let report = check(results)?;
            println!(
                "{}: {} queries, {} intervals",
                results.display(),
                report.groups,
                report.intervals
            );
            for (lane, count) in &report.lanes {
                println!("  {:<10} {}", lane.as_str(), count);
            }
            if report.problems.is_empty() {
                println!("No problems found");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{} problem(s):", report.problems.len());
            for p in &report.problems {
                println!("  {}", p);
            }
            Ok(ExitCode::from(1))
        }
        Command::Export {
            results,
            duration,
            fps,
            video_name,
            subset,
            threshold,
            output,
        } => {
            let options = ExportOptions {
                duration: *duration,
                fps: *fps,
                video_name: video_name.clone(),
                subset: subset.clone().unwrap_or_else(|| settings.export_subset.clone()),
                threshold: threshold.unwrap_or(settings.confidence_threshold),
            };
            let skipped = export(results, &options, output)?;
            println!("Dataset written to {}", output.display());
            if skipped.is_empty() {
                return Ok(ExitCode::SUCCESS);
            }
            println!("{} malformed quer(y/ies) skipped:", skipped.len());
            for e in &skipped {
                println!("  {}", e);
            }
            Ok(ExitCode::from(1))
        }
        Command::Resave { results, output } => {
            let count = resave(results, output)?;
            info!("Resaved {} queries", count);
            println!("{} queries written to {}", count, output.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
