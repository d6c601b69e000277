//! Blink CLI - Command-line interface for Blink Flux
//!
//! Commands:
//! - trial: Compute metrics for a single trial file
//! - dir: Analyze a session directory and write its outputs
//! - subjects: Group session metrics by subject

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use blink_flux::pipeline::{TrialSetProcessor, DEFAULT_OUTPUT_DIR};
use blink_flux::subject::{SubjectAggregator, SubjectRecord};
use blink_flux::{AnalysisConfig, AnalysisError, CRATE_VERSION};

/// Blink - eye-blink conditioning trial analysis
#[derive(Parser)]
#[command(name = "blink")]
#[command(version = CRATE_VERSION)]
#[command(about = "Analyze eye-blink conditioning recordings", long_about = None)]
struct Cli {
    /// Analysis configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics for one trial file
    Trial {
        /// Trial CSV file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Analyze every trial in a session directory
    Dir {
        /// Session directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory (default: <dir>/_plots)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Build per-subject performance curves from session directories
    Subjects {
        /// Root of the session tree
        #[arg(short, long)]
        dir: PathBuf,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), AnalysisError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Trial { input } => cmd_trial(config, &input),
        Commands::Dir { dir, output_dir } => cmd_dir(config, &dir, output_dir.as_deref()),
        Commands::Subjects { dir, json } => cmd_subjects(&config, &dir, json),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, AnalysisError> {
    let config = match path {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn cmd_trial(config: AnalysisConfig, input: &Path) -> Result<(), AnalysisError> {
    let report = TrialSetProcessor::new(config).analyze_trial(input)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_dir(config: AnalysisConfig, dir: &Path, output_dir: Option<&Path>) -> Result<(), AnalysisError> {
    let processor = TrialSetProcessor::new(config);
    let summary = processor.run(dir, output_dir)?;

    let out = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(DEFAULT_OUTPUT_DIR));
    println!("Directory:  {}", dir.display());
    println!("Valid:      {}", summary.metrics.len());
    println!("Dropped:    {}", summary.dropped.len());
    println!("Probes:     {}", summary.probes.len());
    if let Some(window) = summary.bounds.as_window() {
        println!("Bounds:     [{}, {}] ms", window.tmin, window.tmax);
    }
    println!("Output:     {}", out.display());
    Ok(())
}

fn cmd_subjects(config: &AnalysisConfig, dir: &Path, json: bool) -> Result<(), AnalysisError> {
    let mut aggregator = SubjectAggregator::new(config);
    aggregator.scan(dir)?;
    let skipped = aggregator.skipped().len();
    let records = aggregator.finalize();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_subjects(&records, skipped);
    }
    Ok(())
}

fn print_subjects(records: &[SubjectRecord], skipped: usize) {
    println!("Performance Report");
    println!("==================");
    for record in records {
        println!("\nMouse {} ({} sessions)", record.subject, record.session_count());
        for session in &record.sessions {
            match session.stats {
                Some(s) => println!(
                    "  Session {:>3} type {}: n={:<4} min={:.3} q1={:.3} median={:.3} q3={:.3} max={:.3}",
                    session.session_number,
                    session.session_type,
                    session.metrics.len(),
                    s.min,
                    s.q1,
                    s.median,
                    s.q3,
                    s.max
                ),
                None => println!(
                    "  Session {:>3} type {}: no trials",
                    session.session_number, session.session_type
                ),
            }
        }
    }
    if skipped > 0 {
        println!("\nSkipped {} session directories without a metric file", skipped);
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AnalysisError> for CliError {
    fn from(e: AnalysisError) -> Self {
        let (code, hint) = match &e {
            AnalysisError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
            AnalysisError::JsonError(_) => ("JSON_ERROR", Some("Check JSON syntax")),
            AnalysisError::InvalidConfig(_) => ("INVALID_CONFIG", Some("Fix the configuration file and retry")),
            AnalysisError::SchemaError { .. } | AnalysisError::InvalidValue { .. } => {
                ("PARSE_ERROR", Some("Ensure the trial file has the expected columns"))
            }
            AnalysisError::NoTrialFiles(_) => ("NO_TRIALS", Some("Expected files named Trial<N>.csv")),
            AnalysisError::NoUsableTrials { .. } => {
                ("NO_USABLE_TRIALS", Some("Run with --debug to see why trials were dropped"))
            }
            AnalysisError::MalformedMetricFile { .. } => ("MALFORMED_METRIC_FILE", None),
            AnalysisError::InvariantViolation(_) => ("INTERNAL_ERROR", Some("Please report this")),
            _ => ("ANALYSIS_ERROR", None),
        };
        CliError {
            code: code.to_string(),
            message: e.to_string(),
            hint: hint.map(str::to_string),
        }
    }
}
