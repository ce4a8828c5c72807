//! hstat CLI - pairwise feature-interaction strength for a ranking model
//!
//! For each experiment named on the command line:
//!
//! 1. Resolve `<data-root>/<experiment>` and read its `conf.yml`
//! 2. Load each configured sample (possibly from another experiment)
//! 3. For every scoring task, compute or reuse the PDPs of every feature
//!    and feature pair, then reduce them to H-statistics
//! 4. Persist the matrices and print the ranked pair table
//!
//! A missing experiment directory is reported and the next experiment
//! runs. Any other experiment-level failure is reported, the remaining
//! experiments still run, and the process exits non-zero.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use hstat::{CacheLookup, Centering, CommandScorer, Driver, HStatError, JsonlSampleSource, Settings};

/// Friedman's H-statistic for every feature pair of a ranking model
///
/// Scores are requested from an external scorer process which receives
/// `{"query": ..., "records": [...]}` on stdin and answers with a JSON
/// array of numbers, one per record.
///
/// Examples:
///   hstat exp1 --scorer-cmd python --scorer-arg score.py
///   hstat exp1 exp2 --features year,venue,n_citations
///   hstat exp2 --legacy-cache-lookup --no-center
#[derive(Parser, Debug)]
#[command(name = "hstat")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Experiments to process, in order
    #[arg(value_name = "EXPERIMENT", required = true)]
    pub experiments: Vec<String>,

    /// Directory holding one subdirectory per experiment
    ///
    /// Overrides `data-root` from hstat.toml. Default: ./pipelining
    #[arg(long, value_name = "DIR")]
    pub data_root: Option<PathBuf>,

    /// Settings file (default: ./hstat.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Scorer program
    #[arg(long, value_name = "PROGRAM")]
    pub scorer_cmd: Option<String>,

    /// Argument passed to the scorer program (repeatable)
    ///
    /// Replaces the `args` of hstat.toml when given.
    #[arg(long = "scorer-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub scorer_args: Vec<String>,

    /// Maximum records per scorer invocation
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Comma-separated feature list; pair order follows this list
    #[arg(long, value_delimiter = ',')]
    pub features: Option<Vec<String>>,

    /// Maximum records loaded per sample (0 = unlimited)
    #[arg(long)]
    pub line_limit: Option<usize>,

    /// Load local single-PDP cache hits from the source experiment's path
    ///
    /// Reproduces the lookup of earlier pipelines. Only differs from the
    /// default for samples borrowed from another experiment.
    #[arg(long)]
    pub legacy_cache_lookup: bool,

    /// Compute H from raw (uncentred) PDPs
    #[arg(long)]
    pub no_center: bool,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    hstat::logging::init(&cli.log_level);

    let settings = resolve_settings(&cli)?;
    info!("hstat {}", env!("CARGO_PKG_VERSION"));
    for line in settings.display_summary().lines() {
        info!("{}", line.trim());
    }

    let Some(ref program) = settings.scorer.command else {
        bail!("no scorer configured: pass --scorer-cmd or set [scorer] command in hstat.toml");
    };
    let mut scorer = CommandScorer::new(
        program.clone(),
        settings.scorer.args.clone(),
        settings.scorer.batch_size,
    );
    let samples = JsonlSampleSource::new(settings.data_root.clone(), settings.line_limit);
    let mut driver = Driver::new(&settings, &mut scorer, &samples);

    let mut failed = Vec::new();
    for experiment in &cli.experiments {
        match driver.run_experiment(experiment) {
            Ok(summary) => info!(
                experiment = %summary.experiment,
                completed = summary.tasks_completed,
                failed = summary.tasks_failed,
                "finished"
            ),
            Err(HStatError::ExperimentNotFound(dir)) => {
                warn!("no exp dir {}", dir.display());
            }
            Err(e) => {
                error!(experiment = %experiment, error = %e, "experiment aborted");
                failed.push(experiment.clone());
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} experiment(s) aborted: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

/// Settings file, then CLI overrides.
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match cli.config {
        Some(ref path) => Settings::load_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load(Path::new(".")).context("Failed to load hstat.toml")?,
    };

    if let Some(ref root) = cli.data_root {
        settings.data_root = root.clone();
    }
    if let Some(ref features) = cli.features {
        settings.features = features
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
    }
    if let Some(limit) = cli.line_limit {
        settings.line_limit = limit;
    }
    if cli.legacy_cache_lookup {
        settings.cache_lookup = CacheLookup::Legacy;
    }
    if cli.no_center {
        settings.centering = Centering::None;
    }
    if let Some(ref cmd) = cli.scorer_cmd {
        settings.scorer.command = Some(cmd.clone());
        settings.scorer.args = cli.scorer_args.clone();
    } else if !cli.scorer_args.is_empty() {
        settings.scorer.args = cli.scorer_args.clone();
    }
    if let Some(batch) = cli.batch_size {
        settings.scorer.batch_size = batch;
    }

    if settings.features.len() < 2 {
        bail!("at least two features are needed to form a pair");
    }
    Ok(settings)
}
