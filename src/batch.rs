//! Order-preserving parallel fingerprinting of ligand poses.

use crate::error::Error;
use crate::plec::PlecCalculator;
use crate::structure::Pose;
use crate::utils::{create_file, run_with_threads};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// What to do with a pose that could not be parsed or fingerprinted.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Emit an all-zero row so rows stay aligned with the input poses
    #[default]
    Fill,
    /// Leave the pose out of the table
    Skip,
    /// Stop at the first failed pose
    Abort,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FailurePolicy::Fill => write!(f, "fill"),
            FailurePolicy::Skip => write!(f, "skip"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// How a batch is run.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    /// Worker threads, 0 for all cores. Never changes the output.
    pub num_threads: usize,
    /// Handling of poses without a fingerprint
    pub on_error: FailurePolicy,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            num_threads: 20,
            on_error: FailurePolicy::default(),
            show_progress: false,
        }
    }
}

/// A pose that produced no fingerprint.
#[derive(Debug)]
pub struct PoseFailure {
    /// 0-based position of the pose in the input file
    pub index: usize,
    /// Name of the pose
    pub name: String,
    /// Why no fingerprint was produced
    pub error: Error,
}

/// Dense feature rows in input order, plus every failure encountered.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One dense feature vector per row of the output table
    pub rows: Vec<Vec<u32>>,
    /// Failed poses in input order
    pub failures: Vec<PoseFailure>,
}

/// Fingerprint every pose against the prepared receptor.
///
/// Poses are processed independently on a pool of `options.num_threads`
/// threads; the i-th outcome always belongs to the i-th pose. Failures are
/// then resolved in input order according to `options.on_error`.
pub fn run_batch(
    poses: Vec<Pose>,
    calculator: &PlecCalculator,
    options: &BatchOptions,
) -> Result<BatchReport, Error> {
    let bar = progress_bar(poses.len() as u64, options.show_progress);

    let outcomes: Vec<(usize, String, Result<Vec<u32>, Error>)> =
        run_with_threads(options.num_threads, || {
            debug!("Using {} thread(s)", rayon::current_num_threads());
            poses
                .into_par_iter()
                .map(|pose| {
                    let features = pose
                        .molecule
                        .and_then(|ligand| calculator.fingerprint(&ligand))
                        .map(|fp| fp.to_dense());
                    bar.inc(1);
                    (pose.index, pose.name, features)
                })
                .collect()
        })?;
    bar.finish_and_clear();

    let size = calculator.settings().size;
    let n_poses = outcomes.len();
    let mut report = BatchReport {
        rows: Vec::with_capacity(outcomes.len()),
        failures: Vec::new(),
    };
    for (index, name, features) in outcomes {
        match features {
            Ok(row) => report.rows.push(row),
            Err(error) => match options.on_error {
                FailurePolicy::Abort => {
                    return Err(Error::PoseFailed {
                        index,
                        name,
                        source: Box::new(error),
                    })
                }
                FailurePolicy::Fill => {
                    warn!("Pose {index} ('{name}') failed, writing a zero row: {error}");
                    report.rows.push(vec![0; size]);
                    report.failures.push(PoseFailure { index, name, error });
                }
                FailurePolicy::Skip => {
                    warn!("Pose {index} ('{name}') failed, skipping: {error}");
                    report.failures.push(PoseFailure { index, name, error });
                }
            },
        }
    }

    if options.on_error == FailurePolicy::Skip && !report.failures.is_empty() {
        warn!(
            "Skipped {} failed {}; output rows no longer line up with input poses",
            report.failures.len(),
            match report.failures.len() {
                1 => "pose",
                _ => "poses",
            }
        );
    }
    info!(
        "Fingerprinted {} of {n_poses} poses",
        n_poses - report.failures.len()
    );

    Ok(report)
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{bar:40.cyan/blue} {pos}/{len} poses [{elapsed_precise}<{eta_precise}]")
    {
        bar.set_style(style);
    }
    bar
}

/// Write the failed poses as a CSV table with an `index,name,error` header.
/// Parent directories are created as needed.
pub fn write_failure_report(failures: &[PoseFailure], path: &Path) -> Result<(), Error> {
    let mut df = df!(
        "index" => failures.iter().map(|f| f.index as u64).collect::<Vec<u64>>(),
        "name" => failures.iter().map(|f| f.name.clone()).collect::<Vec<String>>(),
        "error" => failures.iter().map(|f| f.error.to_string()).collect::<Vec<String>>(),
    )?;
    let mut file = create_file(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}
