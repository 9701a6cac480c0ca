#![warn(missing_docs)]

//! # plecfp
//!
//! Batch PLEC (Protein-Ligand Extended Connectivity) fingerprints for docked
//! ligand poses against a fixed receptor.
//!
//! Poses are read from a multi-structure mol2 file, fingerprinted in parallel
//! on a rayon thread pool and collected into a Polars DataFrame with one row
//! per pose, in input order, which can be written as a headerless CSV file.

pub mod batch;
mod error;
pub mod plec;
pub mod structure;
mod table;
mod utils;

// Re-export key public types
pub use batch::{
    run_batch, write_failure_report, BatchOptions, BatchReport, FailurePolicy, PoseFailure,
};
pub use error::Error;
pub use plec::{plec, PlecCalculator, PlecFingerprint, PlecSettings};
pub use structure::{load_ligands, load_receptor, Molecule, Pose, StructureFormat};
pub use table::features_to_df;
pub use utils::{run_with_threads, write_df_to_file, DataFrameFileType};

use polars::prelude::*;
use tracing::debug;

/// Fingerprint all ligand poses against a receptor and assemble the feature table.
///
/// # Arguments
///
/// * `poses` - Ligand poses in input order, e.g. from [`load_ligands`]
/// * `receptor` - The receptor structure, e.g. from [`load_receptor`]
/// * `settings` - PLEC parameters (size 4092, depths 4/2, 4.5 Å cutoff by default)
/// * `options` - Thread count and failure handling
///
/// # Returns
///
/// A DataFrame with one row per pose (unless failed poses are skipped) and
/// `settings.size` columns named `0..size`, plus the failed poses.
///
/// # Example
///
/// ```no_run
/// use plecfp::{get_plec_features, load_ligands, load_receptor, write_df_to_file};
/// use plecfp::{BatchOptions, DataFrameFileType, PlecSettings};
/// use std::path::Path;
///
/// let receptor = load_receptor(Path::new("receptor.mol2")).unwrap();
/// let poses = load_ligands(Path::new("poses.mol2")).unwrap();
/// let (mut df, failures) =
///     get_plec_features(poses, receptor, PlecSettings::default(), &BatchOptions::default())
///         .unwrap();
/// println!("{} rows, {} failed poses", df.height(), failures.len());
/// write_df_to_file(&mut df, Path::new("plec.csv"), DataFrameFileType::Csv).unwrap();
/// ```
pub fn get_plec_features(
    poses: Vec<Pose>,
    receptor: Molecule,
    settings: PlecSettings,
    options: &BatchOptions,
) -> Result<(DataFrame, Vec<PoseFailure>), Error> {
    debug!("{settings:?}");
    let size = settings.size;
    let calculator = run_with_threads(options.num_threads, || {
        PlecCalculator::new(receptor, settings)
    })??;

    let report = run_batch(poses, &calculator, options)?;
    let df = features_to_df(&report.rows, size)?;
    debug!("Feature table has shape {:?}", df.shape());

    Ok((df, report.failures))
}
