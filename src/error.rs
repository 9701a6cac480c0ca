//! Error type shared by the readers, the fingerprint calculator and the writers.

use crate::structure::StructureFormat;
use thiserror::Error;

/// Everything that can go wrong while turning structure files into a feature table.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening, reading or writing a file failed
    #[error("I/O operation failed: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// A structure file (or one block of it) is malformed
    #[error("failed to parse {format} data: {details} (at line ~{line})")]
    Parse {
        /// Format being read
        format: StructureFormat,
        /// 1-based line number, approximate for block-level problems
        line: usize,
        /// What was wrong
        details: String,
    },

    /// The file extension does not map to a known structure format
    #[error("cannot infer a structure format from '{0}'")]
    UnknownFormat(String),

    /// The format is known but cannot be used for this input
    #[error("the '{0}' format is not supported for {1}")]
    UnsupportedFormat(StructureFormat, &'static str),

    /// `pdbtbx` refused to open the file
    #[error("failed to load structure: {0}")]
    StructureLoad(String),

    /// The input file did not contain a single structure
    #[error("no structures found in {0}")]
    NoStructures(String),

    /// Hydrogens are ignored by PLEC, so a hydrogen-only ligand has nothing to fingerprint
    #[error("ligand '{0}' has no heavy atoms")]
    EmptyLigand(String),

    /// A PLEC parameter is out of range
    #[error("invalid PLEC settings: {0}")]
    InvalidSettings(String),

    /// Feature vectors of unequal length cannot form a table
    #[error("row {row} has {found} features, expected {expected}")]
    RaggedTable {
        /// Index of the first offending row
        row: usize,
        /// Number of columns of the table
        expected: usize,
        /// Length of the offending row
        found: usize,
    },

    /// A single pose failed and the batch was asked to abort on failures
    #[error("pose {index} ('{name}') failed: {source}")]
    PoseFailed {
        /// 0-based position of the pose in the input file
        index: usize,
        /// Name of the pose
        name: String,
        /// Why the pose failed
        #[source]
        source: Box<Error>,
    },

    /// Building or writing a DataFrame failed
    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    /// The worker thread pool could not be created
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Shorthand for [`Error::Parse`].
    pub fn parse(format: StructureFormat, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }
}
