//! Loading receptors and ligand poses.
//!
//! Ligand poses come from multi-structure mol2 files, one pose per
//! `@<TRIPOS>MOLECULE` block. Receptors may be mol2, PDB or mmCIF.

pub mod mol2;
pub mod molecule;
pub mod pdb;

pub use molecule::{Atom, Bond, BondOrder, Molecule};

use crate::error::Error;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Structure file formats understood by the loaders.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StructureFormat {
    /// Tripos mol2, `.mol2`
    Mol2,
    /// Protein Data Bank, `.pdb` or `.ent`
    Pdb,
    /// PDBx/mmCIF, `.cif` or `.mmcif`
    Mmcif,
}

impl StructureFormat {
    /// Infer the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mol2" => Ok(StructureFormat::Mol2),
            "pdb" | "ent" => Ok(StructureFormat::Pdb),
            "cif" | "mmcif" => Ok(StructureFormat::Mmcif),
            _ => Err(Error::UnknownFormat(path.display().to_string())),
        }
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureFormat::Mol2 => write!(f, "mol2"),
            StructureFormat::Pdb => write!(f, "pdb"),
            StructureFormat::Mmcif => write!(f, "mmcif"),
        }
    }
}

/// One entry of a multi-structure ligand file.
///
/// `molecule` holds the parse result of this entry alone, so the batch can
/// decide what to do with a malformed pose instead of failing the whole file.
#[derive(Debug)]
pub struct Pose {
    /// Position of the pose in the input file, starting at 0
    pub index: usize,
    /// Title line of the block, or `pose_<index>` when it is blank
    pub name: String,
    /// The parsed pose, or why it could not be parsed
    pub molecule: Result<Molecule, Error>,
}

/// Load all ligand poses, in file order.
pub fn load_ligands(path: &Path) -> Result<Vec<Pose>, Error> {
    match StructureFormat::from_path(path)? {
        StructureFormat::Mol2 => {
            let file = File::open(path)?;
            let poses = mol2::read(BufReader::new(file))?;
            debug!("Read {} ligand poses from {}", poses.len(), path.display());
            Ok(poses)
        }
        other => Err(Error::UnsupportedFormat(other, "ligand poses")),
    }
}

/// Load the receptor. For multi-structure mol2 files only the first structure is used.
pub fn load_receptor(path: &Path) -> Result<Molecule, Error> {
    match StructureFormat::from_path(path)? {
        StructureFormat::Mol2 => {
            let file = File::open(path)?;
            let mut poses = mol2::read(BufReader::new(file))?.into_iter();
            let first = poses
                .next()
                .ok_or_else(|| Error::NoStructures(path.display().to_string()))?;
            let extra = poses.count();
            if extra > 0 {
                warn!(
                    "Receptor file {} holds {} more structures; using '{}' only",
                    path.display(),
                    extra,
                    first.name
                );
            }
            first.molecule
        }
        StructureFormat::Pdb | StructureFormat::Mmcif => pdb::read(path),
    }
}
