//! PLEC parameters.

use crate::error::Error;

/// Length of the folded fingerprint
pub const DEFAULT_SIZE: usize = 4092;
/// Bond radius of the receptor-side atom environments
pub const DEFAULT_DEPTH_PROTEIN: usize = 4;
/// Bond radius of the ligand-side atom environments
pub const DEFAULT_DEPTH_LIGAND: usize = 2;
/// Maximum ligand-receptor heavy atom distance counted as a contact (Å)
pub const DEFAULT_DIST_CUTOFF: f64 = 4.5;

/// Residue names treated as water on the receptor side
pub const WATER_RESIDUES: [&str; 2] = ["HOH", "WAT"];

/// Parameters of the PLEC fingerprint.
#[derive(Clone, Debug, PartialEq)]
pub struct PlecSettings {
    /// Length of the folded fingerprint, between 1 and `u32::MAX`
    pub size: usize,
    /// Bond radius of the receptor atom environments
    pub depth_protein: usize,
    /// Bond radius of the ligand atom environments
    pub depth_ligand: usize,
    /// Contact cutoff between ligand and receptor heavy atoms (Å)
    pub distance_cutoff: f64,
    /// Store how often each bit is hit instead of 0/1
    pub count_bits: bool,
    /// Skip receptor water molecules
    pub ignore_hoh: bool,
}

impl Default for PlecSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            depth_protein: DEFAULT_DEPTH_PROTEIN,
            depth_ligand: DEFAULT_DEPTH_LIGAND,
            distance_cutoff: DEFAULT_DIST_CUTOFF,
            count_bits: true,
            ignore_hoh: true,
        }
    }
}

impl PlecSettings {
    /// Check that the parameters describe a computable fingerprint.
    pub fn validate(&self) -> Result<(), Error> {
        if self.size == 0 {
            return Err(Error::InvalidSettings(
                "fingerprint size must be positive".to_string(),
            ));
        }
        if self.size as u64 > u64::from(u32::MAX) {
            return Err(Error::InvalidSettings(format!(
                "fingerprint size must not exceed {}, got {}",
                u32::MAX,
                self.size
            )));
        }
        if !self.distance_cutoff.is_finite() || self.distance_cutoff <= 0.0 {
            return Err(Error::InvalidSettings(format!(
                "distance cutoff must be a positive number, got {}",
                self.distance_cutoff
            )));
        }
        Ok(())
    }

    /// Number of hashes emitted per contact: one per layer of the deeper side.
    pub fn layers_per_contact(&self) -> usize {
        self.depth_protein.max(self.depth_ligand) + 1
    }
}
