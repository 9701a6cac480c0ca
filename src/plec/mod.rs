//! Protein-Ligand Extended Connectivity (PLEC) fingerprints.
//!
//! Every ligand-receptor heavy atom pair closer than the distance cutoff is a
//! contact. For each contact the circular environments of both atoms are
//! paired layer by layer and hashed, and the hashes are folded into a
//! fixed-length vector.
//!
//! Based on Wójcikowski et al. (2019), "Development of a protein-ligand
//! extended connectivity (PLEC) fingerprint and its application for binding
//! affinity predictions", Bioinformatics 35(8).

pub mod environment;
pub mod hash;
pub mod settings;

pub use settings::PlecSettings;

use crate::error::Error;
use crate::structure::Molecule;
use environment::{environment_hashes, invariants};
use hash::{fold, hash_u32s};
use rayon::prelude::*;
use rstar::{primitives::GeomWithData, RTree};
use settings::WATER_RESIDUES;
use tracing::{debug, trace};

type AtomPoint = GeomWithData<[f64; 3], usize>;

/// A folded PLEC fingerprint, kept in its sparse form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlecFingerprint {
    size: usize,
    /// Sorted folded bit indices; repeated when bits are counted
    bits: Vec<usize>,
}

impl PlecFingerprint {
    /// Length of the dense vector
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sorted indices of the set bits, with repeats when bits are counted
    pub fn sparse(&self) -> &[usize] {
        &self.bits
    }

    /// Explicit value at every position: the number of times each bit was hit.
    pub fn to_dense(&self) -> Vec<u32> {
        let mut dense = vec![0; self.size];
        for &bit in &self.bits {
            dense[bit] += 1;
        }
        dense
    }
}

/// Receptor-side state shared by every ligand: a spatial index over the
/// receptor heavy atoms and their precomputed environments.
pub struct PlecCalculator {
    settings: PlecSettings,
    receptor: Molecule,
    tree: RTree<AtomPoint>,
    environments: Vec<Option<Vec<u32>>>,
}

impl PlecCalculator {
    /// Prepare the receptor once. Hydrogens (and water, if `ignore_hoh` is set)
    /// are left out of both the contact search and the atom environments.
    pub fn new(receptor: Molecule, settings: PlecSettings) -> Result<Self, Error> {
        settings.validate()?;

        let ignore_hoh = settings.ignore_hoh;
        let receptor_invariants = invariants(&receptor, |atom| {
            !atom.is_hydrogen()
                && !(ignore_hoh && WATER_RESIDUES.contains(&atom.residue.as_str()))
        });

        let environments: Vec<Option<Vec<u32>>> = (0..receptor.atom_count())
            .into_par_iter()
            .map(|i| environment_hashes(&receptor, &receptor_invariants, i, settings.depth_protein))
            .collect();

        let points: Vec<AtomPoint> = receptor
            .atoms()
            .iter()
            .enumerate()
            .filter(|(i, _)| environments[*i].is_some())
            .map(|(i, a)| GeomWithData::new([a.position.x, a.position.y, a.position.z], i))
            .collect();
        debug!(
            "Prepared receptor '{}' with {} of {} atoms eligible for contacts",
            receptor.name,
            points.len(),
            receptor.atom_count()
        );

        Ok(Self {
            settings,
            receptor,
            tree: RTree::bulk_load(points),
            environments,
        })
    }

    /// Parameters this calculator was built with
    pub fn settings(&self) -> &PlecSettings {
        &self.settings
    }

    /// The prepared receptor
    pub fn receptor(&self) -> &Molecule {
        &self.receptor
    }

    /// Ligand-receptor heavy atom pairs within the distance cutoff,
    /// as (ligand atom index, receptor atom index).
    pub fn contacts(&self, ligand: &Molecule) -> Vec<(usize, usize)> {
        let max_dist_squared = self.settings.distance_cutoff * self.settings.distance_cutoff;
        ligand
            .atoms()
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_hydrogen())
            .flat_map(|(i, a)| {
                self.tree
                    .locate_within_distance([a.position.x, a.position.y, a.position.z], max_dist_squared)
                    .map(move |p| (i, p.data))
            })
            .collect()
    }

    /// Fingerprint a single ligand pose against the prepared receptor.
    pub fn fingerprint(&self, ligand: &Molecule) -> Result<PlecFingerprint, Error> {
        if ligand.heavy_atom_count() == 0 {
            return Err(Error::EmptyLigand(ligand.name.clone()));
        }

        let settings = &self.settings;
        let ligand_invariants = invariants(ligand, |atom| !atom.is_hydrogen());
        let contacts = self.contacts(ligand);
        trace!("Ligand '{}' has {} contacts", ligand.name, contacts.len());

        let ligand_environments: Vec<Option<Vec<u32>>> = (0..ligand.atom_count())
            .map(|i| environment_hashes(ligand, &ligand_invariants, i, settings.depth_ligand))
            .collect();

        let layers = settings.layers_per_contact();
        let mut bits = Vec::with_capacity(contacts.len() * layers);
        for (lig_idx, rec_idx) in contacts {
            let (Some(lig_env), Some(rec_env)) = (
                ligand_environments[lig_idx].as_ref(),
                self.environments[rec_idx].as_ref(),
            ) else {
                continue;
            };

            // The shallower side keeps repeating its outermost layer
            for layer in 0..layers {
                let lig_bit = lig_env[layer.min(lig_env.len() - 1)];
                let rec_bit = rec_env[layer.min(rec_env.len() - 1)];
                bits.push(fold(hash_u32s(&[lig_bit, rec_bit]), settings.size));
            }
        }

        bits.sort_unstable();
        if !settings.count_bits {
            bits.dedup();
        }

        Ok(PlecFingerprint {
            size: settings.size,
            bits,
        })
    }
}

/// Convenience wrapper for one-off fingerprints. Use [`PlecCalculator`] when
/// fingerprinting several ligands against the same receptor.
pub fn plec(
    ligand: &Molecule,
    receptor: &Molecule,
    settings: &PlecSettings,
) -> Result<PlecFingerprint, Error> {
    PlecCalculator::new(receptor.clone(), settings.clone())?.fingerprint(ligand)
}
