//! Circular (ECFP-style) atom environments.

use super::hash::{hash_u32s, Hasher32};
use crate::structure::{Atom, Molecule};
use std::collections::HashSet;

/// Hash of the atom invariants: atomic number, isotope, heavy-atom degree,
/// attached hydrogens, formal charge, ring membership and aromaticity.
pub fn atom_invariant(mol: &Molecule, idx: usize) -> u32 {
    let atom = &mol.atoms()[idx];
    let mut hasher = Hasher32::new();
    hasher.write_u32(atom.atomic_number as u32);
    // Isotopes are not read from any supported format
    hasher.write_u32(0);
    hasher.write_u32(mol.heavy_degree(idx) as u32);
    hasher.write_u32(mol.hydrogen_count(idx) as u32);
    hasher.write_i32(atom.formal_charge);
    hasher.write_u32(u32::from(mol.is_in_ring(idx)));
    hasher.write_u32(u32::from(atom.aromatic));
    hasher.finish()
}

/// Invariants for every atom accepted by `include`, `None` for the rest.
/// Excluded atoms are invisible to [`environment_hashes`].
pub fn invariants(mol: &Molecule, include: impl Fn(&Atom) -> bool) -> Vec<Option<u32>> {
    mol.atoms()
        .iter()
        .enumerate()
        .map(|(i, atom)| include(atom).then(|| atom_invariant(mol, i)))
        .collect()
}

/// Environment hashes of atom `idx` for radius 0 to `depth`.
///
/// Layer 0 is the atom invariant. Layer r combines layer r - 1 with the sorted
/// invariants of the atoms first reached at bond distance r. Returns `None`
/// when `idx` itself is excluded.
pub fn environment_hashes(
    mol: &Molecule,
    invariants: &[Option<u32>],
    idx: usize,
    depth: usize,
) -> Option<Vec<u32>> {
    let mut current = invariants[idx]?;
    let mut layers = Vec::with_capacity(depth + 1);
    layers.push(current);

    let mut seen: HashSet<usize> = HashSet::from([idx]);
    let mut frontier = vec![idx];
    for _ in 0..depth {
        let mut shell = Vec::new();
        for &a in &frontier {
            for &b in mol.neighbors(a) {
                if invariants[b].is_some() && seen.insert(b) {
                    shell.push(b);
                }
            }
        }

        let mut words: Vec<u32> = shell.iter().filter_map(|&b| invariants[b]).collect();
        words.sort_unstable();
        words.insert(0, current);
        current = hash_u32s(&words);
        layers.push(current);

        frontier = shell;
    }

    Some(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Bond, BondOrder};
    use nalgebra::Point3;

    fn atom(atomic_number: usize) -> Atom {
        Atom {
            name: String::new(),
            atomic_number,
            position: Point3::origin(),
            formal_charge: 0,
            residue: "LIG".to_string(),
            aromatic: false,
            implicit_hydrogens: None,
        }
    }

    /// C0-C1-O2-H3
    fn ethanol_fragment() -> Molecule {
        Molecule::new(
            "frag",
            vec![atom(6), atom(6), atom(8), atom(1)],
            vec![
                Bond::new(0, 1, BondOrder::Single),
                Bond::new(1, 2, BondOrder::Single),
                Bond::new(2, 3, BondOrder::Single),
            ],
        )
    }

    #[test]
    fn hydrogens_change_invariants_but_are_not_environment_members() {
        let mol = ethanol_fragment();
        let inv = invariants(&mol, |a| !a.is_hydrogen());

        assert!(inv[3].is_none());
        assert!(environment_hashes(&mol, &inv, 3, 2).is_none());

        let env = environment_hashes(&mol, &inv, 0, 4).unwrap();
        assert_eq!(env.len(), 5);
        assert_eq!(env[0], inv[0].unwrap());
        // Layers beyond the molecule still hash, but with an empty shell
        assert_ne!(env[2], env[3]);
    }

    #[test]
    fn symmetric_atoms_get_equal_environments() {
        // C-O-C: both carbons see the same surroundings
        let mol = Molecule::new(
            "ether",
            vec![atom(6), atom(8), atom(6)],
            vec![
                Bond::new(0, 1, BondOrder::Single),
                Bond::new(1, 2, BondOrder::Single),
            ],
        );
        let inv = invariants(&mol, |_| true);
        assert_eq!(
            environment_hashes(&mol, &inv, 0, 2),
            environment_hashes(&mol, &inv, 2, 2)
        );
        assert_ne!(
            environment_hashes(&mol, &inv, 0, 2),
            environment_hashes(&mol, &inv, 1, 2)
        );
    }
}
