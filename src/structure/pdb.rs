//! PDB/mmCIF receptors through [`pdbtbx`].
//!
//! These formats carry no bond table for standard residues and usually no
//! hydrogens. Bonds are perceived from covalent radii, then aromatic rings
//! and double bonds from geometry, so that the atom invariants match those of
//! a protonated mol2 file of the same structure.

use super::molecule::{Atom, Bond, BondOrder, Molecule};
use crate::error::Error;
use nalgebra::{Point3, Vector3};
use pdbtbx::*;
use rstar::{primitives::GeomWithData, RTree};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, error, warn};

/// Slack added to the sum of covalent radii when perceiving bonds (Å)
pub const BOND_TOLERANCE: f64 = 0.45;

/// Largest out-of-plane deviation of an aromatic ring atom (Å)
pub const PLANARITY_TOLERANCE: f64 = 0.1;

/// Largest distance of a carbon from the plane of its three neighbours for
/// it to count as trigonal (Å). Tetrahedral carbons sit about 0.5 Å out.
pub const TRIGONAL_TOLERANCE: f64 = 0.2;

/// Open a PDB or mmCIF file and convert the first model into a [`Molecule`].
/// Only the first alternative location of each atom is kept.
pub fn read(path: &Path) -> Result<Molecule, Error> {
    let input_file = path
        .to_str()
        .ok_or_else(|| Error::StructureLoad(format!("non UTF-8 path {}", path.display())))?;

    let (pdb, pdb_warnings) = pdbtbx::ReadOptions::default()
        .set_only_atomic_coords(true)
        .set_level(pdbtbx::StrictnessLevel::Loose)
        .read(input_file)
        .map_err(|errors| {
            Error::StructureLoad(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
    for e in &pdb_warnings {
        match e.level() {
            pdbtbx::ErrorLevel::BreakingError => error!("{e}"),
            pdbtbx::ErrorLevel::InvalidatingError => error!("{e}"),
            _ => warn!("{e}"),
        }
    }

    let first_model = pdb.models().next().map(|m| m.serial_number());
    let mut radii = Vec::new();
    let mut atoms: Vec<Atom> = pdb
        .atoms_with_hierarchy()
        .filter(|x| Some(x.model().serial_number()) == first_model)
        .filter(|x| matches!(x.conformer().alternative_location(), None | Some("A")))
        .filter_map(|x| {
            let Some(element) = x.atom().element() else {
                warn!(
                    "Skipping atom {} with unknown element",
                    x.atom().serial_number()
                );
                return None;
            };
            radii.push(element.atomic_radius().covalent_single);
            let (px, py, pz) = x.atom().pos();
            Some(Atom {
                name: x.atom().name().to_string(),
                atomic_number: element.atomic_number(),
                position: Point3::new(px, py, pz),
                formal_charge: x.atom().charge() as i32,
                residue: x.residue().name().unwrap_or_default().to_ascii_uppercase(),
                aromatic: false,
                implicit_hydrogens: None,
            })
        })
        .collect();

    let bonds = perceive_bonds(&atoms, &radii);
    let bonds = assign_bond_orders(&mut atoms, bonds);
    debug!(
        "Read {} atoms and perceived {} bonds ({} aromatic) from {input_file}",
        atoms.len(),
        bonds.len(),
        bonds
            .iter()
            .filter(|b| b.order == BondOrder::Aromatic)
            .count()
    );

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Molecule::new(name, atoms, bonds))
}

/// Bond every atom pair closer than the sum of their covalent radii plus [`BOND_TOLERANCE`].
pub fn perceive_bonds(atoms: &[Atom], radii: &[f64]) -> Vec<Bond> {
    let tree = RTree::bulk_load(
        atoms
            .iter()
            .enumerate()
            .map(|(i, a)| GeomWithData::new([a.position.x, a.position.y, a.position.z], i))
            .collect(),
    );
    let max_radius = radii.iter().copied().fold(0.0, f64::max);

    let mut bonds = Vec::new();
    for (i, atom) in atoms.iter().enumerate() {
        let search = radii[i] + max_radius + BOND_TOLERANCE;
        let p = atom.position;
        for neighbor in tree.locate_within_distance([p.x, p.y, p.z], search * search) {
            let j = neighbor.data;
            if j <= i || (atom.is_hydrogen() && atoms[j].is_hydrogen()) {
                continue;
            }
            let cutoff = radii[i] + radii[j] + BOND_TOLERANCE;
            if nalgebra::distance_squared(&p, &atoms[j].position) <= cutoff * cutoff {
                bonds.push(Bond::new(i, j, BondOrder::Single));
            }
        }
    }
    bonds.sort_by_key(|b| (b.a, b.b));
    bonds
}

/// Distance below which a bond between two heavy elements is taken as double (Å).
fn double_bond_cutoff(a: usize, b: usize) -> Option<f64> {
    match (a.min(b), a.max(b)) {
        (6, 6) => Some(1.38),
        (6, 7) | (6, 8) | (7, 7) | (7, 8) => Some(1.30),
        (6, 16) => Some(1.70),
        (8, 15) => Some(1.55),
        (8, 16) => Some(1.50),
        _ => None,
    }
}

/// Give single bonds their likely order and mark aromatic atoms.
///
/// Bonds of planar five- and six-membered rings of C, N, O and S atoms,
/// each with at most three neighbours, are aromatic. Other bonds shorter than
/// an element-specific cutoff are double. Trigonal carbons and the pyrrole-type
/// nitrogen of an aromatic five-membered ring get their hydrogen count set
/// directly, since bond lengths alone cannot tell.
pub fn assign_bond_orders(atoms: &mut [Atom], bonds: Vec<Bond>) -> Vec<Bond> {
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); atoms.len()];
    for bond in &bonds {
        neighbors[bond.a].push(bond.b);
        neighbors[bond.b].push(bond.a);
    }

    let rings = aromatic_rings(atoms, &neighbors, &bonds);
    let mut aromatic_pairs = HashSet::new();
    for ring in &rings {
        for (k, &i) in ring.iter().enumerate() {
            let j = ring[(k + 1) % ring.len()];
            aromatic_pairs.insert((i.min(j), i.max(j)));
            atoms[i].aromatic = true;
        }
    }

    let bonds = bonds
        .into_iter()
        .map(|bond| {
            let (a, b) = (&atoms[bond.a], &atoms[bond.b]);
            let order = if aromatic_pairs.contains(&(bond.a.min(bond.b), bond.a.max(bond.b))) {
                BondOrder::Aromatic
            } else {
                match double_bond_cutoff(a.atomic_number, b.atomic_number) {
                    Some(cutoff) if nalgebra::distance(&a.position, &b.position) < cutoff => {
                        BondOrder::Double
                    }
                    _ => BondOrder::Single,
                }
            };
            Bond::new(bond.a, bond.b, order)
        })
        .collect();

    for i in 0..atoms.len() {
        if atoms[i].atomic_number == 6 && is_trigonal(i, atoms, &neighbors) {
            atoms[i].implicit_hydrogens = Some(0);
        }
    }

    for ring in rings.iter().filter(|r| r.len() == 5) {
        let has_donor = ring.iter().any(|&i| {
            matches!(atoms[i].atomic_number, 8 | 16)
                || (atoms[i].atomic_number == 7 && neighbors[i].len() == 3)
        });
        if has_donor {
            continue;
        }
        // Imidazoles are ambiguous; the later nitrogen (NE2 in histidine) takes the hydrogen
        if let Some(&n) = ring
            .iter()
            .filter(|&&i| atoms[i].atomic_number == 7 && neighbors[i].len() == 2)
            .max()
        {
            atoms[n].implicit_hydrogens = Some(1);
        }
    }

    bonds
}

/// Planar five- and six-membered rings of C, N, O and S atoms with at most three neighbours.
fn aromatic_rings(atoms: &[Atom], neighbors: &[Vec<usize>], bonds: &[Bond]) -> Vec<Vec<usize>> {
    smallest_rings(neighbors, bonds, 6)
        .into_iter()
        .filter(|ring| ring.len() >= 5)
        .filter(|ring| {
            ring.iter().all(|&i| {
                matches!(atoms[i].atomic_number, 6 | 7 | 8 | 16) && neighbors[i].len() <= 3
            })
        })
        .filter(|ring| max_plane_deviation(ring, atoms) <= PLANARITY_TOLERANCE)
        .collect()
}

/// Smallest ring through every bond, as ordered atom cycles of at most `max_size` atoms.
fn smallest_rings(neighbors: &[Vec<usize>], bonds: &[Bond], max_size: usize) -> Vec<Vec<usize>> {
    let mut seen = HashSet::new();
    let mut rings = Vec::new();
    for bond in bonds {
        // Shortest path from b back to a that does not use the bond itself
        let mut parent: HashMap<usize, usize> = HashMap::from([(bond.b, bond.b)]);
        let mut queue = VecDeque::from([(bond.b, 1)]);
        let mut found = false;
        while let Some((v, size)) = queue.pop_front() {
            if v == bond.a {
                found = true;
                break;
            }
            if size == max_size {
                continue;
            }
            for &w in &neighbors[v] {
                if (v == bond.b && w == bond.a) || parent.contains_key(&w) {
                    continue;
                }
                parent.insert(w, v);
                queue.push_back((w, size + 1));
            }
        }
        if !found {
            continue;
        }

        let mut ring = vec![bond.a];
        let mut v = bond.a;
        while v != bond.b {
            v = parent[&v];
            ring.push(v);
        }
        let mut key = ring.clone();
        key.sort_unstable();
        if seen.insert(key) {
            rings.push(ring);
        }
    }
    rings
}

/// Largest distance of a ring atom from the mean plane of the ring.
fn max_plane_deviation(ring: &[usize], atoms: &[Atom]) -> f64 {
    let points: Vec<Vector3<f64>> = ring.iter().map(|&i| atoms[i].position.coords).collect();
    let centroid =
        points.iter().fold(Vector3::<f64>::zeros(), |acc, p| acc + p) / points.len() as f64;

    // Newell's method on the ordered cycle
    let mut normal = Vector3::<f64>::zeros();
    for (k, p) in points.iter().enumerate() {
        let q = points[(k + 1) % points.len()];
        normal += (p - centroid).cross(&(q - centroid));
    }
    let Some(normal) = normal.try_normalize(1e-12) else {
        return f64::INFINITY;
    };
    points
        .iter()
        .map(|p| (p - centroid).dot(&normal).abs())
        .fold(0.0, f64::max)
}

/// Whether atom `idx` has three neighbours lying in one plane with it.
fn is_trigonal(idx: usize, atoms: &[Atom], neighbors: &[Vec<usize>]) -> bool {
    let &[a, b, c] = neighbors[idx].as_slice() else {
        return false;
    };
    let (pa, pb, pc) = (atoms[a].position, atoms[b].position, atoms[c].position);
    let Some(normal) = (pb - pa).cross(&(pc - pa)).try_normalize(1e-12) else {
        return false;
    };
    (atoms[idx].position - pa).dot(&normal).abs() <= TRIGONAL_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_file(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data").join(name)
    }

    /// Atoms on a regular polygon of `radius` in the xy plane, z alternating by `pucker`
    fn ring_atoms(elements: &[usize], radius: f64, pucker: f64) -> Vec<Atom> {
        let n = elements.len() as f64;
        elements
            .iter()
            .enumerate()
            .map(|(i, &atomic_number)| {
                let angle = 2.0 * std::f64::consts::PI * i as f64 / n;
                let z = if i % 2 == 0 { pucker } else { -pucker };
                Atom {
                    name: format!("X{i}"),
                    atomic_number,
                    position: Point3::new(radius * angle.cos(), radius * angle.sin(), z),
                    formal_charge: 0,
                    residue: "LIG".to_string(),
                    aromatic: false,
                    implicit_hydrogens: None,
                }
            })
            .collect()
    }

    fn perceive(mut atoms: Vec<Atom>) -> Molecule {
        let radii: Vec<f64> = atoms
            .iter()
            .map(|a| {
                Element::new(a.atomic_number)
                    .unwrap()
                    .atomic_radius()
                    .covalent_single
            })
            .collect();
        let bonds = perceive_bonds(&atoms, &radii);
        let bonds = assign_bond_orders(&mut atoms, bonds);
        Molecule::new("ring", atoms, bonds)
    }

    #[test]
    fn reads_receptor_pdb() {
        let mol = read(&test_file("receptor.pdb")).unwrap();

        assert_eq!(mol.atom_count(), 9);
        assert_eq!(mol.heavy_atom_count(), 8);
        assert_eq!(mol.atoms()[0].residue, "ALA");
        assert_eq!(mol.atoms()[8].residue, "HOH");

        // N-CA, N-H, CA-C, CA-CB, C=O, C-N, N-CA
        assert_eq!(mol.bonds().len(), 7);
        assert_eq!(mol.neighbors(1).len(), 3);
        assert!(mol.neighbors(8).is_empty());
        assert_eq!(mol.bonds()[4].order, BondOrder::Double);
        assert_eq!(mol.bonds()[5].order, BondOrder::Single);

        // Carbonyl carbon, alpha carbons, methyl and water
        assert_eq!(mol.hydrogen_count(2), 0);
        assert_eq!(mol.hydrogen_count(1), 1);
        assert_eq!(mol.hydrogen_count(7), 3);
        assert_eq!(mol.hydrogen_count(4), 3);
        assert_eq!(mol.hydrogen_count(8), 2);
    }

    #[test]
    fn formal_charges_are_read() {
        let mol = read(&test_file("ions.pdb")).unwrap();
        let charges: Vec<i32> = mol.atoms().iter().map(|a| a.formal_charge).collect();
        assert_eq!(charges, [1, -1]);

        // NH4+ and OH-
        assert_eq!(mol.hydrogen_count(0), 4);
        assert_eq!(mol.hydrogen_count(1), 1);
    }

    #[test]
    fn benzene_without_hydrogens_is_aromatic() {
        let mol = read(&test_file("benzene.pdb")).unwrap();

        assert_eq!(mol.atom_count(), 6);
        assert_eq!(mol.bonds().len(), 6);
        assert!(mol.bonds().iter().all(|b| b.order == BondOrder::Aromatic));
        for i in 0..6 {
            assert!(mol.atoms()[i].aromatic);
            assert!(mol.is_in_ring(i));
            assert_eq!(mol.hydrogen_count(i), 1);
        }
    }

    #[test]
    fn puckered_ring_is_not_aromatic() {
        // Cyclohexane chair with 1.53 Å bonds
        let mol = perceive(ring_atoms(&[6; 6], 1.446, 0.25));

        assert_eq!(mol.bonds().len(), 6);
        assert!(mol.bonds().iter().all(|b| b.order == BondOrder::Single));
        assert!(mol.atoms().iter().all(|a| !a.aromatic));
        assert!((0..6).all(|i| mol.hydrogen_count(i) == 2));
    }

    #[test]
    fn pyrrole_nitrogen_gets_its_hydrogen() {
        let mol = perceive(ring_atoms(&[7, 6, 6, 6, 6], 1.19, 0.0));

        assert_eq!(mol.bonds().len(), 5);
        assert!(mol.atoms().iter().all(|a| a.aromatic));
        assert_eq!(mol.hydrogen_count(0), 1);
        assert!((1..5).all(|i| mol.hydrogen_count(i) == 1));
    }

    #[test]
    fn imidazole_hydrogen_goes_to_the_later_nitrogen() {
        // Ring order C, N, C, N, C as in the histidine side chain
        let mol = perceive(ring_atoms(&[6, 7, 6, 7, 6], 1.16, 0.0));

        assert!(mol.atoms().iter().all(|a| a.aromatic));
        assert_eq!(mol.hydrogen_count(1), 0);
        assert_eq!(mol.hydrogen_count(3), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read(Path::new("does/not/exist.pdb")).unwrap_err();
        assert!(matches!(err, Error::StructureLoad(_)));
    }
}
