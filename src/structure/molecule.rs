//! Atoms, bonds and the molecular graph built from them.

use nalgebra::Point3;

/// A single atom as far as PLEC is concerned.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    /// Atom name from the input file (e.g. `CA`, `O1`)
    pub name: String,
    /// Element as its atomic number, 1 for hydrogen
    pub atomic_number: usize,
    /// Cartesian coordinates in Å
    pub position: Point3<f64>,
    /// Integer formal charge
    pub formal_charge: i32,
    /// Residue name without the residue number (e.g. `ALA`, `HOH`)
    pub residue: String,
    /// Member of an aromatic ring
    pub aromatic: bool,
    /// Hydrogens attached to this atom but absent from the file, when the
    /// reader knows them. `None` derives them from standard valences.
    pub implicit_hydrogens: Option<usize>,
}

impl Atom {
    /// Whether this atom is a hydrogen
    pub fn is_hydrogen(&self) -> bool {
        self.atomic_number == 1
    }
}

/// Bond types of the Tripos mol2 format.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BondOrder {
    /// `1`
    Single,
    /// `2`
    Double,
    /// `3`
    Triple,
    /// `ar`
    Aromatic,
    /// `am`, valence-wise a single bond
    Amide,
    /// `du`, `un`, `nc` and anything unrecognised, counted as single
    Unknown,
}

impl BondOrder {
    /// Contribution to the valence of each end, in half bonds.
    pub fn valence_halves(self) -> u32 {
        match self {
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Aromatic => 3,
            BondOrder::Single | BondOrder::Amide | BondOrder::Unknown => 2,
        }
    }
}

/// A bond between two atoms, referenced by their index in [`Molecule::atoms`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bond {
    /// Index of the first atom
    pub a: usize,
    /// Index of the second atom
    pub b: usize,
    /// Bond type
    pub order: BondOrder,
}

impl Bond {
    /// Bond between atoms `a` and `b`
    pub fn new(a: usize, b: usize, order: BondOrder) -> Self {
        Self { a, b, order }
    }
}

/// Standard valences of the organic subset. Other elements get no implicit hydrogens.
fn standard_valences(atomic_number: usize) -> &'static [i32] {
    match atomic_number {
        5 => &[3],
        6 => &[4],
        7 => &[3],
        8 => &[2],
        15 => &[3, 5],
        16 => &[2, 4, 6],
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

/// Hydrogens needed to fill the lowest standard valence that covers the bonds
/// already made, with aromatic bonds counted as one and a half.
fn missing_hydrogens(atom: &Atom, bond_halves: u32) -> usize {
    if let Some(n) = atom.implicit_hydrogens {
        return n;
    }
    let used = bond_halves.div_ceil(2) as i32;
    standard_valences(atom.atomic_number)
        .iter()
        .map(|&v| match atom.atomic_number {
            5 | 6 => v - atom.formal_charge.abs(),
            _ => v + atom.formal_charge,
        })
        .find(|&v| v >= used)
        .map_or(0, |v| (v - used) as usize)
}

/// Atoms plus bond topology, with the derived adjacency and ring membership
/// computed once at construction.
#[derive(Clone, Debug)]
pub struct Molecule {
    /// Title of the structure, or the file stem for PDB/mmCIF
    pub name: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    neighbors: Vec<Vec<usize>>,
    in_ring: Vec<bool>,
    implicit_hydrogens: Vec<usize>,
}

impl Molecule {
    /// Build a molecule. Bonds referencing atoms outside `atoms` are dropped.
    /// Atoms joined by an aromatic ring bond are flagged as aromatic, and
    /// missing hydrogens are filled in from standard valences.
    pub fn new(name: impl Into<String>, mut atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        let n = atoms.len();
        let bonds: Vec<Bond> = bonds
            .into_iter()
            .filter(|b| b.a < n && b.b < n && b.a != b.b)
            .collect();

        let mut incident: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
        let mut valence_halves = vec![0u32; n];
        for (i, bond) in bonds.iter().enumerate() {
            incident[bond.a].push((bond.b, i));
            incident[bond.b].push((bond.a, i));
            valence_halves[bond.a] += bond.order.valence_halves();
            valence_halves[bond.b] += bond.order.valence_halves();
        }

        let bridges = find_bridges(&incident, bonds.len());
        let mut in_ring = vec![false; n];
        for (i, bond) in bonds.iter().enumerate() {
            if bridges[i] {
                continue;
            }
            in_ring[bond.a] = true;
            in_ring[bond.b] = true;
            // Carboxylates also use `ar` bonds in mol2, but never inside a ring
            if bond.order == BondOrder::Aromatic {
                atoms[bond.a].aromatic = true;
                atoms[bond.b].aromatic = true;
            }
        }

        let implicit_hydrogens = atoms
            .iter()
            .zip(&valence_halves)
            .map(|(atom, &halves)| missing_hydrogens(atom, halves))
            .collect();

        let neighbors = incident
            .into_iter()
            .map(|v| v.into_iter().map(|(j, _)| j).collect())
            .collect();

        Self {
            name: name.into(),
            atoms,
            bonds,
            neighbors,
            in_ring,
            implicit_hydrogens,
        }
    }

    /// All atoms, hydrogens included, in file order
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Bonds that survived construction
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Number of atoms, hydrogens included
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of non-hydrogen atoms
    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| !a.is_hydrogen()).count()
    }

    /// Indices of all atoms bonded to atom `idx`
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.neighbors[idx]
    }

    /// Whether atom `idx` lies on a ring
    pub fn is_in_ring(&self, idx: usize) -> bool {
        self.in_ring[idx]
    }

    /// Number of bonded non-hydrogen atoms
    pub fn heavy_degree(&self, idx: usize) -> usize {
        self.neighbors[idx]
            .iter()
            .filter(|&&j| !self.atoms[j].is_hydrogen())
            .count()
    }

    /// Number of attached hydrogens, bonded hydrogen atoms plus implicit ones
    pub fn hydrogen_count(&self, idx: usize) -> usize {
        let explicit = self.neighbors[idx]
            .iter()
            .filter(|&&j| self.atoms[j].is_hydrogen())
            .count();
        explicit + self.implicit_hydrogens[idx]
    }
}

/// Tarjan's bridge search. A bond lies on a ring exactly when it is not a bridge.
fn find_bridges(incident: &[Vec<(usize, usize)>], n_bonds: usize) -> Vec<bool> {
    let n = incident.len();
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0; n];
    let mut is_bridge = vec![false; n_bonds];
    let mut timer = 0;

    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;

        // (atom, bond used to reach it, next neighbor to visit)
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
        while let Some(top) = stack.last_mut() {
            let (v, parent_bond) = (top.0, top.1);
            if top.2 < incident[v].len() {
                let (w, bond) = incident[v][top.2];
                top.2 += 1;
                if Some(bond) == parent_bond {
                    continue;
                }
                if disc[w] == usize::MAX {
                    disc[w] = timer;
                    low[w] = timer;
                    timer += 1;
                    stack.push((w, Some(bond), 0));
                } else {
                    low[v] = low[v].min(disc[w]);
                }
            } else {
                stack.pop();
                if let (Some(bond), Some(&(u, _, _))) = (parent_bond, stack.last()) {
                    low[u] = low[u].min(low[v]);
                    if low[v] > disc[u] {
                        is_bridge[bond] = true;
                    }
                }
            }
        }
    }

    is_bridge
}
