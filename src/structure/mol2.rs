//! Tripos mol2 reader.
//!
//! A mol2 file may hold any number of `@<TRIPOS>MOLECULE` blocks. Each block is
//! parsed on its own, so one malformed pose does not prevent reading the others.

use super::molecule::{Atom, Bond, BondOrder, Molecule};
use super::{Pose, StructureFormat};
use crate::error::Error;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::BufRead;

const MOLECULE_RTI: &str = "@<TRIPOS>MOLECULE";
const ATOM_RTI: &str = "@<TRIPOS>ATOM";
const BOND_RTI: &str = "@<TRIPOS>BOND";

/// Read every molecule block of a mol2 stream.
///
/// The outer `Result` fails on I/O errors or when the stream has no molecule
/// block at all. Each returned [`Pose`] carries its own parse result.
pub fn read<R: BufRead>(reader: R) -> Result<Vec<Pose>, Error> {
    let lines = collect_lines(reader)?;

    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, (_, l))| l.trim().eq_ignore_ascii_case(MOLECULE_RTI))
        .map(|(i, _)| i)
        .collect();
    if starts.is_empty() {
        return Err(Error::parse(
            StructureFormat::Mol2,
            1,
            "missing @<TRIPOS>MOLECULE section",
        ));
    }

    let poses = starts
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = starts.get(index + 1).copied().unwrap_or(lines.len());
            let block = &lines[start..end];
            let name = block_name(block).unwrap_or_else(|| format!("pose_{}", index + 1));
            let molecule = parse_block(block, &name);
            Pose {
                index,
                name,
                molecule,
            }
        })
        .collect();

    Ok(poses)
}

fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>, Error> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|v| (i + 1, v)).map_err(Error::from))
        .collect()
}

fn is_data(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn block_name(block: &[(usize, String)]) -> Option<String> {
    block
        .iter()
        .skip(1)
        .map(|(_, l)| l)
        .take_while(|l| !l.trim_start().starts_with('@'))
        .find(|l| is_data(l))
        .map(|l| l.trim().to_string())
}

fn find_section(block: &[(usize, String)], name: &str) -> Option<usize> {
    block
        .iter()
        .position(|(_, line)| line.trim().eq_ignore_ascii_case(name))
}

fn parse_block(block: &[(usize, String)], name: &str) -> Result<Molecule, Error> {
    let header_line = block[0].0;

    // Name line, then the counts line
    let mut header = block
        .iter()
        .skip(1)
        .take_while(|(_, l)| !l.trim_start().starts_with('@'))
        .filter(|(_, l)| is_data(l));
    let _ = header.next();
    let (count_line_no, count_line) = header.next().ok_or_else(|| {
        Error::parse(StructureFormat::Mol2, header_line, "missing counts line")
    })?;
    let (atom_count, bond_count) = parse_counts(count_line, *count_line_no)?;

    let atom_section = find_section(block, ATOM_RTI).ok_or_else(|| {
        Error::parse(
            StructureFormat::Mol2,
            header_line,
            "missing @<TRIPOS>ATOM section",
        )
    })?;
    let (atoms, id_map) = parse_atoms(&block[atom_section + 1..], atom_count, header_line)?;

    let bonds = match find_section(block, BOND_RTI) {
        Some(bond_section) => parse_bonds(&block[bond_section + 1..], bond_count, &id_map)?,
        None if bond_count == 0 => Vec::new(),
        None => {
            return Err(Error::parse(
                StructureFormat::Mol2,
                header_line,
                "missing @<TRIPOS>BOND section",
            ))
        }
    };

    Ok(Molecule::new(name, atoms, bonds))
}

fn parse_counts(line: &str, line_no: usize) -> Result<(usize, usize), Error> {
    let parts: Vec<_> = line.split_whitespace().collect();
    let atoms = parts
        .first()
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| Error::parse(StructureFormat::Mol2, line_no, "invalid atom count"))?;
    let bonds = match parts.get(1) {
        Some(v) => v.parse::<usize>().map_err(|_| {
            Error::parse(StructureFormat::Mol2, line_no, "invalid bond count")
        })?,
        None => 0,
    };
    Ok((atoms, bonds))
}

/// Data lines of a section, stopping at the next record type indicator.
fn section_lines(lines: &[(usize, String)]) -> impl Iterator<Item = &(usize, String)> {
    lines
        .iter()
        .take_while(|(_, l)| !l.trim_start().starts_with('@'))
        .filter(|(_, l)| is_data(l))
}

fn parse_atoms(
    lines: &[(usize, String)],
    expected: usize,
    header_line: usize,
) -> Result<(Vec<Atom>, HashMap<usize, usize>), Error> {
    let mut atoms = Vec::with_capacity(expected);
    let mut id_map = HashMap::with_capacity(expected);

    for (ln, raw) in section_lines(lines).take(expected) {
        let parts: Vec<_> = raw.split_whitespace().collect();
        if parts.len() < 6 {
            return Err(Error::parse(StructureFormat::Mol2, *ln, "invalid ATOM line"));
        }

        let atom_id = parts[0]
            .parse::<usize>()
            .map_err(|_| Error::parse(StructureFormat::Mol2, *ln, "invalid atom id"))?;
        let coord = |i: usize, axis: &str| {
            parts[i].parse::<f64>().map_err(|_| {
                Error::parse(
                    StructureFormat::Mol2,
                    *ln,
                    format!("invalid {axis} coordinate"),
                )
            })
        };
        let position = Point3::new(coord(2, "x")?, coord(3, "y")?, coord(4, "z")?);

        let sybyl = parts[5];
        let atomic_number = element_from_sybyl(sybyl)
            .or_else(|| element_from_name(parts[1]))
            .ok_or_else(|| {
                Error::parse(
                    StructureFormat::Mol2,
                    *ln,
                    format!("unable to infer element from '{sybyl}'"),
                )
            })?;

        let residue = parts.get(7).map(|r| residue_name(r)).unwrap_or_default();

        id_map.insert(atom_id, atoms.len());
        atoms.push(Atom {
            name: parts[1].to_string(),
            atomic_number,
            position,
            formal_charge: if sybyl.eq_ignore_ascii_case("N.4") { 1 } else { 0 },
            residue,
            aromatic: sybyl.to_ascii_lowercase().ends_with(".ar"),
            implicit_hydrogens: None,
        });
    }

    if atoms.len() < expected {
        return Err(Error::parse(
            StructureFormat::Mol2,
            lines.last().map_or(header_line, |(ln, _)| *ln),
            format!(
                "ATOM section has {} atoms, expected {expected}",
                atoms.len()
            ),
        ));
    }

    Ok((atoms, id_map))
}

fn parse_bonds(
    lines: &[(usize, String)],
    expected: usize,
    id_map: &HashMap<usize, usize>,
) -> Result<Vec<Bond>, Error> {
    let mut bonds = Vec::with_capacity(expected);

    for (ln, raw) in section_lines(lines).take(expected) {
        let parts: Vec<_> = raw.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(Error::parse(StructureFormat::Mol2, *ln, "invalid BOND line"));
        }

        let lookup = |field: &str| {
            field
                .parse::<usize>()
                .ok()
                .and_then(|id| id_map.get(&id).copied())
                .ok_or_else(|| {
                    Error::parse(
                        StructureFormat::Mol2,
                        *ln,
                        format!("bond references unknown atom id '{field}'"),
                    )
                })
        };
        let a = lookup(parts[1])?;
        let b = lookup(parts[2])?;

        bonds.push(Bond::new(a, b, bond_order(parts[3])));
    }

    if bonds.len() < expected {
        return Err(Error::parse(
            StructureFormat::Mol2,
            lines.first().map_or(0, |(ln, _)| *ln),
            format!(
                "BOND section has {} bonds, expected {expected}",
                bonds.len()
            ),
        ));
    }

    Ok(bonds)
}

fn bond_order(token: &str) -> BondOrder {
    match token.to_ascii_lowercase().as_str() {
        "1" => BondOrder::Single,
        "2" => BondOrder::Double,
        "3" => BondOrder::Triple,
        "ar" => BondOrder::Aromatic,
        "am" => BondOrder::Amide,
        _ => BondOrder::Unknown,
    }
}

/// `C.ar` -> carbon, `Cl` -> chlorine. Dummy atoms and lone pairs have no element.
fn element_from_sybyl(sybyl: &str) -> Option<usize> {
    let symbol = sybyl.split('.').next()?;
    if symbol.eq_ignore_ascii_case("Du") || symbol.eq_ignore_ascii_case("LP") {
        return None;
    }
    pdbtbx::Element::from_symbol(symbol).map(|e| e.atomic_number())
}

fn element_from_name(name: &str) -> Option<usize> {
    let mut chars = name.chars();
    let first = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    // Only a lowercase second letter makes a two-letter symbol (Cl1 -> Cl, CA -> C)
    let symbol = match chars.next() {
        Some(second) if second.is_ascii_lowercase() => format!("{first}{second}"),
        _ => first.to_string(),
    };
    pdbtbx::Element::from_symbol(symbol).map(|e| e.atomic_number())
}

/// `ALA12` -> `ALA`, `HOH` -> `HOH`
fn residue_name(subst: &str) -> String {
    let trimmed = subst.trim_end_matches(|c: char| c.is_ascii_digit());
    if trimmed.is_empty() {
        subst.to_string()
    } else {
        trimmed.to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const WATER: &str = "\
# comment before the first block
@<TRIPOS>MOLECULE
water
 3 2 1 0 0
SMALL
NO_CHARGES

@<TRIPOS>ATOM
      1 O1          0.0000    0.0000    0.0000 O.3       1 HOH1        0.0000
      2 H1          0.9572    0.0000    0.0000 H         1 HOH1        0.0000
      3 H2         -0.2400    0.9266    0.0000 H         1 HOH1        0.0000
@<TRIPOS>BOND
     1     1     2    1
     2     1     3    1
";

    #[test]
    fn reads_single_block() {
        let poses = read(Cursor::new(WATER)).unwrap();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].name, "water");
        assert_eq!(poses[0].index, 0);

        let mol = poses[0].molecule.as_ref().unwrap();
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.heavy_atom_count(), 1);
        assert_eq!(mol.hydrogen_count(0), 2);
        assert_eq!(mol.atoms()[0].residue, "HOH");
        assert_eq!(mol.atoms()[0].atomic_number, 8);
    }

    #[test]
    fn no_molecule_block_is_an_error() {
        let err = read(Cursor::new("nothing here\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn bad_block_does_not_poison_others() {
        let broken = WATER.replace("     2     1     3    1", "     2     1     9    1");
        let text = format!("{WATER}{broken}{WATER}");
        let poses = read(Cursor::new(text)).unwrap();

        assert_eq!(poses.len(), 3);
        assert!(poses[0].molecule.is_ok());
        assert!(poses[1].molecule.is_err());
        assert!(poses[2].molecule.is_ok());
        assert_eq!(poses[1].index, 1);
    }

    #[test]
    fn element_inference() {
        assert_eq!(element_from_sybyl("C.ar"), Some(6));
        assert_eq!(element_from_sybyl("Cl"), Some(17));
        assert_eq!(element_from_sybyl("N.4"), Some(7));
        assert_eq!(element_from_sybyl("Du"), None);
        assert_eq!(element_from_name("Cl1"), Some(17));
        assert_eq!(element_from_name("CA"), Some(6));
        assert_eq!(residue_name("ALA12"), "ALA");
        assert_eq!(bond_order("ar"), BondOrder::Aromatic);
    }
}
