use super::autoz::{rank_by_angle_quality, right_angle_deviation};
use super::error::GeometryError;
use super::placement::place_molecule;
use crate::core::fragments::registry::Fragment;
use crate::core::models::atom::{Atom, Param, Ref};
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::utils::bond_lengths::BondLengthTable;
use crate::core::utils::geometry;
use nalgebra::Vector3;
use std::ops::Range;
use tracing::{debug, info, instrument, warn};

/// How a template placeholder was bound to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
enum HostRef {
    Bound(usize),
    /// No host atom is in a position to serve.
    Missing,
    /// Candidates exist but none passes the angle-quality test.
    Rejected,
}

impl HostRef {
    fn atom(self) -> Option<usize> {
        match self {
            Self::Bound(index) => Some(index),
            Self::Missing | Self::Rejected => None,
        }
    }

    fn pick(candidates: &[usize], ranked: Vec<usize>) -> Self {
        match ranked.first() {
            Some(&best) => Self::Bound(best),
            None if candidates.is_empty() => Self::Missing,
            None => Self::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraftOutcome {
    /// Index of the fragment root, which took over the target atom's slot.
    pub root: usize,
    /// Indices of the appended fragment atoms.
    pub appended: Range<usize>,
    /// New root bond length when the target bond was rescaled.
    pub rescaled_bond: Option<f64>,
}

/// Replaces atom `target` by the root of `fragment` and appends the rest of the
/// fragment, binding the template placeholders to host atoms.
///
/// Placeholder -1 is the host atom the root bonds to, -2 and -3 are the root's
/// angle and dihedral references. They come from the target's own Z-matrix
/// entry and, where that is missing or the target is Cartesian, from the bond
/// graph around the target, accepting only atoms whose angle is within
/// `angle_threshold` degrees of a right angle. If the target is a terminal atom
/// of a different element than the root, the bond to its host is rescaled to
/// the tabulated length first. The molecule is modified only if every step
/// succeeds.
#[instrument(skip_all, name = "graft", fields(atom = target + 1, fragment = %fragment.name))]
pub fn run(
    molecule: &mut Molecule,
    target: usize,
    fragment: &Fragment,
    table: &BondLengthTable,
    angle_threshold: f64,
) -> Result<GraftOutcome, GeometryError> {
    let Some(host_atom) = molecule.atom(target) else {
        return Err(GeometryError::UnknownReference(format!(
            "graft target {} is outside a molecule of {} atoms",
            target + 1,
            molecule.len()
        )));
    };
    let template = &fragment.template;
    let Some(root) = template.atom(0) else {
        return Err(GeometryError::InvalidInput(format!(
            "fragment '{}' has no atoms",
            fragment.name
        )));
    };
    let target_was_cartesian = !host_atom.is_internal();
    let host_refs = host_references(molecule, target, angle_threshold);
    debug!(?host_refs, "Resolved host references");

    let mut working = molecule.clone();
    let rescaled_bond =
        rescale_target_bond(&mut working, target, root.element, host_refs[0].atom(), table);

    if let Some(atom) = working.atom_mut(target) {
        atom.element = root.element;
        atom.name = format!("{}{}", root.element.symbol(), target + 1);
    }

    let base = working.len();
    let new_index_of = |t: usize| if t == 0 { target } else { base + t - 1 };
    for (t, atom) in template.atoms().iter().enumerate().skip(1) {
        let mut ic = atom.internal_coord().copied().unwrap_or_default();
        for (kind, link) in ic.links_mut() {
            link.target = match link.target {
                Ref::Concrete(t_ref) => Ref::Concrete(new_index_of(t_ref)),
                Ref::Placeholder(slot) => {
                    match placeholder_slot(slot).map(|s| host_refs[s]) {
                        Some(HostRef::Bound(host)) => Ref::Concrete(host),
                        Some(HostRef::Rejected) => {
                            return Err(GeometryError::NoSuitableReference {
                                atom: molecule.label(target),
                                placeholder: slot,
                                threshold: angle_threshold,
                            });
                        }
                        Some(HostRef::Missing) | None => {
                            return Err(GeometryError::UnknownReference(format!(
                                "placeholder {slot} used by the {kind} of fragment atom {} in '{}' has no host atom",
                                t + 1,
                                fragment.name
                            )));
                        }
                    }
                }
            };
        }
        let index = base + t - 1;
        let name = format!("{}{}", atom.element.symbol(), index + 1);
        working.add_atom(Atom::internal(atom.element, &name, ic));
    }
    for bond in template.bonds() {
        working.add_bond(new_index_of(bond.first), new_index_of(bond.second))?;
    }
    let appended = base..working.len();

    working.validate()?;
    place_molecule(&mut working).into_result()?;
    if target_was_cartesian {
        for index in appended.clone() {
            working.make_cartesian(index)?;
        }
    }

    *molecule = working;
    info!(
        root = target + 1,
        appended = appended.len(),
        "Fragment grafted"
    );
    Ok(GraftOutcome {
        root: target,
        appended,
        rescaled_bond,
    })
}

fn placeholder_slot(slot: i8) -> Option<usize> {
    match slot {
        -1 => Some(0),
        -2 => Some(1),
        -3 => Some(2),
        _ => None,
    }
}

/// Host atoms standing in for the placeholders -1, -2 and -3.
///
/// The target's own concrete references come first. Missing ones are filled
/// from the bond graph the way reference assignment does it: a neighbour of
/// the target, then the candidate closest to 90 degrees that passes the angle
/// threshold, trying proper dihedral partners before improper ones.
fn host_references(molecule: &Molecule, target: usize, threshold: f64) -> [HostRef; 3] {
    let mut refs = [HostRef::Missing; 3];
    if let Some(ic) = molecule.atom(target).and_then(|a| a.internal_coord()) {
        for (slot, r) in ic.refs().into_iter().enumerate() {
            if let Some(host) = r.and_then(Ref::concrete) {
                refs[slot] = HostRef::Bound(host);
            }
        }
    }
    let positions = molecule.positions();
    let deviation = |p: usize, q: usize, r: usize| {
        right_angle_deviation(&positions[p], &positions[q], &positions[r])
    };

    if refs[0] == HostRef::Missing
        && let Some(&first) = molecule.neighbors(target).first()
    {
        refs[0] = HostRef::Bound(first);
    }
    if let (HostRef::Bound(r1), HostRef::Missing) = (refs[0], refs[1]) {
        let mut candidates: Vec<usize> = Vec::new();
        for &c in molecule.neighbors(r1).iter().chain(molecule.neighbors(target)) {
            if c != target && c != r1 && !candidates.contains(&c) {
                candidates.push(c);
            }
        }
        let ranked = rank_by_angle_quality(
            candidates.iter().copied(),
            |c| deviation(target, r1, c),
            threshold,
        );
        refs[1] = HostRef::pick(&candidates, ranked);
    }
    if refs[1] == HostRef::Rejected && refs[2] == HostRef::Missing {
        refs[2] = HostRef::Rejected;
    }
    if let (HostRef::Bound(r1), HostRef::Bound(r2), HostRef::Missing) = (refs[0], refs[1], refs[2])
    {
        let usable = |c: &usize| *c != target && *c != r1 && *c != r2;
        let proper: Vec<usize> = molecule.neighbors(r2).iter().copied().filter(usable).collect();
        let improper: Vec<usize> = molecule.neighbors(r1).iter().copied().filter(usable).collect();
        let ranked_proper =
            rank_by_angle_quality(proper.iter().copied(), |c| deviation(r1, r2, c), threshold);
        refs[2] = if ranked_proper.is_empty() {
            let ranked_improper = rank_by_angle_quality(
                improper.iter().copied(),
                |c| deviation(r2, r1, c),
                threshold,
            );
            let all: Vec<usize> = proper.iter().chain(&improper).copied().collect();
            HostRef::pick(&all, ranked_improper)
        } else {
            HostRef::pick(&proper, ranked_proper)
        };
    }
    refs
}

/// Resets the target's bond to its host to the tabulated length for the new
/// root element when the target is a terminal atom of another element.
fn rescale_target_bond(
    molecule: &mut Molecule,
    target: usize,
    root_element: Element,
    host: Option<usize>,
    table: &BondLengthTable,
) -> Option<f64> {
    let host = host?;
    let target_atom = molecule.atom(target)?;
    if molecule.degree(target) != 1 || target_atom.element == root_element {
        return None;
    }
    let host_atom = molecule.atom(host)?;
    let host_position = host_atom.position;
    let length = table.lookup(root_element, host_atom.element).length;
    debug!(
        from = %target_atom.element,
        to = %root_element,
        length,
        "Rescaling bond to grafted root"
    );

    if molecule.atom(target)?.is_internal() {
        // The first atom has no bond entry; its host's entry points back at it.
        if !set_bond_entry(molecule, target, host, length)
            && !set_bond_entry(molecule, host, target, length)
        {
            warn!(
                atom = target + 1,
                host = host + 1,
                "No Z-matrix entry holds the bond to the graft target; keeping its length"
            );
            return None;
        }
        return Some(length);
    }

    let atom = molecule.atom_mut(target)?;
    let direction = atom.position - host_position;
    let norm = direction.norm();
    atom.position = if norm > geometry::DEGENERACY_EPSILON {
        host_position + direction * (length / norm)
    } else {
        host_position + Vector3::z() * length
    };
    Some(length)
}

/// Sets the bond length of atom `from` if its bond reference is `to`.
fn set_bond_entry(molecule: &mut Molecule, from: usize, to: usize, length: f64) -> bool {
    let Some(bond) = molecule
        .atom_mut(from)
        .and_then(|a| a.internal_coord_mut())
        .and_then(|ic| ic.bond.as_mut())
    else {
        return false;
    };
    if bond.target != Ref::Concrete(to) {
        return false;
    }
    bond.param = Param::Literal(length);
    true
}
