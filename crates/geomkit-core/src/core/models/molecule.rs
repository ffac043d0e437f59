use super::atom::{Atom, AtomCoord, AtomLabel, InternalCoord, Param, ParameterKind, Ref};
use super::ids::VariableId;
use super::topology::{Bond, BondOverrides};
use super::variable::{Metric, Variable, VariableError, VariableStore};
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use std::collections::VecDeque;
use thiserror::Error;

/// Coordinate modes present in a molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateMode {
    Empty,
    Cartesian,
    Internal,
    Mixed,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MoleculeError {
    #[error("Atom index {index} is out of range for a molecule of {len} atoms")]
    AtomOutOfRange { index: usize, len: usize },

    #[error("An atom cannot be bonded to itself (atom {})", .0 + 1)]
    SelfBond(usize),

    #[error("Atom {atom} has an invalid {kind} reference to {target}")]
    InvalidReference {
        atom: AtomLabel,
        kind: ParameterKind,
        target: Ref,
    },

    #[error("Atom {atom} uses the same reference atom more than once")]
    RepeatedReference { atom: AtomLabel },

    #[error("Atom {atom} defines an angle or dihedral without the preceding reference")]
    MalformedCoordinate { atom: AtomLabel },

    #[error("Atom {atom} needs {expected} reference atom(s) but has {found}")]
    ReferenceCount {
        atom: AtomLabel,
        expected: usize,
        found: usize,
    },

    #[error("Atom {atom} links its {kind} to a variable that does not exist")]
    DanglingVariable { atom: AtomLabel, kind: ParameterKind },

    #[error("Variable '{name}' holds a {found} but is used as a {expected}")]
    MetricMismatch {
        name: String,
        expected: Metric,
        found: Metric,
    },

    #[error("Variable '{name}' is still referenced by {users} parameter(s)")]
    VariableInUse { name: String, users: usize },

    #[error("Atom {atom} has no {kind} parameter")]
    MissingParameter { atom: AtomLabel, kind: ParameterKind },

    #[error("The {kind} of atom {atom} is already linked to a variable")]
    AlreadyLinked { atom: AtomLabel, kind: ParameterKind },

    #[error("Expected {expected} positions, found {found}")]
    PositionCountMismatch { expected: usize, found: usize },

    #[error("Atom order is not a permutation of 0..{len}")]
    InvalidPermutation { len: usize },

    #[error(transparent)]
    Variable(#[from] VariableError),
}

/// An ordered sequence of atoms with their bonds and the variables they share.
///
/// Atom indices are positions in the sequence. Internal-coordinate references
/// always point at earlier atoms once the molecule is validated, so positions
/// can be computed in a single forward sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<usize>>,
    variables: VariableStore,
    overrides: BondOverrides,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), MoleculeError> {
        if positions.len() != self.atoms.len() {
            return Err(MoleculeError::PositionCountMismatch {
                expected: self.atoms.len(),
                found: positions.len(),
            });
        }
        for (atom, position) in self.atoms.iter_mut().zip(positions) {
            atom.position = *position;
        }
        Ok(())
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    pub fn overrides(&self) -> &BondOverrides {
        &self.overrides
    }

    pub fn overrides_mut(&mut self) -> &mut BondOverrides {
        &mut self.overrides
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Adds a bond. Returns `false` if the bond already existed.
    pub fn add_bond(&mut self, a: usize, b: usize) -> Result<bool, MoleculeError> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Err(MoleculeError::SelfBond(a));
        }
        if self.are_bonded(a, b) {
            return Ok(false);
        }
        self.bonds.push(Bond::new(a, b));
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        Ok(true)
    }

    pub fn remove_bond(&mut self, a: usize, b: usize) -> bool {
        let bond = Bond::new(a, b);
        let Some(pos) = self.bonds.iter().position(|&x| x == bond) else {
            return false;
        };
        self.bonds.remove(pos);
        self.adjacency[a].retain(|&n| n != b);
        self.adjacency[b].retain(|&n| n != a);
        true
    }

    /// Replaces the whole bond list, e.g. after re-running bond inference.
    pub fn replace_bonds(&mut self, bonds: Vec<Bond>) -> Result<(), MoleculeError> {
        for bond in &bonds {
            self.check_index(bond.second)?;
            if bond.is_self_bond() {
                return Err(MoleculeError::SelfBond(bond.first));
            }
        }
        self.bonds.clear();
        for adj in &mut self.adjacency {
            adj.clear();
        }
        for bond in bonds {
            if self.adjacency[bond.first].contains(&bond.second) {
                continue;
            }
            self.adjacency[bond.first].push(bond.second);
            self.adjacency[bond.second].push(bond.first);
            self.bonds.push(bond);
        }
        Ok(())
    }

    /// Bonded neighbours of `index` in the order the bonds were added.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, index: usize) -> usize {
        self.neighbors(index).len()
    }

    pub fn are_bonded(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).contains(&b)
    }

    pub fn mode(&self) -> CoordinateMode {
        let internal = self.atoms.iter().filter(|a| a.is_internal()).count();
        match (self.atoms.len(), internal) {
            (0, _) => CoordinateMode::Empty,
            (_, 0) => CoordinateMode::Cartesian,
            (n, k) if n == k => CoordinateMode::Internal,
            _ => CoordinateMode::Mixed,
        }
    }

    pub fn label(&self, index: usize) -> AtomLabel {
        AtomLabel {
            index,
            name: self
                .atoms
                .get(index)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "?".to_string()),
        }
    }

    pub fn labels(&self, indices: &[usize]) -> Vec<AtomLabel> {
        indices.iter().map(|&i| self.label(i)).collect()
    }

    /// Checks the structural invariants of a fully resolved molecule: the
    /// internal atom at position `k` has exactly `min(k, 3)` references, every
    /// reference names a distinct earlier atom and every linked variable exists
    /// with a metric matching its use.
    pub fn validate(&self) -> Result<(), MoleculeError> {
        self.validate_with(false)
    }

    /// Like [`validate`](Self::validate) but also accepts the placeholder
    /// references -1, -2 and -3 used by fragment templates. Template atoms
    /// always carry all three references.
    pub fn validate_template(&self) -> Result<(), MoleculeError> {
        self.validate_with(true)
    }

    fn validate_with(&self, template: bool) -> Result<(), MoleculeError> {
        for (index, atom) in self.atoms.iter().enumerate() {
            let Some(ic) = atom.internal_coord() else {
                continue;
            };
            if !ic.is_well_formed() {
                return Err(MoleculeError::MalformedCoordinate {
                    atom: self.label(index),
                });
            }
            let expected = if template { 3 } else { InternalCoord::required_depth(index) };
            if ic.depth() != expected {
                return Err(MoleculeError::ReferenceCount {
                    atom: self.label(index),
                    expected,
                    found: ic.depth(),
                });
            }
            let mut seen: Vec<Ref> = Vec::with_capacity(3);
            for (kind, link) in ic.links() {
                let valid = match link.target {
                    Ref::Concrete(target) => target < index,
                    Ref::Placeholder(slot) => template && (-3..=-1).contains(&slot),
                };
                if !valid {
                    return Err(MoleculeError::InvalidReference {
                        atom: self.label(index),
                        kind,
                        target: link.target,
                    });
                }
                if seen.contains(&link.target) {
                    return Err(MoleculeError::RepeatedReference {
                        atom: self.label(index),
                    });
                }
                seen.push(link.target);

                if let Param::Linked { id, .. } = link.param {
                    let variable =
                        self.variables
                            .get(id)
                            .ok_or_else(|| MoleculeError::DanglingVariable {
                                atom: self.label(index),
                                kind,
                            })?;
                    if variable.metric != kind.metric() {
                        return Err(MoleculeError::MetricMismatch {
                            name: variable.name.clone(),
                            expected: kind.metric(),
                            found: variable.metric,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Mass-weighted centre. Falls back to the plain centroid when every atom is massless.
    pub fn center_of_mass(&self) -> Option<Point3<f64>> {
        if self.atoms.is_empty() {
            return None;
        }
        let total: f64 = self.atoms.iter().map(|a| a.element.mass()).sum();
        let sum = if total > 0.0 {
            self.atoms
                .iter()
                .fold(Vector3::zeros(), |acc, a| {
                    acc + a.position.coords * a.element.mass()
                })
                / total
        } else {
            self.atoms
                .iter()
                .fold(Vector3::zeros(), |acc, a| acc + a.position.coords)
                / self.atoms.len() as f64
        };
        Some(Point3::from(sum))
    }

    /// Eigenvalues of the inertia tensor about the centre of mass, in ascending order.
    pub fn principal_moments(&self) -> [f64; 3] {
        let Some(com) = self.center_of_mass() else {
            return [0.0; 3];
        };
        let mut tensor = Matrix3::zeros();
        for atom in &self.atoms {
            let r = atom.position - com;
            let m = atom.element.mass();
            tensor += (Matrix3::identity() * r.norm_squared() - r * r.transpose()) * m;
        }
        let eigen = SymmetricEigen::new(tensor);
        let mut moments = [
            eigen.eigenvalues[0],
            eigen.eigenvalues[1],
            eigen.eigenvalues[2],
        ];
        moments.sort_by(|a, b| a.total_cmp(b));
        moments
    }

    /// Connected components of the bond graph. Each component is sorted and
    /// components are ordered by their lowest atom index.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.atoms.len()];
        let mut components = Vec::new();
        for start in 0..self.atoms.len() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                component.push(current);
                for &next in self.neighbors(current) {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Every `(atom, parameter)` pair linked to the given variable.
    pub fn variable_usages(&self, id: VariableId) -> Vec<(usize, ParameterKind)> {
        self.atoms
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.internal_coord().map(|ic| (i, ic)))
            .flat_map(|(i, ic)| {
                ic.links()
                    .filter(|(_, link)| link.param.variable() == Some(id))
                    .map(move |(kind, _)| (i, kind))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Removes a variable that no parameter refers to anymore.
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable, MoleculeError> {
        let id = self
            .variables
            .id_of(name)
            .ok_or_else(|| VariableError::Unknown(name.to_string()))?;
        let users = self.variable_usages(id).len();
        if users > 0 {
            return Err(MoleculeError::VariableInUse {
                name: name.to_string(),
                users,
            });
        }
        self.variables
            .remove(id)
            .ok_or_else(|| VariableError::Unknown(name.to_string()).into())
    }

    /// Replaces every reference to a variable by its current (signed) value and drops the variable.
    pub fn inline_variable(&mut self, name: &str) -> Result<Variable, MoleculeError> {
        let id = self
            .variables
            .id_of(name)
            .ok_or_else(|| VariableError::Unknown(name.to_string()))?;
        let value = self.variables.get(id).map(|v| v.value).unwrap_or_default();
        for atom in &mut self.atoms {
            let Some(ic) = atom.internal_coord_mut() else {
                continue;
            };
            for (_, link) in ic.links_mut() {
                if let Param::Linked { id: linked, negated } = link.param
                    && linked == id
                {
                    link.param = Param::Literal(if negated { -value } else { value });
                }
            }
        }
        self.variables
            .remove(id)
            .ok_or_else(|| VariableError::Unknown(name.to_string()).into())
    }

    /// Promotes a literal parameter to a new free variable holding the same value.
    pub fn variablize(
        &mut self,
        atom: usize,
        kind: ParameterKind,
        name: &str,
    ) -> Result<VariableId, MoleculeError> {
        self.check_index(atom)?;
        let label = self.label(atom);
        let value = {
            let link = self.atoms[atom]
                .internal_coord()
                .and_then(|ic| ic.link(kind))
                .ok_or_else(|| MoleculeError::MissingParameter {
                    atom: label.clone(),
                    kind,
                })?;
            match link.param {
                Param::Literal(value) => value,
                Param::Linked { .. } => {
                    return Err(MoleculeError::AlreadyLinked { atom: label, kind });
                }
            }
        };
        let id = self
            .variables
            .insert(Variable::new(name, value, kind.metric(), false))?;
        if let Some(link) = self.atoms[atom]
            .internal_coord_mut()
            .and_then(|ic| ic.link_mut(kind))
        {
            link.param = Param::linked(id);
        }
        Ok(id)
    }

    /// Returns a copy with atoms re-sequenced so that `order[k]` becomes atom `k`.
    ///
    /// Concrete references, bonds and bond overrides are renumbered. The copy is
    /// not validated: re-sequencing can turn backward references into forward ones.
    pub fn reordered(&self, order: &[usize]) -> Result<Molecule, MoleculeError> {
        let n = self.atoms.len();
        let mut new_index_of = vec![usize::MAX; n];
        for (new, &old) in order.iter().enumerate() {
            if old >= n || new_index_of[old] != usize::MAX {
                return Err(MoleculeError::InvalidPermutation { len: n });
            }
            new_index_of[old] = new;
        }
        if order.len() != n {
            return Err(MoleculeError::InvalidPermutation { len: n });
        }

        let mut result = Molecule {
            variables: self.variables.clone(),
            overrides: self.overrides.remap(&new_index_of),
            ..Molecule::default()
        };
        for &old in order {
            let mut atom = self.atoms[old].clone();
            if let Some(ic) = atom.internal_coord_mut() {
                for (_, link) in ic.links_mut() {
                    if let Ref::Concrete(target) = link.target {
                        link.target = Ref::Concrete(new_index_of[target]);
                    }
                }
            }
            result.add_atom(atom);
        }
        let bonds = self
            .bonds
            .iter()
            .map(|b| Bond::new(new_index_of[b.first], new_index_of[b.second]))
            .collect();
        result.replace_bonds(bonds)?;
        Ok(result)
    }

    /// All-Cartesian copy at the current positions, optionally without dummy atoms.
    ///
    /// Variables are not carried over. Bonds between kept atoms are.
    pub fn cartesian_snapshot(&self, include_dummies: bool) -> Molecule {
        let mut new_index_of = vec![None; self.atoms.len()];
        let mut snapshot = Molecule::new();
        for (i, atom) in self.atoms.iter().enumerate() {
            if atom.is_dummy() && !include_dummies {
                continue;
            }
            new_index_of[i] = Some(snapshot.add_atom(Atom::cartesian(
                atom.element,
                &atom.name,
                atom.position,
            )));
        }
        for bond in &self.bonds {
            if let (Some(a), Some(b)) = (new_index_of[bond.first], new_index_of[bond.second]) {
                // Indices come from the snapshot itself and bonds are never self-bonds.
                let _ = snapshot.add_bond(a, b);
            }
        }
        snapshot
    }

    /// Switches one atom to Cartesian mode at its current position.
    pub fn make_cartesian(&mut self, index: usize) -> Result<(), MoleculeError> {
        self.check_index(index)?;
        self.atoms[index].coord = AtomCoord::Cartesian;
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), MoleculeError> {
        if index < self.atoms.len() {
            Ok(())
        } else {
            Err(MoleculeError::AtomOutOfRange {
                index,
                len: self.atoms.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{InternalCoord, Link};
    use crate::core::models::element::Element;

    fn water_zmatrix() -> Molecule {
        let mut mol = Molecule::new();
        let r = mol
            .variables_mut()
            .insert(Variable::new("ROH", 0.96, Metric::Distance, false))
            .unwrap();
        mol.add_atom(Atom::internal(Element::O, "O1", InternalCoord::anchor()));
        mol.add_atom(Atom::internal(
            Element::H,
            "H2",
            InternalCoord::with_bond(Link::new(0, Param::linked(r))),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H3",
            InternalCoord::with_angle(Link::new(0, Param::linked(r)), Link::literal(1, 104.5)),
        ));
        mol
    }

    fn cartesian(points: &[(Element, [f64; 3])]) -> Molecule {
        let mut mol = Molecule::new();
        for (i, (element, p)) in points.iter().enumerate() {
            mol.add_atom(Atom::cartesian(
                *element,
                &format!("{}{}", element, i + 1),
                Point3::new(p[0], p[1], p[2]),
            ));
        }
        mol
    }

    #[test]
    fn add_bond_is_symmetric_and_idempotent() {
        let mut mol = cartesian(&[(Element::C, [0.0; 3]), (Element::H, [1.0, 0.0, 0.0])]);
        assert!(mol.add_bond(0, 1).unwrap());
        assert!(!mol.add_bond(1, 0).unwrap());
        assert_eq!(mol.bonds().len(), 1);
        assert!(mol.are_bonded(0, 1));
        assert!(mol.are_bonded(1, 0));
        assert_eq!(mol.neighbors(1), &[0]);
    }

    #[test]
    fn add_bond_rejects_self_and_out_of_range() {
        let mut mol = cartesian(&[(Element::C, [0.0; 3])]);
        assert_eq!(mol.add_bond(0, 0), Err(MoleculeError::SelfBond(0)));
        assert!(matches!(
            mol.add_bond(0, 4),
            Err(MoleculeError::AtomOutOfRange { index: 4, len: 1 })
        ));
    }

    #[test]
    fn remove_bond_updates_both_adjacency_lists() {
        let mut mol = cartesian(&[(Element::C, [0.0; 3]), (Element::H, [1.0, 0.0, 0.0])]);
        mol.add_bond(0, 1).unwrap();
        assert!(mol.remove_bond(1, 0));
        assert!(!mol.are_bonded(0, 1));
        assert!(mol.neighbors(0).is_empty());
        assert!(!mol.remove_bond(0, 1));
    }

    #[test]
    fn mode_reports_mixed_molecules() {
        let mut mol = water_zmatrix();
        assert_eq!(mol.mode(), CoordinateMode::Internal);
        mol.make_cartesian(2).unwrap();
        assert_eq!(mol.mode(), CoordinateMode::Mixed);
        assert_eq!(Molecule::new().mode(), CoordinateMode::Empty);
    }

    #[test]
    fn validate_accepts_backward_references() {
        assert_eq!(water_zmatrix().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_forward_reference() {
        let mut mol = water_zmatrix();
        mol.atom_mut(1)
            .unwrap()
            .internal_coord_mut()
            .unwrap()
            .bond
            .as_mut()
            .unwrap()
            .target = Ref::Concrete(2);
        assert!(matches!(
            mol.validate(),
            Err(MoleculeError::InvalidReference { atom, kind: ParameterKind::Distance, .. }) if atom.index == 1
        ));
    }

    #[test]
    fn validate_distinguishes_templates_from_resolved_molecules() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(
            Element::C,
            "C1",
            InternalCoord::full(
                Link {
                    target: Ref::Placeholder(-1),
                    param: Param::Literal(0.0),
                },
                Link {
                    target: Ref::Placeholder(-2),
                    param: Param::Literal(0.0),
                },
                Link {
                    target: Ref::Placeholder(-3),
                    param: Param::Literal(0.0),
                },
            ),
        ));
        assert!(mol.validate_template().is_ok());
        assert!(matches!(
            mol.validate(),
            Err(MoleculeError::ReferenceCount {
                expected: 0,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn validate_requires_full_entries_from_the_fourth_atom() {
        let mut mol = water_zmatrix();
        mol.add_atom(Atom::internal(
            Element::H,
            "H4",
            InternalCoord::with_bond(Link::literal(0, 1.0)),
        ));
        assert!(matches!(
            mol.validate(),
            Err(MoleculeError::ReferenceCount { atom, expected: 3, found: 1 }) if atom.index == 3
        ));

        mol.atom_mut(3).unwrap().coord = AtomCoord::Internal(InternalCoord::with_angle(
            Link::literal(0, 1.0),
            Link::literal(1, 109.5),
        ));
        assert!(matches!(
            mol.validate(),
            Err(MoleculeError::ReferenceCount { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn validate_rejects_short_template_atoms() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(
            Element::C,
            "C1",
            InternalCoord::placeholder_root(),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H2",
            InternalCoord::with_bond(Link::literal(0, 1.09)),
        ));
        assert!(matches!(
            mol.validate_template(),
            Err(MoleculeError::ReferenceCount { expected: 3, found: 1, .. })
        ));
    }

    #[test]
    fn validate_rejects_metric_mismatch() {
        let mut mol = water_zmatrix();
        let r = mol.variables().id_of("ROH").unwrap();
        mol.atom_mut(2)
            .unwrap()
            .internal_coord_mut()
            .unwrap()
            .angle
            .as_mut()
            .unwrap()
            .param = Param::linked(r);
        assert!(matches!(
            mol.validate(),
            Err(MoleculeError::MetricMismatch { .. })
        ));
    }

    #[test]
    fn center_of_mass_is_mass_weighted() {
        let mol = cartesian(&[(Element::C, [0.0; 3]), (Element::H, [1.0, 0.0, 0.0])]);
        let com = mol.center_of_mass().unwrap();
        let expected = 1.008 / (12.011 + 1.008);
        assert!((com.x - expected).abs() < 1e-12);
        assert!(Molecule::new().center_of_mass().is_none());
    }

    #[test]
    fn principal_moments_of_linear_molecule_have_zero_smallest_moment() {
        let mol = cartesian(&[
            (Element::O, [-1.16, 0.0, 0.0]),
            (Element::C, [0.0; 3]),
            (Element::O, [1.16, 0.0, 0.0]),
        ]);
        let moments = mol.principal_moments();
        assert!(moments[0].abs() < 1e-9);
        assert!((moments[1] - moments[2]).abs() < 1e-9);
        assert!(moments[1] > 0.0);
    }

    #[test]
    fn connected_components_group_bonded_atoms() {
        let mut mol = cartesian(&[
            (Element::C, [0.0; 3]),
            (Element::H, [1.0, 0.0, 0.0]),
            (Element::O, [5.0, 0.0, 0.0]),
            (Element::H, [6.0, 0.0, 0.0]),
        ]);
        mol.add_bond(0, 1).unwrap();
        mol.add_bond(3, 2).unwrap();
        assert_eq!(mol.connected_components(), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn variable_usages_lists_every_linked_parameter() {
        let mol = water_zmatrix();
        let r = mol.variables().id_of("ROH").unwrap();
        assert_eq!(
            mol.variable_usages(r),
            vec![(1, ParameterKind::Distance), (2, ParameterKind::Distance)]
        );
    }

    #[test]
    fn remove_variable_refuses_while_in_use() {
        let mut mol = water_zmatrix();
        assert!(matches!(
            mol.remove_variable("ROH"),
            Err(MoleculeError::VariableInUse { users: 2, .. })
        ));
        assert_eq!(mol.variables().len(), 1);
    }

    #[test]
    fn inline_variable_replaces_links_with_literals() {
        let mut mol = water_zmatrix();
        mol.inline_variable("ROH").unwrap();
        assert!(mol.variables().is_empty());
        let bond = mol.atom(2).unwrap().internal_coord().unwrap().bond.unwrap();
        assert_eq!(bond.param, Param::Literal(0.96));
        assert!(mol.validate().is_ok());
    }

    #[test]
    fn variablize_promotes_literal_to_variable() {
        let mut mol = water_zmatrix();
        let id = mol.variablize(2, ParameterKind::Angle, "AHOH").unwrap();
        assert_eq!(mol.variables().get(id).unwrap().value, 104.5);
        assert_eq!(mol.variables().get(id).unwrap().metric, Metric::Angle);
        assert_eq!(mol.variable_usages(id), vec![(2, ParameterKind::Angle)]);
        assert!(matches!(
            mol.variablize(2, ParameterKind::Angle, "AGAIN"),
            Err(MoleculeError::AlreadyLinked { .. })
        ));
        assert!(matches!(
            mol.variablize(1, ParameterKind::Dihedral, "D"),
            Err(MoleculeError::MissingParameter { .. })
        ));
    }

    #[test]
    fn reordered_renumbers_bonds_and_references() {
        let mut mol = cartesian(&[
            (Element::H, [1.0, 0.0, 0.0]),
            (Element::C, [0.0; 3]),
            (Element::H, [-1.0, 0.0, 0.0]),
        ]);
        mol.add_bond(0, 1).unwrap();
        mol.add_bond(1, 2).unwrap();
        let reordered = mol.reordered(&[1, 0, 2]).unwrap();
        assert_eq!(reordered.atom(0).unwrap().element, Element::C);
        assert!(reordered.are_bonded(0, 1));
        assert!(reordered.are_bonded(0, 2));
        assert!(!reordered.are_bonded(1, 2));
        assert!(matches!(
            mol.reordered(&[0, 0, 1]),
            Err(MoleculeError::InvalidPermutation { len: 3 })
        ));
    }

    #[test]
    fn cartesian_snapshot_can_drop_dummies() {
        let mut mol = cartesian(&[
            (Element::C, [0.0; 3]),
            (Element::X, [0.0, 1.0, 0.0]),
            (Element::H, [1.0, 0.0, 0.0]),
        ]);
        mol.add_bond(0, 2).unwrap();
        let snapshot = mol.cartesian_snapshot(false);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.are_bonded(0, 1));
        assert_eq!(mol.cartesian_snapshot(true).len(), 3);
    }

    #[test]
    fn set_positions_checks_count() {
        let mut mol = water_zmatrix();
        assert!(matches!(
            mol.set_positions(&[Point3::origin()]),
            Err(MoleculeError::PositionCountMismatch {
                expected: 3,
                found: 1
            })
        ));
    }
}
