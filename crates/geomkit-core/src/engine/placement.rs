use super::error::GeometryError;
use crate::core::models::atom::{AtomCoord, AtomLabel, InternalCoord, Link, ParameterKind};
use crate::core::models::molecule::Molecule;
use crate::core::models::variable::VariableStore;
use crate::core::utils::geometry::{self, DEGENERACY_EPSILON};
use nalgebra::{Point3, Vector3};
use std::fmt;
use tracing::{debug, instrument};

/// Why an atom's position could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    /// The reference is still a template placeholder.
    PlaceholderReference { kind: ParameterKind },
    /// The reference does not name an earlier atom.
    InvalidReference { kind: ParameterKind, target: usize },
    /// The referenced atom could not be placed itself.
    UnresolvedReference { kind: ParameterKind, target: usize },
    /// The parameter is linked to a variable that no longer exists.
    UnknownVariable { kind: ParameterKind },
    /// The reference atoms coincide or are collinear.
    DegenerateReferences,
    /// An angle or dihedral without the preceding reference.
    Malformed,
    /// Fewer references than the atom's position in the sequence requires.
    MissingReferences { expected: usize, found: usize },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceholderReference { kind } => {
                write!(f, "{kind} reference is an unbound placeholder")
            }
            Self::InvalidReference { kind, target } => {
                write!(f, "{kind} reference to atom {} is not an earlier atom", target + 1)
            }
            Self::UnresolvedReference { kind, target } => {
                write!(f, "{kind} reference atom {} is unresolved", target + 1)
            }
            Self::UnknownVariable { kind } => write!(f, "{kind} is linked to a missing variable"),
            Self::DegenerateReferences => f.write_str("reference atoms are coincident or collinear"),
            Self::Malformed => f.write_str("malformed internal coordinate"),
            Self::MissingReferences { expected, found } => {
                write!(f, "needs {expected} reference atom(s) but has {found}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedAtom {
    pub atom: AtomLabel,
    pub reason: UnresolvedReason,
}

impl fmt::Display for UnresolvedAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.atom, self.reason)
    }
}

/// Outcome of a whole-molecule placement pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementReport {
    /// Number of internal-mode atoms whose positions were computed.
    pub placed: usize,
    pub unresolved: Vec<UnresolvedAtom>,
}

impl PlacementReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn into_result(self) -> Result<usize, GeometryError> {
        if self.unresolved.is_empty() {
            Ok(self.placed)
        } else {
            Err(GeometryError::UnresolvedGeometry(self.unresolved))
        }
    }
}

/// Recomputes the positions of all internal-mode atoms in sequence order.
///
/// Cartesian atoms are fixed anchors. The internal atom at position `k` must
/// carry `min(k, 3)` references: the first keeps its current position, the
/// second is put on the +z axis of its bond partner and the third in the plane
/// containing the +x direction. Failures are collected for the whole molecule;
/// unresolved atoms keep their previous positions.
#[instrument(skip_all, name = "place_molecule")]
pub fn place_molecule(molecule: &mut Molecule) -> PlacementReport {
    let mut positions = molecule.positions();
    let mut resolved = vec![false; molecule.len()];
    let mut report = PlacementReport::default();

    for index in 0..molecule.len() {
        let Some(atom) = molecule.atom(index) else {
            break;
        };
        match &atom.coord {
            AtomCoord::Cartesian => resolved[index] = true,
            AtomCoord::Internal(ic) => {
                match resolve_internal_position(
                    index,
                    ic,
                    &positions,
                    &resolved,
                    molecule.variables(),
                ) {
                    Ok(position) => {
                        positions[index] = position;
                        resolved[index] = true;
                        report.placed += 1;
                    }
                    Err(reason) => {
                        debug!(atom = %molecule.label(index), %reason, "Atom left unresolved");
                        report.unresolved.push(UnresolvedAtom {
                            atom: molecule.label(index),
                            reason,
                        });
                    }
                }
            }
        }
    }

    for (index, position) in positions.into_iter().enumerate() {
        if resolved[index]
            && let Some(atom) = molecule.atom_mut(index)
        {
            atom.position = position;
        }
    }

    debug!(
        placed = report.placed,
        unresolved = report.unresolved.len(),
        "Placement pass finished"
    );
    report
}

/// Computes one atom's position from its Z-matrix entry against already
/// resolved positions.
pub fn resolve_internal_position(
    index: usize,
    ic: &InternalCoord,
    positions: &[Point3<f64>],
    resolved: &[bool],
    variables: &VariableStore,
) -> Result<Point3<f64>, UnresolvedReason> {
    if !ic.is_well_formed() {
        return Err(UnresolvedReason::Malformed);
    }
    let expected = InternalCoord::required_depth(index);
    if ic.depth() < expected {
        return Err(UnresolvedReason::MissingReferences {
            expected,
            found: ic.depth(),
        });
    }
    let fetch = |kind: ParameterKind, link: &Link| -> Result<(Point3<f64>, f64), UnresolvedReason> {
        let target = link
            .target
            .concrete()
            .ok_or(UnresolvedReason::PlaceholderReference { kind })?;
        if target >= index || target >= positions.len() {
            return Err(UnresolvedReason::InvalidReference { kind, target });
        }
        if !resolved.get(target).copied().unwrap_or(false) {
            return Err(UnresolvedReason::UnresolvedReference { kind, target });
        }
        let value = link
            .param
            .resolve(variables)
            .ok_or(UnresolvedReason::UnknownVariable { kind })?;
        Ok((positions[target], value))
    };

    match (&ic.bond, &ic.angle, &ic.dihedral) {
        (None, _, _) => Ok(positions.get(index).copied().unwrap_or_else(Point3::origin)),
        (Some(bond), None, _) => {
            let (c, r) = fetch(ParameterKind::Distance, bond)?;
            Ok(c + Vector3::z() * r)
        }
        (Some(bond), Some(angle), None) => {
            let (c, r) = fetch(ParameterKind::Distance, bond)?;
            let (b, theta) = fetch(ParameterKind::Angle, angle)?;
            let axis = c - b;
            if axis.norm() < DEGENERACY_EPSILON {
                return Err(UnresolvedReason::DegenerateReferences);
            }
            let helper = if axis.cross(&Vector3::x()).norm() < DEGENERACY_EPSILON * axis.norm() {
                b + Vector3::y()
            } else {
                b + Vector3::x()
            };
            geometry::place(&helper, &b, &c, r, theta, 0.0)
                .ok_or(UnresolvedReason::DegenerateReferences)
        }
        (Some(bond), Some(angle), Some(dihedral)) => {
            let (c, r) = fetch(ParameterKind::Distance, bond)?;
            let (b, theta) = fetch(ParameterKind::Angle, angle)?;
            let (a, phi) = fetch(ParameterKind::Dihedral, dihedral)?;
            geometry::place(&a, &b, &c, r, theta, phi).ok_or(UnresolvedReason::DegenerateReferences)
        }
    }
}

/// Measures one parameter of a Z-matrix entry against the given positions.
///
/// Returns `None` if the entry lacks the parameter or a reference is not a
/// concrete atom within `positions`.
pub fn measure_parameter(
    index: usize,
    ic: &InternalCoord,
    kind: ParameterKind,
    positions: &[Point3<f64>],
) -> Option<f64> {
    ic.link(kind)?;
    let point = |slot: usize| -> Option<Point3<f64>> {
        let target = ic.refs()[slot]?.concrete()?;
        positions.get(target).copied()
    };
    let x = positions.get(index)?;
    match kind {
        ParameterKind::Distance => Some(geometry::distance(x, &point(0)?)),
        ParameterKind::Angle => Some(geometry::angle(x, &point(0)?, &point(1)?)),
        ParameterKind::Dihedral => Some(geometry::dihedral(
            x,
            &point(0)?,
            &point(1)?,
            &point(2)?,
        )),
    }
}

/// Sets a variable and re-places the molecule.
///
/// The change is applied to a copy first and committed only if every atom can
/// still be placed.
#[instrument(skip_all, name = "set_variable_value", fields(variable = name))]
pub fn set_variable_value(
    molecule: &mut Molecule,
    name: &str,
    value: f64,
) -> Result<usize, GeometryError> {
    let mut working = molecule.clone();
    working
        .variables_mut()
        .set_value(name, value)
        .map_err(|e| GeometryError::InvalidInput(e.to_string()))?;
    let placed = place_molecule(&mut working).into_result()?;
    *molecule = working;
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, Param, Ref};
    use crate::core::models::element::Element;
    use crate::core::models::variable::{Metric, Variable};
    use crate::core::utils::geometry::{angle, dihedral, distance, periodic_difference};

    fn water() -> Molecule {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(Element::O, "O1", InternalCoord::anchor()));
        mol.add_atom(Atom::internal(
            Element::H,
            "H2",
            InternalCoord::with_bond(Link::literal(0, 0.96)),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H3",
            InternalCoord::with_angle(Link::literal(0, 0.96), Link::literal(1, 104.5)),
        ));
        mol
    }

    fn butane_like() -> Molecule {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(Element::C, "C1", InternalCoord::anchor()));
        mol.add_atom(Atom::internal(
            Element::C,
            "C2",
            InternalCoord::with_bond(Link::literal(0, 1.54)),
        ));
        mol.add_atom(Atom::internal(
            Element::C,
            "C3",
            InternalCoord::with_angle(Link::literal(1, 1.53), Link::literal(0, 111.0)),
        ));
        mol.add_atom(Atom::internal(
            Element::C,
            "C4",
            InternalCoord::full(
                Link::literal(2, 1.52),
                Link::literal(1, 112.0),
                Link::literal(0, 63.0),
            ),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H5",
            InternalCoord::full(
                Link::literal(3, 1.09),
                Link::literal(2, 109.5),
                Link::literal(1, -175.0),
            ),
        ));
        mol.add_atom(Atom::internal(
            Element::O,
            "O6",
            InternalCoord::full(
                Link::literal(0, 1.43),
                Link::literal(1, 108.0),
                Link::literal(3, -100.0),
            ),
        ));
        mol
    }

    #[test]
    fn water_scenario_places_atoms_at_requested_geometry() {
        let mut mol = water();
        let report = place_molecule(&mut mol);
        assert!(report.is_complete());
        assert_eq!(report.placed, 3);

        let p = mol.positions();
        assert!((distance(&p[0], &p[1]) - 0.96).abs() < 1e-6);
        assert!((distance(&p[0], &p[2]) - 0.96).abs() < 1e-6);
        assert!((angle(&p[1], &p[0], &p[2]) - 104.5).abs() < 1e-6);
        assert_eq!(p[0], Point3::origin());
    }

    #[test]
    fn place_then_measure_reproduces_parameters() {
        let mut mol = butane_like();
        place_molecule(&mut mol).into_result().unwrap();
        let positions = mol.positions();

        for (index, atom) in mol.atoms().iter().enumerate() {
            let ic = atom.internal_coord().unwrap();
            for (kind, link) in ic.links() {
                let expected = link.param.resolve(mol.variables()).unwrap();
                let measured = measure_parameter(index, ic, kind, &positions).unwrap();
                let diff = if kind.is_periodic() {
                    periodic_difference(measured, expected)
                } else {
                    measured - expected
                };
                assert!(
                    diff.abs() < 1e-6,
                    "atom {index} {kind}: expected {expected}, measured {measured}"
                );
            }
        }
    }

    #[test]
    fn failures_are_collected_for_the_whole_molecule() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(Element::C, "C1", InternalCoord::anchor()));
        mol.add_atom(Atom::internal(
            Element::C,
            "C2",
            InternalCoord::with_bond(Link::literal(0, 1.2)),
        ));
        mol.add_atom(Atom::internal(
            Element::C,
            "C3",
            InternalCoord::with_angle(Link::literal(1, 1.2), Link::literal(0, 180.0)),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H4",
            InternalCoord::full(
                Link::literal(2, 1.0),
                Link::literal(1, 120.0),
                Link::literal(0, 0.0),
            ),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H5",
            InternalCoord::full(
                Link::literal(3, 1.0),
                Link::literal(2, 109.5),
                Link::literal(1, 60.0),
            ),
        ));

        let report = place_molecule(&mut mol);
        assert_eq!(report.placed, 3);
        assert_eq!(report.unresolved.len(), 2);
        assert_eq!(report.unresolved[0].atom.index, 3);
        assert_eq!(
            report.unresolved[0].reason,
            UnresolvedReason::DegenerateReferences
        );
        assert_eq!(
            report.unresolved[1].reason,
            UnresolvedReason::UnresolvedReference {
                kind: ParameterKind::Distance,
                target: 3
            }
        );
        assert!(matches!(
            report.into_result(),
            Err(GeometryError::UnresolvedGeometry(atoms)) if atoms.len() == 2
        ));
    }

    #[test]
    fn placeholder_and_forward_references_are_unresolved() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(Element::C, "C1", InternalCoord::anchor()));
        mol.add_atom(Atom::internal(
            Element::H,
            "H2",
            InternalCoord::with_bond(Link {
                target: Ref::Placeholder(-1),
                param: Param::Literal(1.0),
            }),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H3",
            InternalCoord::with_angle(Link::literal(2, 1.0), Link::literal(0, 109.5)),
        ));
        let report = place_molecule(&mut mol);
        assert_eq!(
            report.unresolved[0].reason,
            UnresolvedReason::PlaceholderReference {
                kind: ParameterKind::Distance
            }
        );
        assert_eq!(
            report.unresolved[1].reason,
            UnresolvedReason::InvalidReference {
                kind: ParameterKind::Distance,
                target: 2
            }
        );
    }

    #[test]
    fn cartesian_atoms_anchor_internal_ones() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::cartesian(
            Element::C,
            "C1",
            Point3::new(1.0, 2.0, 3.0),
        ));
        mol.add_atom(Atom::cartesian(
            Element::O,
            "O2",
            Point3::new(1.0, 2.0, 4.2),
        ));
        mol.add_atom(Atom::cartesian(
            Element::H,
            "H3",
            Point3::new(2.0, 2.0, 3.0),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H4",
            InternalCoord::full(
                Link::literal(0, 1.09),
                Link::literal(1, 109.5),
                Link::literal(2, 120.0),
            ),
        ));
        let report = place_molecule(&mut mol);
        assert_eq!(report.placed, 1);
        let p = mol.positions();
        assert_eq!(p[0], Point3::new(1.0, 2.0, 3.0));
        assert!((distance(&p[3], &p[0]) - 1.09).abs() < 1e-6);
        assert!((angle(&p[3], &p[0], &p[1]) - 109.5).abs() < 1e-6);
        assert!((dihedral(&p[3], &p[0], &p[1], &p[2]) - 120.0).abs() < 1e-6);
    }

    #[test]
    fn set_variable_value_moves_every_linked_atom() {
        let mut mol = water();
        let id = mol
            .variables_mut()
            .insert(Variable::new("ROH", 0.96, Metric::Distance, false))
            .unwrap();
        for index in [1, 2] {
            mol.atom_mut(index)
                .unwrap()
                .internal_coord_mut()
                .unwrap()
                .bond
                .as_mut()
                .unwrap()
                .param = Param::linked(id);
        }
        set_variable_value(&mut mol, "ROH", 1.0).unwrap();
        let p = mol.positions();
        assert!((distance(&p[0], &p[1]) - 1.0).abs() < 1e-9);
        assert!((distance(&p[0], &p[2]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn set_variable_value_leaves_molecule_unchanged_on_failure() {
        let mut mol = butane_like();
        let id = mol
            .variables_mut()
            .insert(Variable::new("A3", 111.0, Metric::Angle, false))
            .unwrap();
        mol.atom_mut(2)
            .unwrap()
            .internal_coord_mut()
            .unwrap()
            .angle
            .as_mut()
            .unwrap()
            .param = Param::linked(id);
        place_molecule(&mut mol).into_result().unwrap();
        let before = mol.clone();

        let result = set_variable_value(&mut mol, "A3", 180.0);
        assert!(matches!(result, Err(GeometryError::UnresolvedGeometry(_))));
        assert_eq!(mol, before);

        assert!(matches!(
            set_variable_value(&mut mol, "NOPE", 1.0),
            Err(GeometryError::InvalidInput(_))
        ));
    }
}
