use super::element::Element;
use super::ids::VariableId;
use super::variable::{Metric, VariableStore};
use nalgebra::Point3;
use std::fmt;

/// Which of the three internal-coordinate parameters a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterKind {
    Distance,
    Angle,
    Dihedral,
}

impl ParameterKind {
    pub fn metric(self) -> Metric {
        match self {
            Self::Distance => Metric::Distance,
            Self::Angle | Self::Dihedral => Metric::Angle,
        }
    }

    /// Dihedrals live on a circle; their values are only meaningful modulo 360 degrees.
    pub fn is_periodic(self) -> bool {
        matches!(self, Self::Dihedral)
    }

    /// The 0-based reference slot (`ref1`, `ref2`, `ref3`) this parameter is measured against.
    pub fn slot(self) -> usize {
        match self {
            Self::Distance => 0,
            Self::Angle => 1,
            Self::Dihedral => 2,
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distance => f.write_str("distance"),
            Self::Angle => f.write_str("angle"),
            Self::Dihedral => f.write_str("dihedral"),
        }
    }
}

/// A parameter value: either a literal or a signed link to a shared variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Literal(f64),
    Linked { id: VariableId, negated: bool },
}

impl Param {
    pub fn linked(id: VariableId) -> Self {
        Self::Linked { id, negated: false }
    }

    /// Current numerical value, or `None` when the linked variable no longer exists.
    pub fn resolve(&self, variables: &VariableStore) -> Option<f64> {
        match *self {
            Self::Literal(value) => Some(value),
            Self::Linked { id, negated } => variables
                .get(id)
                .map(|v| if negated { -v.value } else { v.value }),
        }
    }

    pub fn variable(&self) -> Option<VariableId> {
        match *self {
            Self::Literal(_) => None,
            Self::Linked { id, .. } => Some(id),
        }
    }
}

/// A reference to another atom.
///
/// `Placeholder` references only occur in fragment templates, where they stand
/// for atoms of the host molecule that are bound at graft time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
    Concrete(usize),
    Placeholder(i8),
}

impl Ref {
    pub fn concrete(self) -> Option<usize> {
        match self {
            Self::Concrete(index) => Some(index),
            Self::Placeholder(_) => None,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(index) => write!(f, "atom {}", index + 1),
            Self::Placeholder(slot) => write!(f, "placeholder {}", slot),
        }
    }
}

/// One internal-coordinate term: the reference atom and the parameter measured against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub target: Ref,
    pub param: Param,
}

impl Link {
    pub fn new(target: usize, param: Param) -> Self {
        Self {
            target: Ref::Concrete(target),
            param,
        }
    }

    pub fn literal(target: usize, value: f64) -> Self {
        Self::new(target, Param::Literal(value))
    }
}

/// Z-matrix entry of an internal-mode atom.
///
/// `bond` pairs `ref1` with the distance, `angle` pairs `ref2` with the bond
/// angle and `dihedral` pairs `ref3` with the torsion. A well-formed entry never
/// has an angle without a bond or a dihedral without an angle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InternalCoord {
    pub bond: Option<Link>,
    pub angle: Option<Link>,
    pub dihedral: Option<Link>,
}

impl InternalCoord {
    /// Entry of the first atom of a Z-matrix, which has no references.
    pub fn anchor() -> Self {
        Self::default()
    }

    pub fn with_bond(bond: Link) -> Self {
        Self {
            bond: Some(bond),
            ..Self::default()
        }
    }

    pub fn with_angle(bond: Link, angle: Link) -> Self {
        Self {
            bond: Some(bond),
            angle: Some(angle),
            dihedral: None,
        }
    }

    pub fn full(bond: Link, angle: Link, dihedral: Link) -> Self {
        Self {
            bond: Some(bond),
            angle: Some(angle),
            dihedral: Some(dihedral),
        }
    }

    /// Entry of a fragment template root: links to the placeholders -1, -2
    /// and -3 with zero-valued parameters, filled in at graft time.
    pub fn placeholder_root() -> Self {
        let link = |slot: i8| Link {
            target: Ref::Placeholder(slot),
            param: Param::Literal(0.0),
        };
        Self::full(link(-1), link(-2), link(-3))
    }

    pub fn link(&self, kind: ParameterKind) -> Option<&Link> {
        match kind {
            ParameterKind::Distance => self.bond.as_ref(),
            ParameterKind::Angle => self.angle.as_ref(),
            ParameterKind::Dihedral => self.dihedral.as_ref(),
        }
    }

    pub fn link_mut(&mut self, kind: ParameterKind) -> Option<&mut Link> {
        match kind {
            ParameterKind::Distance => self.bond.as_mut(),
            ParameterKind::Angle => self.angle.as_mut(),
            ParameterKind::Dihedral => self.dihedral.as_mut(),
        }
    }

    /// Present links in reference order.
    pub fn links(&self) -> impl Iterator<Item = (ParameterKind, &Link)> {
        [
            (ParameterKind::Distance, self.bond.as_ref()),
            (ParameterKind::Angle, self.angle.as_ref()),
            (ParameterKind::Dihedral, self.dihedral.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, link)| link.map(|l| (kind, l)))
    }

    pub fn links_mut(&mut self) -> impl Iterator<Item = (ParameterKind, &mut Link)> {
        [
            (ParameterKind::Distance, self.bond.as_mut()),
            (ParameterKind::Angle, self.angle.as_mut()),
            (ParameterKind::Dihedral, self.dihedral.as_mut()),
        ]
        .into_iter()
        .filter_map(|(kind, link)| link.map(|l| (kind, l)))
    }

    /// Reference targets as `[ref1, ref2, ref3]`.
    pub fn refs(&self) -> [Option<Ref>; 3] {
        [
            self.bond.map(|l| l.target),
            self.angle.map(|l| l.target),
            self.dihedral.map(|l| l.target),
        ]
    }

    pub fn depth(&self) -> usize {
        self.links().count()
    }

    /// Number of references an entry at sequence position `index` must carry.
    pub fn required_depth(index: usize) -> usize {
        index.min(3)
    }

    pub fn is_well_formed(&self) -> bool {
        let angle_ok = self.angle.is_none() || self.bond.is_some();
        let dihedral_ok = self.dihedral.is_none() || self.angle.is_some();
        angle_ok && dihedral_ok
    }
}

/// How an atom's position is defined.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomCoord {
    /// The stored position is authoritative.
    Cartesian,
    /// The stored position is derived from the Z-matrix entry.
    Internal(InternalCoord),
}

/// An atom of a [`Molecule`](super::molecule::Molecule).
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    /// Label as given by the user (e.g. `C1`, `H12`).
    pub name: String,
    /// Current Cartesian position in Angstroms.
    pub position: Point3<f64>,
    pub coord: AtomCoord,
}

impl Atom {
    pub fn cartesian(element: Element, name: &str, position: Point3<f64>) -> Self {
        Self {
            element,
            name: name.to_string(),
            position,
            coord: AtomCoord::Cartesian,
        }
    }

    /// Creates an internal-mode atom; its position stays at the origin until placed.
    pub fn internal(element: Element, name: &str, coord: InternalCoord) -> Self {
        Self {
            element,
            name: name.to_string(),
            position: Point3::origin(),
            coord: AtomCoord::Internal(coord),
        }
    }

    pub fn internal_coord(&self) -> Option<&InternalCoord> {
        match &self.coord {
            AtomCoord::Internal(ic) => Some(ic),
            AtomCoord::Cartesian => None,
        }
    }

    pub fn internal_coord_mut(&mut self) -> Option<&mut InternalCoord> {
        match &mut self.coord {
            AtomCoord::Internal(ic) => Some(ic),
            AtomCoord::Cartesian => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.coord, AtomCoord::Internal(_))
    }

    pub fn is_dummy(&self) -> bool {
        self.element.is_dummy()
    }
}

/// Identifies an atom in diagnostics. Displays with a 1-based index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomLabel {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for AtomLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.index + 1)
    }
}
