use super::atom::{Atom, AtomLabel, InternalCoord, Link, Param, ParameterKind, Ref};
use super::element::Element;
use super::molecule::{Molecule, MoleculeError};
use super::variable::{Metric, Variable, VariableError};
use nalgebra::Point3;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// A parameter as it appears in an external record: a finite number, or a
/// variable name optionally prefixed with `-`. Tokens such as `inf` or `nan`
/// are variable names.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    Value(f64),
    Variable { name: String, negated: bool },
}

impl FromStr for ParamSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(value) = s.parse::<f64>()
            && value.is_finite()
        {
            return Ok(Self::Value(value));
        }
        Ok(match s.strip_prefix('-') {
            Some(name) => Self::Variable {
                name: name.to_string(),
                negated: true,
            },
            None => Self::Variable {
                name: s.trim_start_matches('+').to_string(),
                negated: false,
            },
        })
    }
}

/// A reference in record form. `atom` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct RefSpec {
    pub atom: usize,
    pub param: ParamSpec,
}

impl RefSpec {
    pub fn new(atom: usize, param: ParamSpec) -> Self {
        Self { atom, param }
    }

    pub fn value(atom: usize, value: f64) -> Self {
        Self::new(atom, ParamSpec::Value(value))
    }

    pub fn variable(atom: usize, name: &str) -> Self {
        Self::new(
            atom,
            ParamSpec::Variable {
                name: name.to_string(),
                negated: false,
            },
        )
    }
}

/// One atom line of the construction boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomRecord {
    Cartesian {
        label: String,
        position: [f64; 3],
    },
    Internal {
        label: String,
        bond: Option<RefSpec>,
        angle: Option<RefSpec>,
        dihedral: Option<RefSpec>,
    },
}

impl AtomRecord {
    pub fn label(&self) -> &str {
        match self {
            Self::Cartesian { label, .. } | Self::Internal { label, .. } => label,
        }
    }

    fn specs(&self) -> Vec<(ParameterKind, &RefSpec)> {
        match self {
            Self::Cartesian { .. } => Vec::new(),
            Self::Internal {
                bond,
                angle,
                dihedral,
                ..
            } => [
                (ParameterKind::Distance, bond.as_ref()),
                (ParameterKind::Angle, angle.as_ref()),
                (ParameterKind::Dihedral, dihedral.as_ref()),
            ]
            .into_iter()
            .filter_map(|(kind, spec)| spec.map(|s| (kind, s)))
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableRecord {
    pub name: String,
    pub value: f64,
    pub is_constant: bool,
}

impl VariableRecord {
    pub fn new(name: &str, value: f64, is_constant: bool) -> Self {
        Self {
            name: name.to_string(),
            value,
            is_constant,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("Cannot determine the element of atom label '{label}' (record {})", .record + 1)]
    UnknownElement { record: usize, label: String },

    #[error("Atom {atom} refers to atom {reference} for its {kind}, which is not an earlier atom")]
    InvalidReference {
        atom: AtomLabel,
        kind: ParameterKind,
        reference: usize,
    },

    #[error("Atom {atom} uses undefined variable '{name}'")]
    UnknownVariable { atom: AtomLabel, name: String },

    #[error("Variable '{name}' is used both as a {first} and as a {second}")]
    MetricConflict {
        name: String,
        first: Metric,
        second: Metric,
    },

    #[error(transparent)]
    Variable(#[from] VariableError),

    #[error(transparent)]
    Molecule(#[from] MoleculeError),
}

impl Molecule {
    /// Builds a molecule from boundary records.
    ///
    /// Each variable takes the metric of its first use; a variable that is
    /// declared but never used is treated as a distance.
    pub fn from_records(
        atoms: &[AtomRecord],
        variables: &[VariableRecord],
    ) -> Result<Molecule, RecordError> {
        let declared: HashMap<&str, &VariableRecord> =
            variables.iter().map(|v| (v.name.as_str(), v)).collect();

        let mut metrics: HashMap<&str, Metric> = HashMap::new();
        for (index, record) in atoms.iter().enumerate() {
            for (kind, spec) in record.specs() {
                let ParamSpec::Variable { name, .. } = &spec.param else {
                    continue;
                };
                if !declared.contains_key(name.as_str()) {
                    return Err(RecordError::UnknownVariable {
                        atom: AtomLabel {
                            index,
                            name: record.label().to_string(),
                        },
                        name: name.clone(),
                    });
                }
                match metrics.get(name.as_str()) {
                    Some(&first) if first != kind.metric() => {
                        return Err(RecordError::MetricConflict {
                            name: name.clone(),
                            first,
                            second: kind.metric(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        metrics.insert(name.as_str(), kind.metric());
                    }
                }
            }
        }

        let mut molecule = Molecule::new();
        for record in variables {
            let metric = metrics
                .get(record.name.as_str())
                .copied()
                .unwrap_or(Metric::Distance);
            molecule.variables_mut().insert(Variable::new(
                &record.name,
                record.value,
                metric,
                record.is_constant,
            ))?;
        }

        for (index, record) in atoms.iter().enumerate() {
            let label = record.label();
            let element =
                Element::from_symbol(label).ok_or_else(|| RecordError::UnknownElement {
                    record: index,
                    label: label.to_string(),
                })?;
            let atom = match record {
                AtomRecord::Cartesian { position, .. } => Atom::cartesian(
                    element,
                    label,
                    Point3::new(position[0], position[1], position[2]),
                ),
                AtomRecord::Internal { .. } => {
                    let mut ic = InternalCoord::anchor();
                    for (kind, spec) in record.specs() {
                        let link = resolve_spec(&molecule, index, label, kind, spec)?;
                        match kind {
                            ParameterKind::Distance => ic.bond = Some(link),
                            ParameterKind::Angle => ic.angle = Some(link),
                            ParameterKind::Dihedral => ic.dihedral = Some(link),
                        }
                    }
                    Atom::internal(element, label, ic)
                }
            };
            molecule.add_atom(atom);
        }

        molecule.validate()?;
        Ok(molecule)
    }
}

fn resolve_spec(
    molecule: &Molecule,
    index: usize,
    label: &str,
    kind: ParameterKind,
    spec: &RefSpec,
) -> Result<Link, RecordError> {
    let atom_label = || AtomLabel {
        index,
        name: label.to_string(),
    };
    if spec.atom == 0 || spec.atom > index {
        return Err(RecordError::InvalidReference {
            atom: atom_label(),
            kind,
            reference: spec.atom,
        });
    }
    let param = match &spec.param {
        ParamSpec::Value(value) => Param::Literal(*value),
        ParamSpec::Variable { name, negated } => {
            let id = molecule.variables().id_of(name).ok_or_else(|| {
                RecordError::UnknownVariable {
                    atom: atom_label(),
                    name: name.clone(),
                }
            })?;
            Param::Linked {
                id,
                negated: *negated,
            }
        }
    };
    Ok(Link {
        target: Ref::Concrete(spec.atom - 1),
        param,
    })
}
