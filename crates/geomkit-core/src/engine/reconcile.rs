use super::config::ReconcileConfig;
use super::error::GeometryError;
use super::placement::{measure_parameter, place_molecule, resolve_internal_position, UnresolvedAtom};
use crate::core::models::atom::{AtomCoord, Param, ParameterKind};
use crate::core::models::ids::VariableId;
use crate::core::models::molecule::{CoordinateMode, Molecule};
use crate::core::utils::geometry::{self, nearest_periodic_image, periodic_difference};
use nalgebra::Point3;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconcileReport {
    /// Free variables whose values were taken from the new geometry, in first-use order.
    pub updated_variables: Vec<String>,
    /// Constants (literal or constant variables) replaced by measured values.
    pub overwritten_constants: usize,
    /// RMSD between the recomputed positions and the incoming ones, in Angstroms.
    pub rmsd: f64,
}

/// A measured value already assigned to a shared variable during this pass.
struct SharedValue {
    value: f64,
    periodic: bool,
}

/// Folds a new Cartesian geometry back into the parametrization of `molecule`.
///
/// `incoming` lists one position per atom, or one per non-dummy atom when the
/// dummies were dropped by whatever produced it. Every internal parameter is
/// measured against its existing references; free variables take the measured
/// value, constants must match it unless `allow_constant_update` is set, and a
/// variable shared by several parameters must measure the same everywhere.
/// Positions are then recomputed from the parameters. Nothing is modified on
/// failure.
#[instrument(skip_all, name = "reconcile")]
pub fn run(
    molecule: &mut Molecule,
    incoming: &[Point3<f64>],
    config: &ReconcileConfig,
) -> Result<ReconcileReport, GeometryError> {
    match molecule.mode() {
        CoordinateMode::Mixed => {
            return Err(GeometryError::UnsupportedConfiguration(
                "cannot reconcile a molecule that mixes Cartesian and internal atoms".to_string(),
            ));
        }
        CoordinateMode::Empty if incoming.is_empty() => return Ok(ReconcileReport::default()),
        _ => {}
    }
    let slots = incoming_slots(molecule, incoming.len())?;

    if molecule.mode() == CoordinateMode::Cartesian {
        let mut positions = molecule.positions();
        for (index, slot) in slots.iter().enumerate() {
            if let Some(k) = slot {
                positions[index] = incoming[*k];
            }
        }
        molecule.set_positions(&positions)?;
        info!(atoms = incoming.len(), "Replaced Cartesian positions");
        return Ok(ReconcileReport::default());
    }

    let measured_positions = derive_missing_positions(molecule, incoming, &slots)?;
    let mut working = molecule.clone();
    let mut report = ReconcileReport::default();
    let mut shared: HashMap<VariableId, SharedValue> = HashMap::new();

    for index in 0..working.len() {
        let Some(ic) = working.atom(index).and_then(|a| a.internal_coord()).copied() else {
            continue;
        };
        for (kind, link) in ic.links() {
            let tolerance = config.tolerance_for(kind.metric());
            let previous = link.param.resolve(working.variables()).ok_or_else(|| {
                GeometryError::InvalidInput(format!(
                    "the {kind} of atom {} is linked to a missing variable",
                    working.label(index)
                ))
            })?;
            let raw = measure_parameter(index, &ic, kind, &measured_positions).ok_or_else(|| {
                GeometryError::UnknownReference(format!(
                    "the {kind} of atom {} does not reference concrete atoms",
                    working.label(index)
                ))
            })?;
            let measured = if kind.is_periodic() {
                nearest_periodic_image(raw, previous)
            } else {
                raw
            };

            match link.param {
                Param::Literal(value) => {
                    if (measured - value).abs() <= tolerance {
                        continue;
                    }
                    if !config.allow_constant_update {
                        return Err(violation(&working, index, kind, None, value, measured));
                    }
                    if let Some(link) = working
                        .atom_mut(index)
                        .and_then(|a| a.internal_coord_mut())
                        .and_then(|ic| ic.link_mut(kind))
                    {
                        link.param = Param::Literal(measured);
                    }
                    report.overwritten_constants += 1;
                }
                Param::Linked { id, negated } => {
                    let signed = if negated { -measured } else { measured };
                    let Some(variable) = working.variables().get(id) else {
                        continue;
                    };
                    let name = variable.name.clone();
                    let is_constant = variable.is_constant;
                    let current = variable.value;

                    if let Some(seen) = shared.get(&id) {
                        let diff = if seen.periodic {
                            periodic_difference(signed, seen.value)
                        } else {
                            signed - seen.value
                        };
                        if diff.abs() > tolerance {
                            return Err(violation(
                                &working,
                                index,
                                kind,
                                Some(name),
                                apply_sign(seen.value, negated),
                                measured,
                            ));
                        }
                        continue;
                    }

                    if is_constant {
                        if (signed - current).abs() <= tolerance {
                            shared.insert(
                                id,
                                SharedValue {
                                    value: current,
                                    periodic: kind.is_periodic(),
                                },
                            );
                            continue;
                        }
                        if !config.allow_constant_update {
                            return Err(violation(
                                &working,
                                index,
                                kind,
                                Some(name),
                                apply_sign(current, negated),
                                measured,
                            ));
                        }
                        report.overwritten_constants += 1;
                    } else {
                        report.updated_variables.push(name);
                    }
                    if let Some(variable) = working.variables_mut().get_mut(id) {
                        variable.value = signed;
                    }
                    shared.insert(
                        id,
                        SharedValue {
                            value: signed,
                            periodic: kind.is_periodic(),
                        },
                    );
                }
            }
        }
    }

    place_molecule(&mut working).into_result()?;

    let mut positions = working.positions();
    let (placed, target): (Vec<Point3<f64>>, Vec<Point3<f64>>) = slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.map(|k| (positions[index], incoming[k])))
        .unzip();
    let mut recomputed = placed.clone();
    if config.align_to_input
        && let Some((rotation, translation)) = geometry::superposition_transform(&placed, &target)
    {
        for p in positions.iter_mut() {
            *p = rotation * *p + translation;
        }
        for p in recomputed.iter_mut() {
            *p = rotation * *p + translation;
        }
        working.set_positions(&positions)?;
    }
    report.rmsd = geometry::calculate_rmsd(&recomputed, &target).unwrap_or(0.0);

    *molecule = working;
    info!(
        updated = report.updated_variables.len(),
        overwritten = report.overwritten_constants,
        rmsd = report.rmsd,
        "Geometry reconciled"
    );
    Ok(report)
}

fn apply_sign(value: f64, negated: bool) -> f64 {
    if negated { -value } else { value }
}

fn violation(
    molecule: &Molecule,
    index: usize,
    kind: ParameterKind,
    variable: Option<String>,
    expected: f64,
    measured: f64,
) -> GeometryError {
    GeometryError::ConstraintViolation {
        atom: molecule.label(index),
        parameter: kind,
        variable,
        expected,
        measured,
    }
}

/// Maps each atom to its entry in the incoming geometry. Dummy atoms map to
/// `None` when the incoming geometry has one entry per non-dummy atom.
fn incoming_slots(molecule: &Molecule, count: usize) -> Result<Vec<Option<usize>>, GeometryError> {
    if count == molecule.len() {
        return Ok((0..count).map(Some).collect());
    }
    let real = molecule.atoms().iter().filter(|a| !a.is_dummy()).count();
    if count != real {
        return Err(GeometryError::InvalidInput(format!(
            "incoming geometry has {count} atoms, expected {} (or {real} without dummies)",
            molecule.len()
        )));
    }
    let mut next = 0;
    Ok(molecule
        .atoms()
        .iter()
        .map(|atom| {
            if atom.is_dummy() {
                None
            } else {
                next += 1;
                Some(next - 1)
            }
        })
        .collect())
}

/// Incoming positions for every atom, with omitted dummies re-derived from
/// their stored parameters against the new positions of their references.
fn derive_missing_positions(
    molecule: &Molecule,
    incoming: &[Point3<f64>],
    slots: &[Option<usize>],
) -> Result<Vec<Point3<f64>>, GeometryError> {
    let mut positions = molecule.positions();
    let mut resolved = vec![false; molecule.len()];
    let mut unresolved = Vec::new();
    for (index, slot) in slots.iter().enumerate() {
        if let Some(k) = slot {
            positions[index] = incoming[*k];
            resolved[index] = true;
            continue;
        }
        let Some(atom) = molecule.atom(index) else {
            continue;
        };
        let AtomCoord::Internal(ic) = &atom.coord else {
            resolved[index] = true;
            continue;
        };
        match resolve_internal_position(index, ic, &positions, &resolved, molecule.variables()) {
            Ok(position) => {
                positions[index] = position;
                resolved[index] = true;
                debug!(atom = %molecule.label(index), "Re-derived omitted dummy atom");
            }
            Err(reason) => unresolved.push(UnresolvedAtom {
                atom: molecule.label(index),
                reason,
            }),
        }
    }
    if unresolved.is_empty() {
        Ok(positions)
    } else {
        Err(GeometryError::UnresolvedGeometry(unresolved))
    }
}
