use super::config::AutozConfig;
use super::error::GeometryError;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::atom::{AtomCoord, InternalCoord, Link, ParameterKind};
use crate::core::models::molecule::Molecule;
use crate::core::models::variable::VariableStore;
use crate::core::utils::geometry;
use nalgebra::Point3;
use tracing::{debug, info, instrument, warn};

/// A molecule re-expressed in internal coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct AutozOutcome {
    pub molecule: Molecule,
    /// `order[k]` is the input index of the atom that became atom `k`.
    pub order: Vec<usize>,
}

/// References chosen for one atom, as input indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Assignment {
    atom: usize,
    refs: [Option<usize>; 3],
}

/// Builds a Z-matrix from the bond graph and current positions of `molecule`.
///
/// Atoms are re-sequenced: three seed atoms first, then every atom in the
/// order it obtained well-conditioned references. Parameters are measured
/// from the current positions, which are kept unchanged.
#[instrument(skip_all, name = "autoz")]
pub fn run(
    molecule: &Molecule,
    config: &AutozConfig,
    reporter: &ProgressReporter,
) -> Result<AutozOutcome, GeometryError> {
    if molecule.is_empty() {
        return Err(GeometryError::InvalidInput(
            "cannot build internal coordinates for an empty molecule".to_string(),
        ));
    }
    check_connected(molecule)?;

    let positions = molecule.positions();
    let n = molecule.len();
    reporter.report(Progress::AtomTaskStart { total: n as u64 });

    let mut assigned = vec![false; n];
    let mut assignments: Vec<Assignment> = Vec::with_capacity(n);
    let mut commit = |assignment: Assignment, assigned: &mut [bool]| {
        assigned[assignment.atom] = true;
        assignments.push(assignment);
        reporter.report(Progress::AtomDone {
            index: assignment.atom,
        });
    };

    for assignment in seed_assignments(molecule) {
        commit(assignment, &mut assigned);
    }

    let selector = ReferenceSelector {
        molecule,
        positions: &positions,
        threshold: config.angle_threshold,
    };
    let mut remaining = n - assigned.iter().filter(|&&a| a).count();
    while remaining > 0 {
        let mut progressed = false;
        for x in 0..n {
            if assigned[x] {
                continue;
            }
            let found = molecule
                .neighbors(x)
                .iter()
                .filter(|&&c| assigned[c])
                .find_map(|&c| selector.choose(x, c, &assigned));
            if let Some(refs) = found {
                commit(Assignment { atom: x, refs }, &mut assigned);
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            let unassigned: Vec<usize> = (0..n).filter(|&i| !assigned[i]).collect();
            warn!(count = unassigned.len(), "Reference assignment stalled");
            return Err(GeometryError::AutozStalled {
                unassigned: molecule.labels(&unassigned),
            });
        }
    }
    reporter.report(Progress::AtomTaskFinish);

    let outcome = build_outcome(molecule, &positions, &assignments, config)?;
    info!(atoms = n, "Internal coordinates generated");
    Ok(outcome)
}

/// Runs [`run`] and replaces `molecule` with the result on success.
pub fn apply(
    molecule: &mut Molecule,
    config: &AutozConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<usize>, GeometryError> {
    let outcome = run(molecule, config, reporter)?;
    *molecule = outcome.molecule;
    Ok(outcome.order)
}

fn check_connected(molecule: &Molecule) -> Result<(), GeometryError> {
    let components = molecule.connected_components();
    if components.len() <= 1 {
        return Ok(());
    }
    let mut largest = 0;
    for (i, component) in components.iter().enumerate() {
        if component.len() > components[largest].len() {
            largest = i;
        }
    }
    let mut outside: Vec<usize> = components
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != largest)
        .flat_map(|(_, c)| c.iter().copied())
        .collect();
    outside.sort_unstable();
    Err(GeometryError::DisconnectedGraph {
        atoms: molecule.labels(&outside),
        components: components.len(),
    })
}

/// Picks up to three seed atoms: the most connected atom nearest the centre of
/// mass, a multi-valent neighbour of it and one more atom bonded to either.
fn seed_assignments(molecule: &Molecule) -> Vec<Assignment> {
    let com = molecule.center_of_mass().unwrap_or_else(Point3::origin);
    let max_degree = (0..molecule.len())
        .map(|i| molecule.degree(i))
        .max()
        .unwrap_or(0);

    let mut s0 = 0;
    let mut best = f64::INFINITY;
    for (i, atom) in molecule.atoms().iter().enumerate() {
        if molecule.degree(i) != max_degree {
            continue;
        }
        let d = (atom.position - com).norm();
        if d < best {
            best = d;
            s0 = i;
        }
    }
    let mut seeds = vec![Assignment {
        atom: s0,
        refs: [None; 3],
    }];

    let Some(s1) = prefer_multivalent(molecule, molecule.neighbors(s0).iter().copied()) else {
        return seeds;
    };
    seeds.push(Assignment {
        atom: s1,
        refs: [Some(s0), None, None],
    });

    let from_s0 = prefer_multivalent(
        molecule,
        molecule.neighbors(s0).iter().copied().filter(|&i| i != s1),
    );
    let third = match from_s0 {
        Some(s2) => Some(Assignment {
            atom: s2,
            refs: [Some(s0), Some(s1), None],
        }),
        None => molecule
            .neighbors(s1)
            .iter()
            .copied()
            .find(|&i| i != s0)
            .map(|s2| Assignment {
                atom: s2,
                refs: [Some(s1), Some(s0), None],
            }),
    };
    seeds.extend(third);
    debug!(seeds = ?seeds.iter().map(|s| s.atom).collect::<Vec<_>>(), "Selected seed atoms");
    seeds
}

/// First candidate bonded to more than one atom, else the first candidate.
fn prefer_multivalent(molecule: &Molecule, candidates: impl Iterator<Item = usize>) -> Option<usize> {
    let candidates: Vec<usize> = candidates.collect();
    candidates
        .iter()
        .copied()
        .find(|&i| molecule.degree(i) > 1)
        .or_else(|| candidates.first().copied())
}

struct ReferenceSelector<'a> {
    molecule: &'a Molecule,
    positions: &'a [Point3<f64>],
    threshold: f64,
}

/// How far the angle `p-q-r` is from a right angle, in degrees.
pub(crate) fn right_angle_deviation(p: &Point3<f64>, q: &Point3<f64>, r: &Point3<f64>) -> f64 {
    (geometry::angle(p, q, r) - 90.0).abs()
}

/// Candidates whose deviation from 90 degrees is below `threshold`, closest
/// first. Equal deviations keep their input order.
pub(crate) fn rank_by_angle_quality(
    candidates: impl Iterator<Item = usize>,
    deviation_of: impl Fn(usize) -> f64,
    threshold: f64,
) -> Vec<usize> {
    let mut scored: Vec<(f64, usize)> = candidates
        .map(|i| (deviation_of(i), i))
        .filter(|&(dev, _)| dev < threshold)
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, i)| i).collect()
}

impl ReferenceSelector<'_> {
    fn deviation(&self, p: usize, q: usize, r: usize) -> f64 {
        right_angle_deviation(&self.positions[p], &self.positions[q], &self.positions[r])
    }

    fn ranked(
        &self,
        candidates: impl Iterator<Item = usize>,
        deviation_of: impl Fn(usize) -> f64,
    ) -> Vec<usize> {
        rank_by_angle_quality(candidates, deviation_of, self.threshold)
    }

    /// References `[C, B, A]` for atom `x` attached to the assigned atom `c`.
    fn choose(&self, x: usize, c: usize, assigned: &[bool]) -> Option<[Option<usize>; 3]> {
        let mol = self.molecule;
        let b_candidates = self.ranked(
            mol.neighbors(c)
                .iter()
                .copied()
                .filter(|&b| b != x && assigned[b]),
            |b| self.deviation(x, c, b),
        );
        for b in b_candidates {
            let proper = self.ranked(
                mol.neighbors(b)
                    .iter()
                    .copied()
                    .filter(|&a| a != c && a != x && assigned[a]),
                |a| self.deviation(c, b, a),
            );
            if let Some(&a) = proper.first() {
                return Some([Some(c), Some(b), Some(a)]);
            }
            let improper = self.ranked(
                mol.neighbors(c)
                    .iter()
                    .copied()
                    .filter(|&a| a != b && a != x && assigned[a]),
                |a| self.deviation(b, c, a),
            );
            if let Some(&a) = improper.first() {
                return Some([Some(c), Some(b), Some(a)]);
            }
        }
        None
    }
}

fn build_outcome(
    molecule: &Molecule,
    positions: &[Point3<f64>],
    assignments: &[Assignment],
    config: &AutozConfig,
) -> Result<AutozOutcome, GeometryError> {
    let order: Vec<usize> = assignments.iter().map(|a| a.atom).collect();
    let mut new_index_of = vec![0; order.len()];
    for (new, &old) in order.iter().enumerate() {
        new_index_of[old] = new;
    }

    let mut result = molecule.reordered(&order)?;
    *result.variables_mut() = VariableStore::new();

    for (k, assignment) in assignments.iter().enumerate() {
        let x = &positions[assignment.atom];
        let mut ic = InternalCoord::anchor();
        if let [Some(c), b, a] = assignment.refs {
            let mut r = geometry::distance(x, &positions[c]);
            if r < config.min_bond_length {
                warn!(
                    atom = %molecule.label(assignment.atom),
                    measured = r,
                    clamped = config.min_bond_length,
                    "Bond length clamped"
                );
                r = config.min_bond_length;
            }
            ic.bond = Some(Link::literal(new_index_of[c], r));
            if let Some(b) = b {
                let theta = geometry::angle(x, &positions[c], &positions[b]);
                ic.angle = Some(Link::literal(new_index_of[b], theta));
                if let Some(a) = a {
                    let phi = geometry::dihedral(x, &positions[c], &positions[b], &positions[a]);
                    ic.dihedral = Some(Link::literal(new_index_of[a], phi));
                }
            }
        }
        if let Some(atom) = result.atom_mut(k) {
            atom.coord = AtomCoord::Internal(ic);
        }
    }

    if config.create_variables {
        for k in 1..result.len() {
            for (kind, prefix) in [
                (ParameterKind::Distance, 'R'),
                (ParameterKind::Angle, 'A'),
                (ParameterKind::Dihedral, 'D'),
            ] {
                let present = result
                    .atom(k)
                    .and_then(|a| a.internal_coord())
                    .is_some_and(|ic| ic.link(kind).is_some());
                if present {
                    result.variablize(k, kind, &format!("{prefix}{}", k + 1))?;
                }
            }
        }
    }

    result.validate()?;
    Ok(AutozOutcome {
        molecule: result,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::engine::config::BondingParams;
    use crate::engine::connectivity::perceive_bonds;
    use crate::engine::placement::place_molecule;
    use std::sync::Mutex;

    fn bonded(points: &[(Element, [f64; 3])]) -> Molecule {
        let mut mol = Molecule::new();
        for (i, (element, p)) in points.iter().enumerate() {
            mol.add_atom(Atom::cartesian(
                *element,
                &format!("{}{}", element, i + 1),
                Point3::new(p[0], p[1], p[2]),
            ));
        }
        perceive_bonds(&mut mol, &BondingParams::default()).unwrap();
        mol
    }

    fn ethane() -> Molecule {
        let mut points = vec![(Element::C, [0.0, 0.0, 0.0]), (Element::C, [1.54, 0.0, 0.0])];
        for (x, offset) in [(-0.363, 0.0), (1.903, 60.0)] {
            for step in 0..3 {
                let t = (offset + 120.0 * step as f64).to_radians();
                points.push((Element::H, [x, 1.027 * t.cos(), 1.027 * t.sin()]));
            }
        }
        bonded(&points)
    }

    fn methane() -> Molecule {
        let d = 0.629;
        bonded(&[
            (Element::C, [0.0, 0.0, 0.0]),
            (Element::H, [d, d, d]),
            (Element::H, [-d, -d, d]),
            (Element::H, [-d, d, -d]),
            (Element::H, [d, -d, -d]),
        ])
    }

    fn assert_same_shape(original: &Molecule, order: &[usize], rebuilt: &Molecule) {
        let before = original.positions();
        let after = rebuilt.positions();
        for i in 0..order.len() {
            for j in 0..order.len() {
                let d0 = (before[order[i]] - before[order[j]]).norm();
                let d1 = (after[i] - after[j]).norm();
                assert!((d0 - d1).abs() < 1e-6, "pair ({i}, {j}): {d0} vs {d1}");
            }
        }
    }

    #[test]
    fn methane_gets_carbon_first_and_reproduces_geometry() {
        let mol = methane();
        let outcome = run(&mol, &AutozConfig::default(), &ProgressReporter::silent()).unwrap();
        assert_eq!(outcome.order[0], 0);
        assert_eq!(outcome.molecule.atom(0).unwrap().element, Element::C);

        let mut placed = outcome.molecule.clone();
        place_molecule(&mut placed).into_result().unwrap();
        assert_same_shape(&mol, &outcome.order, &placed);
    }

    #[test]
    fn ethane_uses_dihedral_references() {
        let mol = ethane();
        let outcome = run(&mol, &AutozConfig::default(), &ProgressReporter::silent()).unwrap();
        let zmat = &outcome.molecule;
        assert_eq!(zmat.len(), 8);
        for k in 3..zmat.len() {
            assert_eq!(zmat.atom(k).unwrap().internal_coord().unwrap().depth(), 3);
        }
        assert!(zmat.validate().is_ok());

        let mut placed = zmat.clone();
        place_molecule(&mut placed).into_result().unwrap();
        assert_same_shape(&mol, &outcome.order, &placed);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mol = ethane();
        let config = AutozConfig::default();
        let first = run(&mol, &config, &ProgressReporter::silent()).unwrap();
        let second = run(&mol, &config, &ProgressReporter::silent()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn linear_chain_stalls_and_names_terminal_atoms() {
        let points: Vec<_> = (0..5)
            .map(|i| (Element::C, [i as f64 * 1.3, 0.0, 0.0]))
            .collect();
        let mol = bonded(&points);
        let result = run(&mol, &AutozConfig::default(), &ProgressReporter::silent());
        match result {
            Err(GeometryError::AutozStalled { unassigned }) => {
                let indices: Vec<usize> = unassigned.iter().map(|l| l.index).collect();
                assert!(indices.contains(&0));
                assert!(indices.contains(&4));
            }
            other => panic!("expected AutozStalled, got {other:?}"),
        }
    }

    #[test]
    fn disconnected_graph_is_rejected() {
        let mol = bonded(&[
            (Element::O, [0.0, 0.0, 0.0]),
            (Element::H, [0.96, 0.0, 0.0]),
            (Element::H, [-0.24, 0.93, 0.0]),
            (Element::Ne, [8.0, 0.0, 0.0]),
        ]);
        assert!(matches!(
            run(&mol, &AutozConfig::default(), &ProgressReporter::silent()),
            Err(GeometryError::DisconnectedGraph { atoms, components: 2 })
                if atoms.len() == 1 && atoms[0].index == 3
        ));
    }

    #[test]
    fn empty_molecule_is_invalid_input() {
        assert!(matches!(
            run(&Molecule::new(), &AutozConfig::default(), &ProgressReporter::silent()),
            Err(GeometryError::InvalidInput(_))
        ));
    }

    #[test]
    fn coincident_atoms_get_clamped_bond_length() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::cartesian(Element::C, "C1", Point3::origin()));
        mol.add_atom(Atom::cartesian(Element::H, "H2", Point3::origin()));
        mol.add_bond(0, 1).unwrap();
        let outcome = run(&mol, &AutozConfig::default(), &ProgressReporter::silent()).unwrap();
        let bond = outcome.molecule.atom(1).unwrap().internal_coord().unwrap().bond.unwrap();
        assert_eq!(bond.param, crate::core::models::atom::Param::Literal(1e-3));
    }

    #[test]
    fn create_variables_links_every_parameter() {
        let mol = methane();
        let config = AutozConfig {
            create_variables: true,
            ..AutozConfig::default()
        };
        let outcome = run(&mol, &config, &ProgressReporter::silent()).unwrap();
        let vars = outcome.molecule.variables();
        assert_eq!(vars.len(), 1 + 2 + 3 + 3);
        for name in ["R2", "R3", "A3", "R4", "A4", "D4", "D5"] {
            assert!(vars.by_name(name).is_some(), "missing {name}");
        }
        assert!(vars.by_name("R1").is_none());
    }

    #[test]
    fn reports_one_step_per_atom() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|e: Progress| events.lock().unwrap().push(e)));
        let mut mol = methane();
        apply(&mut mol, &AutozConfig::default(), &reporter).unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        let done = events
            .iter()
            .filter(|e| matches!(e, Progress::AtomDone { .. }))
            .count();
        assert_eq!(done, 5);
        assert_eq!(events.first(), Some(&Progress::AtomTaskStart { total: 5 }));
        assert_eq!(events.last(), Some(&Progress::AtomTaskFinish));
        assert!(mol.atoms().iter().all(|a| a.is_internal()));
    }
}
