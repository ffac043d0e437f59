use crate::core::models::molecule::{CoordinateMode, Molecule};
use crate::engine::autoz::{self, AutozOutcome};
use crate::engine::config::GeometryConfig;
use crate::engine::connectivity::perceive_bonds;
use crate::engine::error::GeometryError;
use crate::engine::placement::place_molecule;
use crate::engine::progress::ProgressReporter;
use tracing::{debug, info, instrument};

/// Computes every position and returns an all-Cartesian copy with bonds
/// perceived from the placed geometry.
#[instrument(skip_all, name = "to_cartesian_workflow")]
pub fn to_cartesian(
    molecule: &Molecule,
    include_dummies: bool,
    config: &GeometryConfig,
    reporter: &ProgressReporter,
) -> Result<Molecule, GeometryError> {
    let mut working = molecule.clone();

    let placed = reporter.phase("Placement", || place_molecule(&mut working).into_result())?;
    let bonds = reporter.phase("Bond perception", || {
        perceive_bonds(&mut working, &config.bonding)
    })?;

    info!(placed, bonds, "Converted to Cartesian coordinates");
    Ok(working.cartesian_snapshot(include_dummies))
}

/// Generates a Z-matrix for `molecule`. Internal-mode atoms are placed first,
/// dummy atoms are dropped once placed, and bonds are perceived when the
/// molecule has none. The outcome's `order` refers to input indices.
#[instrument(skip_all, name = "to_zmatrix_workflow")]
pub fn to_zmatrix(
    molecule: &Molecule,
    config: &GeometryConfig,
    reporter: &ProgressReporter,
) -> Result<AutozOutcome, GeometryError> {
    let mut working = molecule.clone();
    if matches!(
        working.mode(),
        CoordinateMode::Internal | CoordinateMode::Mixed
    ) {
        reporter.phase("Placement", || place_molecule(&mut working).into_result())?;
    }

    let kept: Vec<usize> = working
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, atom)| !atom.is_dummy())
        .map(|(i, _)| i)
        .collect();
    if kept.len() < working.len() {
        debug!(
            dropped = working.len() - kept.len(),
            "Dropping dummy atoms before reference assignment"
        );
        working = working.cartesian_snapshot(false);
    }

    if working.bonds().is_empty() {
        reporter.phase("Bond perception", || {
            perceive_bonds(&mut working, &config.bonding)
        })?;
    }
    let mut outcome = reporter.phase("Reference assignment", || {
        autoz::run(&working, &config.autoz, reporter)
    })?;
    outcome.order = outcome.order.iter().map(|&k| kept[k]).collect();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, InternalCoord, Link};
    use crate::core::models::element::Element;
    use crate::core::utils::geometry::{angle, distance};
    use crate::engine::placement::UnresolvedReason;
    use crate::engine::progress::Progress;
    use nalgebra::Point3;
    use std::sync::Mutex;

    fn water_zmatrix() -> Molecule {
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

    #[test]
    fn to_cartesian_places_and_bonds_water() {
        let mol = water_zmatrix();
        let cartesian = to_cartesian(
            &mol,
            false,
            &GeometryConfig::default(),
            &ProgressReporter::silent(),
        )
        .unwrap();
        assert_eq!(cartesian.mode(), CoordinateMode::Cartesian);
        assert_eq!(cartesian.bonds().len(), 2);
        let p = cartesian.positions();
        assert!((distance(&p[0], &p[2]) - 0.96).abs() < 1e-6);
        assert!((angle(&p[1], &p[0], &p[2]) - 104.5).abs() < 1e-6);
        assert_eq!(mol.mode(), CoordinateMode::Internal);
    }

    #[test]
    fn to_cartesian_reports_phases() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|e: Progress| {
            events.lock().unwrap().push(e)
        }));
        to_cartesian(&water_zmatrix(), true, &GeometryConfig::default(), &reporter).unwrap();
        drop(reporter);
        let starts: Vec<_> = events
            .into_inner()
            .unwrap()
            .into_iter()
            .filter_map(|e| match e {
                Progress::PhaseStart { name } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec!["Placement", "Bond perception"]);
    }

    #[test]
    fn zmatrix_round_trip_preserves_geometry() {
        let mol = water_zmatrix();
        let outcome = to_zmatrix(&mol, &GeometryConfig::default(), &ProgressReporter::silent())
            .unwrap();
        assert_eq!(outcome.molecule.atom(0).unwrap().element, Element::O);

        let back = to_cartesian(
            &outcome.molecule,
            true,
            &GeometryConfig::default(),
            &ProgressReporter::silent(),
        )
        .unwrap();
        let p = back.positions();
        assert!((distance(&p[0], &p[1]) - 0.96).abs() < 1e-6);
        assert!((angle(&p[1], &p[0], &p[2]) - 104.5).abs() < 1e-6);
    }

    #[test]
    fn to_zmatrix_drops_dummy_atoms() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(Element::C, "C1", InternalCoord::anchor()));
        mol.add_atom(Atom::internal(
            Element::N,
            "N2",
            InternalCoord::with_bond(Link::literal(0, 1.156)),
        ));
        mol.add_atom(Atom::internal(
            Element::X,
            "X3",
            InternalCoord::with_angle(Link::literal(0, 1.0), Link::literal(1, 90.0)),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H4",
            InternalCoord::full(
                Link::literal(0, 1.064),
                Link::literal(2, 90.0),
                Link::literal(1, 180.0),
            ),
        ));

        let outcome = to_zmatrix(&mol, &GeometryConfig::default(), &ProgressReporter::silent())
            .unwrap();
        assert_eq!(outcome.molecule.len(), 3);
        assert!(outcome.molecule.atoms().iter().all(|a| !a.is_dummy()));
        assert!(!outcome.order.contains(&2));
        for (k, &input) in outcome.order.iter().enumerate() {
            assert_eq!(
                outcome.molecule.atom(k).unwrap().element,
                mol.atom(input).unwrap().element
            );
        }

        let back = to_cartesian(
            &outcome.molecule,
            false,
            &GeometryConfig::default(),
            &ProgressReporter::silent(),
        )
        .unwrap();
        let p = back.positions();
        let find = |element: Element| {
            back.atoms()
                .iter()
                .position(|a| a.element == element)
                .unwrap()
        };
        let (c, n, h) = (find(Element::C), find(Element::N), find(Element::H));
        assert!((distance(&p[c], &p[n]) - 1.156).abs() < 1e-6);
        assert!((distance(&p[c], &p[h]) - 1.064).abs() < 1e-6);
        assert!((angle(&p[n], &p[c], &p[h]) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn to_cartesian_rejects_short_entries_after_the_third_atom() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::internal(Element::C, "C1", InternalCoord::anchor()));
        mol.add_atom(Atom::internal(
            Element::H,
            "H2",
            InternalCoord::with_bond(Link::literal(0, 1.09)),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H3",
            InternalCoord::with_angle(Link::literal(0, 1.09), Link::literal(1, 109.5)),
        ));
        mol.add_atom(Atom::internal(
            Element::H,
            "H4",
            InternalCoord::with_bond(Link::literal(0, 1.09)),
        ));

        let result = to_cartesian(
            &mol,
            false,
            &GeometryConfig::default(),
            &ProgressReporter::silent(),
        );
        match result {
            Err(GeometryError::UnresolvedGeometry(atoms)) => {
                assert_eq!(atoms.len(), 1);
                assert_eq!(atoms[0].atom.index, 3);
                assert_eq!(
                    atoms[0].reason,
                    UnresolvedReason::MissingReferences {
                        expected: 3,
                        found: 1
                    }
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn to_zmatrix_perceives_missing_bonds() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::cartesian(Element::N, "N1", Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::cartesian(Element::H, "H2", Point3::new(1.01, 0.0, 0.0)));
        mol.add_atom(Atom::cartesian(Element::H, "H3", Point3::new(-0.34, 0.95, 0.0)));
        mol.add_atom(Atom::cartesian(Element::H, "H4", Point3::new(-0.34, -0.48, 0.82)));
        let outcome = to_zmatrix(&mol, &GeometryConfig::default(), &ProgressReporter::silent())
            .unwrap();
        assert_eq!(outcome.molecule.bonds().len(), 3);
        assert_eq!(outcome.order[0], 0);
    }
}
