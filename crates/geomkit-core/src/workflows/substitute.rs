use crate::core::fragments::registry::FragmentRegistry;
use crate::core::models::molecule::{CoordinateMode, Molecule};
use crate::core::utils::bond_lengths::BondLengthTable;
use crate::engine::config::GeometryConfig;
use crate::engine::connectivity::perceive_bonds;
use crate::engine::error::GeometryError;
use crate::engine::graft::{self, GraftOutcome};
use crate::engine::placement::place_molecule;
use crate::engine::progress::ProgressReporter;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct SubstituteResult {
    pub molecule: Molecule,
    pub graft: GraftOutcome,
}

/// Grafts the named fragment onto atom `target` (0-based) and re-perceives bonds.
///
/// A molecule read without positions or bonds is placed and bonded first, since
/// the host references are chosen from the bond graph around the target.
#[instrument(skip_all, name = "substitute_workflow", fields(fragment = fragment_name))]
pub fn run(
    molecule: &Molecule,
    target: usize,
    fragment_name: &str,
    registry: &FragmentRegistry,
    table: &BondLengthTable,
    config: &GeometryConfig,
    reporter: &ProgressReporter,
) -> Result<SubstituteResult, GeometryError> {
    let fragment = registry
        .get(fragment_name)
        .ok_or_else(|| GeometryError::UnknownFragment(fragment_name.to_string()))?;
    let table = table
        .clone()
        .with_fallback(config.graft.fallback_bond_length);

    let mut working = molecule.clone();
    if matches!(
        working.mode(),
        CoordinateMode::Internal | CoordinateMode::Mixed
    ) {
        reporter.phase("Placement", || place_molecule(&mut working).into_result())?;
    }
    if working.bonds().is_empty() {
        reporter.phase("Bond perception", || {
            perceive_bonds(&mut working, &config.bonding)
        })?;
    }
    let outcome = reporter.phase("Grafting", || {
        graft::run(
            &mut working,
            target,
            fragment,
            &table,
            config.autoz.angle_threshold,
        )
    })?;
    reporter.phase("Bond perception", || {
        perceive_bonds(&mut working, &config.bonding)
    })?;

    info!(
        atoms = working.len(),
        appended = outcome.appended.len(),
        "Substitution finished"
    );
    Ok(SubstituteResult {
        molecule: working,
        graft: outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    fn formaldehyde_like() -> Molecule {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::cartesian(Element::C, "C1", Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::cartesian(Element::O, "O2", Point3::new(1.21, 0.0, 0.0)));
        mol.add_atom(Atom::cartesian(Element::H, "H3", Point3::new(-0.55, 0.94, 0.0)));
        mol.add_atom(Atom::cartesian(Element::H, "H4", Point3::new(-0.55, -0.94, 0.0)));
        perceive_bonds(&mut mol, &GeometryConfig::default().bonding).unwrap();
        mol
    }

    #[test]
    fn substitutes_hydrogen_with_methyl() {
        let mol = formaldehyde_like();
        let registry = FragmentRegistry::builtin().unwrap();
        let result = run(
            &mol,
            2,
            "Methyl",
            &registry,
            &BondLengthTable::builtin(),
            &GeometryConfig::default(),
            &ProgressReporter::silent(),
        )
        .unwrap();
        assert_eq!(result.molecule.len(), 7);
        assert_eq!(result.graft.rescaled_bond, Some(1.54));
        assert!(result.molecule.are_bonded(0, 2));
        for h in result.graft.appended.clone() {
            assert!(result.molecule.are_bonded(2, h));
        }
        assert_eq!(mol.len(), 4);
    }

    #[test]
    fn unplaced_zmatrix_is_prepared_before_grafting() {
        use crate::core::models::atom::{InternalCoord, Link};

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
        let registry = FragmentRegistry::builtin().unwrap();
        let result = run(
            &mol,
            2,
            "methyl",
            &registry,
            &BondLengthTable::builtin(),
            &GeometryConfig::default(),
            &ProgressReporter::silent(),
        )
        .unwrap();
        assert_eq!(result.molecule.len(), 6);
        assert_eq!(result.graft.rescaled_bond, Some(1.43));
        assert!(result.molecule.are_bonded(0, 2));
    }

    #[test]
    fn unknown_fragment_is_reported() {
        let registry = FragmentRegistry::builtin().unwrap();
        let result = run(
            &formaldehyde_like(),
            2,
            "tert-butyl",
            &registry,
            &BondLengthTable::builtin(),
            &GeometryConfig::default(),
            &ProgressReporter::silent(),
        );
        assert!(matches!(result, Err(GeometryError::UnknownFragment(name)) if name == "tert-butyl"));
    }

    #[test]
    fn configured_fallback_applies_to_untabulated_pairs() {
        let mut mol = Molecule::new();
        mol.add_atom(Atom::cartesian(Element::Ge, "GE1", Point3::origin()));
        mol.add_atom(Atom::cartesian(Element::H, "H2", Point3::new(1.5, 0.0, 0.0)));
        mol.add_bond(0, 1).unwrap();
        let registry = FragmentRegistry::builtin().unwrap();
        let mut config = GeometryConfig::default();
        config.graft.fallback_bond_length = 1.9;

        let result = run(
            &mol,
            1,
            "chloro",
            &registry,
            &BondLengthTable::builtin(),
            &config,
            &ProgressReporter::silent(),
        )
        .unwrap();
        assert_eq!(result.graft.rescaled_bond, Some(1.9));
    }
}
