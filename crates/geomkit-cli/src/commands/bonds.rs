use crate::cli::BondsArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::structure_io::read_structure;
use geomkit::core::models::molecule::Molecule;
use geomkit::core::utils::geometry::distance;
use geomkit::engine::connectivity::find_close_contacts;
use geomkit::engine::progress::ProgressReporter;
use geomkit::workflows::convert;
use std::fmt::Write as _;
use tracing::info;

pub fn run(args: BondsArgs, config: &AppConfig, progress: &CliProgressHandler) -> Result<()> {
    info!("Loading input structure from {:?}", &args.input);
    let molecule = read_structure(&args.input)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let placed = convert::to_cartesian(&molecule, true, &config.geometry, &reporter)?;

    print!("{}", bond_table(&placed));
    if args.contacts {
        let contacts = find_close_contacts(&placed, &config.geometry.contacts);
        info!("Found {} close contact(s)", contacts.len());
        print!("{}", contact_table(&placed, &contacts));
    }
    Ok(())
}

fn pair_label(molecule: &Molecule, a: usize, b: usize) -> String {
    format!("{}-{}", molecule.label(a), molecule.label(b))
}

fn bond_table(molecule: &Molecule) -> String {
    let positions = molecule.positions();
    let mut out = format!("Bonds ({}):\n", molecule.bonds().len());
    for bond in molecule.bonds() {
        let length = distance(&positions[bond.first], &positions[bond.second]);
        let _ = writeln!(
            out,
            "  {:<32} {:>10.4}",
            pair_label(molecule, bond.first, bond.second),
            length
        );
    }
    out
}

fn contact_table(
    molecule: &Molecule,
    contacts: &[geomkit::engine::connectivity::Contact],
) -> String {
    let mut out = format!("Close contacts ({}):\n", contacts.len());
    for contact in contacts {
        let _ = writeln!(
            out,
            "  {:<32} {:>10.4}",
            pair_label(molecule, contact.first, contact.second),
            contact.distance
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomkit::engine::config::GeometryConfig;
    use geomkit::engine::connectivity::perceive_bonds;
    use std::fs;

    fn water_xyz(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("water.xyz");
        fs::write(
            &path,
            "3\nwater\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\nH -0.24 0.93 0.0\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn bond_table_lists_labelled_pairs_with_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let mut molecule = read_structure(&water_xyz(dir.path())).unwrap();
        perceive_bonds(&mut molecule, &GeometryConfig::default().bonding).unwrap();

        let table = bond_table(&molecule);
        assert!(table.starts_with("Bonds (2):"));
        assert!(table.contains("0.9600"));
        assert_eq!(table.lines().count(), 3);
    }

    #[test]
    fn run_accepts_contacts_flag() {
        let dir = tempfile::tempdir().unwrap();
        let args = BondsArgs {
            input: water_xyz(dir.path()),
            contacts: true,
            bonding_scale: None,
            bonding_tolerance: None,
        };
        let config = AppConfig {
            geometry: GeometryConfig::default(),
            fragment_library: None,
            bond_length_table: None,
        };
        run(args, &config, &CliProgressHandler::hidden()).unwrap();
    }
}
