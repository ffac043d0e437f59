use super::output_title;
use crate::cli::ReconcileArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::structure_io::{OutputTarget, StructureFormat, read_structure};
use geomkit::engine::progress::ProgressReporter;
use geomkit::workflows::import;
use tracing::{info, warn};

pub fn run(args: ReconcileArgs, config: &AppConfig, progress: &CliProgressHandler) -> Result<()> {
    info!("Loading Z-matrix from {:?}", &args.input);
    let molecule = read_structure(&args.input)?;
    info!("Loading new geometry from {:?}", &args.geometry);
    let incoming = read_structure(&args.geometry)?.positions();
    let target = OutputTarget::new(args.output.as_deref(), StructureFormat::Zmat)?;

    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let result = import::run(&molecule, &incoming, &config.geometry, &reporter)?;

    let report = &result.report;
    if report.overwritten_constants > 0 {
        warn!(
            "{} constant parameter(s) took the measured value",
            report.overwritten_constants
        );
    }
    eprintln!(
        "Updated {} variable(s){}; RMSD to the new geometry {:.6} A",
        report.updated_variables.len(),
        if report.updated_variables.is_empty() {
            String::new()
        } else {
            format!(" ({})", report.updated_variables.join(", "))
        },
        report.rmsd
    );
    target.write(&result.molecule, &output_title(&args.input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use geomkit::engine::config::GeometryConfig;
    use geomkit::engine::error::GeometryError;
    use std::fs;
    use std::path::Path;

    const WATER: &str = "O\nH 1 roh\nH 1 roh 2 ahoh\n\nVariables:\nroh 0.96\n\nConstants:\nahoh 104.5\n";

    fn args(dir: &Path, geometry: &str, allow_constant_update: bool) -> ReconcileArgs {
        let input = dir.join("water.zmat");
        fs::write(&input, WATER).unwrap();
        let geometry_path = dir.join("optimized.xyz");
        fs::write(&geometry_path, geometry).unwrap();
        ReconcileArgs {
            input,
            geometry: geometry_path,
            output: Some(dir.join("updated.zmat")),
            allow_constant_update,
            no_align: false,
        }
    }

    fn config(allow_constant_update: bool) -> AppConfig {
        let mut geometry = GeometryConfig::default();
        geometry.reconcile.allow_constant_update = allow_constant_update;
        AppConfig {
            geometry,
            fragment_library: None,
            bond_length_table: None,
        }
    }

    // Both O-H bonds at 1.0 A, H-O-H kept at 104.5 degrees.
    const STRETCHED: &str = "3\nstretched\nO 0.0 0.0 0.0\nH 0.0 0.0 1.0\nH 0.968148 0.0 -0.250380\n";

    #[test]
    fn shared_variable_takes_the_new_length() {
        let dir = tempfile::tempdir().unwrap();
        run(
            args(dir.path(), STRETCHED, false),
            &config(false),
            &CliProgressHandler::hidden(),
        )
        .unwrap();

        let updated = read_structure(&dir.path().join("updated.zmat")).unwrap();
        let roh = updated.variables().by_name("roh").unwrap().value;
        assert!((roh - 1.0).abs() < 1e-4);
    }

    #[test]
    fn changed_constant_is_a_violation() {
        let dir = tempfile::tempdir().unwrap();
        let bent = "3\nbent\nO 0.0 0.0 0.0\nH 0.0 0.0 0.96\nH 0.96 0.0 0.0\n";
        let result = run(
            args(dir.path(), bent, false),
            &config(false),
            &CliProgressHandler::hidden(),
        );
        assert!(matches!(
            result,
            Err(CliError::Geometry(GeometryError::ConstraintViolation { .. }))
        ));
        assert!(!dir.path().join("updated.zmat").exists());
    }
}
