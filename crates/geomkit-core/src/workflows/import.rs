use crate::core::models::molecule::Molecule;
use crate::engine::config::GeometryConfig;
use crate::engine::connectivity::perceive_bonds;
use crate::engine::error::GeometryError;
use crate::engine::progress::ProgressReporter;
use crate::engine::reconcile::{self, ReconcileReport};
use nalgebra::Point3;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct ImportResult {
    pub molecule: Molecule,
    pub report: ReconcileReport,
    pub bonds: usize,
}

/// Reconciles an externally produced geometry into `molecule` and re-perceives
/// bonds on the result.
#[instrument(skip_all, name = "import_workflow")]
pub fn run(
    molecule: &Molecule,
    incoming: &[Point3<f64>],
    config: &GeometryConfig,
    reporter: &ProgressReporter,
) -> Result<ImportResult, GeometryError> {
    let mut working = molecule.clone();
    let report = reporter.phase("Reconciliation", || {
        reconcile::run(&mut working, incoming, &config.reconcile)
    })?;
    let bonds = reporter.phase("Bond perception", || {
        perceive_bonds(&mut working, &config.bonding)
    })?;

    info!(rmsd = report.rmsd, bonds, "Geometry imported");
    Ok(ImportResult {
        molecule: working,
        report,
        bonds,
    })
}
