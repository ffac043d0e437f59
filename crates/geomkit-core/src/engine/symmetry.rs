use crate::core::models::molecule::Molecule;
use nalgebra::{Matrix3, Point3};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SymmetryError {
    #[error("Cannot analyse the symmetry of a molecule without real atoms")]
    NoAtoms,
    #[error("Symmetry service failed: {0}")]
    Service(String),
}

/// Point group label plus the generator operations, as 3x3 matrices acting on
/// coordinates centred at the centre of mass.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryAnalysis {
    pub point_group: String,
    pub generators: Vec<Matrix3<f64>>,
}

/// An external point-group solver.
///
/// Implementations must be side-effect free: the same input always yields the
/// same analysis.
pub trait SymmetryService {
    fn analyse(
        &self,
        positions: &[Point3<f64>],
        labels: &[&str],
        principal_moments: [f64; 3],
    ) -> Result<SymmetryAnalysis, SymmetryError>;
}

/// Reports every molecule as C1.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialSymmetry;

impl SymmetryService for TrivialSymmetry {
    fn analyse(
        &self,
        _positions: &[Point3<f64>],
        _labels: &[&str],
        _principal_moments: [f64; 3],
    ) -> Result<SymmetryAnalysis, SymmetryError> {
        Ok(SymmetryAnalysis {
            point_group: "C1".to_string(),
            generators: vec![Matrix3::identity()],
        })
    }
}

/// Hands the real (non-dummy) atoms, centred on the centre of mass, to `service`.
pub fn detect_symmetry(
    molecule: &Molecule,
    service: &dyn SymmetryService,
) -> Result<SymmetryAnalysis, SymmetryError> {
    let com = molecule.center_of_mass().ok_or(SymmetryError::NoAtoms)?;
    let real: Vec<_> = molecule.atoms().iter().filter(|a| !a.is_dummy()).collect();
    if real.is_empty() {
        return Err(SymmetryError::NoAtoms);
    }
    let positions: Vec<Point3<f64>> = real
        .iter()
        .map(|a| Point3::from(a.position - com))
        .collect();
    let labels: Vec<&str> = real.iter().map(|a| a.element.symbol()).collect();
    let analysis = service.analyse(&positions, &labels, molecule.principal_moments())?;
    debug!(point_group = %analysis.point_group, "Symmetry analysed");
    Ok(analysis)
}
