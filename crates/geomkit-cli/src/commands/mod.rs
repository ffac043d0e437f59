pub mod bonds;
pub mod cartesian;
pub mod fragments;
pub mod graft;
pub mod reconcile;
pub mod zmatrix;

use crate::config::AppConfig;
use crate::error::{CliError, Result};
use geomkit::core::fragments::registry::FragmentRegistry;
use geomkit::core::utils::bond_lengths::BondLengthTable;
use std::path::Path;
use tracing::info;

/// The built-in fragments, extended by the configured library if there is one.
pub(crate) fn load_registry(config: &AppConfig) -> Result<FragmentRegistry> {
    let mut registry = FragmentRegistry::builtin()?;
    if let Some(path) = &config.fragment_library {
        info!("Loading fragment library from {:?}", path);
        registry.merge(FragmentRegistry::load(path)?);
    }
    Ok(registry)
}

pub(crate) fn load_bond_lengths(config: &AppConfig) -> Result<BondLengthTable> {
    let mut table = BondLengthTable::builtin();
    if let Some(path) = &config.bond_length_table {
        let loaded = table.load_overrides(path)?;
        info!("Loaded {} bond length override(s) from {:?}", loaded, path);
    }
    Ok(table)
}

pub(crate) fn output_title(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("Generated by geomkit {} from {}", env!("CARGO_PKG_VERSION"), name)
}

/// Converts a 1-based atom number from the command line to an index.
pub(crate) fn atom_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| CliError::Argument("Atom numbers start at 1.".to_string()))
}
