use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileBondingConfig {
    pub scale: Option<f64>,
    pub tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileContactConfig {
    pub scale: Option<f64>,
    pub tolerance: Option<f64>,
    pub exclusion_depth: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAutozConfig {
    pub angle_threshold: Option<f64>,
    pub min_bond_length: Option<f64>,
    pub create_variables: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileReconcileConfig {
    pub distance_tolerance: Option<f64>,
    pub angle_tolerance: Option<f64>,
    pub allow_constant_update: Option<bool>,
    pub align_to_input: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileGraftConfig {
    pub fallback_bond_length: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub fragment_library: Option<PathBuf>,
    pub bond_length_table: Option<PathBuf>,
    pub bonding: Option<FileBondingConfig>,
    pub contacts: Option<FileContactConfig>,
    pub autoz: Option<FileAutozConfig>,
    pub reconcile: Option<FileReconcileConfig>,
    pub graft: Option<FileGraftConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
