use geomkit::engine::config::GeometryConfig;
use std::path::PathBuf;

/// Values given through subcommand flags. `None` defers to the lower layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagOverrides {
    pub bonding_scale: Option<f64>,
    pub bonding_tolerance: Option<f64>,
    pub angle_threshold: Option<f64>,
    pub create_variables: Option<bool>,
    pub allow_constant_update: Option<bool>,
    pub align_to_input: Option<bool>,
    pub fragment_library: Option<PathBuf>,
    pub bond_length_table: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub geometry: GeometryConfig,
    /// Extra fragment templates merged over the built-in registry.
    pub fragment_library: Option<PathBuf>,
    /// CSV bond lengths layered over the built-in table.
    pub bond_length_table: Option<PathBuf>,
}
