use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, FlagOverrides};
use crate::error::{CliError, Result};
use geomkit::engine::config::GeometryConfigBuilder;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub fn build_config(
    config_path: Option<&Path>,
    set_values: &[String],
    flags: &FlagOverrides,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = match config_path {
        Some(path) => {
            let mut config = FileConfig::from_file(path)?;
            let base = path.parent().unwrap_or(Path::new(""));
            config.fragment_library = config.fragment_library.map(|p| relative_to(base, p));
            config.bond_length_table = config.bond_length_table.map(|p| relative_to(base, p));
            config
        }
        None => FileConfig::default(),
    };
    let file_config = apply_set_values(file_config, set_values)?;

    let bonding = file_config.bonding.unwrap_or_default();
    let contacts = file_config.contacts.unwrap_or_default();
    let autoz = file_config.autoz.unwrap_or_default();
    let reconcile = file_config.reconcile.unwrap_or_default();
    let graft = file_config.graft.unwrap_or_default();

    let geometry = GeometryConfigBuilder::new()
        .bonding_scale(
            flags
                .bonding_scale
                .or(bonding.scale)
                .unwrap_or(defaults.bonding_scale),
        )
        .bonding_tolerance(
            flags
                .bonding_tolerance
                .or(bonding.tolerance)
                .unwrap_or(defaults.bonding_tolerance),
        )
        .contact_scale(contacts.scale.unwrap_or(defaults.contact_scale))
        .contact_tolerance(contacts.tolerance.unwrap_or(defaults.contact_tolerance))
        .exclusion_depth(
            contacts
                .exclusion_depth
                .unwrap_or(defaults.exclusion_depth),
        )
        .angle_threshold(
            flags
                .angle_threshold
                .or(autoz.angle_threshold)
                .unwrap_or(defaults.angle_threshold),
        )
        .min_bond_length(autoz.min_bond_length.unwrap_or(defaults.min_bond_length))
        .create_variables(
            flags
                .create_variables
                .or(autoz.create_variables)
                .unwrap_or(defaults.create_variables),
        )
        .distance_tolerance(
            reconcile
                .distance_tolerance
                .unwrap_or(defaults.distance_tolerance),
        )
        .angle_tolerance(reconcile.angle_tolerance.unwrap_or(defaults.angle_tolerance))
        .allow_constant_update(
            flags
                .allow_constant_update
                .or(reconcile.allow_constant_update)
                .unwrap_or(defaults.allow_constant_update),
        )
        .align_to_input(
            flags
                .align_to_input
                .or(reconcile.align_to_input)
                .unwrap_or(defaults.align_to_input),
        )
        .fallback_bond_length(
            graft
                .fallback_bond_length
                .unwrap_or(defaults.fallback_bond_length),
        )
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        geometry,
        fragment_library: flags
            .fragment_library
            .clone()
            .or(file_config.fragment_library),
        bond_length_table: flags
            .bond_length_table
            .clone()
            .or(file_config.bond_length_table),
    })
}

fn relative_to(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let (key, value_str) = (key.trim(), value_str.trim());
        let float = |v: &str| parse_value::<f64>(key, v, "float");
        let boolean = |v: &str| parse_value::<bool>(key, v, "boolean");

        match key {
            "fragment-library" => config.fragment_library = Some(PathBuf::from(value_str)),
            "bond-length-table" => config.bond_length_table = Some(PathBuf::from(value_str)),
            "bonding.scale" => {
                config.bonding.get_or_insert_with(Default::default).scale = Some(float(value_str)?);
            }
            "bonding.tolerance" => {
                config.bonding.get_or_insert_with(Default::default).tolerance =
                    Some(float(value_str)?);
            }
            "contacts.scale" => {
                config.contacts.get_or_insert_with(Default::default).scale =
                    Some(float(value_str)?);
            }
            "contacts.tolerance" => {
                config.contacts.get_or_insert_with(Default::default).tolerance =
                    Some(float(value_str)?);
            }
            "contacts.exclusion-depth" => {
                config
                    .contacts
                    .get_or_insert_with(Default::default)
                    .exclusion_depth = Some(parse_value(key, value_str, "integer")?);
            }
            "autoz.angle-threshold" => {
                config.autoz.get_or_insert_with(Default::default).angle_threshold =
                    Some(float(value_str)?);
            }
            "autoz.min-bond-length" => {
                config.autoz.get_or_insert_with(Default::default).min_bond_length =
                    Some(float(value_str)?);
            }
            "autoz.create-variables" => {
                config.autoz.get_or_insert_with(Default::default).create_variables =
                    Some(boolean(value_str)?);
            }
            "reconcile.distance-tolerance" => {
                config
                    .reconcile
                    .get_or_insert_with(Default::default)
                    .distance_tolerance = Some(float(value_str)?);
            }
            "reconcile.angle-tolerance" => {
                config
                    .reconcile
                    .get_or_insert_with(Default::default)
                    .angle_tolerance = Some(float(value_str)?);
            }
            "reconcile.allow-constant-update" => {
                config
                    .reconcile
                    .get_or_insert_with(Default::default)
                    .allow_constant_update = Some(boolean(value_str)?);
            }
            "reconcile.align-to-input" => {
                config
                    .reconcile
                    .get_or_insert_with(Default::default)
                    .align_to_input = Some(boolean(value_str)?);
            }
            "graft.fallback-bond-length" => {
                config
                    .graft
                    .get_or_insert_with(Default::default)
                    .fallback_bond_length = Some(float(value_str)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
