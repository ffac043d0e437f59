use crate::core::models::variable::Metric;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Covalent-radius bonding criterion: `d <= scale * (r_i + r_j) + tolerance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondingParams {
    pub scale: f64,
    pub tolerance: f64,
}

impl Default for BondingParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            tolerance: 0.5,
        }
    }
}

/// Van der Waals close-contact criterion plus the bond-graph exclusion depth
/// (1 excludes bonded pairs, 2 adds angle partners, 3 adds dihedral partners).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactParams {
    pub scale: f64,
    pub tolerance: f64,
    pub exclusion_depth: usize,
}

impl Default for ContactParams {
    fn default() -> Self {
        Self {
            scale: 0.8,
            tolerance: 0.0,
            exclusion_depth: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutozConfig {
    /// Maximum deviation from 90 degrees accepted for reference angles.
    pub angle_threshold: f64,
    /// Measured bond lengths below this are clamped to it.
    pub min_bond_length: f64,
    /// Link every generated parameter to a new free variable (`R2`, `A3`, `D4`, ...).
    pub create_variables: bool,
}

impl Default for AutozConfig {
    fn default() -> Self {
        Self {
            angle_threshold: 45.0,
            min_bond_length: 1e-3,
            create_variables: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileConfig {
    pub distance_tolerance: f64,
    pub angle_tolerance: f64,
    pub allow_constant_update: bool,
    /// Superimpose the recomputed geometry onto the incoming frame.
    pub align_to_input: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: 1e-4,
            angle_tolerance: 1e-4,
            allow_constant_update: false,
            align_to_input: true,
        }
    }
}

impl ReconcileConfig {
    pub fn tolerance_for(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Distance => self.distance_tolerance,
            Metric::Angle => self.angle_tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraftConfig {
    /// Bond length used for element pairs missing from the bond-length table.
    pub fallback_bond_length: f64,
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self {
            fallback_bond_length: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeometryConfig {
    pub bonding: BondingParams,
    pub contacts: ContactParams,
    pub autoz: AutozConfig,
    pub reconcile: ReconcileConfig,
    pub graft: GraftConfig,
}

#[derive(Default)]
pub struct GeometryConfigBuilder {
    bonding_scale: Option<f64>,
    bonding_tolerance: Option<f64>,
    contact_scale: Option<f64>,
    contact_tolerance: Option<f64>,
    exclusion_depth: Option<usize>,
    angle_threshold: Option<f64>,
    min_bond_length: Option<f64>,
    create_variables: Option<bool>,
    distance_tolerance: Option<f64>,
    angle_tolerance: Option<f64>,
    allow_constant_update: Option<bool>,
    align_to_input: Option<bool>,
    fallback_bond_length: Option<f64>,
}

impl GeometryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bonding_scale(mut self, scale: f64) -> Self {
        self.bonding_scale = Some(scale);
        self
    }
    pub fn bonding_tolerance(mut self, tolerance: f64) -> Self {
        self.bonding_tolerance = Some(tolerance);
        self
    }
    pub fn contact_scale(mut self, scale: f64) -> Self {
        self.contact_scale = Some(scale);
        self
    }
    pub fn contact_tolerance(mut self, tolerance: f64) -> Self {
        self.contact_tolerance = Some(tolerance);
        self
    }
    pub fn exclusion_depth(mut self, depth: usize) -> Self {
        self.exclusion_depth = Some(depth);
        self
    }
    pub fn angle_threshold(mut self, degrees: f64) -> Self {
        self.angle_threshold = Some(degrees);
        self
    }
    pub fn min_bond_length(mut self, length: f64) -> Self {
        self.min_bond_length = Some(length);
        self
    }
    pub fn create_variables(mut self, enabled: bool) -> Self {
        self.create_variables = Some(enabled);
        self
    }
    pub fn distance_tolerance(mut self, tolerance: f64) -> Self {
        self.distance_tolerance = Some(tolerance);
        self
    }
    pub fn angle_tolerance(mut self, tolerance: f64) -> Self {
        self.angle_tolerance = Some(tolerance);
        self
    }
    pub fn allow_constant_update(mut self, allow: bool) -> Self {
        self.allow_constant_update = Some(allow);
        self
    }
    pub fn align_to_input(mut self, align: bool) -> Self {
        self.align_to_input = Some(align);
        self
    }
    pub fn fallback_bond_length(mut self, length: f64) -> Self {
        self.fallback_bond_length = Some(length);
        self
    }

    pub fn build(self) -> Result<GeometryConfig, ConfigError> {
        let defaults = GeometryConfig::default();

        let bonding = BondingParams {
            scale: positive(
                "bonding.scale",
                self.bonding_scale.unwrap_or(defaults.bonding.scale),
            )?,
            tolerance: non_negative(
                "bonding.tolerance",
                self.bonding_tolerance.unwrap_or(defaults.bonding.tolerance),
            )?,
        };

        let exclusion_depth = self
            .exclusion_depth
            .unwrap_or(defaults.contacts.exclusion_depth);
        if exclusion_depth > 3 {
            return Err(ConfigError::InvalidParameter {
                name: "contacts.exclusion-depth",
                reason: format!("must be between 0 and 3, got {exclusion_depth}"),
            });
        }
        let contacts = ContactParams {
            scale: positive(
                "contacts.scale",
                self.contact_scale.unwrap_or(defaults.contacts.scale),
            )?,
            tolerance: non_negative(
                "contacts.tolerance",
                self.contact_tolerance.unwrap_or(defaults.contacts.tolerance),
            )?,
            exclusion_depth,
        };

        let angle_threshold = self
            .angle_threshold
            .unwrap_or(defaults.autoz.angle_threshold);
        if !(angle_threshold > 0.0 && angle_threshold < 90.0) {
            return Err(ConfigError::InvalidParameter {
                name: "autoz.angle-threshold",
                reason: format!("must lie strictly between 0 and 90 degrees, got {angle_threshold}"),
            });
        }
        let autoz = AutozConfig {
            angle_threshold,
            min_bond_length: positive(
                "autoz.min-bond-length",
                self.min_bond_length
                    .unwrap_or(defaults.autoz.min_bond_length),
            )?,
            create_variables: self
                .create_variables
                .unwrap_or(defaults.autoz.create_variables),
        };

        let reconcile = ReconcileConfig {
            distance_tolerance: non_negative(
                "reconcile.distance-tolerance",
                self.distance_tolerance
                    .unwrap_or(defaults.reconcile.distance_tolerance),
            )?,
            angle_tolerance: non_negative(
                "reconcile.angle-tolerance",
                self.angle_tolerance
                    .unwrap_or(defaults.reconcile.angle_tolerance),
            )?,
            allow_constant_update: self
                .allow_constant_update
                .unwrap_or(defaults.reconcile.allow_constant_update),
            align_to_input: self
                .align_to_input
                .unwrap_or(defaults.reconcile.align_to_input),
        };

        let graft = GraftConfig {
            fallback_bond_length: positive(
                "graft.fallback-bond-length",
                self.fallback_bond_length
                    .unwrap_or(defaults.graft.fallback_bond_length),
            )?,
        };

        Ok(GeometryConfig {
            bonding,
            contacts,
            autoz,
            reconcile,
            graft,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("must be non-negative, got {value}"),
        })
    }
}
