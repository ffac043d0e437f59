use geomkit::engine::config::GeometryConfig;

pub struct DefaultsConfig {
    pub bonding_scale: f64,
    pub bonding_tolerance: f64,
    pub contact_scale: f64,
    pub contact_tolerance: f64,
    pub exclusion_depth: usize,
    pub angle_threshold: f64,
    pub min_bond_length: f64,
    pub create_variables: bool,
    pub distance_tolerance: f64,
    pub angle_tolerance: f64,
    pub allow_constant_update: bool,
    pub align_to_input: bool,
    pub fallback_bond_length: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let engine = GeometryConfig::default();
        Self {
            bonding_scale: engine.bonding.scale,
            bonding_tolerance: engine.bonding.tolerance,
            contact_scale: engine.contacts.scale,
            contact_tolerance: engine.contacts.tolerance,
            exclusion_depth: engine.contacts.exclusion_depth,
            angle_threshold: engine.autoz.angle_threshold,
            min_bond_length: engine.autoz.min_bond_length,
            create_variables: engine.autoz.create_variables,
            distance_tolerance: engine.reconcile.distance_tolerance,
            angle_tolerance: engine.reconcile.angle_tolerance,
            allow_constant_update: engine.reconcile.allow_constant_update,
            align_to_input: engine.reconcile.align_to_input,
            fallback_bond_length: engine.graft.fallback_bond_length,
        }
    }
}
