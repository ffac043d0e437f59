use crate::core::models::atom::{Atom, InternalCoord, Link, Param, Ref};
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

const BUILTIN_FRAGMENTS: &str = include_str!("../../../data/fragments.toml");
const BUILTIN_SOURCE: &str = "<builtin>";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct AtomSpec {
    symbol: String,
    name: Option<String>,
    #[serde(default)]
    refs: Vec<i32>,
    #[serde(default)]
    values: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FragmentSpec {
    #[serde(default)]
    description: String,
    atoms: Vec<AtomSpec>,
    #[serde(default)]
    extra_bonds: Vec<[usize; 2]>,
}

#[derive(Debug, Error)]
pub enum FragmentLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid fragment '{fragment}' in '{path}': {reason}")]
    Invalid {
        path: String,
        fragment: String,
        reason: String,
    },
}

/// A substituent template.
///
/// The template's first atom is the root. Its three links point at the
/// placeholders -1, -2 and -3 with zero-valued parameters; the grafter fills in
/// both the concrete host atoms and the inherited values.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub name: String,
    pub description: String,
    pub template: Molecule,
}

impl Fragment {
    pub fn root_element(&self) -> Option<Element> {
        self.template.atom(0).map(|a| a.element)
    }

    pub fn len(&self) -> usize {
        self.template.len()
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }
}

/// Named fragment templates, keyed by lower-case name.
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    fragments: BTreeMap<String, Fragment>,
}

impl FragmentRegistry {
    /// The templates shipped with the library.
    pub fn builtin() -> Result<Self, FragmentLoadError> {
        Self::from_toml_str(BUILTIN_FRAGMENTS, BUILTIN_SOURCE)
    }

    pub fn load(path: &Path) -> Result<Self, FragmentLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| FragmentLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path_str)
    }

    pub fn from_toml_str(content: &str, source: &str) -> Result<Self, FragmentLoadError> {
        let specs: HashMap<String, FragmentSpec> =
            toml::from_str(content).map_err(|e| FragmentLoadError::Toml {
                path: source.to_string(),
                source: e,
            })?;

        let mut fragments = BTreeMap::new();
        for (name, spec) in specs {
            let template = build_template(&spec).map_err(|reason| FragmentLoadError::Invalid {
                path: source.to_string(),
                fragment: name.clone(),
                reason,
            })?;
            let key = name.to_ascii_lowercase();
            fragments.insert(
                key.clone(),
                Fragment {
                    name: key,
                    description: spec.description,
                    template,
                },
            );
        }
        Ok(Self { fragments })
    }

    /// Adds every fragment of `other`, replacing same-named entries.
    pub fn merge(&mut self, other: FragmentRegistry) {
        self.fragments.extend(other.fragments);
    }

    pub fn get(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

fn build_template(spec: &FragmentSpec) -> Result<Molecule, String> {
    let Some(root) = spec.atoms.first() else {
        return Err("a fragment needs at least one atom".to_string());
    };
    if !root.refs.is_empty() || !root.values.is_empty() {
        return Err("the root atom must not declare refs or values".to_string());
    }

    let mut template = Molecule::new();
    for (index, atom_spec) in spec.atoms.iter().enumerate() {
        let number = index + 1;
        let element = Element::from_symbol(&atom_spec.symbol)
            .ok_or_else(|| format!("atom {number}: unknown element '{}'", atom_spec.symbol))?;
        let name = atom_spec
            .name
            .clone()
            .unwrap_or_else(|| format!("{}{}", element.symbol(), number));

        let coord = if index == 0 {
            InternalCoord::placeholder_root()
        } else {
            if atom_spec.refs.len() != 3 {
                return Err(format!(
                    "atom {number}: expected 3 refs, found {}",
                    atom_spec.refs.len()
                ));
            }
            if atom_spec.refs.len() != atom_spec.values.len() {
                return Err(format!(
                    "atom {number}: {} refs but {} values",
                    atom_spec.refs.len(),
                    atom_spec.values.len()
                ));
            }
            let mut links = Vec::with_capacity(3);
            for (&r, &value) in atom_spec.refs.iter().zip(&atom_spec.values) {
                let target = match r {
                    -3..=-1 => Ref::Placeholder(r as i8),
                    r if r >= 1 && (r as usize) < number => Ref::Concrete(r as usize - 1),
                    _ => return Err(format!("atom {number}: invalid reference {r}")),
                };
                links.push(Link {
                    target,
                    param: Param::Literal(value),
                });
            }
            InternalCoord {
                bond: links.first().copied(),
                angle: links.get(1).copied(),
                dihedral: links.get(2).copied(),
            }
        };

        let bonded_to = coord.bond.and_then(|l| l.target.concrete());
        let new_index = template.add_atom(Atom::internal(element, &name, coord));
        if let Some(partner) = bonded_to {
            template
                .add_bond(partner, new_index)
                .map_err(|e| format!("atom {number}: {e}"))?;
        }
    }

    for &[a, b] in &spec.extra_bonds {
        if a == 0 || b == 0 || a > template.len() || b > template.len() || a == b {
            return Err(format!("invalid extra bond [{a}, {b}]"));
        }
        template
            .add_bond(a - 1, b - 1)
            .map_err(|e| format!("extra bond [{a}, {b}]: {e}"))?;
    }

    template
        .validate_template()
        .map_err(|e| e.to_string())?;
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_registry_contains_expected_fragments() {
        let registry = FragmentRegistry::builtin().unwrap();
        for name in [
            "methyl", "ethyl", "phenyl", "hydroxyl", "amino", "methoxy", "cyano", "fluoro",
            "chloro", "bromo",
        ] {
            assert!(registry.get(name).is_some(), "missing fragment {name}");
        }
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn methyl_template_has_placeholder_root() {
        let registry = FragmentRegistry::builtin().unwrap();
        let methyl = registry.get("Methyl").unwrap();
        assert_eq!(methyl.root_element(), Some(Element::C));
        assert_eq!(methyl.len(), 4);

        let root = methyl.template.atom(0).unwrap().internal_coord().unwrap();
        assert_eq!(
            root.refs(),
            [
                Some(Ref::Placeholder(-1)),
                Some(Ref::Placeholder(-2)),
                Some(Ref::Placeholder(-3))
            ]
        );
        assert_eq!(methyl.template.bonds().len(), 3);
        assert!(methyl.template.neighbors(0).len() == 3);
    }

    #[test]
    fn phenyl_template_closes_its_ring() {
        let registry = FragmentRegistry::builtin().unwrap();
        let phenyl = registry.get("phenyl").unwrap();
        assert_eq!(phenyl.len(), 11);
        assert!(phenyl.template.are_bonded(4, 5));
        assert!(phenyl.template.are_bonded(0, 5));
        assert_eq!(phenyl.template.bonds().len(), 11);
    }

    #[test]
    fn loads_and_merges_user_fragments() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[thiol]
description = "Thiol group"
atoms = [
    {{ symbol = "S" }},
    {{ symbol = "H", name = "HS", refs = [1, -1, -2], values = [1.34, 96.0, 180.0] }},
]

[methyl]
atoms = [{{ symbol = "C" }}]
"#
        )
        .unwrap();

        let mut registry = FragmentRegistry::builtin().unwrap();
        registry.merge(FragmentRegistry::load(file.path()).unwrap());

        assert_eq!(registry.len(), 11);
        let thiol = registry.get("thiol").unwrap();
        assert_eq!(thiol.template.atom(1).unwrap().name, "HS");
        assert_eq!(registry.get("methyl").unwrap().len(), 1);
    }

    #[test]
    fn rejects_forward_references() {
        let content = r#"
[bad]
atoms = [
    { symbol = "C" },
    { symbol = "H", refs = [3, -1, -2], values = [1.0, 109.5, 180.0] },
]
"#;
        let result = FragmentRegistry::from_toml_str(content, "test");
        assert!(matches!(result, Err(FragmentLoadError::Invalid { fragment, .. }) if fragment == "bad"));
    }

    #[test]
    fn rejects_root_with_refs_and_mismatched_values() {
        let root_refs = r#"
[bad]
atoms = [{ symbol = "C", refs = [-1], values = [1.0] }]
"#;
        assert!(matches!(
            FragmentRegistry::from_toml_str(root_refs, "test"),
            Err(FragmentLoadError::Invalid { .. })
        ));

        let mismatched = r#"
[bad]
atoms = [
    { symbol = "C" },
    { symbol = "H", refs = [1, -1], values = [1.0] },
]
"#;
        assert!(matches!(
            FragmentRegistry::from_toml_str(mismatched, "test"),
            Err(FragmentLoadError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_atoms_with_fewer_than_three_refs() {
        for (refs, values) in [("[1]", "[1.09]"), ("[1, -1]", "[1.09, 109.5]")] {
            let content = format!(
                r#"
[short]
atoms = [
    {{ symbol = "C" }},
    {{ symbol = "H", refs = {refs}, values = {values} }},
]
"#
            );
            match FragmentRegistry::from_toml_str(&content, "test") {
                Err(FragmentLoadError::Invalid { reason, .. }) => {
                    assert!(reason.contains("expected 3 refs"), "{reason}")
                }
                other => panic!("{refs} was accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_out_of_range_placeholder() {
        let content = r#"
[bad]
atoms = [
    { symbol = "C" },
    { symbol = "H", refs = [1, -4, -1], values = [1.0, 109.5, 180.0] },
]
"#;
        assert!(matches!(
            FragmentRegistry::from_toml_str(content, "test"),
            Err(FragmentLoadError::Invalid { .. })
        ));
    }

    #[test]
    fn returns_io_error_for_nonexistent_file() {
        let result = FragmentRegistry::load(Path::new("nonexistent_fragments.toml"));
        assert!(matches!(result, Err(FragmentLoadError::Io { .. })));
    }

    #[test]
    fn returns_toml_error_for_unknown_fields() {
        let content = r#"
[bad]
atoms = [{ symbol = "C" }]
charge = 1
"#;
        assert!(matches!(
            FragmentRegistry::from_toml_str(content, "test"),
            Err(FragmentLoadError::Toml { .. })
        ));
    }
}
