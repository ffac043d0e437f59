use crate::core::models::element::Element;
use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Length used for element pairs missing from every table, in Angstroms.
pub const DEFAULT_FALLBACK_LENGTH: f64 = 1.0;

// Keys are the upper-case symbols of both elements, sorted and joined by '-'.
static SINGLE_BOND_LENGTHS: Map<&'static str, f64> = phf_map! {
    "H-H" => 0.74, "C-H" => 1.09, "H-N" => 1.01, "H-O" => 0.96, "F-H" => 0.92,
    "CL-H" => 1.27, "BR-H" => 1.41, "H-I" => 1.61, "H-S" => 1.34, "H-P" => 1.44,
    "H-SI" => 1.48, "B-H" => 1.19, "H-SE" => 1.46,
    "C-C" => 1.54, "C-N" => 1.47, "C-O" => 1.43, "C-F" => 1.35, "C-CL" => 1.77,
    "BR-C" => 1.94, "C-I" => 2.14, "C-S" => 1.82, "C-P" => 1.84, "C-SI" => 1.87,
    "B-C" => 1.56, "C-SE" => 1.98,
    "N-N" => 1.45, "N-O" => 1.40, "O-O" => 1.48, "S-S" => 2.05, "O-P" => 1.63,
    "O-SI" => 1.63, "O-S" => 1.57, "N-S" => 1.68, "F-S" => 1.56, "F-P" => 1.54,
};

fn pair_key(a: Element, b: Element) -> String {
    let mut symbols = [a.symbol().to_ascii_uppercase(), b.symbol().to_ascii_uppercase()];
    symbols.sort();
    format!("{}-{}", symbols[0], symbols[1])
}

/// Built-in single-bond length for an element pair, if tabulated.
pub fn tabulated_length(a: Element, b: Element) -> Option<f64> {
    SINGLE_BOND_LENGTHS.get(pair_key(a, b).as_str()).copied()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondLengthLookup {
    pub length: f64,
    /// `false` when the fallback length was used.
    pub tabulated: bool,
}

#[derive(Debug, Error)]
pub enum BondTableLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Unknown element '{symbol}' in '{path}'")]
    UnknownElement { path: String, symbol: String },
    #[error("Bond length for {pair} in '{path}' must be positive, got {length}")]
    InvalidLength {
        path: String,
        pair: String,
        length: f64,
    },
}

#[derive(Debug, Deserialize)]
struct BondLengthRecord {
    element1: String,
    element2: String,
    length: f64,
}

/// Symmetric element-pair bond-length lookup: user overrides first, then the
/// built-in table, then a fallback length.
#[derive(Debug, Clone, PartialEq)]
pub struct BondLengthTable {
    overrides: HashMap<(Element, Element), f64>,
    fallback: f64,
}

impl Default for BondLengthTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BondLengthTable {
    pub fn builtin() -> Self {
        Self {
            overrides: HashMap::new(),
            fallback: DEFAULT_FALLBACK_LENGTH,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    pub fn insert(&mut self, a: Element, b: Element, length: f64) {
        self.overrides.insert(ordered(a, b), length);
    }

    /// Layers a CSV file with `element1,element2,length` columns on top of the table.
    pub fn load_overrides(&mut self, path: &Path) -> Result<usize, BondTableLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| BondTableLoadError::Csv {
                path: path_str.clone(),
                source: e,
            })?;

        let mut loaded = 0;
        for result in reader.deserialize::<BondLengthRecord>() {
            let record = result.map_err(|e| BondTableLoadError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
            let parse = |symbol: &str| {
                Element::from_symbol(symbol).ok_or_else(|| BondTableLoadError::UnknownElement {
                    path: path_str.clone(),
                    symbol: symbol.to_string(),
                })
            };
            let a = parse(&record.element1)?;
            let b = parse(&record.element2)?;
            if !(record.length > 0.0) {
                return Err(BondTableLoadError::InvalidLength {
                    path: path_str.clone(),
                    pair: pair_key(a, b),
                    length: record.length,
                });
            }
            self.insert(a, b, record.length);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn lookup(&self, a: Element, b: Element) -> BondLengthLookup {
        if let Some(&length) = self.overrides.get(&ordered(a, b)) {
            return BondLengthLookup {
                length,
                tabulated: true,
            };
        }
        match tabulated_length(a, b) {
            Some(length) => BondLengthLookup {
                length,
                tabulated: true,
            },
            None => {
                warn!(
                    pair = %pair_key(a, b),
                    fallback = self.fallback,
                    "No tabulated bond length; using fallback"
                );
                BondLengthLookup {
                    length: self.fallback,
                    tabulated: false,
                }
            }
        }
    }
}

fn ordered(a: Element, b: Element) -> (Element, Element) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn load(path: &Path) -> Result<usize, BondTableLoadError> {
        BondLengthTable::builtin().load_overrides(path)
    }

    #[test]
    fn lookup_is_symmetric() {
        let table = BondLengthTable::builtin();
        assert_eq!(
            table.lookup(Element::C, Element::H),
            table.lookup(Element::H, Element::C)
        );
        assert_eq!(table.lookup(Element::Cl, Element::C).length, 1.77);
        assert_eq!(table.lookup(Element::C, Element::Br).length, 1.94);
    }

    #[test]
    fn untabulated_pair_uses_fallback() {
        let table = BondLengthTable::builtin();
        let lookup = table.lookup(Element::Fe, Element::Xe);
        assert!(!lookup.tabulated);
        assert_eq!(lookup.length, DEFAULT_FALLBACK_LENGTH);

        let custom = BondLengthTable::builtin().with_fallback(1.5);
        assert_eq!(custom.lookup(Element::Fe, Element::Xe).length, 1.5);
    }

    #[test]
    fn inserted_override_wins_over_builtin() {
        let mut table = BondLengthTable::builtin();
        table.insert(Element::H, Element::C, 1.10);
        let lookup = table.lookup(Element::C, Element::H);
        assert!(lookup.tabulated);
        assert!((lookup.length - 1.10).abs() < 1e-12);
    }

    #[test]
    fn load_overrides_reads_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lengths.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "element1,element2,length").unwrap();
        writeln!(file, "Fe, C, 1.95").unwrap();
        writeln!(file, "c,h,1.08").unwrap();

        let mut table = BondLengthTable::builtin();
        assert_eq!(table.load_overrides(&path).unwrap(), 2);
        assert_eq!(table.lookup(Element::C, Element::Fe).length, 1.95);
        assert_eq!(table.lookup(Element::H, Element::C).length, 1.08);
    }

    #[test]
    fn load_overrides_rejects_unknown_elements_and_bad_lengths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "element1,element2,length\nQq,C,1.0\n").unwrap();
        assert!(matches!(
            load(&path),
            Err(BondTableLoadError::UnknownElement { .. })
        ));

        std::fs::write(&path, "element1,element2,length\nC,C,-1.0\n").unwrap();
        assert!(matches!(
            load(&path),
            Err(BondTableLoadError::InvalidLength { .. })
        ));
    }

    #[test]
    fn load_overrides_reports_missing_file() {
        let mut table = BondLengthTable::builtin();
        let result = table.load_overrides(Path::new("/nonexistent/lengths.csv"));
        assert!(matches!(result, Err(BondTableLoadError::Csv { .. })));
    }
}
