use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements understood by the geometry engine.
///
/// Covers the first four periods plus the heavier halogens and xenon, which is
/// enough for the organic and main-group chemistry that internal-coordinate
/// editing is typically used for. [`Element::X`] is the dummy atom used as an
/// auxiliary reference point; it carries no mass and never bonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Sc,
    Ti,
    V,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    I,
    Xe,
    /// Dummy reference atom.
    X,
}

static SYMBOLS: Map<&'static str, Element> = phf_map! {
    "H" => Element::H, "D" => Element::H, "T" => Element::H,
    "HE" => Element::He, "LI" => Element::Li, "BE" => Element::Be,
    "B" => Element::B, "C" => Element::C, "N" => Element::N, "O" => Element::O,
    "F" => Element::F, "NE" => Element::Ne, "NA" => Element::Na, "MG" => Element::Mg,
    "AL" => Element::Al, "SI" => Element::Si, "P" => Element::P, "S" => Element::S,
    "CL" => Element::Cl, "AR" => Element::Ar, "K" => Element::K, "CA" => Element::Ca,
    "SC" => Element::Sc, "TI" => Element::Ti, "V" => Element::V, "CR" => Element::Cr,
    "MN" => Element::Mn, "FE" => Element::Fe, "CO" => Element::Co, "NI" => Element::Ni,
    "CU" => Element::Cu, "ZN" => Element::Zn, "GA" => Element::Ga, "GE" => Element::Ge,
    "AS" => Element::As, "SE" => Element::Se, "BR" => Element::Br, "KR" => Element::Kr,
    "I" => Element::I, "XE" => Element::Xe,
    "X" => Element::X, "XX" => Element::X, "DU" => Element::X, "DUM" => Element::X,
    "DUMMY" => Element::X,
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognized element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    /// Resolves an element from an atom label such as `C`, `Cl3`, `H12` or `X1`.
    ///
    /// The leading alphabetic run of the label is matched case-insensitively,
    /// first as a whole, then by its first two letters, then by its first letter.
    pub fn from_symbol(label: &str) -> Option<Self> {
        let prefix: String = label
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if prefix.is_empty() {
            return None;
        }
        let upper = prefix.to_ascii_uppercase();
        SYMBOLS
            .get(upper.as_str())
            .or_else(|| upper.get(..2).and_then(|s| SYMBOLS.get(s)))
            .or_else(|| upper.get(..1).and_then(|s| SYMBOLS.get(s)))
            .copied()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::H => "H",
            Self::He => "He",
            Self::Li => "Li",
            Self::Be => "Be",
            Self::B => "B",
            Self::C => "C",
            Self::N => "N",
            Self::O => "O",
            Self::F => "F",
            Self::Ne => "Ne",
            Self::Na => "Na",
            Self::Mg => "Mg",
            Self::Al => "Al",
            Self::Si => "Si",
            Self::P => "P",
            Self::S => "S",
            Self::Cl => "Cl",
            Self::Ar => "Ar",
            Self::K => "K",
            Self::Ca => "Ca",
            Self::Sc => "Sc",
            Self::Ti => "Ti",
            Self::V => "V",
            Self::Cr => "Cr",
            Self::Mn => "Mn",
            Self::Fe => "Fe",
            Self::Co => "Co",
            Self::Ni => "Ni",
            Self::Cu => "Cu",
            Self::Zn => "Zn",
            Self::Ga => "Ga",
            Self::Ge => "Ge",
            Self::As => "As",
            Self::Se => "Se",
            Self::Br => "Br",
            Self::Kr => "Kr",
            Self::I => "I",
            Self::Xe => "Xe",
            Self::X => "X",
        }
    }

    /// Single-bond covalent radius in Angstroms (Cordero et al., 2008).
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Self::H => 0.31,
            Self::He => 0.28,
            Self::Li => 1.28,
            Self::Be => 0.96,
            Self::B => 0.84,
            Self::C => 0.76,
            Self::N => 0.71,
            Self::O => 0.66,
            Self::F => 0.57,
            Self::Ne => 0.58,
            Self::Na => 1.66,
            Self::Mg => 1.41,
            Self::Al => 1.21,
            Self::Si => 1.11,
            Self::P => 1.07,
            Self::S => 1.05,
            Self::Cl => 1.02,
            Self::Ar => 1.06,
            Self::K => 2.03,
            Self::Ca => 1.76,
            Self::Sc => 1.70,
            Self::Ti => 1.60,
            Self::V => 1.53,
            Self::Cr => 1.39,
            Self::Mn => 1.39,
            Self::Fe => 1.32,
            Self::Co => 1.26,
            Self::Ni => 1.24,
            Self::Cu => 1.32,
            Self::Zn => 1.22,
            Self::Ga => 1.22,
            Self::Ge => 1.20,
            Self::As => 1.19,
            Self::Se => 1.20,
            Self::Br => 1.20,
            Self::Kr => 1.16,
            Self::I => 1.39,
            Self::Xe => 1.40,
            Self::X => 0.0,
        }
    }

    /// Van der Waals radius in Angstroms, used for close-contact searches.
    pub fn vdw_radius(&self) -> f64 {
        match self {
            Self::H => 1.20,
            Self::He => 1.40,
            Self::Li => 1.82,
            Self::Be => 1.53,
            Self::B => 1.92,
            Self::C => 1.70,
            Self::N => 1.55,
            Self::O => 1.52,
            Self::F => 1.47,
            Self::Ne => 1.54,
            Self::Na => 2.27,
            Self::Mg => 1.73,
            Self::Al => 1.84,
            Self::Si => 2.10,
            Self::P => 1.80,
            Self::S => 1.80,
            Self::Cl => 1.75,
            Self::Ar => 1.88,
            Self::K => 2.75,
            Self::Ca => 2.31,
            Self::Sc => 2.15,
            Self::Ti => 2.11,
            Self::V => 2.07,
            Self::Cr => 2.06,
            Self::Mn => 2.05,
            Self::Fe => 2.04,
            Self::Co => 2.00,
            Self::Ni => 1.63,
            Self::Cu => 1.40,
            Self::Zn => 1.39,
            Self::Ga => 1.87,
            Self::Ge => 2.11,
            Self::As => 1.85,
            Self::Se => 1.90,
            Self::Br => 1.85,
            Self::Kr => 2.02,
            Self::I => 1.98,
            Self::Xe => 2.16,
            Self::X => 0.0,
        }
    }

    /// Standard atomic weight in daltons.
    pub fn mass(&self) -> f64 {
        match self {
            Self::H => 1.008,
            Self::He => 4.0026,
            Self::Li => 6.94,
            Self::Be => 9.0122,
            Self::B => 10.81,
            Self::C => 12.011,
            Self::N => 14.007,
            Self::O => 15.999,
            Self::F => 18.998,
            Self::Ne => 20.180,
            Self::Na => 22.990,
            Self::Mg => 24.305,
            Self::Al => 26.982,
            Self::Si => 28.085,
            Self::P => 30.974,
            Self::S => 32.06,
            Self::Cl => 35.45,
            Self::Ar => 39.948,
            Self::K => 39.098,
            Self::Ca => 40.078,
            Self::Sc => 44.956,
            Self::Ti => 47.867,
            Self::V => 50.942,
            Self::Cr => 51.996,
            Self::Mn => 54.938,
            Self::Fe => 55.845,
            Self::Co => 58.933,
            Self::Ni => 58.693,
            Self::Cu => 63.546,
            Self::Zn => 65.38,
            Self::Ga => 69.723,
            Self::Ge => 72.630,
            Self::As => 74.922,
            Self::Se => 78.971,
            Self::Br => 79.904,
            Self::Kr => 83.798,
            Self::I => 126.90,
            Self::Xe => 131.29,
            Self::X => 0.0,
        }
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, Self::X)
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s).ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
