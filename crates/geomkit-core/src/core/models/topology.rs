use std::collections::BTreeSet;
use std::fmt;

/// An undirected bond between two atoms, stored with `first < second`.
///
/// Normalizing the pair on construction makes `Bond::new(a, b) == Bond::new(b, a)`
/// so bond lists can be compared, sorted and deduplicated directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bond {
    pub first: usize,
    pub second: usize,
}

impl Bond {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.first == atom || self.second == atom
    }

    /// The partner of `atom` in this bond, if `atom` takes part in it.
    pub fn other(&self, atom: usize) -> Option<usize> {
        if self.first == atom {
            Some(self.second)
        } else if self.second == atom {
            Some(self.first)
        } else {
            None
        }
    }

    pub fn is_self_bond(&self) -> bool {
        self.first == self.second
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first + 1, self.second + 1)
    }
}

/// User edits layered on top of inferred connectivity.
///
/// Forced bonds are always present and suppressed bonds never are, whatever the
/// geometry says. The overrides survive every re-inference of the bond list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondOverrides {
    pub forced: BTreeSet<Bond>,
    pub suppressed: BTreeSet<Bond>,
}

impl BondOverrides {
    pub fn force(&mut self, bond: Bond) {
        self.suppressed.remove(&bond);
        self.forced.insert(bond);
    }

    pub fn suppress(&mut self, bond: Bond) {
        self.forced.remove(&bond);
        self.suppressed.insert(bond);
    }

    pub fn is_empty(&self) -> bool {
        self.forced.is_empty() && self.suppressed.is_empty()
    }

    /// Combines an inferred bond list with the overrides. The result is sorted and duplicate-free.
    pub fn apply(&self, inferred: &[Bond]) -> Vec<Bond> {
        let mut merged: BTreeSet<Bond> = inferred
            .iter()
            .copied()
            .filter(|bond| !self.suppressed.contains(bond))
            .collect();
        merged.extend(self.forced.iter().copied());
        merged.into_iter().collect()
    }

    /// Rewrites atom indices after the molecule has been re-sequenced.
    /// `new_index_of[old] = new`.
    pub fn remap(&self, new_index_of: &[usize]) -> Self {
        let map = |set: &BTreeSet<Bond>| {
            set.iter()
                .filter_map(|b| {
                    Some(Bond::new(
                        *new_index_of.get(b.first)?,
                        *new_index_of.get(b.second)?,
                    ))
                })
                .collect()
        };
        Self {
            forced: map(&self.forced),
            suppressed: map(&self.suppressed),
        }
    }
}
