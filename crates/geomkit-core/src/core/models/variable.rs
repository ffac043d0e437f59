use super::ids::VariableId;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The physical dimension of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// A length in Angstroms.
    Distance,
    /// An angle in degrees (bond angles and dihedrals alike).
    Angle,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distance => f.write_str("distance"),
            Self::Angle => f.write_str("angle"),
        }
    }
}

/// A named scalar parameter that one or more internal coordinates refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: f64,
    pub metric: Metric,
    /// Constant variables are never updated by geometry reconciliation unless
    /// the caller explicitly allows it.
    pub is_constant: bool,
}

impl Variable {
    pub fn new(name: &str, value: f64, metric: Metric, is_constant: bool) -> Self {
        Self {
            name: name.to_string(),
            value,
            metric,
            is_constant,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VariableError {
    #[error("A variable named '{0}' already exists")]
    DuplicateName(String),
    #[error("Unknown variable '{0}'")]
    Unknown(String),
    #[error("Variable name '{0}' is not a valid identifier")]
    InvalidName(String),
}

/// Owned table of the variables of one molecule.
///
/// Atoms refer to entries through [`VariableId`] handles, so shared
/// constraints can be audited by iterating the table instead of chasing
/// references. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    slots: SlotMap<VariableId, Variable>,
    by_name: HashMap<String, VariableId>,
    order: Vec<VariableId>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable, rejecting duplicate or malformed names.
    pub fn insert(&mut self, variable: Variable) -> Result<VariableId, VariableError> {
        if !is_valid_name(&variable.name) {
            return Err(VariableError::InvalidName(variable.name));
        }
        if self.by_name.contains_key(&variable.name) {
            return Err(VariableError::DuplicateName(variable.name));
        }
        let name = variable.name.clone();
        let id = self.slots.insert(variable);
        self.by_name.insert(name, id);
        self.order.push(id);
        Ok(id)
    }

    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.slots.get(id)
    }

    pub fn get_mut(&mut self, id: VariableId) -> Option<&mut Variable> {
        self.slots.get_mut(id)
    }

    pub fn id_of(&self, name: &str) -> Option<VariableId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Variable> {
        self.id_of(name).and_then(|id| self.slots.get(id))
    }

    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), VariableError> {
        let id = self
            .id_of(name)
            .ok_or_else(|| VariableError::Unknown(name.to_string()))?;
        self.slots[id].value = value;
        Ok(())
    }

    /// Removes a variable from the table. Callers are responsible for making
    /// sure no atom still refers to it.
    pub fn remove(&mut self, id: VariableId) -> Option<Variable> {
        let variable = self.slots.remove(id)?;
        self.by_name.remove(&variable.name);
        self.order.retain(|&other| other != id);
        Some(variable)
    }

    pub fn contains(&self, id: VariableId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.order.iter().map(move |&id| (id, &self.slots[id]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl PartialEq for VariableStore {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
            && self
                .iter()
                .zip(other.iter())
                .all(|((_, a), (_, b))| a == b)
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    }
}
