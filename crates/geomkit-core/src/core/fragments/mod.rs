//! Substituent templates that can be grafted onto a molecule.

pub mod registry;
