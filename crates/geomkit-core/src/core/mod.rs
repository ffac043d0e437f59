//! # Core Module
//!
//! Stateless building blocks of the geometry engine.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, variables, bonds and molecules
//! - **Numerical Primitives and Tables** ([`utils`]) - Distance/angle/dihedral measurement,
//!   point placement, superposition and tabulated bond lengths
//! - **Fragment Templates** ([`fragments`]) - The registry of graftable substituents
//! - **Boundary I/O** ([`io`]) - Z-matrix and XYZ text formats

pub mod fragments;
pub mod io;
pub mod models;
pub mod utils;
