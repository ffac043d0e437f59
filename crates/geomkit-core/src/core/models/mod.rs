//! # Core Models Module
//!
//! Data structures for molecules described by a mix of Cartesian and internal
//! coordinates.
//!
//! ## Key Components
//!
//! - [`element`] - Element identities and per-element radii and masses
//! - [`variable`] - Named, shareable parameters and the owned [`variable::VariableStore`]
//! - [`atom`] - Atoms and their Cartesian or Z-matrix coordinate definitions
//! - [`topology`] - Bonds and the user override layer on top of inferred bonds
//! - [`molecule`] - The ordered atom sequence with its bond graph and variables
//! - [`records`] - The record-based construction boundary (1-based indices)
//! - [`ids`] - Stable handle types
//!
//! ## Usage
//!
//! ```ignore
//! use geomkit::core::models::records::{AtomRecord, RefSpec};
//! use geomkit::core::models::molecule::Molecule;
//!
//! let records = vec![
//!     AtomRecord::Internal { label: "O".into(), bond: None, angle: None, dihedral: None },
//!     AtomRecord::Internal { label: "H".into(), bond: Some(RefSpec::value(1, 0.96)), angle: None, dihedral: None },
//! ];
//! let molecule = Molecule::from_records(&records, &[])?;
//! ```

pub mod atom;
pub mod element;
pub mod ids;
pub mod molecule;
pub mod records;
pub mod topology;
pub mod variable;
