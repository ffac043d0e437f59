//! # geomkit Core Library
//!
//! A molecular geometry engine for structures described by any mix of Cartesian
//! coordinates and Z-matrix internal coordinates.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers, each depending only on the ones below it.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `Atom`,
//!   `VariableStore`), numerical geometry primitives, tabulated bond lengths, the
//!   fragment registry and the Z-matrix/XYZ text formats.
//!
//! - **[`engine`]: The Algorithms.** Whole-molecule placement, grid-accelerated
//!   bond perception and contact search, automatic Z-matrix generation, fragment
//!   grafting and reconciliation of externally optimized geometries. Every
//!   operation either succeeds or leaves its input molecule unchanged.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (format conversion,
//!   substitution, geometry import) that chain engine operations and report their
//!   phases through a progress callback.

pub mod core;
pub mod engine;
pub mod workflows;
