//! # Engine Module
//!
//! The algorithms that operate on a [`Molecule`](crate::core::models::molecule::Molecule):
//! computing positions from internal coordinates, deriving bonds from positions,
//! generating a Z-matrix from a bond graph, grafting fragments and folding new
//! Cartesian geometries back into an existing parametrization.
//!
//! ## Overview
//!
//! Every operation takes the molecule it works on as an explicit argument and
//! keeps no state between calls. Operations that modify a molecule work on a
//! copy and only replace the caller's molecule once they have succeeded, so a
//! returned error always leaves the input untouched.
//!
//! ## Architecture
//!
//! - **Placement** ([`placement`]) - Whole-molecule position computation and variable updates
//! - **Connectivity** ([`connectivity`]) - Grid-accelerated bond inference and close-contact search
//! - **Automatic Z-matrix** ([`autoz`]) - Reference selection and re-sequencing from a bond graph
//! - **Grafting** ([`graft`]) - Substituent templates spliced onto a host atom
//! - **Reconciliation** ([`reconcile`]) - New Cartesian data merged into existing parameters
//! - **Symmetry** ([`symmetry`]) - Hook for an external point-group solver
//! - **Configuration** ([`config`]) - Tunable thresholds and tolerances
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - The engine's error type

pub mod autoz;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod graft;
pub mod placement;
pub mod progress;
pub mod reconcile;
pub mod symmetry;
