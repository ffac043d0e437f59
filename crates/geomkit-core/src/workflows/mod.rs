//! # Workflows Module
//!
//! Multi-step procedures built from the engine operations, one per public task.
//!
//! ## Overview
//!
//! Each workflow takes the molecule by reference and returns a new one, so the
//! caller's input is never modified. Phases are reported through the
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter) passed in.
//!
//! - **Conversion** ([`convert`]) - Z-matrix to Cartesian and Cartesian to Z-matrix
//! - **Substitution** ([`substitute`]) - Fragment grafting by registry name
//! - **Import** ([`import`]) - Reconciliation of an externally optimized geometry

pub mod convert;
pub mod import;
pub mod substitute;
