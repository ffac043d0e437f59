//! Text formats at the engine's boundary.
//!
//! The engine itself only works on in-memory molecules. This module turns the
//! line-oriented Z-matrix block and plain XYZ files into [`Molecule`](crate::core::models::molecule::Molecule)
//! values and back, through the common [`traits::MolecularFile`] interface.

pub mod traits;
pub mod xyz;
pub mod zmat;
