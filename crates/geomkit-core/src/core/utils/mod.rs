pub mod bond_lengths;
pub mod geometry;
