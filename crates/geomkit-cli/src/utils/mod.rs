pub mod progress;
pub mod structure_io;
