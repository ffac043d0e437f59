//! Layered configuration for the command-line front end.
//!
//! Values are resolved per key with the precedence
//! command-line flag > `-S key=value` > TOML file > built-in defaults.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::build_config;
pub use models::{AppConfig, FlagOverrides};
