//! Parsing and validation of `gsim.toml` simulation settings.
//!
//! The file is optional: every section has defaults, and the command line
//! overrides individual values before [`validate_config`] runs.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, validate_config, CONFIG_FILE};
pub use types::*;
