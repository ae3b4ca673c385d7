//! Configuration module for Kasparro
//!
//! Handles loading and parsing of `.kasparro.toml` configuration files
//! with support for environment variable expansion.

mod loader;
mod types;

pub use loader::{load_config, load_from_file, sample_config, ConfigError};
pub use types::{
    BusConfig, ContentConfig, KasparroConfig, LoggingConfig, OrchestratorConfig, WorkflowConfig,
};
