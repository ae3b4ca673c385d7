//! Configuration types for Kasparro
//!
//! Defines the structure of `.kasparro.toml` configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KasparroConfig {
    /// Message bus configuration
    #[serde(default)]
    pub bus: BusConfig,

    /// Orchestrator configuration
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Workflow generation configuration
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Content pipeline input/output locations
    #[serde(default)]
    pub content: ContentConfig,
}

/// Message bus section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Number of messages kept in the bus history (oldest evicted first)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_capacity() -> usize {
    1000
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

/// Orchestrator section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Bus identity of the orchestrator; agents report goal completion here
    #[serde(default = "default_orchestrator_id")]
    pub id: String,

    /// Priority of messages the orchestrator sends outside a task, such as
    /// delegated assistance requests
    #[serde(default = "default_priority")]
    pub default_priority: u8,
}

fn default_orchestrator_id() -> String {
    "orchestrator".to_string()
}

fn default_priority() -> u8 {
    5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            id: default_orchestrator_id(),
            default_priority: default_priority(),
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit ANSI colours
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: true,
        }
    }
}

/// Workflow generation section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Outputs requested when none are given on the command line
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,

    /// Replacement capability -> prerequisite capabilities table
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, Vec<String>>>,

    /// Replacement output -> producing capability table
    #[serde(default)]
    pub outputs_map: Option<BTreeMap<String, String>>,
}

fn default_outputs() -> Vec<String> {
    vec![
        "product_page".to_string(),
        "faq_page".to_string(),
        "comparison_page".to_string(),
    ]
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            outputs: default_outputs(),
            dependencies: None,
            outputs_map: None,
        }
    }
}

/// Content section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Raw product input file (supports ${ENV_VAR} syntax)
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Directory JSON artifacts are written to (supports ${ENV_VAR} syntax)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_input() -> PathBuf {
    PathBuf::from("data/product.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output_dir: default_output_dir(),
        }
    }
}
