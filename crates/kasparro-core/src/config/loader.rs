//! Configuration loader with environment variable expansion
//!
//! Loads configuration from `.kasparro.toml` in the project root or the user
//! config directory.

use super::types::KasparroConfig;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for crate::KasparroError {
    fn from(err: ConfigError) -> Self {
        crate::KasparroError::Config(err.to_string())
    }
}

/// Load configuration from various sources
///
/// Priority order:
/// 1. Project-level `.kasparro.toml`
/// 2. User-level `~/.config/kasparro/config.toml`
/// 3. Default configuration
pub fn load_config(project_dir: &Path) -> Result<KasparroConfig, ConfigError> {
    let project_config = project_dir.join(".kasparro.toml");
    if project_config.exists() {
        return load_from_file(&project_config);
    }

    if let Some(user_config) = get_user_config_path() {
        if user_config.exists() {
            return load_from_file(&user_config);
        }
    }

    apply_env_overrides(KasparroConfig::default())
}

/// Get user config directory path
fn get_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kasparro").join("config.toml"))
}

/// Load configuration from a specific file
pub fn load_from_file(path: &Path) -> Result<KasparroConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: KasparroConfig = toml::from_str(&content)?;

    expand_env_vars(&mut config);

    let config = apply_env_overrides(config)?;
    validate(&config)?;
    Ok(config)
}

/// Expand ${VAR} patterns in path values
fn expand_env_vars(config: &mut KasparroConfig) {
    let env_regex = env_var_regex();

    let input = config.content.input.to_string_lossy().to_string();
    config.content.input = PathBuf::from(expand_string(&input, &env_regex));

    let output_dir = config.content.output_dir.to_string_lossy().to_string();
    config.content.output_dir = PathBuf::from(expand_string(&output_dir, &env_regex));
}

fn env_var_regex() -> Regex {
    Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
}

/// Expand environment variables in a single string
fn expand_string(s: &str, regex: &Regex) -> String {
    regex
        .replace_all(s, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Apply environment variable overrides for common settings
///
/// Supports direct environment variables:
/// - KASPARRO_LOG -> logging.filter
/// - KASPARRO_INPUT -> content.input
/// - KASPARRO_OUTPUT_DIR -> content.output_dir
/// - KASPARRO_HISTORY_CAPACITY -> bus.history_capacity
fn apply_env_overrides(mut config: KasparroConfig) -> Result<KasparroConfig, ConfigError> {
    if let Ok(filter) = std::env::var("KASPARRO_LOG") {
        if !filter.is_empty() {
            config.logging.filter = filter;
        }
    }

    if let Ok(input) = std::env::var("KASPARRO_INPUT") {
        if !input.is_empty() {
            config.content.input = PathBuf::from(input);
        }
    }

    if let Ok(dir) = std::env::var("KASPARRO_OUTPUT_DIR") {
        if !dir.is_empty() {
            config.content.output_dir = PathBuf::from(dir);
        }
    }

    if let Ok(capacity) = std::env::var("KASPARRO_HISTORY_CAPACITY") {
        if !capacity.is_empty() {
            config.bus.history_capacity = capacity.parse().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "KASPARRO_HISTORY_CAPACITY must be a number, got '{}'",
                    capacity
                ))
            })?;
        }
    }

    Ok(config)
}

/// Reject values the core cannot operate with
fn validate(config: &KasparroConfig) -> Result<(), ConfigError> {
    if config.bus.history_capacity == 0 {
        return Err(ConfigError::InvalidValue(
            "bus.history_capacity must be at least 1".to_string(),
        ));
    }
    if !(1..=10).contains(&config.orchestrator.default_priority) {
        return Err(ConfigError::InvalidValue(format!(
            "orchestrator.default_priority must be within 1..=10, got {}",
            config.orchestrator.default_priority
        )));
    }
    if config.orchestrator.id.is_empty() {
        return Err(ConfigError::InvalidValue(
            "orchestrator.id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Create a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Kasparro Configuration
# Place this file in your project root as .kasparro.toml
# or in ~/.config/kasparro/config.toml for global settings

[bus]
# Messages kept in the bus history
history_capacity = 1000

[orchestrator]
id = "orchestrator"
default_priority = 5

[logging]
# tracing filter directive; RUST_LOG takes precedence
filter = "info"
ansi = true

[workflow]
outputs = ["product_page", "faq_page", "comparison_page"]

# Uncomment to replace the built-in capability graph
# [workflow.dependencies]
# parse_raw_data = []
# build_product_page = ["parse_raw_data"]
#
# [workflow.outputs_map]
# product_page = "build_product_page"

[content]
input = "${KASPARRO_DATA_DIR}/product.json"
output_dir = "output"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = KasparroConfig::default();
        assert_eq!(config.bus.history_capacity, 1000);
        assert_eq!(config.orchestrator.id, "orchestrator");
        assert_eq!(config.workflow.outputs.len(), 3);
        assert!(config.workflow.dependencies.is_none());
    }

    #[test]
    fn test_expand_env_var() {
        let regex = env_var_regex();
        std::env::set_var("KASPARRO_TEST_VAR", "test_value");
        let result = expand_string("prefix_${KASPARRO_TEST_VAR}_suffix", &regex);
        assert_eq!(result, "prefix_test_value_suffix");
        std::env::remove_var("KASPARRO_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let regex = env_var_regex();
        let result = expand_string("${KASPARRO_NONEXISTENT_VAR}", &regex);
        assert_eq!(result, "${KASPARRO_NONEXISTENT_VAR}");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[bus]
history_capacity = 16

[workflow]
outputs = ["product_page"]

[workflow.dependencies]
parse_raw_data = []
build_product_page = ["parse_raw_data"]

[content]
output_dir = "out"
"#
        )
        .unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.bus.history_capacity, 16);
        assert_eq!(config.workflow.outputs, vec!["product_page".to_string()]);
        let deps = config.workflow.dependencies.unwrap();
        assert_eq!(deps["build_product_page"], vec!["parse_raw_data".to_string()]);
        assert_eq!(config.orchestrator.default_priority, 5);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[bus]\nhistory_capacity = 0\n").unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_project_config_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".kasparro.toml"),
            "[orchestrator]\nid = \"conductor\"\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.orchestrator.id, "conductor");
    }

    #[test]
    fn test_sample_config_parses() {
        let config: KasparroConfig = toml::from_str(sample_config()).unwrap();
        assert_eq!(config.logging.filter, "info");
    }
}
