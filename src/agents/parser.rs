//! Parser agent: raw product input to validated `ProductData`
//!
//! Accepts either a JSON product document or a "Key: value" product sheet.

use crate::core::{AppError, Result};
use crate::models::ProductData;
use kasparro_core::{
    Agent, AgentBehavior, AgentCapability, AgentGoal, KasparroError, Message, PlanStep,
    SharedAgent,
};
use regex::Regex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub const PARSER_AGENT_ID: &str = "parser_agent";

/// Blackboard key the parsed product is published under
pub const PRODUCT_DATA_KEY: &str = "product_data";

fn sheet_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[-*]?\s*([^:]+?)\s*:\s*(.*?)\s*$")
            .expect("sheet line pattern is a valid regex")
    })
}

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("price pattern is a valid regex"))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_price(value: &str) -> Option<f64> {
    let digits = value.replace(',', "");
    price_regex()
        .find(&digits)
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a "Key: value" product sheet
fn parse_sheet(text: &str) -> Result<ProductData> {
    let mut name = None;
    let mut price = None;
    let mut product = ProductData {
        name: String::new(),
        concentration: None,
        skin_type: Vec::new(),
        key_ingredients: Vec::new(),
        benefits: Vec::new(),
        usage_instructions: String::new(),
        side_effects: None,
        price_inr: 0.0,
    };

    for line in text.lines() {
        let Some(caps) = sheet_line_regex().captures(line) else {
            continue;
        };
        let value = caps[2].to_string();
        if value.is_empty() {
            continue;
        }
        match caps[1].to_lowercase().as_str() {
            "product name" | "name" => name = Some(value),
            "concentration" => product.concentration = Some(value),
            "skin type" | "skin types" => product.skin_type = split_list(&value),
            "key ingredients" | "ingredients" => product.key_ingredients = split_list(&value),
            "benefits" => product.benefits = split_list(&value),
            "how to use" | "usage" | "usage instructions" => product.usage_instructions = value,
            "side effects" => product.side_effects = Some(value),
            "price" | "price inr" => {
                price = Some(
                    parse_price(&value)
                        .ok_or_else(|| AppError::Parse(format!("Unreadable price: {}", value)))?,
                )
            }
            other => tracing::debug!("Ignoring product sheet field: {}", other),
        }
    }

    product.name = name.ok_or_else(|| AppError::Parse("Product name not found".to_string()))?;
    product.price_inr = price.ok_or_else(|| AppError::Parse("Price not found".to_string()))?;
    Ok(product)
}

/// Parse raw product input, JSON or product sheet
pub fn parse_product(text: &str) -> Result<ProductData> {
    if text.trim_start().starts_with('{') {
        Ok(serde_json::from_str(text)?)
    } else {
        parse_sheet(text)
    }
}

/// Name, at least one ingredient and a positive price are required
pub fn validate_product(product: &ProductData) -> Result<()> {
    if product.name.trim().is_empty() {
        return Err(AppError::Validation("Missing product name".to_string()));
    }
    if product.key_ingredients.is_empty() {
        return Err(AppError::Validation("No ingredients found".to_string()));
    }
    if product.price_inr <= 0.0 {
        return Err(AppError::Validation("Invalid price".to_string()));
    }
    Ok(())
}

/// Parses and validates product input
pub struct ParserAgent {
    default_source: PathBuf,
}

impl ParserAgent {
    /// `default_source` is read when a goal names no input
    pub fn new(default_source: impl Into<PathBuf>) -> Self {
        Self {
            default_source: default_source.into(),
        }
    }

    pub fn into_agent(self) -> SharedAgent {
        Arc::new(Agent::new(
            PARSER_AGENT_ID,
            "Parser Agent",
            "Autonomous agent for parsing and structuring raw product data",
            vec![
                AgentCapability::new(
                    "parse_raw_data",
                    "Parse raw product input into structured ProductData",
                )
                .with_types(&["raw_text", "file_path"], &["ProductData"]),
                AgentCapability::new("validate_data", "Validate data against schema requirements")
                    .with_types(&["ProductData"], &["ValidationResult"]),
            ],
            self,
        ))
    }

    fn read_file(&self, agent: &Agent, path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Err(AppError::MissingInput(format!("{} is empty", path.display())));
        }
        agent.record_observation(json!({
            "type": "file_read",
            "path": path.display().to_string(),
            "size": text.len(),
            "lines": text.lines().count(),
        }));
        tracing::info!(
            agent = PARSER_AGENT_ID,
            "Read {} bytes from {}",
            text.len(),
            path.display()
        );
        Ok(text)
    }

    fn publish(&self, agent: &Agent, product: &ProductData, goal_id: Option<&str>) -> Result<()> {
        agent.post_serialized(PRODUCT_DATA_KEY, product, &["parsed", "product", "source"])?;
        if let Some(goal_id) = goal_id {
            agent.post_serialized(&format!("result_{}", goal_id), product, &["result"])?;
        }
        tracing::info!(agent = PARSER_AGENT_ID, "Published product data to blackboard");
        Ok(())
    }

    /// Read, parse, validate and publish from the default source
    fn parse_default_source(&self, agent: &Agent) -> Result<ProductData> {
        let text = self.read_file(agent, &self.default_source)?;
        let product = parse_product(&text)?;
        validate_product(&product)?;
        self.publish(agent, &product, None)?;
        Ok(product)
    }
}

impl AgentBehavior for ParserAgent {
    fn plan(&self, agent: &Agent, goal: &AgentGoal) -> Option<Vec<PlanStep>> {
        tracing::info!(agent = PARSER_AGENT_ID, "Planning for goal: {}", goal.description);
        let mut plan = Vec::with_capacity(4);

        if let Some(path) = goal.context_str("file_path") {
            agent.record_decision("Read from file", format!("File path provided: {}", path));
            plan.push(PlanStep::new("read_file").with_params(json!({ "path": path })));
        } else if let Some(text) = goal.context_str("raw_text") {
            agent.record_decision("Use provided text", "Raw text provided directly in context");
            plan.push(PlanStep::new("use_raw_text").with_params(json!({ "text": text })));
        } else {
            agent.record_decision(
                "Use default input file",
                format!("No source specified, using {}", self.default_source.display()),
            );
            plan.push(PlanStep::new("read_file").with_params(json!({
                "path": self.default_source.display().to_string()
            })));
        }

        plan.push(PlanStep::new("parse"));
        plan.push(PlanStep::new("validate_output"));
        plan.push(PlanStep::new("publish_results").with_params(json!({ "goal_id": goal.id })));
        Some(plan)
    }

    fn execute(
        &self,
        agent: &Agent,
        plan: &[PlanStep],
        _goal: &AgentGoal,
    ) -> kasparro_core::Result<bool> {
        let mut raw_text: Option<String> = None;
        let mut product: Option<ProductData> = None;

        for step in plan {
            let outcome: Result<Option<String>> = match step.action.as_str() {
                "read_file" => {
                    let path = step.params["path"].as_str().unwrap_or_default();
                    self.read_file(agent, Path::new(path)).map(|text| {
                        let summary = format!("Read {} characters", text.chars().count());
                        raw_text = Some(text);
                        Some(summary)
                    })
                }
                "use_raw_text" => {
                    raw_text = step.params["text"].as_str().map(str::to_string);
                    Ok(None)
                }
                "parse" => raw_text
                    .as_deref()
                    .ok_or_else(|| AppError::MissingInput("raw text".to_string()))
                    .and_then(parse_product)
                    .map(|parsed| {
                        let summary = format!("Parsed: {}", parsed.name);
                        product = Some(parsed);
                        Some(summary)
                    }),
                "validate_output" => product
                    .as_ref()
                    .ok_or_else(|| AppError::MissingInput("parsed product".to_string()))
                    .and_then(validate_product)
                    .map(|_| None),
                "publish_results" => product
                    .as_ref()
                    .ok_or_else(|| AppError::MissingInput("parsed product".to_string()))
                    .and_then(|p| self.publish(agent, p, step.params["goal_id"].as_str()))
                    .map(|_| None),
                other => {
                    tracing::warn!(agent = PARSER_AGENT_ID, "Unknown step: {}", other);
                    Ok(None)
                }
            };

            match outcome {
                Ok(summary) => agent.record_outcome(step.action.as_str(), true, summary.as_deref()),
                Err(e) => {
                    tracing::error!(
                        agent = PARSER_AGENT_ID,
                        "Step '{}' failed: {}",
                        step.action,
                        e
                    );
                    agent.record_outcome(step.action.as_str(), false, Some(&e.to_string()));
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn on_task_request(
        &self,
        agent: &Agent,
        task: &str,
        params: &Value,
        _message: &Message,
    ) -> kasparro_core::Result<Value> {
        if task == "parse_text" {
            let text = params["text"]
                .as_str()
                .ok_or_else(|| KasparroError::invalid_operation("parse_text needs 'text'"))?;
            let product = parse_product(text)?;
            return Ok(serde_json::to_value(product)?);
        }

        // Delegated assistance carries the capability it needs
        if params["required_capability"].as_str() == Some("parse_raw_data") {
            tracing::info!(agent = PARSER_AGENT_ID, "Parsing default source for: {}", task);
            let product = self.parse_default_source(agent)?;
            return Ok(serde_json::to_value(product)?);
        }

        Err(KasparroError::invalid_operation(format!(
            "Unsupported task: {}",
            task
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasparro_core::{Orchestrator, Task, TaskStatus};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SHEET: &str = "\
Product Name: GlowBoost Vitamin C Serum
Concentration: 10% Vitamin C
Skin Type: Oily, Combination
Key Ingredients: Vitamin C, Hyaluronic Acid
Benefits: Brightening, Fades dark spots
How to Use: Apply 2-3 drops in the morning before sunscreen
Side Effects: Mild tingling for sensitive skin
Price: ₹699
";

    fn context(key: &str, value: &str) -> serde_json::Map<String, Value> {
        let mut ctx = serde_json::Map::new();
        ctx.insert(key.to_string(), json!(value));
        ctx
    }

    #[test]
    fn test_parse_sheet() {
        let product = parse_product(SHEET).unwrap();
        assert_eq!(product.name, "GlowBoost Vitamin C Serum");
        assert_eq!(product.concentration.as_deref(), Some("10% Vitamin C"));
        assert_eq!(product.skin_type, vec!["Oily", "Combination"]);
        assert_eq!(product.key_ingredients, vec!["Vitamin C", "Hyaluronic Acid"]);
        assert_eq!(product.price_inr, 699.0);
        assert!(validate_product(&product).is_ok());
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"name": "Serum", "key_ingredients": ["Retinol"], "price_inr": 1,299}"#;
        assert!(parse_product(json).is_err());

        let json = r#"{"name": "Serum", "key_ingredients": ["Retinol"], "price_inr": 1299.5}"#;
        let product = parse_product(json).unwrap();
        assert_eq!(product.price_inr, 1299.5);
    }

    #[test]
    fn test_sheet_price_with_separator() {
        assert_eq!(parse_price("Rs. 1,299 only"), Some(1299.0));
        assert_eq!(parse_price("free"), None);
    }

    #[test]
    fn test_sheet_missing_fields() {
        assert!(matches!(parse_product("Price: 10"), Err(AppError::Parse(_))));
        assert!(matches!(parse_product("Name: X"), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_validation_rules() {
        let mut product = parse_product(SHEET).unwrap();
        product.price_inr = 0.0;
        assert!(matches!(validate_product(&product), Err(AppError::Validation(_))));

        let mut product = parse_product(SHEET).unwrap();
        product.key_ingredients.clear();
        assert!(matches!(validate_product(&product), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_goal_publishes_product_data() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SHEET.as_bytes()).unwrap();

        let orchestrator = Orchestrator::new();
        let agent = ParserAgent::new("missing.txt").into_agent();
        orchestrator.register_agent(Arc::clone(&agent));

        let task = Task::new("Parse", "parse_raw_data")
            .with_id("parse")
            .with_context(context("file_path", &file.path().display().to_string()));
        orchestrator.submit_task(task);

        assert_eq!(orchestrator.get_task_status("parse"), Some(TaskStatus::Completed));
        let entry = orchestrator.blackboard().get_entry(PRODUCT_DATA_KEY).unwrap();
        assert_eq!(entry.owner, PARSER_AGENT_ID);
        assert!(entry.tags.contains("parsed"));
        assert_eq!(
            orchestrator.get_result("parse").unwrap()["name"],
            "GlowBoost Vitamin C Serum"
        );
        assert!(!agent.memory().decisions.is_empty());
    }

    #[test]
    fn test_raw_text_context() {
        let orchestrator = Orchestrator::new();
        orchestrator.register_agent(ParserAgent::new("missing.txt").into_agent());

        orchestrator.submit_task(
            Task::new("Parse", "parse_raw_data")
                .with_id("parse")
                .with_context(context("raw_text", SHEET)),
        );
        assert_eq!(orchestrator.get_task_status("parse"), Some(TaskStatus::Completed));
    }

    #[test]
    fn test_missing_file_fails_goal() {
        let orchestrator = Orchestrator::new();
        let agent = ParserAgent::new("definitely/not/here.json").into_agent();
        orchestrator.register_agent(Arc::clone(&agent));

        orchestrator.submit_task(Task::new("Parse", "parse_raw_data").with_id("parse"));

        assert_eq!(orchestrator.get_task_status("parse"), Some(TaskStatus::Failed));
        assert!(!orchestrator.blackboard().exists(PRODUCT_DATA_KEY));
        let outcomes = agent.memory().outcomes;
        assert!(outcomes.iter().any(|o| o.action == "read_file" && !o.success));
    }
}
