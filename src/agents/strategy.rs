//! Strategy agent: competitor, FAQ questions and market positioning

use super::parser::PRODUCT_DATA_KEY;
use crate::blocks;
use crate::core::{AppError, Result};
use crate::models::{CompetitorData, MarketAnalysis, ProductData};
use kasparro_core::{
    Agent, AgentBehavior, AgentCapability, AgentGoal, KasparroError, Message, MessageType,
    PlanStep, SharedAgent,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const STRATEGY_AGENT_ID: &str = "strategy_agent";

pub const COMPETITOR_DATA_KEY: &str = "competitor_data";
pub const FAQ_QUESTIONS_KEY: &str = "faq_questions";
pub const MARKET_ANALYSIS_KEY: &str = "market_analysis";

/// Brand given to the fictional competitor
const COMPETITOR_BRAND: &str = "Lumina Basics";

/// Competitor price as a share of ours
const COMPETITOR_PRICE_RATIO: f64 = 0.8;

/// A cheaper, weaker fictional rival to compare against
pub fn derive_competitor(product: &ProductData) -> CompetitorData {
    let kind = product.name.split_whitespace().last().unwrap_or("Serum");

    let mut key_ingredients = Vec::with_capacity(3);
    if let Some(first) = product.key_ingredients.first() {
        key_ingredients.push(format!("Diluted {}", first));
    }
    key_ingredients.push("Glycerin".to_string());
    key_ingredients.push("Fragrance".to_string());

    CompetitorData {
        name: format!("{} {}", COMPETITOR_BRAND, kind),
        key_ingredients,
        price_inr: (product.price_inr * COMPETITOR_PRICE_RATIO * 100.0).round() / 100.0,
        pros: vec!["Affordable".to_string(), "Gentle formula".to_string()],
        cons: vec![
            "Lower active concentration".to_string(),
            "Missing key antioxidants".to_string(),
        ],
    }
}

/// Price tier and positioning line
pub fn analyze_market(product: &ProductData) -> MarketAnalysis {
    let price_tier = match product.price_inr {
        p if p < 500.0 => "budget",
        p if p < 1500.0 => "mid-range",
        _ => "premium",
    };
    let premium_actives = blocks::count_premium(&product.key_ingredients);
    let audience = if product.skin_type.is_empty() {
        "all".to_string()
    } else {
        product.skin_type.join(", ")
    };

    MarketAnalysis {
        product_name: product.name.clone(),
        price_tier: price_tier.to_string(),
        target_skin_types: product.skin_type.clone(),
        premium_actives,
        positioning: format!(
            "A {} option for {} skin, led by {} premium actives",
            price_tier, audience, premium_actives
        ),
    }
}

/// What a strategy goal asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scope {
    competitor: bool,
    faqs: bool,
    market: bool,
}

impl Scope {
    fn for_goal(goal: &AgentGoal) -> Self {
        let want = |competitor, faqs, market| Self {
            competitor,
            faqs,
            market,
        };
        match goal.context_str("capability") {
            Some("generate_competitor") => want(true, false, false),
            Some("generate_faqs") => want(false, true, false),
            Some("market_analysis") => want(false, false, true),
            _ => match goal.context_str("task_type") {
                Some("competitor") => want(true, false, false),
                Some("faqs") => want(false, true, false),
                _ => want(true, true, false),
            },
        }
    }
}

#[derive(Default)]
struct Produced {
    competitor: Option<CompetitorData>,
    questions: Option<Vec<String>>,
    market: Option<MarketAnalysis>,
}

/// Strategic analysis over parsed product data
#[derive(Debug, Default)]
pub struct StrategyAgent;

impl StrategyAgent {
    pub fn new() -> Self {
        Self
    }

    pub fn into_agent(self) -> SharedAgent {
        Arc::new(Agent::new(
            STRATEGY_AGENT_ID,
            "Strategy Agent",
            "Autonomous agent for strategic analysis and planning",
            vec![
                AgentCapability::new(
                    "generate_competitor",
                    "Generate fictional competitor data for comparison",
                )
                .with_types(&["ProductData"], &["CompetitorData"]),
                AgentCapability::new(
                    "generate_faqs",
                    "Generate FAQ questions answerable from product data",
                )
                .with_types(&["ProductData"], &["List[str]"]),
                AgentCapability::new("market_analysis", "Analyze market positioning and strategy")
                    .with_types(&["ProductData"], &["MarketAnalysis"]),
            ],
            self,
        ))
    }

    fn acquire_product(&self, agent: &Agent, goal: &AgentGoal) -> Result<Option<ProductData>> {
        if let Some(product) = agent.read_as::<ProductData>(PRODUCT_DATA_KEY)? {
            return Ok(Some(product));
        }
        match goal.context.get(PRODUCT_DATA_KEY) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    fn generate_competitor(&self, agent: &Agent, product: &ProductData) -> CompetitorData {
        agent.record_observation(json!({
            "type": "competitor_generation_start",
            "base_product": product.name,
            "price_point": product.price_inr,
        }));
        let competitor = derive_competitor(product);
        tracing::info!(agent = STRATEGY_AGENT_ID, "Competitor generated: {}", competitor.name);
        competitor
    }

    fn generate_faqs(&self, agent: &Agent, product: &ProductData) -> Vec<String> {
        agent.record_observation(json!({
            "type": "faq_generation_start",
            "product": product.name,
            "data_points": product.key_ingredients.len() + product.benefits.len(),
        }));
        let questions = blocks::generate_questions(product);
        tracing::info!(agent = STRATEGY_AGENT_ID, "Generated {} FAQ questions", questions.len());
        questions
    }

    fn publish(&self, agent: &Agent, produced: &Produced, goal_id: Option<&str>) -> Result<()> {
        let mut results = Map::new();
        if let Some(competitor) = &produced.competitor {
            agent.post_serialized(COMPETITOR_DATA_KEY, competitor, &["strategy", "competitor"])?;
            results.insert("competitor".to_string(), serde_json::to_value(competitor)?);
        }
        if let Some(questions) = &produced.questions {
            agent.post_serialized(FAQ_QUESTIONS_KEY, questions, &["strategy", "faq"])?;
            results.insert("faq_questions".to_string(), serde_json::to_value(questions)?);
        }
        if let Some(market) = &produced.market {
            agent.post_serialized(MARKET_ANALYSIS_KEY, market, &["strategy", "market"])?;
            results.insert("market_analysis".to_string(), serde_json::to_value(market)?);
        }
        if let Some(goal_id) = goal_id {
            agent.post_to_blackboard(
                &format!("result_{}", goal_id),
                Value::Object(results),
                &["result"],
            );
        }
        Ok(())
    }

    /// Product data from task parameters, else from the blackboard
    fn product_for_task(&self, agent: &Agent, params: &Value) -> Result<ProductData> {
        if let Some(value) = params.get(PRODUCT_DATA_KEY) {
            return Ok(serde_json::from_value(value.clone())?);
        }
        agent
            .read_as::<ProductData>(PRODUCT_DATA_KEY)?
            .ok_or_else(|| AppError::MissingInput(PRODUCT_DATA_KEY.to_string()))
    }
}

impl AgentBehavior for StrategyAgent {
    fn plan(&self, agent: &Agent, goal: &AgentGoal) -> Option<Vec<PlanStep>> {
        tracing::info!(
            agent = STRATEGY_AGENT_ID,
            "Planning strategy for goal: {}",
            goal.description
        );
        let scope = Scope::for_goal(goal);
        let mut plan = vec![PlanStep::new("acquire_product_data")];

        if scope.competitor {
            agent.record_decision(
                "Generate competitor analysis",
                "Competitor data needed for comparison page",
            );
            plan.push(PlanStep::new("generate_competitor"));
        }
        if scope.faqs {
            agent.record_decision("Generate FAQ questions", "FAQ questions needed for FAQ page");
            plan.push(PlanStep::new("generate_faqs"));
        }
        if scope.market {
            agent.record_decision("Analyze market position", "Market analysis requested");
            plan.push(PlanStep::new("market_analysis"));
        }

        plan.push(PlanStep::new("publish_results").with_params(json!({ "goal_id": goal.id })));
        Some(plan)
    }

    fn execute(
        &self,
        agent: &Agent,
        plan: &[PlanStep],
        goal: &AgentGoal,
    ) -> kasparro_core::Result<bool> {
        let mut product: Option<ProductData> = None;
        let mut produced = Produced::default();

        for step in plan {
            let action = step.action.as_str();
            if action == "acquire_product_data" {
                match self.acquire_product(agent, goal) {
                    Ok(Some(found)) => {
                        let summary = format!("Got data for: {}", found.name);
                        agent.record_outcome(action, true, Some(&summary));
                        product = Some(found);
                    }
                    Ok(None) => {
                        tracing::error!(agent = STRATEGY_AGENT_ID, "No product data available");
                        agent.record_outcome(action, false, Some("Product data not found"));
                        agent.request_assistance(
                            "Need product data for strategy",
                            "parse_raw_data",
                        );
                        return Ok(false);
                    }
                    Err(e) => {
                        agent.record_outcome(action, false, Some(&e.to_string()));
                        return Ok(false);
                    }
                }
                continue;
            }

            let Some(product) = product.as_ref() else {
                agent.record_outcome(action, false, Some("Product data not acquired"));
                return Ok(false);
            };
            match action {
                "generate_competitor" => {
                    let competitor = self.generate_competitor(agent, product);
                    let summary = format!("Generated: {}", competitor.name);
                    agent.record_outcome(action, true, Some(&summary));
                    produced.competitor = Some(competitor);
                }
                "generate_faqs" => {
                    let questions = self.generate_faqs(agent, product);
                    agent.record_outcome(
                        action,
                        true,
                        Some(&format!("Generated {} questions", questions.len())),
                    );
                    produced.questions = Some(questions);
                }
                "market_analysis" => {
                    let market = analyze_market(product);
                    agent.record_outcome(action, true, Some(&market.positioning));
                    produced.market = Some(market);
                }
                "publish_results" => {
                    let goal_id = step.params["goal_id"].as_str();
                    if let Err(e) = self.publish(agent, &produced, goal_id) {
                        tracing::error!(agent = STRATEGY_AGENT_ID, "Publishing failed: {}", e);
                        agent.record_outcome(action, false, Some(&e.to_string()));
                        return Ok(false);
                    }
                    agent.record_outcome(action, true, None);
                }
                other => tracing::warn!(agent = STRATEGY_AGENT_ID, "Unknown step: {}", other),
            }
        }
        Ok(true)
    }

    fn on_message(&self, agent: &Agent, message: &Message) -> kasparro_core::Result<()> {
        if message.message_type == MessageType::DataResponse
            && message.get_str("data_key") == Some(PRODUCT_DATA_KEY)
        {
            agent.record_observation(json!({
                "type": "received_product_data",
                "from": message.sender,
            }));
        }
        Ok(())
    }

    fn on_task_request(
        &self,
        agent: &Agent,
        task: &str,
        params: &Value,
        _message: &Message,
    ) -> kasparro_core::Result<Value> {
        // Delegated assistance names a capability rather than a task
        let wanted = params["required_capability"].as_str().unwrap_or(task);
        match wanted {
            "generate_competitor" => {
                let product = self.product_for_task(agent, params)?;
                let competitor = self.generate_competitor(agent, &product);
                agent.post_serialized(
                    COMPETITOR_DATA_KEY,
                    &competitor,
                    &["strategy", "competitor"],
                )?;
                Ok(serde_json::to_value(competitor)?)
            }
            "generate_faqs" => {
                let product = self.product_for_task(agent, params)?;
                let questions = self.generate_faqs(agent, &product);
                agent.post_serialized(FAQ_QUESTIONS_KEY, &questions, &["strategy", "faq"])?;
                Ok(serde_json::to_value(questions)?)
            }
            "market_analysis" => {
                let product = self.product_for_task(agent, params)?;
                Ok(serde_json::to_value(analyze_market(&product))?)
            }
            other => Err(KasparroError::invalid_operation(format!(
                "Unsupported task: {}",
                other
            ))),
        }
    }
}
