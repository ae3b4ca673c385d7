//! Builder agent: assembles product, FAQ and comparison pages

use super::parser::PRODUCT_DATA_KEY;
use super::strategy::{COMPETITOR_DATA_KEY, FAQ_QUESTIONS_KEY};
use crate::blocks;
use crate::core::{AppError, Result};
use crate::models::{
    format_price, CompetitorData, ComparisonPage, FaqPage, ProductData, ProductPage,
};
use kasparro_core::{
    Agent, AgentBehavior, AgentCapability, AgentGoal, KasparroError, Message, PlanStep,
    SharedAgent,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const BUILDER_AGENT_ID: &str = "builder_agent";

pub const PRODUCT_PAGE_KEY: &str = "product_page";
pub const FAQ_PAGE_KEY: &str = "faq_page";
pub const COMPARISON_PAGE_KEY: &str = "comparison_page";

pub fn build_product_page(product: &ProductData) -> ProductPage {
    let description = match &product.concentration {
        Some(c) => format!(
            "A premium {} formulation designed for {} skin types.",
            c,
            product.skin_type.join(", ")
        ),
        None => format!(
            "A premium formulation designed for {} skin types.",
            product.skin_type.join(", ")
        ),
    };
    ProductPage {
        title: product.name.clone(),
        price: format_price(product.price_inr),
        description,
        key_benefits: blocks::generate_benefits(&product.key_ingredients, &product.benefits),
        usage_guide: blocks::extract_usage_steps(&product.usage_instructions),
        ingredients_list: product.key_ingredients.clone(),
    }
}

pub fn build_faq_page(product: &ProductData, questions: &[String]) -> FaqPage {
    FaqPage {
        product_name: product.name.clone(),
        faqs: blocks::answer_questions(product, questions),
    }
}

pub fn build_comparison_page(product: &ProductData, competitor: &CompetitorData) -> ComparisonPage {
    let rows = blocks::compare_products(product, competitor);
    let our_wins = rows.iter().filter(|r| r.we_win()).count();
    let their_wins = rows.iter().filter(|r| r.competitor_wins()).count();
    tracing::debug!(
        agent = BUILDER_AGENT_ID,
        "Verdicts: our product wins {}, competitor wins {}",
        our_wins,
        their_wins
    );

    let mut advantages = Vec::with_capacity(2);
    if let Some(c) = &product.concentration {
        advantages.push(format!("clinically effective {}", c));
    }
    advantages.push(format!(
        "{} premium active ingredients",
        product.key_ingredients.len()
    ));

    ComparisonPage {
        title: format!("{} vs {}", product.name, competitor.name),
        competitor_name: competitor.name.clone(),
        summary_verdict: format!(
            "{} offers superior value with {}, compared to {}'s basic formulation.",
            product.name,
            advantages.join(", "),
            competitor.name
        ),
        comparison_table: rows,
    }
}

/// Which pages a build goal covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Targets {
    product: bool,
    faq: bool,
    comparison: bool,
}

impl Targets {
    fn for_goal(goal: &AgentGoal) -> Self {
        let only = |product, faq, comparison| Self {
            product,
            faq,
            comparison,
        };
        let requested = goal
            .context_str("capability")
            .or_else(|| goal.context_str("build_type"));
        match requested {
            Some("build_product_page") | Some("product_page") => only(true, false, false),
            Some("build_faq_page") | Some("faq_page") => only(false, true, false),
            Some("build_comparison_page") | Some("comparison_page") => only(false, false, true),
            _ => only(true, true, true),
        }
    }
}

#[derive(Default)]
struct Inputs {
    product: Option<ProductData>,
    competitor: Option<CompetitorData>,
    questions: Option<Vec<String>>,
}

#[derive(Default)]
struct Pages {
    product: Option<ProductPage>,
    faq: Option<FaqPage>,
    comparison: Option<ComparisonPage>,
}

/// Turns blackboard inputs into the final pages
#[derive(Debug, Default)]
pub struct BuilderAgent;

impl BuilderAgent {
    pub fn new() -> Self {
        Self
    }

    pub fn into_agent(self) -> SharedAgent {
        Arc::new(Agent::new(
            BUILDER_AGENT_ID,
            "Builder Agent",
            "Autonomous agent for assembling content pages",
            vec![
                AgentCapability::new(
                    "build_product_page",
                    "Build a product page with benefits, usage, and ingredients",
                )
                .with_types(&["ProductData"], &["ProductPage"]),
                AgentCapability::new("build_faq_page", "Build FAQ page with accurate answers")
                    .with_types(&["ProductData", "List[str]"], &["FAQPage"]),
                AgentCapability::new(
                    "build_comparison_page",
                    "Build comparison page between our product and competitor",
                )
                .with_types(&["ProductData", "CompetitorData"], &["ComparisonPage"]),
            ],
            self,
        ))
    }

    fn acquire(&self, agent: &Agent) -> Result<Inputs> {
        Ok(Inputs {
            product: agent.read_as(PRODUCT_DATA_KEY)?,
            competitor: agent.read_as(COMPETITOR_DATA_KEY)?,
            questions: agent.read_as(FAQ_QUESTIONS_KEY)?,
        })
    }

    fn post_page<T: Serialize>(
        &self,
        agent: &Agent,
        results: &mut Map<String, Value>,
        key: &str,
        page: &T,
        tag: &str,
    ) -> Result<()> {
        agent.post_serialized(key, page, &["output", tag])?;
        results.insert(key.to_string(), serde_json::to_value(page)?);
        tracing::info!(agent = BUILDER_AGENT_ID, "Published {} to blackboard", key);
        Ok(())
    }

    fn publish(&self, agent: &Agent, pages: &Pages, goal_id: Option<&str>) -> Result<()> {
        let mut results = Map::new();
        if let Some(page) = &pages.product {
            self.post_page(agent, &mut results, PRODUCT_PAGE_KEY, page, "product")?;
        }
        if let Some(page) = &pages.faq {
            self.post_page(agent, &mut results, FAQ_PAGE_KEY, page, "faq")?;
        }
        if let Some(page) = &pages.comparison {
            self.post_page(agent, &mut results, COMPARISON_PAGE_KEY, page, "comparison")?;
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

    /// Report a missing input, ask a capable peer for it and give up
    fn missing(&self, agent: &Agent, action: &str, what: &str, capability: &str) -> bool {
        tracing::warn!(agent = BUILDER_AGENT_ID, "No {} available, requesting...", what);
        agent.record_outcome(action, false, Some(&format!("{} not available", what)));
        agent.request_assistance(&format!("Need {}", what), capability);
        false
    }

    fn run_plan(&self, agent: &Agent, plan: &[PlanStep]) -> Result<bool> {
        let mut inputs = Inputs::default();
        let mut pages = Pages::default();

        for step in plan {
            let action = step.action.as_str();
            match action {
                "acquire_data" => {
                    inputs = self.acquire(agent)?;
                    let Some(product) = &inputs.product else {
                        tracing::error!(
                            agent = BUILDER_AGENT_ID,
                            "Product data not found on blackboard"
                        );
                        return Ok(self.missing(agent, action, "product data", "parse_raw_data"));
                    };
                    agent.record_outcome(
                        action,
                        true,
                        Some(&format!("Acquired data for {}", product.name)),
                    );
                }
                "build_product_page" => {
                    let product = inputs.product.as_ref().ok_or_else(|| {
                        AppError::MissingInput(PRODUCT_DATA_KEY.to_string())
                    })?;
                    agent.record_observation(json!({
                        "type": "build_product_page",
                        "product": product.name,
                        "components": ["benefits", "usage", "ingredients"],
                    }));
                    pages.product = Some(build_product_page(product));
                    agent.record_outcome(action, true, None);
                }
                "build_faq_page" => {
                    let product = inputs.product.as_ref().ok_or_else(|| {
                        AppError::MissingInput(PRODUCT_DATA_KEY.to_string())
                    })?;
                    let Some(questions) = inputs.questions.as_ref().filter(|q| !q.is_empty()) else {
                        return Ok(self.missing(agent, action, "FAQ questions", "generate_faqs"));
                    };
                    agent.record_observation(json!({
                        "type": "build_faq_page",
                        "product": product.name,
                        "questions_count": questions.len(),
                    }));
                    let page = build_faq_page(product, questions);
                    agent.record_outcome(action, true, Some(&format!("{} Q&As", page.faqs.len())));
                    pages.faq = Some(page);
                }
                "build_comparison_page" => {
                    let product = inputs.product.as_ref().ok_or_else(|| {
                        AppError::MissingInput(PRODUCT_DATA_KEY.to_string())
                    })?;
                    let Some(competitor) = inputs.competitor.as_ref() else {
                        return Ok(self.missing(
                            agent,
                            action,
                            "competitor data",
                            "generate_competitor",
                        ));
                    };
                    agent.record_observation(json!({
                        "type": "build_comparison_page",
                        "our_product": product.name,
                        "competitor": competitor.name,
                    }));
                    pages.comparison = Some(build_comparison_page(product, competitor));
                    agent.record_outcome(action, true, None);
                }
                "publish_results" => {
                    self.publish(agent, &pages, step.params["goal_id"].as_str())?;
                    agent.record_outcome(action, true, None);
                }
                other => tracing::warn!(agent = BUILDER_AGENT_ID, "Unknown step: {}", other),
            }
        }
        Ok(true)
    }
}

impl AgentBehavior for BuilderAgent {
    fn plan(&self, agent: &Agent, goal: &AgentGoal) -> Option<Vec<PlanStep>> {
        tracing::info!(agent = BUILDER_AGENT_ID, "Planning build for goal: {}", goal.description);
        let targets = Targets::for_goal(goal);
        let mut plan = vec![PlanStep::new("acquire_data")];

        if targets.product {
            agent.record_decision("Build product page", "Product page required for output");
            plan.push(PlanStep::new("build_product_page"));
        }
        if targets.faq {
            agent.record_decision("Build FAQ page", "FAQ page required for output");
            plan.push(PlanStep::new("build_faq_page"));
        }
        if targets.comparison {
            agent.record_decision("Build comparison page", "Comparison page required for output");
            plan.push(PlanStep::new("build_comparison_page"));
        }

        plan.push(PlanStep::new("publish_results").with_params(json!({ "goal_id": goal.id })));
        Some(plan)
    }

    fn execute(
        &self,
        agent: &Agent,
        plan: &[PlanStep],
        _goal: &AgentGoal,
    ) -> kasparro_core::Result<bool> {
        match self.run_plan(agent, plan) {
            Ok(done) => Ok(done),
            Err(e) => {
                tracing::error!(agent = BUILDER_AGENT_ID, "Build failed: {}", e);
                agent.record_outcome("build", false, Some(&e.to_string()));
                Ok(false)
            }
        }
    }

    fn on_task_request(
        &self,
        _agent: &Agent,
        task: &str,
        params: &Value,
        _message: &Message,
    ) -> kasparro_core::Result<Value> {
        let field = |key: &str| {
            params
                .get(key)
                .cloned()
                .ok_or_else(|| {
                    KasparroError::invalid_operation(format!("{} needs '{}'", task, key))
                })
        };
        let product: ProductData = serde_json::from_value(field(PRODUCT_DATA_KEY)?)?;

        let page = match task {
            "build_product_page" => serde_json::to_value(build_product_page(&product))?,
            "build_faq_page" => {
                let questions: Vec<String> = serde_json::from_value(field("questions")?)?;
                serde_json::to_value(build_faq_page(&product, &questions))?
            }
            "build_comparison_page" => {
                let competitor: CompetitorData =
                    serde_json::from_value(field(COMPETITOR_DATA_KEY)?)?;
                serde_json::to_value(build_comparison_page(&product, &competitor))?
            }
            other => {
                return Err(KasparroError::invalid_operation(format!(
                    "Unsupported task: {}",
                    other
                )))
            }
        };
        Ok(page)
    }
}
