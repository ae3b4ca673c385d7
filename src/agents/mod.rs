//! Content agents
//!
//! Each agent is a [`kasparro_core::AgentBehavior`] wrapped into a
//! [`kasparro_core::Agent`] by `into_agent`. None of them knows the others;
//! they meet only through the blackboard keys below and the capabilities
//! they advertise.

mod builder;
mod parser;
mod strategy;

pub use builder::{
    build_comparison_page, build_faq_page, build_product_page, BuilderAgent, BUILDER_AGENT_ID,
    COMPARISON_PAGE_KEY, FAQ_PAGE_KEY, PRODUCT_PAGE_KEY,
};
pub use parser::{parse_product, validate_product, ParserAgent, PARSER_AGENT_ID, PRODUCT_DATA_KEY};
pub use strategy::{
    analyze_market, derive_competitor, StrategyAgent, COMPETITOR_DATA_KEY, FAQ_QUESTIONS_KEY,
    MARKET_ANALYSIS_KEY, STRATEGY_AGENT_ID,
};

use kasparro_core::SharedAgent;
use std::path::Path;

/// The full content team, parser reading `input` by default
pub fn content_agents(input: &Path) -> Vec<SharedAgent> {
    vec![
        ParserAgent::new(input).into_agent(),
        StrategyAgent::new().into_agent(),
        BuilderAgent::new().into_agent(),
    ]
}
