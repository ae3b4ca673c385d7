//! Kasparro - capability-routed multi-agent content engine
//!
//! Three agents turn one product description into a product page, an FAQ
//! page and a competitor comparison page:
//! - **Parser**: raw input to validated product data
//! - **Strategy**: fictional competitor, FAQ questions, market positioning
//! - **Builder**: assembles the pages from logic blocks
//!
//! Nothing wires them together by name. The workflow is generated from the
//! outputs asked for and the capabilities the agents advertise, and agents
//! exchange data only through the blackboard of [`kasparro_core`].
//!
//! # Flow
//!
//! ```text
//!   input ─→ parse_raw_data ─┬─→ generate_competitor ─→ build_comparison_page
//!                            ├─→ generate_faqs ───────→ build_faq_page
//!                            └─────────────────────────→ build_product_page
//! ```

pub mod agents;
pub mod blocks;
pub mod core;
pub mod models;
pub mod output;
pub mod pipeline;

pub use crate::core::{AppError, Result};
pub use pipeline::{run, PipelineOptions, PipelineOutcome};

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
