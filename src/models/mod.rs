//! Content models
//!
//! Internal models travel between agents on the blackboard; page models are
//! the final artifacts.

mod pages;
mod product;

pub use pages::{ComparisonPage, ComparisonRow, FaqItem, FaqPage, ProductPage};
pub use product::{CompetitorData, MarketAnalysis, ProductData};

/// Display a rupee price without a trailing ".0" for whole amounts
pub fn format_price(price_inr: f64) -> String {
    format!("₹{}", price_inr)
}
