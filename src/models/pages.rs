//! Output page models written as JSON artifacts

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub category: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqPage {
    pub product_name: String,
    pub faqs: Vec<FaqItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub title: String,
    pub price: String,
    pub description: String,
    pub key_benefits: Vec<String>,
    pub usage_guide: Vec<String>,
    pub ingredients_list: Vec<String>,
}

/// One feature row of the comparison table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub feature: String,
    pub our_product: String,
    pub competitor_product: String,
    /// e.g. "Winner: Us", "Winner: Competitor", "Tie"
    pub verdict: String,
}

impl ComparisonRow {
    pub fn new(
        feature: impl Into<String>,
        our_product: impl Into<String>,
        competitor_product: impl Into<String>,
        verdict: impl Into<String>,
    ) -> Self {
        Self {
            feature: feature.into(),
            our_product: our_product.into(),
            competitor_product: competitor_product.into(),
            verdict: verdict.into(),
        }
    }

    pub fn we_win(&self) -> bool {
        self.verdict.contains("Us")
    }

    pub fn competitor_wins(&self) -> bool {
        self.verdict.contains("Competitor") && !self.we_win()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPage {
    pub title: String,
    pub competitor_name: String,
    pub comparison_table: Vec<ComparisonRow>,
    pub summary_verdict: String,
}
