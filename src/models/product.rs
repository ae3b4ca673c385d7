//! Internal product models shared over the blackboard

use serde::{Deserialize, Serialize};

/// Clean internal representation of the product being marketed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductData {
    /// Commercial product name
    pub name: String,

    /// Concentration of the active ingredients, e.g. "10% Vitamin C"
    #[serde(default)]
    pub concentration: Option<String>,

    /// Suitable skin types
    #[serde(default)]
    pub skin_type: Vec<String>,

    #[serde(default)]
    pub key_ingredients: Vec<String>,

    /// Claimed benefits
    #[serde(default)]
    pub benefits: Vec<String>,

    /// Raw usage text
    #[serde(default)]
    pub usage_instructions: String,

    #[serde(default)]
    pub side_effects: Option<String>,

    /// Price in Indian Rupees
    pub price_inr: f64,
}

/// The fictional competitor used for comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorData {
    pub name: String,
    pub key_ingredients: Vec<String>,
    pub price_inr: f64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Positioning summary produced for market analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub product_name: String,
    /// "budget", "mid-range" or "premium"
    pub price_tier: String,
    pub target_skin_types: Vec<String>,
    pub premium_actives: usize,
    pub positioning: String,
}
