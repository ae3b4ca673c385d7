//! Rule-based comparison table between our product and the competitor

use crate::models::{format_price, CompetitorData, ComparisonRow, ProductData};
use std::cmp::Ordering;

/// Name fragments counted as premium actives
pub const PREMIUM_INGREDIENTS: &[&str] = &[
    "vitamin c",
    "l-ascorbic",
    "hyaluronic",
    "retinol",
    "niacinamide",
    "ferulic",
];

/// Ingredients whose name contains a premium fragment
pub fn count_premium(ingredients: &[String]) -> usize {
    ingredients
        .iter()
        .filter(|ing| {
            let lower = ing.to_lowercase();
            PREMIUM_INGREDIENTS.iter().any(|p| lower.contains(p))
        })
        .count()
}

fn at_least(ours: usize, theirs: usize) -> &'static str {
    if ours >= theirs {
        "Winner: Us"
    } else {
        "Winner: Competitor"
    }
}

/// Feature rows: price, active count, premium actives, concentration (when
/// known), strengths and drawbacks
pub fn compare_products(product: &ProductData, competitor: &CompetitorData) -> Vec<ComparisonRow> {
    let mut rows = Vec::with_capacity(6);

    let price_verdict = match product.price_inr.partial_cmp(&competitor.price_inr) {
        Some(Ordering::Less) => "Winner: Us (Better Value)",
        Some(Ordering::Equal) => "Tie",
        _ => "Winner: Competitor",
    };
    rows.push(ComparisonRow::new(
        "Price",
        format_price(product.price_inr),
        format_price(competitor.price_inr),
        price_verdict,
    ));

    let ours = product.key_ingredients.len();
    let theirs = competitor.key_ingredients.len();
    rows.push(ComparisonRow::new(
        "Active Ingredients",
        format!("{} key ingredients", ours),
        format!("{} key ingredients", theirs),
        at_least(ours, theirs),
    ));

    let ours = count_premium(&product.key_ingredients);
    let theirs = count_premium(&competitor.key_ingredients);
    rows.push(ComparisonRow::new(
        "Premium Ingredients",
        format!("{} premium actives", ours),
        format!("{} premium actives", theirs),
        at_least(ours, theirs),
    ));

    if let Some(concentration) = product.concentration.as_deref().filter(|c| !c.is_empty()) {
        rows.push(ComparisonRow::new(
            "Active Concentration",
            concentration,
            "Not specified",
            "Winner: Us (Transparency)",
        ));
    }

    let strengths = if product.benefits.is_empty() {
        "Multiple benefits".to_string()
    } else {
        product.benefits.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
    };
    let their_strengths = if competitor.pros.is_empty() {
        "Basic formulation".to_string()
    } else {
        competitor.pros.join(", ")
    };
    rows.push(ComparisonRow::new(
        "Key Strengths",
        strengths,
        their_strengths,
        "Winner: Us",
    ));

    let (their_drawbacks, verdict) = if competitor.cons.is_empty() {
        ("Unknown".to_string(), "Tie")
    } else {
        (competitor.cons.join(", "), "Winner: Us")
    };
    rows.push(ComparisonRow::new(
        "Drawbacks",
        product
            .side_effects
            .clone()
            .unwrap_or_else(|| "Minimal side effects".to_string()),
        their_drawbacks,
        verdict,
    ));

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn product() -> ProductData {
        ProductData {
            name: "GlowBoost Vitamin C Serum".to_string(),
            concentration: Some("10% Vitamin C".to_string()),
            skin_type: strings(&["Oily", "Combination"]),
            key_ingredients: strings(&["Vitamin C", "Hyaluronic Acid"]),
            benefits: strings(&["Brightening", "Fades dark spots", "Hydration"]),
            usage_instructions: "Apply 2-3 drops in the morning.".to_string(),
            side_effects: Some("Mild tingling for sensitive skin".to_string()),
            price_inr: 699.0,
        }
    }

    fn competitor() -> CompetitorData {
        CompetitorData {
            name: "Lumina Basics Serum".to_string(),
            key_ingredients: strings(&["Diluted Vitamin C", "Glycerin", "Fragrance"]),
            price_inr: 559.2,
            pros: strings(&["Affordable", "Gentle formula"]),
            cons: strings(&["Lower active concentration"]),
        }
    }

    #[test]
    fn test_full_table() {
        let rows = compare_products(&product(), &competitor());
        let features: Vec<&str> = rows.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(
            features,
            vec![
                "Price",
                "Active Ingredients",
                "Premium Ingredients",
                "Active Concentration",
                "Key Strengths",
                "Drawbacks",
            ]
        );

        assert_eq!(rows[0].our_product, "₹699");
        assert_eq!(rows[0].verdict, "Winner: Competitor");
        assert_eq!(rows[1].verdict, "Winner: Competitor");
        assert_eq!(rows[2].our_product, "2 premium actives");
        assert_eq!(rows[2].competitor_product, "1 premium actives");
        assert_eq!(rows[2].verdict, "Winner: Us");
        assert_eq!(rows[4].our_product, "Brightening, Fades dark spots");
        assert_eq!(rows[5].verdict, "Winner: Us");
    }

    #[test]
    fn test_price_verdicts() {
        let mut ours = product();
        let mut theirs = competitor();
        theirs.price_inr = 800.0;
        assert_eq!(compare_products(&ours, &theirs)[0].verdict, "Winner: Us (Better Value)");
        ours.price_inr = 800.0;
        assert_eq!(compare_products(&ours, &theirs)[0].verdict, "Tie");
    }

    #[test]
    fn test_sparse_inputs() {
        let mut ours = product();
        ours.concentration = None;
        ours.side_effects = None;
        ours.benefits.clear();
        let mut theirs = competitor();
        theirs.pros.clear();
        theirs.cons.clear();

        let rows = compare_products(&ours, &theirs);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[3].our_product, "Multiple benefits");
        assert_eq!(rows[3].competitor_product, "Basic formulation");
        assert_eq!(rows[4].our_product, "Minimal side effects");
        assert_eq!(rows[4].competitor_product, "Unknown");
        assert_eq!(rows[4].verdict, "Tie");
    }

    #[test]
    fn test_count_premium_is_case_insensitive() {
        assert_eq!(
            count_premium(&strings(&["RETINOL", "Ferulic Acid", "Water"])),
            2
        );
    }
}
