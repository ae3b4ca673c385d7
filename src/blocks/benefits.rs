//! Benefit bullets pairing ingredients with claimed benefits

/// Most bullets a product page shows
pub const MAX_BENEFITS: usize = 4;

/// Marketing bullets built only from the claimed benefits
///
/// Each bullet leads with an ingredient, cycling through the list when there
/// are more benefits than ingredients. Nothing beyond the claims is invented.
pub fn generate_benefits(ingredients: &[String], claimed_benefits: &[String]) -> Vec<String> {
    let benefits: Vec<&str> = claimed_benefits
        .iter()
        .map(|b| b.trim())
        .filter(|b| !b.is_empty())
        .collect();

    if benefits.is_empty() {
        return ingredients
            .iter()
            .take(MAX_BENEFITS)
            .map(|ing| format!("{} is a key active in the formula", ing))
            .collect();
    }

    benefits
        .iter()
        .take(MAX_BENEFITS)
        .enumerate()
        .map(|(i, benefit)| {
            if ingredients.is_empty() {
                capitalize(benefit)
            } else {
                let ingredient = &ingredients[i % ingredients.len()];
                format!("{} delivers {}", ingredient, lowercase_first(benefit))
            }
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pairs_and_cycles_ingredients() {
        let bullets = generate_benefits(
            &strings(&["Vitamin C", "Hyaluronic Acid"]),
            &strings(&["Brightening", "Fades dark spots", "Hydration"]),
        );
        assert_eq!(
            bullets,
            strings(&[
                "Vitamin C delivers brightening",
                "Hyaluronic Acid delivers fades dark spots",
                "Vitamin C delivers hydration",
            ])
        );
    }

    #[test]
    fn test_caps_at_four() {
        let bullets = generate_benefits(
            &strings(&["A"]),
            &strings(&["one", "two", "three", "four", "five"]),
        );
        assert_eq!(bullets.len(), MAX_BENEFITS);
    }

    #[test]
    fn test_without_ingredients_or_benefits() {
        assert_eq!(
            generate_benefits(&[], &strings(&["glow", " "])),
            strings(&["Glow"])
        );
        assert_eq!(
            generate_benefits(&strings(&["Niacinamide"]), &[]),
            strings(&["Niacinamide is a key active in the formula"])
        );
        assert!(generate_benefits(&[], &[]).is_empty());
    }
}
