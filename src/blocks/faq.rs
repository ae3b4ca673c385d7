//! FAQ questions and answers drawn only from product data
//!
//! Questions are generated per category from the fields the product actually
//! has, so every question is answerable. Answers are looked up by topic.

use crate::models::{format_price, FaqItem, ProductData};

/// Most questions placed on the FAQ page
pub const MAX_FAQS: usize = 10;

/// What a question is about, which decides the answer source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Overview,
    Ingredients,
    Concentration,
    Benefits,
    Usage,
    Frequency,
    SideEffects,
    Sensitive,
    Price,
    Value,
    Difference,
    SkinTypes,
}

impl Topic {
    fn category(self) -> &'static str {
        match self {
            Topic::Overview
            | Topic::Benefits
            | Topic::Price
            | Topic::Value
            | Topic::Difference
            | Topic::SkinTypes => "Product Info",
            Topic::Ingredients | Topic::Concentration => "Ingredients",
            Topic::Usage | Topic::Frequency => "Usage",
            Topic::SideEffects | Topic::Sensitive => "Safety",
        }
    }

    /// Classify a question by keyword
    fn classify(question: &str) -> Topic {
        let q = question.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| q.contains(w));

        if has(&["side effect", "irritat", "safe", "warning"]) {
            Topic::SideEffects
        } else if has(&["sensitive"]) {
            Topic::Sensitive
        } else if has(&["skin type", "oily", "dry skin", "combination"]) {
            Topic::SkinTypes
        } else if has(&["concentration", "strength", "percent"]) {
            Topic::Concentration
        } else if has(&["ingredient", "contain"]) {
            Topic::Ingredients
        } else if has(&["worth", "value"]) {
            Topic::Value
        } else if has(&["price", "cost"]) {
            Topic::Price
        } else if has(&["how often", "when should", "frequency"]) {
            Topic::Frequency
        } else if has(&["how do i", "how to", "apply", "use it", "usage"]) {
            Topic::Usage
        } else if has(&["benefit", "what does", "results"]) {
            Topic::Benefits
        } else if has(&["different", "compare", "alternative"]) {
            Topic::Difference
        } else {
            Topic::Overview
        }
    }
}

/// Questions answerable from `product`, grouped informational, usage,
/// safety, purchase, comparison then skin type
pub fn generate_questions(product: &ProductData) -> Vec<String> {
    let name = &product.name;
    let mut questions = vec![format!("What is {}?", name)];

    if !product.key_ingredients.is_empty() {
        questions.push(format!("What are the key ingredients in {}?", name));
    }
    if product.concentration.is_some() {
        questions.push("What concentration of actives does it use?".to_string());
    }
    if !product.benefits.is_empty() {
        questions.push(format!("What benefits does {} offer?", name));
    }
    if !product.usage_instructions.trim().is_empty() {
        questions.push(format!("How do I apply {}?", name));
        questions.push("When should I use it in my routine?".to_string());
    }
    if product.side_effects.is_some() {
        questions.push("Are there any side effects?".to_string());
        questions.push("Can people with sensitive skin use it?".to_string());
    }
    questions.push(format!("What is the price of {}?", name));
    questions.push("Is it worth the price?".to_string());
    questions.push("What makes this product different from alternatives?".to_string());
    if !product.skin_type.is_empty() {
        questions.push("Which skin types is it suitable for?".to_string());
    }

    questions
}

fn list(items: &[String]) -> String {
    items.join(", ")
}

fn answer(product: &ProductData, topic: Topic) -> String {
    let name = &product.name;
    match topic {
        Topic::Overview => {
            let mut answer = format!("{} is a skincare formulation", name);
            if let Some(concentration) = &product.concentration {
                answer.push_str(&format!(" with {}", concentration));
            }
            if !product.skin_type.is_empty() {
                answer.push_str(&format!(" for {} skin", list(&product.skin_type)));
            }
            answer.push('.');
            answer
        }
        Topic::Ingredients => format!(
            "The key ingredients are {}.",
            list(&product.key_ingredients)
        ),
        Topic::Concentration => match &product.concentration {
            Some(c) => format!("It is formulated with {}.", c),
            None => format!("{} lists its actives without a concentration.", name),
        },
        Topic::Benefits => format!("{} offers {}.", name, list(&product.benefits)),
        Topic::Usage | Topic::Frequency => product.usage_instructions.trim().to_string(),
        Topic::SideEffects => match &product.side_effects {
            Some(effects) => effects.clone(),
            None => format!("{} lists no side effects.", name),
        },
        Topic::Sensitive => match &product.side_effects {
            Some(effects) => format!("Yes, with care. {}", effects),
            None => "Yes. No side effects are listed.".to_string(),
        },
        Topic::Price => format!("{} costs {}.", name, format_price(product.price_inr)),
        Topic::Value => format!(
            "At {} you get {} key ingredients: {}.",
            format_price(product.price_inr),
            product.key_ingredients.len(),
            list(&product.key_ingredients)
        ),
        Topic::Difference => {
            let mut parts = Vec::new();
            if let Some(c) = &product.concentration {
                parts.push(c.clone());
            }
            parts.extend(product.key_ingredients.iter().cloned());
            format!("{} combines {}.", name, list(&parts))
        }
        Topic::SkinTypes => format!(
            "It is suitable for {} skin.",
            list(&product.skin_type)
        ),
    }
}

/// Answer up to [`MAX_FAQS`] questions from product data
pub fn answer_questions(product: &ProductData, questions: &[String]) -> Vec<FaqItem> {
    questions
        .iter()
        .take(MAX_FAQS)
        .map(|question| {
            let topic = Topic::classify(question);
            FaqItem {
                category: topic.category().to_string(),
                question: question.clone(),
                answer: answer(product, topic),
            }
        })
        .collect()
}
