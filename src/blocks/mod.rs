//! Logic blocks
//!
//! Pure functions turning product data into page content. Agents compose
//! them; none of them touch the bus or the blackboard.

mod benefits;
mod comparison;
mod faq;
mod usage;

pub use benefits::{generate_benefits, MAX_BENEFITS};
pub use comparison::{compare_products, count_premium, PREMIUM_INGREDIENTS};
pub use faq::{answer_questions, generate_questions, MAX_FAQS};
pub use usage::extract_usage_steps;
