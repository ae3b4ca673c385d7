//! Usage paragraph to numbered steps

/// Split usage text into numbered steps, one per sentence or line
pub fn extract_usage_steps(raw_usage_text: &str) -> Vec<String> {
    raw_usage_text
        .split(&['.', ';', '\n'][..])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect()
}
