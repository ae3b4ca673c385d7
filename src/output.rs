//! JSON artifact output
//!
//! Artifacts are looked up on the blackboard by key; who produced them is
//! read from the entry owner.

use crate::agents::{COMPARISON_PAGE_KEY, FAQ_PAGE_KEY, PRODUCT_PAGE_KEY};
use crate::core::Result;
use kasparro_core::Blackboard;
use std::path::{Path, PathBuf};

/// Blackboard key -> artifact file name
pub const ARTIFACTS: &[(&str, &str)] = &[
    (PRODUCT_PAGE_KEY, "product_page.json"),
    (FAQ_PAGE_KEY, "faq.json"),
    (COMPARISON_PAGE_KEY, "comparison_page.json"),
];

/// One artifact written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub producer: String,
}

/// Write every artifact present on the blackboard as pretty JSON
///
/// Missing artifacts are logged and skipped.
pub fn save_artifacts(blackboard: &Blackboard, output_dir: &Path) -> Result<Vec<SavedArtifact>> {
    std::fs::create_dir_all(output_dir)?;

    let mut saved = Vec::with_capacity(ARTIFACTS.len());
    for (key, file_name) in ARTIFACTS {
        let Some(entry) = blackboard.get_entry(key) else {
            tracing::warn!("{}: not found", file_name);
            continue;
        };
        let path = output_dir.join(file_name);
        std::fs::write(&path, serde_json::to_string_pretty(&entry.value)?)?;
        tracing::info!("{}: produced by {}", path.display(), entry.owner);
        saved.push(SavedArtifact {
            path,
            producer: entry.owner,
        });
    }
    Ok(saved)
}
