//! Per-agent audit trail
//!
//! Append-only; nothing reads it back to make decisions.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest outcome result kept, in characters
pub const MAX_RESULT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub data: Value,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: String,
    pub reasoning: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub action: String,
    pub success: bool,
    pub result: Option<String>,
    pub timestamp: DateTime<Local>,
}

/// Observations, decisions and outcomes recorded by one agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMemory {
    pub observations: Vec<Observation>,
    pub decisions: Vec<Decision>,
    pub outcomes: Vec<Outcome>,
}

impl AgentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_observation(&mut self, data: Value) {
        self.observations.push(Observation {
            data,
            timestamp: Local::now(),
        });
    }

    pub fn record_decision(&mut self, decision: impl Into<String>, reasoning: impl Into<String>) {
        self.decisions.push(Decision {
            decision: decision.into(),
            reasoning: reasoning.into(),
            timestamp: Local::now(),
        });
    }

    /// Record an action's outcome; empty results are stored as `None`
    pub fn record_outcome(
        &mut self,
        action: impl Into<String>,
        success: bool,
        result: Option<&str>,
    ) {
        let result = result
            .filter(|r| !r.is_empty())
            .map(|r| r.chars().take(MAX_RESULT_CHARS).collect());
        self.outcomes.push(Outcome {
            action: action.into(),
            success,
            result,
            timestamp: Local::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_result_is_truncated() {
        let mut memory = AgentMemory::new();
        let long = "é".repeat(MAX_RESULT_CHARS + 20);
        memory.record_outcome("parse", true, Some(&long));

        let stored = memory.outcomes[0].result.as_ref().unwrap();
        assert_eq!(stored.chars().count(), MAX_RESULT_CHARS);
    }

    #[test]
    fn test_empty_result_is_none() {
        let mut memory = AgentMemory::new();
        memory.record_outcome("publish", true, Some(""));
        memory.record_outcome("publish", true, None);
        assert!(memory.outcomes.iter().all(|o| o.result.is_none()));
    }

    #[test]
    fn test_records_accumulate() {
        let mut memory = AgentMemory::new();
        memory.record_observation(json!({"type": "task_request"}));
        memory.record_decision("Parse file", "No raw text given");
        memory.record_decision("Validate", "Always");

        assert_eq!(memory.observations.len(), 1);
        assert_eq!(memory.decisions.len(), 2);
        assert_eq!(memory.decisions[1].decision, "Validate");
    }
}
