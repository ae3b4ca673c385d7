//! Agent data types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    /// Ready to accept goals
    Idle,
    /// Planning the current goal
    Thinking,
    /// Running a plan
    Executing,
    /// Asked peers for help; needs a fresh goal to resume
    Waiting,
    /// Last goal succeeded
    Completed,
    /// Last goal failed
    Failed,
    /// Paused from outside
    Suspended,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "IDLE",
            AgentState::Thinking => "THINKING",
            AgentState::Executing => "EXECUTING",
            AgentState::Waiting => "WAITING",
            AgentState::Completed => "COMPLETED",
            AgentState::Failed => "FAILED",
            AgentState::Suspended => "SUSPENDED",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named unit of functionality an agent advertises
///
/// Input and output types are documentation only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapability {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input_types: Vec<String>,
    #[serde(default)]
    pub output_types: Vec<String>,
}

impl AgentCapability {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_types: Vec::new(),
            output_types: Vec::new(),
        }
    }

    /// Set the documented input and output types
    pub fn with_types(mut self, inputs: &[&str], outputs: &[&str]) -> Self {
        self.input_types = inputs.iter().map(|s| s.to_string()).collect();
        self.output_types = outputs.iter().map(|s| s.to_string()).collect();
        self
    }
}

fn default_goal_priority() -> u8 {
    5
}

/// A unit of work handed to a single agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentGoal {
    pub id: String,
    pub description: String,

    /// Lower is more urgent
    #[serde(default = "default_goal_priority")]
    pub priority: u8,

    #[serde(default)]
    pub deadline: Option<DateTime<Local>>,

    /// Ids of goals this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Free-form parameters
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl AgentGoal {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority: default_goal_priority(),
            deadline: None,
            dependencies: Vec::new(),
            context: Map::new(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// String value from the goal context
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

/// One step of an agent's plan, interpreted only by that agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

impl PlanStep {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Value::Object(Map::new()),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}
