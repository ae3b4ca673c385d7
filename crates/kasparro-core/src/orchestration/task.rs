//! Schedulable tasks and workflows

use crate::agents::AgentGoal;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Scheduling state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Waiting for an agent
    Pending,
    /// Handed to an agent
    Assigned,
    /// Being executed
    InProgress,
    Completed,
    Failed,
    /// Waiting on dependencies
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Assigned => "ASSIGNED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Blocked => "BLOCKED",
        }
    }

    /// Whether the task has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of schedulable work, routed by capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required_capability: String,
    /// 1 = most urgent, 10 = least
    pub priority: u8,
    pub status: TaskStatus,
    pub assigned_agent: Option<String>,
    /// Ids of tasks that must complete first
    pub dependencies: Vec<String>,
    pub context: Map<String, Value>,
    pub result: Option<Value>,
    pub created_at: DateTime<Local>,
    pub started_at: Option<DateTime<Local>>,
    pub completed_at: Option<DateTime<Local>>,
}

impl Task {
    /// Create a pending task with a fresh id
    pub fn new(name: impl Into<String>, required_capability: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4().to_string(),
            description: name.clone(),
            name,
            required_capability: required_capability.into(),
            priority: 5,
            status: TaskStatus::Pending,
            assigned_agent: None,
            dependencies: Vec::new(),
            context: Map::new(),
            result: None,
            created_at: Local::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the priority, clamped into 1..=10
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// The goal an agent receives for this task
    pub fn to_goal(&self) -> AgentGoal {
        AgentGoal {
            id: self.id.clone(),
            description: self.description.clone(),
            priority: self.priority,
            deadline: None,
            dependencies: self.dependencies.clone(),
            context: self.context.clone(),
        }
    }
}

/// A named set of tasks submitted and tracked together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tasks: Vec<Task>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            tasks,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id.as_str()).collect()
    }
}
