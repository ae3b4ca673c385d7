//! Task scheduling and workflow generation
//!
//! The [`Orchestrator`] routes tasks to agents by capability and releases
//! dependent tasks as their prerequisites complete. The
//! [`DynamicWorkflowGenerator`] derives those tasks from requested outputs.

mod orchestrator;
mod task;
mod workflow;

pub use orchestrator::{AgentStatus, Orchestrator, SystemStatus, WorkflowCallback, WorkflowReport};
pub use task::{Task, TaskStatus, WorkflowDefinition};
pub use workflow::{CapabilityGraph, DynamicWorkflowGenerator};
