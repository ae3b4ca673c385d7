//! Kasparro Core - multi-agent coordination substrate
//!
//! This crate provides the pieces autonomous agents cooperate through:
//! - Message bus (directed and broadcast delivery, bounded history)
//! - Blackboard (versioned shared key-value store with watchers)
//! - Agent runtime and capability registry
//! - Orchestrator (dependency-aware, capability-routed scheduling)
//! - Dynamic workflow generation
//! - Configuration loading and logging initialisation
//!
//! It knows nothing about what agents produce; concrete agents plug in
//! through the [`AgentBehavior`] trait.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   submit ──────→│         Orchestrator         │──→ workflow report
//!                 │  queue / active / completed  │
//!                 └──────┬───────────────▲───────┘
//!            GOAL_ASSIGNED│               │GOAL_COMPLETE
//!                 ┌──────▼───────────────┴───────┐
//!                 │          MessageBus          │
//!                 └──────┬───────────────▲───────┘
//!                 ┌──────▼───────┐ ┌─────┴────────┐
//!                 │   Agent A    │ │   Agent B    │
//!                 └──────┬───────┘ └─────┬────────┘
//!                 ┌──────▼───────────────▼───────┐
//!                 │          Blackboard          │
//!                 └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kasparro_core::{DynamicWorkflowGenerator, Orchestrator};
//!
//! let orchestrator = Orchestrator::new();
//! orchestrator.register_agent(my_agent);
//!
//! let generator = DynamicWorkflowGenerator::default();
//! let workflow = generator.generate_for(&orchestrator, &outputs, &context);
//! let (_, reports) = orchestrator.submit_workflow_reporting(workflow);
//! let report = reports.recv()?;
//! ```

pub mod agents;
pub mod blackboard;
pub mod config;
pub mod error;
pub mod messaging;
pub mod orchestration;
pub mod telemetry;

pub use error::{KasparroError, Result};

// Re-export config types
pub use config::{load_config, load_from_file, KasparroConfig, LoggingConfig, WorkflowConfig};

// Re-export messaging types
pub use messaging::{Message, MessageBus, MessageHandler, MessageType};

pub use blackboard::{Blackboard, BlackboardEntry, Watcher, WatcherId};

// Re-export agent types
pub use agents::{
    Agent, AgentBehavior, AgentCapability, AgentContext, AgentGoal, AgentMemory, AgentRegistry,
    AgentState, PlanStep, SharedAgent,
};

// Re-export orchestration types
pub use orchestration::{
    CapabilityGraph, DynamicWorkflowGenerator, Orchestrator, SystemStatus, Task, TaskStatus,
    WorkflowCallback, WorkflowDefinition, WorkflowReport,
};

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
