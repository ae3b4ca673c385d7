//! Agents and the capability registry
//!
//! An [`Agent`] is the runtime every participant shares; an
//! [`AgentBehavior`] supplies its domain logic. The [`AgentRegistry`]
//! resolves capability names to the agents that provide them.

mod agent;
mod memory;
mod registry;
mod types;

pub use agent::{Agent, AgentBehavior, AgentContext, SharedAgent, DEFAULT_ORCHESTRATOR_ID};
pub use memory::{AgentMemory, Decision, Observation, Outcome, MAX_RESULT_CHARS};
pub use registry::AgentRegistry;
pub use types::{AgentCapability, AgentGoal, AgentState, PlanStep};
