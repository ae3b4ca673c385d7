//! Capability-indexed agent registry

use super::agent::SharedAgent;
use super::types::AgentState;
use crate::orchestration::Task;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
struct RegistryInner {
    /// Registration order
    agents: Vec<SharedAgent>,
    /// capability -> agent ids, in registration order
    capability_index: BTreeMap<String, Vec<String>>,
}

impl RegistryInner {
    fn get(&self, agent_id: &str) -> Option<&SharedAgent> {
        self.agents.iter().find(|a| a.id() == agent_id)
    }

    fn remove(&mut self, agent_id: &str) -> Option<SharedAgent> {
        let pos = self.agents.iter().position(|a| a.id() == agent_id)?;
        let agent = self.agents.remove(pos);
        for name in agent.capability_names() {
            if let Some(ids) = self.capability_index.get_mut(&name) {
                ids.retain(|id| id != agent_id);
            }
        }
        Some(agent)
    }
}

/// Registry of available agents and the capabilities they provide
#[derive(Default)]
pub struct AgentRegistry {
    inner: RwLock<RegistryInner>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under each of its capabilities
    ///
    /// Registering an id again replaces the earlier agent.
    pub fn register(&self, agent: SharedAgent) {
        let mut inner = self.inner.write();
        inner.remove(agent.id());
        for name in agent.capability_names() {
            inner
                .capability_index
                .entry(name)
                .or_default()
                .push(agent.id().to_string());
        }
        tracing::info!("Registered agent: {} ({})", agent.name(), agent.id());
        inner.agents.push(agent);
    }

    /// Remove an agent and every index entry pointing at it
    pub fn unregister(&self, agent_id: &str) -> Option<SharedAgent> {
        let removed = self.inner.write().remove(agent_id);
        if removed.is_some() {
            tracing::info!("Unregistered agent: {}", agent_id);
        }
        removed
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<SharedAgent> {
        self.inner.read().get(agent_id).cloned()
    }

    /// Every provider of `capability`, in registration order
    pub fn find_agents_by_capability(&self, capability: &str) -> Vec<SharedAgent> {
        let inner = self.inner.read();
        inner
            .capability_index
            .get(capability)
            .map(|ids| ids.iter().filter_map(|id| inner.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// First idle provider of `capability`, else the first provider at all
    pub fn find_best_agent(&self, capability: &str) -> Option<SharedAgent> {
        let candidates = self.find_agents_by_capability(capability);
        candidates
            .iter()
            .find(|a| a.state() == AgentState::Idle)
            .or_else(|| candidates.first())
            .cloned()
    }

    /// Best provider for the capability a task requires
    pub fn find_best_agent_for_task(&self, task: &Task) -> Option<SharedAgent> {
        self.find_best_agent(&task.required_capability)
    }

    pub fn all_agents(&self) -> Vec<SharedAgent> {
        self.inner.read().agents.clone()
    }

    /// Capabilities with at least one provider, sorted
    pub fn capabilities(&self) -> Vec<String> {
        self.inner
            .read()
            .capability_index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agent, AgentBehavior, AgentCapability, AgentGoal, PlanStep};
    use crate::Result;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Idle;

    impl AgentBehavior for Idle {
        fn plan(&self, _agent: &Agent, _goal: &AgentGoal) -> Option<Vec<PlanStep>> {
            None
        }

        fn execute(&self, _agent: &Agent, _plan: &[PlanStep], _goal: &AgentGoal) -> Result<bool> {
            Ok(false)
        }
    }

    fn agent(id: &str, caps: &[&str]) -> SharedAgent {
        Arc::new(Agent::new(
            id,
            id.to_uppercase(),
            "test agent",
            caps.iter().map(|c| AgentCapability::new(*c, "")).collect(),
            Idle,
        ))
    }

    fn ids(agents: &[SharedAgent]) -> Vec<&str> {
        agents.iter().map(|a| a.id()).collect()
    }

    #[test]
    fn test_capability_index_is_many_to_many() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", &["x", "y"]));
        registry.register(agent("b", &["y", "z"]));

        assert_eq!(ids(&registry.find_agents_by_capability("x")), vec!["a"]);
        assert_eq!(ids(&registry.find_agents_by_capability("y")), vec!["a", "b"]);
        assert!(registry.find_agents_by_capability("w").is_empty());
        assert_eq!(registry.capabilities(), vec!["x", "y", "z"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_clears_index() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", &["x", "shared"]));
        registry.register(agent("b", &["shared"]));

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());

        assert!(registry.find_agents_by_capability("x").is_empty());
        assert_eq!(ids(&registry.find_agents_by_capability("shared")), vec!["b"]);
        assert_eq!(registry.capabilities(), vec!["shared"]);
        assert!(registry.get_agent("a").is_none());
    }

    #[test]
    fn test_reregister_replaces() {
        let registry = AgentRegistry::new();
        registry.register(agent("a", &["x"]));
        registry.register(agent("a", &["y"]));

        assert_eq!(registry.len(), 1);
        assert!(registry.find_agents_by_capability("x").is_empty());
        assert_eq!(ids(&registry.find_agents_by_capability("y")), vec!["a"]);
    }

    #[test]
    fn test_best_agent_prefers_idle() {
        let registry = AgentRegistry::new();
        let busy = agent("busy", &["x"]);
        busy.set_state(AgentState::Executing);
        registry.register(Arc::clone(&busy));
        registry.register(agent("free", &["x"]));

        assert_eq!(registry.find_best_agent("x").unwrap().id(), "free");
        let task = Task::new("Do x", "x");
        assert_eq!(registry.find_best_agent_for_task(&task).unwrap().id(), "free");
    }

    #[test]
    fn test_best_agent_falls_back_to_busy() {
        let registry = AgentRegistry::new();
        let busy = agent("busy", &["x"]);
        busy.set_state(AgentState::Waiting);
        registry.register(busy);

        assert_eq!(registry.find_best_agent("x").unwrap().id(), "busy");
        assert!(registry.find_best_agent("nobody").is_none());
    }
}
