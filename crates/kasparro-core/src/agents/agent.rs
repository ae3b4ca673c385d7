//! Agent runtime
//!
//! [`Agent`] owns everything common to every agent: identity, state, goal
//! queue, memory, inbox and the links to the bus and blackboard. What an
//! agent actually does lives behind [`AgentBehavior`].
//!
//! An agent never holds its own lock while planning, executing or
//! publishing, so behaviors may call back into the agent and the bus may
//! deliver to it re-entrantly.

use super::memory::AgentMemory;
use super::types::{AgentCapability, AgentGoal, AgentState, PlanStep};
use crate::blackboard::Blackboard;
use crate::error::{KasparroError, Result};
use crate::messaging::{Message, MessageBus, MessageType};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// Default bus id agents report goal outcomes to
pub const DEFAULT_ORCHESTRATOR_ID: &str = "orchestrator";

/// Agent shared between the registry and the bus
pub type SharedAgent = Arc<Agent>;

/// Domain behavior plugged into an [`Agent`]
pub trait AgentBehavior: Send + Sync {
    /// Turn a goal into steps; `None` (or no steps) fails the goal
    fn plan(&self, agent: &Agent, goal: &AgentGoal) -> Option<Vec<PlanStep>>;

    /// Run a plan; `Ok(false)` and `Err` both fail the goal
    fn execute(&self, agent: &Agent, plan: &[PlanStep], goal: &AgentGoal) -> Result<bool>;

    /// Messages not handled by the default routing
    fn on_message(&self, _agent: &Agent, _message: &Message) -> Result<()> {
        Ok(())
    }

    /// Service a task delegated by a peer
    ///
    /// The returned value is sent back as `DATA_RESPONSE`; an error is sent
    /// back as `TASK_FAILED`.
    fn on_task_request(
        &self,
        _agent: &Agent,
        task: &str,
        _params: &Value,
        _message: &Message,
    ) -> Result<Value> {
        Err(KasparroError::invalid_operation(format!(
            "Unsupported task: {}",
            task
        )))
    }
}

/// Shared services handed to an agent on connect
#[derive(Clone)]
pub struct AgentContext {
    pub bus: Arc<MessageBus>,
    pub blackboard: Arc<Blackboard>,
    /// Where goal outcomes are reported
    pub orchestrator_id: String,
}

impl AgentContext {
    pub fn new(bus: Arc<MessageBus>, blackboard: Arc<Blackboard>) -> Self {
        Self {
            bus,
            blackboard,
            orchestrator_id: DEFAULT_ORCHESTRATOR_ID.to_string(),
        }
    }

    pub fn with_orchestrator_id(mut self, id: impl Into<String>) -> Self {
        self.orchestrator_id = id.into();
        self
    }
}

/// Non-owning links; the orchestrator owns the bus and blackboard
struct Links {
    bus: Weak<MessageBus>,
    blackboard: Weak<Blackboard>,
    orchestrator_id: String,
}

struct AgentCore {
    state: AgentState,
    current_goal: Option<AgentGoal>,
    goal_queue: Vec<AgentGoal>,
    /// A `process_goals` loop is running
    processing: bool,
    memory: AgentMemory,
    inbox: Vec<Message>,
}

/// An autonomous agent
pub struct Agent {
    id: String,
    name: String,
    description: String,
    capabilities: Vec<AgentCapability>,
    behavior: Box<dyn AgentBehavior>,
    core: Mutex<AgentCore>,
    links: RwLock<Option<Links>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("capabilities", &self.capability_names())
            .finish()
    }
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        capabilities: Vec<AgentCapability>,
        behavior: impl AgentBehavior + 'static,
    ) -> Self {
        let agent = Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            capabilities,
            behavior: Box::new(behavior),
            core: Mutex::new(AgentCore {
                state: AgentState::Idle,
                current_goal: None,
                goal_queue: Vec::new(),
                processing: false,
                memory: AgentMemory::new(),
                inbox: Vec::new(),
            }),
            links: RwLock::new(None),
        };
        tracing::debug!(
            agent = %agent.id,
            capabilities = ?agent.capability_names(),
            "Agent initialized"
        );
        agent
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn capabilities(&self) -> &[AgentCapability] {
        &self.capabilities
    }

    pub fn capability_names(&self) -> Vec<String> {
        self.capabilities.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == name)
    }

    pub fn state(&self) -> AgentState {
        self.core.lock().state
    }

    /// Force a state, e.g. `Suspended` from outside the agent
    pub fn set_state(&self, state: AgentState) {
        let mut core = self.core.lock();
        self.transition(&mut core, state);
    }

    /// Leave `Suspended` and work through any goals queued meanwhile
    pub fn resume(&self) {
        let start = {
            let mut core = self.core.lock();
            if core.state != AgentState::Suspended {
                return;
            }
            self.transition(&mut core, AgentState::Idle);
            if core.goal_queue.is_empty() || core.processing {
                false
            } else {
                core.processing = true;
                self.transition(&mut core, AgentState::Thinking);
                true
            }
        };
        if start {
            self.process_goals();
        }
    }

    pub fn current_goal(&self) -> Option<AgentGoal> {
        self.core.lock().current_goal.clone()
    }

    /// Goals waiting behind the current one
    pub fn queued_goals(&self) -> usize {
        self.core.lock().goal_queue.len()
    }

    /// Copy of the agent's memory
    pub fn memory(&self) -> AgentMemory {
        self.core.lock().memory.clone()
    }

    /// Every message delivered to this agent so far
    pub fn inbox(&self) -> Vec<Message> {
        self.core.lock().inbox.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.links.read().is_some()
    }

    fn transition(&self, core: &mut AgentCore, state: AgentState) {
        if core.state != state {
            tracing::debug!(agent = %self.id, "State transition: {} -> {}", core.state, state);
        }
        core.state = state;
    }

    // ----- connection -----

    /// Join the system: subscribe to directed messages and keep handles
    /// to the bus and blackboard
    pub fn connect(self: &Arc<Self>, context: &AgentContext) {
        if self.is_connected() {
            self.disconnect();
        }

        let agent = Arc::downgrade(self);
        context.bus.subscribe(
            self.id.clone(),
            Arc::new(move |message: &Message| -> Result<()> {
                match agent.upgrade() {
                    Some(agent) => agent.handle_message(message),
                    None => Ok(()),
                }
            }),
        );

        *self.links.write() = Some(Links {
            bus: Arc::downgrade(&context.bus),
            blackboard: Arc::downgrade(&context.blackboard),
            orchestrator_id: context.orchestrator_id.clone(),
        });
        tracing::info!(agent = %self.id, "Agent '{}' connected", self.name);
    }

    /// Leave the system
    pub fn disconnect(&self) {
        let links = self.links.write().take();
        if let Some(bus) = links.and_then(|l| l.bus.upgrade()) {
            bus.unsubscribe(&self.id);
        }
        tracing::info!(agent = %self.id, "Agent '{}' disconnected", self.name);
    }

    fn bus(&self) -> Option<Arc<MessageBus>> {
        self.links.read().as_ref().and_then(|l| l.bus.upgrade())
    }

    fn blackboard(&self) -> Option<Arc<Blackboard>> {
        self.links.read().as_ref().and_then(|l| l.blackboard.upgrade())
    }

    fn orchestrator_id(&self) -> String {
        self.links
            .read()
            .as_ref()
            .map(|l| l.orchestrator_id.clone())
            .unwrap_or_else(|| DEFAULT_ORCHESTRATOR_ID.to_string())
    }

    // ----- communication -----

    /// Publish a message; a no-op while disconnected
    pub fn send(&self, message: Message) {
        let Some(bus) = self.bus() else {
            tracing::warn!(agent = %self.id, "Cannot send message: not connected to message bus");
            return;
        };
        tracing::debug!(
            agent = %self.id,
            "Sent {} to {}",
            message.message_type,
            message.recipient.as_deref().unwrap_or("broadcast")
        );
        bus.publish(message);
    }

    /// Send a message from this agent; `None` broadcasts
    pub fn send_message(&self, message_type: MessageType, recipient: Option<&str>, content: Value) {
        self.send(Message::new(
            message_type,
            self.id.clone(),
            recipient.map(str::to_string),
            content,
        ));
    }

    /// Answer `message`, addressed to its sender and correlated with it
    pub fn reply_to(&self, message: &Message, message_type: MessageType, content: Value) {
        self.send(
            Message::directed(message_type, self.id.clone(), message.sender.clone(), content)
                .with_correlation(message.id.clone())
                .with_priority(message.priority),
        );
    }

    /// Post to the blackboard as this agent; a no-op while disconnected
    pub fn post_to_blackboard(&self, key: &str, value: Value, tags: &[&str]) {
        let Some(blackboard) = self.blackboard() else {
            tracing::warn!(agent = %self.id, "Cannot post: not connected to blackboard");
            return;
        };
        blackboard.post(key, value, &self.id, tags.iter().copied());
        tracing::debug!(agent = %self.id, "Posted '{}' to blackboard", key);
    }

    /// Serialize and post a value
    pub fn post_serialized<T: Serialize>(&self, key: &str, value: &T, tags: &[&str]) -> Result<()> {
        self.post_to_blackboard(key, serde_json::to_value(value)?, tags);
        Ok(())
    }

    pub fn read_from_blackboard(&self, key: &str) -> Option<Value> {
        self.blackboard().and_then(|b| b.get(key))
    }

    /// Read and decode a blackboard value
    pub fn read_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.blackboard() {
            Some(blackboard) => blackboard.get_as(key),
            None => Ok(None),
        }
    }

    /// Ask any capable peer for help and wait
    pub fn request_assistance(&self, task: &str, required_capability: &str) {
        self.set_state(AgentState::Waiting);
        self.send_message(
            MessageType::NeedAssistance,
            None,
            json!({
                "requesting_agent": self.id,
                "task": task,
                "required_capability": required_capability,
            }),
        );
        tracing::info!(agent = %self.id, "Requested assistance for: {}", task);
    }

    // ----- memory -----

    pub fn record_observation(&self, observation: Value) {
        self.core.lock().memory.record_observation(observation);
    }

    pub fn record_decision(&self, decision: impl Into<String>, reasoning: impl Into<String>) {
        self.core.lock().memory.record_decision(decision, reasoning);
    }

    pub fn record_outcome(&self, action: impl Into<String>, success: bool, result: Option<&str>) {
        self.core.lock().memory.record_outcome(action, success, result);
    }

    // ----- message routing -----

    fn handle_message(&self, message: &Message) -> Result<()> {
        self.core.lock().inbox.push(message.clone());
        tracing::debug!(
            agent = %self.id,
            "Received message: {} from {}",
            message.message_type,
            message.sender
        );

        match message.message_type {
            MessageType::GoalAssigned => self.handle_goal_assignment(message),
            MessageType::DataRequest => {
                self.handle_data_request(message);
                Ok(())
            }
            MessageType::TaskRequest => {
                self.handle_task_request(message);
                Ok(())
            }
            MessageType::CapabilityQuery => self.handle_capability_query(message),
            _ => self.behavior.on_message(self, message),
        }
    }

    fn handle_goal_assignment(&self, message: &Message) -> Result<()> {
        let Some(payload) = message.get("goal") else {
            tracing::warn!(
                agent = %self.id,
                from = %message.sender,
                "Goal assignment without a goal"
            );
            return Ok(());
        };
        let goal: AgentGoal = serde_json::from_value(payload.clone()).map_err(|e| {
            KasparroError::message(format!("Malformed goal from {}: {}", message.sender, e))
        })?;
        self.assign_goal(goal);
        Ok(())
    }

    fn handle_data_request(&self, message: &Message) {
        let Some(key) = message.get_str("data_key") else {
            return;
        };
        let Some(blackboard) = self.blackboard() else {
            return;
        };
        let data = blackboard.get(key).unwrap_or(Value::Null);
        self.reply_to(
            message,
            MessageType::DataResponse,
            json!({ "data_key": key, "data": data }),
        );
    }

    fn handle_task_request(&self, message: &Message) {
        let task = message.get_str("task").unwrap_or_default().to_string();
        let params = message.get("params").cloned().unwrap_or_else(|| json!({}));

        self.record_observation(json!({
            "type": "task_request",
            "from": message.sender,
            "task": task,
            "params": params,
        }));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.behavior.on_task_request(self, &task, &params, message)
        }));

        match outcome {
            Ok(Ok(result)) => self.reply_to(
                message,
                MessageType::DataResponse,
                json!({ "task": task, "result": result, "success": true }),
            ),
            Ok(Err(e)) => {
                tracing::warn!(agent = %self.id, task = %task, "Task request failed: {}", e);
                self.reply_to(
                    message,
                    MessageType::TaskFailed,
                    json!({ "task": task, "reason": e.to_string() }),
                );
            }
            Err(_) => {
                tracing::error!(agent = %self.id, task = %task, "Task request panicked");
                self.reply_to(
                    message,
                    MessageType::TaskFailed,
                    json!({ "task": task, "reason": "Task request panicked" }),
                );
            }
        }
    }

    fn handle_capability_query(&self, message: &Message) -> Result<()> {
        let capabilities = serde_json::to_value(&self.capabilities)?;
        self.reply_to(
            message,
            MessageType::CapabilityResponse,
            json!({ "agent_id": self.id, "capabilities": capabilities }),
        );
        Ok(())
    }

    // ----- goal processing -----

    /// Queue a goal; an idle or waiting agent starts on it and drains its
    /// queue before returning
    pub fn assign_goal(&self, goal: AgentGoal) {
        let start = {
            let mut core = self.core.lock();
            tracing::info!(agent = %self.id, "Goal assigned: {}", goal.description);
            core.goal_queue.push(goal);
            let ready = matches!(core.state, AgentState::Idle | AgentState::Waiting);
            if ready && !core.processing {
                core.processing = true;
                self.transition(&mut core, AgentState::Thinking);
                true
            } else {
                false
            }
        };
        if start {
            self.process_goals();
        }
    }

    fn process_goals(&self) {
        loop {
            let goal = {
                let mut core = self.core.lock();
                if core.goal_queue.is_empty() {
                    core.current_goal = None;
                    core.processing = false;
                    self.transition(&mut core, AgentState::Idle);
                    return;
                }
                // Stable: equal priorities keep their queue order
                core.goal_queue.sort_by_key(|g| g.priority);
                let goal = core.goal_queue.remove(0);
                core.current_goal = Some(goal.clone());
                self.transition(&mut core, AgentState::Thinking);
                goal
            };

            tracing::info!(agent = %self.id, "Processing goal: {}", goal.description);
            match self.pursue(&goal) {
                Ok(()) => {
                    self.set_state(AgentState::Completed);
                    self.report_goal_complete(&goal);
                }
                Err(reason) => {
                    self.set_state(AgentState::Failed);
                    self.report_goal_failed(&goal, &reason);
                }
            }
            self.core.lock().current_goal = None;
        }
    }

    /// Plan and execute one goal; the error is the failure reason
    fn pursue(&self, goal: &AgentGoal) -> std::result::Result<(), String> {
        let plan = panic::catch_unwind(AssertUnwindSafe(|| self.behavior.plan(self, goal)))
            .ok()
            .flatten()
            .filter(|steps| !steps.is_empty())
            .ok_or_else(|| "Failed to create plan".to_string())?;

        self.record_decision(
            format!("Execute plan for: {}", goal.description),
            format!("Generated {} steps", plan.len()),
        );
        self.set_state(AgentState::Executing);

        match panic::catch_unwind(AssertUnwindSafe(|| self.behavior.execute(self, &plan, goal))) {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err("Execution failed".to_string()),
            Ok(Err(e)) => {
                tracing::error!(agent = %self.id, goal = %goal.id, "Execution error: {}", e);
                Err(format!("Execution failed: {}", e))
            }
            Err(_) => {
                tracing::error!(agent = %self.id, goal = %goal.id, "Execution panicked");
                Err("Execution panicked".to_string())
            }
        }
    }

    fn report_goal_complete(&self, goal: &AgentGoal) {
        self.record_outcome(goal.description.clone(), true, None);
        let orchestrator = self.orchestrator_id();
        self.send_message(
            MessageType::GoalComplete,
            Some(&orchestrator),
            json!({ "goal_id": goal.id, "agent_id": self.id, "success": true }),
        );
    }

    fn report_goal_failed(&self, goal: &AgentGoal, reason: &str) {
        self.record_outcome(goal.description.clone(), false, Some(reason));
        let orchestrator = self.orchestrator_id();
        self.send_message(
            MessageType::GoalComplete,
            Some(&orchestrator),
            json!({
                "goal_id": goal.id,
                "agent_id": self.id,
                "success": false,
                "reason": reason,
            }),
        );
    }
}
