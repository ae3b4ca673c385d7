//! Capability-routed, dependency-aware task scheduler
//!
//! The orchestrator owns the bus and blackboard, hands tasks to agents as
//! goals and reacts to their `GOAL_COMPLETE` reports. Everything is driven
//! synchronously from bus deliveries: an agent that finishes inside
//! `publish` re-enters the orchestrator before `publish` returns. The
//! schedule lock is therefore never held while publishing or calling back.

use super::task::{Task, TaskStatus, WorkflowDefinition};
use crate::agents::{AgentContext, AgentRegistry, SharedAgent};
use crate::blackboard::Blackboard;
use crate::config::KasparroConfig;
use crate::error::Result;
use crate::messaging::{
    Message, MessageBus, MessageType, DEFAULT_HISTORY_CAPACITY, DEFAULT_PRIORITY,
};
use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Called once with the workflow and its failed tasks when every task has
/// finished
pub type WorkflowCallback = Box<dyn FnOnce(&WorkflowDefinition, &[Task]) + Send>;

/// Outcome of a finished workflow, as sent over a report channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub workflow_id: String,
    pub workflow_name: String,
    pub failed: Vec<Task>,
}

impl WorkflowReport {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One agent in [`SystemStatus`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: String,
    pub name: String,
    pub state: String,
    pub capabilities: Vec<String>,
}

/// Read-only view over the registry and the task collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub registered_agents: usize,
    pub available_capabilities: Vec<String>,
    pub pending_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub agents: Vec<AgentStatus>,
}

struct TrackedWorkflow {
    definition: WorkflowDefinition,
    on_complete: Option<WorkflowCallback>,
}

#[derive(Default)]
struct Schedule {
    /// Not yet assigned, in submission order
    queue: Vec<Task>,
    active: HashMap<String, Task>,
    completed: HashMap<String, Task>,
    workflow: Option<TrackedWorkflow>,
}

impl Schedule {
    fn dependencies_met(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|dep| {
            self.completed
                .get(dep)
                .is_some_and(|t| t.status == TaskStatus::Completed)
        })
    }

    fn enqueue(&mut self, task: Task) {
        // A resubmitted id starts over
        self.completed.remove(&task.id);
        self.queue.push(task);
    }

    fn find(&self, task_id: &str) -> Option<&Task> {
        self.active
            .get(task_id)
            .or_else(|| self.completed.get(task_id))
            .or_else(|| self.queue.iter().find(|t| t.id == task_id))
    }

    /// Move an active task to completed with the given final status
    fn finish(&mut self, task_id: &str, status: TaskStatus, result: Option<Value>) -> bool {
        let Some(mut task) = self.active.remove(task_id) else {
            return false;
        };
        task.status = status;
        task.completed_at = Some(Local::now());
        if status == TaskStatus::Completed {
            task.result = result;
        }
        self.completed.insert(task.id.clone(), task);
        true
    }
}

/// Coordinates agents: assignment, dependency resolution, failure and
/// assistance handling
pub struct Orchestrator {
    id: String,
    default_priority: u8,
    registry: AgentRegistry,
    bus: Arc<MessageBus>,
    blackboard: Arc<Blackboard>,
    schedule: Mutex<Schedule>,
}

impl Orchestrator {
    /// Create an orchestrator with default settings
    pub fn new() -> Arc<Self> {
        Self::build("orchestrator", DEFAULT_PRIORITY, DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an orchestrator from configuration
    pub fn from_config(config: &KasparroConfig) -> Arc<Self> {
        Self::build(
            &config.orchestrator.id,
            config.orchestrator.default_priority,
            config.bus.history_capacity,
        )
    }

    fn build(id: &str, default_priority: u8, history_capacity: usize) -> Arc<Self> {
        let orchestrator = Arc::new(Self {
            id: id.to_string(),
            default_priority,
            registry: AgentRegistry::new(),
            bus: Arc::new(MessageBus::new(history_capacity)),
            blackboard: Arc::new(Blackboard::new()),
            schedule: Mutex::new(Schedule::default()),
        });

        let weak = Arc::downgrade(&orchestrator);
        orchestrator.bus.subscribe(
            id,
            Arc::new(move |message: &Message| -> Result<()> {
                if let Some(orchestrator) = weak.upgrade() {
                    orchestrator.handle_message(message);
                }
                Ok(())
            }),
        );

        let weak = Arc::downgrade(&orchestrator);
        orchestrator
            .bus
            .subscribe_broadcast(Arc::new(move |message: &Message| -> Result<()> {
                if let Some(orchestrator) = weak.upgrade() {
                    orchestrator.handle_broadcast(message);
                }
                Ok(())
            }));

        tracing::info!(id, "Orchestrator initialized");
        orchestrator
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn blackboard(&self) -> &Arc<Blackboard> {
        &self.blackboard
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Context agents are connected with
    pub fn agent_context(&self) -> AgentContext {
        AgentContext::new(Arc::clone(&self.bus), Arc::clone(&self.blackboard))
            .with_orchestrator_id(self.id.clone())
    }

    // ----- agent lifecycle -----

    /// Register an agent and connect it to the bus and blackboard
    pub fn register_agent(&self, agent: SharedAgent) {
        self.registry.register(Arc::clone(&agent));
        agent.connect(&self.agent_context());
    }

    /// Disconnect and unregister an agent
    pub fn unregister_agent(&self, agent_id: &str) {
        if let Some(agent) = self.registry.get_agent(agent_id) {
            agent.disconnect();
            self.registry.unregister(agent_id);
        }
    }

    // ----- submission -----

    /// Queue a single task and try to assign it straight away
    pub fn submit_task(&self, task: Task) -> String {
        let id = task.id.clone();
        tracing::info!(
            "Task submitted: {} (requires: {})",
            task.name,
            task.required_capability
        );
        self.schedule.lock().enqueue(task);
        self.assign_pending_tasks();
        id
    }

    /// Queue every task of a workflow and track its completion
    ///
    /// Only one workflow is tracked; submitting another replaces the
    /// tracking of the previous one, whose dispatched tasks keep running.
    pub fn submit_workflow(
        &self,
        workflow: WorkflowDefinition,
        on_complete: Option<WorkflowCallback>,
    ) -> String {
        let id = workflow.id.clone();
        tracing::info!("Workflow submitted: {}", workflow.name);
        tracing::info!("  - Tasks: {}", workflow.tasks.len());
        {
            let mut schedule = self.schedule.lock();
            if let Some(previous) = &schedule.workflow {
                tracing::warn!(
                    "Workflow '{}' replaces '{}' before it completed",
                    workflow.name,
                    previous.definition.name
                );
            }
            for task in &workflow.tasks {
                schedule.enqueue(task.clone());
            }
            schedule.workflow = Some(TrackedWorkflow {
                definition: workflow,
                on_complete,
            });
        }

        self.assign_pending_tasks();
        self.check_workflow_completion();
        id
    }

    /// Submit a workflow whose report arrives on the returned channel
    pub fn submit_workflow_reporting(
        &self,
        workflow: WorkflowDefinition,
    ) -> (String, Receiver<WorkflowReport>) {
        let (tx, rx): (Sender<WorkflowReport>, Receiver<WorkflowReport>) =
            crossbeam_channel::bounded(1);
        let callback: WorkflowCallback =
            Box::new(move |workflow: &WorkflowDefinition, failed: &[Task]| {
                let report = WorkflowReport {
                    workflow_id: workflow.id.clone(),
                    workflow_name: workflow.name.clone(),
                    failed: failed.to_vec(),
                };
                if tx.send(report).is_err() {
                    tracing::warn!("Workflow report receiver dropped");
                }
            });
        let id = self.submit_workflow(workflow, Some(callback));
        (id, rx)
    }

    // ----- scheduling -----

    /// One pass over the queue in submission order
    fn assign_pending_tasks(&self) {
        let snapshot: Vec<String> = self
            .schedule
            .lock()
            .queue
            .iter()
            .map(|t| t.id.clone())
            .collect();

        for task_id in snapshot {
            if let Some(message) = self.try_assign(&task_id) {
                self.bus.publish(message);
            }
        }
    }

    /// Assign one queued task if possible; returns the goal message to send
    fn try_assign(&self, task_id: &str) -> Option<Message> {
        let mut schedule = self.schedule.lock();
        // Gone if a nested pass already assigned it
        let pos = schedule.queue.iter().position(|t| t.id == task_id)?;

        if !schedule.dependencies_met(&schedule.queue[pos]) {
            schedule.queue[pos].status = TaskStatus::Blocked;
            return None;
        }

        let Some(agent) = self.registry.find_best_agent_for_task(&schedule.queue[pos]) else {
            tracing::warn!("No agent available for task: {}", schedule.queue[pos].name);
            return None;
        };

        let mut task = schedule.queue.remove(pos);
        task.status = TaskStatus::Assigned;
        task.assigned_agent = Some(agent.id().to_string());
        task.started_at = Some(Local::now());

        let goal = task.to_goal();
        let message = Message::directed(
            MessageType::GoalAssigned,
            self.id.clone(),
            agent.id(),
            json!({ "goal": goal }),
        )
        .with_priority(task.priority);

        tracing::info!("Assigned task '{}' to {}", task.name, agent.name());
        schedule.active.insert(task.id.clone(), task);
        Some(message)
    }

    /// Unblock tasks whose dependencies are now satisfied, then assign
    fn process_unblocked_tasks(&self) {
        {
            let mut schedule = self.schedule.lock();
            let ready: Vec<usize> = schedule
                .queue
                .iter()
                .enumerate()
                .filter(|(_, t)| t.status == TaskStatus::Blocked && schedule.dependencies_met(t))
                .map(|(i, _)| i)
                .collect();
            for i in ready {
                tracing::debug!("Task unblocked: {}", schedule.queue[i].name);
                schedule.queue[i].status = TaskStatus::Pending;
            }
        }
        self.assign_pending_tasks();
    }

    fn check_workflow_completion(&self) {
        let (workflow, failed, on_complete) = {
            let mut schedule = self.schedule.lock();
            let complete = match &schedule.workflow {
                Some(tracked) => tracked
                    .definition
                    .tasks
                    .iter()
                    .all(|t| schedule.completed.contains_key(&t.id)),
                None => return,
            };
            if !complete {
                return;
            }
            let Some(tracked) = schedule.workflow.take() else {
                return;
            };
            let failed: Vec<Task> = tracked
                .definition
                .tasks
                .iter()
                .filter_map(|t| schedule.completed.get(&t.id))
                .filter(|t| t.status == TaskStatus::Failed)
                .cloned()
                .collect();
            (tracked.definition, failed, tracked.on_complete)
        };

        if failed.is_empty() {
            tracing::info!("Workflow '{}' completed successfully!", workflow.name);
        } else {
            tracing::warn!("Workflow completed with {} failed tasks", failed.len());
        }

        if let Some(callback) = on_complete {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(&workflow, &failed))).is_err() {
                tracing::error!(workflow = %workflow.id, "Workflow callback panicked");
            }
        }
    }

    // ----- message handling -----

    fn handle_message(&self, message: &Message) {
        // Broadcasts reach this handler too; they go through handle_broadcast
        if message.is_broadcast() {
            return;
        }
        match message.message_type {
            MessageType::GoalComplete => self.handle_goal_complete(message),
            MessageType::TaskFailed => self.handle_task_failed(message),
            MessageType::StatusUpdate => {
                let status = message.get("status").cloned().unwrap_or(serde_json::Value::Null);
                tracing::debug!(
                    "Agent {} status: {}",
                    message.get_str("agent_id").unwrap_or("unknown"),
                    status
                );
            }
            _ => {}
        }
    }

    fn handle_broadcast(&self, message: &Message) {
        if message.message_type == MessageType::NeedAssistance {
            self.handle_assistance_request(message);
        }
    }

    fn handle_goal_complete(&self, message: &Message) {
        let Some(goal_id) = message.get_str("goal_id") else {
            tracing::warn!(from = %message.sender, "Goal report without goal_id");
            return;
        };
        let success = message.get_bool("success").unwrap_or(false);
        let agent_id = message.get_str("agent_id").unwrap_or(&message.sender);

        if success {
            tracing::info!("Goal {} completed by {}: Success", goal_id, agent_id);
        } else {
            tracing::warn!(
                "Goal {} completed by {}: Failed ({})",
                goal_id,
                agent_id,
                message.get_str("reason").unwrap_or("no reason given")
            );
        }

        let result = if success {
            self.blackboard.get(&format!("result_{}", goal_id))
        } else {
            None
        };
        let status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };

        if self.schedule.lock().finish(goal_id, status, result) {
            self.process_unblocked_tasks();
            self.check_workflow_completion();
        } else {
            tracing::debug!("Ignoring report for unknown goal {}", goal_id);
        }
    }

    fn handle_task_failed(&self, message: &Message) {
        let reason = message.get_str("reason").unwrap_or("Unknown");
        let Some(task_id) = message.get_str("task_id") else {
            tracing::error!(
                "Task '{}' failed at {}: {}",
                message.get_str("task").unwrap_or("unknown"),
                message.sender,
                reason
            );
            return;
        };

        tracing::error!("Task {} failed: {}", task_id, reason);
        if self.schedule.lock().finish(task_id, TaskStatus::Failed, None) {
            self.process_unblocked_tasks();
            self.check_workflow_completion();
        }
    }

    fn handle_assistance_request(&self, message: &Message) {
        let requester = message.get_str("requesting_agent").unwrap_or_default();
        let task = message.get_str("task").unwrap_or_default();
        let capability = message.get_str("required_capability").unwrap_or_default();

        tracing::info!("Agent {} needs help with: {}", requester, task);

        let helper = self
            .registry
            .find_agents_by_capability(capability)
            .into_iter()
            .find(|a| a.id() != requester);

        match helper {
            Some(helper) => {
                self.bus.publish(
                    Message::directed(
                        MessageType::TaskRequest,
                        self.id.clone(),
                        helper.id(),
                        json!({
                            "task": task,
                            "params": message.content,
                            "requested_by": requester,
                        }),
                    )
                    .with_priority(self.default_priority),
                );
                tracing::info!("Delegated assistance to {}", helper.name());
            }
            None => {
                tracing::warn!("No agent available with capability: {}", capability);
            }
        }
    }

    // ----- queries -----

    pub fn get_task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.schedule.lock().find(task_id).map(|t| t.status)
    }

    /// Snapshot of a task wherever it currently is
    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.schedule.lock().find(task_id).cloned()
    }

    /// Result of a completed task, else whatever was posted for it
    pub fn get_result(&self, task_id: &str) -> Option<Value> {
        if let Some(task) = self.schedule.lock().completed.get(task_id) {
            return task.result.clone();
        }
        self.blackboard.get(&format!("result_{}", task_id))
    }

    /// Finished tasks, by completion time
    pub fn completed_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.schedule.lock().completed.values().cloned().collect();
        tasks.sort_by_key(|t| t.completed_at);
        tasks
    }

    pub fn get_system_status(&self) -> SystemStatus {
        let agents = self.registry.all_agents();
        let (pending, active, completed) = {
            let schedule = self.schedule.lock();
            (
                schedule.queue.len(),
                schedule.active.len(),
                schedule.completed.len(),
            )
        };
        SystemStatus {
            registered_agents: agents.len(),
            available_capabilities: self.registry.capabilities(),
            pending_tasks: pending,
            active_tasks: active,
            completed_tasks: completed,
            agents: agents
                .iter()
                .map(|a| AgentStatus {
                    id: a.id().to_string(),
                    name: a.name().to_string(),
                    state: a.state().to_string(),
                    capabilities: a.capability_names(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agent, AgentBehavior, AgentCapability, AgentGoal, AgentState, PlanStep};
    use crate::KasparroError;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    /// Completes every goal, posting `result_<goal>`, unless told to fail it
    #[derive(Default)]
    struct Worker {
        fail: HashSet<String>,
    }

    impl AgentBehavior for Worker {
        fn plan(&self, _agent: &Agent, _goal: &AgentGoal) -> Option<Vec<PlanStep>> {
            Some(vec![PlanStep::new("work")])
        }

        fn execute(&self, agent: &Agent, _plan: &[PlanStep], goal: &AgentGoal) -> Result<bool> {
            if self.fail.contains(&goal.id) {
                return Ok(false);
            }
            agent.post_to_blackboard(&format!("result_{}", goal.id), json!(goal.id), &["result"]);
            Ok(true)
        }

        fn on_task_request(
            &self,
            agent: &Agent,
            task: &str,
            _params: &Value,
            _message: &Message,
        ) -> Result<Value> {
            agent.post_to_blackboard("helped", json!(task), &[]);
            Ok(json!("helped"))
        }
    }

    /// Never plans; used where only registration matters
    struct Inert;

    impl AgentBehavior for Inert {
        fn plan(&self, _agent: &Agent, _goal: &AgentGoal) -> Option<Vec<PlanStep>> {
            None
        }

        fn execute(&self, _agent: &Agent, _plan: &[PlanStep], _goal: &AgentGoal) -> Result<bool> {
            Err(KasparroError::agent("inert"))
        }
    }

    fn caps(names: &[&str]) -> Vec<AgentCapability> {
        names.iter().map(|n| AgentCapability::new(*n, "")).collect()
    }

    /// Registers an agent id without connecting it; returns the goals it is
    /// sent so tests can report completion by hand
    fn manual_agent(
        orch: &Orchestrator,
        id: &str,
        capabilities: &[&str],
    ) -> Arc<Mutex<Vec<AgentGoal>>> {
        orch.registry()
            .register(Arc::new(Agent::new(id, id, "manual", caps(capabilities), Inert)));
        let goals = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&goals);
        orch.bus().subscribe(
            id,
            Arc::new(move |message: &Message| -> Result<()> {
                if message.message_type == MessageType::GoalAssigned {
                    sink.lock().push(serde_json::from_value(message.content["goal"].clone())?);
                }
                Ok(())
            }),
        );
        goals
    }

    fn report(orch: &Orchestrator, goal_id: &str, agent_id: &str, success: bool) {
        orch.bus().publish(Message::directed(
            MessageType::GoalComplete,
            agent_id,
            orch.id(),
            json!({"goal_id": goal_id, "agent_id": agent_id, "success": success}),
        ));
    }

    fn collecting_callback() -> (Arc<Mutex<Vec<(String, Vec<String>)>>>, WorkflowCallback) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let callback: WorkflowCallback =
            Box::new(move |workflow: &WorkflowDefinition, failed: &[Task]| {
                sink.lock().push((
                    workflow.id.clone(),
                    failed.iter().map(|t| t.id.clone()).collect(),
                ));
            });
        (calls, callback)
    }

    fn two_step_workflow() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "two step",
            "A then B",
            vec![
                Task::new("A", "x").with_id("A"),
                Task::new("B", "y").with_id("B").with_dependencies(["A"]),
            ],
        )
        .with_id("wf")
    }

    #[test]
    fn test_dependent_task_waits_for_completion() {
        let orch = Orchestrator::new();
        let goals = manual_agent(&orch, "agent", &["x", "y"]);

        orch.submit_workflow(two_step_workflow(), None);

        assert_eq!(orch.get_task_status("A"), Some(TaskStatus::Assigned));
        assert_eq!(orch.get_task_status("B"), Some(TaskStatus::Blocked));
        assert!(orch.get_task("B").unwrap().assigned_agent.is_none());
        assert_eq!(goals.lock().len(), 1);

        report(&orch, "A", "agent", true);

        assert_eq!(orch.get_task_status("A"), Some(TaskStatus::Completed));
        assert_eq!(orch.get_task_status("B"), Some(TaskStatus::Assigned));
        assert_eq!(orch.get_task("B").unwrap().assigned_agent.as_deref(), Some("agent"));
        let goals = goals.lock();
        assert_eq!(goals.len(), 2);
        assert_eq!(goals[1].id, "B");
        assert_eq!(goals[1].dependencies, vec!["A".to_string()]);
    }

    #[test]
    fn test_missing_capability_stays_pending() {
        let orch = Orchestrator::new();
        let id = orch.submit_task(Task::new("Z", "z").with_id("Z"));

        assert_eq!(id, "Z");
        assert_eq!(orch.get_task_status("Z"), Some(TaskStatus::Pending));
        assert_eq!(orch.get_system_status().pending_tasks, 1);
        assert_eq!(orch.get_task_status("nope"), None);
    }

    #[test]
    fn test_failed_task_is_reported_in_callback() {
        let orch = Orchestrator::new();
        let _goals = manual_agent(&orch, "agent", &["x", "y"]);
        let workflow = WorkflowDefinition::new(
            "parallel",
            "two independent tasks",
            vec![
                Task::new("A", "x").with_id("A"),
                Task::new("B", "y").with_id("B"),
            ],
        );
        let (calls, callback) = collecting_callback();
        orch.submit_workflow(workflow, Some(callback));

        report(&orch, "A", "agent", false);
        assert_eq!(orch.get_task_status("A"), Some(TaskStatus::Failed));
        assert!(calls.lock().is_empty());

        report(&orch, "B", "agent", true);
        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec!["A".to_string()]);
    }

    #[test]
    fn test_failed_dependency_keeps_dependent_blocked() {
        let orch = Orchestrator::new();
        let goals = manual_agent(&orch, "agent", &["x", "y"]);
        let (calls, callback) = collecting_callback();
        orch.submit_workflow(two_step_workflow(), Some(callback));

        report(&orch, "A", "agent", false);

        assert_eq!(orch.get_task_status("B"), Some(TaskStatus::Blocked));
        assert_eq!(goals.lock().len(), 1);
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_connected_agents_run_workflow_to_completion() {
        let orch = Orchestrator::new();
        orch.register_agent(Arc::new(Agent::new(
            "worker",
            "Worker",
            "does everything",
            caps(&["x", "y"]),
            Worker::default(),
        )));

        let (_, reports) = orch.submit_workflow_reporting(two_step_workflow());

        let report = reports.try_recv().unwrap();
        assert_eq!(report.workflow_id, "wf");
        assert!(report.succeeded());
        assert!(reports.try_recv().is_err());

        assert_eq!(orch.get_result("A"), Some(json!("A")));
        assert_eq!(orch.get_result("B"), Some(json!("B")));
        let status = orch.get_system_status();
        assert_eq!(status.completed_tasks, 2);
        assert_eq!(status.active_tasks, 0);
        assert_eq!(status.agents[0].state, AgentState::Idle.to_string());
        assert_eq!(orch.completed_tasks().len(), 2);
    }

    #[test]
    fn test_callback_fires_once_per_submission() {
        let orch = Orchestrator::new();
        let _goals = manual_agent(&orch, "agent", &["x", "y"]);
        let (calls, callback) = collecting_callback();
        orch.submit_workflow(two_step_workflow(), Some(callback));

        report(&orch, "A", "agent", true);
        report(&orch, "B", "agent", true);
        // Duplicate report for an already finished goal
        report(&orch, "B", "agent", true);

        assert_eq!(calls.lock().len(), 1);
        assert!(calls.lock()[0].1.is_empty());
    }

    #[test]
    fn test_second_workflow_replaces_completion_tracking() {
        let orch = Orchestrator::new();
        let goals = manual_agent(&orch, "agent", &["x", "y", "z"]);
        let (first_calls, first_callback) = collecting_callback();
        let (second_calls, second_callback) = collecting_callback();
        orch.submit_workflow(two_step_workflow(), Some(first_callback));
        assert_eq!(orch.get_task_status("A"), Some(TaskStatus::Assigned));

        let second = WorkflowDefinition::new(
            "second",
            "just C",
            vec![Task::new("C", "z").with_id("C")],
        )
        .with_id("wf2");
        orch.submit_workflow(second, Some(second_callback));
        assert_eq!(orch.get_task_status("C"), Some(TaskStatus::Assigned));

        // The first workflow's tasks keep running
        report(&orch, "A", "agent", true);
        assert_eq!(orch.get_task_status("B"), Some(TaskStatus::Assigned));

        report(&orch, "C", "agent", true);
        report(&orch, "B", "agent", true);

        assert_eq!(orch.get_task_status("B"), Some(TaskStatus::Completed));
        assert_eq!(goals.lock().len(), 3);
        assert!(first_calls.lock().is_empty());
        let second_calls = second_calls.lock();
        assert_eq!(second_calls.len(), 1);
        assert_eq!(second_calls[0].0, "wf2");
        assert!(second_calls[0].1.is_empty());
    }

    #[test]
    fn test_status_update_leaves_schedule_untouched() {
        let orch = Orchestrator::new();
        let _goals = manual_agent(&orch, "agent", &["x"]);
        orch.submit_task(Task::new("A", "x").with_id("A"));

        orch.bus().publish(Message::directed(
            MessageType::StatusUpdate,
            "agent",
            orch.id(),
            json!({"agent_id": "agent", "status": {"state": "EXECUTING"}}),
        ));
        orch.bus().publish(Message::directed(
            MessageType::StatusUpdate,
            "agent",
            orch.id(),
            json!({}),
        ));

        assert_eq!(orch.get_task_status("A"), Some(TaskStatus::Assigned));
        assert_eq!(orch.get_system_status().active_tasks, 1);
    }

    #[test]
    fn test_task_routed_to_waiting_agent_completes() {
        let orch = Orchestrator::new();
        let agent = Arc::new(Agent::new("worker", "Worker", "", caps(&["x"]), Worker::default()));
        orch.register_agent(Arc::clone(&agent));
        agent.request_assistance("Help", "nobody");
        assert_eq!(agent.state(), AgentState::Waiting);

        orch.submit_task(Task::new("T", "x").with_id("T"));

        assert_eq!(orch.get_task_status("T"), Some(TaskStatus::Completed));
        assert_eq!(agent.queued_goals(), 0);
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[test]
    fn test_empty_workflow_completes_on_submit() {
        let orch = Orchestrator::new();
        let (calls, callback) = collecting_callback();
        orch.submit_workflow(WorkflowDefinition::new("empty", "", Vec::new()), Some(callback));
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn test_task_failed_message_fails_active_task() {
        let orch = Orchestrator::new();
        let _goals = manual_agent(&orch, "agent", &["x"]);
        orch.submit_task(Task::new("A", "x").with_id("A"));

        orch.bus().publish(Message::directed(
            MessageType::TaskFailed,
            "agent",
            orch.id(),
            json!({"task_id": "A", "reason": "disk full"}),
        ));

        let task = orch.get_task("A").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_assistance_is_forwarded_to_another_provider() {
        let orch = Orchestrator::new();
        orch.register_agent(Arc::new(Agent::new(
            "helper",
            "Helper",
            "",
            caps(&["parse_raw_data"]),
            Worker::default(),
        )));
        let requester = Arc::new(Agent::new(
            "needy",
            "Needy",
            "",
            caps(&["parse_raw_data", "generate_faqs"]),
            Inert,
        ));
        orch.register_agent(Arc::clone(&requester));

        requester.request_assistance("Need product data", "parse_raw_data");

        assert_eq!(orch.blackboard().get("helped"), Some(json!("Need product data")));
        let delegated = orch.bus().get_history(
            Some(orch.id()),
            Some("helper"),
            Some(MessageType::TaskRequest),
            10,
        );
        assert_eq!(delegated.len(), 1);
        assert_eq!(delegated[0].content["requested_by"], "needy");
        assert_eq!(delegated[0].content["params"]["required_capability"], "parse_raw_data");
    }

    #[test]
    fn test_assistance_without_helper_is_dropped() {
        let orch = Orchestrator::new();
        let requester = Arc::new(Agent::new("needy", "Needy", "", caps(&["x"]), Inert));
        orch.register_agent(Arc::clone(&requester));

        requester.request_assistance("Help", "x");

        let delegated = orch
            .bus()
            .get_history(None, None, Some(MessageType::TaskRequest), 10);
        assert!(delegated.is_empty());
    }

    #[test]
    fn test_unregister_disconnects() {
        let orch = Orchestrator::new();
        let agent = Arc::new(Agent::new("worker", "Worker", "", caps(&["x"]), Worker::default()));
        orch.register_agent(Arc::clone(&agent));
        assert!(agent.is_connected());

        orch.unregister_agent("worker");

        assert!(!agent.is_connected());
        assert!(orch.registry().is_empty());
        assert_eq!(orch.bus().subscriber_count("worker"), 0);
    }

    #[test]
    fn test_resubmitted_task_runs_again() {
        let orch = Orchestrator::new();
        let goals = manual_agent(&orch, "agent", &["x"]);
        orch.submit_task(Task::new("A", "x").with_id("A"));
        report(&orch, "A", "agent", true);

        orch.submit_task(Task::new("A", "x").with_id("A"));

        assert_eq!(orch.get_task_status("A"), Some(TaskStatus::Assigned));
        assert_eq!(goals.lock().len(), 2);
    }

    #[test]
    fn test_from_config_uses_configured_id() {
        let mut config = KasparroConfig::default();
        config.orchestrator.id = "conductor".to_string();
        config.bus.history_capacity = 2;
        let orch = Orchestrator::from_config(&config);

        assert_eq!(orch.id(), "conductor");
        assert_eq!(orch.bus().capacity(), 2);
        assert_eq!(orch.agent_context().orchestrator_id, "conductor");
    }
}
