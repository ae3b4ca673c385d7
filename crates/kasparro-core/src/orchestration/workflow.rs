//! Workflow generation from discovered capabilities
//!
//! Nothing here names an agent. A workflow is derived from the outputs a
//! caller wants, a capability dependency graph and whatever capabilities
//! the registered agents advertise at runtime.

use super::orchestrator::Orchestrator;
use super::task::{Task, WorkflowDefinition};
use crate::config::WorkflowConfig;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Capability prerequisites and the capability producing each output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGraph {
    /// capability -> direct prerequisite capabilities
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// output name -> capability producing it
    pub outputs: BTreeMap<String, String>,
}

impl Default for CapabilityGraph {
    fn default() -> Self {
        let dependencies = [
            ("parse_raw_data", vec![]),
            ("validate_data", vec!["parse_raw_data"]),
            ("generate_competitor", vec!["parse_raw_data"]),
            ("generate_faqs", vec!["parse_raw_data"]),
            ("market_analysis", vec!["parse_raw_data"]),
            ("build_product_page", vec!["parse_raw_data"]),
            ("build_faq_page", vec!["parse_raw_data", "generate_faqs"]),
            (
                "build_comparison_page",
                vec!["parse_raw_data", "generate_competitor"],
            ),
        ]
        .into_iter()
        .map(|(cap, deps)| {
            (
                cap.to_string(),
                deps.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        let outputs = [
            ("product_page", "build_product_page"),
            ("faq_page", "build_faq_page"),
            ("comparison_page", "build_comparison_page"),
        ]
        .into_iter()
        .map(|(output, cap)| (output.to_string(), cap.to_string()))
        .collect();

        Self {
            dependencies,
            outputs,
        }
    }
}

impl CapabilityGraph {
    /// Built-in graph with any tables from configuration swapped in
    pub fn from_config(config: &WorkflowConfig) -> Self {
        let mut graph = Self::default();
        if let Some(dependencies) = &config.dependencies {
            graph.dependencies = dependencies.clone();
        }
        if let Some(outputs) = &config.outputs_map {
            graph.outputs = outputs.clone();
        }
        graph
    }

    pub fn direct_dependencies(&self, capability: &str) -> &[String] {
        self.dependencies
            .get(capability)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every transitive prerequisite of `capability`
    pub fn all_dependencies(&self, capability: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut stack: Vec<&str> = vec![capability];
        while let Some(cap) = stack.pop() {
            for dep in self.direct_dependencies(cap) {
                if found.insert(dep.clone()) {
                    stack.push(dep);
                }
            }
        }
        found
    }

    /// Prerequisites first; among independent nodes, sorted order wins
    pub fn topological_sort(&self, capabilities: &BTreeSet<String>) -> Vec<String> {
        fn visit(
            graph: &CapabilityGraph,
            cap: &str,
            within: &BTreeSet<String>,
            visited: &mut BTreeSet<String>,
            order: &mut Vec<String>,
        ) {
            if !visited.insert(cap.to_string()) {
                return;
            }
            for dep in graph.direct_dependencies(cap) {
                if within.contains(dep) {
                    visit(graph, dep, within, visited, order);
                }
            }
            order.push(cap.to_string());
        }

        let mut visited = BTreeSet::new();
        let mut order = Vec::with_capacity(capabilities.len());
        for cap in capabilities {
            visit(self, cap, capabilities, &mut visited, &mut order);
        }
        order
    }
}

/// Builds workflows for requested outputs
#[derive(Debug, Clone, Default)]
pub struct DynamicWorkflowGenerator {
    graph: CapabilityGraph,
}

impl DynamicWorkflowGenerator {
    pub fn new(graph: CapabilityGraph) -> Self {
        Self { graph }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::new(CapabilityGraph::from_config(config))
    }

    pub fn graph(&self) -> &CapabilityGraph {
        &self.graph
    }

    /// Capabilities the registered agents provide, logged with providers
    pub fn discover_capabilities(&self, orchestrator: &Orchestrator) -> Vec<String> {
        let capabilities = orchestrator.registry().capabilities();
        tracing::info!("Discovered {} capabilities from agents:", capabilities.len());
        for cap in &capabilities {
            let providers: Vec<String> = orchestrator
                .registry()
                .find_agents_by_capability(cap)
                .iter()
                .map(|a| a.name().to_string())
                .collect();
            tracing::info!("  - {}: provided by {:?}", cap, providers);
        }
        capabilities
    }

    /// Derive one task per needed capability, in dependency order
    ///
    /// Capabilities nobody provides are logged and left out, along with any
    /// dependency edges pointing at them. Each task's context is `context`
    /// plus a `capability` entry naming the capability it executes.
    pub fn generate_workflow(
        &self,
        available: &[String],
        required_outputs: &[String],
        context: &Map<String, Value>,
    ) -> WorkflowDefinition {
        let available: BTreeSet<&str> = available.iter().map(String::as_str).collect();

        let mut required = BTreeSet::new();
        for output in required_outputs {
            match self.graph.outputs.get(output) {
                Some(cap) => {
                    required.insert(cap.clone());
                    required.extend(self.graph.all_dependencies(cap));
                }
                None => tracing::warn!("Unknown output '{}', skipping", output),
            }
        }
        tracing::info!("Required capabilities for outputs: {:?}", required);

        let missing: Vec<String> = required
            .iter()
            .filter(|cap| !available.contains(cap.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            tracing::warn!("Missing capabilities: {:?}", missing);
            tracing::warn!("Workflow will proceed with available capabilities");
            required.retain(|cap| available.contains(cap.as_str()));
        }

        let mut task_ids: BTreeMap<String, String> = BTreeMap::new();
        let mut tasks = Vec::with_capacity(required.len());
        for (position, cap) in self.graph.topological_sort(&required).into_iter().enumerate() {
            let task_id = format!("task_{}", cap);
            let dependencies: Vec<String> = self
                .graph
                .direct_dependencies(&cap)
                .iter()
                .filter_map(|dep| task_ids.get(dep).cloned())
                .collect();

            let mut task_context = context.clone();
            task_context.insert("capability".to_string(), Value::String(cap.clone()));

            let task = Task::new(format!("Execute: {}", cap), cap.clone())
                .with_id(task_id.clone())
                .with_description(format!("Dynamically routed task for capability: {}", cap))
                .with_priority(u8::try_from(position + 1).unwrap_or(u8::MAX))
                .with_dependencies(dependencies)
                .with_context(task_context);

            tracing::info!("Generated task: {} (deps: {:?})", task.name, task.dependencies);
            task_ids.insert(cap, task_id);
            tasks.push(task);
        }

        WorkflowDefinition::new(
            "Dynamically Generated Content Workflow",
            format!("Auto-generated workflow for outputs: {:?}", required_outputs),
            tasks,
        )
        .with_id(format!(
            "dynamic_workflow_{}",
            Local::now().format("%Y%m%d_%H%M%S")
        ))
    }

    /// Discover what the orchestrator's agents can do, then generate
    pub fn generate_for(
        &self,
        orchestrator: &Orchestrator,
        required_outputs: &[String],
        context: &Map<String, Value>,
    ) -> WorkflowDefinition {
        let available = self.discover_capabilities(orchestrator);
        self.generate_workflow(&available, required_outputs, context)
    }
}
