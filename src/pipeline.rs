//! End-to-end content run
//!
//! Registers the content agents, generates a workflow for the requested
//! outputs from whatever capabilities they advertise, runs it and saves the
//! resulting artifacts.

use crate::agents::content_agents;
use crate::core::Result;
use crate::output::{save_artifacts, SavedArtifact};
use crossbeam_channel::TryRecvError;
use kasparro_core::agents::Decision;
use kasparro_core::{
    DynamicWorkflowGenerator, KasparroConfig, Orchestrator, SystemStatus, WorkflowReport,
};
use serde_json::{json, Map};
use std::path::PathBuf;
use std::sync::Arc;

/// Decisions shown per agent in the trail
pub const TRAIL_LENGTH: usize = 3;

/// Where to read from, where to write to and what to produce
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub outputs: Vec<String>,
}

impl PipelineOptions {
    pub fn from_config(config: &KasparroConfig) -> Self {
        Self {
            input: config.content.input.clone(),
            output_dir: config.content.output_dir.clone(),
            outputs: config.workflow.outputs.clone(),
        }
    }
}

/// Last few decisions of one agent
#[derive(Debug, Clone)]
pub struct DecisionTrail {
    pub agent_name: String,
    pub decisions: Vec<Decision>,
}

/// Everything a run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    pub workflow_id: String,
    pub task_count: usize,
    /// `None` when the workflow never completed
    pub report: Option<WorkflowReport>,
    pub saved: Vec<SavedArtifact>,
    pub status: SystemStatus,
    pub trails: Vec<DecisionTrail>,
}

impl PipelineOutcome {
    /// Completed with no failed task
    pub fn succeeded(&self) -> bool {
        self.report.as_ref().is_some_and(WorkflowReport::succeeded)
    }
}

/// Run the content workflow once
pub fn run(config: &KasparroConfig, options: &PipelineOptions) -> Result<PipelineOutcome> {
    let orchestrator = Orchestrator::from_config(config);
    tracing::info!("Orchestrator initialized");

    let agents = content_agents(&options.input);
    for agent in &agents {
        orchestrator.register_agent(Arc::clone(agent));
        tracing::info!("  Registered: {}", agent.name());
        tracing::info!("    Capabilities: {:?}", agent.capability_names());
    }

    let mut context = Map::new();
    context.insert(
        "file_path".to_string(),
        json!(options.input.display().to_string()),
    );

    let generator = DynamicWorkflowGenerator::from_config(&config.workflow);
    let workflow = generator.generate_for(&orchestrator, &options.outputs, &context);
    let task_count = workflow.tasks.len();
    tracing::info!("Generated workflow: {} ({} tasks)", workflow.name, task_count);

    let (workflow_id, reports) = orchestrator.submit_workflow_reporting(workflow);

    let report = match reports.try_recv() {
        Ok(report) => Some(report),
        Err(TryRecvError::Empty) => {
            tracing::warn!("Workflow {} did not complete", workflow_id);
            None
        }
        Err(TryRecvError::Disconnected) => {
            tracing::error!("Workflow {} report channel closed", workflow_id);
            None
        }
    };
    if let Some(report) = &report {
        for task in &report.failed {
            tracing::warn!("Task failed: {} ({})", task.name, task.id);
        }
    }

    let saved = save_artifacts(orchestrator.blackboard(), &options.output_dir)?;

    let trails = agents
        .iter()
        .filter_map(|agent| {
            let decisions = agent.memory().decisions;
            if decisions.is_empty() {
                return None;
            }
            let skip = decisions.len().saturating_sub(TRAIL_LENGTH);
            Some(DecisionTrail {
                agent_name: agent.name().to_string(),
                decisions: decisions.into_iter().skip(skip).collect(),
            })
        })
        .collect();

    Ok(PipelineOutcome {
        workflow_id,
        task_count,
        report,
        saved,
        status: orchestrator.get_system_status(),
        trails,
    })
}
