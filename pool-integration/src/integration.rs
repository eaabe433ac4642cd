//! Integration layer composing selection, pooling and execution.

use crate::backend::{ExecutionBackend, ExecutionOutput, ExecutionRequest};
use crate::error::{IntegrationError, Result};
use expert_pool::{
    AgentInstance, ExpertPool, ExpertTypeSummary, InstanceId, InstanceStatus, PoolError,
    PoolStats, SessionId,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Expert types listed in [`PoolStatus::expert_types`].
const STATUS_EXPERT_TYPE_LIMIT: usize = 10;
/// Characters of backend output kept as the release summary.
const RESULT_SUMMARY_LIMIT: usize = 200;

/// What a caller needs to address an acquired instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentHandle {
    pub instance_id: InstanceId,
    pub expert_id: String,
    pub session_id: SessionId,
    pub is_reused: bool,
}

impl From<&AgentInstance> for AgentHandle {
    fn from(instance: &AgentInstance) -> Self {
        Self {
            instance_id: instance.instance_id().clone(),
            expert_id: instance.expert_id().to_string(),
            session_id: instance.session_id().clone(),
            is_reused: instance.is_reused(),
        }
    }
}

/// A task run end to end by [`PoolIntegration::run_task`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRun {
    pub handle: AgentHandle,
    pub output: ExecutionOutput,
}

/// Overview of the pool for dashboards and status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub stats: PoolStats,
    pub expert_types_count: usize,
    pub active_instances_count: usize,
    /// The first few expert types in catalog order.
    pub expert_types: Vec<ExpertTypeSummary>,
    pub active_instances: Vec<AgentInstance>,
}

/// Best expert for one workflow step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSuggestion {
    pub step: String,
    pub expert_id: Option<String>,
    pub score: f64,
}

/// Single entry point for "give me an agent for this task".
///
/// The backend is always called after the pool call that produced the
/// instance has returned, so slow executions never hold a pool lock.
#[derive(Clone)]
pub struct PoolIntegration {
    pool: Arc<ExpertPool>,
    backend: Arc<dyn ExecutionBackend>,
}

impl PoolIntegration {
    pub fn new(pool: Arc<ExpertPool>, backend: Arc<dyn ExecutionBackend>) -> Self {
        info!(
            "PoolIntegration initialized with {} experts",
            pool.catalog().len()
        );
        Self { pool, backend }
    }

    pub fn pool(&self) -> &Arc<ExpertPool> {
        &self.pool
    }

    /// Acquire an instance for `task`, selecting the expert when `expert_id` is `None`.
    pub async fn create_agent(
        &self,
        task: &str,
        expert_id: Option<&str>,
        prefer_reuse: bool,
    ) -> Result<AgentHandle> {
        let instance = self
            .pool
            .acquire_expert(expert_id, task, prefer_reuse)
            .await?;

        info!(
            "Created pool agent: {} for task: {}",
            instance.instance_id(),
            truncate(task, 50)
        );
        Ok(AgentHandle::from(&instance))
    }

    /// Run `task` on an active instance.
    ///
    /// A backend error marks the instance as errored. A completed run that
    /// reports `success == false` leaves the instance active.
    pub async fn execute_task(
        &self,
        instance_id: &InstanceId,
        task: &str,
        context: Option<&str>,
    ) -> Result<ExecutionOutput> {
        let instance = self
            .pool
            .get_instance(instance_id)
            .await
            .ok_or_else(|| PoolError::NotFound(instance_id.clone()))?;

        if instance.status() != InstanceStatus::Active {
            return Err(IntegrationError::InstanceNotActive {
                instance_id: instance_id.clone(),
                status: instance.status(),
            });
        }

        let expert = self
            .pool
            .catalog()
            .get(instance.expert_id())
            .cloned()
            .ok_or_else(|| PoolError::UnknownExpert(instance.expert_id().to_string()))?;

        let request = ExecutionRequest {
            session_id: instance.session_id().clone(),
            task: task.to_string(),
            context: context.map(str::to_string),
            expert,
        };

        debug!("Executing task on {}", instance_id);
        match self.backend.execute(request).await {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("Execution failed on {}: {}", instance_id, e);
                if let Err(mark_err) = self.pool.mark_error(instance_id).await {
                    warn!("Could not mark {} as error: {}", instance_id, mark_err);
                }
                Err(e.into())
            }
        }
    }

    /// Select, acquire, execute and release in one call.
    ///
    /// The instance is released with a summary of the output whenever the
    /// backend returns; on a backend error it is left in the error state.
    pub async fn run_task(&self, task: &str, context: Option<&str>) -> Result<TaskRun> {
        let expert_id = self
            .pool
            .selector()
            .select_best(task, context)
            .ok_or(PoolError::NoSuitableExpert)?
            .expert_id;

        let handle = self.create_agent(task, Some(&expert_id), true).await?;
        let output = self
            .execute_task(&handle.instance_id, task, context)
            .await?;

        self.pool
            .release_instance(&handle.instance_id, truncate(&output.output, RESULT_SUMMARY_LIMIT))
            .await?;

        Ok(TaskRun { handle, output })
    }

    /// Run several tasks at once. Results are in input order.
    pub async fn run_tasks<S: AsRef<str>>(&self, tasks: &[S]) -> Vec<Result<TaskRun>> {
        join_all(tasks.iter().map(|task| self.run_task(task.as_ref(), None))).await
    }

    pub async fn release_agent(&self, instance_id: &InstanceId, task_result: &str) -> Result<()> {
        self.pool.release_instance(instance_id, task_result).await?;
        Ok(())
    }

    pub async fn terminate_agent(&self, instance_id: &InstanceId) -> Result<()> {
        self.pool.terminate_instance(instance_id).await?;
        Ok(())
    }

    pub async fn cleanup_idle_instances(&self, max_idle: Duration) -> usize {
        let cleaned = self.pool.cleanup_idle_instances(max_idle).await;
        info!("Cleaned up {} idle instances", cleaned);
        cleaned
    }

    pub async fn pool_status(&self) -> PoolStatus {
        let stats = self.pool.get_stats().await;
        let expert_types = self.pool.list_expert_types().await;
        let active_instances = self.pool.list_active_instances().await;

        PoolStatus {
            stats,
            expert_types_count: expert_types.len(),
            active_instances_count: active_instances.len(),
            expert_types: expert_types
                .into_iter()
                .take(STATUS_EXPERT_TYPE_LIMIT)
                .collect(),
            active_instances,
        }
    }

    /// Best expert for each step of a multi-step workflow.
    pub fn suggest_experts_for_workflow<S: AsRef<str>>(&self, steps: &[S]) -> Vec<WorkflowSuggestion> {
        steps
            .iter()
            .map(|step| {
                let step = step.as_ref();
                let best = self.pool.selector().select_best(step, None);
                WorkflowSuggestion {
                    step: step.to_string(),
                    score: best.as_ref().map_or(0.0, |b| b.score),
                    expert_id: best.map(|b| b.expert_id),
                }
            })
            .collect()
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
